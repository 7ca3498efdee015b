//! Alignment-derived coverage computed from indexed BAM files.

use noodles::bam;
use noodles::sam::alignment::Record as _;
use noodles::sam::alignment::record::cigar::op::Kind;

use crate::errors::{CovmatError, Result};
use crate::signal::Rle;
use crate::sources::{resolve_range, CoverageSource};

/// Per-base depth accumulated from the read intervals of an indexed
/// BAM file (a `.bai`/`.csi` index next to the file is required for
/// region queries).
pub struct BamSource {
    path: String,
    exclude_gap_bases: bool,
}

impl BamSource {
    pub fn new(path: impl Into<String>) -> Self {
        BamSource {
            path: path.into(),
            exclude_gap_bases: false,
        }
    }

    /// When set, bases an alignment spans through deletion or skip
    /// CIGAR operations do not count as covered; coverage then follows
    /// the aligned segments exactly instead of the outer read span.
    pub fn exclude_gap_bases(mut self, exclude: bool) -> Self {
        self.exclude_gap_bases = exclude;
        self
    }

    fn read_error(&self, e: impl ToString) -> CovmatError {
        CovmatError::Read {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }

    fn header_length(&self, header: &noodles::sam::Header, chrom: &str) -> Result<u32> {
        let references = header.reference_sequences();
        for (name, reference) in references {
            if name.as_ref() as &[u8] == chrom.as_bytes() {
                return Ok(usize::from(reference.length()) as u32);
            }
        }
        Err(CovmatError::UnknownChromosome {
            name: chrom.to_string(),
            valid: references
                .keys()
                .map(|name| String::from_utf8_lossy(name.as_ref()).to_string())
                .collect(),
        })
    }
}

/// Add one covered interval into the depth-delta buffer, clamped to the
/// query window.
fn add_interval(deltas: &mut [i64], win_start: u32, win_end: u32, start: u32, end: u32) {
    let lo = start.max(win_start);
    let hi = end.min(win_end);
    if hi <= lo {
        return;
    }
    deltas[(lo - win_start) as usize] += 1;
    deltas[(hi - win_start) as usize] -= 1;
}

impl CoverageSource for BamSource {
    fn label(&self) -> &str {
        &self.path
    }

    fn chrom_length(&self, chrom: &str) -> Result<u32> {
        let mut reader = bam::io::reader::Builder
            .build_from_path(&self.path)
            .map_err(|e| self.read_error(e))?;
        let header = reader.read_header().map_err(|e| self.read_error(e))?;
        self.header_length(&header, chrom)
    }

    fn coverage(&self, chrom: &str, range: Option<(u32, u32)>) -> Result<Rle<f64>> {
        let mut reader = bam::io::indexed_reader::Builder::default()
            .build_from_path(&self.path)
            .map_err(|e| self.read_error(e))?;
        let header = reader.read_header().map_err(|e| self.read_error(e))?;
        let length = self.header_length(&header, chrom)?;
        let (start, end) = resolve_range(range, length, chrom)?;

        let region: noodles::core::Region = format!("{}:{}-{}", chrom, start + 1, end)
            .parse()
            .map_err(|e| CovmatError::Config(format!("invalid region query: {}", e)))?;
        let query = reader
            .query(&header, &region)
            .map_err(|e| self.read_error(e))?;

        // Depth deltas over the query window; one extra slot so closing
        // an interval at the window end never lands out of bounds.
        let mut deltas = vec![0i64; (end - start) as usize + 1];
        for result in query {
            let record = result.map_err(|e| self.read_error(e))?;
            if record.flags().is_unmapped() {
                continue;
            }
            let alignment_start = match record.alignment_start() {
                Some(position) => position.map_err(|e| self.read_error(e))?.get() as u32,
                None => continue,
            };
            let ref_start = alignment_start - 1;

            if self.exclude_gap_bases {
                let mut pos = ref_start;
                for op in record.cigar().iter() {
                    let op = op.map_err(|e| self.read_error(e))?;
                    let len = op.len() as u32;
                    match op.kind() {
                        Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => {
                            add_interval(&mut deltas, start, end, pos, pos + len);
                            pos += len;
                        }
                        Kind::Deletion | Kind::Skip => {
                            pos += len;
                        }
                        Kind::Insertion | Kind::SoftClip | Kind::HardClip | Kind::Pad => {}
                    }
                }
            } else {
                let alignment_end = match record.alignment_end() {
                    Some(position) => position.map_err(|e| self.read_error(e))?.get() as u32,
                    None => continue,
                };
                // alignment_end is 1-based inclusive, which equals the
                // 0-based exclusive end of the covered span.
                add_interval(&mut deltas, start, end, ref_start, alignment_end);
            }
        }

        let mut signal = Rle::new();
        let mut depth = 0i64;
        for &delta in &deltas[..(end - start) as usize] {
            depth += delta;
            signal.push_run(depth as f64, 1);
        }
        Ok(signal)
    }
}
