//! Precomputed per-base signal read from bedGraph text files.
//!
//! bedGraph carries no header metadata, so sequence lengths come from a
//! chrom-sizes table supplied at construction. Rows for a chromosome
//! must be position-sorted and non-overlapping, which is the format's
//! convention; violations surface as read errors rather than silently
//! mis-building the signal.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::common::utils::get_dynamic_reader;
use crate::errors::{CovmatError, Result};
use crate::signal::Rle;
use crate::sources::retry::RetryPolicy;
use crate::sources::{resolve_range, CoverageSource};

pub struct BedGraphSource {
    path: String,
    chrom_sizes: HashMap<String, u32>,
    retry: RetryPolicy,
}

impl BedGraphSource {
    pub fn new(path: impl Into<String>, chrom_sizes: HashMap<String, u32>) -> Self {
        BedGraphSource {
            path: path.into(),
            chrom_sizes,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn read_error(&self, message: impl Into<String>) -> CovmatError {
        CovmatError::Read {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    fn scan(&self, chrom: &str, start: u32, end: u32) -> Result<Rle<f64>> {
        let reader = get_dynamic_reader(Path::new(&self.path))?;

        let mut signal = Rle::new();
        let mut pos = start;
        for line in reader.lines() {
            let line = line.map_err(|e| self.read_error(e.to_string()))?;
            let trimmed = line.trim();
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("track")
                || trimmed.starts_with("browser")
            {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let row_chrom = match fields.next() {
                Some(c) => c,
                None => continue,
            };
            if row_chrom != chrom {
                continue;
            }
            let (row_start, row_end, value) = match (
                fields.next().and_then(|s| s.parse::<u32>().ok()),
                fields.next().and_then(|s| s.parse::<u32>().ok()),
                fields.next().and_then(|s| s.parse::<f64>().ok()),
            ) {
                (Some(s), Some(e), Some(v)) => (s, e, v),
                _ => {
                    return Err(
                        self.read_error(format!("malformed bedGraph line: '{}'", trimmed))
                    );
                }
            };

            let lo = row_start.max(start);
            let hi = row_end.min(end);
            if hi <= lo {
                continue;
            }
            if lo < pos {
                return Err(self.read_error(format!(
                    "bedGraph rows for {} are not position-sorted at {}-{}",
                    chrom, row_start, row_end
                )));
            }
            signal.push_run(0.0, lo - pos);
            signal.push_run(value, hi - lo);
            pos = hi;
        }
        signal.push_run(0.0, end - pos);
        Ok(signal)
    }
}

impl CoverageSource for BedGraphSource {
    fn label(&self) -> &str {
        &self.path
    }

    fn chrom_length(&self, chrom: &str) -> Result<u32> {
        match self.chrom_sizes.get(chrom) {
            Some(&length) => Ok(length),
            None => {
                let mut valid: Vec<String> = self.chrom_sizes.keys().cloned().collect();
                valid.sort();
                Err(CovmatError::UnknownChromosome {
                    name: chrom.to_string(),
                    valid,
                })
            }
        }
    }

    fn coverage(&self, chrom: &str, range: Option<(u32, u32)>) -> Result<Rle<f64>> {
        let length = self.chrom_length(chrom)?;
        let (start, end) = resolve_range(range, length, chrom)?;
        self.retry.run(|| self.scan(chrom, start, end))
    }
}
