//! The batch transform: per-sample coverage in, candidate regions and a
//! region × sample matrix out, one atomic result per chromosome.
//!
//! Two nested fan-out levels run under [`workers::map_ordered`]: the
//! outer level distributes chromosomes, the inner level distributes
//! sample files within a chromosome. All per-sample signals for a
//! chromosome are held only through filtering and clustering; the
//! quantification pass re-reads each sample over the chunk windows it
//! needs, trading I/O for peak memory.

pub mod workers;

use indicatif::ProgressBar;
use ndarray::Array2;

use crate::common::models::RegionSet;
use crate::errors::{CovmatError, Result};
use crate::matrix::{
    chunk_ranges, column_bind, library_scale, region_values, resolve_read_lengths, stack_chunks,
    CoverageMatrix, ReadLength, SampleNorm,
};
use crate::regions::find_regions;
use crate::signal::{filter_coverage, CoverageTable, FilterMode};
use crate::sources::CoverageSource;
use workers::map_ordered;

/// Engine configuration, threaded explicitly through every call; there
/// is no ambient global state. The cutoff has no default, everything
/// else does.
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// Coverage must exceed this value for a position to pass.
    pub cutoff: f64,
    /// Maximum gap between passing runs merged into one region.
    pub max_gap: u32,
    /// Read-length divisor `L`.
    pub read_length: ReadLength,
    /// Per-sample total mapped signal, for library-size scaling and
    /// RPKM depth.
    pub totals: Option<Vec<f64>>,
    /// Library-size normalization target.
    pub target_size: f64,
    /// Normalize aggregates by region width and sequencing depth.
    pub rpkm: bool,
    /// Regions quantified per assembly chunk.
    pub chunk_size: usize,
    /// Outer fan-out width (chromosomes).
    pub chrom_workers: usize,
    /// Inner fan-out width (sample files within a chromosome).
    pub sample_workers: usize,
}

impl MatrixConfig {
    pub fn new(cutoff: f64) -> Self {
        MatrixConfig {
            cutoff,
            max_gap: 300,
            read_length: ReadLength::default(),
            totals: None,
            target_size: 40_000_000.0,
            rpkm: false,
            chunk_size: 1_000,
            chrom_workers: 1,
            sample_workers: 1,
        }
    }

    /// Fail fast, before any I/O, on parameter problems.
    pub fn validate(&self, n_samples: usize) -> Result<()> {
        if !self.cutoff.is_finite() {
            return Err(CovmatError::Config(
                "cutoff must be a finite number".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(CovmatError::Config(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if !(self.target_size > 0.0) {
            return Err(CovmatError::Config(
                "library-size target must be positive".to_string(),
            ));
        }
        if let Some(totals) = &self.totals {
            if totals.len() != n_samples {
                return Err(CovmatError::Config(format!(
                    "{} totals supplied for {} samples",
                    totals.len(),
                    n_samples
                )));
            }
        }
        if self.rpkm && self.totals.is_none() {
            return Err(CovmatError::Config(
                "rpkm quantification requires per-sample totals".to_string(),
            ));
        }
        Ok(())
    }
}

/// The candidate regions of one chromosome with their coverage matrix.
/// Matrix rows correspond 1:1 to regions, in order.
#[derive(Debug, Clone)]
pub struct RegionMatrix {
    pub regions: RegionSet,
    pub matrix: CoverageMatrix,
}

/// One chromosome's atomic result. `None` means nothing passed the
/// filter there: no candidate regions, which is not a failure.
#[derive(Debug, Clone)]
pub struct ChromRegionMatrix {
    pub chrom: String,
    pub result: Option<RegionMatrix>,
}

/// Call candidate regions from the samples' own coverage and quantify
/// them, chromosome by chromosome. Results preserve chromosome input
/// order; within each matrix, columns preserve sample input order.
pub fn region_matrix(
    sources: &[Box<dyn CoverageSource>],
    sample_names: Option<&[String]>,
    chroms: &[String],
    config: &MatrixConfig,
) -> Result<Vec<ChromRegionMatrix>> {
    config.validate(sources.len())?;
    let samples = sample_labels(sources, sample_names)?;
    let norms = sample_norms(config, sources.len());

    let bar = ProgressBar::new(chroms.len() as u64);
    let results = map_ordered(chroms, config.chrom_workers, |chrom| {
        let result = call_and_quantify(sources, &samples, &norms, chrom, config)?;
        bar.inc(1);
        Ok(result)
    });
    bar.finish_and_clear();
    results
}

/// The summarized-signal variant: one pre-averaged summary source per
/// chromosome (positional correspondence with `chroms`) drives the
/// filter in mean mode; quantification still reads the per-sample
/// sources.
pub fn summary_region_matrix(
    summaries: &[Box<dyn CoverageSource>],
    sources: &[Box<dyn CoverageSource>],
    sample_names: Option<&[String]>,
    chroms: &[String],
    config: &MatrixConfig,
) -> Result<Vec<ChromRegionMatrix>> {
    config.validate(sources.len())?;
    if summaries.len() != chroms.len() {
        return Err(CovmatError::Config(format!(
            "{} summary sources for {} chromosomes",
            summaries.len(),
            chroms.len()
        )));
    }
    let samples = sample_labels(sources, sample_names)?;
    let norms = sample_norms(config, sources.len());

    let items: Vec<(usize, &String)> = chroms.iter().enumerate().collect();
    let bar = ProgressBar::new(chroms.len() as u64);
    let results = map_ordered(&items, config.chrom_workers, |&(idx, chrom)| {
        let summary = &summaries[idx];
        let length = summary.chrom_length(chrom)?;
        let signal = summary.coverage(chrom, None)?;
        let table = CoverageTable::new(
            chrom.clone(),
            length,
            vec!["mean".to_string()],
            vec![signal],
        )?;
        let filtered = filter_coverage(&table, config.cutoff, FilterMode::Mean)?;
        drop(table);

        let result = match filtered.and_then(|f| find_regions(&f.mask, chrom, config.max_gap)) {
            None => None,
            Some(regions) => {
                let matrix = quantify(sources, &samples, &norms, &regions, chrom, config)?;
                Some(RegionMatrix { regions, matrix })
            }
        };
        bar.inc(1);
        Ok(ChromRegionMatrix {
            chrom: chrom.clone(),
            result,
        })
    });
    bar.finish_and_clear();
    results
}

/// Quantify an externally supplied region set (annotation features,
/// exon-level counts), bypassing the filter and clusterer. An empty set
/// yields the explicit 0 × n_samples matrix.
pub fn quantify_regions(
    sources: &[Box<dyn CoverageSource>],
    sample_names: Option<&[String]>,
    regions: &RegionSet,
    config: &MatrixConfig,
) -> Result<CoverageMatrix> {
    config.validate(sources.len())?;
    let samples = sample_labels(sources, sample_names)?;
    let norms = sample_norms(config, sources.len());

    if regions.is_empty() {
        return Ok(CoverageMatrix {
            samples,
            values: Array2::zeros((0, sources.len())),
        });
    }

    let chrom = regions.regions[0].chr.clone();
    for region in regions {
        if region.chr != chrom {
            return Err(CovmatError::Config(format!(
                "region set spans {} and {}; quantification is per-chromosome",
                chrom, region.chr
            )));
        }
        if region.start >= region.end || region.end > regions.seq_length {
            return Err(CovmatError::Config(format!(
                "region {}:{}-{} is outside the {}-base sequence",
                region.chr, region.start, region.end, regions.seq_length
            )));
        }
    }

    quantify(sources, &samples, &norms, regions, &chrom, config)
}

fn sample_labels(
    sources: &[Box<dyn CoverageSource>],
    sample_names: Option<&[String]>,
) -> Result<Vec<String>> {
    if sources.is_empty() {
        return Err(CovmatError::Config(
            "at least one sample source is required".to_string(),
        ));
    }
    match sample_names {
        None => Ok(sources.iter().map(|s| s.label().to_string()).collect()),
        Some(names) if names.len() == sources.len() => Ok(names.to_vec()),
        Some(names) => Err(CovmatError::Config(format!(
            "{} sample names for {} sources",
            names.len(),
            sources.len()
        ))),
    }
}

fn sample_norms(config: &MatrixConfig, n_samples: usize) -> Vec<SampleNorm> {
    let read_lengths = resolve_read_lengths(&config.read_length, n_samples);
    (0..n_samples)
        .map(|idx| {
            let total = config.totals.as_ref().map(|t| t[idx]);
            SampleNorm {
                scale_factor: total
                    .map(|t| library_scale(t, config.target_size))
                    .unwrap_or(1.0),
                read_length: read_lengths[idx],
                depth_millions: if config.rpkm {
                    total.map(|t| t / 1_000_000.0)
                } else {
                    None
                },
            }
        })
        .collect()
}

/// Filter, cluster, and quantify one chromosome.
fn call_and_quantify(
    sources: &[Box<dyn CoverageSource>],
    samples: &[String],
    norms: &[SampleNorm],
    chrom: &str,
    config: &MatrixConfig,
) -> Result<ChromRegionMatrix> {
    let length = sources[0].chrom_length(chrom)?;

    // Inner fan-out: all samples' signals for this chromosome.
    let signals = map_ordered(sources, config.sample_workers, |source| {
        source.coverage(chrom, None)
    })?;
    let table = CoverageTable::new(chrom, length, samples.to_vec(), signals)?;
    let filtered = filter_coverage(&table, config.cutoff, FilterMode::Any)?;
    // The full per-sample signals are no longer needed; quantification
    // re-reads only the chunk windows it touches.
    drop(table);

    let result = match filtered.and_then(|f| find_regions(&f.mask, chrom, config.max_gap)) {
        None => None,
        Some(regions) => {
            let matrix = quantify(sources, samples, norms, &regions, chrom, config)?;
            Some(RegionMatrix { regions, matrix })
        }
    };
    Ok(ChromRegionMatrix {
        chrom: chrom.to_string(),
        result,
    })
}

/// Build the coverage matrix for a fixed region set, chunk by chunk.
fn quantify(
    sources: &[Box<dyn CoverageSource>],
    samples: &[String],
    norms: &[SampleNorm],
    regions: &RegionSet,
    chrom: &str,
    config: &MatrixConfig,
) -> Result<CoverageMatrix> {
    let n_samples = sources.len();
    if regions.is_empty() {
        return Ok(CoverageMatrix {
            samples: samples.to_vec(),
            values: Array2::zeros((0, n_samples)),
        });
    }

    let mut chunks = Vec::new();
    for range in chunk_ranges(regions.len(), config.chunk_size) {
        let chunk = RegionSet::new(regions.regions[range].to_vec(), regions.seq_length);
        // The bounding window of the chunk; each sample is re-read over
        // this window only.
        let span_start = chunk
            .regions
            .iter()
            .map(|r| r.start)
            .min()
            .expect("chunk ranges are never empty");
        let span_end = chunk
            .regions
            .iter()
            .map(|r| r.end)
            .max()
            .expect("chunk ranges are never empty");

        let indices: Vec<usize> = (0..n_samples).collect();
        let columns = map_ordered(&indices, config.sample_workers, |&idx| {
            let signal = sources[idx].coverage(chrom, Some((span_start, span_end)))?;
            Ok(region_values(&chunk, &signal, span_start, &norms[idx]))
        })?;
        chunks.push(column_bind(&columns)?);
    }

    let values = stack_chunks(&chunks, n_samples)?;
    Ok(CoverageMatrix {
        samples: samples.to_vec(),
        values,
    })
}
