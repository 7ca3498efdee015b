//! Precomputed per-base signal read from bigWig files.

use bigtools::utils::reopen::ReopenableFile;
use bigtools::{BBIRead, BigWigRead};

use crate::errors::{CovmatError, Result};
use crate::signal::Rle;
use crate::sources::retry::RetryPolicy;
use crate::sources::{resolve_range, CoverageSource};

/// A bigWig-backed coverage source. The file is re-opened on every read
/// attempt, so a handle invalidated by a dropped network mount does not
/// poison later attempts; every read runs under the retry policy.
pub struct BigWigSource {
    path: String,
    retry: RetryPolicy,
}

impl BigWigSource {
    pub fn new(path: impl Into<String>) -> Self {
        BigWigSource {
            path: path.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn open(&self) -> Result<BigWigRead<ReopenableFile>> {
        BigWigRead::open_file(&self.path).map_err(|e| CovmatError::Read {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn read_error(&self, e: impl ToString) -> CovmatError {
        CovmatError::Read {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }

    fn length_from_header(&self, bw: &BigWigRead<ReopenableFile>, chrom: &str) -> Result<u32> {
        let chroms = bw.chroms();
        match chroms.iter().find(|c| c.name == chrom) {
            Some(info) => Ok(info.length),
            None => Err(CovmatError::UnknownChromosome {
                name: chrom.to_string(),
                valid: chroms.iter().map(|c| c.name.clone()).collect(),
            }),
        }
    }
}

impl CoverageSource for BigWigSource {
    fn label(&self) -> &str {
        &self.path
    }

    fn chrom_length(&self, chrom: &str) -> Result<u32> {
        self.retry.run(|| {
            let bw = self.open()?;
            self.length_from_header(&bw, chrom)
        })
    }

    fn coverage(&self, chrom: &str, range: Option<(u32, u32)>) -> Result<Rle<f64>> {
        self.retry.run(|| {
            let mut bw = self.open()?;
            let length = self.length_from_header(&bw, chrom)?;
            let (start, end) = resolve_range(range, length, chrom)?;

            let mut signal = Rle::new();
            let mut pos = start;
            let intervals = bw
                .get_interval(chrom, start, end)
                .map_err(|e| self.read_error(e))?;
            for entry in intervals {
                let value = entry.map_err(|e| self.read_error(e))?;
                // Stored intervals may overhang the query; clamp, and
                // zero-fill any gap since the previous interval.
                let lo = value.start.max(pos);
                let hi = value.end.min(end);
                if hi <= lo {
                    continue;
                }
                signal.push_run(0.0, lo - pos);
                signal.push_run(f64::from(value.value), hi - lo);
                pos = hi;
            }
            signal.push_run(0.0, end - pos);
            Ok(signal)
        })
    }
}
