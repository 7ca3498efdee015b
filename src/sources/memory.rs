//! Pre-materialized signals handed over by the caller.

use std::collections::HashMap;

use crate::errors::{CovmatError, Result};
use crate::signal::Rle;
use crate::sources::{resolve_range, CoverageSource};

/// A coverage source backed by in-memory signals keyed by chromosome.
/// This is the "pre-opened handle" input kind and the seam tests use to
/// drive the pipeline without touching disk.
pub struct MemorySource {
    label: String,
    signals: HashMap<String, Rle<f64>>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>) -> Self {
        MemorySource {
            label: label.into(),
            signals: HashMap::new(),
        }
    }

    pub fn with_signal(mut self, chrom: impl Into<String>, signal: Rle<f64>) -> Self {
        self.signals.insert(chrom.into(), signal);
        self
    }
}

impl CoverageSource for MemorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn chrom_length(&self, chrom: &str) -> Result<u32> {
        match self.signals.get(chrom) {
            Some(signal) => Ok(signal.len() as u32),
            None => {
                let mut valid: Vec<String> = self.signals.keys().cloned().collect();
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
        let signal = &self.signals[chrom];
        let (start, end) = resolve_range(range, length, chrom)?;
        Ok(signal.slice(u64::from(start), u64::from(end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serves_whole_chromosome_and_sub_ranges() {
        let source = MemorySource::new("sample_a")
            .with_signal("chr1", Rle::from_dense(&[0.0, 5.0, 5.0, 0.0]));

        assert_eq!(source.chrom_length("chr1").unwrap(), 4);
        assert_eq!(
            source.coverage("chr1", None).unwrap().runs(),
            &[(0.0, 1), (5.0, 2), (0.0, 1)]
        );
        assert_eq!(
            source.coverage("chr1", Some((1, 3))).unwrap().runs(),
            &[(5.0, 2)]
        );
    }

    #[test]
    fn unknown_chromosome_names_the_alternatives() {
        let source = MemorySource::new("sample_a")
            .with_signal("chr1", Rle::from_dense(&[1.0]));
        let err = source.chrom_length("chr9").unwrap_err();
        assert!(err.to_string().contains("chr1"));
    }
}
