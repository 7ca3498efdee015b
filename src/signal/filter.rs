//! Threshold filtering of coverage tables.
//!
//! Produces the boolean mask that the region clusterer consumes, plus the
//! signal values restricted to the masked positions. "Nothing passed" is
//! an explicit `None`, not an error: downstream stages treat it as "no
//! candidate regions" and keep processing sibling chromosomes.

use crate::errors::{CovmatError, Result};
use crate::signal::{CoverageTable, Rle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// A position passes when any sample's coverage exceeds the cutoff.
    Any,
    /// A position passes when the across-sample mean exceeds the cutoff.
    /// With a single-signal table this filters the signal as-is, which is
    /// how pre-averaged summary signals are handled.
    Mean,
}

/// Outcome of a filter pass over one chromosome.
#[derive(Debug, Clone)]
pub struct FilteredCoverage {
    /// Pass/fail per position, over the table's full coordinate domain.
    pub mask: Rle<bool>,
    /// Signal values restricted to masked positions: one entry per sample
    /// in `Any` mode, a single mean signal in `Mean` mode. Each covers
    /// exactly `passing` positions.
    pub coverage: Vec<Rle<f64>>,
    /// Number of positions that passed.
    pub passing: u64,
}

/// Apply `cutoff` to a coverage table. Comparison is strict
/// greater-than: a value equal to the cutoff does not pass.
pub fn filter_coverage(
    table: &CoverageTable,
    cutoff: f64,
    mode: FilterMode,
) -> Result<Option<FilteredCoverage>> {
    if table.signals.is_empty() {
        return Err(CovmatError::Config(
            "cannot filter a coverage table with no samples".to_string(),
        ));
    }

    let (mask, kept) = match mode {
        FilterMode::Any => {
            let mut mask = table.signals[0].map(|v| v > cutoff);
            for signal in &table.signals[1..] {
                mask = mask.or(&signal.map(|v| v > cutoff))?;
            }
            let kept = table
                .signals
                .iter()
                .map(|s| s.select(&mask))
                .collect::<Result<Vec<_>>>()?;
            (mask, kept)
        }
        FilterMode::Mean => {
            let mean = table.mean_signal()?;
            let mask = mean.map(|v| v > cutoff);
            let kept = vec![mean.select(&mask)?];
            (mask, kept)
        }
    };

    let passing = mask.count_true();
    if passing == 0 {
        return Ok(None);
    }
    Ok(Some(FilteredCoverage {
        mask,
        coverage: kept,
        passing,
    }))
}
