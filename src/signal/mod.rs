//! Run-length encoded genomic signals.
//!
//! Per-base coverage along a chromosome is long stretches of identical
//! values, so the engine never materializes one number per position.
//! [`Rle`] stores an ordered sequence of `(value, run_length)` pairs in
//! canonical form: no zero-length runs, no two adjacent runs with equal
//! values. The total run length equals the length of the genomic domain
//! the signal was produced over.

pub mod filter;

pub use filter::{filter_coverage, FilterMode, FilteredCoverage};

use crate::errors::{CovmatError, Result};

/// A run-length encoded sequence over a genomic coordinate domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Rle<T> {
    runs: Vec<(T, u32)>,
    len: u64,
}

impl<T: Copy + PartialEq> Default for Rle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + PartialEq> Rle<T> {
    pub fn new() -> Self {
        Rle {
            runs: Vec::new(),
            len: 0,
        }
    }

    /// Append a run, preserving canonical form: zero-length runs are
    /// dropped and a run equal in value to the current tail extends it.
    pub fn push_run(&mut self, value: T, length: u32) {
        if length == 0 {
            return;
        }
        self.len += u64::from(length);
        if let Some(last) = self.runs.last_mut() {
            if last.0 == value {
                last.1 += length;
                return;
            }
        }
        self.runs.push((value, length));
    }

    /// Build from a dense per-position slice. Only used for small
    /// windows and tests; real signals come in as runs.
    pub fn from_dense(values: &[T]) -> Self {
        let mut rle = Rle::new();
        for &v in values {
            rle.push_run(v, 1);
        }
        rle
    }

    pub fn runs(&self) -> &[(T, u32)] {
        &self.runs
    }

    /// Number of genomic positions covered (not the number of runs).
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value at a single 0-based position.
    pub fn get(&self, pos: u64) -> Option<T> {
        if pos >= self.len {
            return None;
        }
        let mut offset = 0u64;
        for &(value, length) in &self.runs {
            offset += u64::from(length);
            if pos < offset {
                return Some(value);
            }
        }
        None
    }

    /// Apply `f` to every run value. The result is re-canonicalized,
    /// since `f` may map distinct values onto the same one.
    pub fn map<U, F>(&self, f: F) -> Rle<U>
    where
        U: Copy + PartialEq,
        F: Fn(T) -> U,
    {
        let mut out = Rle::new();
        for &(value, length) in &self.runs {
            out.push_run(f(value), length);
        }
        out
    }

    /// Combine two signals over the same coordinate domain, run by run.
    /// Domain lengths must match; that alignment is the caller's
    /// precondition for every cross-signal operation.
    pub fn zip_with<U, V, F>(&self, other: &Rle<U>, f: F) -> Result<Rle<V>>
    where
        U: Copy + PartialEq,
        V: Copy + PartialEq,
        F: Fn(T, U) -> V,
    {
        if self.len != other.len {
            return Err(CovmatError::Config(format!(
                "signal domain mismatch: {} vs {} positions",
                self.len, other.len
            )));
        }
        let mut out = Rle::new();
        let mut a_iter = self.runs.iter().copied();
        let mut b_iter = other.runs.iter().copied();
        let mut a = a_iter.next();
        let mut b = b_iter.next();
        while let (Some((va, la)), Some((vb, lb))) = (a, b) {
            let take = la.min(lb);
            out.push_run(f(va, vb), take);
            a = if la > take {
                Some((va, la - take))
            } else {
                a_iter.next()
            };
            b = if lb > take {
                Some((vb, lb - take))
            } else {
                b_iter.next()
            };
        }
        Ok(out)
    }

    /// Sub-signal over `[start, end)` of the coordinate domain.
    pub fn slice(&self, start: u64, end: u64) -> Rle<T> {
        let end = end.min(self.len);
        let mut out = Rle::new();
        if start >= end {
            return out;
        }
        let mut offset = 0u64;
        for &(value, length) in &self.runs {
            let run_start = offset;
            let run_end = offset + u64::from(length);
            offset = run_end;
            if run_end <= start {
                continue;
            }
            if run_start >= end {
                break;
            }
            let lo = run_start.max(start);
            let hi = run_end.min(end);
            out.push_run(value, (hi - lo) as u32);
        }
        out
    }
}

impl Rle<f64> {
    /// Sum of value × run-length over the whole signal.
    pub fn total(&self) -> f64 {
        self.runs
            .iter()
            .map(|&(v, l)| v * f64::from(l))
            .sum()
    }

    /// Keep only positions where `mask` is true, concatenating the
    /// survivors into a signal over the reduced domain.
    pub fn select(&self, mask: &Rle<bool>) -> Result<Rle<f64>> {
        if self.len != mask.len {
            return Err(CovmatError::Config(format!(
                "mask domain mismatch: {} vs {} positions",
                mask.len, self.len
            )));
        }
        let mut out = Rle::new();
        let mut a_iter = self.runs.iter().copied();
        let mut b_iter = mask.runs.iter().copied();
        let mut a = a_iter.next();
        let mut b = b_iter.next();
        while let (Some((va, la)), Some((vb, lb))) = (a, b) {
            let take = la.min(lb);
            if vb {
                out.push_run(va, take);
            }
            a = if la > take {
                Some((va, la - take))
            } else {
                a_iter.next()
            };
            b = if lb > take {
                Some((vb, lb - take))
            } else {
                b_iter.next()
            };
        }
        Ok(out)
    }

    /// Prefix-sum index for O(log runs) range sums during aggregation.
    pub fn prefix(&self) -> RlePrefix {
        let mut cum_len = Vec::with_capacity(self.runs.len());
        let mut cum_sum = Vec::with_capacity(self.runs.len());
        let mut values = Vec::with_capacity(self.runs.len());
        let mut len = 0u64;
        let mut sum = 0f64;
        for &(v, l) in &self.runs {
            len += u64::from(l);
            sum += v * f64::from(l);
            cum_len.push(len);
            cum_sum.push(sum);
            values.push(v);
        }
        RlePrefix {
            cum_len,
            cum_sum,
            values,
        }
    }
}

impl Rle<bool> {
    /// Position-wise OR of two masks over the same domain.
    pub fn or(&self, other: &Rle<bool>) -> Result<Rle<bool>> {
        self.zip_with(other, |a, b| a || b)
    }

    /// Number of true positions.
    pub fn count_true(&self) -> u64 {
        self.runs
            .iter()
            .filter(|&&(v, _)| v)
            .map(|&(_, l)| u64::from(l))
            .sum()
    }

    /// Maximal runs of true positions as `(start, end)` half-open
    /// coordinate pairs, in position order.
    pub fn true_runs(&self) -> Vec<(u64, u64)> {
        let mut out = Vec::new();
        let mut offset = 0u64;
        for &(v, l) in &self.runs {
            let end = offset + u64::from(l);
            if v {
                out.push((offset, end));
            }
            offset = end;
        }
        out
    }
}

/// Cumulative sums over an [`Rle<f64>`]'s runs, answering range-sum
/// queries without touching individual positions.
pub struct RlePrefix {
    cum_len: Vec<u64>,
    cum_sum: Vec<f64>,
    values: Vec<f64>,
}

impl RlePrefix {
    /// Sum over positions `[0, pos)`.
    fn sum_to(&self, pos: u64) -> f64 {
        if pos == 0 {
            return 0.0;
        }
        let idx = self.cum_len.partition_point(|&l| l <= pos);
        if idx == self.cum_len.len() {
            return self.cum_sum.last().copied().unwrap_or(0.0);
        }
        let prev_len = if idx == 0 { 0 } else { self.cum_len[idx - 1] };
        let prev_sum = if idx == 0 { 0.0 } else { self.cum_sum[idx - 1] };
        prev_sum + self.values[idx] * (pos - prev_len) as f64
    }

    /// Sum over positions `[start, end)`.
    pub fn sum(&self, start: u64, end: u64) -> f64 {
        if end <= start {
            return 0.0;
        }
        self.sum_to(end) - self.sum_to(start)
    }
}

/// Per-sample coverage signals over one shared (chromosome, length)
/// domain. Sample order is input order and drives matrix column order.
#[derive(Debug, Clone)]
pub struct CoverageTable {
    pub chrom: String,
    pub length: u32,
    pub samples: Vec<String>,
    pub signals: Vec<Rle<f64>>,
}

impl CoverageTable {
    pub fn new(
        chrom: impl Into<String>,
        length: u32,
        samples: Vec<String>,
        signals: Vec<Rle<f64>>,
    ) -> Result<Self> {
        if samples.len() != signals.len() {
            return Err(CovmatError::Config(format!(
                "{} sample names for {} signals",
                samples.len(),
                signals.len()
            )));
        }
        let chrom = chrom.into();
        for (name, signal) in samples.iter().zip(&signals) {
            if signal.len() != u64::from(length) {
                return Err(CovmatError::Config(format!(
                    "signal for sample '{}' covers {} positions, expected {} on {}",
                    name,
                    signal.len(),
                    length,
                    chrom
                )));
            }
        }
        Ok(CoverageTable {
            chrom,
            length,
            samples,
            signals,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.signals.len()
    }

    /// Position-wise mean across samples.
    pub fn mean_signal(&self) -> Result<Rle<f64>> {
        if self.signals.is_empty() {
            return Err(CovmatError::Config(
                "cannot average a coverage table with no samples".to_string(),
            ));
        }
        let n = self.signals.len() as f64;
        let mut acc = self.signals[0].clone();
        for signal in &self.signals[1..] {
            acc = acc.zip_with(signal, |a, b| a + b)?;
        }
        Ok(acc.map(|v| v / n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn push_run_keeps_canonical_form() {
        let mut rle = Rle::new();
        rle.push_run(1.0, 3);
        rle.push_run(1.0, 2);
        rle.push_run(0.0, 0);
        rle.push_run(2.0, 1);
        assert_eq!(rle.runs(), &[(1.0, 5), (2.0, 1)]);
        assert_eq!(rle.len(), 6);
    }

    #[test]
    fn from_dense_compresses() {
        let rle = Rle::from_dense(&[0.0, 0.0, 5.0, 5.0, 5.0, 0.0]);
        assert_eq!(rle.runs(), &[(0.0, 2), (5.0, 3), (0.0, 1)]);
        assert_eq!(rle.get(2), Some(5.0));
        assert_eq!(rle.get(5), Some(0.0));
        assert_eq!(rle.get(6), None);
    }

    #[test]
    fn zip_with_merges_run_boundaries() {
        let a = Rle::from_dense(&[1.0, 1.0, 2.0, 2.0]);
        let b = Rle::from_dense(&[1.0, 3.0, 3.0, 1.0]);
        let sum = a.zip_with(&b, |x, y| x + y).unwrap();
        assert_eq!(sum.runs(), &[(2.0, 1), (4.0, 1), (5.0, 1), (3.0, 1)]);
    }

    #[test]
    fn zip_with_rejects_domain_mismatch() {
        let a = Rle::from_dense(&[1.0, 1.0]);
        let b = Rle::from_dense(&[1.0]);
        assert!(a.zip_with(&b, |x, y| x + y).is_err());
    }

    #[test]
    fn slice_clamps_and_compresses() {
        let rle = Rle::from_dense(&[0.0, 0.0, 5.0, 5.0, 6.0, 6.0]);
        let sub = rle.slice(1, 5);
        assert_eq!(sub.runs(), &[(0.0, 1), (5.0, 2), (6.0, 1)]);
        assert!(rle.slice(4, 4).is_empty());
        assert_eq!(rle.slice(4, 100).len(), 2);
    }

    #[test]
    fn prefix_sums_match_naive() {
        let rle = Rle::from_dense(&[0.0, 0.0, 5.0, 5.0, 5.0, 0.0, 6.0, 6.0, 0.0, 0.0]);
        let prefix = rle.prefix();
        let dense: Vec<f64> = (0..10).map(|i| rle.get(i).unwrap()).collect();
        for start in 0..10 {
            for end in start..=10 {
                let naive: f64 = dense[start as usize..end as usize].iter().sum();
                assert!((prefix.sum(start, end) - naive).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn select_restricts_to_mask() {
        let signal = Rle::from_dense(&[1.0, 2.0, 3.0, 4.0]);
        let mask = Rle::from_dense(&[false, true, true, false]);
        let reduced = signal.select(&mask).unwrap();
        assert_eq!(reduced.runs(), &[(2.0, 1), (3.0, 1)]);
        assert_eq!(reduced.len(), 2);
    }

    #[test]
    fn true_runs_reports_half_open_spans() {
        let mask = Rle::from_dense(&[false, true, true, false, true]);
        assert_eq!(mask.true_runs(), vec![(1, 3), (4, 5)]);
        assert_eq!(mask.count_true(), 3);
    }

    #[test]
    fn mean_signal_averages_samples() {
        let table = CoverageTable::new(
            "chr1",
            4,
            vec!["a".into(), "b".into()],
            vec![
                Rle::from_dense(&[2.0, 2.0, 0.0, 0.0]),
                Rle::from_dense(&[0.0, 2.0, 2.0, 0.0]),
            ],
        )
        .unwrap();
        let mean = table.mean_signal().unwrap();
        assert_eq!(mean.runs(), &[(1.0, 1), (2.0, 1), (1.0, 1), (0.0, 1)]);
    }

    #[test]
    fn table_rejects_length_mismatch() {
        let result = CoverageTable::new(
            "chr1",
            4,
            vec!["a".into()],
            vec![Rle::from_dense(&[1.0, 1.0])],
        );
        assert!(result.is_err());
    }
}
