//! The region × sample coverage matrix and its chunked assembly.

pub mod aggregate;

pub use aggregate::{
    library_scale, region_values, resolve_read_lengths, ReadLength, SampleNorm,
};

use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

use ndarray::{concatenate, Array2, Axis};

use crate::common::models::RegionSet;
use crate::errors::{CovmatError, Result};

/// A region × sample matrix: rows follow the region set's order, columns
/// follow sample input order.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMatrix {
    pub samples: Vec<String>,
    pub values: Array2<f64>,
}

impl CoverageMatrix {
    pub fn n_regions(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// Write the matrix as TSV with one row per region, labeled by the
    /// region's coordinates and stable id.
    pub fn write_tsv(&self, regions: &RegionSet, path: &Path) -> Result<()> {
        if regions.len() != self.n_regions() {
            return Err(CovmatError::Assembly(format!(
                "{} regions for a {}-row matrix",
                regions.len(),
                self.n_regions()
            )));
        }
        let mut file = File::create(path)?;
        writeln!(file, "region\tchr\tstart\tend\t{}", self.samples.join("\t"))?;
        for (idx, region) in regions.into_iter().enumerate() {
            let row: Vec<String> = self
                .values
                .row(idx)
                .iter()
                .map(|v| format!("{}", v))
                .collect();
            writeln!(
                file,
                "region_{}\t{}\t{}\t{}\t{}",
                idx + 1,
                region.chr,
                region.start,
                region.end,
                row.join("\t")
            )?;
        }
        Ok(())
    }
}

/// Split `n` rows into consecutive chunks of at most `chunk_size`.
pub fn chunk_ranges(n: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    let mut ranges = Vec::with_capacity(n.div_ceil(chunk_size));
    let mut start = 0;
    while start < n {
        let end = (start + chunk_size).min(n);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// Column-bind per-sample value vectors into one chunk matrix. All
/// columns must have the same length (one value per chunk region).
pub fn column_bind(columns: &[Vec<f64>]) -> Result<Array2<f64>> {
    let n_samples = columns.len();
    let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
    for column in columns {
        if column.len() != n_rows {
            return Err(CovmatError::Assembly(format!(
                "ragged chunk: column of {} values where {} were expected",
                column.len(),
                n_rows
            )));
        }
    }
    let mut matrix = Array2::zeros((n_rows, n_samples));
    for (col, column) in columns.iter().enumerate() {
        for (row, &value) in column.iter().enumerate() {
            matrix[[row, col]] = value;
        }
    }
    Ok(matrix)
}

/// Concatenate chunk matrices row-wise, preserving chunk order. An
/// empty chunk list yields the explicit 0 × `n_samples` matrix.
pub fn stack_chunks(chunks: &[Array2<f64>], n_samples: usize) -> Result<Array2<f64>> {
    if chunks.is_empty() {
        return Ok(Array2::zeros((0, n_samples)));
    }
    let views: Vec<_> = chunks.iter().map(|c| c.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| CovmatError::Assembly(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::models::Region;
    use pretty_assertions::assert_eq;

    #[test]
    fn chunk_ranges_cover_everything_in_order() {
        assert_eq!(chunk_ranges(5, 2), vec![0..2, 2..4, 4..5]);
        assert_eq!(chunk_ranges(4, 1000), vec![0..4]);
        assert!(chunk_ranges(0, 10).is_empty());
    }

    #[test]
    fn column_bind_lays_out_samples_as_columns() {
        let m = column_bind(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.shape(), &[2, 2]);
        assert_eq!(m[[0, 0]], 1.0);
        assert_eq!(m[[1, 0]], 2.0);
        assert_eq!(m[[0, 1]], 3.0);
        assert_eq!(m[[1, 1]], 4.0);
    }

    #[test]
    fn column_bind_rejects_ragged_columns() {
        assert!(column_bind(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn stacked_chunks_match_an_unsplit_build() {
        let whole = column_bind(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let top = column_bind(&[vec![1.0, 2.0], vec![4.0, 5.0]]).unwrap();
        let bottom = column_bind(&[vec![3.0], vec![6.0]]).unwrap();
        let stacked = stack_chunks(&[top, bottom], 2).unwrap();
        assert_eq!(stacked, whole);
    }

    #[test]
    fn empty_chunk_list_is_the_zero_row_matrix() {
        let m = stack_chunks(&[], 3).unwrap();
        assert_eq!(m.shape(), &[0, 3]);
    }

    #[test]
    fn tsv_export_labels_rows_with_region_ids() {
        let matrix = CoverageMatrix {
            samples: vec!["a".to_string(), "b".to_string()],
            values: column_bind(&[vec![1.5], vec![2.0]]).unwrap(),
        };
        let regions = RegionSet::new(
            vec![Region {
                chr: "chr1".to_string(),
                start: 10,
                end: 20,
            }],
            100,
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.tsv");
        matrix.write_tsv(&regions, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), "region\tchr\tstart\tend\ta\tb");
        assert_eq!(lines.next().unwrap(), "region_1\tchr1\t10\t20\t1.5\t2");
    }
}
