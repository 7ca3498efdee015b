use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::errors::{CovmatError, Result};

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).map_err(|e| CovmatError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

/// Read a chrom-sizes file (`<name>\t<length>` per line) into a map.
/// Used to supply sequence lengths for sources whose format carries no
/// header metadata of its own.
pub fn read_chromosome_sizes(path: &Path) -> Result<HashMap<String, u32>> {
    let reader = get_dynamic_reader(path)?;
    let mut chrom_sizes = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let name = fields.next().ok_or_else(|| CovmatError::Read {
            path: path.display().to_string(),
            message: format!("malformed chrom sizes line: '{}'", line),
        })?;
        let size = fields
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| CovmatError::Read {
                path: path.display().to_string(),
                message: format!("malformed chrom sizes line: '{}'", line),
            })?;
        chrom_sizes.insert(name.to_string(), size);
    }

    Ok(chrom_sizes)
}
