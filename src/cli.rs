use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{arg, Arg, ArgMatches, Command};

use crate::common::utils::read_chromosome_sizes;
use crate::matrix::ReadLength;
use crate::pipeline::{region_matrix, MatrixConfig};
use crate::sources::{BamSource, BedGraphSource, BigWigSource, CoverageSource};

pub mod consts {
    pub const MATRIX_CMD: &str = "matrix";
    pub const DEFAULT_OUT_PREFIX: &str = "covmat_";
}

pub fn create_matrix_cli() -> Command {
    Command::new(consts::MATRIX_CMD)
        .author("Databio")
        .about("Call candidate regions from per-sample coverage and build a region-by-sample matrix.")
        .arg(
            Arg::new("sources")
                .required(true)
                .num_args(1..)
                .help("Sample coverage files, in column order: bigWig, indexed BAM, or bedGraph"),
        )
        .arg(arg!(--chroms <chroms> "Comma-separated chromosome names to process").required(true))
        .arg(arg!(--cutoff <cutoff> "Coverage a position must exceed to pass").required(true))
        .arg(arg!(--maxgap <maxgap> "Maximum gap merged between passing runs (default 300)"))
        .arg(arg!(--readlen <readlen> "Read-length divisor L: one value or comma-separated per sample"))
        .arg(arg!(--totals <totals> "Comma-separated per-sample total mapped signal"))
        .arg(arg!(--"target-size" <size> "Library-size normalization target (default 40000000)"))
        .arg(arg!(--rpkm "Normalize aggregates by region width and sequencing depth"))
        .arg(arg!(--chunksize <chunksize> "Regions quantified per assembly chunk (default 1000)"))
        .arg(arg!(--cores <cores> "Chromosome-level workers (default 1)"))
        .arg(arg!(--"file-cores" <cores> "Sample-level workers within a chromosome (default 1)"))
        .arg(arg!(--"chrom-sizes" <path> "Chrom-sizes file, required for bedGraph inputs"))
        .arg(arg!(--"exclude-gaps" "Do not count bases BAM alignments span via deletion/skip ops"))
        .arg(arg!(--names <names> "Comma-separated sample display names"))
        .arg(arg!(--"out-prefix" <prefix> "Output path prefix (default 'covmat_')"))
}

pub mod handlers {
    use super::*;

    fn parse_list<T: std::str::FromStr>(raw: &str, what: &str) -> Result<Vec<T>> {
        raw.split(',')
            .map(|s| {
                s.trim()
                    .parse::<T>()
                    .ok()
                    .with_context(|| format!("could not parse {} entry '{}'", what, s))
            })
            .collect()
    }

    fn build_source(
        path: &str,
        chrom_sizes: Option<&HashMap<String, u32>>,
        exclude_gaps: bool,
    ) -> Result<Box<dyn CoverageSource>> {
        let trimmed = path.strip_suffix(".gz").unwrap_or(path);
        let ext = Path::new(trimmed)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "bw" | "bigwig" => Ok(Box::new(BigWigSource::new(path))),
            "bam" => Ok(Box::new(BamSource::new(path).exclude_gap_bases(exclude_gaps))),
            "bedgraph" | "bdg" | "bg" => {
                let sizes = chrom_sizes
                    .context("--chrom-sizes is required for bedGraph inputs")?;
                Ok(Box::new(BedGraphSource::new(path, sizes.clone())))
            }
            _ => anyhow::bail!(
                "unsupported coverage source '{}': expected .bw, .bam, or .bedGraph",
                path
            ),
        }
    }

    pub fn run_matrix(matches: &ArgMatches) -> Result<()> {
        let paths: Vec<String> = matches
            .get_many::<String>("sources")
            .expect("sources are required")
            .cloned()
            .collect();

        let chroms: Vec<String> = matches
            .get_one::<String>("chroms")
            .expect("chroms are required")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let cutoff: f64 = matches
            .get_one::<String>("cutoff")
            .expect("a cutoff is required")
            .parse()
            .context("could not parse --cutoff")?;

        let chrom_sizes = match matches.get_one::<String>("chrom-sizes") {
            Some(path) => Some(read_chromosome_sizes(Path::new(path))?),
            None => None,
        };

        let exclude_gaps = matches.get_flag("exclude-gaps");
        let sources = paths
            .iter()
            .map(|p| build_source(p, chrom_sizes.as_ref(), exclude_gaps))
            .collect::<Result<Vec<_>>>()?;

        let mut config = MatrixConfig::new(cutoff);
        if let Some(raw) = matches.get_one::<String>("maxgap") {
            config.max_gap = raw.parse().context("could not parse --maxgap")?;
        }
        if let Some(raw) = matches.get_one::<String>("readlen") {
            let lens: Vec<f64> = parse_list(raw, "--readlen")?;
            config.read_length = if lens.len() == 1 {
                ReadLength::Uniform(lens[0])
            } else {
                ReadLength::PerSample(lens)
            };
        }
        if let Some(raw) = matches.get_one::<String>("totals") {
            config.totals = Some(parse_list(raw, "--totals")?);
        }
        if let Some(raw) = matches.get_one::<String>("target-size") {
            config.target_size = raw.parse().context("could not parse --target-size")?;
        }
        config.rpkm = matches.get_flag("rpkm");
        if let Some(raw) = matches.get_one::<String>("chunksize") {
            config.chunk_size = raw.parse().context("could not parse --chunksize")?;
        }
        if let Some(raw) = matches.get_one::<String>("cores") {
            config.chrom_workers = raw.parse().context("could not parse --cores")?;
        }
        if let Some(raw) = matches.get_one::<String>("file-cores") {
            config.sample_workers = raw.parse().context("could not parse --file-cores")?;
        }

        let names: Option<Vec<String>> = matches
            .get_one::<String>("names")
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect());

        let default_prefix = consts::DEFAULT_OUT_PREFIX.to_string();
        let prefix = matches
            .get_one::<String>("out-prefix")
            .unwrap_or(&default_prefix);

        let results = region_matrix(&sources, names.as_deref(), &chroms, &config)?;

        for entry in results {
            match entry.result {
                None => {
                    log::info!("{}: no candidate regions", entry.chrom);
                }
                Some(rm) => {
                    let bed_path = format!("{}{}.regions.bed", prefix, entry.chrom);
                    let tsv_path = format!("{}{}.matrix.tsv", prefix, entry.chrom);
                    rm.regions.to_bed(Path::new(&bed_path))?;
                    rm.matrix.write_tsv(&rm.regions, Path::new(&tsv_path))?;
                    log::info!(
                        "{}: {} regions x {} samples written to {} and {}",
                        entry.chrom,
                        rm.regions.len(),
                        rm.matrix.n_samples(),
                        bed_path,
                        tsv_path
                    );
                }
            }
        }

        Ok(())
    }
}
