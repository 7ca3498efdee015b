use thiserror::Error;

/// Errors produced by the coverage engine.
///
/// Configuration errors and retry exhaustion abort a whole batch.
/// Degenerate data (nothing passes the filter, an empty region set) is
/// never an error; those cases are explicit `None`/empty values at the
/// call sites that produce them.
#[derive(Error, Debug)]
pub enum CovmatError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown chromosome '{name}'; valid chromosomes are: {}", .valid.join(", "))]
    UnknownChromosome { name: String, valid: Vec<String> },

    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("giving up after {attempts} read attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("matrix assembly error: {0}")]
    Assembly(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CovmatError {
    /// Whether a failed read is worth another attempt. Configuration
    /// problems never are; anything that touched the underlying file is.
    pub fn is_transient(&self) -> bool {
        matches!(self, CovmatError::Read { .. } | CovmatError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, CovmatError>;
