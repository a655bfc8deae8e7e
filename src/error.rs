use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the two survey extracts a structural problem was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Master,
    Linked,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Master => write!(f, "master"),
            TableKind::Linked => write!(f, "linked household"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("The {table} table is missing required columns: {}", .missing.join(", "))]
    MissingColumns {
        table: TableKind,
        missing: Vec<String>,
    },

    #[error("{} is {size} bytes, over the {limit}-byte input budget", .path.display())]
    InputTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
