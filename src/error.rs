// error.rs

use std::path::PathBuf;

/// Errors raised at the edges of the simulator: configuration, catalog
/// loading, the operator console and the CSV trace. Commands against the
/// running simulation never fail; they clamp or are ignored.
#[derive(Debug, thiserror::Error)]
pub enum TrafficError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("console I/O failed: {0}")]
    Console(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trace write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid catalog entry for intersection {id}: {reason}")]
    InvalidCatalog { id: u32, reason: String },

    #[error("duplicate intersection id {0} in catalog")]
    DuplicateIntersection(u32),

    #[error("could not parse command `{input}`: {reason}")]
    Parse { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, TrafficError>;
