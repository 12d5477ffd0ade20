use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot compare results of different tests: {old} vs {new}")]
    NameMismatch { old: String, new: String },
    #[error("delta threshold must be a finite, non-negative number (got {0})")]
    InvalidThreshold(f64),
}

impl Error {
    pub fn io<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn name_mismatch<A: Into<String>, B: Into<String>>(old: A, new: B) -> Self {
        Error::NameMismatch {
            old: old.into(),
            new: new.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
