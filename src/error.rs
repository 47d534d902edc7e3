use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::CatalogVersion;

/// Failures while loading or sampling a pair catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog {path} unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog {path} malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("catalog for {version} is empty")]
    Empty { version: CatalogVersion },

    #[error("no catalog loaded for {version}")]
    NotLoaded { version: CatalogVersion },
}

/// Failures scoped to a single task invocation.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid request uri {uri}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("task cut off by the end of the run")]
    Cancelled,
}
