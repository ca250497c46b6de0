//! Engine errors

use std::path::PathBuf;

use carto_css::CartoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project: {0}")]
    Project(#[from] serde_json::Error),

    #[error("invalid YAML project: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Carto(#[from] CartoError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
