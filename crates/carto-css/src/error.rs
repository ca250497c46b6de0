//! Error types
//!
//! Located errors raised while reading, flattening and materializing
//! stylesheets.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Position of a construct in a stylesheet file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Stylesheet file name as given by the project.
    pub file: Arc<str>,
    /// 1-based line number.
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<Arc<str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Errors produced by the stylesheet compiler.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartoError {
    #[error("{location}: {message}")]
    Parse {
        message: String,
        location: SourceLocation,
    },

    #[error("{location}: zoom level {level} is outside of 0..22")]
    InvalidZoom { level: i64, location: SourceLocation },

    #[error("{location}: variable '@{name}' is undefined")]
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    #[error("{location}: Unknown property '{property}'.")]
    UnknownProperty {
        property: String,
        location: SourceLocation,
    },

    #[error("{location}: A required property '{property}' is missing in {symbolizer}.")]
    MissingProperty {
        property: String,
        symbolizer: String,
        location: SourceLocation,
    },

    #[error("{location}: invalid value '{value}' for '{property}': {message}")]
    InvalidValue {
        property: String,
        value: String,
        message: String,
        location: SourceLocation,
    },

    #[error("operation '{operation}' is not implemented")]
    NotImplemented { operation: String },
}

impl CartoError {
    pub fn parse(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Parse {
            message: message.into(),
            location,
        }
    }

    /// Source location of the failing construct, if the error has one.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Parse { location, .. }
            | Self::InvalidZoom { location, .. }
            | Self::UndefinedVariable { location, .. }
            | Self::UnknownProperty { location, .. }
            | Self::MissingProperty { location, .. }
            | Self::InvalidValue { location, .. } => Some(location),
            Self::NotImplemented { .. } => None,
        }
    }
}

/// Result alias used across the stylesheet crates.
pub type Result<T> = std::result::Result<T, CartoError>;
