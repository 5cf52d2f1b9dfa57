//! Error types for media attribute handling

use thiserror::Error;

/// Result type alias for media-core operations
pub type Result<T> = std::result::Result<T, MediaError>;

/// Errors raised while interpreting client supplied media lists
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// A media map has no media type key
    #[error("Media @ index {index} has no {key} key")]
    MissingKey { index: usize, key: String },

    /// A key holds a value that cannot be interpreted
    #[error("Invalid value [{value}] for key {key} of media @ index {index}")]
    InvalidValue {
        index: usize,
        key: String,
        value: String,
    },

    /// A token could not be parsed as a media type
    #[error("Unknown media type: {0}")]
    UnknownMediaType(String),

    /// A token could not be parsed as a media direction
    #[error("Unknown media direction: {0}")]
    UnknownDirection(String),
}

impl MediaError {
    /// Create an invalid value error
    pub fn invalid_value(index: usize, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            index,
            key: key.into(),
            value: value.into(),
        }
    }
}
