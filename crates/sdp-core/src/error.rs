//! Error types for SDP handling and media negotiation

use dring_media_core::MediaType;
use thiserror::Error;

/// Result type alias for SDP operations
pub type Result<T> = std::result::Result<T, SdpError>;

/// Errors raised while building or parsing session descriptions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdpError {
    /// Malformed line in a received document
    #[error("SDP parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A mandatory field is absent
    #[error("Missing mandatory SDP field: {0}")]
    MissingField(&'static str),

    /// A media line of a kind the engine cannot pair positionally
    #[error("Unsupported media type at line {line}: {media}")]
    UnsupportedMedia { line: usize, media: String },

    /// The answer being built does not have one line per offered line
    #[error("Answer has {answer} media lines but the offer has {offer}")]
    AnswerMediaCount { offer: usize, answer: usize },

    /// The answer being built changes the media type of an offered line
    #[error("Answer media @ index {index} is {answer} but the offer has {offer}")]
    AnswerMediaType {
        index: usize,
        offer: MediaType,
        answer: MediaType,
    },

    /// No transport address was supplied for an enabled line
    #[error("No transport slot for media @ index {index}")]
    MissingTransport { index: usize },
}

impl SdpError {
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }

    /// Errors that reveal a bug in the caller rather than a network condition
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            SdpError::AnswerMediaCount { .. }
                | SdpError::AnswerMediaType { .. }
                | SdpError::MissingTransport { .. }
        )
    }
}

/// Reasons a local and a remote document cannot be negotiated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("Local document has {local} media lines but the remote has {remote}")]
    MediaCountMismatch { local: usize, remote: usize },

    #[error("Media @ index {index} is {local} locally but {remote} remotely")]
    MediaTypeMismatch {
        index: usize,
        local: MediaType,
        remote: MediaType,
    },

    /// Every media line was rejected, there is no usable stream
    #[error("All {count} media lines were rejected")]
    AllMediaRejected { count: usize },

    #[error("Session description has no media line")]
    NoMedia,
}
