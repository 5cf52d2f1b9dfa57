//! Error types for call sessions

use dring_media_core::MediaError;
use dring_sdp_core::{NegotiationError, SdpError};
use thiserror::Error;

use crate::state_table::CallEvent;
use crate::types::{CallId, CallState};

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors returned by the call engine
#[derive(Debug, Error)]
pub enum SessionError {
    /// Caller bug, e.g. an answer whose media lines do not match the offer.
    /// Refused before any state change or signal.
    #[error("Programming error: {0}")]
    Programming(String),

    /// The offer/answer exchange produced no usable media
    #[error("Negotiation failed: {0}")]
    NegotiationFailure(#[from] NegotiationError),

    /// Operation not allowed in the current call state
    #[error("Invalid state transition: {event} not allowed in state {state}")]
    InvalidStateTransition { state: CallState, event: CallEvent },

    #[error("Call not found: {call_id}")]
    CallNotFound { call_id: String },

    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: String },

    #[error("Invalid media list: {0}")]
    InvalidMediaList(String),

    /// Another offer/answer exchange is outstanding for the call
    #[error("Media renegotiation already in progress for call {call_id}")]
    RenegotiationInProgress { call_id: String },

    /// Malformed session description received from the peer
    #[error("SDP error: {0}")]
    Sdp(SdpError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SdpError> for SessionError {
    fn from(err: SdpError) -> Self {
        if err.is_programming_error() {
            SessionError::Programming(err.to_string())
        } else {
            SessionError::Sdp(err)
        }
    }
}

impl SessionError {
    pub fn call_not_found(call_id: &CallId) -> Self {
        Self::CallNotFound {
            call_id: call_id.to_string(),
        }
    }

    pub fn account_not_found(account_id: impl Into<String>) -> Self {
        Self::AccountNotFound {
            account_id: account_id.into(),
        }
    }

    pub fn invalid_transition(state: CallState, event: CallEvent) -> Self {
        Self::InvalidStateTransition { state, event }
    }

    pub fn renegotiation_in_progress(call_id: &CallId) -> Self {
        Self::RenegotiationInProgress {
            call_id: call_id.to_string(),
        }
    }

    pub fn invalid_media_list(reason: impl Into<String>) -> Self {
        Self::InvalidMediaList(reason.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn is_programming_error(&self) -> bool {
        matches!(self, SessionError::Programming(_))
    }
}
