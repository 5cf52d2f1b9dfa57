use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a call, unique within a [`CallManager`](crate::CallManager)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account identifier, as configured in [`AccountConfig`](crate::config::AccountConfig)
pub type AccountId = String;

/// Call-control state
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallState {
    /// Created, nothing sent or received yet
    None,
    /// Offer sent or received, waiting for the answer
    Ringing,
    /// Answered, media flowing
    Current,
    /// Held by the local endpoint
    Hold,
    /// Media finished normally
    Over,
    /// Terminated by either endpoint
    Hungup,
    /// Negotiation or transport failure
    Failure,
}

impl CallState {
    /// Terminal states absorb every further event
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Over | CallState::Hungup | CallState::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::None => "NONE",
            CallState::Ringing => "RINGING",
            CallState::Current => "CURRENT",
            CallState::Hold => "HOLD",
            CallState::Over => "OVER",
            CallState::Hungup => "HUNGUP",
            CallState::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
