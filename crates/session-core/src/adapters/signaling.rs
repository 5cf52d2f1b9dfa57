//! Signaling transport adapter
//!
//! Outbound offers, answers and hang ups are handed to the
//! [`SignalingTransport`]. Inbound traffic comes back through the
//! `handle_*` hooks of [`CallManager`](crate::CallManager).

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, CallId};

/// Message the engine asks the signaling layer to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundMessage {
    /// Initial offer
    Invite {
        account_id: AccountId,
        peer_uri: String,
        sdp: String,
    },
    /// Answer to the initial offer
    Answer { sdp: String },
    /// Mid-call offer
    ReInvite { sdp: String },
    /// Answer to a mid-call offer
    ReInviteAnswer { sdp: String },
    /// Refusal of a mid-call offer that crossed one of ours (491)
    ReInviteRejected,
    /// Terminate the call (BYE, or a final error response to an unanswered
    /// INVITE)
    Bye,
}

impl OutboundMessage {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundMessage::Invite { .. } => "INVITE",
            OutboundMessage::Answer { .. } => "ANSWER",
            OutboundMessage::ReInvite { .. } => "RE-INVITE",
            OutboundMessage::ReInviteAnswer { .. } => "RE-INVITE ANSWER",
            OutboundMessage::ReInviteRejected => "RE-INVITE REJECTED",
            OutboundMessage::Bye => "BYE",
        }
    }

    pub fn sdp(&self) -> Option<&str> {
        match self {
            OutboundMessage::Invite { sdp, .. }
            | OutboundMessage::Answer { sdp }
            | OutboundMessage::ReInvite { sdp }
            | OutboundMessage::ReInviteAnswer { sdp } => Some(sdp),
            OutboundMessage::ReInviteRejected | OutboundMessage::Bye => None,
        }
    }
}

/// Delivery of outbound messages.
///
/// Implementations must not call back into the engine from `send`. Delivery
/// failures are reported through `CallManager::handle_transport_failure`.
pub trait SignalingTransport: Send + Sync {
    fn send(&self, call_id: &CallId, message: OutboundMessage);
}
