//! Signal bus
//!
//! Every observable outcome of the engine is published as a [`Signal`] on a
//! `tokio::sync::broadcast` channel. Peer dependent results (answers, media
//! change requests, hang ups) are only visible through signals.

use std::fmt;

use dring_media_core::MediaMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::types::{AccountId, CallId, CallState};

/// Result of an offer/answer exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationStatus {
    Success,
    Fail,
}

impl fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationStatus::Success => f.write_str("NEGOTIATION_SUCCESS"),
            NegotiationStatus::Fail => f.write_str("NEGOTIATION_FAIL"),
        }
    }
}

/// Events published by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    /// New incoming call with the media offered by the caller
    IncomingCallWithMedia {
        account_id: AccountId,
        call_id: CallId,
        peer_uri: String,
        media: Vec<MediaMap>,
    },

    /// The call entered a new state
    StateChange {
        account_id: AccountId,
        call_id: CallId,
        state: CallState,
    },

    /// The peer offered a media change that the application must answer
    /// with `answer_media_change_request`
    MediaChangeRequested {
        account_id: AccountId,
        call_id: CallId,
        media: Vec<MediaMap>,
    },

    MediaNegotiationStatus {
        call_id: CallId,
        status: NegotiationStatus,
    },

    /// The local video stream was muted or unmuted by a committed negotiation
    VideoMuted { call_id: CallId, muted: bool },
}

impl Signal {
    pub fn call_id(&self) -> &CallId {
        match self {
            Signal::IncomingCallWithMedia { call_id, .. }
            | Signal::StateChange { call_id, .. }
            | Signal::MediaChangeRequested { call_id, .. }
            | Signal::MediaNegotiationStatus { call_id, .. }
            | Signal::VideoMuted { call_id, .. } => call_id,
        }
    }
}

/// Sending half shared by every session of a manager
#[derive(Debug, Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<Signal>,
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, signal: Signal) {
        trace!("Publishing signal {:?}", signal);
        if self.sender.send(signal).is_err() {
            trace!("No subscriber for signal");
        }
    }

    pub fn subscribe(&self) -> SignalSubscriber {
        SignalSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving half returned by `CallManager::subscribe`
#[derive(Debug)]
pub struct SignalSubscriber {
    receiver: broadcast::Receiver<Signal>,
}

impl SignalSubscriber {
    /// Wait for the next signal. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Signal> {
        loop {
            match self.receiver.recv().await {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Signal subscriber lagged, {} signal(s) dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Signal> {
        loop {
            match self.receiver.try_recv() {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Signal subscriber lagged, {} signal(s) dropped", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    /// Everything published since the last read
    pub fn drain(&mut self) -> Vec<Signal> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
