//! # dring
//!
//! Call session and media negotiation engine.
//!
//! This crate re-exports the engine's building blocks:
//!
//! - [`media_core`]: per-stream media intents, negotiated descriptions and
//!   direction resolution
//! - [`sdp_core`]: offer/answer documents, their wire form and negotiation
//! - [`session_core`]: call sessions, renegotiation and the [`CallManager`]
//!   API
//!
//! Most applications only need the [`prelude`].
//!
//! ```
//! use std::sync::Arc;
//! use dring::prelude::*;
//!
//! struct Wire;
//!
//! impl SignalingTransport for Wire {
//!     fn send(&self, _call_id: &CallId, _message: OutboundMessage) {}
//! }
//!
//! let config = EngineConfig::from_yaml_str("accounts:\n  - account_id: alice\n").unwrap();
//! let manager = CallManager::new(config, Arc::new(Wire)).unwrap();
//! let mut signals = manager.subscribe();
//!
//! let audio = MediaAttribute::audio().to_media_map();
//! let call_id = manager.place_call_with_media("alice", "sip:bob@example.com", &[audio]).unwrap();
//! assert!(matches!(
//!     signals.try_recv(),
//!     Some(Signal::StateChange { state: CallState::Ringing, .. })
//! ));
//! # let _ = call_id;
//! ```

pub use dring_media_core as media_core;
pub use dring_sdp_core as sdp_core;
pub use dring_session_core as session_core;

pub use dring_session_core::CallManager;

pub mod prelude {
    pub use dring_media_core::{MediaAttribute, MediaDescription, MediaDirection, MediaMap, MediaType};
    pub use dring_sdp_core::{ActiveMedia, MediaSlot, SessionDocument};
    pub use dring_session_core::adapters::{
        MediaPipeline, NullMediaPipeline, OutboundMessage, PortRangeTransport, SignalingTransport,
        TransportProvider,
    };
    pub use dring_session_core::logging::{setup_logging, LogFormat, LoggingConfig};
    pub use dring_session_core::{
        AccountConfig, CallId, CallManager, CallState, ChangeOutcome, EngineConfig, MediaChangePolicy,
        NegotiationStatus, Result, SessionError, Signal, SignalSubscriber,
    };
}
