//! # dring-session-core
//!
//! Call sessions of the dring call engine: the call-control state machine,
//! offer/answer handling for call setup and mid-call renegotiation, and the
//! [`CallManager`] API on top of them.
//!
//! ## Architecture
//!
//! - [`state_table`]: every state change is a `(Role, CallState, CallEvent)`
//!   lookup in a static table of transitions and their effects
//! - [`session`]: one [`CallSession`] per call, owning its media intents,
//!   documents and active descriptions
//! - [`renegotiation`]: mid-call media changes, hold/resume and policies
//!   for re-offers received from the peer
//! - [`registry`]: concurrent map of live sessions
//! - [`signals`]: broadcast bus carrying every observable outcome
//! - [`adapters`]: seams to signaling, media and transport collaborators
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use dring_session_core::adapters::{OutboundMessage, SignalingTransport};
//! use dring_session_core::{AccountConfig, CallId, CallManager, CallState, EngineConfig};
//!
//! struct Wire;
//!
//! impl SignalingTransport for Wire {
//!     fn send(&self, _call_id: &CallId, message: OutboundMessage) {
//!         println!("{}", message.name());
//!     }
//! }
//!
//! let config = EngineConfig::default().with_account(AccountConfig::new("alice"));
//! let manager = CallManager::new(config, Arc::new(Wire)).unwrap();
//!
//! let call_id = manager
//!     .place_call_with_media("alice", "sip:bob@example.com", &[])
//!     .unwrap();
//! assert_eq!(manager.get_call_state(&call_id).unwrap(), CallState::Ringing);
//! ```

pub mod adapters;
pub mod config;
pub mod errors;
pub mod logging;
pub mod manager;
pub mod registry;
pub mod renegotiation;
pub mod session;
pub mod signals;
pub mod state_table;
pub mod types;

pub use config::{AccountConfig, EngineConfig};
pub use errors::{Result, SessionError};
pub use manager::CallManager;
pub use registry::{SessionHandle, SessionRegistry};
pub use renegotiation::{
    ChangeOutcome, MediaChangeDecision, MediaChangePolicy, MirrorOfferPolicy, RenegotiationCoordinator,
    StableMediaPolicy,
};
pub use session::{CallSession, OfferKind, PendingOffer, SessionContext};
pub use signals::{NegotiationStatus, Signal, SignalBus, SignalSubscriber};
pub use state_table::{CallEvent, Effect, Role};
pub use types::{AccountId, CallId, CallState};
