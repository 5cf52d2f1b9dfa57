//! # dring-sdp-core
//!
//! The session description model of the call engine.
//!
//! - [`document`]: the structured offer/answer document and its wire rendering
//! - [`parser`]: `nom` based parsing of received documents
//! - [`builder`]: offer and answer composition following the RFC 3264
//!   media-count and type-ordering rules
//! - [`negotiation`]: pairing of local and remote documents into the active
//!   (negotiated) media descriptions
//!
//! ```
//! use dring_media_core::{MediaAttribute, MediaDirection};
//! use dring_sdp_core::{negotiate, SdpBuilder, SessionDocument, TransportSlot};
//!
//! let alice = SdpBuilder::new("alice", 1, "10.0.0.1".parse().unwrap());
//! let bob = SdpBuilder::new("bob", 2, "10.0.0.2".parse().unwrap());
//!
//! let offer = alice
//!     .build_offer(&[MediaAttribute::audio()], &[TransportSlot::new("10.0.0.1".parse().unwrap(), 4000)])
//!     .unwrap();
//! let received: SessionDocument = offer.to_string().parse().unwrap();
//! let answer = bob
//!     .build_answer(&received, &[MediaAttribute::audio()], &[TransportSlot::new("10.0.0.2".parse().unwrap(), 5000)])
//!     .unwrap();
//!
//! let active = negotiate(&offer, &answer).unwrap();
//! assert_eq!(active.descriptions(true)[0].direction, MediaDirection::SendRecv);
//! ```

pub mod builder;
pub mod document;
pub mod error;
pub mod negotiation;
pub mod parser;

pub use builder::{SdpBuilder, TransportSlot};
pub use document::{Attribute, Candidate, MediaLine, Origin, SessionDocument, TransportProtocol};
pub use error::{NegotiationError, Result, SdpError};
pub use negotiation::{negotiate, ActiveMedia, MediaSlot};
pub use parser::parse_session_document;
