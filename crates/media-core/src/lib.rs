//! # dring-media-core
//!
//! Leaf types of the call engine: the per-stream [`MediaAttribute`] intent
//! carried in offers and answers, the negotiated [`MediaDescription`], and the
//! [`direction`] resolver that turns local and remote intents into the
//! negotiated transmit/receive direction of every media line.
//!
//! ```
//! use dring_media_core::{direction, MediaAttribute, MediaDirection};
//!
//! let caller = MediaAttribute::video().with_muted(true);
//! let callee = MediaAttribute::video();
//!
//! let local = direction::infer_initial_direction(&caller);
//! let remote = direction::infer_initial_direction(&callee);
//!
//! assert_eq!(local, MediaDirection::RecvOnly);
//! assert_eq!(
//!     direction::infer_negotiated_direction(local, remote),
//!     MediaDirection::RecvOnly
//! );
//! ```

pub mod attribute;
pub mod direction;
pub mod error;
pub mod types;

pub use attribute::{MediaAttribute, MediaMap};
pub use error::{MediaError, Result};
pub use types::{MediaDescription, MediaDirection, MediaType};
