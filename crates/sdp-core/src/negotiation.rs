//! Local/remote document pairing
//!
//! [`negotiate`] turns the local and remote documents of a completed exchange
//! into the active media descriptions of the call. Both sides of the result
//! are index aligned with the documents they came from.

use dring_media_core::direction::infer_negotiated_direction;
use dring_media_core::{MediaDescription, MediaType};
use tracing::{debug, warn};

use crate::document::SessionDocument;
use crate::error::NegotiationError;

/// Pair of negotiated descriptions for one media line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSlot {
    pub local: MediaDescription,
    pub remote: MediaDescription,
}

/// Active media of a call after a successful exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveMedia {
    local: Vec<MediaDescription>,
    remote: Vec<MediaDescription>,
}

impl ActiveMedia {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Negotiated descriptions as seen locally or as seen by the peer
    pub fn descriptions(&self, local: bool) -> &[MediaDescription] {
        if local { &self.local } else { &self.remote }
    }

    pub fn slots(&self) -> Vec<MediaSlot> {
        self.local
            .iter()
            .zip(&self.remote)
            .map(|(local, remote)| MediaSlot {
                local: local.clone(),
                remote: remote.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    pub fn rejected_count(&self) -> usize {
        self.local.iter().filter(|d| d.is_rejected()).count()
    }

    pub fn has_live_media(&self, media_type: MediaType) -> bool {
        self.local
            .iter()
            .any(|d| d.media_type == media_type && !d.is_rejected())
    }
}

/// Negotiate a local document against the remote document of the same exchange.
///
/// A line rejected by either side is inactive on both sides. The exchange
/// fails when the documents do not pair up positionally or when every line
/// ends up rejected.
pub fn negotiate(
    local: &SessionDocument,
    remote: &SessionDocument,
) -> Result<ActiveMedia, NegotiationError> {
    if local.media.is_empty() {
        return Err(NegotiationError::NoMedia);
    }
    if local.media.len() != remote.media.len() {
        return Err(NegotiationError::MediaCountMismatch {
            local: local.media.len(),
            remote: remote.media.len(),
        });
    }

    let mut active = ActiveMedia::empty();
    for (index, (ours, theirs)) in local.media.iter().zip(&remote.media).enumerate() {
        if ours.media_type != theirs.media_type {
            return Err(NegotiationError::MediaTypeMismatch {
                index,
                local: ours.media_type,
                remote: theirs.media_type,
            });
        }

        if local.is_line_rejected(index) || remote.is_line_rejected(index) {
            debug!("Media @ index {} ({}) is rejected", index, ours.media_type);
            active.local.push(MediaDescription::rejected(ours.media_type));
            active.remote.push(MediaDescription::rejected(theirs.media_type));
            continue;
        }

        let direction = infer_negotiated_direction(ours.direction, theirs.direction);
        active.local.push(MediaDescription {
            media_type: ours.media_type,
            direction,
            address: local.line_address(index),
            port: ours.port,
            on_hold: ours.is_holding(),
        });
        active.remote.push(MediaDescription {
            media_type: theirs.media_type,
            direction: direction.transpose(),
            address: remote.line_address(index),
            port: theirs.port,
            on_hold: theirs.is_holding(),
        });
    }

    let rejected = active.rejected_count();
    if rejected == active.len() {
        return Err(NegotiationError::AllMediaRejected { count: rejected });
    }
    if rejected > 0 {
        warn!(
            "Partial negotiation: {} of {} media line(s) rejected",
            rejected,
            active.len()
        );
    }

    Ok(active)
}
