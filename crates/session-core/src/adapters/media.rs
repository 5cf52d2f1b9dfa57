//! Media pipeline adapter
//!
//! The engine never touches RTP. Committed media, local mute changes and call
//! teardown are handed to a [`MediaPipeline`].

use dring_media_core::{MediaAttribute, MediaType};
use dring_sdp_core::MediaSlot;
use tracing::debug;

use crate::types::CallId;

pub trait MediaPipeline: Send + Sync {
    /// Start or update the streams of a call after a committed negotiation.
    /// `slots` and `attrs` are index aligned.
    fn apply(&self, call_id: &CallId, slots: &[MediaSlot], attrs: &[MediaAttribute]);

    /// Mute or unmute one stream without renegotiating
    fn set_muted(&self, call_id: &CallId, index: usize, media_type: MediaType, muted: bool);

    /// Switch the capture source of a stream that is not sending
    fn set_source(&self, call_id: &CallId, index: usize, media_type: MediaType, source_uri: &str);

    fn stop(&self, call_id: &CallId);
}

/// Pipeline that only logs what it is asked to do
#[derive(Debug, Default, Clone)]
pub struct NullMediaPipeline;

impl MediaPipeline for NullMediaPipeline {
    fn apply(&self, call_id: &CallId, slots: &[MediaSlot], attrs: &[MediaAttribute]) {
        debug!(
            "[{}] applying {} stream(s), video {}",
            call_id,
            slots.len(),
            if MediaAttribute::has_media_type(attrs, MediaType::Video) { "present" } else { "absent" }
        );
        for (index, slot) in slots.iter().enumerate() {
            debug!(
                "[{}] media @ index {}: {} {} local port {} remote {:?}:{} sending={}",
                call_id,
                index,
                slot.local.media_type,
                slot.local.direction,
                slot.local.port,
                slot.remote.address,
                slot.remote.port,
                attrs.get(index).is_some_and(MediaAttribute::is_transmitting)
            );
        }
    }

    fn set_muted(&self, call_id: &CallId, index: usize, media_type: MediaType, muted: bool) {
        debug!("[{}] {} media @ index {} muted={}", call_id, media_type, index, muted);
    }

    fn set_source(&self, call_id: &CallId, index: usize, media_type: MediaType, source_uri: &str) {
        debug!("[{}] {} media @ index {} source={}", call_id, media_type, index, source_uri);
    }

    fn stop(&self, call_id: &CallId) {
        debug!("[{}] media stopped", call_id);
    }
}
