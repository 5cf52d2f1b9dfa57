//! Mid-call media renegotiation
//!
//! The [`RenegotiationCoordinator`] drives offer/answer exchanges on an
//! established call: local media changes, hold and resume, and re-offers
//! coming from the peer. At most one exchange is outstanding per call; a
//! second one in either direction is refused with
//! [`SessionError::RenegotiationInProgress`]; a refused re-offer from the peer
//! is also answered with [`OutboundMessage::ReInviteRejected`].
//!
//! Re-offers from the peer are first shown to a [`MediaChangePolicy`], which
//! either answers them on the spot or leaves the decision to the application
//! through a `MediaChangeRequested` signal.

use std::sync::Arc;

use dring_media_core::{MediaAttribute, MediaType};
use dring_sdp_core::{negotiate, SessionDocument};
use tracing::{debug, info, warn};

use crate::adapters::OutboundMessage;
use crate::errors::{Result, SessionError};
use crate::session::{CallSession, OfferKind, PendingOffer};
use crate::signals::Signal;
use crate::state_table::CallEvent;

/// What to do with a media change offered by the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaChangeDecision {
    /// Answer right away with these attributes, one per offered line
    Answer(Vec<MediaAttribute>),
    /// Ask the application
    Defer,
}

/// Strategy applied to re-offers received from the peer
pub trait MediaChangePolicy: Send + Sync {
    /// `current` is the local committed media, `offered` the intent read from
    /// the peer's new offer
    fn decide(&self, current: &[MediaAttribute], offered: &[MediaAttribute]) -> MediaChangeDecision;
}

/// Answers re-offers that keep the media layout (hold, resume, mute) with the
/// current local media. Anything else goes to the application.
#[derive(Debug, Default, Clone)]
pub struct StableMediaPolicy;

impl MediaChangePolicy for StableMediaPolicy {
    fn decide(&self, current: &[MediaAttribute], offered: &[MediaAttribute]) -> MediaChangeDecision {
        if same_layout(current, offered) {
            MediaChangeDecision::Answer(current.to_vec())
        } else {
            MediaChangeDecision::Defer
        }
    }
}

/// Accepts every re-offer, mirroring the offered streams
#[derive(Debug, Default, Clone)]
pub struct MirrorOfferPolicy;

impl MediaChangePolicy for MirrorOfferPolicy {
    fn decide(&self, current: &[MediaAttribute], offered: &[MediaAttribute]) -> MediaChangeDecision {
        MediaChangeDecision::Answer(mirror_media(offered, current))
    }
}

fn same_layout(a: &[MediaAttribute], b: &[MediaAttribute]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.media_type == y.media_type)
}

/// Build an answer list matching `offered` line for line.
///
/// Type, label, presence and security follow the offer. Mute, hold and capture
/// source are kept from the local stream at the same position when it has the
/// same type.
pub fn mirror_media(offered: &[MediaAttribute], current: &[MediaAttribute]) -> Vec<MediaAttribute> {
    offered
        .iter()
        .enumerate()
        .map(|(index, offer)| {
            let mut attr = MediaAttribute::new(offer.media_type)
                .with_label(offer.label.clone())
                .with_enabled(offer.enabled)
                .with_secure(offer.secure);
            if let Some(own) = current.get(index).filter(|a| a.media_type == offer.media_type) {
                attr.muted = own.muted;
                attr.on_hold = own.on_hold;
                attr.source_uri = own.source_uri.clone();
            }
            attr
        })
        .collect()
}

/// Result of a local media change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Same media as before, nothing done
    Unchanged,
    /// Applied to the media pipeline without renegotiation
    AppliedLocally,
    /// A re-offer was sent; completion is reported by `MediaNegotiationStatus`
    OfferSent,
}

pub struct RenegotiationCoordinator {
    policy: Arc<dyn MediaChangePolicy>,
}

impl RenegotiationCoordinator {
    pub fn new(policy: Arc<dyn MediaChangePolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Arc<dyn MediaChangePolicy> {
        &self.policy
    }

    /// Change the local media of an established call
    pub fn request_media_change(
        &self,
        session: &mut CallSession,
        requested: Vec<MediaAttribute>,
    ) -> Result<ChangeOutcome> {
        let transition = session.transition(CallEvent::MediaChangeRequested)?;
        let attrs = normalize_request(session.local_media_attributes(), requested)?;

        if attrs.as_slice() == session.local_media_attributes() {
            debug!("[{}] media change request leaves media unchanged", session.id());
            return Ok(ChangeOutcome::Unchanged);
        }
        ensure_idle(session)?;

        if let Some(changed) = local_only_changes(session.local_media_attributes(), &attrs) {
            for index in changed {
                info!("[{}] media @ index {} changed locally", session.id(), index);
                session.change_locally(index, &attrs[index]);
            }
            return Ok(ChangeOutcome::AppliedLocally);
        }

        info!(
            "[{}] renegotiating media: {} -> {} stream(s)",
            session.id(),
            session.local_media_attributes().len(),
            attrs.len()
        );
        self.send_offer(session, OfferKind::Change, attrs)?;
        session.apply(CallEvent::MediaChangeRequested, transition);
        Ok(ChangeOutcome::OfferSent)
    }

    /// Put every stream on hold
    pub fn hold(&self, session: &mut CallSession) -> Result<()> {
        self.offer_hold(session, true)
    }

    pub fn unhold(&self, session: &mut CallSession) -> Result<()> {
        self.offer_hold(session, false)
    }

    fn offer_hold(&self, session: &mut CallSession, on_hold: bool) -> Result<()> {
        let (event, kind) = if on_hold {
            (CallEvent::HoldRequested, OfferKind::Hold)
        } else {
            (CallEvent::ResumeRequested, OfferKind::Resume)
        };
        let transition = session.transition(event)?;
        ensure_idle(session)?;

        let attrs: Vec<_> = session
            .local_media_attributes()
            .iter()
            .cloned()
            .map(|attr| attr.with_on_hold(on_hold))
            .collect();

        info!("[{}] {}", session.id(), if on_hold { "holding" } else { "resuming" });
        self.send_offer(session, kind, attrs)?;
        session.apply(event, transition);
        Ok(())
    }

    fn send_offer(&self, session: &mut CallSession, kind: OfferKind, attrs: Vec<MediaAttribute>) -> Result<()> {
        let offer = session.build_offer(&attrs)?;
        session.send(OutboundMessage::ReInvite {
            sdp: offer.to_string(),
        });
        session.pending = Some(PendingOffer {
            kind,
            attrs,
            document: offer,
        });
        Ok(())
    }

    /// Negotiate the peer's answer to our outstanding re-offer.
    ///
    /// A failed exchange keeps the previous media and state; the outcome is
    /// reported through `MediaNegotiationStatus`.
    pub fn on_media_change_answer(&self, session: &mut CallSession, answer: SessionDocument) -> Result<()> {
        let kind = match session.pending_offer() {
            Some(pending) if pending.kind != OfferKind::Initial => pending.kind,
            _ => {
                return Err(SessionError::invalid_transition(
                    session.state(),
                    CallEvent::MediaChangeCommitted,
                ));
            }
        };
        let event = kind.commit_event();
        let transition = session.transition(event)?;

        let Some(pending) = session.pending.take() else {
            return Err(SessionError::invalid_transition(session.state(), event));
        };

        match negotiate(&pending.document, &answer) {
            Ok(active) => {
                if active.rejected_count() > 0 {
                    debug!(
                        "[{}] {} of {} stream(s) rejected by the peer",
                        session.id(),
                        active.rejected_count(),
                        active.len()
                    );
                }
                session.commit(pending.attrs, pending.document, answer, active);
                session.apply(event, transition);
            }
            Err(err) => {
                warn!("[{}] {:?} renegotiation failed: {}", session.id(), kind, err);
                session.fire(CallEvent::MediaChangeFailed)?;
            }
        }
        Ok(())
    }

    /// Handle a re-offer from the peer
    pub fn receive_media_change_request(&self, session: &mut CallSession, offer: SessionDocument) -> Result<()> {
        let transition = session.transition(CallEvent::MediaChangeRequested)?;
        if let Err(err) = ensure_idle(session) {
            info!("[{}] re-offer crossed an exchange in progress, refusing it", session.id());
            session.send(OutboundMessage::ReInviteRejected);
            return Err(err);
        }

        let offered = offer.media_attributes();
        session.remote_offer = Some(offer);
        session.apply(CallEvent::MediaChangeRequested, transition);

        match self.policy.decide(session.local_media_attributes(), &offered) {
            MediaChangeDecision::Answer(attrs) => {
                debug!("[{}] answering media change automatically", session.id());
                match self.answer_media_change_request(session, attrs) {
                    Err(SessionError::NegotiationFailure(err)) => {
                        debug!("[{}] automatic answer failed: {}", session.id(), err);
                        Ok(())
                    }
                    other => other,
                }
            }
            MediaChangeDecision::Defer => {
                info!("[{}] media change deferred to the application", session.id());
                session.publish(Signal::MediaChangeRequested {
                    account_id: session.account_id().to_string(),
                    call_id: session.id(),
                    media: MediaAttribute::to_media_maps(&offered),
                });
                Ok(())
            }
        }
    }

    /// Answer the peer's outstanding re-offer.
    ///
    /// An answer list that does not match the offer is refused before
    /// anything is sent, and the offer stays answerable.
    pub fn answer_media_change_request(
        &self,
        session: &mut CallSession,
        mut attrs: Vec<MediaAttribute>,
    ) -> Result<()> {
        let transition = session.transition(CallEvent::MediaChangeCommitted)?;
        let Some(offer) = session.pending_remote_offer().cloned() else {
            return Err(SessionError::invalid_transition(
                session.state(),
                CallEvent::MediaChangeCommitted,
            ));
        };

        for (index, attr) in attrs.iter_mut().enumerate() {
            if let Some(own) = session.local_media_attributes().get(index) {
                if own.media_type == attr.media_type {
                    attr.on_hold = own.on_hold;
                }
            }
            if attr.label.is_empty() {
                if let Some(label) = offer.media.get(index).and_then(|line| line.label.clone()) {
                    attr.label = label;
                }
            }
        }
        MediaAttribute::assign_default_labels(&mut attrs);

        let answer = session.build_answer(&offer, &attrs)?;
        session.send(OutboundMessage::ReInviteAnswer {
            sdp: answer.to_string(),
        });

        match negotiate(&answer, &offer) {
            Ok(active) => {
                session.remote_offer = None;
                session.commit(attrs, answer, offer, active);
                session.apply(CallEvent::MediaChangeCommitted, transition);
                Ok(())
            }
            Err(err) => {
                warn!("[{}] media change answer failed: {}", session.id(), err);
                session.fire(CallEvent::MediaChangeFailed)?;
                Err(err.into())
            }
        }
    }
}

fn ensure_idle(session: &CallSession) -> Result<()> {
    if session.pending_offer().is_some() || session.pending_remote_offer().is_some() {
        return Err(SessionError::renegotiation_in_progress(&session.id()));
    }
    Ok(())
}

/// Align a requested media list with the current one.
///
/// Existing positions keep their type, hold state and (when none is given)
/// label. Missing trailing streams become disabled lines so that every line
/// of the previous exchange stays in place.
fn normalize_request(current: &[MediaAttribute], requested: Vec<MediaAttribute>) -> Result<Vec<MediaAttribute>> {
    if requested.is_empty() {
        return Err(SessionError::invalid_media_list("media list is empty"));
    }

    let mut attrs = requested;
    for (index, (attr, own)) in attrs.iter_mut().zip(current).enumerate() {
        if attr.media_type != own.media_type {
            return Err(SessionError::invalid_media_list(format!(
                "media @ index {} is {} and cannot become {}",
                index, own.media_type, attr.media_type
            )));
        }
        attr.on_hold = own.on_hold;
        if attr.label.is_empty() {
            attr.label = own.label.clone();
        }
    }
    for own in current.iter().skip(attrs.len()) {
        attrs.push(own.clone().with_enabled(false));
    }

    MediaAttribute::assign_default_labels(&mut attrs);
    Ok(attrs)
}

/// Indices of the streams whose change needs no renegotiation, or `None`
/// when at least one change must be offered to the peer.
///
/// Audio mute flips stay local. A capture source switch stays local when the
/// stream sends nothing before and after it.
fn local_only_changes(current: &[MediaAttribute], requested: &[MediaAttribute]) -> Option<Vec<usize>> {
    if current.len() != requested.len() {
        return None;
    }

    let mut changed = Vec::new();
    for (index, (own, new)) in current.iter().zip(requested).enumerate() {
        if own == new {
            continue;
        }
        let mute_is_local = own.muted == new.muted || new.media_type == MediaType::Audio;
        let source_is_local =
            own.source_uri == new.source_uri || (!own.is_transmitting() && !new.is_transmitting());
        let others_unchanged = MediaAttribute {
            muted: own.muted,
            source_uri: own.source_uri.clone(),
            ..new.clone()
        } == *own;
        if !(mute_is_local && source_is_local && others_unchanged) {
            return None;
        }
        changed.push(index);
    }
    Some(changed)
}
