//! Call session
//!
//! A [`CallSession`] owns the media state of one call: the committed local and
//! remote intents, the documents of the last completed exchange, the active
//! (negotiated) descriptions and at most one outstanding offer in each
//! direction. Every state change goes through [`MASTER_TABLE`]:
//!
//! 1. look the transition up, refusing the operation if there is none
//! 2. do the operation's own work (build, negotiate, commit)
//! 3. run the transition effects
//! 4. enter the next state and publish `StateChange`

use std::net::IpAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dring_media_core::{MediaAttribute, MediaType};
use dring_sdp_core::{negotiate, ActiveMedia, NegotiationError, SdpBuilder, SessionDocument, TransportSlot};
use tracing::{debug, info, warn};

use crate::adapters::{MediaPipeline, OutboundMessage, SignalingTransport, TransportProvider};
use crate::config::AccountConfig;
use crate::errors::{Result, SessionError};
use crate::signals::{NegotiationStatus, Signal, SignalBus};
use crate::state_table::{CallEvent, Effect, Role, Transition, MASTER_TABLE};
use crate::types::{CallId, CallState};

/// Collaborators shared by every session of a manager
#[derive(Clone)]
pub struct SessionContext {
    pub signals: SignalBus,
    pub transport: Arc<dyn TransportProvider>,
    pub media: Arc<dyn MediaPipeline>,
    pub signaling: Arc<dyn SignalingTransport>,
}

/// Purpose of a locally generated offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferKind {
    /// Offer of the INVITE that created the call
    Initial,
    Change,
    Hold,
    Resume,
}

impl OfferKind {
    /// Event taken when the answer to this offer negotiates successfully
    pub fn commit_event(self) -> CallEvent {
        match self {
            OfferKind::Initial => CallEvent::AnswerReceived,
            OfferKind::Change => CallEvent::MediaChangeCommitted,
            OfferKind::Hold => CallEvent::HoldCommitted,
            OfferKind::Resume => CallEvent::ResumeCommitted,
        }
    }
}

/// Local offer waiting for the peer's answer
#[derive(Debug, Clone)]
pub struct PendingOffer {
    pub kind: OfferKind,
    pub attrs: Vec<MediaAttribute>,
    pub document: SessionDocument,
}

pub struct CallSession {
    pub(crate) id: CallId,
    pub(crate) account: Arc<AccountConfig>,
    pub(crate) peer_uri: String,
    pub(crate) role: Role,
    pub(crate) state: CallState,

    /// Committed local intents, index aligned with the active media
    pub(crate) local_attrs: Vec<MediaAttribute>,
    pub(crate) remote_attrs: Vec<MediaAttribute>,
    pub(crate) local_document: Option<SessionDocument>,
    pub(crate) remote_document: Option<SessionDocument>,
    pub(crate) active: Arc<ArcSwap<ActiveMedia>>,

    /// Our offer awaiting an answer
    pub(crate) pending: Option<PendingOffer>,
    /// Peer offer awaiting our answer
    pub(crate) remote_offer: Option<SessionDocument>,

    pub(crate) slots: Vec<TransportSlot>,
    sdp: SdpBuilder,
    sdp_version: u64,
    pub(crate) ctx: SessionContext,
}

impl CallSession {
    pub fn new(
        id: CallId,
        account: Arc<AccountConfig>,
        peer_uri: impl Into<String>,
        role: Role,
        local_address: IpAddr,
        ctx: SessionContext,
    ) -> Self {
        let sdp = SdpBuilder::new(
            account.username.clone(),
            u64::from(rand::random::<u32>()),
            local_address,
        )
        .with_srtp(account.srtp_enabled)
        .with_ice_rfc5245_compliance(account.ice_rfc5245_compliant);

        Self {
            id,
            account,
            peer_uri: peer_uri.into(),
            role,
            state: CallState::None,
            local_attrs: Vec::new(),
            remote_attrs: Vec::new(),
            local_document: None,
            remote_document: None,
            active: Arc::new(ArcSwap::from_pointee(ActiveMedia::empty())),
            pending: None,
            remote_offer: None,
            slots: Vec::new(),
            sdp,
            sdp_version: 0,
            ctx,
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn account_id(&self) -> &str {
        &self.account.account_id
    }

    pub fn account(&self) -> &AccountConfig {
        &self.account
    }

    pub fn peer_uri(&self) -> &str {
        &self.peer_uri
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn local_media_attributes(&self) -> &[MediaAttribute] {
        &self.local_attrs
    }

    pub fn remote_media_attributes(&self) -> &[MediaAttribute] {
        &self.remote_attrs
    }

    pub fn local_document(&self) -> Option<&SessionDocument> {
        self.local_document.as_ref()
    }

    pub fn remote_document(&self) -> Option<&SessionDocument> {
        self.remote_document.as_ref()
    }

    pub fn pending_offer(&self) -> Option<&PendingOffer> {
        self.pending.as_ref()
    }

    pub fn pending_remote_offer(&self) -> Option<&SessionDocument> {
        self.remote_offer.as_ref()
    }

    /// Snapshot of the negotiated media
    pub fn active_media(&self) -> Arc<ActiveMedia> {
        self.active.load_full()
    }

    pub(crate) fn active_media_handle(&self) -> Arc<ArcSwap<ActiveMedia>> {
        Arc::clone(&self.active)
    }

    // ---- Call setup ----

    /// Send the initial offer
    pub fn place_call(&mut self, attrs: Vec<MediaAttribute>) -> Result<()> {
        let transition = self.transition(CallEvent::PlaceCall)?;
        let offer = self.build_offer(&attrs)?;

        info!("[{}] placing call to {} with {} media", self.id, self.peer_uri, attrs.len());
        self.send(OutboundMessage::Invite {
            account_id: self.account.account_id.clone(),
            peer_uri: self.peer_uri.clone(),
            sdp: offer.to_string(),
        });
        self.local_attrs = attrs.clone();
        self.pending = Some(PendingOffer {
            kind: OfferKind::Initial,
            attrs,
            document: offer,
        });
        self.apply(CallEvent::PlaceCall, transition);
        Ok(())
    }

    /// Record the offer of an incoming call
    pub fn incoming_invite(&mut self, offer: SessionDocument) -> Result<()> {
        let transition = self.transition(CallEvent::IncomingInvite)?;

        info!(
            "[{}] incoming call from {} with {} media",
            self.id,
            self.peer_uri,
            offer.media.len()
        );
        self.remote_attrs = offer.media_attributes();
        self.remote_offer = Some(offer);
        self.apply(CallEvent::IncomingInvite, transition);

        self.publish(Signal::IncomingCallWithMedia {
            account_id: self.account.account_id.clone(),
            call_id: self.id,
            peer_uri: self.peer_uri.clone(),
            media: MediaAttribute::to_media_maps(&self.remote_attrs),
        });
        Ok(())
    }

    /// Answer the incoming offer.
    ///
    /// An answer that does not match the offer line for line is refused with
    /// a programming error before anything changes. A well formed answer that
    /// leaves no usable media fails the call.
    pub fn accept(&mut self, attrs: Vec<MediaAttribute>) -> Result<()> {
        let transition = self.transition(CallEvent::AcceptCall)?;
        let offer = self
            .remote_offer
            .clone()
            .ok_or_else(|| SessionError::invalid_transition(self.state, CallEvent::AcceptCall))?;

        let answer = self.build_answer(&offer, &attrs)?;

        match negotiate(&answer, &offer) {
            Ok(active) => {
                self.send(OutboundMessage::Answer {
                    sdp: answer.to_string(),
                });
                self.remote_offer = None;
                self.commit(attrs, answer, offer, active);
                self.apply(CallEvent::AcceptCall, transition);
                Ok(())
            }
            Err(err) => {
                self.fail_negotiation(&err);
                Err(err.into())
            }
        }
    }

    /// Negotiate the answer to our initial offer
    pub fn receive_answer(&mut self, answer: SessionDocument) -> Result<()> {
        let transition = self.transition(CallEvent::AnswerReceived)?;
        let pending = match self.pending.take() {
            Some(pending) if pending.kind == OfferKind::Initial => pending,
            other => {
                self.pending = other;
                return Err(SessionError::invalid_transition(
                    self.state,
                    CallEvent::AnswerReceived,
                ));
            }
        };

        match negotiate(&pending.document, &answer) {
            Ok(active) => {
                self.commit(pending.attrs, pending.document, answer, active);
                self.apply(CallEvent::AnswerReceived, transition);
            }
            Err(err) => self.fail_negotiation(&err),
        }
        Ok(())
    }

    /// The peer sent an answer that could not be parsed
    pub fn answer_unusable(&mut self) -> Result<()> {
        match self.pending.as_ref().map(|p| p.kind) {
            Some(OfferKind::Initial) => {
                let transition = self.transition(CallEvent::NegotiationFailed)?;
                self.apply(CallEvent::NegotiationFailed, transition);
                Ok(())
            }
            Some(_) => self.fire(CallEvent::MediaChangeFailed),
            None => Err(SessionError::invalid_transition(
                self.state,
                CallEvent::NegotiationFailed,
            )),
        }
    }

    /// The peer refused our outstanding mid-call offer (491 or 488). The call
    /// keeps its committed media.
    pub fn media_change_rejected(&mut self) -> Result<()> {
        match self.pending.as_ref().map(|p| p.kind) {
            Some(kind) if kind != OfferKind::Initial => {
                info!("[{}] peer refused our {:?} offer", self.id, kind);
                self.fire(CallEvent::MediaChangeFailed)
            }
            _ => Err(SessionError::invalid_transition(
                self.state,
                CallEvent::MediaChangeFailed,
            )),
        }
    }

    fn fail_negotiation(&mut self, err: &NegotiationError) {
        warn!("[{}] negotiation failed in {}: {}", self.id, self.state, err);
        match self.transition(CallEvent::NegotiationFailed) {
            Ok(transition) => self.apply(CallEvent::NegotiationFailed, transition),
            Err(e) => warn!("[{}] {}", self.id, e),
        }
    }

    // ---- Termination ----

    pub fn hang_up(&mut self) -> Result<()> {
        self.fire(CallEvent::HangUp)
    }

    pub fn peer_hung_up(&mut self) -> Result<()> {
        self.fire(CallEvent::PeerHangUp)
    }

    pub fn call_over(&mut self) -> Result<()> {
        self.fire(CallEvent::CallOver)
    }

    /// Loss of the signaling transport.
    ///
    /// A mid-call exchange in flight is abandoned and the call keeps its
    /// committed media. Anything else fails the call.
    pub fn transport_failed(&mut self) -> Result<()> {
        if self.renegotiating() {
            warn!("[{}] transport lost during renegotiation, keeping current media", self.id);
            return self.fire(CallEvent::MediaChangeFailed);
        }
        self.fire(CallEvent::TransportFailed)
    }

    fn renegotiating(&self) -> bool {
        let established = matches!(self.state, CallState::Current | CallState::Hold);
        let local = self.pending.as_ref().is_some_and(|p| p.kind != OfferKind::Initial);
        established && (local || self.remote_offer.is_some())
    }

    // ---- State machine plumbing ----

    pub(crate) fn transition(&self, event: CallEvent) -> Result<Transition> {
        match MASTER_TABLE.get(self.role, self.state, event) {
            Some(transition) => Ok(transition.clone()),
            None => {
                debug!("[{}] {} refused in state {}", self.id, event, self.state);
                Err(SessionError::invalid_transition(self.state, event))
            }
        }
    }

    pub(crate) fn fire(&mut self, event: CallEvent) -> Result<()> {
        let transition = self.transition(event)?;
        self.apply(event, transition);
        Ok(())
    }

    pub(crate) fn apply(&mut self, event: CallEvent, transition: Transition) {
        debug!(
            "[{}] {:?} {} on {} -> {:?}",
            self.id, self.role, self.state, event, transition.next_state
        );

        for effect in &transition.effects {
            self.run_effect(*effect);
        }

        if let Some(next) = transition.next_state {
            if next != self.state {
                info!("[{}] {} -> {}", self.id, self.state, next);
                self.state = next;
                self.publish(Signal::StateChange {
                    account_id: self.account.account_id.clone(),
                    call_id: self.id,
                    state: next,
                });
                if next.is_terminal() {
                    self.release_transport();
                }
            }
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::DiscardPendingOffer => {
                if let Some(pending) = self.pending.take() {
                    debug!("[{}] discarding pending {:?} offer", self.id, pending.kind);
                }
                if self.remote_offer.take().is_some() {
                    debug!("[{}] discarding unanswered remote offer", self.id);
                }
            }
            Effect::StartMediaPipeline => {
                let active = self.active.load();
                self.ctx.media.apply(&self.id, &active.slots(), &self.local_attrs);
            }
            Effect::StopMediaPipeline => self.ctx.media.stop(&self.id),
            Effect::SendBye => self.send(OutboundMessage::Bye),
            Effect::PublishNegotiationSuccess => self.publish(Signal::MediaNegotiationStatus {
                call_id: self.id,
                status: NegotiationStatus::Success,
            }),
            Effect::PublishNegotiationFailure => self.publish(Signal::MediaNegotiationStatus {
                call_id: self.id,
                status: NegotiationStatus::Fail,
            }),
        }
    }

    pub(crate) fn send(&self, message: OutboundMessage) {
        debug!("[{}] sending {}", self.id, message.name());
        self.ctx.signaling.send(&self.id, message);
    }

    pub(crate) fn publish(&self, signal: Signal) {
        self.ctx.signals.publish(signal);
    }

    // ---- Documents ----

    fn ensure_transport(&mut self, attrs: &[MediaAttribute]) -> Result<()> {
        while self.slots.len() < attrs.len() {
            let media_type = attrs[self.slots.len()].media_type;
            let slot = self.ctx.transport.allocate(&self.id, media_type)?;
            self.slots.push(slot);
        }
        Ok(())
    }

    fn release_transport(&mut self) {
        for slot in self.slots.drain(..) {
            self.ctx.transport.release(&self.id, &slot);
        }
    }

    fn next_builder(&self) -> SdpBuilder {
        self.sdp.clone().with_session_version(self.sdp_version + 1)
    }

    pub(crate) fn build_offer(&mut self, attrs: &[MediaAttribute]) -> Result<SessionDocument> {
        self.ensure_transport(attrs)?;
        let offer = self.next_builder().build_offer(attrs, &self.slots)?;
        self.sdp_version += 1;
        Ok(offer)
    }

    pub(crate) fn build_answer(
        &mut self,
        offer: &SessionDocument,
        attrs: &[MediaAttribute],
    ) -> Result<SessionDocument> {
        if attrs.len() != offer.media.len() {
            // Checked here as well so that no transport is allocated for it
            return Err(SessionError::Programming(format!(
                "answer has {} media but the offer has {}",
                attrs.len(),
                offer.media.len()
            )));
        }
        self.ensure_transport(attrs)?;
        let answer = self.next_builder().build_answer(offer, attrs, &self.slots)?;
        self.sdp_version += 1;
        Ok(answer)
    }

    /// Make the result of a successful exchange the call's media
    pub(crate) fn commit(
        &mut self,
        local_attrs: Vec<MediaAttribute>,
        local_document: SessionDocument,
        remote_document: SessionDocument,
        active: ActiveMedia,
    ) {
        let video_was_muted = self.local_document.is_some() && video_muted(&self.local_attrs);

        self.remote_attrs = remote_document.media_attributes();
        self.local_attrs = local_attrs;
        self.local_document = Some(local_document);
        self.remote_document = Some(remote_document);
        self.active.store(Arc::new(active));

        let video_is_muted = video_muted(&self.local_attrs);
        if video_was_muted != video_is_muted {
            self.publish(Signal::VideoMuted {
                call_id: self.id,
                muted: video_is_muted,
            });
        }
    }

    /// Apply a mute or capture source change to one stream without
    /// renegotiating
    pub(crate) fn change_locally(&mut self, index: usize, new: &MediaAttribute) {
        let Some(attr) = self.local_attrs.get_mut(index) else {
            return;
        };
        if attr.source_uri != new.source_uri {
            self.ctx.media.set_source(&self.id, index, attr.media_type, &new.source_uri);
        }
        if attr.muted != new.muted {
            self.ctx.media.set_muted(&self.id, index, attr.media_type, new.muted);
        }
        attr.update_from(new);
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.release_transport();
    }
}

fn video_muted(attrs: &[MediaAttribute]) -> bool {
    attrs
        .iter()
        .any(|a| a.media_type == MediaType::Video && a.enabled && a.muted)
}
