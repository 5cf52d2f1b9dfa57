//! Call manager
//!
//! [`CallManager`] is the entry point of the engine. Client operations
//! (`place_call_with_media`, `accept_with_media`, `hold`, ...) take account
//! and call identifiers plus media lists in their string map form. The
//! signaling layer feeds peer traffic back through the `handle_*` hooks.
//!
//! Operations that wait on the peer return as soon as the outbound message
//! is handed to the [`SignalingTransport`]; their completion is published on
//! the signal bus.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use dring_media_core::{MediaAttribute, MediaDescription, MediaMap};
use dring_sdp_core::{MediaSlot, SessionDocument};
use tracing::{debug, info, warn};

use crate::adapters::{MediaPipeline, NullMediaPipeline, PortRangeTransport, SignalingTransport, TransportProvider};
use crate::config::{AccountConfig, EngineConfig};
use crate::errors::{Result, SessionError};
use crate::logging::setup_logging;
use crate::registry::{SessionHandle, SessionRegistry};
use crate::renegotiation::{
    mirror_media, ChangeOutcome, MediaChangePolicy, MirrorOfferPolicy, RenegotiationCoordinator, StableMediaPolicy,
};
use crate::session::{CallSession, SessionContext};
use crate::signals::{SignalBus, SignalSubscriber};
use crate::state_table::Role;
use crate::types::{CallId, CallState};

pub struct CallManager {
    config: EngineConfig,
    accounts: HashMap<String, Arc<AccountConfig>>,
    registry: SessionRegistry,
    ctx: SessionContext,
    coordinator: RenegotiationCoordinator,
    auto_answer: RenegotiationCoordinator,
}

impl CallManager {
    /// Create a manager using the default transport and media pipeline
    pub fn new(config: EngineConfig, signaling: Arc<dyn SignalingTransport>) -> Result<Self> {
        config.validate()?;
        if config.logging.install {
            if let Err(e) = setup_logging(&config.logging) {
                warn!("Keeping the existing log subscriber: {}", e);
            }
        }

        let accounts = config
            .accounts
            .iter()
            .map(|account| (account.account_id.clone(), Arc::new(account.clone())))
            .collect();
        let ctx = SessionContext {
            signals: SignalBus::new(config.signal_capacity),
            transport: Arc::new(PortRangeTransport::new(
                config.local_ip,
                config.media_port_start,
                config.media_port_end,
            )),
            media: Arc::new(NullMediaPipeline),
            signaling,
        };

        info!(
            "Call manager ready with {} account(s), media ports {}-{}",
            config.accounts.len(),
            config.media_port_start,
            config.media_port_end
        );

        Ok(Self {
            config,
            accounts,
            registry: SessionRegistry::new(),
            ctx,
            coordinator: RenegotiationCoordinator::new(Arc::new(StableMediaPolicy)),
            auto_answer: RenegotiationCoordinator::new(Arc::new(MirrorOfferPolicy)),
        })
    }

    pub fn with_media_pipeline(mut self, media: Arc<dyn MediaPipeline>) -> Self {
        self.ctx.media = media;
        self
    }

    pub fn with_transport_provider(mut self, transport: Arc<dyn TransportProvider>) -> Self {
        self.ctx.transport = transport;
        self
    }

    /// Policy applied to re-offers on accounts without auto-answer
    pub fn with_media_change_policy(mut self, policy: Arc<dyn MediaChangePolicy>) -> Self {
        self.coordinator = RenegotiationCoordinator::new(policy);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn subscribe(&self) -> SignalSubscriber {
        self.ctx.signals.subscribe()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    // ---- Client API ----

    /// Place a call. An empty media list uses the account's default media.
    pub fn place_call_with_media(
        &self,
        account_id: &str,
        destination_uri: &str,
        media_list: &[MediaMap],
    ) -> Result<CallId> {
        let account = self.account(account_id)?;

        let mut attrs = if media_list.is_empty() {
            account.default_media.clone()
        } else {
            MediaAttribute::parse_media_list(media_list)?
        };
        if attrs.is_empty() {
            return Err(SessionError::invalid_media_list("no media to offer"));
        }
        MediaAttribute::assign_default_labels(&mut attrs);

        let session = self.new_session(&account, destination_uri, Role::UAC);
        let handle = self.registry.insert(session);
        let call_id = handle.id();

        let placed = handle.lock().place_call(attrs);
        if let Err(e) = placed {
            warn!("[{}] failed to place call to {}: {}", call_id, destination_uri, e);
            self.registry.remove(&call_id);
            return Err(e);
        }
        Ok(call_id)
    }

    /// Accept an incoming call. An empty media list mirrors the offer.
    pub fn accept_with_media(&self, account_id: &str, call_id: &CallId, media_list: &[MediaMap]) -> Result<()> {
        let handle = self.session_for(account_id, call_id)?;
        let mut session = handle.lock();

        let offered = session.remote_media_attributes().to_vec();
        let mut attrs = if media_list.is_empty() {
            mirror_media(&offered, &[])
        } else {
            MediaAttribute::parse_media_list(media_list)?
        };
        for (attr, offer) in attrs.iter_mut().zip(&offered) {
            if attr.label.is_empty() {
                attr.label = offer.label.clone();
            }
        }
        MediaAttribute::assign_default_labels(&mut attrs);

        session.accept(attrs)
    }

    pub fn hang_up(&self, account_id: &str, call_id: &CallId) -> Result<()> {
        let handle = self.session_for(account_id, call_id)?;
        let mut session = handle.lock();
        session.hang_up()
    }

    pub fn hold(&self, account_id: &str, call_id: &CallId) -> Result<()> {
        let handle = self.session_for(account_id, call_id)?;
        let mut session = handle.lock();
        self.coordinator_for(&session).hold(&mut session)
    }

    pub fn unhold(&self, account_id: &str, call_id: &CallId) -> Result<()> {
        let handle = self.session_for(account_id, call_id)?;
        let mut session = handle.lock();
        self.coordinator_for(&session).unhold(&mut session)
    }

    pub fn request_media_change(
        &self,
        account_id: &str,
        call_id: &CallId,
        media_list: &[MediaMap],
    ) -> Result<ChangeOutcome> {
        let attrs = MediaAttribute::parse_media_list(media_list)?;
        let handle = self.session_for(account_id, call_id)?;
        let mut session = handle.lock();
        self.coordinator_for(&session).request_media_change(&mut session, attrs)
    }

    /// Answer a media change the peer offered, after `MediaChangeRequested`.
    /// An empty media list mirrors the offer.
    pub fn answer_media_change_request(
        &self,
        account_id: &str,
        call_id: &CallId,
        media_list: &[MediaMap],
    ) -> Result<()> {
        let handle = self.session_for(account_id, call_id)?;
        let mut session = handle.lock();

        let attrs = if media_list.is_empty() {
            let offered = session
                .pending_remote_offer()
                .map(SessionDocument::media_attributes)
                .unwrap_or_default();
            mirror_media(&offered, session.local_media_attributes())
        } else {
            MediaAttribute::parse_media_list(media_list)?
        };
        self.coordinator_for(&session).answer_media_change_request(&mut session, attrs)
    }

    /// Negotiated media of the call, from the local or the peer's point of
    /// view. Empty until the first exchange completes.
    pub fn get_active_media_descriptions(&self, call_id: &CallId, local: bool) -> Result<Vec<MediaDescription>> {
        let handle = self.registry.get(call_id)?;
        Ok(handle.active_media().descriptions(local).to_vec())
    }

    pub fn get_media_slots(&self, call_id: &CallId) -> Result<Vec<MediaSlot>> {
        Ok(self.registry.get(call_id)?.active_media().slots())
    }

    pub fn get_call_state(&self, call_id: &CallId) -> Result<CallState> {
        Ok(self.registry.get(call_id)?.lock().state())
    }

    // ---- Signaling hooks ----

    /// New incoming call. Auto-answer accounts accept it right away with
    /// mirrored media.
    pub fn handle_incoming_invite(&self, account_id: &str, peer_uri: &str, sdp: &str) -> Result<CallId> {
        let account = self.account(account_id)?;
        let offer: SessionDocument = sdp.parse()?;

        let session = self.new_session(&account, peer_uri, Role::UAS);
        let handle = self.registry.insert(session);
        let call_id = handle.id();
        let mut session = handle.lock();

        if let Err(e) = session.incoming_invite(offer) {
            drop(session);
            self.registry.remove(&call_id);
            return Err(e);
        }

        if account.auto_answer {
            let mut attrs = mirror_media(session.remote_media_attributes(), &account.default_media);
            MediaAttribute::assign_default_labels(&mut attrs);
            debug!("[{}] auto-answering with {} stream(s)", call_id, attrs.len());
            if let Err(e) = session.accept(attrs) {
                warn!("[{}] auto-answer failed: {}", call_id, e);
            }
        }
        Ok(call_id)
    }

    /// Answer to our initial offer
    pub fn handle_answer(&self, call_id: &CallId, sdp: &str) -> Result<()> {
        let handle = self.registry.get(call_id)?;
        let mut session = handle.lock();

        match sdp.parse::<SessionDocument>() {
            Ok(answer) => session.receive_answer(answer),
            Err(e) => {
                warn!("[{}] unusable answer: {}", call_id, e);
                session.answer_unusable()?;
                Err(e.into())
            }
        }
    }

    /// Re-offer from the peer
    pub fn handle_media_change_request(&self, call_id: &CallId, sdp: &str) -> Result<()> {
        let offer: SessionDocument = sdp.parse()?;
        let handle = self.registry.get(call_id)?;
        let mut session = handle.lock();
        self.coordinator_for(&session)
            .receive_media_change_request(&mut session, offer)
    }

    /// Answer to our re-offer
    pub fn handle_media_change_answer(&self, call_id: &CallId, sdp: &str) -> Result<()> {
        let handle = self.registry.get(call_id)?;
        let mut session = handle.lock();

        match sdp.parse::<SessionDocument>() {
            Ok(answer) => self.coordinator_for(&session).on_media_change_answer(&mut session, answer),
            Err(e) => {
                warn!("[{}] unusable media change answer: {}", call_id, e);
                session.answer_unusable()?;
                Err(e.into())
            }
        }
    }

    /// The peer refused our re-offer. The call keeps its current media and
    /// can renegotiate again.
    pub fn handle_media_change_rejected(&self, call_id: &CallId) -> Result<()> {
        self.registry.get(call_id)?.lock().media_change_rejected()
    }

    pub fn handle_peer_hang_up(&self, call_id: &CallId) -> Result<()> {
        self.registry.get(call_id)?.lock().peer_hung_up()
    }

    pub fn handle_transport_failure(&self, call_id: &CallId) -> Result<()> {
        self.registry.get(call_id)?.lock().transport_failed()
    }

    /// Media finished normally
    pub fn call_over(&self, call_id: &CallId) -> Result<()> {
        self.registry.get(call_id)?.lock().call_over()
    }

    /// Drop a call from the registry, hanging it up first if it is still live
    pub fn release_call(&self, call_id: &CallId) -> Result<()> {
        let handle = self.registry.get(call_id)?;
        {
            let mut session = handle.lock();
            if !session.state().is_terminal() {
                if let Err(e) = session.hang_up() {
                    warn!("[{}] hang up on release failed: {}", call_id, e);
                }
            }
        }
        self.registry.remove(call_id);
        Ok(())
    }

    // ---- Internals ----

    fn account(&self, account_id: &str) -> Result<Arc<AccountConfig>> {
        self.accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| SessionError::account_not_found(account_id))
    }

    /// Look a call up and check that it belongs to `account_id`
    fn session_for(&self, account_id: &str, call_id: &CallId) -> Result<Arc<SessionHandle>> {
        self.account(account_id)?;
        let handle = self.registry.get(call_id)?;
        if handle.account_id() != account_id {
            debug!("[{}] belongs to {}, not {}", call_id, handle.account_id(), account_id);
            return Err(SessionError::call_not_found(call_id));
        }
        Ok(handle)
    }

    fn new_session(&self, account: &Arc<AccountConfig>, peer_uri: &str, role: Role) -> CallSession {
        let address: IpAddr = account.local_address.unwrap_or(self.config.local_ip);
        CallSession::new(CallId::new(), Arc::clone(account), peer_uri, role, address, self.ctx.clone())
    }

    fn coordinator_for(&self, session: &CallSession) -> &RenegotiationCoordinator {
        if session.account().auto_answer {
            &self.auto_answer
        } else {
            &self.coordinator
        }
    }
}
