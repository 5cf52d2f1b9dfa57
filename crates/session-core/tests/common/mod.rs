#![allow(dead_code)]

//! Two call managers wired back to back through an in-memory signaling link

use std::collections::HashMap;
use std::sync::Arc;

use dring_media_core::{MediaAttribute, MediaMap, MediaType};
use dring_sdp_core::MediaSlot;
use dring_session_core::adapters::{MediaPipeline, OutboundMessage, SignalingTransport};
use dring_session_core::{
    AccountConfig, CallId, CallManager, EngineConfig, SessionError, Signal, SignalSubscriber,
};
use parking_lot::Mutex;

/// Collects outbound messages until the harness delivers them
#[derive(Default)]
pub struct LoopbackSignaling {
    outbox: Mutex<Vec<(CallId, OutboundMessage)>>,
    sent: Mutex<Vec<(CallId, OutboundMessage)>>,
}

impl LoopbackSignaling {
    pub fn take(&self) -> Vec<(CallId, OutboundMessage)> {
        std::mem::take(&mut *self.outbox.lock())
    }

    /// Everything ever sent, delivered or not
    pub fn sent(&self) -> Vec<(CallId, OutboundMessage)> {
        self.sent.lock().clone()
    }

    pub fn sent_names(&self) -> Vec<&'static str> {
        self.sent.lock().iter().map(|(_, m)| m.name()).collect()
    }

    pub fn clear(&self) {
        self.outbox.lock().clear();
        self.sent.lock().clear();
    }
}

impl SignalingTransport for LoopbackSignaling {
    fn send(&self, call_id: &CallId, message: OutboundMessage) {
        self.sent.lock().push((*call_id, message.clone()));
        self.outbox.lock().push((*call_id, message));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Applied { call_id: CallId, slots: Vec<MediaSlot> },
    Muted { call_id: CallId, index: usize, media_type: MediaType, muted: bool },
    Source { call_id: CallId, index: usize, source_uri: String },
    Stopped { call_id: CallId },
}

#[derive(Default)]
pub struct RecordingMediaPipeline {
    events: Mutex<Vec<MediaEvent>>,
}

impl RecordingMediaPipeline {
    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl MediaPipeline for RecordingMediaPipeline {
    fn apply(&self, call_id: &CallId, slots: &[MediaSlot], _attrs: &[MediaAttribute]) {
        self.events.lock().push(MediaEvent::Applied {
            call_id: *call_id,
            slots: slots.to_vec(),
        });
    }

    fn set_muted(&self, call_id: &CallId, index: usize, media_type: MediaType, muted: bool) {
        self.events.lock().push(MediaEvent::Muted {
            call_id: *call_id,
            index,
            media_type,
            muted,
        });
    }

    fn set_source(&self, call_id: &CallId, index: usize, _media_type: MediaType, source_uri: &str) {
        self.events.lock().push(MediaEvent::Source {
            call_id: *call_id,
            index,
            source_uri: source_uri.to_string(),
        });
    }

    fn stop(&self, call_id: &CallId) {
        self.events.lock().push(MediaEvent::Stopped { call_id: *call_id });
    }
}

pub struct Endpoint {
    pub account: String,
    pub uri: String,
    pub manager: CallManager,
    pub signaling: Arc<LoopbackSignaling>,
    pub media: Arc<RecordingMediaPipeline>,
    pub signals: SignalSubscriber,
}

impl Endpoint {
    pub fn new(account: AccountConfig, port_start: u16) -> Self {
        Self::with_manager(account, port_start, |manager| manager)
    }

    /// Endpoint whose manager is adjusted by `customize` before use
    pub fn with_manager(
        account: AccountConfig,
        port_start: u16,
        customize: impl FnOnce(CallManager) -> CallManager,
    ) -> Self {
        let name = account.account_id.clone();
        let config = EngineConfig {
            media_port_start: port_start,
            media_port_end: port_start + 998,
            local_ip: "127.0.0.1".parse().unwrap(),
            ..Default::default()
        }
        .with_account(account);

        let signaling = Arc::new(LoopbackSignaling::default());
        let media = Arc::new(RecordingMediaPipeline::default());
        let manager = customize(
            CallManager::new(config, signaling.clone())
                .unwrap()
                .with_media_pipeline(media.clone()),
        );
        let signals = manager.subscribe();

        Self {
            uri: format!("sip:{}@127.0.0.1", name),
            account: name,
            manager,
            signaling,
            media,
            signals,
        }
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        self.signals.drain()
    }
}

/// Alice and Bob, with every message one of them sends delivered to the other
pub struct Harness {
    pub alice: Endpoint,
    pub bob: Endpoint,
    /// Alice's call id -> Bob's call id
    links: HashMap<CallId, CallId>,
    pub errors: Vec<SessionError>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_accounts(AccountConfig::new("alice"), AccountConfig::new("bob"))
    }

    pub fn with_accounts(alice: AccountConfig, bob: AccountConfig) -> Self {
        Self::with_endpoints(Endpoint::new(alice, 20000), Endpoint::new(bob, 30000))
    }

    pub fn with_endpoints(alice: Endpoint, bob: Endpoint) -> Self {
        Self {
            alice,
            bob,
            links: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn bob_call(&self, alice_call: &CallId) -> CallId {
        self.links[alice_call]
    }

    fn alice_call(&self, bob_call: &CallId) -> Option<CallId> {
        self.links
            .iter()
            .find(|(_, b)| *b == bob_call)
            .map(|(a, _)| *a)
    }

    /// Deliver messages in both directions until both outboxes are empty
    pub fn pump(&mut self) {
        loop {
            let from_alice = self.alice.signaling.take();
            let from_bob = self.bob.signaling.take();
            if from_alice.is_empty() && from_bob.is_empty() {
                break;
            }
            for (call_id, message) in from_alice {
                self.deliver_to_bob(call_id, message);
            }
            for (call_id, message) in from_bob {
                self.deliver_to_alice(call_id, message);
            }
        }
    }

    /// Drop everything waiting in both outboxes
    pub fn lose_messages(&mut self) {
        self.alice.signaling.take();
        self.bob.signaling.take();
    }

    fn deliver_to_bob(&mut self, alice_call: CallId, message: OutboundMessage) {
        let result = match &message {
            OutboundMessage::Invite { sdp, .. } => {
                match self
                    .bob
                    .manager
                    .handle_incoming_invite(&self.bob.account, &self.alice.uri, sdp)
                {
                    Ok(bob_call) => {
                        self.links.insert(alice_call, bob_call);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            _ => {
                let Some(bob_call) = self.links.get(&alice_call).copied() else {
                    return;
                };
                deliver(&self.bob.manager, &bob_call, &message)
            }
        };
        if let Err(e) = result {
            self.errors.push(e);
        }
    }

    fn deliver_to_alice(&mut self, bob_call: CallId, message: OutboundMessage) {
        let Some(alice_call) = self.alice_call(&bob_call) else {
            return;
        };
        if let Err(e) = deliver(&self.alice.manager, &alice_call, &message) {
            self.errors.push(e);
        }
    }

    /// Place a call from Alice, let Bob accept it with `bob_media`, and
    /// return both call ids
    pub fn establish_call(&mut self, alice_media: &[MediaMap], bob_media: &[MediaMap]) -> (CallId, CallId) {
        let alice_call = self
            .alice
            .manager
            .place_call_with_media(&self.alice.account, &self.bob.uri, alice_media)
            .unwrap();
        self.pump();
        let bob_call = self.bob_call(&alice_call);
        self.bob
            .manager
            .accept_with_media(&self.bob.account, &bob_call, bob_media)
            .unwrap();
        self.pump();
        (alice_call, bob_call)
    }
}

fn deliver(manager: &CallManager, call_id: &CallId, message: &OutboundMessage) -> Result<(), SessionError> {
    match message {
        OutboundMessage::Invite { .. } => Ok(()),
        OutboundMessage::Answer { sdp } => manager.handle_answer(call_id, sdp),
        OutboundMessage::ReInvite { sdp } => manager.handle_media_change_request(call_id, sdp),
        OutboundMessage::ReInviteAnswer { sdp } => manager.handle_media_change_answer(call_id, sdp),
        OutboundMessage::ReInviteRejected => manager.handle_media_change_rejected(call_id),
        OutboundMessage::Bye => manager.handle_peer_hang_up(call_id),
    }
}

pub fn audio() -> MediaMap {
    media(MediaType::Audio)
}

pub fn video() -> MediaMap {
    media(MediaType::Video)
}

fn media(media_type: MediaType) -> MediaMap {
    MediaAttribute::new(media_type).with_secure(false).to_media_map()
}

/// Copy of `map` with one key replaced
pub fn with(map: &MediaMap, key: &str, value: &str) -> MediaMap {
    let mut map = map.clone();
    map.insert(key.to_string(), value.to_string());
    map
}
