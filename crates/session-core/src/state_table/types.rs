use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::CallState;

/// Side of the call the local endpoint is on
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    /// Sent the initial INVITE
    UAC,
    /// Received the initial INVITE
    UAS,
    /// Table rows shared by both sides; never the role of a session
    Both,
}

/// Events driving the call state machine
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallEvent {
    // Call setup
    PlaceCall,
    IncomingInvite,
    AcceptCall,
    AnswerReceived,
    NegotiationFailed,
    TransportFailed,

    // Mid-call renegotiation
    MediaChangeRequested,
    MediaChangeCommitted,
    MediaChangeFailed,
    HoldRequested,
    HoldCommitted,
    ResumeRequested,
    ResumeCommitted,

    // Termination
    HangUp,
    PeerHangUp,
    CallOver,
}

impl fmt::Display for CallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Side effects executed while taking a transition
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Drop any outstanding offer, local or remote
    DiscardPendingOffer,
    /// Hand the committed media to the pipeline
    StartMediaPipeline,
    StopMediaPipeline,
    SendBye,
    PublishNegotiationSuccess,
    PublishNegotiationFailure,
}

/// Key for looking up transitions in the state table
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct StateKey {
    pub role: Role,
    pub state: CallState,
    pub event: CallEvent,
}

/// Outcome of an event in a given state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Effects to execute, in order
    pub effects: Vec<Effect>,

    /// Next state (if changing)
    pub next_state: Option<CallState>,
}

impl Transition {
    pub fn to(next_state: CallState, effects: Vec<Effect>) -> Self {
        Self {
            effects,
            next_state: Some(next_state),
        }
    }

    pub fn stay(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            next_state: None,
        }
    }
}

/// Complete transition table
#[derive(Debug, Clone, Default)]
pub struct MasterStateTable {
    transitions: HashMap<StateKey, Transition>,
}

/// Type alias for external use
pub type StateTable = MasterStateTable;

impl MasterStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: StateKey, transition: Transition) {
        self.transitions.insert(key, transition);
    }

    /// Look up a transition, preferring role specific entries over
    /// [`Role::Both`] entries.
    pub fn get(&self, role: Role, state: CallState, event: CallEvent) -> Option<&Transition> {
        let exact = StateKey { role, state, event };
        if let Some(transition) = self.transitions.get(&exact) {
            return Some(transition);
        }

        self.transitions.get(&StateKey {
            role: Role::Both,
            state,
            event,
        })
    }

    pub fn has_transition(&self, role: Role, state: CallState, event: CallEvent) -> bool {
        self.get(role, state, event).is_some()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Collect all states referenced in this state table
    pub fn collect_used_states(&self) -> HashSet<CallState> {
        let mut states = HashSet::new();
        for (key, transition) in &self.transitions {
            states.insert(key.state);
            if let Some(next_state) = transition.next_state {
                states.insert(next_state);
            }
        }
        states
    }

    /// Check the structural invariants of the table: terminal states are
    /// absorbing and every other reachable state can be left.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for key in self.transitions.keys() {
            if key.state.is_terminal() {
                errors.push(format!(
                    "Terminal state {} has a transition on {}",
                    key.state, key.event
                ));
            }
        }

        for state in self.collect_used_states() {
            if state.is_terminal() {
                continue;
            }
            if !self.transitions.keys().any(|k| k.state == state) {
                errors.push(format!("State {} has no exit transitions", state));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
