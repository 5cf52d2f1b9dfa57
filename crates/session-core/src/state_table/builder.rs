use super::types::{CallEvent, Effect, MasterStateTable, Role, StateKey, Transition};
use crate::types::CallState;

/// Incremental construction of a [`MasterStateTable`]
#[derive(Debug, Default)]
pub struct StateTableBuilder {
    table: MasterStateTable,
}

impl StateTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transition(
        &mut self,
        role: Role,
        state: CallState,
        event: CallEvent,
        transition: Transition,
    ) -> &mut Self {
        self.table.insert(StateKey { role, state, event }, transition);
        self
    }

    /// Plain state change without side effects
    pub fn add_state_change(
        &mut self,
        role: Role,
        state: CallState,
        event: CallEvent,
        next_state: CallState,
    ) -> &mut Self {
        self.add_transition(role, state, event, Transition::to(next_state, Vec::new()))
    }

    /// Event accepted in `state` without leaving it
    pub fn add_stay(
        &mut self,
        role: Role,
        state: CallState,
        event: CallEvent,
        effects: Vec<Effect>,
    ) -> &mut Self {
        self.add_transition(role, state, event, Transition::stay(effects))
    }

    pub fn build(self) -> MasterStateTable {
        self.table
    }
}
