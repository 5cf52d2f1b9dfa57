use crate::state_table::{CallEvent, Effect, Role, StateTableBuilder, Transition};
use crate::types::CallState;

/// Add all UAS (callee) transitions to the table
pub fn add_uas_transitions(builder: &mut StateTableBuilder) {
    // None -> Ringing: offer received
    builder.add_state_change(
        Role::UAS,
        CallState::None,
        CallEvent::IncomingInvite,
        CallState::Ringing,
    );

    // Ringing -> Current: local answer negotiated and sent
    builder.add_transition(
        Role::UAS,
        CallState::Ringing,
        CallEvent::AcceptCall,
        Transition::to(
            CallState::Current,
            vec![Effect::StartMediaPipeline, Effect::PublishNegotiationSuccess],
        ),
    );

    // Ringing -> Failure: no usable answer to the offer, refuse the call
    builder.add_transition(
        Role::UAS,
        CallState::Ringing,
        CallEvent::NegotiationFailed,
        Transition::to(
            CallState::Failure,
            vec![
                Effect::DiscardPendingOffer,
                Effect::SendBye,
                Effect::PublishNegotiationFailure,
            ],
        ),
    );
}
