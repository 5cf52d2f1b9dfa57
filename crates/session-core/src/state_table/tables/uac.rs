use crate::state_table::{CallEvent, Effect, Role, StateTableBuilder, Transition};
use crate::types::CallState;

/// Add all UAC (caller) transitions to the table
pub fn add_uac_transitions(builder: &mut StateTableBuilder) {
    // None -> Ringing: initial offer sent
    builder.add_state_change(Role::UAC, CallState::None, CallEvent::PlaceCall, CallState::Ringing);

    // Ringing -> Current: answer received and negotiated
    builder.add_transition(
        Role::UAC,
        CallState::Ringing,
        CallEvent::AnswerReceived,
        Transition::to(
            CallState::Current,
            vec![Effect::StartMediaPipeline, Effect::PublishNegotiationSuccess],
        ),
    );

    // Ringing -> Failure: the answer is unusable, the callee already
    // considers the call established
    builder.add_transition(
        Role::UAC,
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
