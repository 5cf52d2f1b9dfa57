use crate::state_table::{CallEvent, Effect, Role, StateTableBuilder, Transition};
use crate::types::CallState;

/// Add transitions that apply to both UAC and UAS
pub fn add_common_transitions(builder: &mut StateTableBuilder) {
    let committed = || vec![Effect::StartMediaPipeline, Effect::PublishNegotiationSuccess];

    for state in [CallState::Current, CallState::Hold] {
        // Either side may start a renegotiation while the call is up
        builder.add_stay(Role::Both, state, CallEvent::MediaChangeRequested, vec![]);
        builder.add_stay(Role::Both, state, CallEvent::MediaChangeCommitted, committed());

        // Failed renegotiation keeps the previous media and state
        builder.add_stay(
            Role::Both,
            state,
            CallEvent::MediaChangeFailed,
            vec![Effect::DiscardPendingOffer, Effect::PublishNegotiationFailure],
        );

        builder.add_transition(
            Role::Both,
            state,
            CallEvent::CallOver,
            Transition::to(
                CallState::Over,
                vec![Effect::DiscardPendingOffer, Effect::StopMediaPipeline],
            ),
        );
    }

    // Current -> Hold, committed once the peer answered the hold offer
    builder.add_stay(Role::Both, CallState::Current, CallEvent::HoldRequested, vec![]);
    builder.add_transition(
        Role::Both,
        CallState::Current,
        CallEvent::HoldCommitted,
        Transition::to(CallState::Hold, committed()),
    );

    // Hold -> Current
    builder.add_stay(Role::Both, CallState::Hold, CallEvent::ResumeRequested, vec![]);
    builder.add_transition(
        Role::Both,
        CallState::Hold,
        CallEvent::ResumeCommitted,
        Transition::to(CallState::Current, committed()),
    );

    for state in [CallState::Ringing, CallState::Current] {
        builder.add_transition(
            Role::Both,
            state,
            CallEvent::TransportFailed,
            Transition::to(
                CallState::Failure,
                vec![Effect::DiscardPendingOffer, Effect::StopMediaPipeline],
            ),
        );
    }

    // Any non terminal state -> Hungup
    for state in [CallState::None, CallState::Ringing, CallState::Current, CallState::Hold] {
        builder.add_transition(
            Role::Both,
            state,
            CallEvent::HangUp,
            Transition::to(
                CallState::Hungup,
                vec![
                    Effect::DiscardPendingOffer,
                    Effect::StopMediaPipeline,
                    Effect::SendBye,
                ],
            ),
        );
        builder.add_transition(
            Role::Both,
            state,
            CallEvent::PeerHangUp,
            Transition::to(
                CallState::Hungup,
                vec![Effect::DiscardPendingOffer, Effect::StopMediaPipeline],
            ),
        );
    }
}
