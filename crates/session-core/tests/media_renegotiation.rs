//! Mid-call media changes, hold and resume

mod common;

use std::sync::Arc;

use common::{audio, video, with, Endpoint, Harness, MediaEvent};
use dring_media_core::{MediaAttribute, MediaDirection, MediaType};
use dring_session_core::{
    AccountConfig, CallId, CallState, ChangeOutcome, MediaChangeDecision, MediaChangePolicy, NegotiationStatus,
    SessionError, Signal,
};
use pretty_assertions::assert_eq;

fn local_directions(h: &Harness, call_id: &CallId, alice: bool) -> Vec<MediaDirection> {
    let manager = if alice { &h.alice.manager } else { &h.bob.manager };
    manager
        .get_active_media_descriptions(call_id, true)
        .unwrap()
        .iter()
        .map(|d| d.direction)
        .collect()
}

#[test]
fn test_caller_mutes_video_mid_call() {
    let mut h = Harness::new();
    let (alice_call, bob_call) = h.establish_call(&[audio(), video()], &[]);
    h.alice.drain_signals();
    h.bob.drain_signals();

    let outcome = h
        .alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), with(&video(), "MUTED", "true")])
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::OfferSent);
    h.pump();
    assert!(h.errors.is_empty());

    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendRecv, MediaDirection::RecvOnly]
    );
    assert_eq!(
        local_directions(&h, &bob_call, false),
        vec![MediaDirection::SendRecv, MediaDirection::SendOnly]
    );

    let alice_signals = h.alice.drain_signals();
    assert!(alice_signals.contains(&Signal::VideoMuted {
        call_id: alice_call,
        muted: true
    }));
    assert!(alice_signals.contains(&Signal::MediaNegotiationStatus {
        call_id: alice_call,
        status: NegotiationStatus::Success
    }));

    // Same layout, so the callee answered on its own
    let bob_signals = h.bob.drain_signals();
    assert!(!bob_signals
        .iter()
        .any(|s| matches!(s, Signal::MediaChangeRequested { .. })));
    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Current);

    // Unmuting renegotiates back to SENDRECV
    h.alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), video()])
        .unwrap();
    h.pump();
    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendRecv, MediaDirection::SendRecv]
    );
    assert!(h.alice.drain_signals().contains(&Signal::VideoMuted {
        call_id: alice_call,
        muted: false
    }));
}

#[test]
fn test_audio_mute_is_applied_locally() {
    let mut h = Harness::new();
    let (alice_call, _) = h.establish_call(&[audio(), video()], &[]);
    h.alice.media.clear();
    let sent_before = h.alice.signaling.sent().len();

    let outcome = h
        .alice
        .manager
        .request_media_change("alice", &alice_call, &[with(&audio(), "MUTED", "true"), video()])
        .unwrap();

    assert_eq!(outcome, ChangeOutcome::AppliedLocally);
    assert_eq!(h.alice.signaling.sent().len(), sent_before);
    assert_eq!(
        h.alice.media.events(),
        vec![MediaEvent::Muted {
            call_id: alice_call,
            index: 0,
            media_type: MediaType::Audio,
            muted: true
        }]
    );
    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendRecv, MediaDirection::SendRecv]
    );

    // Asking again for the same media does nothing
    let outcome = h
        .alice
        .manager
        .request_media_change("alice", &alice_call, &[with(&audio(), "MUTED", "true"), video()])
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::Unchanged);
}

#[test]
fn test_source_switch_on_muted_video_is_applied_locally() {
    let mut h = Harness::new();
    let muted_video = with(&video(), "MUTED", "true");
    let (alice_call, _) = h.establish_call(&[audio(), muted_video.clone()], &[]);
    h.alice.media.clear();
    let sent_before = h.alice.signaling.sent().len();

    let outcome = h
        .alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), with(&muted_video, "SOURCE", "camera://2")])
        .unwrap();

    assert_eq!(outcome, ChangeOutcome::AppliedLocally);
    assert_eq!(h.alice.signaling.sent().len(), sent_before);
    assert_eq!(
        h.alice.media.events(),
        vec![MediaEvent::Source {
            call_id: alice_call,
            index: 1,
            source_uri: "camera://2".to_string()
        }]
    );

    // A sending stream needs the peer to know about its new source
    let outcome = h
        .alice
        .manager
        .request_media_change(
            "alice",
            &alice_call,
            &[with(&audio(), "SOURCE", "mic://2"), with(&muted_video, "SOURCE", "camera://2")],
        )
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::OfferSent);
    h.pump();
    assert!(h.errors.is_empty());
}

#[test]
fn test_hold_and_resume() {
    let mut h = Harness::new();
    let (alice_call, bob_call) = h.establish_call(&[audio(), video()], &[]);

    h.alice.manager.hold("alice", &alice_call).unwrap();
    // Hold is entered only once the peer answers
    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Current);
    h.pump();
    assert!(h.errors.is_empty());

    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Hold);
    assert_eq!(h.bob.manager.get_call_state(&bob_call).unwrap(), CallState::Current);
    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendOnly, MediaDirection::SendOnly]
    );
    assert_eq!(
        local_directions(&h, &bob_call, false),
        vec![MediaDirection::RecvOnly, MediaDirection::RecvOnly]
    );
    let alice_local = h.alice.manager.get_active_media_descriptions(&alice_call, true).unwrap();
    assert!(alice_local.iter().all(|d| d.on_hold));
    let bob_remote = h.bob.manager.get_active_media_descriptions(&bob_call, false).unwrap();
    assert!(bob_remote.iter().all(|d| d.on_hold));

    assert!(matches!(
        h.alice.manager.hold("alice", &alice_call),
        Err(SessionError::InvalidStateTransition { state: CallState::Hold, .. })
    ));

    h.alice.manager.unhold("alice", &alice_call).unwrap();
    h.pump();

    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Current);
    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendRecv, MediaDirection::SendRecv]
    );
    assert_eq!(
        local_directions(&h, &bob_call, false),
        vec![MediaDirection::SendRecv, MediaDirection::SendRecv]
    );
}

#[test]
fn test_adding_video_is_deferred_to_the_callee() {
    let mut h = Harness::new();
    let (alice_call, bob_call) = h.establish_call(&[audio()], &[]);
    h.bob.drain_signals();

    h.alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), video()])
        .unwrap();
    h.pump();

    let requested = h
        .bob
        .drain_signals()
        .into_iter()
        .find_map(|s| match s {
            Signal::MediaChangeRequested { call_id, media, .. } => Some((call_id, media)),
            _ => None,
        })
        .unwrap();
    assert_eq!(requested.0, bob_call);
    let offered = MediaAttribute::parse_media_list(&requested.1).unwrap();
    assert_eq!(offered.len(), 2);
    assert_eq!(offered[1].media_type, MediaType::Video);

    // Still audio only until the callee answers
    assert_eq!(local_directions(&h, &alice_call, true).len(), 1);

    // A second offer while this one is unanswered is refused
    assert!(matches!(
        h.alice.manager.hold("alice", &alice_call),
        Err(SessionError::RenegotiationInProgress { .. })
    ));

    h.bob
        .manager
        .answer_media_change_request("bob", &bob_call, &[audio(), video()])
        .unwrap();
    h.pump();
    assert!(h.errors.is_empty());

    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendRecv, MediaDirection::SendRecv]
    );
    assert_eq!(
        local_directions(&h, &bob_call, false),
        vec![MediaDirection::SendRecv, MediaDirection::SendRecv]
    );
}

#[test]
fn test_callee_can_decline_added_video() {
    let mut h = Harness::new();
    let (alice_call, bob_call) = h.establish_call(&[audio()], &[]);

    h.alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), video()])
        .unwrap();
    h.pump();

    // Wrong line count is refused and the offer stays answerable
    assert!(matches!(
        h.bob.manager.answer_media_change_request("bob", &bob_call, &[audio()]),
        Err(SessionError::Programming(_))
    ));

    h.bob
        .manager
        .answer_media_change_request("bob", &bob_call, &[audio(), with(&video(), "ENABLED", "false")])
        .unwrap();
    h.pump();

    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendRecv, MediaDirection::Inactive]
    );
}

#[test]
fn test_removing_a_stream_keeps_its_line() {
    let mut h = Harness::new();
    let (alice_call, _) = h.establish_call(&[audio(), video()], &[]);

    h.alice
        .manager
        .request_media_change("alice", &alice_call, &[audio()])
        .unwrap();
    h.pump();

    let local = h.alice.manager.get_active_media_descriptions(&alice_call, true).unwrap();
    assert_eq!(local.len(), 2);
    assert!(local[1].is_rejected());

    assert!(matches!(
        h.alice
            .manager
            .request_media_change("alice", &alice_call, &[video()]),
        Err(SessionError::InvalidMediaList(_))
    ));
}

#[test]
fn test_failed_renegotiation_keeps_previous_media() {
    let mut h = Harness::new();
    let (alice_call, _) = h.establish_call(&[audio(), video()], &[]);
    let before = h.alice.manager.get_active_media_descriptions(&alice_call, true).unwrap();
    h.alice.drain_signals();

    h.alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), with(&video(), "MUTED", "true")])
        .unwrap();
    h.lose_messages();

    assert!(matches!(
        h.alice.manager.handle_media_change_answer(&alice_call, "v=0\r\nbroken\r\n"),
        Err(SessionError::Sdp(_))
    ));

    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Current);
    assert_eq!(
        h.alice.manager.get_active_media_descriptions(&alice_call, true).unwrap(),
        before
    );
    assert_eq!(
        h.alice.drain_signals(),
        vec![Signal::MediaNegotiationStatus {
            call_id: alice_call,
            status: NegotiationStatus::Fail
        }]
    );

    // The failed exchange no longer blocks new ones
    h.alice.manager.hold("alice", &alice_call).unwrap();
    h.pump();
    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Hold);
}

#[test]
fn test_glare_is_refused() {
    let mut h = Harness::new();
    let (alice_call, bob_call) = h.establish_call(&[audio(), video()], &[]);

    h.alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), with(&video(), "MUTED", "true")])
        .unwrap();
    assert!(matches!(
        h.alice
            .manager
            .request_media_change("alice", &alice_call, &[audio(), with(&video(), "ENABLED", "false")]),
        Err(SessionError::RenegotiationInProgress { .. })
    ));

    // Bob's own re-offer crosses Alice's on the wire
    h.bob.manager.hold("bob", &bob_call).unwrap();
    h.pump();

    assert_eq!(h.errors.len(), 2);
    assert!(h
        .errors
        .iter()
        .all(|e| matches!(e, SessionError::RenegotiationInProgress { .. })));
    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Current);
    assert_eq!(h.bob.manager.get_call_state(&bob_call).unwrap(), CallState::Current);
    assert!(h.alice.signaling.sent_names().contains(&"RE-INVITE REJECTED"));
    assert!(h.bob.signaling.sent_names().contains(&"RE-INVITE REJECTED"));
}

#[test]
fn test_both_sides_renegotiate_after_glare() {
    let mut h = Harness::new();
    let (alice_call, bob_call) = h.establish_call(&[audio(), video()], &[]);

    h.alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), with(&video(), "MUTED", "true")])
        .unwrap();
    h.bob.manager.hold("bob", &bob_call).unwrap();
    h.pump();
    assert_eq!(h.errors.len(), 2);

    let crossed = NegotiationStatus::Fail;
    assert!(h.alice.drain_signals().contains(&Signal::MediaNegotiationStatus {
        call_id: alice_call,
        status: crossed
    }));
    assert!(h.bob.drain_signals().contains(&Signal::MediaNegotiationStatus {
        call_id: bob_call,
        status: crossed
    }));
    // Nothing was committed by the crossed exchanges
    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendRecv, MediaDirection::SendRecv]
    );

    h.alice.manager.hold("alice", &alice_call).unwrap();
    h.pump();
    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Hold);

    let outcome = h
        .bob
        .manager
        .request_media_change("bob", &bob_call, &[audio(), with(&video(), "MUTED", "true")])
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::OfferSent);
    h.pump();

    assert_eq!(h.errors.len(), 2);
    assert!(h.bob.drain_signals().contains(&Signal::MediaNegotiationStatus {
        call_id: bob_call,
        status: NegotiationStatus::Success
    }));
    assert_eq!(h.bob.manager.get_call_state(&bob_call).unwrap(), CallState::Current);
    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Hold);
}

#[test]
fn test_transport_failure_during_renegotiation_keeps_the_call() {
    let mut h = Harness::new();
    let (alice_call, bob_call) = h.establish_call(&[audio(), video()], &[]);
    h.alice.drain_signals();

    h.alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), with(&video(), "MUTED", "true")])
        .unwrap();
    h.lose_messages();
    h.alice.manager.handle_transport_failure(&alice_call).unwrap();

    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Current);
    assert_eq!(
        h.alice.drain_signals(),
        vec![Signal::MediaNegotiationStatus {
            call_id: alice_call,
            status: NegotiationStatus::Fail
        }]
    );
    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendRecv, MediaDirection::SendRecv]
    );

    // The call renegotiates normally afterwards
    h.alice.manager.hold("alice", &alice_call).unwrap();
    h.pump();
    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Hold);
    assert_eq!(h.bob.manager.get_call_state(&bob_call).unwrap(), CallState::Current);
    assert!(h.errors.is_empty());
}

#[test]
fn test_remote_hold_keeps_callee_current() {
    let mut h = Harness::new();
    let (alice_call, bob_call) = h.establish_call(&[audio()], &[]);

    h.bob.manager.hold("bob", &bob_call).unwrap();
    h.pump();

    assert_eq!(h.bob.manager.get_call_state(&bob_call).unwrap(), CallState::Hold);
    assert_eq!(h.alice.manager.get_call_state(&alice_call).unwrap(), CallState::Current);
    assert_eq!(local_directions(&h, &alice_call, true), vec![MediaDirection::RecvOnly]);
}

#[test]
fn test_auto_answer_accepts_added_video() {
    let mut h = Harness::with_accounts(AccountConfig::new("alice"), AccountConfig::new("bob").with_auto_answer(true));
    let alice_call = h
        .alice
        .manager
        .place_call_with_media("alice", &h.bob.uri, &[audio()])
        .unwrap();
    h.pump();

    h.alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), video()])
        .unwrap();
    h.pump();

    assert!(h.errors.is_empty());
    assert_eq!(
        local_directions(&h, &alice_call, true),
        vec![MediaDirection::SendRecv, MediaDirection::SendRecv]
    );
}

#[test]
fn test_media_change_refused_before_call_is_answered() {
    let mut h = Harness::new();
    let alice_call = h
        .alice
        .manager
        .place_call_with_media("alice", &h.bob.uri, &[audio()])
        .unwrap();
    h.pump();

    assert!(matches!(
        h.alice
            .manager
            .request_media_change("alice", &alice_call, &[audio(), video()]),
        Err(SessionError::InvalidStateTransition { state: CallState::Ringing, .. })
    ));
    assert!(matches!(
        h.alice.manager.hold("alice", &alice_call),
        Err(SessionError::InvalidStateTransition { .. })
    ));
}

/// Answers every re-offer on its own, refusing any video
struct AudioOnlyPolicy;

impl MediaChangePolicy for AudioOnlyPolicy {
    fn decide(&self, _current: &[MediaAttribute], offered: &[MediaAttribute]) -> MediaChangeDecision {
        MediaChangeDecision::Answer(
            offered
                .iter()
                .cloned()
                .map(|attr| {
                    let audio = attr.media_type == MediaType::Audio;
                    attr.with_enabled(audio)
                })
                .collect(),
        )
    }
}

#[test]
fn test_custom_policy_answers_re_offers() {
    let bob = Endpoint::with_manager(AccountConfig::new("bob"), 30000, |manager| {
        manager.with_media_change_policy(Arc::new(AudioOnlyPolicy))
    });
    let mut h = Harness::with_endpoints(Endpoint::new(AccountConfig::new("alice"), 20000), bob);
    let (alice_call, bob_call) = h.establish_call(&[audio()], &[]);
    h.bob.drain_signals();

    let outcome = h
        .alice
        .manager
        .request_media_change("alice", &alice_call, &[audio(), video()])
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::OfferSent);
    h.pump();

    assert!(h.errors.is_empty());
    assert!(!h
        .bob
        .drain_signals()
        .iter()
        .any(|s| matches!(s, Signal::MediaChangeRequested { .. })));
    let alice_media = h.alice.manager.get_active_media_descriptions(&alice_call, true).unwrap();
    assert_eq!(alice_media.len(), 2);
    assert!(!alice_media[0].is_rejected());
    assert!(alice_media[1].is_rejected());
    assert_eq!(h.bob.manager.get_call_state(&bob_call).unwrap(), CallState::Current);
}
