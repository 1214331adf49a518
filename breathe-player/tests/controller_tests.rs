//! Playback controller integration tests
//!
//! Runs real plans through the controller on a paused tokio clock, so phase
//! timing is asserted in virtual milliseconds.

mod helpers;

use breathe_common::events::BreathEvent;
use breathe_common::{PhaseKind, PlayStatus};
use breathe_player::plan::SequenceVariation;
use breathe_player::Error;
use helpers::*;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::Instant;

fn midpoint() -> Box<SequenceVariation> {
    Box::new(SequenceVariation::constant(0.5))
}

#[tokio::test(start_paused = true)]
async fn test_plays_to_completion_then_stops() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    let started = Instant::now();
    let run_id = controller
        .start_with_source(breath_plan("calm", 2, 4000), midpoint())
        .await;
    assert_eq!(controller.status(), PlayStatus::Playing);

    let mut kinds = Vec::new();
    let phases_played = loop {
        match next_event(&mut rx).await {
            BreathEvent::PhaseStarted { phase, .. } => kinds.push(phase.kind()),
            BreathEvent::ExerciseCompleted {
                run_id: id,
                phases_played,
                ..
            } => {
                assert_eq!(id, run_id);
                break phases_played;
            }
            BreathEvent::PlayStatusChanged { .. } => {}
        }
    };
    let elapsed = started.elapsed();

    assert_eq!(
        kinds,
        vec![
            PhaseKind::Inhale,
            PhaseKind::Exhale,
            PhaseKind::Inhale,
            PhaseKind::Exhale,
            PhaseKind::Relax,
        ]
    );
    assert_eq!(phases_played, 4);
    // 4 x 2000ms phases + 1000ms relax
    assert!(elapsed >= Duration::from_millis(9000), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(9100), "elapsed {:?}", elapsed);

    match next_event(&mut rx).await {
        BreathEvent::PlayStatusChanged {
            old_status,
            new_status,
            ..
        } => {
            assert_eq!(old_status, PlayStatus::Playing);
            assert_eq!(new_status, PlayStatus::Stopped);
        }
        other => panic!("expected final status change, got {:?}", other),
    }

    assert_eq!(controller.status(), PlayStatus::Stopped);
    assert!(controller.current_phase().await.is_none());
    assert_eq!(wake_lock.acquired(), 1);
    assert_eq!(wake_lock.released(), 1);
    assert_eq!(sound.stops(), 1);

    let cues = sound.cues();
    assert_eq!(cues.len(), 5);
    assert_eq!(cues[4].kind, PhaseKind::Relax);
    assert_eq!(cues[4].duration_ms, 1000);
    assert!(cues.iter().all(|c| c.choice == "default"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_ends_run_without_later_events() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(breath_plan("calm", 5, 4000), midpoint())
        .await;
    let first = next_phase(&mut rx).await;
    assert_eq!(first.kind(), PhaseKind::Inhale);
    assert_eq!(
        controller.current_phase().await.map(|p| p.kind()),
        Some(PhaseKind::Inhale)
    );

    controller.stop().await;
    assert_eq!(controller.status(), PlayStatus::Stopped);
    assert!(controller.current_phase().await.is_none());

    let mut saw_stopped = false;
    while let Ok(event) = rx.try_recv() {
        if let BreathEvent::PlayStatusChanged { new_status, .. } = event {
            saw_stopped |= new_status == PlayStatus::Stopped;
        }
    }
    assert!(saw_stopped);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    assert_eq!(wake_lock.released(), 1);
    assert_eq!(sound.stops(), 1);
    assert_eq!(sound.cue_kinds(), vec![PhaseKind::Inhale]);

    // Stopping again is a no-op
    controller.stop().await;
    assert_eq!(wake_lock.released(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_blocks_after_current_phase() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(breath_plan("calm", 3, 4000), midpoint())
        .await;
    let inhale = next_phase(&mut rx).await;
    assert_eq!(inhale.kind(), PhaseKind::Inhale);

    controller.pause().await.unwrap();
    assert_eq!(controller.status(), PlayStatus::Paused);
    assert_eq!(controller.status_for("calm"), PlayStatus::Paused);
    assert_eq!(sound.pauses(), 1);

    // Pausing twice changes nothing
    controller.pause().await.unwrap();
    assert_eq!(sound.pauses(), 1);

    let blocked = tokio::time::timeout(Duration::from_secs(30), next_phase(&mut rx)).await;
    assert!(blocked.is_err(), "no phase may start while paused");

    controller.resume(None).await.unwrap();
    assert_eq!(controller.status(), PlayStatus::Playing);

    let exhale = next_phase(&mut rx).await;
    assert_eq!(exhale.kind(), PhaseKind::Exhale);
    assert_eq!(exhale.repetition().current_repetition, 1);

    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_resume_when_playing_is_noop() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(breath_plan("calm", 3, 4000), midpoint())
        .await;
    next_phase(&mut rx).await;

    controller
        .resume(Some(breath_plan("other", 1, 2000)))
        .await
        .unwrap();
    assert_eq!(controller.status_for("calm"), PlayStatus::Playing);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_skip_cuts_hold_short() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(hold_plan("box", 2, 4000), midpoint())
        .await;
    assert_eq!(next_phase(&mut rx).await.kind(), PhaseKind::Inhale);

    let hold = next_phase(&mut rx).await;
    assert_eq!(hold.kind(), PhaseKind::Hold);
    assert_eq!(hold.duration_ms(), 4000);
    let hold_started = Instant::now();

    controller.skip().await.unwrap();
    let exhale = next_phase(&mut rx).await;
    assert_eq!(exhale.kind(), PhaseKind::Exhale);
    assert!(hold_started.elapsed() < Duration::from_millis(10));
    assert_eq!(controller.status(), PlayStatus::Playing);

    // One-shot: the next hold plays in full
    assert_eq!(next_phase(&mut rx).await.kind(), PhaseKind::Inhale);
    let hold = next_phase(&mut rx).await;
    let hold_started = Instant::now();
    assert_eq!(hold.kind(), PhaseKind::Hold);
    next_phase(&mut rx).await;
    assert!(hold_started.elapsed() >= Duration::from_millis(4000));

    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_skip_during_breath_waits_then_skips_hold() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(hold_plan("box", 2, 4000), midpoint())
        .await;
    let inhale = next_phase(&mut rx).await;
    assert_eq!(inhale.kind(), PhaseKind::Inhale);
    let inhale_started = Instant::now();

    controller.skip().await.unwrap();
    let next = next_phase(&mut rx).await;
    let elapsed = inhale_started.elapsed();

    assert_eq!(next.kind(), PhaseKind::Exhale);
    assert!(elapsed >= Duration::from_millis(4000), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(4100), "elapsed {:?}", elapsed);
    assert_eq!(
        sound.cue_kinds(),
        vec![PhaseKind::Inhale, PhaseKind::Exhale]
    );

    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_skip_while_paused_applies_after_resume() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(hold_plan("box", 2, 4000), midpoint())
        .await;
    assert_eq!(next_phase(&mut rx).await.kind(), PhaseKind::Inhale);

    controller.pause().await.unwrap();
    controller.skip().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(controller.status(), PlayStatus::Paused);

    controller.resume(None).await.unwrap();
    assert_eq!(next_phase(&mut rx).await.kind(), PhaseKind::Exhale);

    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_resume_with_updated_plan_restarts_repetition() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(breath_plan("calm", 3, 4000), midpoint())
        .await;
    next_phase(&mut rx).await; // rep 1 inhale
    next_phase(&mut rx).await; // rep 1 exhale
    let inhale = next_phase(&mut rx).await;
    assert_eq!(inhale.repetition().current_repetition, 2);

    controller.pause().await.unwrap();
    controller
        .resume(Some(breath_plan("calm-slow", 3, 6000)))
        .await
        .unwrap();

    let restarted = next_phase(&mut rx).await;
    assert_eq!(restarted.kind(), PhaseKind::Inhale);
    assert_eq!(restarted.duration_ms(), 3000);
    assert_eq!(restarted.repetition().current_repetition, 2);
    assert_eq!(restarted.repetition().total_repetitions, 3);

    assert_eq!(controller.status_for("calm-slow"), PlayStatus::Playing);
    assert_eq!(controller.status_for("calm"), PlayStatus::Other);

    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_supersedes_active_run() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    let first = controller
        .start_with_source(breath_plan("a", 5, 4000), midpoint())
        .await;
    next_phase(&mut rx).await;

    let second = controller
        .start_with_source(breath_plan("b", 5, 4000), midpoint())
        .await;
    assert_ne!(first, second);
    assert_eq!(controller.status_for("a"), PlayStatus::Other);
    assert_eq!(controller.status_for("b"), PlayStatus::Playing);

    // The first run is reported stopped before the second one starts
    let mut first_stopped = false;
    loop {
        match next_event(&mut rx).await {
            BreathEvent::PlayStatusChanged {
                run_id, new_status, ..
            } if run_id == first => {
                assert_eq!(new_status, PlayStatus::Stopped);
                first_stopped = true;
            }
            BreathEvent::PlayStatusChanged {
                run_id, new_status, ..
            } => {
                assert_eq!(run_id, second);
                assert_eq!(new_status, PlayStatus::Playing);
                assert!(first_stopped);
            }
            BreathEvent::PhaseStarted { run_id, .. } => {
                assert_eq!(run_id, second);
                break;
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    assert_eq!(wake_lock.acquired(), 2);
    assert_eq!(wake_lock.released(), 1);

    controller.stop().await;
    assert_eq!(wake_lock.released(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restart_after_completion_keeps_new_cue() {
    for _ in 0..20 {
        let sound = RecordingSound::new();
        let wake_lock = RecordingWakeLock::new();
        let controller = controller_with(&sound, &wake_lock, settings(5));
        let mut rx = controller.subscribe();

        controller
            .start_with_source(breath_plan("first", 1, 20), midpoint())
            .await;
        while next_phase(&mut rx).await.kind() != PhaseKind::Relax {}

        // Restart the moment the finished run leaves the slot
        while controller.status() != PlayStatus::Stopped {
            tokio::task::yield_now().await;
        }
        let second = controller
            .start_with_source(breath_plan("second", 1, 2000), midpoint())
            .await;
        loop {
            if let BreathEvent::PhaseStarted { run_id, .. } = next_event(&mut rx).await {
                if run_id == second {
                    break;
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            sound.calls(),
            vec![
                SoundCall::Play(PhaseKind::Inhale),
                SoundCall::Play(PhaseKind::Exhale),
                SoundCall::Play(PhaseKind::Relax),
                SoundCall::Stop,
                SoundCall::Play(PhaseKind::Inhale),
            ]
        );
        assert_eq!(wake_lock.released(), 1);

        controller.stop().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_sound_failures_do_not_abort_run() {
    let sound = RecordingSound::failing();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(500));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(breath_plan("calm", 1, 2000), midpoint())
        .await;

    let phases_played = loop {
        if let BreathEvent::ExerciseCompleted { phases_played, .. } = next_event(&mut rx).await {
            break phases_played;
        }
    };

    assert_eq!(phases_played, 2);
    assert_eq!(
        sound.cue_kinds(),
        vec![PhaseKind::Inhale, PhaseKind::Exhale, PhaseKind::Relax]
    );
    assert_eq!(wake_lock.released(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wake_lock_failure_is_not_fatal() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::failing();
    let controller = controller_with(&sound, &wake_lock, settings(500));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(breath_plan("calm", 1, 2000), midpoint())
        .await;
    loop {
        if let BreathEvent::ExerciseCompleted { .. } = next_event(&mut rx).await {
            break;
        }
    }

    assert_eq!(sound.cues().len(), 3);
    assert_eq!(wake_lock.released(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pre_roll_passed_to_sound() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let mut settings = settings(500);
    settings.sound_pre_roll_ms = 150;
    let controller = controller_with(&sound, &wake_lock, settings);
    let mut rx = controller.subscribe();

    let started = Instant::now();
    controller
        .start_with_source(hold_plan("box", 1, 3000), midpoint())
        .await;

    let mut offsets = Vec::new();
    loop {
        match next_event(&mut rx).await {
            BreathEvent::PhaseStarted { phase, .. } => {
                offsets.push((phase.kind(), started.elapsed()));
            }
            BreathEvent::ExerciseCompleted { .. } => {
                offsets.push((PhaseKind::Relax, started.elapsed()));
                break;
            }
            _ => {}
        }
    }

    // each 3000 ms phase sleeps 2850 ms; the relax wait is not shortened
    let expected = [
        (PhaseKind::Inhale, 0),
        (PhaseKind::Hold, 2850),
        (PhaseKind::Exhale, 5700),
        (PhaseKind::Relax, 8550),
        (PhaseKind::Relax, 9050),
    ];
    assert_eq!(offsets.len(), expected.len());
    for ((kind, at), (expected_kind, expected_ms)) in offsets.iter().zip(expected) {
        assert_eq!(*kind, expected_kind);
        let at_ms = at.as_millis() as u64;
        assert!(
            (expected_ms..expected_ms + 10).contains(&at_ms),
            "{} started at {}ms, expected {}ms",
            kind,
            at_ms,
            expected_ms
        );
    }

    let cues = sound.cues();
    assert!(cues.iter().all(|c| c.delay_ms == 150));
    let durations: Vec<u64> = cues.iter().map(|c| c.duration_ms).collect();
    assert_eq!(durations, vec![3000, 3000, 3000, 500]);
}

#[tokio::test(start_paused = true)]
async fn test_pre_roll_longer_than_phase_does_not_sleep() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let mut settings = settings(0);
    settings.sound_pre_roll_ms = 5000;
    let controller = controller_with(&sound, &wake_lock, settings);
    let mut rx = controller.subscribe();

    let started = Instant::now();
    controller
        .start_with_source(breath_plan("quick", 2, 4000), midpoint())
        .await;
    loop {
        if let BreathEvent::ExerciseCompleted { phases_played, .. } = next_event(&mut rx).await {
            assert_eq!(phases_played, 4);
            break;
        }
    }
    assert!(started.elapsed() < Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn test_zero_repetitions_plays_only_relax() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));
    let mut rx = controller.subscribe();

    controller
        .start_with_source(breath_plan("empty", 0, 4000), midpoint())
        .await;
    let relax = next_phase(&mut rx).await;
    assert_eq!(relax.kind(), PhaseKind::Relax);

    match next_event(&mut rx).await {
        BreathEvent::ExerciseCompleted { phases_played, .. } => assert_eq!(phases_played, 0),
        other => panic!("expected completion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_commands_without_run() {
    let sound = RecordingSound::new();
    let wake_lock = RecordingWakeLock::new();
    let controller = controller_with(&sound, &wake_lock, settings(1000));

    assert!(matches!(controller.pause().await, Err(Error::InvalidState(_))));
    assert!(matches!(
        controller.resume(None).await,
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(controller.skip().await, Err(Error::InvalidState(_))));

    controller.stop().await;
    assert_eq!(controller.status(), PlayStatus::Stopped);
    assert_eq!(controller.status_for("anything"), PlayStatus::Stopped);
    assert_eq!(sound.stops(), 0);
}
