use std::sync::Once;

use caption_core::{
    update, CaptionResult, Decision, DecisionKind, Effect, Msg, Phase, QueueState,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(caption_logging::initialize_for_tests);
}

fn caption(description: &str) -> CaptionResult {
    CaptionResult {
        description: description.to_string(),
        tags: vec!["cat".to_string(), "orange".to_string()],
    }
}

fn generate_attempt(effects: &[Effect]) -> u64 {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Generate { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .expect("generate effect")
}

fn decide(state: QueueState, kind: DecisionKind, path: &str) -> (QueueState, Vec<Effect>) {
    update(state, Msg::Decision(Decision::for_path(kind, path)))
}

#[test]
fn first_viewer_starts_item_zero() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png", "b.png"]), Msg::ViewerConnected);

    assert_eq!(state.phase(), Phase::Processing(0));
    assert_eq!(
        effects,
        vec![Effect::Generate {
            attempt: 1,
            index: 0,
            path: "a.png".to_string(),
        }]
    );
}

#[test]
fn start_message_behaves_like_first_connect() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png"]), Msg::Start);
    assert_eq!(state.phase(), Phase::Processing(0));
    assert_eq!(effects.len(), 1);

    let (state, effects) = update(state, Msg::ViewerConnected);
    assert_eq!(state.phase(), Phase::Processing(0));
    assert!(effects.is_empty());
}

#[test]
fn viewer_connecting_at_idle_first_item_reruns_it() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png", "b.png"]), Msg::ViewerConnected);
    let attempt = generate_attempt(&effects);
    let (state, _) = update(
        state,
        Msg::GenerationSucceeded {
            attempt,
            result: caption("a cat"),
        },
    );
    assert_eq!(state.phase(), Phase::Idle(0));

    let (state, effects) = update(state, Msg::ViewerConnected);
    assert_eq!(state.phase(), Phase::Processing(0));
    assert_eq!(
        effects,
        vec![Effect::Generate {
            attempt: 2,
            index: 0,
            path: "a.png".to_string(),
        }]
    );
}

#[test]
fn viewer_connecting_after_first_item_failed_retries_it() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png"]), Msg::ViewerConnected);
    let attempt = generate_attempt(&effects);
    let (state, _) = update(
        state,
        Msg::GenerationFailed {
            attempt,
            message: "model unreachable".to_string(),
        },
    );

    let (state, effects) = update(state, Msg::ViewerConnected);
    assert_eq!(state.phase(), Phase::Processing(0));
    assert_eq!(generate_attempt(&effects), attempt + 1);
}

#[test]
fn viewer_connecting_past_first_item_starts_nothing() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png", "b.png"]), Msg::ViewerConnected);
    let attempt = generate_attempt(&effects);
    let (state, _) = update(
        state,
        Msg::GenerationSucceeded {
            attempt,
            result: caption("a cat"),
        },
    );
    let (state, effects) = decide(state, DecisionKind::Accept, "a.png");
    let attempt = generate_attempt(&effects);
    let (state, _) = update(
        state,
        Msg::GenerationSucceeded {
            attempt,
            result: caption("a dog"),
        },
    );
    assert_eq!(state.phase(), Phase::Idle(1));

    let (state, effects) = update(state, Msg::ViewerConnected);
    assert_eq!(state.phase(), Phase::Idle(1));
    assert!(effects.is_empty());
}

#[test]
fn two_item_review_reaches_complete_once() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png", "b.png"]), Msg::ViewerConnected);
    let attempt = generate_attempt(&effects);

    let (state, effects) = update(
        state,
        Msg::GenerationSucceeded {
            attempt,
            result: caption("a cat"),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::PublishCaption {
            index: 0,
            result: caption("a cat"),
        }]
    );

    let (state, effects) = decide(state, DecisionKind::Accept, "a.png");
    assert_eq!(state.phase(), Phase::Processing(1));
    assert!(matches!(effects[0], Effect::RecordDecision { index: 0, .. }));
    assert!(matches!(
        &effects[1],
        Effect::Generate { index: 1, path, .. } if path == "b.png"
    ));
    let attempt = generate_attempt(&effects);

    let (state, _) = update(
        state,
        Msg::GenerationSucceeded {
            attempt,
            result: caption("a dog"),
        },
    );
    let (state, effects) = decide(state, DecisionKind::Reject, "b.png");
    assert_eq!(state.phase(), Phase::Complete);
    assert_eq!(state.cursor(), 2);
    assert_eq!(effects.len(), 2);
    assert_eq!(effects[1], Effect::PublishComplete);

    // Terminal: nothing else happens.
    for kind in [
        DecisionKind::Accept,
        DecisionKind::Reject,
        DecisionKind::Regenerate,
    ] {
        let (next, effects) = update(state.clone(), Msg::Decision(Decision::new(kind)));
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }
}

#[test]
fn failure_keeps_cursor_and_accept_still_advances() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png", "b.png"]), Msg::ViewerConnected);
    let attempt = generate_attempt(&effects);

    let (state, effects) = update(
        state,
        Msg::GenerationFailed {
            attempt,
            message: "model returned an empty response".to_string(),
        },
    );
    assert_eq!(state.phase(), Phase::Idle(0));
    assert_eq!(
        effects,
        vec![Effect::PublishError {
            index: 0,
            message: "model returned an empty response".to_string(),
        }]
    );

    let (state, effects) = decide(state, DecisionKind::Accept, "a.png");
    assert_eq!(state.phase(), Phase::Processing(1));
    assert_eq!(effects.len(), 2);
}

#[test]
fn regenerate_reprocesses_same_index() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png", "b.png"]), Msg::ViewerConnected);
    let first = generate_attempt(&effects);
    let (state, _) = update(
        state,
        Msg::GenerationSucceeded {
            attempt: first,
            result: caption("a cat"),
        },
    );

    let (state, effects) = decide(state, DecisionKind::Regenerate, "a.png");
    let second = generate_attempt(&effects);
    assert_ne!(first, second);
    assert_eq!(state.phase(), Phase::Processing(0));
    assert_eq!(state.cursor(), 0);
    assert!(matches!(
        &effects[1],
        Effect::Generate { index: 0, path, .. } if path == "a.png"
    ));
}

#[test]
fn decision_for_another_item_is_stale() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png", "b.png"]), Msg::ViewerConnected);
    let attempt = generate_attempt(&effects);
    let (state, _) = update(
        state,
        Msg::GenerationSucceeded {
            attempt,
            result: caption("a cat"),
        },
    );

    let (next, effects) = decide(state.clone(), DecisionKind::Accept, "b.png");
    assert_eq!(next, state);
    assert!(effects.is_empty());
}

#[test]
fn decision_without_path_applies_to_current_item() {
    init_logging();
    let (state, effects) = update(QueueState::new(["a.png", "b.png"]), Msg::ViewerConnected);
    let attempt = generate_attempt(&effects);
    let (state, _) = update(
        state,
        Msg::GenerationFailed {
            attempt,
            message: "boom".to_string(),
        },
    );

    let (state, effects) = update(state, Msg::Decision(Decision::new(DecisionKind::Reject)));
    assert_eq!(state.cursor(), 1);
    assert!(matches!(
        &effects[0],
        Effect::RecordDecision { index: 0, path, .. } if path == "a.png"
    ));
}

#[test]
fn accept_before_start_honours_viewer_signal() {
    init_logging();
    let (state, effects) = decide(
        QueueState::new(["a.png", "b.png"]),
        DecisionKind::Accept,
        "a.png",
    );
    assert_eq!(state.phase(), Phase::Processing(1));
    assert!(state.has_started());
    assert_eq!(effects.len(), 2);
}

#[test]
fn view_reports_progress() {
    init_logging();
    let (state, _) = update(QueueState::new(["a.png", "b.png", "c.png"]), Msg::Start);
    let view = state.view();

    assert_eq!(view.phase, Phase::Processing(0));
    assert_eq!(view.total, 3);
    assert_eq!(view.current_path.as_deref(), Some("a.png"));
    assert_eq!(view.attempts, 1);
    assert_eq!(view.progress_label(), "[1/3]");
}
