use crate::{Decision, DecisionKind, Effect, Msg, Phase, QueueState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: QueueState, msg: Msg) -> (QueueState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start | Msg::ViewerConnected => {
            // Only an idle first item is (re)run; past it, viewers join mid-sequence.
            if state.phase() == Phase::Idle(0) {
                start_current(&mut state).into_iter().collect()
            } else {
                Vec::new()
            }
        }
        Msg::Decision(decision) => apply_decision(&mut state, decision),
        Msg::GenerationSucceeded { attempt, result } => match state.finish_attempt(attempt) {
            Some(index) => vec![Effect::PublishCaption { index, result }],
            None => Vec::new(),
        },
        Msg::GenerationFailed { attempt, message } => match state.finish_attempt(attempt) {
            Some(index) => vec![Effect::PublishError { index, message }],
            None => Vec::new(),
        },
    };

    (state, effects)
}

fn apply_decision(state: &mut QueueState, decision: Decision) -> Vec<Effect> {
    // Decisions only land on an idle item; Processing and Complete swallow them.
    let Phase::Idle(index) = state.phase() else {
        return Vec::new();
    };
    let Some(current) = state.current_path().map(ToOwned::to_owned) else {
        return Vec::new();
    };
    if decision.path.as_deref().is_some_and(|path| path != current) {
        return Vec::new();
    }

    let kind = decision.kind;
    let mut effects = vec![Effect::RecordDecision {
        index,
        path: current,
        decision,
    }];

    match kind {
        DecisionKind::Regenerate => {
            effects.extend(start_current(state));
        }
        DecisionKind::Accept | DecisionKind::Reject => {
            state.advance();
            if state.is_complete() {
                effects.push(Effect::PublishComplete);
            } else {
                effects.extend(start_current(state));
            }
        }
    }
    effects
}

fn start_current(state: &mut QueueState) -> Option<Effect> {
    state
        .begin_attempt()
        .map(|(attempt, index, path)| Effect::Generate {
            attempt,
            index,
            path,
        })
}
