use crate::{AttemptId, CaptionResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator asked to begin processing without waiting for a viewer.
    Start,
    /// A viewer session opened.
    ViewerConnected,
    /// A viewer decided on the current item.
    Decision(Decision),
    /// The generator produced a caption for an outstanding attempt.
    GenerationSucceeded {
        attempt: AttemptId,
        result: CaptionResult,
    },
    /// The attempt failed: unreadable image, transport error or unparseable output.
    GenerationFailed { attempt: AttemptId, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Accept,
    Reject,
    Regenerate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub kind: DecisionKind,
    /// Item the viewer was looking at; `None` applies to whatever is current.
    pub path: Option<String>,
    pub caption: Option<String>,
    pub tags: Vec<String>,
}

impl Decision {
    pub fn new(kind: DecisionKind) -> Self {
        Self {
            kind,
            path: None,
            caption: None,
            tags: Vec::new(),
        }
    }

    pub fn for_path(kind: DecisionKind, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::new(kind)
        }
    }
}
