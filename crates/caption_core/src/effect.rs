use crate::{AttemptId, CaptionResult, Decision, ItemIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Load the item, publish its image to viewers, then run the generator.
    Generate {
        attempt: AttemptId,
        index: ItemIndex,
        path: String,
    },
    PublishCaption {
        index: ItemIndex,
        result: CaptionResult,
    },
    PublishError {
        index: ItemIndex,
        message: String,
    },
    PublishComplete,
    /// A viewer decision was applied to the item at `index`.
    RecordDecision {
        index: ItemIndex,
        path: String,
        decision: Decision,
    },
}
