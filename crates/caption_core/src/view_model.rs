use crate::{AttemptId, ItemIndex, Phase};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueView {
    pub phase: Phase,
    pub cursor: ItemIndex,
    pub total: usize,
    pub current_path: Option<String>,
    /// Generator invocations started so far.
    pub attempts: AttemptId,
}

impl QueueView {
    /// One-based position label, e.g. `[2/5]`.
    pub fn progress_label(&self) -> String {
        let position = (self.cursor + 1).min(self.total);
        format!("[{position}/{}]", self.total)
    }
}
