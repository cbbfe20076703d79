use crate::view_model::QueueView;

pub type ItemIndex = usize;
pub type AttemptId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptionResult {
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle(ItemIndex),
    Processing(ItemIndex),
    Complete,
}

/// Shared review queue: a fixed item list, a forward-only cursor and the
/// single-flight guard.
///
/// `in_flight` holds the attempt id of the outstanding generator call, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueState {
    items: Vec<String>,
    cursor: ItemIndex,
    in_flight: Option<AttemptId>,
    started: bool,
    attempts: AttemptId,
}

impl QueueState {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn view(&self) -> QueueView {
        QueueView {
            phase: self.phase(),
            cursor: self.cursor,
            total: self.items.len(),
            current_path: self.current_path().map(ToOwned::to_owned),
            attempts: self.attempts,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.is_complete() {
            Phase::Complete
        } else if self.in_flight.is_some() {
            Phase::Processing(self.cursor)
        } else {
            Phase::Idle(self.cursor)
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn cursor(&self) -> ItemIndex {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.items.len()
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn current_path(&self) -> Option<&str> {
        self.items.get(self.cursor).map(String::as_str)
    }

    /// Claims the single-flight slot for the current item.
    ///
    /// Returns `None` while another attempt is outstanding or once the queue
    /// is complete.
    pub(crate) fn begin_attempt(&mut self) -> Option<(AttemptId, ItemIndex, String)> {
        if self.in_flight.is_some() {
            return None;
        }
        let path = self.current_path()?.to_owned();
        self.attempts += 1;
        self.in_flight = Some(self.attempts);
        self.started = true;
        Some((self.attempts, self.cursor, path))
    }

    /// Releases the slot if `attempt` is the outstanding one.
    pub(crate) fn finish_attempt(&mut self, attempt: AttemptId) -> Option<ItemIndex> {
        if self.in_flight == Some(attempt) {
            self.in_flight = None;
            Some(self.cursor)
        } else {
            None
        }
    }

    /// Moves the cursor to the next item. Never moves past `len()`.
    pub(crate) fn advance(&mut self) {
        if self.cursor < self.items.len() {
            self.cursor += 1;
        }
    }
}
