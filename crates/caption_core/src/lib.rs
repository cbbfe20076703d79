//! Caption core: pure review-queue state machine and view-model helpers.
//!
//! Nothing in this crate performs IO. Callers feed [`Msg`] values through
//! [`update`] and execute the returned [`Effect`]s themselves.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{Decision, DecisionKind, Msg};
pub use state::{AttemptId, CaptionResult, ItemIndex, Phase, QueueState};
pub use update::update;
pub use view_model::QueueView;
