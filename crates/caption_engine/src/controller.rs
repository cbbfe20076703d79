use std::io;
use std::sync::Arc;

use caption_core::{
    update, CaptionResult, Decision, DecisionKind, Effect, ItemIndex, Msg, QueueState,
};
use caption_logging::{caption_debug, caption_error, caption_info, caption_warn};
use tokio::sync::mpsc;

use crate::generate::{CaptionGenerator, GenerationFailure};
use crate::hub::BroadcastHub;
use crate::media::{mime_type_for, ImageSource};
use crate::protocol::{parse_viewer_message, ViewerEvent};

#[derive(Debug, thiserror::Error)]
pub enum ItemFailure {
    #[error("failed to read image {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
}

/// Cloneable entry point for the transport shell.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Msg>,
}

impl ControllerHandle {
    /// Returns `false` once the controller has stopped.
    pub fn send(&self, msg: Msg) -> bool {
        self.tx.send(msg).is_ok()
    }

    pub fn start(&self) {
        let _ = self.send(Msg::Start);
    }

    pub fn viewer_connected(&self) {
        let _ = self.send(Msg::ViewerConnected);
    }

    pub fn decide(&self, decision: Decision) {
        let _ = self.send(Msg::Decision(decision));
    }

    /// Parses a raw viewer frame and forwards it. Malformed frames and
    /// unknown message types are logged and dropped.
    pub fn viewer_message(&self, text: &str) {
        match parse_viewer_message(text) {
            Ok(Some(decision)) => self.decide(decision),
            Ok(None) => caption_debug!("Ignoring viewer message with unknown type"),
            Err(err) => caption_warn!("Error handling viewer message: {}", err),
        }
    }
}

/// Owns the queue state and executes the effects produced by [`update`].
///
/// Messages are applied one at a time in arrival order. Generator work runs
/// on a spawned task and reports back through the same inbox.
pub struct QueueController {
    state: QueueState,
    inbox: mpsc::UnboundedReceiver<Msg>,
    feedback: mpsc::WeakUnboundedSender<Msg>,
    hub: Arc<BroadcastHub>,
    generator: Arc<dyn CaptionGenerator>,
    images: Arc<dyn ImageSource>,
}

impl QueueController {
    pub fn new(
        state: QueueState,
        hub: Arc<BroadcastHub>,
        generator: Arc<dyn CaptionGenerator>,
        images: Arc<dyn ImageSource>,
    ) -> (Self, ControllerHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let controller = Self {
            state,
            inbox,
            feedback: tx.downgrade(),
            hub,
            generator,
            images,
        };
        (controller, ControllerHandle { tx })
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    /// Runs until every [`ControllerHandle`] is dropped and no generation is
    /// outstanding. Returns the final state.
    pub async fn run(mut self) -> QueueState {
        while let Some(msg) = self.inbox.recv().await {
            self.dispatch(msg);
        }
        self.state
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<QueueState> {
        tokio::spawn(self.run())
    }

    fn dispatch(&mut self, msg: Msg) {
        let is_decision = matches!(msg, Msg::Decision(_));
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        if is_decision && effects.is_empty() {
            caption_debug!("Ignoring decision while {:?}", self.state.phase());
        }
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&self, effect: Effect) {
        match effect {
            Effect::Generate {
                attempt,
                index,
                path,
            } => {
                caption_info!(
                    "Processing [{}/{}]: {}",
                    index + 1,
                    self.state.len(),
                    path
                );
                let Some(feedback) = self.feedback.upgrade() else {
                    caption_debug!("Controller shutting down; dropping attempt {}", attempt);
                    return;
                };
                let hub = Arc::clone(&self.hub);
                let generator = Arc::clone(&self.generator);
                let images = Arc::clone(&self.images);
                tokio::spawn(async move {
                    let msg = match process_item(&path, &hub, generator.as_ref(), images.as_ref())
                        .await
                    {
                        Ok(result) => Msg::GenerationSucceeded { attempt, result },
                        Err(err) => {
                            caption_error!("Error processing {}: {}", path, err);
                            Msg::GenerationFailed {
                                attempt,
                                message: err.to_string(),
                            }
                        }
                    };
                    let _ = feedback.send(msg);
                });
            }
            Effect::PublishCaption { index, result } => {
                caption_info!("Description [{}]: {}", index + 1, result.description);
                caption_info!("Tags [{}]: {}", index + 1, result.tags.join(", "));
                self.hub.publish(&ViewerEvent::caption(result));
            }
            Effect::PublishError { index, message } => {
                caption_debug!("Reporting failure for item {}", index + 1);
                self.hub.publish(&ViewerEvent::error(message));
            }
            Effect::PublishComplete => {
                caption_info!("All {} images processed", self.state.len());
                self.hub.publish(&ViewerEvent::Complete);
            }
            Effect::RecordDecision {
                index,
                path,
                decision,
            } => log_decision(index, &path, &decision),
        }
    }
}

async fn process_item(
    path: &str,
    hub: &BroadcastHub,
    generator: &dyn CaptionGenerator,
    images: &dyn ImageSource,
) -> Result<CaptionResult, ItemFailure> {
    let bytes = images.load(path).await.map_err(|source| ItemFailure::Read {
        path: path.to_string(),
        source,
    })?;
    let mime_type = mime_type_for(path);
    // Viewers see the image while the caption is being generated.
    hub.publish(&ViewerEvent::image(path, &bytes, mime_type));
    Ok(generator.generate(&bytes, mime_type).await?)
}

fn log_decision(index: ItemIndex, path: &str, decision: &Decision) {
    match decision.kind {
        DecisionKind::Accept => {
            caption_info!("ACCEPTED [{}]: {}", index + 1, path);
            caption_info!("Caption: {}", decision.caption.as_deref().unwrap_or(""));
            caption_info!("Tags: {}", decision.tags.join(", "));
        }
        DecisionKind::Reject => caption_info!("REJECTED [{}]: {}", index + 1, path),
        DecisionKind::Regenerate => caption_info!("REGENERATING [{}]: {}", index + 1, path),
    }
}
