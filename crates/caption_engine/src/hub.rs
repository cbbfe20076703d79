use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use caption_logging::{caption_error, caption_trace};
use tokio::sync::mpsc;

use crate::protocol::ViewerEvent;

pub type SessionId = u64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("viewer channel closed")]
pub struct TransportFault;

/// Send side of one viewer session.
pub trait ViewerSink: Send + Sync {
    fn is_open(&self) -> bool;
    fn send(&self, frame: &str) -> Result<(), TransportFault>;
}

/// Sink backed by an unbounded channel drained by the session's writer task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ViewerSink for ChannelSink {
    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, frame: &str) -> Result<(), TransportFault> {
        self.tx.send(frame.to_string()).map_err(|_| TransportFault)
    }
}

/// Set of connected viewers plus best-effort fan-out.
///
/// `publish` iterates a snapshot of the membership, so sessions may register
/// or unregister (including from inside a sink) while a fan-out is running.
#[derive(Default)]
pub struct BroadcastHub {
    sessions: Mutex<BTreeMap<SessionId, Arc<dyn ViewerSink>>>,
    next_id: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: Arc<dyn ViewerSink>) -> SessionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock().insert(id, sink);
        id
    }

    /// Returns `false` if the session was already gone.
    pub fn unregister(&self, id: SessionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Serializes `event` once and delivers it to every open session.
    ///
    /// Returns how many sessions accepted the frame. Closed or failing
    /// sessions are skipped.
    pub fn publish(&self, event: &ViewerEvent) -> usize {
        match event.to_json() {
            Ok(frame) => self.publish_frame(&frame),
            Err(err) => {
                caption_error!("Failed to encode viewer event: {}", err);
                0
            }
        }
    }

    pub fn publish_frame(&self, frame: &str) -> usize {
        let mut delivered = 0;
        for (id, sink) in self.snapshot() {
            if !sink.is_open() {
                caption_trace!("Skipping closed viewer {}", id);
                continue;
            }
            match sink.send(frame) {
                Ok(()) => delivered += 1,
                Err(fault) => caption_trace!("Viewer {} dropped frame: {}", id, fault),
            }
        }
        delivered
    }

    fn snapshot(&self) -> Vec<(SessionId, Arc<dyn ViewerSink>)> {
        self.lock()
            .iter()
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<SessionId, Arc<dyn ViewerSink>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
