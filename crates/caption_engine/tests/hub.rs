use std::sync::{Arc, Mutex, Weak};

use caption_engine::{BroadcastHub, ChannelSink, SessionId, TransportFault, ViewerEvent, ViewerSink};

#[derive(Default)]
struct RecordingSink {
    frames: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }
}

impl ViewerSink for RecordingSink {
    fn is_open(&self) -> bool {
        true
    }

    fn send(&self, frame: &str) -> Result<(), TransportFault> {
        self.frames.lock().unwrap().push(frame.to_string());
        Ok(())
    }
}

/// Disconnects a set of sessions (possibly itself) while being delivered to.
struct DisconnectingSink {
    hub: Weak<BroadcastHub>,
    victims: Mutex<Vec<SessionId>>,
}

impl ViewerSink for DisconnectingSink {
    fn is_open(&self) -> bool {
        true
    }

    fn send(&self, _frame: &str) -> Result<(), TransportFault> {
        if let Some(hub) = self.hub.upgrade() {
            for id in self.victims.lock().unwrap().drain(..) {
                hub.unregister(id);
            }
        }
        Err(TransportFault)
    }
}

struct ClosedSink;

impl ViewerSink for ClosedSink {
    fn is_open(&self) -> bool {
        false
    }

    fn send(&self, _frame: &str) -> Result<(), TransportFault> {
        panic!("closed sinks must not be written to");
    }
}

#[test]
fn publish_reaches_every_open_session() {
    let hub = BroadcastHub::new();
    let first = Arc::new(RecordingSink::default());
    let second = Arc::new(RecordingSink::default());
    hub.register(first.clone());
    hub.register(second.clone());
    hub.register(Arc::new(ClosedSink));

    let delivered = hub.publish(&ViewerEvent::Complete);

    assert_eq!(delivered, 2);
    assert_eq!(first.frames(), vec![r#"{"type":"complete"}"#.to_string()]);
    assert_eq!(second.frames(), first.frames());
    assert_eq!(hub.len(), 3);
}

#[test]
fn unregister_during_publish_is_safe() {
    let hub = Arc::new(BroadcastHub::new());
    let disconnecting = Arc::new(DisconnectingSink {
        hub: Arc::downgrade(&hub),
        victims: Mutex::new(Vec::new()),
    });
    let disconnecting_id = hub.register(disconnecting.clone());
    let doomed = Arc::new(RecordingSink::default());
    let doomed_id = hub.register(doomed.clone());
    let survivor = Arc::new(RecordingSink::default());
    hub.register(survivor.clone());
    disconnecting
        .victims
        .lock()
        .unwrap()
        .extend([disconnecting_id, doomed_id]);

    hub.publish(&ViewerEvent::error("boom"));

    assert_eq!(hub.len(), 1);
    assert_eq!(survivor.frames().len(), 1);
    assert!(survivor.frames()[0].contains("boom"));
    assert!(!hub.unregister(doomed_id));

    hub.publish(&ViewerEvent::Complete);
    assert_eq!(survivor.frames().len(), 2);
    assert_eq!(doomed.frames().len(), 1);
}

#[test]
fn failing_session_does_not_block_others() {
    let hub = BroadcastHub::new();
    let (dropped, rx) = ChannelSink::channel();
    drop(rx);
    hub.register(Arc::new(dropped));
    let (live, mut live_rx) = ChannelSink::channel();
    hub.register(Arc::new(live));

    assert_eq!(hub.publish(&ViewerEvent::Complete), 1);
    assert_eq!(live_rx.try_recv().unwrap(), r#"{"type":"complete"}"#);
}

#[test]
fn register_and_unregister_track_membership() {
    let hub = BroadcastHub::new();
    assert!(hub.is_empty());
    let a = hub.register(Arc::new(RecordingSink::default()));
    let b = hub.register(Arc::new(RecordingSink::default()));
    assert_ne!(a, b);
    assert_eq!(hub.len(), 2);

    assert!(hub.unregister(a));
    assert!(!hub.unregister(a));
    assert_eq!(hub.len(), 1);
    assert_eq!(hub.publish(&ViewerEvent::Complete), 1);
}
