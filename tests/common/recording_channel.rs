//! Channel wrapper that records every emission for wire-level assertions.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use reflector_lib::bus::{BusError, EventBus, EventChannel, ListenerFn, ListenerId};

/// Delegates to an in-process [`EventBus`] and keeps an ordered log of
/// `(event, payload)` pairs emitted through it.
pub struct RecordingChannel {
    bus: Arc<EventBus>,
    emitted: Mutex<Vec<(String, Value)>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            bus: EventBus::shared(),
            emitted: Mutex::new(Vec::new()),
        })
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().unwrap().clone()
    }

    /// Payloads emitted on `event`, oldest first.
    pub fn payloads_for(&self, event: &str) -> Vec<Value> {
        self.emitted()
            .into_iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload)
            .collect()
    }

    fn record(&self, event: &str, payload: &Value) {
        self.emitted
            .lock()
            .unwrap()
            .push((event.to_string(), payload.clone()));
    }
}

impl EventChannel for RecordingChannel {
    fn emit(&self, event: &str, payload: Value) -> Result<(), BusError> {
        self.record(event, &payload);
        self.bus.emit(event, payload)
    }

    fn emit_with_reply(&self, event: &str, payload: Value) -> Result<Option<Value>, BusError> {
        self.record(event, &payload);
        self.bus.emit_with_reply(event, payload)
    }

    fn listen(&self, event: &str, handler: ListenerFn) -> ListenerId {
        self.bus.listen(event, handler)
    }

    fn once(&self, event: &str, handler: ListenerFn) -> ListenerId {
        self.bus.once(event, handler)
    }

    fn unlisten(&self, id: ListenerId) {
        self.bus.unlisten(id)
    }
}
