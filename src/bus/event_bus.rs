use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::channel::{BusError, EventChannel, ListenerFn, ListenerId};

const BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    pub id: String,
    pub seq: i64,
    pub event: String,
    pub payload: Value,
    pub created_at: String,
}

impl BusEvent {
    pub fn new(seq: i64, event: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            seq,
            event: event.into(),
            payload,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

struct Listener {
    id: ListenerId,
    once: bool,
    handler: ListenerFn,
}

/// In-process named-event bus.
///
/// Listeners are keyed by event name. Handlers run on the emitting task with
/// no internal lock held, so a handler may emit or unlisten re-entrantly.
/// Every emitted event is also mirrored on a broadcast tap for observers.
pub struct EventBus {
    listeners: DashMap<String, Vec<Listener>>,
    index: DashMap<ListenerId, String>,
    tap: broadcast::Sender<BusEvent>,
    seq: AtomicI64,
    next_listener: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        let (tap, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            listeners: DashMap::new(),
            index: DashMap::new(),
            tap,
            seq: AtomicI64::new(0),
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Get a receiver that observes every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tap.subscribe()
    }

    /// Number of listeners currently attached to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map(|entry| entry.len()).unwrap_or(0)
    }

    pub fn total_listeners(&self) -> usize {
        self.index.len()
    }

    fn add_listener(&self, event: &str, handler: ListenerFn, once: bool) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.index.insert(id, event.to_string());
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(Listener { id, once, handler });
        id
    }

    fn stamp(&self, event: &str, payload: Value) -> BusEvent {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let stamped = BusEvent::new(seq, event, payload);
        // No tap receivers is the normal case outside of tests.
        let _ = self.tap.send(stamped.clone());
        stamped
    }

    /// Invoke every listener for the event and return the first reply.
    fn dispatch(&self, event: &BusEvent) -> Option<Value> {
        let (handlers, fired_once) = {
            let Some(mut entry) = self.listeners.get_mut(&event.event) else {
                tracing::trace!("no listeners for {}", event.event);
                return None;
            };
            let handlers: Vec<ListenerFn> = entry.iter().map(|l| l.handler.clone()).collect();
            let fired_once: Vec<ListenerId> =
                entry.iter().filter(|l| l.once).map(|l| l.id).collect();
            entry.retain(|l| !l.once);
            (handlers, fired_once)
        };

        for id in &fired_once {
            self.index.remove(id);
        }
        self.listeners.remove_if(&event.event, |_, entry| entry.is_empty());

        let mut reply = None;
        for handler in handlers {
            let value = handler(event);
            if reply.is_none() {
                reply = value;
            }
        }
        reply
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel for EventBus {
    fn emit(&self, event: &str, payload: Value) -> Result<(), BusError> {
        let stamped = self.stamp(event, payload);
        self.dispatch(&stamped);
        Ok(())
    }

    fn emit_with_reply(&self, event: &str, payload: Value) -> Result<Option<Value>, BusError> {
        let stamped = self.stamp(event, payload);
        Ok(self.dispatch(&stamped))
    }

    fn listen(&self, event: &str, handler: ListenerFn) -> ListenerId {
        self.add_listener(event, handler, false)
    }

    fn once(&self, event: &str, handler: ListenerFn) -> ListenerId {
        self.add_listener(event, handler, true)
    }

    fn unlisten(&self, id: ListenerId) {
        let Some((_, event)) = self.index.remove(&id) else {
            return;
        };
        if let Some(mut entry) = self.listeners.get_mut(&event) {
            entry.retain(|l| l.id != id);
        }
        self.listeners.remove_if(&event, |_, entry| entry.is_empty());
    }
}
