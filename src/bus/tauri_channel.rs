use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tauri::{AppHandle, Emitter, Listener, Runtime};

use super::channel::{BusError, EventChannel, ListenerFn, ListenerId};
use super::BusEvent;

/// [`EventChannel`] over a Tauri app handle, so the reflector can talk to a
/// webview extension through the host's own event system.
///
/// Tauri delivers payloads as JSON text; anything that fails to parse is
/// handed to listeners as a JSON string.
pub struct TauriChannel<R: Runtime> {
    app: AppHandle<R>,
    seq: Arc<AtomicI64>,
}

impl<R: Runtime> TauriChannel<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self {
            app,
            seq: Arc::new(AtomicI64::new(0)),
        }
    }

    fn wrap(&self, event: &str, handler: ListenerFn) -> impl Fn(tauri::Event) + Send + 'static {
        let seq = self.seq.clone();
        let name = event.to_string();
        move |event: tauri::Event| {
            let payload = serde_json::from_str(event.payload())
                .unwrap_or_else(|_| Value::String(event.payload().to_string()));
            let stamped = BusEvent::new(seq.fetch_add(1, Ordering::Relaxed), name.clone(), payload);
            let _ = handler(&stamped);
        }
    }
}

impl<R: Runtime> EventChannel for TauriChannel<R> {
    fn emit(&self, event: &str, payload: Value) -> Result<(), BusError> {
        self.app
            .emit(event, payload)
            .map_err(|e| BusError::Emit(format!("{event}: {e}")))
    }

    fn listen(&self, event: &str, handler: ListenerFn) -> ListenerId {
        let wrapped = self.wrap(event, handler);
        ListenerId(u64::from(self.app.listen(event.to_string(), wrapped)))
    }

    fn once(&self, event: &str, handler: ListenerFn) -> ListenerId {
        let wrapped = self.wrap(event, handler);
        ListenerId(u64::from(self.app.once(event.to_string(), wrapped)))
    }

    fn unlisten(&self, id: ListenerId) {
        match u32::try_from(id.0) {
            Ok(event_id) => self.app.unlisten(event_id),
            Err(_) => tracing::warn!("listener id {} is not a tauri event id", id.0),
        }
    }
}
