use std::sync::Arc;

use serde_json::Value;

use super::BusEvent;

/// Handle returned by `listen`/`once`, used to detach the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Listener callback. The return value is only consulted by
/// [`EventChannel::emit_with_reply`]; plain emits discard it.
pub type ListenerFn = Arc<dyn Fn(&BusEvent) -> Option<Value> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BusError {
    #[error("emit failed: {0}")]
    Emit(String),
    #[error("channel has no direct return path")]
    DirectReturnUnsupported,
}

/// One-way publish/subscribe channel shared by the backend and the UI
/// extension context. Event names are the only addressing mechanism.
pub trait EventChannel: Send + Sync {
    /// Fire-and-forget publish.
    fn emit(&self, event: &str, payload: Value) -> Result<(), BusError>;

    /// Publish and collect the first listener reply, for channels where the
    /// emitter and the listener share a direct return path.
    fn emit_with_reply(&self, event: &str, payload: Value) -> Result<Option<Value>, BusError> {
        let _ = (event, payload);
        Err(BusError::DirectReturnUnsupported)
    }

    fn listen(&self, event: &str, handler: ListenerFn) -> ListenerId;

    /// Like `listen`, but the listener detaches itself after the first event.
    fn once(&self, event: &str, handler: ListenerFn) -> ListenerId;

    /// Detach a listener. Unknown or already-removed ids are ignored.
    fn unlisten(&self, id: ListenerId);
}
