//! Handler registry for the extension side of a bridge.
//!
//! Handlers are registered by event name ahead of time; a sync request naming
//! an unregistered event is answered with an error event instead of being
//! resolved by free-form lookup. Payloads and results are decoded/encoded at
//! this boundary so handlers work with their own types.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Outcome of a handler as it crosses the channel: a value, or a message.
pub type HandlerResult = Result<Value, String>;

type ImmediateFn = Arc<dyn Fn(Value) -> HandlerResult + Send + Sync>;
type DeferredFn = Arc<dyn Fn(Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("handler name must not be empty")]
    EmptyName,
    #[error("handler already registered: {0}")]
    Duplicate(String),
}

/// Trait for handlers implemented as types rather than closures.
#[async_trait]
pub trait ReflectedHandler: Send + Sync {
    async fn handle(&self, payload: Value) -> HandlerResult;
}

#[derive(Clone)]
pub(crate) enum RegisteredHandler {
    /// Produces its value on the spot; usable in both call modes.
    Immediate(ImmediateFn),
    /// Produces its value later; only usable in async mode.
    Deferred(DeferredFn),
}

impl RegisteredHandler {
    pub(crate) async fn run(self, payload: Value) -> HandlerResult {
        match self {
            Self::Immediate(f) => f(payload),
            Self::Deferred(f) => f(payload).await,
        }
    }

    pub(crate) fn run_now(&self, event_name: &str, payload: Value) -> HandlerResult {
        match self {
            Self::Immediate(f) => f(payload),
            Self::Deferred(_) => Err(format!(
                "handler '{event_name}' is asynchronous and cannot answer a synchronous call"
            )),
        }
    }
}

fn decode<P: DeserializeOwned>(event_name: &str, payload: Value) -> Result<P, String> {
    serde_json::from_value(payload)
        .map_err(|e| format!("malformed payload for '{event_name}': {e}"))
}

fn encode<R: Serialize>(event_name: &str, result: R) -> HandlerResult {
    serde_json::to_value(result)
        .map_err(|e| format!("failed to serialize result of '{event_name}': {e}"))
}

/// Registry of named handlers installed on the extension side.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, RegisteredHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: &str, handler: RegisteredHandler) -> Result<&mut Self, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.handlers.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.handlers.insert(name.to_string(), handler);
        Ok(self)
    }

    /// Register a handler that answers immediately.
    pub fn register<P, R, F>(&mut self, name: &str, handler: F) -> Result<&mut Self, RegistryError>
    where
        P: DeserializeOwned,
        R: Serialize,
        F: Fn(P) -> Result<R, String> + Send + Sync + 'static,
    {
        let event_name = name.trim().to_string();
        let f: ImmediateFn = Arc::new(move |payload: Value| {
            let params = decode::<P>(&event_name, payload)?;
            encode(&event_name, handler(params)?)
        });
        self.insert(name, RegisteredHandler::Immediate(f))
    }

    /// Register a handler whose result is produced asynchronously.
    pub fn register_async<P, R, F, Fut>(
        &mut self,
        name: &str,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, String>> + Send + 'static,
    {
        let event_name = name.trim().to_string();
        let handler = Arc::new(handler);
        let f: DeferredFn = Arc::new(move |payload: Value| {
            let event_name = event_name.clone();
            let handler = handler.clone();
            async move {
                let params = decode::<P>(&event_name, payload)?;
                encode(&event_name, handler(params).await?)
            }
            .boxed()
        });
        self.insert(name, RegisteredHandler::Deferred(f))
    }

    /// Register a [`ReflectedHandler`] implementation.
    pub fn register_handler<H>(&mut self, name: &str, handler: H) -> Result<&mut Self, RegistryError>
    where
        H: ReflectedHandler + 'static,
    {
        let handler = Arc::new(handler);
        let f: DeferredFn = Arc::new(move |payload: Value| {
            let handler = handler.clone();
            async move { handler.handle(payload).await }.boxed()
        });
        self.insert(name, RegisteredHandler::Deferred(f))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<RegisteredHandler, String> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| format!("no handler registered for '{name}'"))
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
