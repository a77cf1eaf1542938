//! Extension side of a bridge.
//!
//! Installed inside the UI extension context. Listens for sync requests,
//! dispatches them to the registry, and answers with a response or error
//! event scoped to the request id. Malformed requests are dropped without an
//! answer; the caller's timeout is the only signal in that case.

use std::sync::{Arc, Weak};

use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::bus::{BusEvent, EventChannel, ListenerFn, ListenerId};

use super::error::ReflectorError;
use super::protocol::{ChannelNames, RemoteErrorPayload, SyncRequest};
use super::registry::{HandlerRegistry, HandlerResult};

/// A live handler side. Dropping it (or calling [`HandlerSide::teardown`])
/// detaches the request listener and abandons deferred handlers still
/// running, which then never answer.
pub struct HandlerSide {
    names: ChannelNames,
    channel: Arc<dyn EventChannel>,
    listener: Option<ListenerId>,
    shutdown: watch::Sender<bool>,
}

impl HandlerSide {
    /// Wire `registry` to the bridge's request event, then announce
    /// readiness once.
    ///
    /// Must be called within a Tokio runtime; deferred handlers run as tasks
    /// on it.
    pub fn install(
        bridge: &str,
        channel: Arc<dyn EventChannel>,
        registry: HandlerRegistry,
    ) -> Result<Self, ReflectorError> {
        let names = ChannelNames::new(bridge)?;
        let runtime = Handle::try_current().map_err(|e| {
            ReflectorError::Host(format!("handler side for {names} needs a tokio runtime: {e}"))
        })?;
        let (shutdown, shutdown_rx) = watch::channel(false);

        let dispatcher = Dispatcher {
            names: names.clone(),
            channel: Arc::downgrade(&channel),
            registry: Arc::new(registry),
            runtime,
            shutdown: shutdown_rx,
        };
        let handler: ListenerFn =
            Arc::new(move |event: &BusEvent| -> Option<Value> { dispatcher.on_request(event) });
        let listener = channel.listen(&names.sync_request(), handler);

        channel.emit(&names.ready(), json!({}))?;
        tracing::debug!("handler side for {names} installed");

        Ok(Self {
            names,
            channel,
            listener: Some(listener),
            shutdown,
        })
    }

    pub fn bridge(&self) -> &str {
        self.names.bridge()
    }

    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    /// Detach from the channel and cancel in-flight deferred handlers.
    pub fn teardown(&mut self) {
        if let Some(id) = self.listener.take() {
            self.channel.unlisten(id);
            self.shutdown.send_replace(true);
            tracing::debug!("handler side for {} torn down", self.names);
        }
    }
}

impl Drop for HandlerSide {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct Dispatcher {
    names: ChannelNames,
    channel: Weak<dyn EventChannel>,
    registry: Arc<HandlerRegistry>,
    runtime: Handle,
    shutdown: watch::Receiver<bool>,
}

impl Dispatcher {
    fn on_request(&self, event: &BusEvent) -> Option<Value> {
        let request: SyncRequest = match serde_json::from_value(event.payload.clone()) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("dropping malformed request on {}: {e}", event.event);
                return None;
            }
        };
        if request.id.trim().is_empty() || request.event_name.trim().is_empty() {
            tracing::debug!("dropping request without id or event name on {}", event.event);
            return None;
        }

        if request.is_async {
            self.spawn_deferred(request);
            return None;
        }

        let outcome = self
            .registry
            .lookup(&request.event_name)
            .and_then(|handler| handler.run_now(&request.event_name, request.event_data));
        match outcome {
            Ok(value) => Some(value),
            Err(message) => {
                self.answer(&request.id, Err(message));
                None
            }
        }
    }

    fn spawn_deferred(&self, request: SyncRequest) {
        let responder = Responder {
            names: self.names.clone(),
            channel: self.channel.clone(),
        };
        let registry = self.registry.clone();
        let mut shutdown = self.shutdown.clone();

        let SyncRequest {
            id,
            event_name,
            event_data,
            ..
        } = request;

        self.runtime.spawn(async move {
            let handler = registry.lookup(&event_name);
            let run = async move {
                match handler {
                    Ok(handler) => handler.run(event_data).await,
                    Err(message) => Err(message),
                }
            };
            tokio::select! {
                outcome = run => responder.answer(&id, outcome),
                _ = shutdown.wait_for(|closed| *closed) => {
                    tracing::debug!(
                        "abandoning {event_name} for {}: extension torn down",
                        responder.names
                    );
                }
            }
        });
    }

    fn answer(&self, id: &str, outcome: HandlerResult) {
        Responder {
            names: self.names.clone(),
            channel: self.channel.clone(),
        }
        .answer(id, outcome);
    }
}

struct Responder {
    names: ChannelNames,
    channel: Weak<dyn EventChannel>,
}

impl Responder {
    fn answer(&self, id: &str, outcome: HandlerResult) {
        let Some(channel) = self.channel.upgrade() else {
            return;
        };
        let emitted = match outcome {
            Ok(value) => channel.emit(&self.names.response(id), value),
            Err(message) => {
                let payload = serde_json::to_value(RemoteErrorPayload { message })
                    .unwrap_or_else(|e| json!({ "message": e.to_string() }));
                channel.emit(&self.names.error(id), payload)
            }
        };
        if let Err(e) = emitted {
            tracing::warn!("failed to answer {id} on {}: {e}", self.names);
        }
    }
}
