use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::bus::{BusEvent, EventChannel, ListenerFn, ListenerId};

use super::correlation::CorrelationIdGenerator;
use super::error::ReflectorError;
use super::protocol::{CallMode, ChannelNames, RemoteErrorPayload, SyncRequest};
use super::readiness::{ReadinessGate, ReadyOutcome};

/// Default timeout for reflected calls.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

type Outcome = Result<Value, ReflectorError>;

/// First-writer-wins slot for one call. Whichever of response, error or
/// timeout takes the sender settles the call; later attempts are no-ops.
#[derive(Clone)]
struct Settlement {
    slot: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl Settlement {
    fn new() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    fn settle(&self, outcome: Outcome) -> bool {
        let sender = self.slot.lock().expect("settlement mutex poisoned").take();
        match sender {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    fn close(&self) {
        self.slot.lock().expect("settlement mutex poisoned").take();
    }
}

/// Detaches a call's scoped listeners when dropped, whether the call settled,
/// timed out, or the calling future was abandoned.
struct ListenerGuard {
    channel: Arc<dyn EventChannel>,
    ids: Vec<ListenerId>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.channel.unlisten(id);
        }
    }
}

/// Backend side of a bridge: issues calls to handlers living in the UI
/// extension context and awaits their correlated results.
///
/// Construction is pure; nothing is attached to the channel until
/// [`Reflector::arm_readiness`], [`Reflector::await_ready`] or a call.
pub struct Reflector {
    names: ChannelNames,
    channel: Arc<dyn EventChannel>,
    gate: Arc<ReadinessGate>,
    ids: CorrelationIdGenerator,
    ready_listener: Mutex<Option<ListenerId>>,
    default_timeout: Duration,
    default_mode: CallMode,
}

impl Reflector {
    pub fn new(name: impl Into<String>, channel: Arc<dyn EventChannel>) -> Result<Self, ReflectorError> {
        Ok(Self {
            names: ChannelNames::new(name)?,
            channel,
            gate: Arc::new(ReadinessGate::new()),
            ids: CorrelationIdGenerator::new(),
            ready_listener: Mutex::new(None),
            default_timeout: DEFAULT_CALL_TIMEOUT,
            default_mode: CallMode::Async,
        })
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_default_mode(mut self, mode: CallMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        self.names.bridge()
    }

    pub fn names(&self) -> &ChannelNames {
        &self.names
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Start listening for the extension's ready event without waiting.
    ///
    /// Arm before registering the extension so its ready event cannot be
    /// missed. Calling this again is a no-op.
    pub fn arm_readiness(&self) {
        let mut slot = self.ready_listener.lock().expect("ready listener mutex poisoned");
        if slot.is_some() || self.gate.is_ready() {
            return;
        }
        let gate = self.gate.clone();
        let bridge = self.names.bridge().to_string();
        let handler: ListenerFn = Arc::new(move |_event: &BusEvent| -> Option<Value> {
            if gate.mark_ready() {
                tracing::debug!("bridge {bridge} reported ready");
            }
            None
        });
        *slot = Some(self.channel.once(&self.names.ready(), handler));
    }

    /// Wait for the extension to announce readiness, at most `timeout`.
    ///
    /// A timeout is logged and reported as [`ReadyOutcome::TimedOut`] but is
    /// not an error: later calls are still allowed and fail on their own
    /// timeout if the extension never shows up.
    pub async fn await_ready(&self, timeout: Duration) -> ReadyOutcome {
        self.arm_readiness();
        let outcome = self.gate.wait(timeout).await;
        if outcome == ReadyOutcome::TimedOut {
            tracing::warn!(
                "bridge {} not ready after {}ms, proceeding anyway",
                self.names,
                timeout.as_millis()
            );
        }
        outcome
    }

    /// Invoke `event_name` in the extension context and await its result.
    ///
    /// # Errors
    ///
    /// - `NotReady` if readiness was never observed nor waited for
    /// - `InvalidRequest` if `event_name` is empty
    /// - `Timeout` if neither response nor error arrives within `timeout`
    /// - `RemoteHandler` if the extension handler failed
    /// - `Bus` if the request could not be emitted
    pub async fn call(
        &self,
        event_name: &str,
        payload: Value,
        mode: CallMode,
        timeout: Duration,
    ) -> Result<Value, ReflectorError> {
        if event_name.trim().is_empty() {
            return Err(ReflectorError::InvalidRequest(
                "event name must not be empty".to_string(),
            ));
        }
        if !self.gate.is_ready() && !self.gate.wait_attempted() {
            return Err(ReflectorError::NotReady {
                bridge: self.names.bridge().to_string(),
            });
        }

        let id = self.ids.next_id();
        let (settlement, rx) = Settlement::new();

        let on_response: ListenerFn = {
            let settlement = settlement.clone();
            Arc::new(move |event: &BusEvent| -> Option<Value> {
                settlement.settle(Ok(event.payload.clone()));
                None
            })
        };
        let on_error: ListenerFn = {
            let settlement = settlement.clone();
            let event_name = event_name.to_string();
            Arc::new(move |event: &BusEvent| -> Option<Value> {
                settlement.settle(Err(ReflectorError::RemoteHandler {
                    event_name: event_name.clone(),
                    message: RemoteErrorPayload::message_from(&event.payload),
                }));
                None
            })
        };

        let _guard = ListenerGuard {
            channel: self.channel.clone(),
            ids: vec![
                self.channel.once(&self.names.response(&id), on_response),
                self.channel.once(&self.names.error(&id), on_error),
            ],
        };

        let request = SyncRequest {
            id: id.clone(),
            is_async: mode.is_async(),
            event_name: event_name.to_string(),
            event_data: payload,
        };
        let request = serde_json::to_value(&request)
            .map_err(|e| ReflectorError::malformed(event_name, e))?;

        tracing::debug!("bridge {} calling {event_name} as {id} ({mode:?})", self.names);
        match mode {
            CallMode::Async => self.channel.emit(&self.names.sync_request(), request)?,
            CallMode::Sync => {
                if let Some(value) = self
                    .channel
                    .emit_with_reply(&self.names.sync_request(), request)?
                {
                    settlement.settle(Ok(value));
                }
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => {
                tracing::debug!("bridge {} call {id} settled (ok={})", self.names, outcome.is_ok());
                outcome
            }
            // `settlement` holds the sender for the whole call, so the
            // receiver only comes back empty-handed on expiry.
            Ok(Err(_)) | Err(_) => {
                settlement.close();
                tracing::debug!("bridge {} call {id} expired", self.names);
                Err(ReflectorError::Timeout {
                    event_name: event_name.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Typed call using the bridge's default mode and timeout.
    pub async fn invoke<P, R>(&self, event_name: &str, params: P) -> Result<R, ReflectorError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_value(params)
            .map_err(|e| ReflectorError::malformed(event_name, e))?;
        let value = self
            .call(event_name, payload, self.default_mode, self.default_timeout)
            .await?;
        serde_json::from_value(value).map_err(|e| ReflectorError::malformed(event_name, e))
    }
}

impl Drop for Reflector {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.ready_listener.lock() {
            if let Some(id) = slot.take() {
                self.channel.unlisten(id);
            }
        }
    }
}

impl std::fmt::Debug for Reflector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reflector")
            .field("name", &self.names.bridge())
            .field("ready", &self.gate.is_ready())
            .field("default_timeout", &self.default_timeout)
            .field("default_mode", &self.default_mode)
            .finish_non_exhaustive()
    }
}
