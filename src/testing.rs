//! Shared fixtures for unit tests: an in-process bus, a demo handler set and
//! a bridge whose extension side is already installed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::bus::{EventBus, EventChannel};
use crate::reflector::{HandlerRegistry, HandlerSide, ReadyOutcome, Reflector};

pub(crate) const TEST_READY_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn test_bus() -> (Arc<EventBus>, Arc<dyn EventChannel>) {
    let bus = EventBus::shared();
    let channel: Arc<dyn EventChannel> = bus.clone();
    (bus, channel)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DelayedEcho {
    pub value: Value,
    pub delay_ms: u64,
}

/// Handlers used across the reflector tests:
/// - `ping`: answers `{ok: true}` immediately
/// - `fail`: always fails with `boom`
/// - `delayed-echo`: returns `value` after `delay_ms`
/// - `never`: never produces an outcome
pub(crate) fn demo_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register("ping", |_: Value| Ok(json!({"ok": true})))
        .expect("register ping")
        .register("fail", |_: Value| Err::<Value, String>("boom".to_string()))
        .expect("register fail")
        .register_async("delayed-echo", |p: DelayedEcho| async move {
            tokio::time::sleep(Duration::from_millis(p.delay_ms)).await;
            Ok::<_, String>(p.value)
        })
        .expect("register delayed-echo")
        .register_async("never", |_: Value| async {
            futures::future::pending::<Result<Value, String>>().await
        })
        .expect("register never");
    registry
}

/// Registry whose `list-loaded-extensions` handler counts its invocations.
pub(crate) fn counting_extensions_registry(result: Value, hits: Arc<AtomicUsize>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register_async(crate::extensions::LIST_LOADED_EXTENSIONS, move |_: Value| {
            let result = result.clone();
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, String>(result)
            }
        })
        .expect("register list-loaded-extensions");
    registry
}

/// Bridge plus installed extension side, readiness already observed.
pub(crate) async fn ready_bridge(
    name: &str,
    channel: Arc<dyn EventChannel>,
    registry: HandlerRegistry,
) -> (Reflector, HandlerSide) {
    let bridge = Reflector::new(name, channel.clone()).expect("valid bridge name");
    bridge.arm_readiness();
    let side = HandlerSide::install(name, channel, registry).expect("install handler side");
    assert_eq!(bridge.await_ready(TEST_READY_TIMEOUT).await, ReadyOutcome::Ready);
    (bridge, side)
}
