use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use reflector_lib::bus::{EventBus, EventChannel};
use reflector_lib::config::ReflectorConfig;
use reflector_lib::extensions::{
    HandlerFactory, LoadedExtensions, LoadedExtensionsFetcher, LIST_LOADED_EXTENSIONS,
};
use reflector_lib::host::{ExtensionHost, FrontendExtension, InProcessHost};
use reflector_lib::reflector::{unique_bridge_name, CallMode, HandlerRegistry, Reflector};

#[tokio::main]
async fn main() {
    reflector_lib::init_tracing();
    if let Err(error) = run().await {
        eprintln!("reflector demo failed: {error}");
        std::process::exit(1);
    }
}

struct Options {
    event: String,
    payload: Value,
    timeout_ms: Option<u64>,
    mode: Option<CallMode>,
    never_respond: bool,
    list_extensions: bool,
    config_path: Option<PathBuf>,
}

async fn run() -> Result<(), String> {
    let Some(options) = parse_args()? else {
        return Ok(());
    };

    let mut config =
        ReflectorConfig::load(options.config_path.as_deref()).map_err(|e| e.to_string())?;
    if let Some(timeout_ms) = options.timeout_ms {
        config.call_timeout_ms = timeout_ms;
    }
    if let Some(mode) = options.mode {
        config.default_mode = mode;
    }

    let channel: Arc<dyn EventChannel> = EventBus::shared();
    let host = Arc::new(InProcessHost::new(channel.clone()));
    let never_respond = options.never_respond;
    let handlers: HandlerFactory = Arc::new(move || demo_handlers(never_respond));

    if options.list_extensions {
        let dyn_host: Arc<dyn ExtensionHost> = host.clone();
        let loaded = LoadedExtensions::new(LoadedExtensionsFetcher::new(
            channel,
            dyn_host,
            handlers,
            config,
        ));
        let extensions = loaded.fetch_once().await.map_err(|e| e.to_string())?;
        print_json(&serde_json::to_value(&extensions).map_err(|e| e.to_string())?)?;
        return Ok(());
    }

    let name = unique_bridge_name(&config.bridge_prefix);
    let bridge = Reflector::new(name.clone(), channel).map_err(|e| e.to_string())?;
    bridge.arm_readiness();
    host.register_extension(FrontendExtension::reflector(name, handlers()))
        .map_err(|e| e.to_string())?;
    bridge.await_ready(config.ready_timeout()).await;

    let result = bridge
        .call(
            &options.event,
            options.payload,
            config.default_mode,
            config.call_timeout(),
        )
        .await;
    host.teardown_all();

    print_json(&result.map_err(|e| e.to_string())?)
}

/// `ping` echoes its payload; `list-loaded-extensions` reports a fixed pair.
/// With `never_respond`, both handlers stay pending forever.
fn demo_handlers(never_respond: bool) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    let registered = if never_respond {
        registry
            .register_async("ping", |_: Value| async {
                futures::future::pending::<Result<Value, String>>().await
            })
            .and_then(|r| {
                r.register_async(LIST_LOADED_EXTENSIONS, |_: Value| async {
                    futures::future::pending::<Result<Value, String>>().await
                })
            })
            .map(|_| ())
    } else {
        registry
            .register("ping", |payload: Value| {
                Ok::<_, String>(json!({ "ok": true, "payload": payload }))
            })
            .and_then(|r| {
                r.register(LIST_LOADED_EXTENSIONS, |_: Value| {
                    Ok::<_, String>(json!([
                        { "name": "Reflector", "id": "reflector", "scriptName": "reflector.js" },
                        { "name": "Inspector", "id": "inspector" }
                    ]))
                })
            })
            .map(|_| ())
    };
    if let Err(e) = registered {
        tracing::error!("demo handler registration failed: {e}");
    }
    registry
}

fn parse_args() -> Result<Option<Options>, String> {
    let mut options = Options {
        event: "ping".to_string(),
        payload: json!({}),
        timeout_ms: None,
        mode: None,
        never_respond: false,
        list_extensions: false,
        config_path: None,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => args.next().ok_or_else(|| format!("{name} requires a value")),
            }
        };

        match flag.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            "--event" => options.event = value("--event")?,
            "--payload" => {
                let raw = value("--payload")?;
                options.payload = serde_json::from_str(&raw)
                    .map_err(|e| format!("--payload must be JSON: {e}"))?;
            }
            "--timeout-ms" => {
                let raw = value("--timeout-ms")?;
                options.timeout_ms = Some(parse_positive_u64(&raw, "--timeout-ms")?);
            }
            "--mode" => {
                let raw = value("--mode")?;
                options.mode = Some(raw.parse().map_err(|e| format!("--mode: {e}"))?);
            }
            "--config" => options.config_path = Some(PathBuf::from(value("--config")?)),
            "--never-respond" => options.never_respond = true,
            "--list-extensions" => options.list_extensions = true,
            other => return Err(format!("unknown argument '{other}'. Use --help for usage")),
        }
    }
    Ok(Some(options))
}

fn parse_positive_u64(value: &str, flag: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|_| format!("{flag} expects a positive integer, got '{value}'"))?;
    if parsed == 0 {
        return Err(format!("{flag} expects a value greater than 0"));
    }
    Ok(parsed)
}

fn print_json(value: &Value) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn print_help() {
    println!("Reflector bridge demo");
    println!();
    println!("Usage:");
    println!("  cargo run --bin reflector-demo -- [options]");
    println!();
    println!("Options:");
    println!("  --event <name>         Handler to call (default: ping)");
    println!("  --payload <json>       JSON payload for the call (default: {{}})");
    println!("  --timeout-ms <n>       Call timeout in milliseconds (default: from config)");
    println!("  --mode async|sync      Call mode (default: from config)");
    println!("  --never-respond        Extension handlers never answer");
    println!("  --list-extensions      Fetch the loaded extensions list through the cache");
    println!("  --config <path>        JSON config file; REFLECTOR_* env vars override it");
}
