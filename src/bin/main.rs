//! Brewtrace CLI - dashboard wallet core in mock mode
//!
//!   brewtrace serve [--port N]      → Run the HTTP surface with the dev provider
//!   brewtrace status                → Print the session snapshot and flags
//!   brewtrace flags                 → Print the flag set
//!   brewtrace flags toggle <FLAG>   → Flip one flag
//!   brewtrace flags reset           → Restore defaults
//!
//! Configuration:
//!   BREWTRACE_DATA_DIR   Flag storage root (default: platform data dir)
//!   BREWTRACE_PORT       Listen port for serve (default: 8080)
//!   BREWTRACE_LOG_JSON   Set to 1 for JSON log output
//!
//! Output format:
//!   --json     Output raw JSON (default for non-tty)
//!   --pretty   Pretty-print JSON (default for tty)

use anyhow::{anyhow, Context, Result};
use brewtrace::logging::init_logging;
use brewtrace::{
    DevProvider, FeatureFlag, FeatureFlagStore, FileFlagStorage, WalletSessionManager,
};
use serde_json::{json, Value};
use std::io::IsTerminal;
use std::sync::Arc;

const APP_NAME: &str = "brewtrace";

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }
    if opts.version {
        println!("brewtrace 0.1.0");
        return;
    }

    let result = match opts.command.as_deref() {
        Some("serve") => cmd_serve(&opts),
        Some("status") => cmd_status(),
        Some("flags") => cmd_flags(&opts),
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    match result {
        Ok(output) => {
            let formatted = if opts.pretty || (std::io::stdout().is_terminal() && !opts.json) {
                serde_json::to_string_pretty(&output).unwrap()
            } else {
                serde_json::to_string(&output).unwrap()
            };
            println!("{}", formatted);
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&json!({"error": e.to_string()})).unwrap());
            std::process::exit(1);
        }
    }
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    subcommand: Option<String>,
    flag: Option<String>,
    port: Option<u16>,
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        let mut opts = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--json" => opts.json = true,
                "--pretty" => opts.pretty = true,
                "--port" | "-p" => {
                    opts.port = iter.next().and_then(|v| v.parse().ok());
                }
                other if opts.command.is_none() => opts.command = Some(other.to_string()),
                other if opts.subcommand.is_none() => opts.subcommand = Some(other.to_string()),
                other => opts.flag = Some(other.to_string()),
            }
        }
        opts
    }
}

fn open_flags() -> FeatureFlagStore {
    let path = FileFlagStorage::default_path(APP_NAME);
    FeatureFlagStore::open(Box::new(FileFlagStorage::new(path)))
}

fn cmd_flags(opts: &ParsedArgs) -> Result<Value> {
    let store = open_flags();
    match opts.subcommand.as_deref() {
        None => {}
        Some("reset") => store.reset(),
        Some("toggle") => {
            let key = opts.flag.as_deref().ok_or_else(|| anyhow!("flags toggle needs a key"))?;
            let flag = FeatureFlag::from_str(key).ok_or_else(|| anyhow!("unknown flag: {}", key))?;
            store.toggle(flag);
        }
        Some(other) => return Err(anyhow!("unknown flags subcommand: {}", other)),
    }
    serde_json::to_value(store.get()).context("serialize flags")
}

fn cmd_status() -> Result<Value> {
    let rt = tokio::runtime::Runtime::new().context("runtime")?;
    rt.block_on(async {
        let flags = Arc::new(open_flags());
        let provider = Arc::new(DevProvider::new());
        let manager = WalletSessionManager::start(Some(provider), flags.clone()).await;
        let out = json!({
            "session": manager.session(),
            "flags": flags.get(),
            "flag_storage": FileFlagStorage::default_path(APP_NAME),
        });
        manager.close();
        Ok(out)
    })
}

#[cfg(feature = "server")]
fn cmd_serve(opts: &ParsedArgs) -> Result<Value> {
    let port = opts
        .port
        .or_else(|| std::env::var("BREWTRACE_PORT").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(8080);

    let rt = tokio::runtime::Runtime::new().context("runtime")?;
    rt.block_on(async {
        let flags = Arc::new(open_flags());
        let provider = Arc::new(DevProvider::new());
        let manager = Arc::new(WalletSessionManager::start(Some(provider), flags.clone()).await);
        let router = brewtrace::create_router_with_name(manager.clone(), flags, APP_NAME);

        let addr = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("bind {}", addr))?;
        tracing::info!("brewtrace listening on {}", addr);

        let shutdown = brewtrace::install_signal_handlers();
        let mut signal = shutdown.subscribe();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = signal.recv().await;
            })
            .await
            .context("server")?;

        manager.close();
        Ok(json!({"status": "stopped"}))
    })
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_opts: &ParsedArgs) -> Result<Value> {
    Err(anyhow!("built without the server feature"))
}

fn print_usage() {
    println!(
        r#"brewtrace - coffee traceability dashboard wallet core

USAGE:
    brewtrace serve [--port N]       Run the HTTP surface (dev provider)
    brewtrace status                 Print session snapshot and flags
    brewtrace flags                  Print the flag set
    brewtrace flags toggle <FLAG>    Flip one flag
    brewtrace flags reset            Restore default flags

OPTIONS:
    --port, -p <N>    Listen port (default 8080, or BREWTRACE_PORT)
    --json            Raw JSON output
    --pretty          Pretty-printed JSON output
    --help, -h        Show this help
    --version, -V     Show version"#
    );
}
