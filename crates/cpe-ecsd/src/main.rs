// # cpe-ecsd - CPE → ECS mapping daemon
//
// Thin integration layer: all loading and lookup logic lives in
// cpe-ecs-core. The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Loading the mapping table at startup (failure is fatal)
// 4. Reloading on SIGHUP (failure is logged, the table is kept)
//
// ## Configuration
//
// - `CPE_ECS_ENTRIES`: Comma-separated entry descriptors
//   (`ext:path[:tag]`, `url:address` or inline `tag cpe ecs`)
// - `CPE_ECS_FILES`: Comma-separated file descriptors (`path[:tag]`)
// - `CPE_ECS_URL_TAG`: Tag filter for `url:` sources
// - `CPE_ECS_TOKEN_SECRET`: HS256 secret for `url:` sources
// - `CPE_ECS_DELAY_MS`: Per-query forwarding delay in milliseconds
// - `CPE_ECS_MASK4` / `CPE_ECS_MASK6`: ECS source prefix lengths
// - `CPE_ECS_FORCE_OVERWRITE`: Replace ECS options queries already carry
// - `CPE_ECS_LOG_LEVEL`: trace, debug, info, warn or error
//
// ## Example
//
// ```bash
// export CPE_ECS_ENTRIES="ext:/etc/cpe-ecs/office.list:gold,url:https://lists.example/cpe"
// export CPE_ECS_URL_TAG=gold
// export CPE_ECS_TOKEN_SECRET=change-me
//
// cpe-ecsd
// ```

use anyhow::Result;
use cpe_ecs_core::{CpeEcs, CpeEcsConfig};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Operator action requested by a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Reload,
    Shutdown(&'static str),
}

/// Read a comma-separated list variable
fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Read an optional variable, treating an empty value as unset
fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Read and parse an optional variable
fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} is invalid ({}): {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

/// Build the stage configuration from environment variables
fn config_from_env() -> Result<CpeEcsConfig> {
    let mut config = CpeEcsConfig::new();

    config.entries = env_list("CPE_ECS_ENTRIES");
    config.files = env_list("CPE_ECS_FILES");
    config.url_tag = env_value("CPE_ECS_URL_TAG");
    config.token_secret = env_value("CPE_ECS_TOKEN_SECRET");
    if let Some(delay_ms) = env_parse("CPE_ECS_DELAY_MS")? {
        config.delay_ms = delay_ms;
    }
    if let Some(mask4) = env_parse("CPE_ECS_MASK4")? {
        config.mask4 = mask4;
    }
    if let Some(mask6) = env_parse("CPE_ECS_MASK6")? {
        config.mask6 = mask6;
    }
    if let Some(force) = env_parse("CPE_ECS_FORCE_OVERWRITE")? {
        config.force_overwrite = force;
    }

    if config.entries.is_empty() && config.files.is_empty() {
        anyhow::bail!(
            "No mapping sources configured. \
            Set CPE_ECS_ENTRIES and/or CPE_ECS_FILES"
        );
    }
    config.validate()?;

    Ok(config)
}

/// Parse the log level variable
fn log_level() -> Result<Level> {
    let raw = env::var("CPE_ECS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "CPE_ECS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

fn main() -> ExitCode {
    let level = match log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let config = match config_from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    info!("Starting cpe-ecsd daemon");
    info!(
        "Configuration loaded: {} entr(ies), {} file(s), delay {}ms",
        config.entries.len(),
        config.files.len(),
        config.delay_ms
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let stage = match build_stage(config) {
            Ok(stage) => stage,
            Err(e) => {
                error!("Startup error: {}", e);
                return DaemonExitCode::ConfigError;
            }
        };

        match stage.reload().await {
            Ok(count) => info!("Initial load stored {} entries", count),
            Err(e) => {
                error!("Initial load failed: {}", e);
                return DaemonExitCode::ConfigError;
            }
        }

        if let Err(e) = run_daemon(&stage).await {
            error!("Daemon error: {}", e);
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Create the stage with the transports enabled at build time
fn build_stage(config: CpeEcsConfig) -> Result<CpeEcs> {
    let needs_fetcher = config.entries.iter().any(|e| e.starts_with("url:"));

    #[cfg(feature = "http")]
    let fetcher: Option<Arc<dyn cpe_ecs_core::RemoteFetcher>> = if needs_fetcher {
        Some(Arc::new(cpe_ecs_http::HttpFetcher::new()?))
    } else {
        None
    };

    #[cfg(not(feature = "http"))]
    let fetcher: Option<Arc<dyn cpe_ecs_core::RemoteFetcher>> = {
        if needs_fetcher {
            anyhow::bail!("url: entries require the \"http\" feature");
        }
        None
    };

    if needs_fetcher && config.token_secret.is_none() {
        warn!("CPE_ECS_TOKEN_SECRET is not set, remote lists will be fetched unauthenticated");
    }

    Ok(CpeEcs::new(config, fetcher)?)
}

/// Serve reload requests until a shutdown signal arrives
async fn run_daemon(stage: &CpeEcs) -> Result<()> {
    let mut signals = Signals::new()?;
    info!("Ready, send SIGHUP to reload mapping sources");

    loop {
        match signals.recv().await? {
            Signal::Reload => {
                info!("Reload requested");
                match stage.reload().await {
                    Ok(count) => info!(
                        "Reload stored {} entries ({} in table)",
                        count,
                        stage.store().len()
                    ),
                    Err(e) => warn!("Reload failed, keeping current table: {}", e),
                }
            }
            Signal::Shutdown(name) => {
                info!("Received shutdown signal: {}", name);
                info!("Shutting down daemon");
                return Ok(());
            }
        }
    }
}

/// Operator signal handlers (SIGHUP, SIGTERM, SIGINT)
///
/// Registered once so a signal arriving during a reload is not lost.
#[cfg(unix)]
struct Signals {
    hangup: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn new() -> Result<Self> {
        let hangup = signal(SignalKind::hangup())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?;
        let terminate = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let interrupt = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

        Ok(Self {
            hangup,
            terminate,
            interrupt,
        })
    }

    async fn recv(&mut self) -> Result<Signal> {
        Ok(tokio::select! {
            _ = self.hangup.recv() => Signal::Reload,
            _ = self.terminate.recv() => Signal::Shutdown("SIGTERM"),
            _ = self.interrupt.recv() => Signal::Shutdown("SIGINT"),
        })
    }
}

/// CTRL-C handler
///
/// Fallback for non-Unix platforms, which have no reload signal.
#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Result<Signal> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
        Ok(Signal::Shutdown("SIGINT"))
    }
}
