//! `mnema-gateway` – the cognitive store's process entry point.
//!
//! 1. Loads `~/.mnema/config.toml` (falling back to defaults when absent)
//!    and applies `MNEMA_*` environment overrides.
//! 2. Initialises `tracing` from the configured log settings, with an
//!    optional OTLP span exporter.
//! 3. Builds one [`CognitiveStore`] from the configured parameters.
//! 4. Serves the JSON endpoints until the process is terminated.

use std::sync::Arc;

use mnema_gateway::telemetry::TelemetrySettings;
use mnema_gateway::{GatewayServer, config, telemetry};
use mnema_store::CognitiveStore;

fn main() -> std::io::Result<()> {
    let (cfg, from_file) = match config::load() {
        Ok(Some(cfg)) => (cfg, true),
        Ok(None) => {
            let mut cfg = config::GatewayConfig::default();
            config::apply_env_overrides(&mut cfg);
            (cfg, false)
        }
        Err(e) => {
            eprintln!("[mnema] {e}");
            std::process::exit(1);
        }
    };

    // Tracing comes up before the Tokio runtime; the OTLP exporter is
    // configured in simple (synchronous) mode for exactly this reason.
    let _guard = telemetry::init_tracing(&TelemetrySettings::resolve("mnema-gateway", &cfg));
    if !from_file {
        tracing::info!("no config file found, using defaults");
    }
    tracing::info!(?cfg, "gateway configuration loaded");

    let store = Arc::new(CognitiveStore::with_config(cfg.store_config()));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(GatewayServer::new(store).with_port(cfg.port).run())
}
