//! `mnema-gateway` – JSON-over-HTTP procedure gateway.
//!
//! Exposes every [`CognitiveStore`][mnema_store::CognitiveStore]
//! operation as a small JSON endpoint so the store is drivable from any
//! language. The transport is deliberately thin: one request, one JSON
//! response, no sessions.
//!
//! # Modules
//!
//! - [`config`] – persisted configuration in `~/.mnema/config.toml` with
//!   `MNEMA_*` environment overrides.
//! - [`telemetry`] – `tracing` subscriber setup with an optional OTLP
//!   span exporter.
//! - [`server`] – the TCP accept loop, request parsing, and the
//!   procedure dispatch table.

pub mod config;
pub mod server;
pub mod telemetry;

pub use config::GatewayConfig;
pub use server::GatewayServer;
