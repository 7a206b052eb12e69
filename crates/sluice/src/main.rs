//! # sluice
//!
//! Gateway binary: loads settings, wires the MCP engine into the SSE
//! transport, and serves until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sluice_mcp::{McpEngine, ServerInfo};
use sluice_server::config::ServerConfig;
use sluice_server::server::SluiceServer;
use sluice_server::{McpConsumerFactory, metrics};
use sluice_settings::SluiceSettings;

/// MCP over server-sent events.
#[derive(Parser, Debug)]
#[command(name = "sluice", about = "Session-multiplexed SSE gateway for MCP")]
struct Cli {
    /// Settings file (defaults to `~/.sluice/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter, e.g. `debug` or `sluice_server=trace` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load_settings(&self) -> Result<SluiceSettings> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(sluice_settings::settings_path);
        let mut settings = sluice_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        settings
            .validate()
            .context("Invalid settings after command-line overrides")?;
        Ok(settings)
    }

    /// CLI flags win over file and environment.
    fn apply(&self, settings: &mut SluiceSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

fn build_server(settings: &SluiceSettings) -> SluiceServer {
    let engine = McpEngine::with_builtin_tools(ServerInfo::new(
        settings.mcp.server_name.clone(),
        settings.mcp.server_version.clone(),
    ));
    SluiceServer::new(
        ServerConfig::from(&settings.server),
        Arc::new(McpConsumerFactory::new(engine)),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    sluice_core::logging::init_subscriber(&settings.logging.level);

    let mut server = build_server(&settings);
    match metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(err) => tracing::warn!(error = %err, "metrics recorder unavailable, /metrics disabled"),
    }

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        "sluice {} ready on http://{addr}",
        settings.mcp.server_version
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let outcome = server
        .shutdown()
        .graceful_shutdown(
            vec![handle],
            Some(Duration::from_secs(settings.server.shutdown_timeout_secs)),
        )
        .await;
    tracing::info!(?outcome, "Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_settings() {
        let cli = Cli::parse_from([
            "sluice",
            "--port",
            "0",
            "--host",
            "127.0.0.1",
            "--log-level",
            "debug",
        ]);
        let mut settings = SluiceSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.port, 0);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn absent_flags_keep_settings() {
        let cli = Cli::parse_from(["sluice"]);
        let mut settings = SluiceSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.port, 3001);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn loads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"messagePath": "/rpc"}, "mcp": {"serverName": "edge"}}"#,
        )
        .unwrap();

        let cli = Cli::parse_from(["sluice", "--config", path.to_str().unwrap(), "--port", "0"]);
        let settings = cli.load_settings().unwrap();
        assert_eq!(settings.server.message_path, "/rpc");
        assert_eq!(settings.server.port, 0);
        assert_eq!(settings.mcp.server_name, "edge");
    }

    #[test]
    fn invalid_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let cli = Cli::parse_from(["sluice", "--config", path.to_str().unwrap()]);
        assert!(cli.load_settings().is_err());
    }

    #[test]
    fn out_of_range_file_value_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"deliverTimeoutSecs": 0}}"#).unwrap();

        let cli = Cli::parse_from(["sluice", "--config", path.to_str().unwrap(), "--port", "0"]);
        let err = cli.load_settings().unwrap_err();
        assert!(format!("{err:#}").contains("deliverTimeoutSecs"));
    }

    #[tokio::test]
    async fn server_boots_and_shuts_down() {
        let mut settings = SluiceSettings::default();
        settings.server.host = "127.0.0.1".into();
        settings.server.port = 0;
        settings.mcp.server_name = "boot-test".into();

        let server = build_server(&settings);
        let (addr, handle) = server.listen().await.unwrap();

        let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert!(resp.status().is_success());
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 0);

        server.shutdown().shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("shutdown timed out")
            .expect("join error");
    }
}
