// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synthesis CLI
//!
//! Composes the configured stacks, validates and plans them, then writes
//! one template per stack plus `manifest.json` to the output directory.
//!
//! Run with: cargo run --bin tiered-synth
//!
//! Environment:
//! 1. `TIERED_CONFIG`: path to a JSON deployment config (defaults apply when unset)
//! 2. `TIERED_OUT_DIR`: output directory (default: `cdk.out`)
//! 3. `RUST_LOG`: log filter

use anyhow::{Context, Result};
use tiered_infrastructure::{
    assembly::{AssemblySink, DirectorySink},
    config::OUT_DIR_ENV,
    DeploymentConfig, InfrastructureApp,
};
use tracing::info;

const DEFAULT_OUT_DIR: &str = "cdk.out";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = DeploymentConfig::from_env().context("Failed to load deployment config")?;
    let out_dir = std::env::var(OUT_DIR_ENV).unwrap_or_else(|_| DEFAULT_OUT_DIR.to_string());
    info!(
        version = ?config.version,
        layout = ?config.database_layout,
        out_dir = %out_dir,
        "Configuration loaded"
    );

    let app = InfrastructureApp::compose(&config).context("Failed to compose stacks")?;
    let assembly = app.synth().context("Failed to synthesize assembly")?;

    for (index, stage) in assembly.plan.stages().iter().enumerate() {
        info!(stage = index, stacks = ?stage, "Materialization stage");
    }

    let mut sink = DirectorySink::new(&out_dir);
    sink.initialize()
        .await
        .with_context(|| format!("Failed to prepare {}", out_dir))?;
    sink.emit(&assembly)
        .await
        .context("Failed to write assembly")?;

    info!(assembly = %assembly.id, out_dir = %out_dir, "Synthesis complete");
    Ok(())
}
