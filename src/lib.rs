// Copyright (c) 2025 - Cowboy AI, Inc.
//! Three-tier cloud infrastructure composition
//!
//! Describes a public web tier, a private compute tier and an isolated
//! database tier as typed resources grouped into stacks, resolves the
//! references between them into a materialization plan and renders the
//! result as a cloud assembly.
//!
//! ```text
//! DeploymentConfig ─> InfrastructureApp::compose ─> synth ─> Assembly ─> AssemblySink
//! ```

pub mod app;
pub mod assembly;
pub mod bootstrap;
pub mod composition;
pub mod config;
pub mod constructs;
pub mod domain;
pub mod errors;
pub mod stacks;

// Re-export commonly used types
pub use app::InfrastructureApp;
pub use assembly::{Artifact, Assembly, AssemblyError, AssemblySink, DirectorySink, MemorySink};
pub use bootstrap::{BootstrapError, BootstrapScript, FailurePolicy, Fragment};
pub use composition::{
    Component, CompositionError, CompositionUnit, DependencyGraph, Handle, HandleKind, Link,
    MaterializationPlan,
};
pub use config::{ConfigError, ConfigVersion, DatabaseLayout, DeploymentConfig};
pub use errors::{InfrastructureError, InfrastructureResult};
pub use stacks::{AppStack, DatabaseStack, NetworkStack, Stack, WebStack};
