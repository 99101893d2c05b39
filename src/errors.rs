// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for infrastructure composition

use thiserror::Error;

use crate::assembly::AssemblyError;
use crate::bootstrap::BootstrapError;
use crate::composition::CompositionError;
use crate::config::ConfigError;
use crate::domain::{LogicalIdError, NetworkError, SecurityRuleError, ValidationError};

/// Errors that can occur while composing or emitting the resource graph
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// Invalid construct or stack identifier
    #[error("Invalid identifier: {0}")]
    Identifier(#[from] LogicalIdError),

    /// Network layout error
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Malformed security rule
    #[error("Security rule error: {0}")]
    SecurityRule(#[from] SecurityRuleError),

    /// Domain invariant violated
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Dependency ordering failure
    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    /// Bootstrap script assembly failure
    #[error("Bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Assembly emission error
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),
}

/// Result type for infrastructure operations
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
