// Copyright (c) 2025 - Cowboy AI, Inc.
//! Opaque handles passed between components
//!
//! A handle stands for the identifier a resource receives once it is
//! materialized. Consumers only ever see the handle, never the resource
//! description behind it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::ConstructPath;

/// What kind of resource a handle points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    Network,
    Bucket,
    FlowLog,
    SecurityGroup,
    SecurityGroupRule,
    LoadBalancer,
    TargetGroup,
    Role,
    ComputeGroup,
    Database,
    Secret,
    Parameter,
}

impl HandleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Bucket => "bucket",
            Self::FlowLog => "flow_log",
            Self::SecurityGroup => "security_group",
            Self::SecurityGroupRule => "security_group_rule",
            Self::LoadBalancer => "load_balancer",
            Self::TargetGroup => "target_group",
            Self::Role => "role",
            Self::ComputeGroup => "compute_group",
            Self::Database => "database",
            Self::Secret => "secret",
            Self::Parameter => "parameter",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque identifier of a (future) materialized resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    kind: HandleKind,
    path: ConstructPath,
}

impl Handle {
    pub fn new(kind: HandleKind, path: ConstructPath) -> Self {
        Self { kind, path }
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    /// Name of the stack that owns the resource behind this handle
    pub fn owning_stack(&self) -> &str {
        self.path.stack()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.path)
    }
}

/// Narrow read-only export of a component
///
/// Implementors hand out only the handles their consumers need.
pub trait ProvidesHandles {
    fn provided_handles(&self) -> Vec<Handle>;
}
