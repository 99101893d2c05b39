// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud assembly
//!
//! The assembly is the only output of a synthesis run: one template per
//! stack plus a manifest carrying the stack-level plan.
//!
//! # Architecture
//!
//! ```text
//! Pure rendering                    Sink
//! ─────────────────                 ─────────────
//!
//! Assembly                          Artifacts
//!    │                                  │
//!    ▼                                  ▼
//! ┌──────────────┐   Artifacts    ┌──────────────┐
//! │ artifacts()  │ ─────────────> │   emit()     │
//! │  pure func   │                │  async I/O   │
//! └──────────────┘                └──────────────┘
//! ```

pub mod sink;
pub mod template;

pub use sink::{AssemblySink, DirectorySink, MemorySink};
pub use template::{StackTemplate, TemplateResource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::composition::MaterializationPlan;
use crate::config::ConfigVersion;

/// File name of the assembly manifest
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors while emitting an assembly
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Failed to serialize {artifact}: {message}")]
    Serialize { artifact: String, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },

    #[error("Sink {0} was not initialized")]
    NotInitialized(String),
}

/// One file of the emitted assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
}

/// Stack entry of the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub stack: String,
    pub template: String,
    pub depends_on: Vec<String>,
}

/// Index of an assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: Uuid,
    pub synthesized_at: DateTime<Utc>,
    pub config_version: ConfigVersion,
    pub stages: Vec<Vec<String>>,
    pub stacks: Vec<ManifestEntry>,
}

/// Synthesized resource graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    pub id: Uuid,
    pub synthesized_at: DateTime<Utc>,
    pub config_version: ConfigVersion,
    pub stacks: Vec<StackTemplate>,
    pub plan: MaterializationPlan,
}

impl Assembly {
    pub fn new(
        config_version: ConfigVersion,
        stacks: Vec<StackTemplate>,
        plan: MaterializationPlan,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            synthesized_at: Utc::now(),
            config_version,
            stacks,
            plan,
        }
    }

    pub fn stack(&self, name: &str) -> Option<&StackTemplate> {
        self.stacks.iter().find(|s| s.stack == name)
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            id: self.id,
            synthesized_at: self.synthesized_at,
            config_version: self.config_version,
            stages: self.plan.stages().to_vec(),
            stacks: self
                .stacks
                .iter()
                .map(|s| ManifestEntry {
                    stack: s.stack.clone(),
                    template: s.file_name(),
                    depends_on: s.depends_on.clone(),
                })
                .collect(),
        }
    }

    /// Files of the assembly: every stack template, then the manifest
    pub fn artifacts(&self) -> Result<Vec<Artifact>, AssemblyError> {
        let mut artifacts = Vec::with_capacity(self.stacks.len() + 1);
        for template in &self.stacks {
            artifacts.push(Artifact {
                file_name: template.file_name(),
                contents: to_json(&template.file_name(), template)?,
            });
        }
        artifacts.push(Artifact {
            file_name: MANIFEST_FILE.to_string(),
            contents: to_json(MANIFEST_FILE, &self.manifest())?,
        });
        Ok(artifacts)
    }
}

fn to_json<T: Serialize>(artifact: &str, value: &T) -> Result<String, AssemblyError> {
    serde_json::to_string_pretty(value).map_err(|e| AssemblyError::Serialize {
        artifact: artifact.to_string(),
        message: e.to_string(),
    })
}
