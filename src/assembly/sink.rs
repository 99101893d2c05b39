// Copyright (c) 2025 - Cowboy AI, Inc.
//! Assembly sinks
//!
//! A sink receives a finished [`Assembly`] and persists it somewhere. The
//! assembly has already been validated; sinks only perform I/O.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Artifact, Assembly, AssemblyError};

/// Destination of synthesized assemblies
#[async_trait]
pub trait AssemblySink: Send + Sync {
    /// Error type for sink operations
    type Error: std::error::Error + Send + Sync;

    /// Prepare the destination; safe to call more than once
    async fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Persist every artifact of the assembly
    async fn emit(&mut self, assembly: &Assembly) -> Result<(), Self::Error>;

    /// Name of this sink
    fn name(&self) -> &str;
}

/// Writes `<stack>.template.json` files and `manifest.json` into a directory
pub struct DirectorySink {
    root: PathBuf,
    initialized: bool,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            initialized: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

async fn write_artifact(root: &Path, artifact: &Artifact) -> Result<(), AssemblyError> {
    let path = root.join(&artifact.file_name);
    tokio::fs::write(&path, artifact.contents.as_bytes())
        .await
        .map_err(|e| AssemblyError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    debug!(path = %path.display(), bytes = artifact.contents.len(), "Wrote artifact");
    Ok(())
}

#[async_trait]
impl AssemblySink for DirectorySink {
    type Error = AssemblyError;

    async fn initialize(&mut self) -> Result<(), Self::Error> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AssemblyError::Write {
                path: self.root.display().to_string(),
                message: e.to_string(),
            })?;
        self.initialized = true;
        Ok(())
    }

    async fn emit(&mut self, assembly: &Assembly) -> Result<(), Self::Error> {
        if !self.initialized {
            return Err(AssemblyError::NotInitialized(self.name().to_string()));
        }

        let artifacts = assembly.artifacts()?;
        let root = self.root.as_path();
        try_join_all(artifacts.iter().map(|a| write_artifact(root, a))).await?;

        info!(
            assembly = %assembly.id,
            root = %self.root.display(),
            files = artifacts.len(),
            "Emitted assembly"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "directory"
    }
}

/// Keeps artifacts in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Vec<Artifact>,
    emitted: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn artifact(&self, file_name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.file_name == file_name)
    }

    /// Number of assemblies emitted so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

#[async_trait]
impl AssemblySink for MemorySink {
    type Error = AssemblyError;

    async fn initialize(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Replaces the artifacts of any earlier assembly
    async fn emit(&mut self, assembly: &Assembly) -> Result<(), Self::Error> {
        self.artifacts = assembly.artifacts()?;
        self.emitted += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
