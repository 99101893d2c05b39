// Copyright (c) 2025 - Cowboy AI, Inc.
//! Breaking mutual references
//!
//! Two components that each need the other's handle cannot both be
//! scheduled first. There are two ways out:
//!
//! - [`merge`] both into one atomic unit, so the references become internal
//! - declare both sides inside one [`CompositionUnit`] and wire them with
//!   [`CompositionUnit::link`] once both handles exist
//!
//! Either way the unit exposes a single component to the graph and the
//! mutual reference never becomes an edge.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::graph::{CompositionError, Component};
use super::handle::Handle;

/// Collapse two components into one
///
/// The merged unit provides everything either side provides and requires
/// only what neither side satisfies internally.
pub fn merge(name: impl Into<String>, a: &Component, b: &Component) -> Component {
    let provides: Vec<Handle> = a.provides.iter().chain(&b.provides).cloned().collect();
    let requires = a
        .requires
        .iter()
        .chain(&b.requires)
        .filter(|h| !provides.contains(h))
        .cloned();

    let merged = Component::new(name)
        .provides_all(provides.clone())
        .requires_all(requires);

    debug!(
        unit = %merged.name,
        from = ?[&a.name, &b.name],
        "Merged components"
    );
    merged
}

/// A deferred wiring step between two handles of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub source: Handle,
    pub target: Handle,
}

/// Declare-then-link composition unit
///
/// Handles are first declared (owned by the unit) or imported (owned by an
/// earlier unit). Links run after declaration and may only name handles the
/// unit already knows about.
#[derive(Debug, Clone, Default)]
pub struct CompositionUnit {
    name: String,
    declared: Vec<Handle>,
    imported: Vec<Handle>,
    links: Vec<Link>,
}

impl CompositionUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a handle this unit owns
    pub fn declare(&mut self, handle: Handle) -> &mut Self {
        if !self.declared.contains(&handle) {
            self.declared.push(handle);
        }
        self
    }

    /// Import a handle owned by another unit
    pub fn import(&mut self, handle: Handle) -> &mut Self {
        if !self.imported.contains(&handle) && !self.declared.contains(&handle) {
            self.imported.push(handle);
        }
        self
    }

    fn knows(&self, handle: &Handle) -> bool {
        self.declared.contains(handle) || self.imported.contains(handle)
    }

    /// Record a link from `source` to `target`
    pub fn link(
        &mut self,
        label: impl Into<String>,
        source: &Handle,
        target: &Handle,
    ) -> Result<&Link, CompositionError> {
        let label = label.into();
        for handle in [source, target] {
            if !self.knows(handle) {
                return Err(CompositionError::LinkTargetMissing {
                    unit: self.name.clone(),
                    link: label,
                    handle: handle.clone(),
                });
            }
        }

        debug!(unit = %self.name, link = %label, %source, %target, "Linked handles");
        let index = self.links.len();
        self.links.push(Link {
            label,
            source: source.clone(),
            target: target.clone(),
        });
        Ok(&self.links[index])
    }

    pub fn declared(&self) -> &[Handle] {
        &self.declared
    }

    pub fn imported(&self) -> &[Handle] {
        &self.imported
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// The unit as seen by the dependency graph
    pub fn into_component(self) -> Component {
        Component::new(self.name)
            .provides_all(self.declared)
            .requires_all(self.imported)
    }
}
