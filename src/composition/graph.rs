// Copyright (c) 2025 - Cowboy AI, Inc.
//! Dependency Composition Engine
//!
//! Components declare the handles they provide and the handles they
//! require. A component that requires a handle is materialized strictly
//! after the component providing it. The plan groups components into
//! stages: everything in stage `k` depends only on stages before `k`, so
//! members of one stage may be materialized in any order or in parallel.
//!
//! Two components that need each other's handles form a cycle and are
//! rejected. Merge them into one unit, or declare both and link them
//! afterwards (see [`super::link`]).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, info};

use super::handle::Handle;

/// Errors raised while planning the materialization order
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("Component {0} is already registered")]
    DuplicateComponent(String),

    #[error("Handle {handle} is provided by both {first} and {second}")]
    DuplicateHandle {
        handle: Handle,
        first: String,
        second: String,
    },

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("{consumer} requires {handle}, which no component provides")]
    UnresolvedHandle { consumer: String, handle: Handle },

    #[error("Dependency cycle between: {}", components.join(" -> "))]
    Cycle { components: Vec<String> },

    #[error("{consumer} is scheduled before its producer {producer}")]
    OutOfOrder { consumer: String, producer: String },

    #[error("Order does not schedule {0} exactly once")]
    IncompleteOrder(String),

    #[error("{handle} is owned by {owner}, not {unit}")]
    ForeignHandle {
        unit: String,
        owner: String,
        handle: Handle,
    },

    #[error("Link {link} in {unit} references {handle}, which is neither declared nor imported")]
    LinkTargetMissing {
        unit: String,
        link: String,
        handle: Handle,
    },
}

/// A named unit with provided and required handles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub provides: Vec<Handle>,
    pub requires: Vec<Handle>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provides: Vec::new(),
            requires: Vec::new(),
        }
    }

    pub fn provides(mut self, handle: Handle) -> Self {
        if !self.provides.contains(&handle) {
            self.provides.push(handle);
        }
        self
    }

    pub fn requires(mut self, handle: Handle) -> Self {
        if !self.requires.contains(&handle) {
            self.requires.push(handle);
        }
        self
    }

    pub fn provides_all(self, handles: impl IntoIterator<Item = Handle>) -> Self {
        handles.into_iter().fold(self, Component::provides)
    }

    pub fn requires_all(self, handles: impl IntoIterator<Item = Handle>) -> Self {
        handles.into_iter().fold(self, Component::requires)
    }
}

/// Directed (producer → consumer) graph over components
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    components: Vec<Component>,
    index: HashMap<String, usize>,
    /// Explicit ordering edges as (consumer, producer) indices
    explicit: BTreeSet<(usize, usize)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component; names are unique
    pub fn add_component(&mut self, component: Component) -> Result<(), CompositionError> {
        if self.index.contains_key(&component.name) {
            return Err(CompositionError::DuplicateComponent(component.name));
        }
        debug!(
            component = %component.name,
            provides = component.provides.len(),
            requires = component.requires.len(),
            "Registered component"
        );
        self.index.insert(component.name.clone(), self.components.len());
        self.components.push(component);
        Ok(())
    }

    /// Declare that `consumer` must be materialized after `producer`
    pub fn add_dependency(&mut self, consumer: &str, producer: &str) -> Result<(), CompositionError> {
        let consumer_index = self.lookup(consumer)?;
        let producer_index = self.lookup(producer)?;
        self.explicit.insert((consumer_index, producer_index));
        Ok(())
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.index.get(name).map(|&i| &self.components[i])
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<usize, CompositionError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| CompositionError::UnknownComponent(name.to_string()))
    }

    /// Which component provides each handle
    pub fn producers(&self) -> Result<HashMap<&Handle, usize>, CompositionError> {
        let mut producers: HashMap<&Handle, usize> = HashMap::new();
        for (index, component) in self.components.iter().enumerate() {
            for handle in &component.provides {
                if let Some(&first) = producers.get(handle) {
                    if first != index {
                        return Err(CompositionError::DuplicateHandle {
                            handle: handle.clone(),
                            first: self.components[first].name.clone(),
                            second: component.name.clone(),
                        });
                    }
                }
                producers.insert(handle, index);
            }
        }
        Ok(producers)
    }

    /// Producers of each component, resolved from handles and explicit edges
    fn dependencies(&self) -> Result<Vec<BTreeSet<usize>>, CompositionError> {
        let producers = self.producers()?;
        let mut dependencies = vec![BTreeSet::new(); self.components.len()];

        for (consumer, component) in self.components.iter().enumerate() {
            for handle in &component.requires {
                let producer = producers.get(handle).copied().ok_or_else(|| {
                    CompositionError::UnresolvedHandle {
                        consumer: component.name.clone(),
                        handle: handle.clone(),
                    }
                })?;
                // Handles a component provides to itself impose no order
                if producer != consumer {
                    dependencies[consumer].insert(producer);
                }
            }
        }

        for &(consumer, producer) in &self.explicit {
            dependencies[consumer].insert(producer);
        }

        Ok(dependencies)
    }

    /// Compute a staged materialization plan
    ///
    /// Stages are computed by repeatedly taking every component whose
    /// producers are all scheduled. Within a stage, components keep their
    /// registration order.
    pub fn plan(&self) -> Result<MaterializationPlan, CompositionError> {
        let dependencies = self.dependencies()?;
        let count = self.components.len();

        let mut scheduled = vec![false; count];
        let mut remaining = count;
        let mut stages: Vec<Vec<String>> = Vec::new();

        while remaining > 0 {
            let ready: Vec<usize> = (0..count)
                .filter(|&i| !scheduled[i] && dependencies[i].iter().all(|&p| scheduled[p]))
                .collect();

            if ready.is_empty() {
                let components = self.find_cycle(&dependencies, &scheduled);
                return Err(CompositionError::Cycle { components });
            }

            for &i in &ready {
                scheduled[i] = true;
            }
            remaining -= ready.len();
            stages.push(
                ready
                    .into_iter()
                    .map(|i| self.components[i].name.clone())
                    .collect(),
            );
        }

        let edges = dependencies
            .iter()
            .enumerate()
            .flat_map(|(consumer, producers)| {
                producers.iter().map(move |&producer| Edge {
                    producer: self.components[producer].name.clone(),
                    consumer: self.components[consumer].name.clone(),
                })
            })
            .collect();

        info!(
            components = count,
            stages = stages.len(),
            "Computed materialization plan"
        );

        Ok(MaterializationPlan { stages, edges })
    }

    /// Walk unscheduled dependencies until a node repeats
    ///
    /// Every unscheduled node has at least one unscheduled producer, so the
    /// walk always closes a cycle.
    fn find_cycle(&self, dependencies: &[BTreeSet<usize>], scheduled: &[bool]) -> Vec<String> {
        let Some(start) = (0..self.components.len()).find(|&i| !scheduled[i]) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut current = start;

        loop {
            if let Some(&at) = position.get(&current) {
                return path[at..]
                    .iter()
                    .map(|&i| self.components[i].name.clone())
                    .collect();
            }
            position.insert(current, path.len());
            path.push(current);

            match dependencies[current].iter().find(|&&p| !scheduled[p]) {
                Some(&next) => current = next,
                None => {
                    return path
                        .iter()
                        .map(|&i| self.components[i].name.clone())
                        .collect()
                }
            }
        }
    }
}

/// One (producer → consumer) ordering constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub producer: String,
    pub consumer: String,
}

/// Partially ordered materialization plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationPlan {
    stages: Vec<Vec<String>>,
    edges: Vec<Edge>,
}

impl MaterializationPlan {
    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// One linear order consistent with the plan
    pub fn order(&self) -> Vec<String> {
        self.stages.iter().flatten().cloned().collect()
    }

    /// Stage a component is scheduled in
    pub fn stage_of(&self, name: &str) -> Option<usize> {
        self.stages
            .iter()
            .position(|stage| stage.iter().any(|n| n == name))
    }

    /// Whether `consumer` directly depends on `producer`
    pub fn depends_on(&self, consumer: &str, producer: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.consumer == consumer && e.producer == producer)
    }

    /// Producers `consumer` directly depends on
    pub fn producers_of(&self, consumer: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.consumer == consumer)
            .map(|e| e.producer.as_str())
            .collect()
    }

    /// Check an externally supplied order against the plan
    ///
    /// The order must schedule every planned component exactly once and
    /// place every producer before each of its consumers.
    pub fn verify_order<S: AsRef<str>>(&self, order: &[S]) -> Result<(), CompositionError> {
        let mut position: HashMap<&str, usize> = HashMap::new();
        for (at, name) in order.iter().enumerate() {
            let name = name.as_ref();
            if self.stage_of(name).is_none() {
                return Err(CompositionError::UnknownComponent(name.to_string()));
            }
            if position.insert(name, at).is_some() {
                return Err(CompositionError::IncompleteOrder(name.to_string()));
            }
        }

        if let Some(missing) = self.order().into_iter().find(|n| !position.contains_key(n.as_str())) {
            return Err(CompositionError::IncompleteOrder(missing));
        }

        for edge in &self.edges {
            if position[edge.producer.as_str()] >= position[edge.consumer.as_str()] {
                return Err(CompositionError::OutOfOrder {
                    consumer: edge.consumer.clone(),
                    producer: edge.producer.clone(),
                });
            }
        }

        Ok(())
    }
}
