// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Materialization Plans
//!
//! Random graphs are generated over components `C0..Cn`. An edge from `Ci`
//! to `Cj` with `i < j` makes `Cj` a consumer of `Ci`, expressed either as
//! a handle requirement or as an explicit dependency. Such graphs are
//! acyclic by construction; one added back edge closes a cycle.

use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tiered_infrastructure::composition::{
    Component, CompositionError, DependencyGraph, Handle, HandleKind,
};
use tiered_infrastructure::domain::{ConstructPath, LogicalId};

const MAX_COMPONENTS: usize = 10;

// ============================================================================
// Graph generation
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum EdgeKind {
    Handle,
    Explicit,
}

#[derive(Debug, Clone)]
struct GraphSpec {
    size: usize,
    /// (producer, consumer, kind), producer < consumer
    edges: Vec<(usize, usize, EdgeKind)>,
}

impl GraphSpec {
    fn name(index: usize) -> String {
        format!("C{}", index)
    }

    fn handle(index: usize) -> Handle {
        let root = ConstructPath::root(&LogicalId::new("Props").expect("valid stack id"));
        Handle::new(
            HandleKind::Parameter,
            root.child(&Self::name(index)).expect("valid construct id"),
        )
    }

    /// Producers of each component, by name
    fn producers(&self) -> HashMap<String, BTreeSet<String>> {
        let mut producers: HashMap<String, BTreeSet<String>> =
            (0..self.size).map(|i| (Self::name(i), BTreeSet::new())).collect();
        for &(producer, consumer, _) in &self.edges {
            producers
                .entry(Self::name(consumer))
                .or_default()
                .insert(Self::name(producer));
        }
        producers
    }

    fn build(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for index in 0..self.size {
            let requires = self
                .edges
                .iter()
                .filter(|(_, consumer, kind)| *consumer == index && matches!(kind, EdgeKind::Handle))
                .map(|(producer, _, _)| Self::handle(*producer));
            let component = Component::new(Self::name(index))
                .provides(Self::handle(index))
                .requires_all(requires);
            graph.add_component(component).expect("unique names");
        }
        for (producer, consumer, kind) in &self.edges {
            if matches!(kind, EdgeKind::Explicit) {
                graph
                    .add_dependency(&Self::name(*consumer), &Self::name(*producer))
                    .expect("registered components");
            }
        }
        graph
    }
}

fn edge_kind() -> impl Strategy<Value = EdgeKind> {
    prop_oneof![Just(EdgeKind::Handle), Just(EdgeKind::Explicit)]
}

fn acyclic_graph() -> impl Strategy<Value = GraphSpec> {
    (2..=MAX_COMPONENTS).prop_flat_map(|size| {
        let pairs: Vec<(usize, usize)> = (0..size)
            .flat_map(|p| ((p + 1)..size).map(move |c| (p, c)))
            .collect();
        let count = pairs.len();
        proptest::collection::vec(proptest::option::of(edge_kind()), count).prop_map(
            move |kinds| GraphSpec {
                size,
                edges: pairs
                    .iter()
                    .zip(kinds)
                    .filter_map(|(&(p, c), kind)| kind.map(|k| (p, c, k)))
                    .collect(),
            },
        )
    })
}

/// Acyclic graph whose components form at least one chain `C0 -> ... -> Cn`
fn chained_graph() -> impl Strategy<Value = GraphSpec> {
    acyclic_graph().prop_map(|mut spec| {
        for index in 1..spec.size {
            if !spec.edges.iter().any(|&(p, c, _)| p == index - 1 && c == index) {
                spec.edges.push((index - 1, index, EdgeKind::Handle));
            }
        }
        spec
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Every producer is scheduled in an earlier stage than its consumers
    #[test]
    fn prop_producers_precede_consumers(spec in acyclic_graph()) {
        let plan = spec.build().plan().unwrap();

        for &(producer, consumer, _) in &spec.edges {
            let p = plan.stage_of(&GraphSpec::name(producer)).unwrap();
            let c = plan.stage_of(&GraphSpec::name(consumer)).unwrap();
            prop_assert!(p < c, "C{} (stage {}) before C{} (stage {})", producer, p, consumer, c);
        }
    }

    /// The linear order is a permutation that satisfies its own plan
    #[test]
    fn prop_order_is_complete_and_valid(spec in acyclic_graph()) {
        let plan = spec.build().plan().unwrap();
        let order = plan.order();

        prop_assert_eq!(order.len(), spec.size);
        let unique: BTreeSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), spec.size);
        prop_assert!(plan.verify_order(&order).is_ok());
    }

    /// Stages are as early as possible: each later stage needs the one before
    #[test]
    fn prop_stages_are_minimal(spec in acyclic_graph()) {
        let plan = spec.build().plan().unwrap();
        let producers = spec.producers();

        for (index, stage) in plan.stages().iter().enumerate().skip(1) {
            for name in stage {
                prop_assert!(
                    producers[name]
                        .iter()
                        .any(|p| plan.stage_of(p) == Some(index - 1)),
                    "{} in stage {} could have been scheduled earlier",
                    name,
                    index
                );
            }
        }
    }

    /// Reversing two adjacent entries of a dependent pair is always caught
    #[test]
    fn prop_swapped_order_is_rejected(spec in chained_graph()) {
        let plan = spec.build().plan().unwrap();
        let mut order = plan.order();
        let first = order.iter().position(|n| n == "C0").unwrap();
        let second = order.iter().position(|n| n == "C1").unwrap();
        order.swap(first, second);

        let rejected = matches!(
            plan.verify_order(&order),
            Err(CompositionError::OutOfOrder { .. })
        );
        prop_assert!(rejected);
    }

    /// A back edge closes a cycle, reported as a real closed walk
    #[test]
    fn prop_back_edge_reports_cycle(spec in chained_graph(), kind in edge_kind()) {
        let mut spec = spec;
        let last = spec.size - 1;
        spec.edges.push((last, 0, kind));
        let producers = spec.producers();

        match spec.build().plan() {
            Err(CompositionError::Cycle { components }) => {
                prop_assert!(!components.is_empty());
                for (i, consumer) in components.iter().enumerate() {
                    let producer = &components[(i + 1) % components.len()];
                    prop_assert!(
                        producers[consumer].contains(producer),
                        "{} does not depend on {}",
                        consumer,
                        producer
                    );
                }
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }
}
