// Copyright (c) 2025 - Cowboy AI, Inc.
//! Dependency composition
//!
//! ```text
//! Component ──provides──> Handle <──requires── Component
//!                 │
//!                 ▼
//!        DependencyGraph::plan()
//!                 │
//!                 ▼
//!       MaterializationPlan (stages)
//! ```

pub mod graph;
pub mod handle;
pub mod link;

pub use graph::{Component, CompositionError, DependencyGraph, Edge, MaterializationPlan};
pub use handle::{Handle, HandleKind, ProvidesHandles};
pub use link::{merge, CompositionUnit, Link};
