// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! - plan ordering over random acyclic and cyclic graphs
//! - subnet allocation over random tier configurations

mod network_layout;
mod plan_ordering;
