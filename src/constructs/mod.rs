// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reusable constructs
//!
//! A construct adds a group of related resources to a stack and hands back
//! only the handles its consumers need ([`ProvidesHandles`] exports), never
//! the resources themselves.
//!
//! [`ProvidesHandles`]: crate::composition::ProvidesHandles

pub mod alb;
pub mod asg;
pub mod rds;
pub mod vpc;

pub use alb::{AlbConstruct, AlbExports, AlbProps};
pub use asg::{AsgConstruct, AsgExports, AsgProps, AsgWiring};
pub use rds::{DatabaseExports, RdsConstruct, RdsProps};
pub use vpc::{NetworkExports, VpcConstruct, VpcProps};
