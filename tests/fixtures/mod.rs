// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for tiered-infrastructure
//!
//! Deterministic deployment configurations and lookups shared by the
//! integration suites. Every composition starts from a fixture here.
#![allow(dead_code)]

use tiered_infrastructure::config::{ConfigVersion, DatabaseLayout, DeploymentConfig};
use tiered_infrastructure::domain::{
    ComputeGroup, InstanceRole, Network, Resource, SecurityGroup,
};
use tiered_infrastructure::{Handle, InfrastructureApp, Stack};

pub const NETWORK_STACK: &str = "NetworkStack";
pub const WEB_STACK: &str = "WebStack";
pub const APP_STACK: &str = "AppStack";
pub const DATABASE_STACK: &str = "DatabaseStack";

pub const AGENT_PARAMETER_PATH: &str = "/CloudWatchAgent/EC2/Config";

/// Configuration pinned to a version and database layout
pub fn config(version: ConfigVersion, layout: DatabaseLayout) -> DeploymentConfig {
    let mut config = DeploymentConfig::for_version(version);
    config.database_layout = layout;
    config
}

/// Compose the current-version app with the given layout
pub fn compose(layout: DatabaseLayout) -> InfrastructureApp {
    InfrastructureApp::compose(&config(ConfigVersion::V2, layout))
        .expect("fixture configuration must compose")
}

pub fn stack<'a>(app: &'a InfrastructureApp, name: &str) -> &'a Stack {
    app.stack(name)
        .unwrap_or_else(|| panic!("stack {} missing from composition", name))
}

pub fn network(stack: &Stack) -> &Network {
    stack
        .resources()
        .iter()
        .find_map(|r| match r {
            Resource::Network(n) => Some(n),
            _ => None,
        })
        .expect("stack has no network")
}

pub fn compute_group(stack: &Stack) -> &ComputeGroup {
    stack
        .resources()
        .iter()
        .find_map(|r| match r {
            Resource::ComputeGroup(g) => Some(g),
            _ => None,
        })
        .expect("stack has no compute group")
}

pub fn role(stack: &Stack) -> &InstanceRole {
    stack
        .resources()
        .iter()
        .find_map(|r| match r {
            Resource::Role(role) => Some(role),
            _ => None,
        })
        .expect("stack has no instance role")
}

/// Security group guarding the compute group of `stack`
pub fn compute_security_group(stack: &Stack) -> &SecurityGroup {
    let handle: &Handle = &compute_group(stack).security_group;
    stack
        .security_group(handle)
        .expect("compute security group missing")
}

/// Handle of the first database security group in the app
pub fn database_security_group(app: &InfrastructureApp) -> Handle {
    app.stacks()
        .iter()
        .flat_map(Stack::resources)
        .find_map(|r| match r {
            Resource::Database(db) => Some(db.security_group.clone()),
            _ => None,
        })
        .expect("composition has no database")
}
