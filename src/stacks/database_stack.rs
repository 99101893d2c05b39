// Copyright (c) 2025 - Cowboy AI, Inc.
//! Standalone database layer stack

use super::{NetworkStack, Stack};
use crate::constructs::{DatabaseExports, RdsConstruct, RdsProps};
use crate::domain::{EgressPolicy, LogicalId};
use crate::errors::InfrastructureResult;

/// Database instance and its credential secret
///
/// Knows nothing about its consumers. The app stack declares the
/// database-side ingress rule itself, so the only edge between the two
/// stacks runs from here to the app stack.
pub struct DatabaseStack {
    stack: Stack,
    rds: RdsConstruct,
}

impl DatabaseStack {
    pub fn build(
        id: LogicalId,
        network: &NetworkStack,
        props: &RdsProps,
        egress_policy: EgressPolicy,
    ) -> InfrastructureResult<Self> {
        let mut stack = Stack::new(id, "Database layer: isolated relational instance");
        let rds = RdsConstruct::build(&mut stack, "RDSInstance", network.exports(), props, egress_policy)?;
        stack.add_dependency(network.stack());
        Ok(Self { stack, rds })
    }

    pub fn exports(&self) -> &DatabaseExports {
        self.rds.exports()
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }
}
