// Copyright (c) 2025 - Cowboy AI, Inc.
//! Web layer stack

use super::{NetworkStack, Stack};
use crate::constructs::{AlbConstruct, AlbExports, AlbProps};
use crate::domain::{EgressPolicy, LogicalId};
use crate::errors::InfrastructureResult;

/// Load balancer, listener and target group in the public tier
pub struct WebStack {
    stack: Stack,
    alb: AlbConstruct,
}

impl WebStack {
    pub fn build(
        id: LogicalId,
        network: &NetworkStack,
        props: &AlbProps,
        egress_policy: EgressPolicy,
    ) -> InfrastructureResult<Self> {
        let mut stack = Stack::new(id, "Web layer: application load balancer");
        let alb = AlbConstruct::build(
            &mut stack,
            "ApplicationLoadBalancerResources",
            network.exports(),
            props,
            egress_policy,
        )?;
        stack.add_dependency(network.stack());
        Ok(Self { stack, alb })
    }

    pub fn exports(&self) -> &AlbExports {
        self.alb.exports()
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }
}
