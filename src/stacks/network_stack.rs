// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network layer stack

use super::Stack;
use crate::constructs::{NetworkExports, VpcConstruct, VpcProps};
use crate::domain::LogicalId;
use crate::errors::InfrastructureResult;

/// Holds the VPC, its audit bucket and flow logs; depends on nothing
pub struct NetworkStack {
    stack: Stack,
    vpc: VpcConstruct,
}

impl NetworkStack {
    pub fn build(
        id: LogicalId,
        props: &VpcProps,
        availability_zones: &[String],
    ) -> InfrastructureResult<Self> {
        let mut stack = Stack::new(id, "Network layer: tiered VPC, audit bucket and flow logs");
        let vpc = VpcConstruct::build(&mut stack, "VpcConstruct", props, availability_zones)?;
        Ok(Self { stack, vpc })
    }

    pub fn exports(&self) -> &NetworkExports {
        self.vpc.exports()
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }
}
