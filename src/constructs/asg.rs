// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute tier construct: instance role, security group and auto-scaling group

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::alb::AlbExports;
use super::vpc::NetworkExports;
use crate::bootstrap::BootstrapScript;
use crate::composition::{Handle, HandleKind, ProvidesHandles};
use crate::domain::{
    ComputeGroup, Direction, EgressPolicy, InstanceRole, MachineImage, Peer, Port, Resource,
    ScalingMetric, ScalingPolicy, SecurityGroup, SecurityGroupRule, SecurityRule, SubnetTier,
};
use crate::errors::InfrastructureResult;
use crate::stacks::Stack;

/// Service principal compute instances assume their role through
pub const EC2_SERVICE_PRINCIPAL: &str = "ec2.amazonaws.com";

/// Inputs of [`AsgConstruct`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsgProps {
    pub instance_type: String,
    pub machine_image: MachineImage,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub cpu_target_percent: u8,
    pub health_check_grace_secs: u32,
    pub managed_policies: Vec<String>,
    /// Outbound HTTPS to anywhere, for package and agent downloads
    pub https_egress: bool,
}

impl Default for AsgProps {
    fn default() -> Self {
        Self {
            instance_type: "t3.micro".to_string(),
            machine_image: MachineImage::LatestAmazonLinux2,
            min_capacity: 1,
            max_capacity: 2,
            cpu_target_percent: 60,
            health_check_grace_secs: 300,
            managed_policies: vec![
                "AmazonSSMManagedInstanceCore".to_string(),
                "CloudWatchAgentServerPolicy".to_string(),
                "CloudWatchLogsFullAccess".to_string(),
            ],
            https_egress: true,
        }
    }
}

/// Handles of the compute tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsgExports {
    pub security_group: Handle,
    pub role: Handle,
    pub compute_group: Handle,
}

impl ProvidesHandles for AsgExports {
    fn provided_handles(&self) -> Vec<Handle> {
        vec![
            self.security_group.clone(),
            self.role.clone(),
            self.compute_group.clone(),
        ]
    }
}

/// Inputs that come from other constructs rather than configuration
pub struct AsgWiring<'a> {
    pub network: &'a NetworkExports,
    pub load_balancer: &'a AlbExports,
    pub bootstrap: BootstrapScript,
    pub bootstrap_parameters: Vec<Handle>,
    pub egress_policy: EgressPolicy,
}

pub struct AsgConstruct {
    exports: AsgExports,
}

impl AsgConstruct {
    pub fn build(
        stack: &mut Stack,
        id: &str,
        props: &AsgProps,
        wiring: AsgWiring<'_>,
    ) -> InfrastructureResult<Self> {
        let AsgWiring {
            network,
            load_balancer,
            bootstrap,
            bootstrap_parameters,
            egress_policy,
        } = wiring;

        let role = Handle::new(HandleKind::Role, stack.path(&[id, "InstanceRole"])?);
        let mut instance_role = InstanceRole {
            handle: role.clone(),
            assumed_by: EC2_SERVICE_PRINCIPAL.to_string(),
            description: "Role assumed by application instances".to_string(),
            managed_policies: Vec::new(),
            secret_reads: Vec::new(),
        };
        for policy in &props.managed_policies {
            instance_role.add_managed_policy(policy.clone());
        }
        stack.add_resource(Resource::Role(instance_role))?;

        let sg_handle = Handle::new(
            HandleKind::SecurityGroup,
            stack.path(&[id, "AsgSecurityGroup"])?,
        );
        let app_port = Port::tcp(load_balancer.target_port)?;
        let mut security_group = SecurityGroup::new(
            sg_handle.clone(),
            network.network.clone(),
            "Security group for application instances",
            egress_policy,
        );
        security_group.add_ingress_rule(
            Peer::group(load_balancer.security_group.clone()),
            app_port,
            "Allow traffic from the load balancer",
        )?;
        if props.https_egress {
            security_group.add_egress_rule(Peer::AnyIpv4, Port::tcp(443)?, "Allow HTTPS outbound")?;
        }
        stack.add_resource(Resource::SecurityGroup(security_group))?;

        if load_balancer.security_group_egress == EgressPolicy::ExplicitOnly {
            let rule = Handle::new(
                HandleKind::SecurityGroupRule,
                stack.path(&[id, "LoadBalancerEgressToApp"])?,
            );
            stack.add_resource(Resource::SecurityGroupRule(SecurityGroupRule {
                handle: rule,
                group: load_balancer.security_group.clone(),
                rule: SecurityRule {
                    direction: Direction::Egress,
                    peer: Peer::group(sg_handle.clone()),
                    port: app_port,
                    description: "Allow the load balancer to reach application instances"
                        .to_string(),
                },
            }))?;
            debug!(stack = %stack.id(), "Declared load balancer egress half");
        }

        let compute_group = Handle::new(
            HandleKind::ComputeGroup,
            stack.path(&[id, "AutoScalingGroup"])?,
        );
        stack.add_resource(Resource::ComputeGroup(ComputeGroup {
            handle: compute_group.clone(),
            network: network.network.clone(),
            tier: SubnetTier::PrivateWithEgress,
            subnets: network.subnets(SubnetTier::PrivateWithEgress).to_vec(),
            security_group: sg_handle.clone(),
            role: role.clone(),
            machine_image: props.machine_image.clone(),
            instance_type: props.instance_type.clone(),
            min_capacity: props.min_capacity,
            max_capacity: props.max_capacity,
            target_groups: vec![load_balancer.target_group.clone()],
            health_check_grace_secs: props.health_check_grace_secs,
            scaling: ScalingPolicy {
                name: "CpuScaling".to_string(),
                metric: ScalingMetric::CpuUtilization,
                target_percent: props.cpu_target_percent,
            },
            bootstrap,
            bootstrap_parameters,
        }))?;

        info!(
            stack = %stack.id(),
            instance_type = %props.instance_type,
            min = props.min_capacity,
            max = props.max_capacity,
            "Declared compute group"
        );

        Ok(Self {
            exports: AsgExports {
                security_group: sg_handle,
                role,
                compute_group,
            },
        })
    }

    pub fn exports(&self) -> &AsgExports {
        &self.exports
    }
}
