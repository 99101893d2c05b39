// Copyright (c) 2025 - Cowboy AI, Inc.
//! Web tier construct: internet-facing load balancer and its target group

use serde::{Deserialize, Serialize};
use tracing::info;

use super::vpc::NetworkExports;
use crate::composition::{Handle, HandleKind, ProvidesHandles};
use crate::domain::{
    ApplicationProtocol, EgressPolicy, Ipv4Cidr, Listener, LoadBalancer, Peer, Port, Resource,
    SecurityGroup, SubnetTier, TargetGroup, TargetType,
};
use crate::errors::InfrastructureResult;
use crate::stacks::Stack;

/// Inputs of [`AlbConstruct`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbProps {
    pub listener_port: u16,
    pub target_port: u16,
    pub ingress_cidr: Ipv4Cidr,
    pub internet_facing: bool,
}

impl Default for AlbProps {
    fn default() -> Self {
        Self {
            listener_port: 80,
            target_port: 8080,
            ingress_cidr: Ipv4Cidr::any(),
            internet_facing: true,
        }
    }
}

/// Handles of the web tier other stacks may use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbExports {
    pub security_group: Handle,
    pub target_group: Handle,
    pub load_balancer: Handle,
    /// Egress policy of the load balancer group; consumers reaching it
    /// must add the load balancer's egress half under `ExplicitOnly`
    pub security_group_egress: EgressPolicy,
    pub target_port: u16,
}

impl ProvidesHandles for AlbExports {
    fn provided_handles(&self) -> Vec<Handle> {
        vec![self.security_group.clone(), self.target_group.clone()]
    }
}

pub struct AlbConstruct {
    exports: AlbExports,
}

impl AlbConstruct {
    pub fn build(
        stack: &mut Stack,
        id: &str,
        network: &NetworkExports,
        props: &AlbProps,
        egress_policy: EgressPolicy,
    ) -> InfrastructureResult<Self> {
        let sg_handle = Handle::new(
            HandleKind::SecurityGroup,
            stack.path(&[id, "AlbSecurityGroup"])?,
        );
        let mut security_group = SecurityGroup::new(
            sg_handle.clone(),
            network.network.clone(),
            "Security group for the application load balancer",
            egress_policy,
        );
        security_group.add_ingress_rule(
            Peer::cidr(props.ingress_cidr),
            Port::tcp(props.listener_port)?,
            "Allow HTTP traffic from anywhere",
        )?;
        stack.add_resource(Resource::SecurityGroup(security_group))?;

        let target_group = Handle::new(HandleKind::TargetGroup, stack.path(&[id, "AppTargetGroup"])?);
        stack.add_resource(Resource::TargetGroup(TargetGroup {
            handle: target_group.clone(),
            network: network.network.clone(),
            port: props.target_port,
            protocol: ApplicationProtocol::Http,
            health_check_protocol: ApplicationProtocol::Http,
            target_type: TargetType::Instance,
        }))?;

        let load_balancer = Handle::new(
            HandleKind::LoadBalancer,
            stack.path(&[id, "ApplicationLoadBalancer"])?,
        );
        let tier = if props.internet_facing {
            SubnetTier::Public
        } else {
            SubnetTier::PrivateWithEgress
        };
        stack.add_resource(Resource::LoadBalancer(LoadBalancer {
            handle: load_balancer.clone(),
            network: network.network.clone(),
            tier,
            subnets: network.subnets(tier).to_vec(),
            security_group: sg_handle.clone(),
            internet_facing: props.internet_facing,
            listeners: vec![Listener {
                name: "HttpListener".to_string(),
                port: props.listener_port,
                protocol: ApplicationProtocol::Http,
                default_target_group: target_group.clone(),
            }],
        }))?;

        stack.add_output("AppTargetGroupArn", target_group.clone());

        info!(
            stack = %stack.id(),
            listener_port = props.listener_port,
            target_port = props.target_port,
            "Declared load balancer"
        );

        Ok(Self {
            exports: AlbExports {
                security_group: sg_handle,
                target_group,
                load_balancer,
                security_group_egress: egress_policy,
                target_port: props.target_port,
            },
        })
    }

    pub fn exports(&self) -> &AlbExports {
        &self.exports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::vpc::{VpcConstruct, VpcProps};
    use crate::domain::{Direction, LogicalId};

    fn network() -> NetworkExports {
        let mut stack = Stack::new(LogicalId::new("NetworkStack").unwrap(), "network");
        let zones = vec!["us-east-1a".to_string(), "us-east-1b".to_string()];
        VpcConstruct::build(&mut stack, "VpcConstruct", &VpcProps::default(), &zones)
            .unwrap()
            .exports()
            .clone()
    }

    #[test]
    fn test_load_balancer_in_public_tier() {
        let network = network();
        let mut stack = Stack::new(LogicalId::new("WebStack").unwrap(), "web");
        let alb = AlbConstruct::build(
            &mut stack,
            "ApplicationLoadBalancerResources",
            &network,
            &AlbProps::default(),
            EgressPolicy::AllowAll,
        )
        .unwrap();

        match stack.resource(&alb.exports().load_balancer) {
            Some(Resource::LoadBalancer(lb)) => {
                assert_eq!(lb.tier, SubnetTier::Public);
                assert_eq!(lb.subnets, network.public_subnets);
                assert_eq!(lb.listeners[0].port, 80);
                assert_eq!(lb.listeners[0].default_target_group, alb.exports().target_group);
            }
            other => panic!("expected load balancer, got {:?}", other),
        }

        let sg = stack
            .security_groups()
            .next()
            .expect("security group declared");
        let rules = sg.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].direction, Direction::Ingress);
        assert_eq!(rules[0].peer, Peer::AnyIpv4);
        assert_eq!(sg.effective_egress()[0].port, Port::AllTraffic);

        assert_eq!(
            stack.outputs()[0].export_name,
            "WebStack-AppTargetGroupArn"
        );
    }

    #[test]
    fn test_target_group_defaults() {
        let mut stack = Stack::new(LogicalId::new("WebStack").unwrap(), "web");
        let alb = AlbConstruct::build(
            &mut stack,
            "Alb",
            &network(),
            &AlbProps::default(),
            EgressPolicy::ExplicitOnly,
        )
        .unwrap();

        match stack.resource(&alb.exports().target_group) {
            Some(Resource::TargetGroup(tg)) => {
                assert_eq!(tg.port, 8080);
                assert_eq!(tg.protocol, ApplicationProtocol::Http);
                assert_eq!(tg.target_type, TargetType::Instance);
            }
            other => panic!("expected target group, got {:?}", other),
        }
        assert_eq!(alb.exports().security_group_egress, EgressPolicy::ExplicitOnly);
    }
}
