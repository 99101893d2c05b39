// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network construct: audit bucket, tiered VPC and flow logs

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::composition::{Handle, HandleKind, ProvidesHandles};
use crate::domain::{
    AuditBucket, FlowLog, Ipv4Cidr, Network, NetworkLayout, NetworkSpec, RemovalPolicy, Resource,
    SubnetConfiguration, SubnetTier,
};
use crate::errors::InfrastructureResult;
use crate::stacks::Stack;

/// Inputs of [`VpcConstruct`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VpcProps {
    pub vpc_name: String,
    pub cidr: Ipv4Cidr,
    pub max_azs: usize,
    pub nat_gateways: usize,
    pub subnets: Vec<SubnetConfiguration>,
    pub audit_bucket_name: String,
    pub audit_bucket_removal: RemovalPolicy,
    /// Defaults to `vpc-logs/<vpc_name>`
    pub flow_log_prefix: Option<String>,
}

impl Default for VpcProps {
    fn default() -> Self {
        Self {
            vpc_name: "3-tier-vpc".to_string(),
            cidr: Ipv4Cidr::from_octets([192, 168, 0, 0], 16),
            max_azs: 2,
            nat_gateways: 1,
            subnets: vec![
                SubnetConfiguration::new("Public", SubnetTier::Public, 22),
                SubnetConfiguration::new("Compute", SubnetTier::PrivateWithEgress, 20),
                SubnetConfiguration::new("RDS", SubnetTier::Isolated, 24),
            ],
            audit_bucket_name: "portfolio-demo-audit-logs".to_string(),
            audit_bucket_removal: RemovalPolicy::Destroy,
            flow_log_prefix: None,
        }
    }
}

impl VpcProps {
    pub fn flow_log_prefix(&self) -> String {
        self.flow_log_prefix
            .clone()
            .unwrap_or_else(|| format!("vpc-logs/{}", self.vpc_name))
    }

    pub fn network_spec(&self) -> NetworkSpec {
        NetworkSpec {
            name: self.vpc_name.clone(),
            cidr: self.cidr,
            max_azs: self.max_azs,
            subnets: self.subnets.clone(),
            nat_gateways: self.nat_gateways,
        }
    }
}

/// What consumers of the network may see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkExports {
    pub network: Handle,
    pub public_subnets: Vec<String>,
    pub compute_subnets: Vec<String>,
    pub isolated_subnets: Vec<String>,
}

impl NetworkExports {
    fn from_layout(network: Handle, layout: &NetworkLayout) -> Self {
        Self {
            network,
            public_subnets: layout.subnet_names(SubnetTier::Public),
            compute_subnets: layout.subnet_names(SubnetTier::PrivateWithEgress),
            isolated_subnets: layout.subnet_names(SubnetTier::Isolated),
        }
    }

    /// Subnets of one tier
    pub fn subnets(&self, tier: SubnetTier) -> &[String] {
        match tier {
            SubnetTier::Public => &self.public_subnets,
            SubnetTier::PrivateWithEgress => &self.compute_subnets,
            SubnetTier::Isolated => &self.isolated_subnets,
        }
    }
}

impl ProvidesHandles for NetworkExports {
    fn provided_handles(&self) -> Vec<Handle> {
        vec![self.network.clone()]
    }
}

/// Audit bucket, VPC with tiered subnets, and flow logs into the bucket
#[derive(Debug, Clone)]
pub struct VpcConstruct {
    pub bucket: Handle,
    pub flow_log: Handle,
    exports: NetworkExports,
}

impl VpcConstruct {
    pub fn build(
        stack: &mut Stack,
        id: &str,
        props: &VpcProps,
        availability_zones: &[String],
    ) -> InfrastructureResult<Self> {
        let spec = props.network_spec();
        let layout = spec.layout(availability_zones)?;

        let bucket = Handle::new(HandleKind::Bucket, stack.path(&[id, "AuditBucket"])?);
        stack.add_resource(Resource::Bucket(AuditBucket {
            handle: bucket.clone(),
            bucket_name: props.audit_bucket_name.clone(),
            versioned: false,
            block_public_access: true,
            removal_policy: props.audit_bucket_removal,
        }))?;

        let network = Handle::new(HandleKind::Network, stack.path(&[id, "AppVPC"])?);
        let exports = NetworkExports::from_layout(network.clone(), &layout);

        info!(
            vpc = %props.vpc_name,
            cidr = %props.cidr,
            subnets = layout.subnets.len(),
            nat_gateways = layout.nat_gateways.len(),
            "Laid out network"
        );

        stack.add_resource(Resource::Network(Network {
            handle: network.clone(),
            spec,
            layout,
        }))?;

        let flow_log = Handle::new(HandleKind::FlowLog, stack.path(&[id, "AppVPC", "FlowLogS3"])?);
        stack.add_resource(Resource::FlowLog(FlowLog {
            handle: flow_log.clone(),
            network,
            destination: bucket.clone(),
            key_prefix: props.flow_log_prefix(),
            traffic_type: "ALL".to_string(),
        }))?;

        Ok(Self {
            bucket,
            flow_log,
            exports,
        })
    }

    pub fn exports(&self) -> &NetworkExports {
        &self.exports
    }
}
