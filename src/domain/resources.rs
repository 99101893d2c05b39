// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Descriptions
//!
//! Every entity here is a description handed to the provisioning engine,
//! not a runtime object. Each one knows its own [`Handle`] and the handles
//! it references; the composition engine orders them from that.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::network::{NetworkLayout, NetworkSpec, SubnetTier};
use super::resource_type::ResourceType;
use super::security_group::{SecurityGroup, SecurityGroupRule};
use crate::bootstrap::BootstrapScript;
use crate::composition::Handle;

/// What the provider does with a resource when its stack is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    #[default]
    Destroy,
    Retain,
    Snapshot,
}

/// Object storage bucket receiving audit logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBucket {
    pub handle: Handle,
    pub bucket_name: String,
    pub versioned: bool,
    pub block_public_access: bool,
    pub removal_policy: RemovalPolicy,
}

/// Virtual network with its allocated layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub handle: Handle,
    pub spec: NetworkSpec,
    pub layout: NetworkLayout,
}

/// Traffic log sink into a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLog {
    pub handle: Handle,
    pub network: Handle,
    pub destination: Handle,
    pub key_prefix: String,
    pub traffic_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationProtocol {
    Http,
    Https,
}

/// Listener bound to exactly one default target group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,
    pub port: u16,
    pub protocol: ApplicationProtocol,
    pub default_target_group: Handle,
}

/// Application load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub handle: Handle,
    pub network: Handle,
    pub tier: SubnetTier,
    pub subnets: Vec<String>,
    pub security_group: Handle,
    pub internet_facing: bool,
    pub listeners: Vec<Listener>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Instance,
    Ip,
}

/// Backend target group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub handle: Handle,
    pub network: Handle,
    pub port: u16,
    pub protocol: ApplicationProtocol,
    pub health_check_protocol: ApplicationProtocol,
    pub target_type: TargetType,
}

/// Identity attached to compute instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRole {
    pub handle: Handle,
    pub assumed_by: String,
    pub description: String,
    pub managed_policies: Vec<String>,
    pub secret_reads: Vec<Handle>,
}

impl InstanceRole {
    pub fn add_managed_policy(&mut self, policy: impl Into<String>) {
        let policy = policy.into();
        if !self.managed_policies.contains(&policy) {
            self.managed_policies.push(policy);
        }
    }

    /// Grant read access to a secret; repeated grants are recorded once
    pub fn grant_secret_read(&mut self, secret: Handle) {
        if !self.secret_reads.contains(&secret) {
            self.secret_reads.push(secret);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MachineImage {
    LatestAmazonLinux2,
    Ami { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMetric {
    CpuUtilization,
}

/// Target-tracking scaling policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub name: String,
    pub metric: ScalingMetric,
    pub target_percent: u8,
}

/// Auto-scaling group of instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeGroup {
    pub handle: Handle,
    pub network: Handle,
    pub tier: SubnetTier,
    pub subnets: Vec<String>,
    pub security_group: Handle,
    pub role: Handle,
    pub machine_image: MachineImage,
    pub instance_type: String,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub target_groups: Vec<Handle>,
    pub health_check_grace_secs: u32,
    pub scaling: ScalingPolicy,
    pub bootstrap: BootstrapScript,
    /// Parameter documents the bootstrap script fetches
    pub bootstrap_parameters: Vec<Handle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseEngine {
    Postgres,
    Mysql,
}

impl DatabaseEngine {
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Mysql => 3306,
        }
    }
}

/// Managed relational database instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub handle: Handle,
    pub network: Handle,
    pub tier: SubnetTier,
    pub subnets: Vec<String>,
    pub security_group: Handle,
    pub engine: DatabaseEngine,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage_gib: u32,
    pub port: u16,
    pub credentials: Handle,
    pub multi_az: bool,
    pub publicly_accessible: bool,
    pub removal_policy: RemovalPolicy,
}

/// Credential secret generated when the database is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSecret {
    pub handle: Handle,
    pub username: String,
    pub removal_policy: RemovalPolicy,
}

/// Externally stored configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDocument {
    pub handle: Handle,
    pub name: String,
    pub value: Value,
}

/// Any resource description a stack can hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Bucket(AuditBucket),
    Network(Network),
    FlowLog(FlowLog),
    SecurityGroup(SecurityGroup),
    SecurityGroupRule(SecurityGroupRule),
    LoadBalancer(LoadBalancer),
    TargetGroup(TargetGroup),
    Role(InstanceRole),
    ComputeGroup(ComputeGroup),
    Database(DatabaseInstance),
    Secret(CredentialSecret),
    Parameter(ParameterDocument),
}

impl Resource {
    pub fn handle(&self) -> &Handle {
        match self {
            Self::Bucket(r) => &r.handle,
            Self::Network(r) => &r.handle,
            Self::FlowLog(r) => &r.handle,
            Self::SecurityGroup(r) => &r.handle,
            Self::SecurityGroupRule(r) => &r.handle,
            Self::LoadBalancer(r) => &r.handle,
            Self::TargetGroup(r) => &r.handle,
            Self::Role(r) => &r.handle,
            Self::ComputeGroup(r) => &r.handle,
            Self::Database(r) => &r.handle,
            Self::Secret(r) => &r.handle,
            Self::Parameter(r) => &r.handle,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Bucket(_) => ResourceType::Bucket,
            Self::Network(_) => ResourceType::Vpc,
            Self::FlowLog(_) => ResourceType::FlowLog,
            Self::SecurityGroup(_) => ResourceType::SecurityGroup,
            Self::SecurityGroupRule(r) => match r.rule.direction {
                super::security_group::Direction::Ingress => ResourceType::SecurityGroupIngress,
                super::security_group::Direction::Egress => ResourceType::SecurityGroupEgress,
            },
            Self::LoadBalancer(_) => ResourceType::LoadBalancer,
            Self::TargetGroup(_) => ResourceType::TargetGroup,
            Self::Role(_) => ResourceType::Role,
            Self::ComputeGroup(_) => ResourceType::AutoScalingGroup,
            Self::Database(_) => ResourceType::DatabaseInstance,
            Self::Secret(_) => ResourceType::Secret,
            Self::Parameter(_) => ResourceType::Parameter,
        }
    }

    /// Teardown behavior; compute and web resources are always destroyed
    pub fn removal_policy(&self) -> RemovalPolicy {
        match self {
            Self::Bucket(r) => r.removal_policy,
            Self::Database(r) => r.removal_policy,
            Self::Secret(r) => r.removal_policy,
            _ => RemovalPolicy::Destroy,
        }
    }

    /// Handles this resource needs materialized before itself
    ///
    /// A security group's SG peers are deliberately absent: rules between
    /// groups are wired after both groups exist (see
    /// [`crate::stacks::Stack::resource_plan`]).
    pub fn references(&self) -> Vec<Handle> {
        let mut refs = match self {
            Self::Bucket(_) | Self::Network(_) | Self::Parameter(_) | Self::Secret(_) => Vec::new(),
            Self::FlowLog(r) => vec![r.network.clone(), r.destination.clone()],
            Self::SecurityGroup(r) => vec![r.network.clone()],
            Self::SecurityGroupRule(r) => {
                let mut refs = vec![r.group.clone()];
                refs.extend(r.rule.peer.security_group().cloned());
                refs
            }
            Self::LoadBalancer(r) => {
                let mut refs = vec![r.network.clone(), r.security_group.clone()];
                refs.extend(r.listeners.iter().map(|l| l.default_target_group.clone()));
                refs
            }
            Self::TargetGroup(r) => vec![r.network.clone()],
            Self::Role(r) => r.secret_reads.clone(),
            Self::ComputeGroup(r) => {
                let mut refs = vec![r.network.clone(), r.security_group.clone(), r.role.clone()];
                refs.extend(r.target_groups.iter().cloned());
                refs.extend(r.bootstrap_parameters.iter().cloned());
                refs
            }
            Self::Database(r) => vec![
                r.network.clone(),
                r.security_group.clone(),
                r.credentials.clone(),
            ],
        };
        refs.dedup();
        refs
    }

    pub fn as_security_group(&self) -> Option<&SecurityGroup> {
        match self {
            Self::SecurityGroup(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_security_group_mut(&mut self) -> Option<&mut SecurityGroup> {
        match self {
            Self::SecurityGroup(group) => Some(group),
            _ => None,
        }
    }
}
