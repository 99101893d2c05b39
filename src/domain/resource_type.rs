// Copyright (c) 2025 - Cowboy AI, Inc.
//! Infrastructure Resource Type Domain Model
//!
//! The vocabulary of resource descriptions this crate emits, with the
//! provider type name each one maps to in the cloud assembly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource type taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    // Network
    /// Virtual network with its subnets, gateways and route tables
    Vpc,
    /// Traffic log sink
    FlowLog,

    // Security
    /// Security group
    SecurityGroup,
    /// Ingress rule declared outside the owning group
    SecurityGroupIngress,
    /// Egress rule declared outside the owning group
    SecurityGroupEgress,

    // Web
    /// Application load balancer with its listeners
    LoadBalancer,
    /// Load balancer target group
    TargetGroup,

    // Compute
    /// Auto-scaling group with its launch configuration and scaling policy
    AutoScalingGroup,

    // Identity
    /// Instance role
    Role,

    // Storage & data
    /// Object storage bucket
    Bucket,
    /// Managed relational database instance
    DatabaseInstance,
    /// Generated credential secret
    Secret,
    /// Key/value configuration document
    Parameter,
}

impl ResourceType {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::FlowLog => "flow_log",
            Self::SecurityGroup => "security_group",
            Self::SecurityGroupIngress => "security_group_ingress",
            Self::SecurityGroupEgress => "security_group_egress",
            Self::LoadBalancer => "load_balancer",
            Self::TargetGroup => "target_group",
            Self::AutoScalingGroup => "auto_scaling_group",
            Self::Role => "role",
            Self::Bucket => "bucket",
            Self::DatabaseInstance => "database_instance",
            Self::Secret => "secret",
            Self::Parameter => "parameter",
        }
    }

    /// Provider type name used in emitted templates
    pub fn provider_type(&self) -> &'static str {
        match self {
            Self::Vpc => "AWS::EC2::VPC",
            Self::FlowLog => "AWS::EC2::FlowLog",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            Self::SecurityGroupEgress => "AWS::EC2::SecurityGroupEgress",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::AutoScalingGroup => "AWS::AutoScaling::AutoScalingGroup",
            Self::Role => "AWS::IAM::Role",
            Self::Bucket => "AWS::S3::Bucket",
            Self::DatabaseInstance => "AWS::RDS::DBInstance",
            Self::Secret => "AWS::SecretsManager::Secret",
            Self::Parameter => "AWS::SSM::Parameter",
        }
    }

    /// Get the resource category
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Vpc | Self::FlowLog => ResourceCategory::Network,
            Self::SecurityGroup | Self::SecurityGroupIngress | Self::SecurityGroupEgress => {
                ResourceCategory::Security
            }
            Self::LoadBalancer | Self::TargetGroup => ResourceCategory::Web,
            Self::AutoScalingGroup => ResourceCategory::Compute,
            Self::Role => ResourceCategory::Identity,
            Self::Bucket | Self::DatabaseInstance | Self::Secret | Self::Parameter => {
                ResourceCategory::Data
            }
        }
    }

    /// Whether the resource holds data that outlives a redeploy
    ///
    /// Only stateful resources may carry a retain or snapshot removal policy.
    pub fn is_stateful(&self) -> bool {
        matches!(
            self,
            Self::Bucket | Self::DatabaseInstance | Self::Secret
        )
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource category for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Network,
    Security,
    Web,
    Compute,
    Identity,
    Data,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Security => "security",
            Self::Web => "web",
            Self::Compute => "compute",
            Self::Identity => "identity",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
