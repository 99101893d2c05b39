// Copyright (c) 2025 - Cowboy AI, Inc.
//! Infrastructure Domain Models
//!
//! Resource descriptions and the value objects they are built from. Every
//! value object validates its invariants on construction.
//!
//! # Value Objects with Invariants
//!
//! - [`LogicalId`] - stack and construct identifiers
//! - [`Ipv4Cidr`] - IPv4 network blocks
//! - [`Port`], [`Peer`] - security rule endpoints
//! - [`ResourceType`] - resource taxonomy
//!
//! # Resource Descriptions
//!
//! - [`Network`] with its allocated [`NetworkLayout`]
//! - [`SecurityGroup`] and standalone [`SecurityGroupRule`]
//! - [`LoadBalancer`], [`TargetGroup`], [`ComputeGroup`], [`DatabaseInstance`]
//! - [`CredentialSecret`], [`InstanceRole`], [`AuditBucket`], [`ParameterDocument`]

pub mod invariants;
pub mod logical_id;
pub mod network;
pub mod resource_type;
pub mod resources;
pub mod security_group;

pub use invariants::{ValidationError, ValidationResult};
pub use logical_id::{ConstructPath, LogicalId, LogicalIdError};
pub use network::{
    Ipv4Cidr, NatGateway, NetworkError, NetworkLayout, NetworkSpec, Route, RouteTarget, Subnet,
    SubnetConfiguration, SubnetTier,
};
pub use resource_type::{ResourceCategory, ResourceType};
pub use resources::{
    ApplicationProtocol, AuditBucket, ComputeGroup, CredentialSecret, DatabaseEngine,
    DatabaseInstance, FlowLog, InstanceRole, Listener, LoadBalancer, MachineImage, Network,
    ParameterDocument, RemovalPolicy, Resource, ScalingMetric, ScalingPolicy, TargetGroup,
    TargetType,
};
pub use security_group::{
    Direction, EgressPolicy, Peer, Port, RuleSpec, SecurityGroup, SecurityGroupRule,
    SecurityRule, SecurityRuleError, UnmatchedFlow,
};
