// Copyright (c) 2025 - Cowboy AI, Inc.
//! Database tier construct: isolated relational instance with generated credentials

use serde::{Deserialize, Serialize};
use tracing::info;

use super::vpc::NetworkExports;
use crate::composition::{Handle, HandleKind, ProvidesHandles};
use crate::domain::{
    CredentialSecret, DatabaseEngine, DatabaseInstance, EgressPolicy, RemovalPolicy, Resource,
    SecurityGroup, SubnetTier,
};
use crate::errors::InfrastructureResult;
use crate::stacks::Stack;

/// Inputs of [`RdsConstruct`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdsProps {
    pub engine: DatabaseEngine,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage_gib: u32,
    /// Defaults to the engine's standard port
    pub port: Option<u16>,
    pub username: String,
    pub multi_az: bool,
    pub removal_policy: RemovalPolicy,
    pub secret_removal_policy: RemovalPolicy,
}

impl Default for RdsProps {
    fn default() -> Self {
        Self {
            engine: DatabaseEngine::Postgres,
            engine_version: "16.3".to_string(),
            instance_class: "db.t4g.micro".to_string(),
            allocated_storage_gib: 20,
            port: None,
            username: "postgres".to_string(),
            multi_az: false,
            removal_policy: RemovalPolicy::Snapshot,
            secret_removal_policy: RemovalPolicy::Destroy,
        }
    }
}

impl RdsProps {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }
}

/// What the compute tier needs to reach the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseExports {
    pub security_group: Handle,
    pub secret: Handle,
    pub port: u16,
}

impl ProvidesHandles for DatabaseExports {
    fn provided_handles(&self) -> Vec<Handle> {
        vec![self.security_group.clone(), self.secret.clone()]
    }
}

pub struct RdsConstruct {
    pub database: Handle,
    exports: DatabaseExports,
}

impl RdsConstruct {
    pub fn build(
        stack: &mut Stack,
        id: &str,
        network: &NetworkExports,
        props: &RdsProps,
        egress_policy: EgressPolicy,
    ) -> InfrastructureResult<Self> {
        let sg_handle = Handle::new(
            HandleKind::SecurityGroup,
            stack.path(&[id, "RdsSecurityGroup"])?,
        );
        stack.add_resource(Resource::SecurityGroup(SecurityGroup::new(
            sg_handle.clone(),
            network.network.clone(),
            "Security group for the database instance",
            egress_policy,
        )))?;

        let secret = Handle::new(HandleKind::Secret, stack.path(&[id, "Secret"])?);
        stack.add_resource(Resource::Secret(CredentialSecret {
            handle: secret.clone(),
            username: props.username.clone(),
            removal_policy: props.secret_removal_policy,
        }))?;

        let database = Handle::new(HandleKind::Database, stack.path(&[id, "Instance"])?);
        let port = props.port();
        stack.add_resource(Resource::Database(DatabaseInstance {
            handle: database.clone(),
            network: network.network.clone(),
            tier: SubnetTier::Isolated,
            subnets: network.subnets(SubnetTier::Isolated).to_vec(),
            security_group: sg_handle.clone(),
            engine: props.engine,
            engine_version: props.engine_version.clone(),
            instance_class: props.instance_class.clone(),
            allocated_storage_gib: props.allocated_storage_gib,
            port,
            credentials: secret.clone(),
            multi_az: props.multi_az,
            publicly_accessible: false,
            removal_policy: props.removal_policy,
        }))?;

        info!(
            stack = %stack.id(),
            engine = ?props.engine,
            version = %props.engine_version,
            port,
            "Declared database"
        );

        Ok(Self {
            database,
            exports: DatabaseExports {
                security_group: sg_handle,
                secret,
                port,
            },
        })
    }

    pub fn exports(&self) -> &DatabaseExports {
        &self.exports
    }
}
