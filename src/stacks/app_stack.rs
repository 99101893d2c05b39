// Copyright (c) 2025 - Cowboy AI, Inc.
//! Application layer stack
//!
//! Compute group behind the load balancer, its bootstrap script and the
//! monitoring agent document the script fetches. The database is optional
//! and can be wired in two ways:
//!
//! - [`AppStack::attach_database`]: the database is declared inside this
//!   stack, so both security groups are local and reference each other
//!   freely
//! - [`AppStack::link_database`]: the database lives in its own stack; this
//!   stack imports its handles and declares both halves of the flow itself
//!
//! Without a database nothing is linked and no error is raised.

use serde_json::Value;
use tracing::{debug, info};

use super::{NetworkStack, Stack, WebStack};
use crate::bootstrap::{BootstrapScript, FailurePolicy, Fragment};
use crate::composition::{CompositionError, CompositionUnit, Handle, HandleKind};
use crate::config::DeploymentConfig;
use crate::constructs::{
    AlbExports, AsgConstruct, AsgExports, AsgProps, AsgWiring, DatabaseExports, NetworkExports,
    RdsConstruct, RdsProps,
};
use crate::domain::{
    Direction, EgressPolicy, LogicalId, ParameterDocument, Peer, Port, Resource, RuleSpec,
    SecurityGroupRule, SecurityRule,
};
use crate::errors::InfrastructureResult;

/// Everything the app stack reads from configuration
#[derive(Debug, Clone)]
pub struct AppStackProps {
    pub compute: AsgProps,
    pub agent_parameter_path: String,
    pub agent_document: Value,
    pub extra_bootstrap: Vec<Fragment>,
    pub extra_rules: Vec<RuleSpec>,
    pub egress_policy: EgressPolicy,
    pub failure_policy: FailurePolicy,
}

impl AppStackProps {
    pub fn from_config(config: &DeploymentConfig) -> Self {
        Self {
            compute: config.compute.clone(),
            agent_parameter_path: config.agent.parameter_path.clone(),
            agent_document: config.agent.document.clone(),
            extra_bootstrap: config.extra_bootstrap.clone(),
            extra_rules: config.compute_rules.clone(),
            egress_policy: config.egress_policy(),
            failure_policy: config.failure_policy(),
        }
    }
}

pub struct AppStack {
    stack: Stack,
    unit: CompositionUnit,
    network: NetworkExports,
    asg: AsgExports,
    database: Option<DatabaseExports>,
}

impl AppStack {
    pub fn build(
        id: LogicalId,
        network: &NetworkStack,
        web: &WebStack,
        props: &AppStackProps,
    ) -> InfrastructureResult<Self> {
        let mut stack = Stack::new(id, "Application layer: auto-scaling compute");

        let parameter = Handle::new(
            HandleKind::Parameter,
            stack.path(&["CloudWatchAgentConfig"])?,
        );
        stack.add_resource(Resource::Parameter(ParameterDocument {
            handle: parameter.clone(),
            name: props.agent_parameter_path.clone(),
            value: props.agent_document.clone(),
        }))?;

        let mut bootstrap = BootstrapScript::new(props.failure_policy)
            .with(Fragment::PackageUpdate)?
            .with(Fragment::MonitoringAgent {
                parameter_path: props.agent_parameter_path.clone(),
            })?;
        for fragment in &props.extra_bootstrap {
            bootstrap.push(fragment.clone())?;
        }

        let alb: &AlbExports = web.exports();
        let asg = AsgConstruct::build(
            &mut stack,
            "AsgConstruct",
            &props.compute,
            AsgWiring {
                network: network.exports(),
                load_balancer: alb,
                bootstrap,
                bootstrap_parameters: vec![parameter.clone()],
                egress_policy: props.egress_policy,
            },
        )?;

        let compute_sg = asg.exports().security_group.clone();
        for spec in &props.extra_rules {
            let rule = spec.clone().build()?;
            let consumer = stack.name().to_string();
            stack
                .security_group_mut(&compute_sg)
                .ok_or_else(|| CompositionError::UnresolvedHandle {
                    consumer,
                    handle: compute_sg.clone(),
                })?
                .add_rule(rule)?;
        }
        stack.add_dependency(web.stack());

        let mut unit = CompositionUnit::new(stack.name());
        unit.import(network.exports().network.clone())
            .import(alb.security_group.clone())
            .import(alb.target_group.clone());
        unit.declare(parameter)
            .declare(asg.exports().security_group.clone())
            .declare(asg.exports().role.clone())
            .declare(asg.exports().compute_group.clone());

        info!(stack = %stack.id(), "Declared application stack");

        Ok(Self {
            stack,
            unit,
            network: network.exports().clone(),
            asg: asg.exports().clone(),
            database: None,
        })
    }

    /// Declare the database inside this stack and link it
    pub fn attach_database(
        &mut self,
        id: &str,
        props: &RdsProps,
        egress_policy: EgressPolicy,
    ) -> InfrastructureResult<DatabaseExports> {
        let rds = RdsConstruct::build(&mut self.stack, id, &self.network, props, egress_policy)?;
        let exports = rds.exports().clone();
        self.unit
            .declare(exports.security_group.clone())
            .declare(exports.secret.clone())
            .declare(rds.database);
        self.link_database(Some(&exports))?;
        Ok(exports)
    }

    /// Open the compute → database flow and grant the secret
    ///
    /// Adds egress on the compute group and the matching ingress on the
    /// database group, then grants the instance role read access to the
    /// credential secret. When the database group belongs to another stack
    /// the ingress half becomes a standalone rule owned by this stack.
    pub fn link_database(&mut self, database: Option<&DatabaseExports>) -> InfrastructureResult<()> {
        let Some(database) = database else {
            debug!(stack = %self.stack.id(), "No database to link");
            return Ok(());
        };

        let port = Port::tcp(database.port)?;
        let compute_sg = self.asg.security_group.clone();
        let database_sg = database.security_group.clone();
        let local_database = database_sg.owning_stack() == self.stack.name();

        if !local_database {
            self.unit
                .import(database_sg.clone())
                .import(database.secret.clone());
        }
        self.unit.link("database-egress", &compute_sg, &database_sg)?;
        self.unit.link("database-ingress", &database_sg, &compute_sg)?;
        self.unit
            .link("database-secret-read", &self.asg.role, &database.secret)?;

        self.security_group_mut(&compute_sg)?.add_egress_rule(
            Peer::group(database_sg.clone()),
            port,
            "Allow connection to the database",
        )?;

        if local_database {
            self.security_group_mut(&database_sg)?.add_ingress_rule(
                Peer::group(compute_sg.clone()),
                port,
                "Allow connection from application instances",
            )?;
        } else {
            let rule = Handle::new(
                HandleKind::SecurityGroupRule,
                self.stack.path(&["AsgConstruct", "DatabaseIngressFromApp"])?,
            );
            self.stack
                .add_resource(Resource::SecurityGroupRule(SecurityGroupRule {
                    handle: rule,
                    group: database_sg.clone(),
                    rule: SecurityRule {
                        direction: Direction::Ingress,
                        peer: Peer::group(compute_sg.clone()),
                        port,
                        description: "Allow connection from application instances".to_string(),
                    },
                }))?;
        }

        let role = self.asg.role.clone();
        match self.stack.resource_mut(&role) {
            Some(Resource::Role(role)) => role.grant_secret_read(database.secret.clone()),
            _ => {
                return Err(CompositionError::UnresolvedHandle {
                    consumer: self.stack.name().to_string(),
                    handle: role,
                }
                .into())
            }
        }

        info!(
            stack = %self.stack.id(),
            database = %database_sg,
            port = database.port,
            local = local_database,
            "Linked database"
        );
        self.database = Some(database.clone());
        Ok(())
    }

    fn security_group_mut(
        &mut self,
        handle: &Handle,
    ) -> Result<&mut crate::domain::SecurityGroup, CompositionError> {
        let consumer = self.stack.name().to_string();
        self.stack
            .security_group_mut(handle)
            .ok_or_else(|| CompositionError::UnresolvedHandle {
                consumer,
                handle: handle.clone(),
            })
    }

    pub fn exports(&self) -> &AsgExports {
        &self.asg
    }

    pub fn database(&self) -> Option<&DatabaseExports> {
        self.database.as_ref()
    }

    pub fn unit(&self) -> &CompositionUnit {
        &self.unit
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        let mut stack = self.stack;
        stack.add_links(self.unit.links().iter().cloned());
        stack
    }
}
