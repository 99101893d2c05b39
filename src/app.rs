// Copyright (c) 2025 - Cowboy AI, Inc.
//! Composition layer
//!
//! Builds the stacks in dependency order, plans their materialization and
//! validates every cross-stack invariant before anything is emitted.
//!
//! ```text
//! NetworkStack ──> WebStack ──────────────┐
//!      │                                  ▼
//!      └────────> (DatabaseStack) ──> AppStack
//! ```

use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::assembly::{Assembly, StackTemplate};
use crate::composition::{CompositionError, DependencyGraph, Handle, MaterializationPlan};
use crate::config::{ConfigVersion, DatabaseLayout, DeploymentConfig};
use crate::domain::invariants::{
    validate_compute_group, validate_database, validate_isolated_routes, validate_load_balancer,
    validate_subnets,
};
use crate::domain::security_group::{ensure_known_peers, unmatched_flows};
use crate::domain::{
    LogicalId, NetworkLayout, Resource, SecurityGroup, SecurityRuleError, ValidationError,
};
use crate::errors::InfrastructureResult;
use crate::stacks::{AppStack, AppStackProps, DatabaseStack, NetworkStack, Stack, WebStack};

/// The full set of stacks of one deployment
#[derive(Debug, Clone)]
pub struct InfrastructureApp {
    config_version: ConfigVersion,
    stacks: Vec<Stack>,
}

impl InfrastructureApp {
    /// Empty app; stacks are added with [`InfrastructureApp::add_stack`]
    pub fn new(config_version: ConfigVersion) -> Self {
        Self {
            config_version,
            stacks: Vec::new(),
        }
    }

    /// Build the network, web, app and optional database stacks
    pub fn compose(config: &DeploymentConfig) -> InfrastructureResult<Self> {
        config.validate()?;
        let names = &config.stack_names;
        let egress_policy = config.egress_policy();

        let network = NetworkStack::build(
            LogicalId::new(names.network.as_str())?,
            &config.network,
            &config.availability_zones,
        )?;
        let web = WebStack::build(
            LogicalId::new(names.web.as_str())?,
            &network,
            &config.web,
            egress_policy,
        )?;
        let mut app = AppStack::build(
            LogicalId::new(names.app.as_str())?,
            &network,
            &web,
            &AppStackProps::from_config(config),
        )?;

        let database = match config.database_layout {
            DatabaseLayout::None => {
                app.link_database(None)?;
                None
            }
            DatabaseLayout::Merged => {
                app.attach_database("RDSInstance", &config.database, egress_policy)?;
                None
            }
            DatabaseLayout::Linked => {
                let database = DatabaseStack::build(
                    LogicalId::new(names.database.as_str())?,
                    &network,
                    &config.database,
                    egress_policy,
                )?;
                app.link_database(Some(database.exports()))?;
                Some(database)
            }
        };

        let mut composed = Self::new(config.version);
        composed.add_stack(network.into_stack())?;
        composed.add_stack(web.into_stack())?;
        if let Some(database) = database {
            composed.add_stack(database.into_stack())?;
        }
        composed.add_stack(app.into_stack())?;

        info!(
            version = ?config.version,
            layout = ?config.database_layout,
            egress = ?egress_policy,
            stacks = composed.stacks.len(),
            "Composed infrastructure"
        );
        Ok(composed)
    }

    pub fn add_stack(&mut self, stack: Stack) -> Result<(), CompositionError> {
        if self.stack(stack.name()).is_some() {
            return Err(CompositionError::DuplicateComponent(stack.name().to_string()));
        }
        self.stacks.push(stack);
        Ok(())
    }

    pub fn config_version(&self) -> ConfigVersion {
        self.config_version
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    /// Stack-level dependency graph
    pub fn graph(&self) -> Result<DependencyGraph, CompositionError> {
        let mut graph = DependencyGraph::new();
        for stack in &self.stacks {
            graph.add_component(stack.component())?;
        }
        for stack in &self.stacks {
            for producer in stack.dependencies() {
                graph.add_dependency(stack.name(), producer)?;
            }
        }
        Ok(graph)
    }

    /// Stack-level materialization plan
    pub fn plan(&self) -> Result<MaterializationPlan, CompositionError> {
        self.graph()?.plan()
    }

    /// Security groups as the provider will see them, with standalone
    /// rules folded into the group they target
    pub fn effective_security_groups(&self) -> Result<Vec<SecurityGroup>, SecurityRuleError> {
        let mut groups: Vec<SecurityGroup> = self
            .stacks
            .iter()
            .flat_map(Stack::security_groups)
            .cloned()
            .collect();

        let standalone = self.stacks.iter().flat_map(Stack::resources).filter_map(|r| match r {
            Resource::SecurityGroupRule(rule) => Some(rule),
            _ => None,
        });
        for rule in standalone {
            let group = groups
                .iter_mut()
                .find(|g| g.handle == rule.group)
                .ok_or_else(|| SecurityRuleError::UnknownPeerGroup {
                    group: rule.handle.clone(),
                    peer: rule.group.clone(),
                })?;
            group.add_rule(rule.rule.clone())?;
        }

        Ok(groups)
    }

    fn layouts(&self) -> HashMap<&Handle, &NetworkLayout> {
        self.stacks
            .iter()
            .flat_map(Stack::resources)
            .filter_map(|r| match r {
                Resource::Network(network) => Some((&network.handle, &network.layout)),
                _ => None,
            })
            .collect()
    }

    /// Check every invariant that spans resources or stacks
    pub fn validate(&self) -> InfrastructureResult<()> {
        let groups = self.effective_security_groups()?;
        let group_refs: Vec<&SecurityGroup> = groups.iter().collect();
        let known: HashSet<Handle> = groups.iter().map(|g| g.handle.clone()).collect();
        ensure_known_peers(&group_refs, &known)?;

        let unmatched = unmatched_flows(&group_refs);
        if !unmatched.is_empty() {
            for flow in &unmatched {
                warn!(%flow, "Half-declared security group flow");
            }
            let flows: Vec<String> = unmatched.iter().map(ToString::to_string).collect();
            return Err(ValidationError::HalfDeclaredFlow(flows.join("; ")).into());
        }

        let layouts = self.layouts();
        for layout in layouts.values() {
            validate_isolated_routes(layout)?;
            layout.verify()?;
        }

        for stack in &self.stacks {
            for resource in stack.resources() {
                let (network, tier, subnets) = match resource {
                    Resource::Database(database) => {
                        validate_database(database)?;
                        (&database.network, database.tier, &database.subnets)
                    }
                    Resource::ComputeGroup(group) => {
                        validate_compute_group(group)?;
                        (&group.network, group.tier, &group.subnets)
                    }
                    Resource::LoadBalancer(balancer) => {
                        validate_load_balancer(balancer)?;
                        (&balancer.network, balancer.tier, &balancer.subnets)
                    }
                    _ => continue,
                };

                let layout = layouts.get(network).ok_or_else(|| {
                    CompositionError::UnresolvedHandle {
                        consumer: resource.handle().to_string(),
                        handle: network.clone(),
                    }
                })?;
                validate_subnets(&resource.handle().to_string(), tier, subnets, layout)?;
            }
        }

        Ok(())
    }

    /// Validate, plan and render the assembly
    pub fn synth(&self) -> InfrastructureResult<Assembly> {
        self.validate()?;
        let plan = self.plan()?;

        let mut templates = Vec::with_capacity(self.stacks.len());
        for name in plan.order() {
            let stack = self
                .stack(&name)
                .ok_or_else(|| CompositionError::UnknownComponent(name.clone()))?;
            templates.push(StackTemplate::render(stack, &plan)?);
        }

        let assembly = Assembly::new(self.config_version, templates, plan);
        info!(
            assembly = %assembly.id,
            stacks = assembly.stacks.len(),
            stages = assembly.plan.stages().len(),
            "Synthesized assembly"
        );
        Ok(assembly)
    }
}
