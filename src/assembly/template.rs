// Copyright (c) 2025 - Cowboy AI, Inc.
//! Per-stack template rendering
//!
//! Resources appear in the order the stack's own resource plan gives, each
//! with the local logical ids it depends on.

use serde::{Deserialize, Serialize};

use crate::composition::{CompositionError, Handle, Link, MaterializationPlan};
use crate::domain::{RemovalPolicy, Resource, ResourceCategory};
use crate::stacks::{Stack, StackOutput};

/// One resource entry of a stack template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateResource {
    pub logical_id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub category: ResourceCategory,
    pub removal_policy: RemovalPolicy,
    pub stage: usize,
    pub depends_on: Vec<String>,
    /// Rendered bootstrap script of compute groups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    pub properties: Resource,
}

/// Rendered stack, ready for the provisioning engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTemplate {
    pub stack: String,
    pub description: String,
    /// Stacks that must be materialized first
    pub depends_on: Vec<String>,
    /// Foreign handles this stack reads
    pub imports: Vec<Handle>,
    pub resources: Vec<TemplateResource>,
    /// Security-group rule wiring steps, in order
    pub wiring: Vec<String>,
    pub links: Vec<Link>,
    pub outputs: Vec<StackOutput>,
}

impl StackTemplate {
    /// Render a stack against the app-level plan
    pub fn render(stack: &Stack, plan: &MaterializationPlan) -> Result<Self, CompositionError> {
        let resource_plan = stack.resource_plan()?;
        let mut resources = Vec::with_capacity(stack.resources().len());
        let mut wiring = Vec::new();

        for step in resource_plan.order() {
            let stage = resource_plan.stage_of(&step).unwrap_or_default();
            let depends_on: Vec<String> = resource_plan
                .producers_of(&step)
                .into_iter()
                .map(str::to_string)
                .collect();

            let Some(resource) = stack
                .resources()
                .iter()
                .find(|r| r.handle().path().template_id() == step)
            else {
                wiring.push(step);
                continue;
            };

            let resource_type = resource.resource_type();
            let user_data = match resource {
                Resource::ComputeGroup(group) => Some(group.bootstrap.render()),
                _ => None,
            };

            resources.push(TemplateResource {
                logical_id: step,
                resource_type: resource_type.provider_type().to_string(),
                category: resource_type.category(),
                removal_policy: resource.removal_policy(),
                stage,
                depends_on,
                user_data,
                properties: resource.clone(),
            });
        }

        let mut depends_on: Vec<String> = plan
            .producers_of(stack.name())
            .into_iter()
            .map(str::to_string)
            .collect();
        for explicit in stack.dependencies() {
            if !depends_on.contains(explicit) {
                depends_on.push(explicit.clone());
            }
        }

        Ok(Self {
            stack: stack.name().to_string(),
            description: stack.description().to_string(),
            depends_on,
            imports: stack.required_handles(),
            resources,
            wiring,
            links: stack.links().to_vec(),
            outputs: stack.outputs().to_vec(),
        })
    }

    pub fn resource(&self, logical_id: &str) -> Option<&TemplateResource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    /// Resources whose teardown keeps data
    pub fn retained(&self) -> impl Iterator<Item = &TemplateResource> {
        self.resources
            .iter()
            .filter(|r| r.removal_policy != RemovalPolicy::Destroy)
    }

    pub fn file_name(&self) -> String {
        format!("{}.template.json", self.stack)
    }
}
