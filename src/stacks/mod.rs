// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stacks
//!
//! A stack is a named, independently deployable slice of the resource
//! graph. Stacks are thin: they instantiate constructs, pass handles
//! between them and record which other stacks they must follow.
//!
//! Each stack is one component of the app-level dependency graph. The
//! handles it provides are the handles of its own resources; the handles
//! it requires are every foreign handle its resources reference.

pub mod app_stack;
pub mod database_stack;
pub mod network_stack;
pub mod web_stack;

pub use app_stack::{AppStack, AppStackProps};
pub use database_stack::DatabaseStack;
pub use network_stack::NetworkStack;
pub use web_stack::WebStack;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::composition::{
    Component, CompositionError, DependencyGraph, Handle, Link, MaterializationPlan,
    ProvidesHandles,
};
use crate::domain::{ConstructPath, LogicalId, LogicalIdError, Resource, SecurityGroup};

/// Exported stack value, readable by other stacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub name: String,
    pub export_name: String,
    pub value: Handle,
}

/// Named deployable unit of resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    id: LogicalId,
    description: String,
    resources: Vec<Resource>,
    outputs: Vec<StackOutput>,
    dependencies: Vec<String>,
    links: Vec<Link>,
}

impl Stack {
    pub fn new(id: LogicalId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            resources: Vec::new(),
            outputs: Vec::new(),
            dependencies: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn id(&self) -> &LogicalId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn root(&self) -> ConstructPath {
        ConstructPath::root(&self.id)
    }

    /// Path of a construct nested below the stack root
    pub fn path(&self, segments: &[&str]) -> Result<ConstructPath, LogicalIdError> {
        segments
            .iter()
            .try_fold(self.root(), |path, segment| path.child(segment))
    }

    /// Add a resource owned by this stack
    ///
    /// The handle must live under this stack and its template id must be
    /// unique within the stack.
    pub fn add_resource(&mut self, resource: Resource) -> Result<Handle, CompositionError> {
        let handle = resource.handle().clone();

        if handle.owning_stack() != self.name() {
            return Err(CompositionError::ForeignHandle {
                unit: self.name().to_string(),
                owner: handle.owning_stack().to_string(),
                handle,
            });
        }

        let template_id = handle.path().template_id();
        if let Some(existing) = self
            .resources
            .iter()
            .find(|r| r.handle() == &handle || r.handle().path().template_id() == template_id)
        {
            return Err(CompositionError::DuplicateHandle {
                handle,
                first: existing.handle().to_string(),
                second: resource.handle().to_string(),
            });
        }

        debug!(
            stack = %self.id,
            resource = %handle,
            resource_type = %resource.resource_type(),
            "Added resource"
        );
        self.resources.push(resource);
        Ok(handle)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, handle: &Handle) -> Option<&Resource> {
        self.resources.iter().find(|r| r.handle() == handle)
    }

    pub fn resource_mut(&mut self, handle: &Handle) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.handle() == handle)
    }

    pub fn security_groups(&self) -> impl Iterator<Item = &SecurityGroup> {
        self.resources.iter().filter_map(Resource::as_security_group)
    }

    pub fn security_group(&self, handle: &Handle) -> Option<&SecurityGroup> {
        self.resource(handle).and_then(Resource::as_security_group)
    }

    pub fn security_group_mut(&mut self, handle: &Handle) -> Option<&mut SecurityGroup> {
        self.resource_mut(handle)
            .and_then(Resource::as_security_group_mut)
    }

    /// Export a handle under `<stack>-<name>`
    pub fn add_output(&mut self, name: impl Into<String>, value: Handle) -> &StackOutput {
        let name = name.into();
        let export_name = format!("{}-{}", self.id, name);
        self.outputs.push(StackOutput {
            name,
            export_name,
            value,
        });
        &self.outputs[self.outputs.len() - 1]
    }

    pub fn outputs(&self) -> &[StackOutput] {
        &self.outputs
    }

    /// Order this stack after `producer` even without a handle reference
    pub fn add_dependency(&mut self, producer: &Stack) {
        let name = producer.name().to_string();
        if name != self.name() && !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
    }

    /// Explicitly declared producer stacks
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Record wiring performed after both ends were declared
    pub fn add_links(&mut self, links: impl IntoIterator<Item = Link>) {
        self.links.extend(links);
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Everything a resource needs before it, including SG rule peers
    fn resource_requirements(resource: &Resource) -> Vec<Handle> {
        let mut refs = resource.references();
        if let Resource::SecurityGroup(group) = resource {
            refs.extend(group.referenced_groups().into_iter().cloned());
        }
        refs
    }

    /// Foreign handles referenced by this stack's resources
    pub fn required_handles(&self) -> Vec<Handle> {
        let mut seen = HashSet::new();
        self.resources
            .iter()
            .flat_map(Self::resource_requirements)
            .filter(|h| h.owning_stack() != self.name())
            .filter(|h| seen.insert(h.clone()))
            .collect()
    }

    /// This stack as a node of the app-level dependency graph
    pub fn component(&self) -> Component {
        Component::new(self.name())
            .provides_all(self.provided_handles())
            .requires_all(self.required_handles())
    }

    /// Materialization order of the resources inside this stack
    ///
    /// Foreign handles are materialized by earlier stacks and impose no
    /// order here. A security group's rules naming other local groups are
    /// wired by a separate step that follows every group involved, so two
    /// groups referencing each other never form a cycle.
    pub fn resource_plan(&self) -> Result<MaterializationPlan, CompositionError> {
        let mut graph = DependencyGraph::new();
        let local = |h: &Handle| h.owning_stack() == self.name();

        for resource in &self.resources {
            let component = Component::new(resource.handle().path().template_id())
                .provides(resource.handle().clone())
                .requires_all(resource.references().into_iter().filter(|h| local(h)));
            graph.add_component(component)?;

            if let Resource::SecurityGroup(group) = resource {
                let peers: Vec<Handle> = group
                    .referenced_groups()
                    .into_iter()
                    .filter(|h| local(*h) && *h != &group.handle)
                    .cloned()
                    .collect();
                if !peers.is_empty() {
                    let wiring = Component::new(Self::wiring_step(resource.handle()))
                        .requires(group.handle.clone())
                        .requires_all(peers);
                    graph.add_component(wiring)?;
                }
            }
        }

        graph.plan()
    }

    /// Name of the rule-wiring step of a security group
    pub fn wiring_step(group: &Handle) -> String {
        format!("{}Rules", group.path().template_id())
    }
}

impl ProvidesHandles for Stack {
    fn provided_handles(&self) -> Vec<Handle> {
        self.resources.iter().map(|r| r.handle().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::HandleKind;
    use crate::domain::{EgressPolicy, Peer, Port};

    fn stack(name: &str) -> Stack {
        Stack::new(LogicalId::new(name).unwrap(), "test")
    }

    fn group(stack: &Stack, name: &str, network: &Handle) -> SecurityGroup {
        SecurityGroup::new(
            Handle::new(HandleKind::SecurityGroup, stack.path(&[name]).unwrap()),
            network.clone(),
            name,
            EgressPolicy::ExplicitOnly,
        )
    }

    #[test]
    fn test_rejects_foreign_and_duplicate_resources() {
        let network_stack = stack("Network");
        let mut app = stack("App");
        let network = Handle::new(HandleKind::Network, network_stack.path(&["Vpc"]).unwrap());

        let foreign = group(&network_stack, "Sg", &network);
        assert!(matches!(
            app.add_resource(Resource::SecurityGroup(foreign)),
            Err(CompositionError::ForeignHandle { .. })
        ));

        let sg = group(&app, "Sg", &network);
        app.add_resource(Resource::SecurityGroup(sg.clone())).unwrap();
        assert!(matches!(
            app.add_resource(Resource::SecurityGroup(sg)),
            Err(CompositionError::DuplicateHandle { .. })
        ));
    }

    #[test]
    fn test_required_handles_are_foreign_only() {
        let network_stack = stack("Network");
        let mut app = stack("App");
        let network = Handle::new(HandleKind::Network, network_stack.path(&["Vpc"]).unwrap());
        let web_sg = Handle::new(
            HandleKind::SecurityGroup,
            stack("Web").path(&["AlbSg"]).unwrap(),
        );

        let mut sg = group(&app, "Sg", &network);
        sg.add_ingress_rule(Peer::group(web_sg.clone()), Port::tcp(8080).unwrap(), "from alb")
            .unwrap();
        app.add_resource(Resource::SecurityGroup(sg)).unwrap();

        assert_eq!(app.required_handles(), vec![network, web_sg]);
        assert_eq!(app.component().provides.len(), 1);
    }

    #[test]
    fn test_mutually_referencing_groups_plan_without_cycle() {
        let mut app = stack("App");
        let network = Handle::new(HandleKind::Network, stack("Network").path(&["Vpc"]).unwrap());

        let mut a = group(&app, "A", &network);
        let mut b = group(&app, "B", &network);
        let port = Port::tcp(5432).unwrap();
        a.add_egress_rule(Peer::group(b.handle.clone()), port, "a to b").unwrap();
        b.add_ingress_rule(Peer::group(a.handle.clone()), port, "b from a").unwrap();
        let (a_handle, b_handle) = (a.handle.clone(), b.handle.clone());
        app.add_resource(Resource::SecurityGroup(a)).unwrap();
        app.add_resource(Resource::SecurityGroup(b)).unwrap();

        let plan = app.resource_plan().unwrap();
        assert_eq!(plan.stages().len(), 2);
        assert!(plan.depends_on(&Stack::wiring_step(&a_handle), "A"));
        assert!(plan.depends_on(&Stack::wiring_step(&a_handle), "B"));
        assert!(plan.depends_on(&Stack::wiring_step(&b_handle), "A"));
    }

    #[test]
    fn test_explicit_dependencies() {
        let network = stack("Network");
        let mut web = stack("Web");
        web.add_dependency(&network);
        web.add_dependency(&network);
        let web_clone = web.clone();
        web.add_dependency(&web_clone);
        assert_eq!(web.dependencies(), &["Network".to_string()]);
    }

    #[test]
    fn test_output_export_name() {
        let mut web = stack("WebStack");
        let tg = Handle::new(HandleKind::TargetGroup, web.path(&["Alb", "Tg"]).unwrap());
        let output = web.add_output("AppTargetGroupArn", tg);
        assert_eq!(output.export_name, "WebStack-AppTargetGroupArn");
    }
}
