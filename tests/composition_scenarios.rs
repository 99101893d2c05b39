// Copyright (c) 2025 - Cowboy AI, Inc.
//! Composition Scenarios
//!
//! End-to-end checks of the composed stacks: network layout, security
//! group wiring, stack ordering and the ways the database can be attached.

mod fixtures;

use fixtures::*;
use pretty_assertions::assert_eq;
use tiered_infrastructure::config::{ConfigVersion, DatabaseLayout};
use tiered_infrastructure::constructs::{AlbProps, RdsProps, VpcProps};
use tiered_infrastructure::domain::{
    Direction, EgressPolicy, Ipv4Cidr, LogicalId, Peer, Port, Resource, RouteTarget, RuleSpec,
    SecurityRuleError, SubnetConfiguration, SubnetTier, ValidationError,
};
use tiered_infrastructure::stacks::{AppStackProps, DatabaseStack, NetworkStack, WebStack};
use tiered_infrastructure::{
    AppStack, CompositionError, DeploymentConfig, InfrastructureApp, InfrastructureError,
};

// ============================================================================
// Network tiers
// ============================================================================

#[test]
fn test_network_has_three_tiers_across_two_zones() {
    let app = compose(DatabaseLayout::Merged);
    let layout = &network(stack(&app, NETWORK_STACK)).layout;

    assert_eq!(layout.subnets.len(), 6);
    assert_eq!(layout.nat_gateways.len(), 1);
    assert_eq!(layout.availability_zones, vec!["us-east-1a", "us-east-1b"]);

    for tier in [SubnetTier::Public, SubnetTier::PrivateWithEgress, SubnetTier::Isolated] {
        assert_eq!(layout.subnets_in(tier).count(), 2, "tier {}", tier);
    }

    for subnet in layout.subnets_in(SubnetTier::Isolated) {
        assert!(subnet.routes.is_empty(), "{} has routes", subnet.name);
    }
    for subnet in layout.subnets_in(SubnetTier::Public) {
        assert!(subnet
            .routes
            .iter()
            .any(|r| r.target == RouteTarget::InternetGateway));
    }
    let nat = &layout.nat_gateways[0].name;
    for subnet in layout.subnets_in(SubnetTier::PrivateWithEgress) {
        assert!(subnet
            .routes
            .iter()
            .any(|r| r.target == RouteTarget::NatGateway { name: nat.clone() }));
    }
}

#[test]
fn test_subnets_do_not_overlap() {
    let app = compose(DatabaseLayout::None);
    let layout = &network(stack(&app, NETWORK_STACK)).layout;

    for (i, a) in layout.subnets.iter().enumerate() {
        assert!(layout.cidr.contains(&a.cidr));
        for b in layout.subnets.iter().skip(i + 1) {
            assert!(!a.cidr.overlaps(&b.cidr), "{} overlaps {}", a.name, b.name);
        }
    }
}

// ============================================================================
// Security group wiring
// ============================================================================

#[test]
fn test_compute_rules_with_database() {
    let app = compose(DatabaseLayout::Merged);
    let app_stack = stack(&app, APP_STACK);
    let sg = compute_security_group(app_stack);
    let db_sg = database_security_group(&app);

    let directions: Vec<Direction> = sg.rules().iter().map(|r| r.direction).collect();
    assert_eq!(
        directions,
        vec![Direction::Ingress, Direction::Egress, Direction::Egress]
    );
    assert!(sg.allows_egress_to(&db_sg, &Port::tcp(5432).unwrap()));
    assert!(sg
        .egress_rules()
        .any(|r| r.peer == Peer::AnyIpv4 && r.port == Port::tcp(443).unwrap()));

    let db_group = app_stack.security_group(&db_sg).unwrap();
    assert!(db_group.allows_ingress_from(&sg.handle, &Port::tcp(5432).unwrap()));

    assert_eq!(role(app_stack).secret_reads.len(), 1);
}

#[test]
fn test_database_omitted_leaves_no_grant() {
    let app = compose(DatabaseLayout::None);
    let app_stack = stack(&app, APP_STACK);

    assert_eq!(compute_security_group(app_stack).rules().len(), 2);
    assert!(role(app_stack).secret_reads.is_empty());
    assert!(app_stack.links().is_empty());
    assert!(app
        .stacks()
        .iter()
        .flat_map(|s| s.resources())
        .all(|r| !matches!(r, Resource::Database(_))));
    assert!(app.synth().is_ok());
}

#[test]
fn test_load_balancer_reaches_compute_on_target_port() {
    let app = compose(DatabaseLayout::Merged);
    let groups = app.effective_security_groups().unwrap();
    let compute = compute_security_group(stack(&app, APP_STACK));
    let target = Port::tcp(AlbProps::default().target_port).unwrap();

    let alb = groups
        .iter()
        .find(|g| g.handle.owning_stack() == WEB_STACK)
        .unwrap();
    assert!(alb.allows_egress_to(&compute.handle, &target));
    assert!(compute.allows_ingress_from(&alb.handle, &target));
    assert!(alb
        .ingress_rules()
        .any(|r| r.peer == Peer::AnyIpv4 && r.port == Port::tcp(80).unwrap()));
}

#[test]
fn test_v1_allows_all_egress() {
    let app = InfrastructureApp::compose(&config(ConfigVersion::V1, DatabaseLayout::Merged))
        .unwrap();
    let app_stack = stack(&app, APP_STACK);
    let sg = compute_security_group(app_stack);

    assert_eq!(sg.egress_policy, EgressPolicy::AllowAll);
    assert_eq!(sg.egress_rules().count(), 0);
    assert_eq!(sg.effective_egress().len(), 1);
    assert_eq!(sg.effective_egress()[0].port, Port::AllTraffic);
    assert!(app_stack
        .resources()
        .iter()
        .all(|r| !matches!(r, Resource::SecurityGroupRule(_))));
    assert!(app.validate().is_ok());
}

#[test]
fn test_malformed_rules_are_rejected() {
    let spec = RuleSpec {
        direction: Direction::Ingress,
        peer: None,
        port: Port::tcp(22).unwrap(),
        description: "ssh".to_string(),
    };
    assert_eq!(
        spec.build(),
        Err(SecurityRuleError::MissingPeer("ssh".to_string()))
    );

    assert_eq!(
        Port::tcp_range(9000, 8000),
        Err(SecurityRuleError::InvalidPortRange { from: 9000, to: 8000 })
    );
    assert_eq!(Port::tcp(0), Err(SecurityRuleError::ZeroPort));
}

fn operator_ssh(peer: Option<Peer>) -> RuleSpec {
    RuleSpec {
        direction: Direction::Ingress,
        peer,
        port: Port::tcp(22).unwrap(),
        description: "Operator SSH".to_string(),
    }
}

#[test]
fn test_configured_compute_rule_reaches_group() {
    let bastion = Ipv4Cidr::new("10.20.0.0/24").unwrap();
    let mut deployment = config(ConfigVersion::V2, DatabaseLayout::Merged);
    deployment.compute_rules = vec![operator_ssh(Some(Peer::cidr(bastion)))];

    let app = InfrastructureApp::compose(&deployment).unwrap();
    let sg = compute_security_group(stack(&app, APP_STACK));
    assert!(sg
        .ingress_rules()
        .any(|r| r.peer == Peer::cidr(bastion) && r.port == Port::tcp(22).unwrap()));
    assert!(app.synth().is_ok());
}

#[test]
fn test_configured_rule_without_peer_stops_composition() {
    let mut deployment = config(ConfigVersion::V2, DatabaseLayout::Merged);
    deployment.compute_rules = vec![operator_ssh(None)];

    assert!(matches!(
        InfrastructureApp::compose(&deployment),
        Err(InfrastructureError::Configuration(_))
    ));
}

// ============================================================================
// Placement
// ============================================================================

#[test]
fn test_database_without_isolated_tier_fails_synth() {
    let mut deployment = config(ConfigVersion::V2, DatabaseLayout::Merged);
    deployment.network.subnets = vec![
        SubnetConfiguration::new("Public", SubnetTier::Public, 22),
        SubnetConfiguration::new("Compute", SubnetTier::PrivateWithEgress, 20),
    ];

    let app = InfrastructureApp::compose(&deployment).unwrap();
    assert!(matches!(
        app.synth(),
        Err(InfrastructureError::Validation(ValidationError::EmptyPlacement {
            tier: SubnetTier::Isolated,
            ..
        }))
    ));
}

#[test]
fn test_compute_without_egress_tier_fails_synth() {
    let mut deployment = config(ConfigVersion::V2, DatabaseLayout::None);
    deployment.network.nat_gateways = 0;
    deployment.network.subnets = vec![
        SubnetConfiguration::new("Public", SubnetTier::Public, 22),
        SubnetConfiguration::new("RDS", SubnetTier::Isolated, 24),
    ];

    let app = InfrastructureApp::compose(&deployment).unwrap();
    assert!(matches!(
        app.synth(),
        Err(InfrastructureError::Validation(ValidationError::EmptyPlacement {
            tier: SubnetTier::PrivateWithEgress,
            ..
        }))
    ));
}

// ============================================================================
// Stack ordering and the database reference
// ============================================================================

#[test]
fn test_linked_plan_orders_stacks() {
    let app = compose(DatabaseLayout::Linked);
    let plan = app.plan().unwrap();

    assert_eq!(
        plan.stages(),
        &[
            vec![NETWORK_STACK.to_string()],
            vec![WEB_STACK.to_string(), DATABASE_STACK.to_string()],
            vec![APP_STACK.to_string()],
        ]
    );
    assert!(plan.depends_on(APP_STACK, DATABASE_STACK));
    assert!(!plan.depends_on(DATABASE_STACK, APP_STACK));
    assert!(plan.verify_order(&plan.order()).is_ok());
}

#[test]
fn test_merged_and_linked_both_synthesize() {
    for layout in [DatabaseLayout::Merged, DatabaseLayout::Linked] {
        let app = compose(layout);
        let assembly = app.synth().unwrap();
        let app_template = assembly.stack(APP_STACK).unwrap();
        assert!(app_template.resource("AsgConstructAutoScalingGroup").is_some());
        assert_eq!(app_template.links.len(), 3, "layout {:?}", layout);
    }
}

#[test]
fn test_linked_database_stack_never_imports_app() {
    let app = compose(DatabaseLayout::Linked);
    let database = stack(&app, DATABASE_STACK);

    assert!(database
        .required_handles()
        .iter()
        .all(|h| h.owning_stack() == NETWORK_STACK));
    assert!(stack(&app, APP_STACK)
        .resources()
        .iter()
        .any(|r| matches!(r, Resource::SecurityGroupRule(rule)
            if rule.rule.direction == Direction::Ingress
                && rule.group.owning_stack() == DATABASE_STACK)));
}

/// Stacks built with default props, the database in its own stack but not linked
fn unlinked_stacks() -> (NetworkStack, WebStack, AppStack, DatabaseStack) {
    let config = DeploymentConfig::default();
    let network = NetworkStack::build(
        LogicalId::new(NETWORK_STACK).unwrap(),
        &VpcProps::default(),
        &config.availability_zones,
    )
    .unwrap();
    let web = WebStack::build(
        LogicalId::new(WEB_STACK).unwrap(),
        &network,
        &AlbProps::default(),
        config.egress_policy(),
    )
    .unwrap();
    let app = AppStack::build(
        LogicalId::new(APP_STACK).unwrap(),
        &network,
        &web,
        &AppStackProps::from_config(&config),
    )
    .unwrap();
    let database = DatabaseStack::build(
        LogicalId::new(DATABASE_STACK).unwrap(),
        &network,
        &RdsProps::default(),
        config.egress_policy(),
    )
    .unwrap();
    (network, web, app, database)
}

#[test]
fn test_naive_mutual_reference_is_a_cycle() {
    let (network, web, app, database) = unlinked_stacks();
    let compute_sg = app.exports().security_group.clone();
    let db_sg = database.exports().security_group.clone();
    let port = Port::tcp(5432).unwrap();

    let mut app_stack = app.into_stack();
    app_stack
        .security_group_mut(&compute_sg)
        .unwrap()
        .add_egress_rule(Peer::group(db_sg.clone()), port, "to database")
        .unwrap();
    let mut db_stack = database.into_stack();
    db_stack
        .security_group_mut(&db_sg)
        .unwrap()
        .add_ingress_rule(Peer::group(compute_sg), port, "from app")
        .unwrap();

    let mut composed = InfrastructureApp::new(ConfigVersion::V2);
    composed.add_stack(network.into_stack()).unwrap();
    composed.add_stack(web.into_stack()).unwrap();
    composed.add_stack(db_stack).unwrap();
    composed.add_stack(app_stack).unwrap();

    match composed.plan() {
        Err(CompositionError::Cycle { components }) => {
            assert!(components.contains(&APP_STACK.to_string()));
            assert!(components.contains(&DATABASE_STACK.to_string()));
        }
        other => panic!("expected cycle, got {:?}", other),
    }
    assert!(matches!(
        composed.synth(),
        Err(InfrastructureError::Composition(CompositionError::Cycle { .. }))
    ));
}

#[test]
fn test_half_declared_flow_is_fatal() {
    let (network, web, app, database) = unlinked_stacks();
    let compute_sg = app.exports().security_group.clone();
    let db_sg = database.exports().security_group.clone();

    let mut app_stack = app.into_stack();
    app_stack
        .security_group_mut(&compute_sg)
        .unwrap()
        .add_egress_rule(Peer::group(db_sg), Port::tcp(5432).unwrap(), "to database")
        .unwrap();

    let mut composed = InfrastructureApp::new(ConfigVersion::V2);
    composed.add_stack(network.into_stack()).unwrap();
    composed.add_stack(web.into_stack()).unwrap();
    composed.add_stack(database.into_stack()).unwrap();
    composed.add_stack(app_stack).unwrap();

    assert!(composed.plan().is_ok());
    assert!(matches!(
        composed.validate(),
        Err(InfrastructureError::Validation(ValidationError::HalfDeclaredFlow(_)))
    ));
}

#[test]
fn test_missing_producer_stack_is_unresolved() {
    let (_, web, app, _) = unlinked_stacks();

    let mut composed = InfrastructureApp::new(ConfigVersion::V2);
    composed.add_stack(web.into_stack()).unwrap();
    composed.add_stack(app.into_stack()).unwrap();

    assert!(matches!(
        composed.plan(),
        Err(CompositionError::UnresolvedHandle { .. }) | Err(CompositionError::UnknownComponent(_))
    ));
}

// ============================================================================
// Bootstrap and removal policy
// ============================================================================

#[test]
fn test_bootstrap_reads_agent_parameter() {
    let app = compose(DatabaseLayout::Merged);
    let app_stack = stack(&app, APP_STACK);
    let group = compute_group(app_stack);

    assert_eq!(group.bootstrap.parameter_paths(), vec![AGENT_PARAMETER_PATH]);
    let script = group.bootstrap.render();
    assert!(script.starts_with("#!/bin/bash\n"));
    assert!(script.contains("set -euo pipefail"));
    assert!(script.contains(AGENT_PARAMETER_PATH));

    let plan = app_stack.resource_plan().unwrap();
    assert!(plan.depends_on("AsgConstructAutoScalingGroup", "CloudWatchAgentConfig"));
}

#[test]
fn test_database_snapshots_on_removal() {
    let app = compose(DatabaseLayout::Merged);
    let assembly = app.synth().unwrap();
    let template = assembly.stack(APP_STACK).unwrap();

    let retained: Vec<&str> = template
        .retained()
        .map(|r| r.logical_id.as_str())
        .collect();
    assert_eq!(retained, vec!["RDSInstanceInstance"]);
}
