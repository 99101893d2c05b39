// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Groups and Directed Access Rules
//!
//! Network access is a directed graph: an egress rule on group A naming
//! group B says nothing about B's ingress. Both halves of a flow have to be
//! declared; [`unmatched_flows`] finds the ones that are not.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use super::network::Ipv4Cidr;
use crate::composition::Handle;

/// Security rule validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityRuleError {
    #[error("Port 0 is not a valid rule port")]
    ZeroPort,

    #[error("Invalid port range {from}-{to}")]
    InvalidPortRange { from: u16, to: u16 },

    #[error("Rule '{0}' has no peer")]
    MissingPeer(String),

    #[error("Rule on {group} references unknown security group {peer}")]
    UnknownPeerGroup { group: Handle, peer: Handle },

    #[error("{0} is not a security group handle")]
    NotASecurityGroup(Handle),
}

/// Port / protocol tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum Port {
    Tcp { port: u16 },
    TcpRange { from: u16, to: u16 },
    AllTraffic,
}

impl Port {
    /// Single TCP port
    pub fn tcp(port: u16) -> Result<Self, SecurityRuleError> {
        let port = Self::Tcp { port };
        port.validate()?;
        Ok(port)
    }

    /// Inclusive TCP port range
    pub fn tcp_range(from: u16, to: u16) -> Result<Self, SecurityRuleError> {
        let port = Self::TcpRange { from, to };
        port.validate()?;
        Ok(port)
    }

    pub fn all_traffic() -> Self {
        Self::AllTraffic
    }

    pub fn validate(&self) -> Result<(), SecurityRuleError> {
        match *self {
            Self::Tcp { port: 0 } => Err(SecurityRuleError::ZeroPort),
            Self::TcpRange { from, to } if from == 0 => {
                Err(SecurityRuleError::InvalidPortRange { from, to })
            }
            Self::TcpRange { from, to } if from > to => {
                Err(SecurityRuleError::InvalidPortRange { from, to })
            }
            _ => Ok(()),
        }
    }

    fn bounds(&self) -> (u16, u16) {
        match *self {
            Self::Tcp { port } => (port, port),
            Self::TcpRange { from, to } => (from, to),
            Self::AllTraffic => (0, u16::MAX),
        }
    }

    /// Whether every port in `other` is also in `self`
    pub fn covers(&self, other: &Port) -> bool {
        if matches!(self, Self::AllTraffic) {
            return true;
        }
        if matches!(other, Self::AllTraffic) {
            return false;
        }
        let (lo, hi) = self.bounds();
        let (other_lo, other_hi) = other.bounds();
        lo <= other_lo && other_hi <= hi
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { port } => write!(f, "tcp/{}", port),
            Self::TcpRange { from, to } => write!(f, "tcp/{}-{}", from, to),
            Self::AllTraffic => write!(f, "all"),
        }
    }
}

/// The other side of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "peer", rename_all = "snake_case")]
pub enum Peer {
    AnyIpv4,
    Cidr { cidr: Ipv4Cidr },
    SecurityGroup { group: Handle },
}

impl Peer {
    pub fn cidr(cidr: Ipv4Cidr) -> Self {
        if cidr.is_any() {
            Self::AnyIpv4
        } else {
            Self::Cidr { cidr }
        }
    }

    pub fn group(handle: Handle) -> Self {
        Self::SecurityGroup { group: handle }
    }

    /// Referenced security group, if any
    pub fn security_group(&self) -> Option<&Handle> {
        match self {
            Self::SecurityGroup { group } => Some(group),
            _ => None,
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyIpv4 => write!(f, "0.0.0.0/0"),
            Self::Cidr { cidr } => write!(f, "{}", cidr),
            Self::SecurityGroup { group } => write!(f, "{}", group),
        }
    }
}

/// Rule direction, fixed when the rule is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ingress,
    Egress,
}

/// Outbound behavior of a group without explicit egress rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EgressPolicy {
    /// Every outbound flow is allowed; explicit egress rules are redundant
    AllowAll,
    /// Only named egress paths are allowed
    #[default]
    ExplicitOnly,
}

/// A validated allow rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityRule {
    pub direction: Direction,
    #[serde(flatten)]
    pub peer: Peer,
    pub port: Port,
    pub description: String,
}

/// Unvalidated rule as it arrives from `DeploymentConfig::compute_rules`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub direction: Direction,
    #[serde(default)]
    pub peer: Option<Peer>,
    pub port: Port,
    #[serde(default)]
    pub description: String,
}

impl RuleSpec {
    /// Reject rules without a peer or with an invalid port
    pub fn build(self) -> Result<SecurityRule, SecurityRuleError> {
        let peer = self
            .peer
            .ok_or_else(|| SecurityRuleError::MissingPeer(self.description.clone()))?;
        self.port.validate()?;
        if let Some(group) = peer.security_group() {
            ensure_group_handle(group)?;
        }
        Ok(SecurityRule {
            direction: self.direction,
            peer,
            port: self.port,
            description: self.description,
        })
    }
}

fn ensure_group_handle(handle: &Handle) -> Result<(), SecurityRuleError> {
    if handle.kind() != crate::composition::HandleKind::SecurityGroup {
        return Err(SecurityRuleError::NotASecurityGroup(handle.clone()));
    }
    Ok(())
}

/// Security group attached to one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub handle: Handle,
    pub network: Handle,
    pub description: String,
    pub egress_policy: EgressPolicy,
    rules: Vec<SecurityRule>,
}

impl SecurityGroup {
    pub fn new(
        handle: Handle,
        network: Handle,
        description: impl Into<String>,
        egress_policy: EgressPolicy,
    ) -> Self {
        Self {
            handle,
            network,
            description: description.into(),
            egress_policy,
            rules: Vec::new(),
        }
    }

    /// Allow inbound traffic from `peer`
    pub fn add_ingress_rule(
        &mut self,
        peer: Peer,
        port: Port,
        description: impl Into<String>,
    ) -> Result<(), SecurityRuleError> {
        self.add_rule(SecurityRule {
            direction: Direction::Ingress,
            peer,
            port,
            description: description.into(),
        })
    }

    /// Allow outbound traffic to `peer`
    ///
    /// Under [`EgressPolicy::AllowAll`] the rule is validated but not
    /// recorded.
    pub fn add_egress_rule(
        &mut self,
        peer: Peer,
        port: Port,
        description: impl Into<String>,
    ) -> Result<(), SecurityRuleError> {
        self.add_rule(SecurityRule {
            direction: Direction::Egress,
            peer,
            port,
            description: description.into(),
        })
    }

    /// Add an already-built rule; identical rules are recorded once
    pub fn add_rule(&mut self, rule: SecurityRule) -> Result<(), SecurityRuleError> {
        rule.port.validate()?;
        if let Some(group) = rule.peer.security_group() {
            ensure_group_handle(group)?;
        }

        if rule.direction == Direction::Egress && self.egress_policy == EgressPolicy::AllowAll {
            warn!(
                group = %self.handle,
                peer = %rule.peer,
                port = %rule.port,
                "Ignoring egress rule since the group allows all outbound traffic"
            );
            return Ok(());
        }

        if self.rules.iter().any(|existing| {
            existing.direction == rule.direction
                && existing.peer == rule.peer
                && existing.port == rule.port
        }) {
            debug!(group = %self.handle, peer = %rule.peer, "Duplicate rule skipped");
            return Ok(());
        }

        self.rules.push(rule);
        Ok(())
    }

    /// Explicit rules in declaration order
    pub fn rules(&self) -> &[SecurityRule] {
        &self.rules
    }

    pub fn ingress_rules(&self) -> impl Iterator<Item = &SecurityRule> {
        self.rules.iter().filter(|r| r.direction == Direction::Ingress)
    }

    pub fn egress_rules(&self) -> impl Iterator<Item = &SecurityRule> {
        self.rules.iter().filter(|r| r.direction == Direction::Egress)
    }

    /// Egress as the provider will see it
    pub fn effective_egress(&self) -> Vec<SecurityRule> {
        match self.egress_policy {
            EgressPolicy::AllowAll => vec![SecurityRule {
                direction: Direction::Egress,
                peer: Peer::AnyIpv4,
                port: Port::AllTraffic,
                description: "Allow all outbound traffic by default".to_string(),
            }],
            EgressPolicy::ExplicitOnly => self.egress_rules().cloned().collect(),
        }
    }

    /// Whether this group lets traffic out to `peer` on `port`
    pub fn allows_egress_to(&self, peer: &Handle, port: &Port) -> bool {
        self.egress_policy == EgressPolicy::AllowAll
            || self
                .egress_rules()
                .any(|r| r.peer.security_group() == Some(peer) && r.port.covers(port))
    }

    /// Whether this group lets traffic in from `peer` on `port`
    pub fn allows_ingress_from(&self, peer: &Handle, port: &Port) -> bool {
        self.ingress_rules()
            .any(|r| r.peer.security_group() == Some(peer) && r.port.covers(port))
    }

    /// Security groups named as peers by this group's rules
    pub fn referenced_groups(&self) -> Vec<&Handle> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .filter_map(|r| r.peer.security_group())
            .filter(|h| seen.insert(*h))
            .collect()
    }
}

/// A rule on a group owned elsewhere
///
/// Used when the rule is declared by the consumer of a group rather than
/// by its owner, so the owner does not need to know about the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub handle: Handle,
    pub group: Handle,
    pub rule: SecurityRule,
}

/// Half-declared SG-to-SG flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedFlow {
    pub from: Handle,
    pub to: Handle,
    pub port: Port,
    /// The half that is present
    pub declared: Direction,
}

impl fmt::Display for UnmatchedFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing = match self.declared {
            Direction::Egress => "ingress",
            Direction::Ingress => "egress",
        };
        write!(
            f,
            "{} -> {} on {} is missing its {} half",
            self.from, self.to, self.port, missing
        )
    }
}

/// Find every SG-to-SG flow declared on one side only
///
/// Flows whose peer group is not in `groups` are not judged here; use
/// [`ensure_known_peers`] for those.
pub fn unmatched_flows(groups: &[&SecurityGroup]) -> Vec<UnmatchedFlow> {
    let find = |handle: &Handle| groups.iter().find(|g| &g.handle == handle);
    let mut unmatched = Vec::new();

    for group in groups {
        for rule in group.rules() {
            let Some(peer_handle) = rule.peer.security_group() else {
                continue;
            };
            let Some(peer) = find(peer_handle) else {
                continue;
            };

            match rule.direction {
                Direction::Egress => {
                    if !peer.allows_ingress_from(&group.handle, &rule.port) {
                        unmatched.push(UnmatchedFlow {
                            from: group.handle.clone(),
                            to: peer.handle.clone(),
                            port: rule.port,
                            declared: Direction::Egress,
                        });
                    }
                }
                Direction::Ingress => {
                    if !peer.allows_egress_to(&group.handle, &rule.port) {
                        unmatched.push(UnmatchedFlow {
                            from: peer.handle.clone(),
                            to: group.handle.clone(),
                            port: rule.port,
                            declared: Direction::Ingress,
                        });
                    }
                }
            }
        }
    }

    unmatched
}

/// Every SG peer must be one of the known groups
pub fn ensure_known_peers(
    groups: &[&SecurityGroup],
    known: &HashSet<Handle>,
) -> Result<(), SecurityRuleError> {
    for group in groups {
        for peer in group.referenced_groups() {
            if !known.contains(peer) {
                return Err(SecurityRuleError::UnknownPeerGroup {
                    group: group.handle.clone(),
                    peer: peer.clone(),
                });
            }
        }
    }
    Ok(())
}
