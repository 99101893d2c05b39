// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Domain Invariants
//!
//! Checks run over resource descriptions before a plan is emitted. All
//! functions are pure and return the first violation found.
//!
//! # Invariant Categories
//!
//! 1. **Placement**: resources sit in the tier their role requires
//! 2. **Reachability**: isolated subnets never gain a route
//! 3. **Sizing**: capacity bounds and scaling thresholds are sane

use super::network::{NetworkLayout, SubnetTier};
use super::resources::{ComputeGroup, DatabaseInstance, LoadBalancer};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Resource placed in the wrong subnet tier
    #[error("{resource} must be placed in the {required} tier, found {actual}")]
    WrongTier {
        resource: String,
        required: SubnetTier,
        actual: SubnetTier,
    },

    /// Database exposed publicly
    #[error("Database {0} must not be publicly accessible")]
    PubliclyAccessibleDatabase(String),

    /// Isolated subnet reachable from a gateway
    #[error("Isolated subnet {0} has a route to a gateway")]
    IsolatedRoute(String),

    /// Capacity bounds inverted or zero
    #[error("Invalid capacity for {resource}: min {min}, max {max}")]
    InvalidCapacity { resource: String, min: u32, max: u32 },

    /// Scaling target outside 1-100
    #[error("Invalid scaling target {target}% for {resource}")]
    InvalidScalingTarget { resource: String, target: u8 },

    /// Storage below the engine minimum
    #[error("Database {resource} storage {gib} GiB is below the 20 GiB minimum")]
    InsufficientStorage { resource: String, gib: u32 },

    /// Placement references subnets absent from the network
    #[error("{resource} references unknown subnet {subnet}")]
    UnknownSubnet { resource: String, subnet: String },

    /// Placement names no subnets at all
    #[error("{resource} is placed in no {tier} subnets")]
    EmptyPlacement { resource: String, tier: SubnetTier },

    /// Load balancer without listeners
    #[error("Load balancer {0} has no listeners")]
    NoListeners(String),

    /// SG-to-SG flow declared on one side only
    #[error("Half-declared flow: {0}")]
    HalfDeclaredFlow(String),
}

/// Smallest allocatable database storage
pub const MIN_DATABASE_STORAGE_GIB: u32 = 20;

/// Validate that isolated subnets carry no routes
///
/// # Rules
/// - Isolated subnets have an empty route table
pub fn validate_isolated_routes(layout: &NetworkLayout) -> ValidationResult {
    match layout
        .subnets_in(SubnetTier::Isolated)
        .find(|s| !s.routes.is_empty())
    {
        Some(subnet) => Err(ValidationError::IsolatedRoute(subnet.name.clone())),
        None => Ok(()),
    }
}

/// Validate a database placement and exposure
///
/// # Rules
/// - Placed in the isolated tier
/// - Never publicly accessible
/// - At least [`MIN_DATABASE_STORAGE_GIB`] of storage
pub fn validate_database(database: &DatabaseInstance) -> ValidationResult {
    let name = database.handle.to_string();

    if database.tier != SubnetTier::Isolated {
        return Err(ValidationError::WrongTier {
            resource: name,
            required: SubnetTier::Isolated,
            actual: database.tier,
        });
    }

    if database.publicly_accessible {
        return Err(ValidationError::PubliclyAccessibleDatabase(name));
    }

    if database.allocated_storage_gib < MIN_DATABASE_STORAGE_GIB {
        return Err(ValidationError::InsufficientStorage {
            resource: name,
            gib: database.allocated_storage_gib,
        });
    }

    Ok(())
}

/// Validate a compute group
///
/// # Rules
/// - Placed in the private-with-egress tier
/// - 1 ≤ min ≤ max
/// - Scaling target between 1 and 100 percent
pub fn validate_compute_group(group: &ComputeGroup) -> ValidationResult {
    let name = group.handle.to_string();

    if group.tier != SubnetTier::PrivateWithEgress {
        return Err(ValidationError::WrongTier {
            resource: name,
            required: SubnetTier::PrivateWithEgress,
            actual: group.tier,
        });
    }

    validate_capacity(&name, group.min_capacity, group.max_capacity)?;

    if group.scaling.target_percent == 0 || group.scaling.target_percent > 100 {
        return Err(ValidationError::InvalidScalingTarget {
            resource: name,
            target: group.scaling.target_percent,
        });
    }

    Ok(())
}

/// Validate a load balancer
///
/// # Rules
/// - Internet-facing balancers sit in the public tier
/// - Every listener forwards somewhere
pub fn validate_load_balancer(balancer: &LoadBalancer) -> ValidationResult {
    let name = balancer.handle.to_string();

    if balancer.internet_facing && balancer.tier != SubnetTier::Public {
        return Err(ValidationError::WrongTier {
            resource: name,
            required: SubnetTier::Public,
            actual: balancer.tier,
        });
    }

    if balancer.listeners.is_empty() {
        return Err(ValidationError::NoListeners(name));
    }

    Ok(())
}

/// Validate capacity bounds
pub fn validate_capacity(resource: &str, min: u32, max: u32) -> ValidationResult {
    if min == 0 || min > max {
        return Err(ValidationError::InvalidCapacity {
            resource: resource.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// Validate a resource's subnet placement against the layout
///
/// # Rules
/// - At least one subnet
/// - Every subnet exists in the layout
/// - Every subnet belongs to the resource's declared tier
pub fn validate_subnets(
    resource: &str,
    tier: SubnetTier,
    subnets: &[String],
    layout: &NetworkLayout,
) -> ValidationResult {
    if subnets.is_empty() {
        return Err(ValidationError::EmptyPlacement {
            resource: resource.to_string(),
            tier,
        });
    }

    for name in subnets {
        let subnet = layout
            .subnets
            .iter()
            .find(|s| &s.name == name)
            .ok_or_else(|| ValidationError::UnknownSubnet {
                resource: resource.to_string(),
                subnet: name.clone(),
            })?;
        if subnet.tier != tier {
            return Err(ValidationError::WrongTier {
                resource: resource.to_string(),
                required: tier,
                actual: subnet.tier,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Handle, HandleKind};
    use crate::domain::network::{Ipv4Cidr, NetworkSpec, RouteTarget, Route, SubnetConfiguration};
    use crate::domain::resources::{DatabaseEngine, RemovalPolicy};
    use crate::domain::{ConstructPath, LogicalId};

    fn handle(kind: HandleKind, name: &str) -> Handle {
        let root = ConstructPath::root(&LogicalId::new("TestStack").unwrap());
        Handle::new(kind, root.child(name).unwrap())
    }

    fn database() -> DatabaseInstance {
        DatabaseInstance {
            handle: handle(HandleKind::Database, "Db"),
            network: handle(HandleKind::Network, "Vpc"),
            tier: SubnetTier::Isolated,
            subnets: vec![],
            security_group: handle(HandleKind::SecurityGroup, "DbSg"),
            engine: DatabaseEngine::Postgres,
            engine_version: "16.3".to_string(),
            instance_class: "db.t4g.micro".to_string(),
            allocated_storage_gib: 20,
            port: 5432,
            credentials: handle(HandleKind::Secret, "DbSecret"),
            multi_az: false,
            publicly_accessible: false,
            removal_policy: RemovalPolicy::Snapshot,
        }
    }

    #[test]
    fn test_validate_database() {
        assert!(validate_database(&database()).is_ok());

        let mut public = database();
        public.publicly_accessible = true;
        assert!(matches!(
            validate_database(&public),
            Err(ValidationError::PubliclyAccessibleDatabase(_))
        ));

        let mut misplaced = database();
        misplaced.tier = SubnetTier::PrivateWithEgress;
        assert!(matches!(
            validate_database(&misplaced),
            Err(ValidationError::WrongTier { .. })
        ));

        let mut small = database();
        small.allocated_storage_gib = 5;
        assert!(matches!(
            validate_database(&small),
            Err(ValidationError::InsufficientStorage { gib: 5, .. })
        ));
    }

    #[test]
    fn test_validate_capacity() {
        assert!(validate_capacity("asg", 1, 2).is_ok());
        assert!(validate_capacity("asg", 0, 2).is_err());
        assert!(validate_capacity("asg", 3, 2).is_err());
    }

    #[test]
    fn test_validate_isolated_routes() {
        let spec = NetworkSpec {
            name: "vpc".to_string(),
            cidr: Ipv4Cidr::new("10.0.0.0/16").unwrap(),
            max_azs: 2,
            subnets: vec![
                SubnetConfiguration::new("Public", SubnetTier::Public, 24),
                SubnetConfiguration::new("Data", SubnetTier::Isolated, 24),
            ],
            nat_gateways: 0,
        };
        let zones = vec!["a".to_string(), "b".to_string()];
        let mut layout = spec.layout(&zones).unwrap();
        assert!(validate_isolated_routes(&layout).is_ok());

        let isolated = layout
            .subnets
            .iter_mut()
            .find(|s| s.tier == SubnetTier::Isolated)
            .unwrap();
        isolated.routes.push(Route {
            destination: Ipv4Cidr::any(),
            target: RouteTarget::InternetGateway,
        });
        assert_eq!(
            validate_isolated_routes(&layout),
            Err(ValidationError::IsolatedRoute("DataSubnet1".to_string()))
        );
    }

    #[test]
    fn test_validate_subnets() {
        let spec = NetworkSpec {
            name: "vpc".to_string(),
            cidr: Ipv4Cidr::new("10.0.0.0/16").unwrap(),
            max_azs: 1,
            subnets: vec![
                SubnetConfiguration::new("Public", SubnetTier::Public, 24),
                SubnetConfiguration::new("Data", SubnetTier::Isolated, 24),
            ],
            nat_gateways: 0,
        };
        let layout = spec.layout(&["a".to_string()]).unwrap();
        let data = vec!["DataSubnet1".to_string()];

        assert!(validate_subnets("db", SubnetTier::Isolated, &data, &layout).is_ok());
        assert_eq!(
            validate_subnets("db", SubnetTier::Isolated, &[], &layout),
            Err(ValidationError::EmptyPlacement {
                resource: "db".to_string(),
                tier: SubnetTier::Isolated,
            })
        );
        assert_eq!(
            validate_subnets("db", SubnetTier::Isolated, &["PublicSubnet1".to_string()], &layout),
            Err(ValidationError::WrongTier {
                resource: "db".to_string(),
                required: SubnetTier::Isolated,
                actual: SubnetTier::Public,
            })
        );
        assert!(matches!(
            validate_subnets("db", SubnetTier::Isolated, &["Elsewhere".to_string()], &layout),
            Err(ValidationError::UnknownSubnet { .. })
        ));
    }
}
