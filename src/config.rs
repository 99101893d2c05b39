// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment configuration
//!
//! Every default is a field of [`DeploymentConfig`], and the behavioral
//! defaults that changed between revisions (egress policy, bootstrap
//! failure handling) are pinned by [`ConfigVersion`]. Payloads such as the
//! monitoring agent document are configuration data, not literals in the
//! composition code.
//!
//! # Loading
//!
//! ```text
//! TIERED_CONFIG=deploy.json   → DeploymentConfig::from_file
//! (unset)                     → DeploymentConfig::default()
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::bootstrap::{FailurePolicy, Fragment, DEFAULT_AGENT_PARAMETER_PATH};
use crate::constructs::{AlbProps, AsgProps, RdsProps, VpcProps};
use crate::domain::invariants::{validate_capacity, MIN_DATABASE_STORAGE_GIB};
use crate::domain::{EgressPolicy, LogicalId, RuleSpec};

/// Path of the configuration document
pub const CONFIG_ENV: &str = "TIERED_CONFIG";

/// Output directory of the synthesized assembly
pub const OUT_DIR_ENV: &str = "TIERED_OUT_DIR";

/// Configuration error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid configuration document: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Revision of the configuration defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigVersion {
    /// Groups allow all outbound traffic, bootstrap failures are ignored
    V1,
    /// Only declared egress paths are open, bootstrap aborts on failure
    #[default]
    V2,
}

/// Behavioral defaults a [`ConfigVersion`] pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionDefaults {
    pub egress_policy: EgressPolicy,
    pub failure_policy: FailurePolicy,
}

impl ConfigVersion {
    pub fn defaults(&self) -> VersionDefaults {
        match self {
            Self::V1 => VersionDefaults {
                egress_policy: EgressPolicy::AllowAll,
                failure_policy: FailurePolicy::Unchecked,
            },
            Self::V2 => VersionDefaults {
                egress_policy: EgressPolicy::ExplicitOnly,
                failure_policy: FailurePolicy::FailFast,
            },
        }
    }
}

/// Where the database lives, if anywhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseLayout {
    /// No database; compute gets no database rules and no secret grant
    None,
    /// Database declared inside the app stack
    #[default]
    Merged,
    /// Separate database stack, linked into the app stack
    Linked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackNames {
    pub network: String,
    pub web: String,
    pub app: String,
    pub database: String,
}

impl Default for StackNames {
    fn default() -> Self {
        Self {
            network: "NetworkStack".to_string(),
            web: "WebStack".to_string(),
            app: "AppStack".to_string(),
            database: "DatabaseStack".to_string(),
        }
    }
}

/// Monitoring agent document and where it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub parameter_path: String,
    pub document: Value,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            parameter_path: DEFAULT_AGENT_PARAMETER_PATH.to_string(),
            document: default_agent_document(),
        }
    }
}

/// CPU metrics plus system log shipping
pub fn default_agent_document() -> Value {
    json!({
        "metrics": {
            "append_dimensions": {
                "InstanceId": "${aws:InstanceId}"
            },
            "metrics_collected": {
                "cpu": {
                    "measurement": [
                        "cpu_usage_idle",
                        "cpu_usage_iowait",
                        "cpu_usage_user",
                        "cpu_usage_system"
                    ],
                    "metrics_collection_interval": 60
                }
            }
        },
        "logs": {
            "logs_collected": {
                "files": {
                    "collect_list": [
                        {
                            "file_path": "/var/log/messages",
                            "log_group_name": "/ec2/messages",
                            "log_stream_name": "{instance_id}"
                        },
                        {
                            "file_path": "/var/log/syslog",
                            "log_group_name": "/ec2/syslog",
                            "log_stream_name": "{instance_id}"
                        }
                    ]
                }
            }
        }
    })
}

/// Complete input of one synthesis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub version: ConfigVersion,
    pub stack_names: StackNames,
    pub availability_zones: Vec<String>,
    /// Overrides the version default
    pub egress_policy: Option<EgressPolicy>,
    /// Overrides the version default
    pub failure_policy: Option<FailurePolicy>,
    pub network: VpcProps,
    pub web: AlbProps,
    pub compute: AsgProps,
    pub database: RdsProps,
    pub database_layout: DatabaseLayout,
    pub agent: AgentConfig,
    /// Appended to the bootstrap script after the agent setup
    pub extra_bootstrap: Vec<Fragment>,
    /// Extra rules on the compute security group, such as operator access
    pub compute_rules: Vec<RuleSpec>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self::for_version(ConfigVersion::default())
    }
}

impl DeploymentConfig {
    /// Defaults of one configuration revision
    pub fn for_version(version: ConfigVersion) -> Self {
        Self {
            version,
            stack_names: StackNames::default(),
            availability_zones: vec![
                "us-east-1a".to_string(),
                "us-east-1b".to_string(),
                "us-east-1c".to_string(),
            ],
            egress_policy: None,
            failure_policy: None,
            network: VpcProps::default(),
            web: AlbProps::default(),
            compute: AsgProps::default(),
            database: RdsProps::default(),
            database_layout: DatabaseLayout::default(),
            agent: AgentConfig::default(),
            extra_bootstrap: Vec::new(),
            compute_rules: Vec::new(),
        }
    }

    /// Egress policy in effect for every security group
    pub fn egress_policy(&self) -> EgressPolicy {
        self.egress_policy
            .unwrap_or_else(|| self.version.defaults().egress_policy)
    }

    /// Failure policy in effect for the bootstrap script
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
            .unwrap_or_else(|| self.version.defaults().failure_policy)
    }

    /// Parse and validate a JSON document
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_json(&document)?;
        info!(path = %path.display(), version = ?config.version, "Loaded deployment configuration");
        Ok(config)
    }

    /// Load from the file named by `TIERED_CONFIG`, or use the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => {
                debug!("{} not set, using default configuration", CONFIG_ENV);
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Check what serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            &self.stack_names.network,
            &self.stack_names.web,
            &self.stack_names.app,
            &self.stack_names.database,
        ];
        let mut seen = HashSet::new();
        for name in names {
            LogicalId::new(name.as_str())
                .map_err(|e| ConfigError::Invalid(format!("stack name {name}: {e}")))?;
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!("duplicate stack name {name}")));
            }
        }

        if self.availability_zones.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one availability zone is required".to_string(),
            ));
        }

        validate_capacity(
            "compute",
            self.compute.min_capacity,
            self.compute.max_capacity,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.database_layout != DatabaseLayout::None
            && self.database.allocated_storage_gib < MIN_DATABASE_STORAGE_GIB
        {
            return Err(ConfigError::Invalid(format!(
                "database storage {} GiB is below {} GiB",
                self.database.allocated_storage_gib, MIN_DATABASE_STORAGE_GIB
            )));
        }

        for spec in &self.compute_rules {
            spec.clone()
                .build()
                .map_err(|e| ConfigError::Invalid(format!("compute rule: {e}")))?;
        }

        if !self.agent.parameter_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "agent parameter path {} must be absolute",
                self.agent.parameter_path
            )));
        }

        if !self.agent.document.is_object() {
            return Err(ConfigError::Invalid(
                "agent document must be a JSON object".to_string(),
            ));
        }

        Ok(())
    }
}
