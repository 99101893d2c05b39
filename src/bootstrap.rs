// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bootstrap script assembly
//!
//! A compute instance runs one shell script at first boot. The script is
//! assembled from fragments in exactly the order the caller pushes them.
//! Fragments never check each other's outcome; the [`FailurePolicy`] decides
//! whether a failing command aborts the script or is ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known path of the monitoring agent document
pub const DEFAULT_AGENT_PARAMETER_PATH: &str = "/CloudWatchAgent/EC2/Config";

/// Log file the script output is captured to under [`FailurePolicy::FailFast`]
pub const BOOTSTRAP_LOG: &str = "/var/log/bootstrap.log";

/// Bootstrap assembly error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("{field} contains forbidden character: {ch:?}")]
    ForbiddenCharacter { field: String, ch: char },

    #[error("{0} cannot be empty")]
    EmptyValue(String),

    #[error("Connectivity check to {host} has invalid port 0")]
    InvalidPort { host: String },

    #[error("Connectivity check to {host} needs at least one attempt")]
    NoAttempts { host: String },
}

/// What happens when a bootstrap command fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Commands run to the end regardless of exit status
    Unchecked,
    /// `set -euo pipefail`, output captured to [`BOOTSTRAP_LOG`], and an
    /// exhausted connectivity check exits non-zero
    #[default]
    FailFast,
}

/// One ordered piece of the bootstrap script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fragment", rename_all = "snake_case")]
pub enum Fragment {
    /// Update installed packages
    PackageUpdate,
    /// Install named packages
    PackageInstall { packages: Vec<String> },
    /// Service configuration commands, emitted verbatim
    ServiceConfig { commands: Vec<String> },
    /// Install the monitoring agent and apply the externally stored document
    MonitoringAgent { parameter_path: String },
    /// Poll a TCP endpoint until it answers or attempts run out
    ConnectivityCheck {
        host: String,
        port: u16,
        attempts: u32,
        interval_secs: u32,
    },
    /// Raw commands, emitted verbatim
    Raw { commands: Vec<String> },
}

/// Validate that a value is safe for shell interpolation.
///
/// Rejects characters that could break quoted bash strings or enable
/// injection.
fn validate_shell_input(value: &str, field_name: &str) -> Result<(), BootstrapError> {
    const FORBIDDEN: &[char] = &['"', '\'', '\\', '`', '$', ';', '&', '|', '\n', '\r'];
    if value.is_empty() {
        return Err(BootstrapError::EmptyValue(field_name.to_string()));
    }
    if let Some(ch) = value.chars().find(|c| FORBIDDEN.contains(c) || c.is_whitespace()) {
        return Err(BootstrapError::ForbiddenCharacter {
            field: field_name.to_string(),
            ch,
        });
    }
    Ok(())
}

impl Fragment {
    fn validate(&self) -> Result<(), BootstrapError> {
        match self {
            Self::PackageUpdate => Ok(()),
            Self::PackageInstall { packages } => {
                if packages.is_empty() {
                    return Err(BootstrapError::EmptyValue("packages".to_string()));
                }
                packages
                    .iter()
                    .try_for_each(|p| validate_shell_input(p, "package"))
            }
            Self::ServiceConfig { commands } | Self::Raw { commands } => {
                if commands.iter().any(|c| c.trim().is_empty()) {
                    return Err(BootstrapError::EmptyValue("command".to_string()));
                }
                Ok(())
            }
            Self::MonitoringAgent { parameter_path } => {
                validate_shell_input(parameter_path, "parameter_path")
            }
            Self::ConnectivityCheck {
                host,
                port,
                attempts,
                ..
            } => {
                validate_shell_input(host, "host")?;
                if *port == 0 {
                    return Err(BootstrapError::InvalidPort { host: host.clone() });
                }
                if *attempts == 0 {
                    return Err(BootstrapError::NoAttempts { host: host.clone() });
                }
                Ok(())
            }
        }
    }

    fn render(&self, policy: FailurePolicy) -> Vec<String> {
        match self {
            Self::PackageUpdate => vec!["yum update -y".to_string()],
            Self::PackageInstall { packages } => {
                vec![format!("yum install -y {}", packages.join(" "))]
            }
            Self::ServiceConfig { commands } | Self::Raw { commands } => commands.clone(),
            Self::MonitoringAgent { parameter_path } => vec![
                "yum install -y amazon-cloudwatch-agent".to_string(),
                format!(
                    "/opt/aws/amazon-cloudwatch-agent/bin/amazon-cloudwatch-agent-ctl -a fetch-config -m ec2 -c ssm:{} -s",
                    parameter_path
                ),
            ],
            Self::ConnectivityCheck {
                host,
                port,
                attempts,
                interval_secs,
            } => {
                let on_exhausted = match policy {
                    FailurePolicy::FailFast => format!(
                        "  if [ \"$i\" -eq {attempts} ]; then echo \"{host}:{port} unreachable after {attempts} attempts\" >&2; exit 1; fi"
                    ),
                    FailurePolicy::Unchecked => format!(
                        "  if [ \"$i\" -eq {attempts} ]; then echo \"{host}:{port} unreachable after {attempts} attempts\" >&2; fi"
                    ),
                };
                vec![
                    format!("for i in $(seq 1 {attempts}); do"),
                    format!(
                        "  if timeout 5 bash -c '</dev/tcp/{host}/{port}'; then echo \"{host}:{port} reachable\"; break; fi"
                    ),
                    on_exhausted,
                    format!("  sleep {interval_secs}"),
                    "done".to_string(),
                ]
            }
        }
    }
}

/// Ordered bootstrap script for one compute group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BootstrapScript {
    failure_policy: FailurePolicy,
    fragments: Vec<Fragment>,
}

impl BootstrapScript {
    pub fn new(failure_policy: FailurePolicy) -> Self {
        Self {
            failure_policy,
            fragments: Vec::new(),
        }
    }

    /// Append a fragment after validating its inputs
    pub fn push(&mut self, fragment: Fragment) -> Result<(), BootstrapError> {
        fragment.validate()?;
        self.fragments.push(fragment);
        Ok(())
    }

    /// Builder form of [`BootstrapScript::push`]
    pub fn with(mut self, fragment: Fragment) -> Result<Self, BootstrapError> {
        self.push(fragment)?;
        Ok(self)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Parameter documents the script fetches at boot
    pub fn parameter_paths(&self) -> Vec<&str> {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::MonitoringAgent { parameter_path } => Some(parameter_path.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Commands in execution order, without the preamble
    pub fn commands(&self) -> Vec<String> {
        self.fragments
            .iter()
            .flat_map(|f| f.render(self.failure_policy))
            .collect()
    }

    /// Full script text
    pub fn render(&self) -> String {
        let mut lines = vec!["#!/bin/bash".to_string()];
        if self.failure_policy == FailurePolicy::FailFast {
            lines.push("set -euo pipefail".to_string());
            lines.push(format!("exec > >(tee {}) 2>&1", BOOTSTRAP_LOG));
        }
        lines.extend(self.commands());
        let mut script = lines.join("\n");
        script.push('\n');
        script
    }
}
