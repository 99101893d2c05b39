// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logical Identifier Value Objects
//!
//! Stack names, construct ids and template logical ids all go through
//! [`LogicalId`]. Nested constructs are addressed by a [`ConstructPath`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Logical identifier validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogicalIdError {
    #[error("Logical id is empty")]
    Empty,

    #[error("Logical id exceeds maximum length of 255 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character in logical id: {0:?}")]
    InvalidCharacter(char),

    #[error("Logical id must start with a letter: {0}")]
    MustStartWithLetter(String),
}

/// Construct or stack identifier
///
/// Invariants:
/// - Non-empty, at most 255 characters
/// - ASCII alphanumeric or hyphen only
/// - First character is a letter
///
/// Hyphens are allowed so stack names such as `Network-Stack` are
/// accepted; [`LogicalId::template_id`] strips them for template keys.
///
/// # Examples
///
/// ```rust
/// use tiered_infrastructure::domain::LogicalId;
///
/// let id = LogicalId::new("AppVPC").unwrap();
/// assert_eq!(id.as_str(), "AppVPC");
///
/// assert!(LogicalId::new("").is_err());
/// assert!(LogicalId::new("1stack").is_err());
/// assert!(LogicalId::new("bad/id").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    /// Maximum identifier length accepted by the provisioning engine
    pub const MAX_LENGTH: usize = 255;

    /// Create a new logical id with validation
    pub fn new(id: impl Into<String>) -> Result<Self, LogicalIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(LogicalIdError::Empty);
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(LogicalIdError::TooLong(id.len()));
        }

        if let Some(bad) = id.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
            return Err(LogicalIdError::InvalidCharacter(bad));
        }

        if !id.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(LogicalIdError::MustStartWithLetter(id));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier with hyphens removed, suitable as a template key
    pub fn template_id(&self) -> String {
        self.0.replace('-', "")
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogicalId {
    type Err = LogicalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LogicalId {
    type Error = LogicalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}

/// Slash-separated path of a construct inside its stack
///
/// The first segment is always the owning stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstructPath(String);

impl ConstructPath {
    /// Path of a stack root
    pub fn root(stack: &LogicalId) -> Self {
        Self(stack.as_str().to_string())
    }

    /// Path of a child construct
    pub fn child(&self, id: &str) -> Result<Self, LogicalIdError> {
        let id = LogicalId::new(id)?;
        Ok(Self(format!("{}/{}", self.0, id)))
    }

    /// Name of the stack owning this path
    pub fn stack(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// Last segment of the path
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Template logical id: all segments below the stack, concatenated
    pub fn template_id(&self) -> String {
        let below_stack: String = self
            .0
            .split('/')
            .skip(1)
            .collect::<Vec<_>>()
            .concat()
            .replace('-', "");

        if below_stack.is_empty() {
            self.0.replace('-', "")
        } else {
            below_stack
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
