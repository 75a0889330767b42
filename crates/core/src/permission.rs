//! Permission levels, grant subjects and bulk-job outcomes

use crate::entity::EntityKind;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access level understood by the permissions endpoint
///
/// These three values are the only ones that exist on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    None,
    Execute,
    All,
}

impl PermissionLevel {
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Execute => 3,
            Self::All => 7,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::None),
            3 => Ok(Self::Execute),
            7 => Ok(Self::All),
            other => Err(Error::InvalidPermissionCode(other)),
        }
    }

    /// Resolve one of the accepted aliases (case-sensitive, as the platform tooling uses them)
    pub fn from_alias(alias: &str) -> Result<Self> {
        match alias {
            "none" => Ok(Self::None),
            "execute" | "x" => Ok(Self::Execute),
            "all" | "write" | "a" | "w" => Ok(Self::All),
            other => Err(Error::UnknownPermission(other.to_string())),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Execute => "execute",
            Self::All => "all",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = Error;

    /// Accepts an alias or a wire code written as digits
    fn from_str(s: &str) -> Result<Self> {
        PermissionInput::from(s).resolve()
    }
}

impl TryFrom<i64> for PermissionLevel {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self> {
        Self::from_code(code)
    }
}

/// Loosely-typed level as supplied by a caller: an alias or a raw code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionInput {
    Code(i64),
    Alias(String),
}

impl PermissionInput {
    pub fn resolve(&self) -> Result<PermissionLevel> {
        match self {
            Self::Code(code) => PermissionLevel::from_code(*code),
            Self::Alias(alias) => match alias.parse::<i64>() {
                Ok(code) => PermissionLevel::from_code(code),
                Err(_) => PermissionLevel::from_alias(alias),
            },
        }
    }
}

impl From<&str> for PermissionInput {
    fn from(alias: &str) -> Self {
        Self::Alias(alias.to_string())
    }
}

impl From<i64> for PermissionInput {
    fn from(code: i64) -> Self {
        Self::Code(code)
    }
}

impl From<PermissionLevel> for PermissionInput {
    fn from(level: PermissionLevel) -> Self {
        Self::Code(i64::from(level.code()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    User,
    Group,
}

impl SubjectKind {
    pub const fn is_user(self) -> bool {
        matches!(self, Self::User)
    }
}

/// Who receives a grant
///
/// User grants always carry a list of ids; group grants exactly one id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    Users(Vec<String>),
    Group(String),
}

impl Subject {
    pub fn user(id: impl Into<String>) -> Self {
        Self::Users(vec![id.into()])
    }

    pub fn users<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Err(Error::EmptySubject("at least one user id is required"));
        }
        Ok(Self::Users(ids))
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::Group(id.into())
    }

    pub const fn kind(&self) -> SubjectKind {
        match self {
            Self::Users(_) => SubjectKind::User,
            Self::Group(_) => SubjectKind::Group,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Users(ids) => write!(f, "users [{}]", ids.join(", ")),
            Self::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// One grant against one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequest {
    pub subject: Subject,
    pub entity_kind: EntityKind,
    pub object_id: String,
    pub level: PermissionLevel,
}

impl GrantRequest {
    pub fn new(
        subject: Subject,
        entity_kind: EntityKind,
        object_id: impl Into<String>,
        level: PermissionLevel,
    ) -> Self {
        Self {
            subject,
            entity_kind,
            object_id: object_id.into(),
            level,
        }
    }
}

/// Result of writing one grant during a bulk job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationOutcome {
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PropagationOutcome {
    pub fn succeeded(entity_id: impl Into<String>, entity_kind: EntityKind) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_kind,
            success: true,
            error_message: None,
        }
    }

    pub fn failed(
        entity_id: impl Into<String>,
        entity_kind: EntityKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_kind,
            success: false,
            error_message: Some(message.into()),
        }
    }
}

/// Ordered outcomes of one propagation job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationReport {
    pub outcomes: Vec<PropagationOutcome>,
}

impl PropagationReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PropagationOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}
