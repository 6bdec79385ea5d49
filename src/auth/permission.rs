//! Permission model: what a route requires and who is asking.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::parser::ParserKind;

/// Action half of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[serde(alias = "r")]
    Read,
    #[serde(alias = "w")]
    Write,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "r",
            Action::Write => "w",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Can the caller perform `action` on `resource`."
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission {
    pub resource: String,
    pub action: Action,
}

impl Permission {
    pub fn new(resource: impl Into<String>, action: Action) -> Self {
        Self {
            resource: resource.into(),
            action,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

/// Permission requirement attached to a route at registration time.
///
/// A literal `resource` wins over the parser; with neither, the default
/// parser yields a blank name and the request is denied.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PermissionDescriptor {
    pub action: Action,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    #[serde(default)]
    pub parser: ParserKind,
}

impl PermissionDescriptor {
    pub fn with_resource(action: Action, resource: impl Into<String>) -> Self {
        Self {
            action,
            resource: Some(resource.into()),
            parser: ParserKind::Default,
        }
    }

    pub fn with_parser(action: Action, parser: ParserKind) -> Self {
        Self {
            action,
            resource: None,
            parser,
        }
    }
}

/// Authenticated caller as produced by the login step. Opaque to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
