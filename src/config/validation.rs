//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check identity settings are complete
//! - Validate routes, users and addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::uri::Authority;
use axum::http::Method;
use thiserror::Error;

use crate::config::schema::GateConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }
    if config.upstream.address.parse::<Authority>().is_err() {
        errors.push(ValidationError::new("upstream.address", "not a host:port authority"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let auth = &config.auth;
    let key_blank = auth.server_identity_key.trim().is_empty();
    let value_blank = auth.server_identity_value.trim().is_empty();
    if key_blank != value_blank {
        errors.push(ValidationError::new(
            "auth.server_identity_key",
            "server_identity_key and server_identity_value must be set together",
        ));
    }
    if !auth.context_path.is_empty()
        && (!auth.context_path.starts_with('/') || auth.context_path.ends_with('/'))
    {
        errors.push(ValidationError::new(
            "auth.context_path",
            "must be empty or start with '/' and not end with '/'",
        ));
    }
    if auth.enable_user_agent_auth_white && auth.server_user_agent.trim().is_empty() {
        errors.push(ValidationError::new(
            "auth.server_user_agent",
            "required when enable_user_agent_auth_white is set",
        ));
    }

    let mut tokens = HashSet::new();
    for (i, user) in auth.users.iter().enumerate() {
        if user.token.trim().is_empty() {
            errors.push(ValidationError::new(format!("auth.users[{i}].token"), "must not be blank"));
        } else if !tokens.insert(user.token.as_str()) {
            errors.push(ValidationError::new(format!("auth.users[{i}].token"), "duplicate token"));
        }
    }

    let mut names = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(
                format!("routes[{i}].name"),
                format!("duplicate route name `{}`", route.name),
            ));
        }
        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(format!("routes[{i}].path"), "must start with '/'"));
        }
        if let Some(method) = route.method.as_deref().filter(|m| *m != "*") {
            if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
                errors.push(ValidationError::new(
                    format!("routes[{i}].method"),
                    format!("invalid HTTP method `{method}`"),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
