//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::auth::permission::PermissionDescriptor;

/// Root configuration for the authorization gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Authorization settings. Hot-reloadable.
    pub auth: AuthConfig,

    /// Route metadata table. Fixed at startup.
    pub routes: Vec<RouteConfig>,

    /// Control-plane service that allowed requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Authorization gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false every request is allowed.
    pub enabled: bool,

    /// Header name / access key shared by trusted servers.
    pub server_identity_key: String,

    /// Header value / signing secret shared by trusted servers.
    pub server_identity_value: String,

    /// Trust callers whose User-Agent starts with `server_user_agent`
    /// instead of checking the identity header.
    pub enable_user_agent_auth_white: bool,

    /// User-Agent prefix sent by cluster peers.
    pub server_user_agent: String,

    /// Path under which the console and its static assets are served.
    pub context_path: String,

    /// Charset label for percent-decoding request paths; UTF-8 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_charset: Option<String>,

    /// Users known to the bundled static authorization manager.
    pub users: Vec<UserConfig>,
}

impl AuthConfig {
    /// True when both identity key and value are non-blank.
    pub fn has_server_identity(&self) -> bool {
        !self.server_identity_key.trim().is_empty() && !self.server_identity_value.trim().is_empty()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server_identity_key: String::new(),
            server_identity_value: String::new(),
            enable_user_agent_auth_white: false,
            server_user_agent: "Nacos-Server".to_string(),
            context_path: "/nacos".to_string(),
            path_charset: None,
            users: Vec::new(),
        }
    }
}

/// A user with an access token and resource grants.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,
    pub token: String,
    #[serde(default)]
    pub grants: Vec<GrantConfig>,
}

/// Grant on a resource, exact or trailing-`*` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GrantConfig {
    pub resource: String,
    pub action: GrantAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum GrantAction {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
    #[serde(rename = "rw")]
    ReadWrite,
}

/// Route registration: method + path pattern and its permission requirement.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// HTTP method; absent or `*` matches any.
    #[serde(default)]
    pub method: Option<String>,

    /// Exact path, or a prefix pattern ending in `/**`.
    pub path: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,

    /// Absent for routes that need no permission.
    #[serde(default)]
    pub permission: Option<PermissionDescriptor>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:8848").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8848".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Reject requests whose `Origin` is malformed or not same-origin.
    pub reject_cross_origin: bool,

    /// Largest form body the gate buffers to read parameters from.
    pub max_form_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            reject_cross_origin: false,
            max_form_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Action, ParserKind};

    #[test]
    fn test_defaults_from_empty_file() {
        let config: GateConfig = toml::from_str("").unwrap();
        assert!(config.auth.enabled);
        assert_eq!(config.auth.context_path, "/nacos");
        assert_eq!(config.auth.server_user_agent, "Nacos-Server");
        assert!(!config.auth.has_server_identity());
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config: GateConfig = toml::from_str(
            r#"
            [auth]
            server_identity_key = "serverIdentity"
            server_identity_value = "security"

            [[auth.users]]
            username = "alice"
            token = "tok"
            grants = [{ resource = "dev:*", action = "rw" }]

            [[routes]]
            name = "get-config"
            method = "GET"
            path = "/nacos/v1/cs/configs"
            permission = { action = "read", parser = "config" }

            [[routes]]
            name = "namespaces"
            path = "/nacos/v1/console/namespaces/**"
            permission = { action = "w", resource = "console/namespaces" }

            [[routes]]
            name = "health"
            path = "/nacos/v1/console/health"
            "#,
        )
        .unwrap();

        assert!(config.auth.has_server_identity());
        assert_eq!(config.auth.users[0].grants[0].action, GrantAction::ReadWrite);
        assert_eq!(
            config.routes[0].permission,
            Some(PermissionDescriptor::with_parser(Action::Read, ParserKind::Config))
        );
        assert_eq!(
            config.routes[1].permission,
            Some(PermissionDescriptor::with_resource(Action::Write, "console/namespaces"))
        );
        assert!(config.routes[2].permission.is_none());
    }
}
