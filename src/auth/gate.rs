//! Per-request authorization decision pipeline.
//!
//! Stages run in fixed order; each one allows, denies, or passes the request
//! on. Only the last stage can end without an explicit verdict from an
//! earlier one, and it always produces one.
//!
//! 1. auth disabled → allow; a path escaping the root → deny 400
//! 2. canonical path is a console entry point or static asset → allow
//! 3. valid `spas-signature` from a trusted server → allow
//! 4. user-agent allowlist, or shared identity header → allow;
//!    neither configured → deny 403
//! 5. route lookup on the canonical path, permission check via the [`AuthManager`]

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::header::USER_AGENT;

use crate::auth::context::RequestContext;
use crate::auth::error::GateError;
use crate::auth::manager::AuthManager;
use crate::auth::parser::ResourceParserRegistry;
use crate::auth::permission::Permission;
use crate::config::AuthConfig;
use crate::routing::RouteTable;
use crate::security::path::{canonicalize_with, has_dot_segments, is_normalized, normalize};
use crate::security::signature::{calculate_sign, signatures_match};

pub const SIGNATURE_HEADER: &str = "spas-signature";
pub const ACCESS_KEY_HEADER: &str = "spas-accesskey";
pub const TIMESTAMP_HEADER: &str = "timestamp";

/// Documents under the context path that are always reachable (case-insensitive).
const ENTRY_DOCUMENTS: &[&str] = &["", "/index.html"];

/// Static asset directories under the context path (case-sensitive prefixes).
const ASSET_PREFIXES: &[&str] = &["/js/", "/img/", "/css/", "/console-ui/"];

/// Stage that let a request through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Disabled,
    StaticResource,
    ServerSignature,
    ServerIdentity,
    /// Route found, no permission declared.
    Unsecured,
    Permission,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Disabled => "disabled",
            Stage::StaticResource => "static_resource",
            Stage::ServerSignature => "server_signature",
            Stage::ServerIdentity => "server_identity",
            Stage::Unsecured => "unsecured",
            Stage::Permission => "permission",
        }
    }
}

/// Verdict for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Stage),
    Deny(GateError),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// The request-level authentication/authorization gate.
pub struct AuthorizationGate {
    config: ArcSwap<AuthConfig>,
    routes: Arc<RouteTable>,
    parsers: Arc<ResourceParserRegistry>,
    auth_manager: Arc<dyn AuthManager>,
}

impl AuthorizationGate {
    pub fn new(
        config: AuthConfig,
        routes: Arc<RouteTable>,
        parsers: Arc<ResourceParserRegistry>,
        auth_manager: Arc<dyn AuthManager>,
    ) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            routes,
            parsers,
            auth_manager,
        }
    }

    /// Current auth settings.
    pub fn config(&self) -> Arc<AuthConfig> {
        self.config.load_full()
    }

    /// Swap in new auth settings. In-flight evaluations finish on the old ones.
    pub fn update_config(&self, config: AuthConfig) {
        self.config.store(Arc::new(config));
    }

    pub fn parsers(&self) -> &ResourceParserRegistry {
        &self.parsers
    }

    /// Evaluate the pipeline for one request.
    pub fn evaluate(&self, request: &RequestContext) -> Decision {
        let config = self.config.load();

        if !config.enabled {
            return Decision::Allow(Stage::Disabled);
        }

        if normalize(request.path(), true).is_none() {
            return self.deny(request, GateError::PathEscapesRoot);
        }

        let charset = config.path_charset.as_deref();
        if is_static_resource(&config.context_path, request.path(), charset) {
            return Decision::Allow(Stage::StaticResource);
        }

        if has_valid_server_signature(&config, request) {
            return Decision::Allow(Stage::ServerSignature);
        }

        match check_server_identity(&config, request) {
            Ok(true) => return Decision::Allow(Stage::ServerIdentity),
            Ok(false) => {}
            Err(e) => return self.deny(request, e),
        }

        match self.check_permission(request, charset) {
            Ok(stage) => Decision::Allow(stage),
            Err(e) => self.deny(request, e),
        }
    }

    fn deny(&self, request: &RequestContext, error: GateError) -> Decision {
        if let GateError::Internal { detail } = &error {
            tracing::error!(
                method = %request.method(),
                path = %request.path(),
                error = %detail,
                "Authorization failed unexpectedly"
            );
        } else {
            tracing::debug!(
                method = %request.method(),
                path = %request.path(),
                status = error.status().as_u16(),
                reason = %error,
                "Access denied"
            );
        }
        Decision::Deny(error)
    }

    fn check_permission(
        &self,
        request: &RequestContext,
        charset: Option<&str>,
    ) -> Result<Stage, GateError> {
        let route_path = route_path(request.path(), charset)?;
        let route = self
            .routes
            .lookup(request.method(), &route_path)
            .ok_or_else(|| GateError::RouteNotFound {
                method: request.method().to_string(),
                path: request.path().to_string(),
            })?;

        let Some(descriptor) = &route.permission else {
            return Ok(Stage::Unsecured);
        };

        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            route = %route.name,
            "Auth start"
        );

        let resource = match descriptor.resource.as_deref().filter(|r| !r.trim().is_empty()) {
            Some(resource) => resource.to_string(),
            None => self
                .parsers
                .get_or_create(descriptor.parser)
                .parse_name(request, &route_path)?,
        };
        // A blank resource must never act as a wildcard.
        if resource.trim().is_empty() {
            return Err(GateError::InvalidResourceName);
        }

        let permission = Permission::new(resource, descriptor.action);
        let identity = self.auth_manager.login(request)?;
        self.auth_manager.authorize(&identity, &permission)?;

        Ok(Stage::Permission)
    }
}

/// Stage 2: console entry points and static assets.
///
/// Canonicalization errors only mean "not a static resource". A canonical
/// path that still contains traversal after decoding is never allowlisted.
fn is_static_resource(context_path: &str, raw_path: &str, charset: Option<&str>) -> bool {
    let path = match canonicalize_with(raw_path, charset) {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!(path = %raw_path, error = %e, "Skipping static resource check");
            return false;
        }
    };
    if !is_normalized(&path) {
        tracing::debug!(path = %raw_path, "Decoded path is not normalized, not a static resource");
        return false;
    }

    let split = context_path.len();
    if let (Some(head), Some(rest)) = (path.get(..split), path.get(split..)) {
        if head.eq_ignore_ascii_case(context_path)
            && ENTRY_DOCUMENTS.iter().any(|doc| rest.eq_ignore_ascii_case(doc))
        {
            return true;
        }
    }

    path.strip_prefix(context_path)
        .is_some_and(|rest| ASSET_PREFIXES.iter().any(|prefix| rest.starts_with(prefix)))
}

/// Stage 5 lookup key: the canonical path, which is what the upstream resolves.
///
/// Dot segments that only appear after decoding or parameter stripping
/// (`%2e%2e`, `..;x`) are refused rather than matched.
fn route_path(raw_path: &str, charset: Option<&str>) -> Result<String, GateError> {
    let canonical = canonicalize_with(raw_path, charset)?;
    if has_dot_segments(&canonical) {
        return Err(GateError::MalformedEncoding);
    }
    Ok(canonical)
}

/// Stage 3: signature recomputed from tenant/group/timestamp and the identity secret.
fn has_valid_server_signature(config: &AuthConfig, request: &RequestContext) -> bool {
    let Some(signature) = request.header(SIGNATURE_HEADER) else {
        return false;
    };
    if !config.has_server_identity() {
        return false;
    }
    let Some(timestamp) = request.header(TIMESTAMP_HEADER) else {
        tracing::debug!("Signed request without timestamp header");
        return false;
    };

    let expected = calculate_sign(
        request.param("tenant"),
        request.param("group"),
        timestamp,
        &config.server_identity_value,
    );

    signatures_match(&expected, signature)
        && request.header(ACCESS_KEY_HEADER) == Some(config.server_identity_key.as_str())
}

/// Stage 4: `Ok(true)` to allow, `Ok(false)` to continue.
fn check_server_identity(config: &AuthConfig, request: &RequestContext) -> Result<bool, GateError> {
    if config.enable_user_agent_auth_white {
        let trusted = request
            .header(USER_AGENT.as_str())
            .is_some_and(|ua| ua.starts_with(config.server_user_agent.as_str()));
        return Ok(trusted);
    }

    if !config.has_server_identity() {
        return Err(GateError::IdentityNotConfigured);
    }

    if request.header(&config.server_identity_key) == Some(config.server_identity_value.as_str()) {
        return Ok(true);
    }

    tracing::warn!(
        identity_key = %config.server_identity_key,
        remote_host = request.remote_host().unwrap_or("unknown"),
        "Invalid server identity value"
    );
    Ok(false)
}
