//! Login and permission-check collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::header::AUTHORIZATION;

use crate::auth::context::RequestContext;
use crate::auth::error::AuthError;
use crate::auth::permission::{Action, Identity, Permission};
use crate::config::schema::{GrantAction, GrantConfig, UserConfig};

/// Query parameter carrying an access token.
pub const ACCESS_TOKEN_PARAM: &str = "accessToken";

/// Identity and permission engine consulted by the last gate stage.
///
/// Calls are synchronous; an implementation that blocks does so within the
/// server's request timeout.
pub trait AuthManager: Send + Sync {
    fn login(&self, request: &RequestContext) -> Result<Identity, AuthError>;

    fn authorize(&self, identity: &Identity, permission: &Permission) -> Result<(), AuthError>;
}

#[derive(Debug, Default)]
struct UserTable {
    tokens: HashMap<String, String>,
    grants: HashMap<String, Vec<GrantConfig>>,
}

impl UserTable {
    fn build(users: &[UserConfig]) -> Self {
        let mut table = Self::default();
        for user in users {
            table.tokens.insert(user.token.clone(), user.username.clone());
            table
                .grants
                .entry(user.username.clone())
                .or_default()
                .extend(user.grants.iter().cloned());
        }
        table
    }
}

/// Token-to-user table with resource grants, loaded from configuration.
///
/// The table is swapped whole on [`reload`](Self::reload).
#[derive(Debug)]
pub struct StaticAuthManager {
    table: ArcSwap<UserTable>,
}

impl StaticAuthManager {
    pub fn from_config(users: &[UserConfig]) -> Self {
        Self {
            table: ArcSwap::from_pointee(UserTable::build(users)),
        }
    }

    /// Replace the user table.
    pub fn reload(&self, users: &[UserConfig]) {
        self.table.store(Arc::new(UserTable::build(users)));
    }

    fn token<'a>(request: &'a RequestContext) -> Result<Option<&'a str>, AuthError> {
        if let Some(token) = request.param(ACCESS_TOKEN_PARAM).filter(|t| !t.is_empty()) {
            return Ok(Some(token));
        }
        match request.header(AUTHORIZATION.as_str()) {
            None => Ok(None),
            Some(value) => value
                .strip_prefix("Bearer ")
                .map(|t| Some(t.trim()))
                .ok_or_else(|| {
                    AuthError::MalformedInput(
                        "Authorization header must use the Bearer scheme".to_string(),
                    )
                }),
        }
    }
}

impl AuthManager for StaticAuthManager {
    fn login(&self, request: &RequestContext) -> Result<Identity, AuthError> {
        let token = Self::token(request)?
            .ok_or_else(|| AuthError::Unauthenticated("user not found!".to_string()))?;

        self.table
            .load()
            .tokens
            .get(token)
            .map(Identity::new)
            .ok_or_else(|| AuthError::Unauthenticated("token invalid!".to_string()))
    }

    fn authorize(&self, identity: &Identity, permission: &Permission) -> Result<(), AuthError> {
        let granted = self
            .table
            .load()
            .grants
            .get(identity.name())
            .is_some_and(|grants| grants.iter().any(|g| covers(g, permission)));

        if granted {
            Ok(())
        } else {
            Err(AuthError::Forbidden("authorization failed!".to_string()))
        }
    }
}

fn covers(grant: &GrantConfig, permission: &Permission) -> bool {
    let action_ok = match grant.action {
        GrantAction::ReadWrite => true,
        GrantAction::Read => permission.action == Action::Read,
        GrantAction::Write => permission.action == Action::Write,
    };
    let resource_ok = match grant.resource.strip_suffix('*') {
        Some(prefix) => permission.resource.starts_with(prefix),
        None => grant.resource == permission.resource,
    };
    action_ok && resource_ok
}
