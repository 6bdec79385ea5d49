//! Route metadata table.

use axum::http::Method;
use thiserror::Error;

use crate::auth::permission::PermissionDescriptor;
use crate::config::RouteConfig;
use crate::routing::matcher::{path_matcher, AndMatcher, Matcher, MethodMatcher};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route `{route}`: invalid HTTP method `{method}`")]
    InvalidMethod { route: String, method: String },

    #[error("route `{route}`: path `{path}` must start with '/'")]
    InvalidPath { route: String, path: String },
}

/// What the gate knows about a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMetadata {
    pub name: String,
    /// `None` means the route is not secured.
    pub permission: Option<PermissionDescriptor>,
}

#[derive(Debug)]
struct Route {
    priority: u32,
    matcher: AndMatcher,
    metadata: RouteMetadata,
}

/// Immutable lookup from (method, path) to route metadata.
///
/// Routes are checked by descending priority, then registration order.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(configs: Vec<RouteConfig>) -> Result<Self, RouteError> {
        let mut table = Self::new();
        for config in configs {
            table.register(config)?;
        }
        Ok(table)
    }

    pub fn register(&mut self, config: RouteConfig) -> Result<(), RouteError> {
        if !config.path.starts_with('/') {
            return Err(RouteError::InvalidPath {
                route: config.name,
                path: config.path,
            });
        }

        let mut matchers: Vec<Box<dyn Matcher>> = Vec::with_capacity(2);
        if let Some(method) = config.method.as_deref().filter(|m| *m != "*") {
            let parsed = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
                RouteError::InvalidMethod {
                    route: config.name.clone(),
                    method: method.to_string(),
                }
            })?;
            matchers.push(Box::new(MethodMatcher::new(parsed)));
        }
        matchers.push(path_matcher(&config.path));

        let route = Route {
            priority: config.priority,
            matcher: AndMatcher::new(matchers),
            metadata: RouteMetadata {
                name: config.name,
                permission: config.permission,
            },
        };

        // Stable insert keeps registration order among equal priorities.
        let index = self.routes.partition_point(|r| r.priority >= route.priority);
        self.routes.insert(index, route);
        Ok(())
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<&RouteMetadata> {
        self.routes
            .iter()
            .find(|r| r.matcher.matches(method, path))
            .map(|r| &r.metadata)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
