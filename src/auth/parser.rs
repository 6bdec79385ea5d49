//! Resource-name parsers and their shared registry.
//!
//! # Responsibilities
//! - Derive the resource half of a [`Permission`](crate::auth::Permission)
//!   from request attributes, one parser per [`ParserKind`]
//! - Memoize one parser instance per kind for the life of the process
//!
//! # Design Decisions
//! - Parsers are stateless, so two instances of one kind are interchangeable
//! - The registry is a sharded concurrent map with insert-if-absent:
//!   racing first uses keep whichever instance was published first

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::auth::context::RequestContext;
use crate::auth::error::GateError;

/// Separator between resource name parts.
pub const SPLITTER: char = ':';

/// Wildcard used for absent resource name parts.
pub const ANY: &str = "*";

/// Separator of a grouped service name (`group@@service`).
const SERVICE_GROUP_CONNECTOR: &str = "@@";

/// Derives a resource name from a request.
pub trait ResourceParser: Send + Sync + fmt::Debug {
    /// Returns the resource name, possibly blank. A blank name is never a wildcard.
    ///
    /// `canonical_path` is the request path as the route lookup resolved it.
    fn parse_name(&self, request: &RequestContext, canonical_path: &str)
        -> Result<String, GateError>;
}

/// Closed set of parser variants a route can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    #[default]
    Default,
    Config,
    Naming,
    PathSegment,
}

impl ParserKind {
    fn build(self) -> Arc<dyn ResourceParser> {
        match self {
            ParserKind::Default => Arc::new(DefaultResourceParser),
            ParserKind::Config => Arc::new(ConfigResourceParser),
            ParserKind::Naming => Arc::new(NamingResourceParser),
            ParserKind::PathSegment => Arc::new(PathSegmentResourceParser),
        }
    }
}

fn non_blank<'a>(value: Option<&'a str>) -> Option<&'a str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Always yields a blank name.
#[derive(Debug, Default)]
pub struct DefaultResourceParser;

impl ResourceParser for DefaultResourceParser {
    fn parse_name(&self, _request: &RequestContext, _path: &str) -> Result<String, GateError> {
        Ok(String::new())
    }
}

/// `{tenant}:{group}:config/{dataId}` from query parameters.
#[derive(Debug, Default)]
pub struct ConfigResourceParser;

impl ResourceParser for ConfigResourceParser {
    fn parse_name(&self, request: &RequestContext, _path: &str) -> Result<String, GateError> {
        let namespace = non_blank(request.param("tenant"))
            .or_else(|| non_blank(request.param("namespaceId")))
            .unwrap_or_default();
        let group = non_blank(request.param("group")).unwrap_or(ANY);
        let data_id = non_blank(request.param("dataId")).unwrap_or(ANY);

        Ok(format!("{namespace}{SPLITTER}{group}{SPLITTER}config/{data_id}"))
    }
}

/// `{namespaceId}:{groupName}:naming/{serviceName}` from query parameters.
#[derive(Debug, Default)]
pub struct NamingResourceParser;

impl ResourceParser for NamingResourceParser {
    fn parse_name(&self, request: &RequestContext, _path: &str) -> Result<String, GateError> {
        let namespace = non_blank(request.param("namespaceId")).unwrap_or_default();
        let mut group = non_blank(request.param("groupName"));
        let mut service = non_blank(request.param("serviceName"));

        if let Some((g, s)) = service.and_then(|s| s.split_once(SERVICE_GROUP_CONNECTOR)) {
            group = non_blank(Some(g)).or(group);
            service = non_blank(Some(s));
        }

        Ok(format!(
            "{namespace}{SPLITTER}{}{SPLITTER}naming/{}",
            group.unwrap_or(ANY),
            service.unwrap_or(ANY)
        ))
    }
}

/// Last segment of the canonical request path.
#[derive(Debug, Default)]
pub struct PathSegmentResourceParser;

impl ResourceParser for PathSegmentResourceParser {
    fn parse_name(
        &self,
        _request: &RequestContext,
        canonical_path: &str,
    ) -> Result<String, GateError> {
        Ok(canonical_path.rsplit('/').next().unwrap_or_default().to_string())
    }
}

/// Process-lifetime map from parser kind to its memoized instance.
#[derive(Debug, Default)]
pub struct ResourceParserRegistry {
    parsers: DashMap<ParserKind, Arc<dyn ResourceParser>>,
}

impl ResourceParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the parser for `kind`, constructing it on first use.
    pub fn get_or_create(&self, kind: ParserKind) -> Arc<dyn ResourceParser> {
        if let Some(parser) = self.parsers.get(&kind) {
            return Arc::clone(parser.value());
        }

        let entry = self.parsers.entry(kind).or_insert_with(|| {
            tracing::debug!(parser = ?kind, "Creating resource parser");
            kind.build()
        });
        Arc::clone(entry.value())
    }

    /// Number of kinds instantiated so far.
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}
