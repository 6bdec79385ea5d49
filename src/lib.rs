//! Request-level authorization gate for a configuration and naming service.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use auth::{AuthorizationGate, Decision, RequestContext, Stage};
pub use config::schema::GateConfig;
pub use http::GateServer;
pub use lifecycle::Shutdown;
