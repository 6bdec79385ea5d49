//! Authorization subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (method, raw path, headers, params, remote host)
//!     → gate.rs stage 1: auth disabled?
//!     → gate.rs stage 2: security::path canonical form on the allowlist?
//!     → gate.rs stage 3: security::signature matches spas-signature?
//!     → gate.rs stage 4: user-agent allowlist / identity header
//!     → gate.rs stage 5:
//!         routing::RouteTable lookup (404 if none)
//!         → parser.rs resource name (registry-memoized parser)
//!         → manager.rs login + authorize
//!     → Decision::Allow(stage) | Decision::Deny(GateError)
//! ```
//!
//! # Design Decisions
//! - Stage functions return values; the pipeline maps error kinds to status
//! - Every path through `evaluate` ends in an explicit Allow or Deny
//! - Auth settings are swapped atomically; evaluation reads one snapshot

pub mod context;
pub mod error;
pub mod gate;
pub mod manager;
pub mod parser;
pub mod permission;

pub use context::RequestContext;
pub use error::{AuthError, GateError};
pub use gate::{AuthorizationGate, Decision, Stage};
pub use manager::{AuthManager, StaticAuthManager};
pub use parser::{ParserKind, ResourceParser, ResourceParserRegistry};
pub use permission::{Action, Identity, Permission, PermissionDescriptor};
