//! Routing subsystem: the per-route permission metadata table.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     RouteConfig[] (method, path pattern, permission descriptor)
//!     → Compile matchers
//!     → Sort by priority
//!     → Freeze as immutable RouteTable
//!
//! Per request (gate stage 5):
//!     (method, raw path)
//!     → router.rs (first matching route)
//!     → RouteMetadata or None (404)
//! ```
//!
//! # Design Decisions
//! - Metadata is explicit data attached at registration, never discovered
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod router;

pub use router::{RouteError, RouteMetadata, RouteTable};
