//! Axum middleware wrapping the forwarding handler.
//!
//! # Data Flow
//! ```text
//! request
//!     → origin.rs (optional: reject malformed / cross-origin Origin)
//!     → gate.rs (AuthorizationGate decision)
//!     → forwarding handler
//! ```

pub mod gate;
pub mod origin;

pub use gate::gate_middleware;
pub use origin::origin_guard;
