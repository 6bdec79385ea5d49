//! Security primitives used by the authorization gate.
//!
//! # Data Flow
//! ```text
//! Raw request path:
//!     → path.rs (normalize → decode → strip ;params)
//!     → canonical path for the static-resource allowlist
//!
//! Trusted-server headers:
//!     → signature.rs (recompute HMAC-SHA1 over tenant/group/timestamp)
//!     → compare with spas-signature
//!
//! Origin header:
//!     → origin.rs (well-formed? same origin as Host?)
//! ```
//!
//! # Design Decisions
//! - Everything here is a pure function; no locks, no shared state
//! - Canonicalization failures are values, the caller picks the policy
//! - Signature comparison is constant-time

pub mod origin;
pub mod path;
pub mod signature;

pub use path::{canonicalize, CanonicalizeError, Charset};
pub use signature::{calculate_sign, sign_with_hmac_sha1};
