//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (add / echo request ID)
//!     → middleware/origin.rs (optional cross-origin guard)
//!     → middleware/gate.rs (authorization decision)
//!         deny  → response.rs (status + plain-text message)
//!         allow → proxy.rs (forward to upstream)
//!     → Send to client
//! ```

pub mod middleware;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, GateServer, ServerError};
