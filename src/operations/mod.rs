//! Instrumented cart operations.
//!
//! # Data Flow
//! ```text
//! transport (http::server)
//!     → handlers.rs (read identity + payload)
//!     → scope.rs (span, timer; Drop emits request_count + request_latency)
//!     → cart::repository (critical section)
//!     → scope.rs (success/failure log, span status)
//!     → Result<Cart, CartError> back to transport
//! ```

pub mod handlers;
pub mod scope;

pub use handlers::{CartOperations, Inbound, RemoveItem};
pub use scope::{Operation, RequestScope};
