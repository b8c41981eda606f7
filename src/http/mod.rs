//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, User-ID header, body decoding)
//!     → operations (instrumented cart call)
//!     → response.rs (Cart JSON or {"error": ...} with 400/404)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{USER_ID_HEADER, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
