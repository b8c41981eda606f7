//! In-memory shopping cart service with request telemetry.

pub mod cart;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod operations;

pub use cart::{Cart, CartRepository, Item};
pub use config::ServiceConfig;
pub use error::{CartError, Entity, ErrorKind};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use operations::CartOperations;
