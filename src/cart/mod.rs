//! Cart state subsystem.
//!
//! # Data Flow
//! ```text
//! operations (add / remove / view)
//!     → repository.rs (per-owner critical section)
//!     → model.rs (Cart, Item; total maintained on every mutation)
//!
//! Gauge collector (periodic)
//!     → repository.rs snapshot_item_counts()
//! ```

pub mod model;
pub mod repository;

pub use model::{Cart, Item};
pub use repository::CartRepository;
