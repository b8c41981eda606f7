//! Per-request error taxonomy for cart operations.
//!
//! Both variants are recoverable: the repository returns them, the operation
//! handlers translate them into telemetry, and the HTTP layer maps them to a
//! status code. Nothing in this module carries free-text that callers match on.

use std::fmt;

/// The entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Cart,
    Item,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Cart => "cart",
            Entity::Item => "item",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification used by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
}

/// Error returned by repository and handler operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Required input missing or out of range.
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },

    /// Cart absent, or item absent within an existing cart.
    #[error("{0} not found")]
    NotFound(Entity),
}

impl CartError {
    pub fn validation(field: &'static str, reason: &'static str) -> Self {
        CartError::Validation { field, reason }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::Validation { .. } => ErrorKind::Validation,
            CartError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}
