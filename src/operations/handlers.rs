//! Add / Remove / View operation handlers.
//!
//! Each handler wraps exactly one repository call in a [`RequestScope`]. The
//! repository call returns before any log line is written, so no telemetry
//! is emitted while a cart lock is held.

use std::sync::Arc;

use opentelemetry::Context;
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartRepository, Item};
use crate::error::CartError;
use crate::observability::sink::{LogFields, TelemetrySink};
use crate::operations::scope::{Operation, RequestScope};

/// An inbound request as handed over by the transport layer.
///
/// `payload` is `Err` when the body could not be decoded; the handler still
/// counts and logs such requests. `parent` is the caller's trace context, empty
/// when none was propagated.
#[derive(Debug, Clone)]
pub struct Inbound<P> {
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    pub parent: Context,
    pub payload: Result<P, CartError>,
}

impl<P> Inbound<P> {
    pub fn new(user_id: impl Into<String>, payload: P) -> Self {
        Self {
            request_id: None,
            user_id: Some(user_id.into()),
            parent: Context::new(),
            payload: Ok(payload),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Body of a remove request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub id: String,
}

/// Cart operations with timing, span annotation and request logging.
#[derive(Clone)]
pub struct CartOperations {
    repository: Arc<CartRepository>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl CartOperations {
    pub fn new(repository: Arc<CartRepository>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self { repository, telemetry }
    }

    pub fn repository(&self) -> &Arc<CartRepository> {
        &self.repository
    }

    pub fn add(&self, inbound: Inbound<Item>) -> Result<Cart, CartError> {
        let mut scope = self.begin(Operation::Add, &inbound);
        let result = self.try_add(&mut scope, inbound);
        if let Err(e) = &result {
            scope.fail(e);
        }
        result
    }

    pub fn remove(&self, inbound: Inbound<RemoveItem>) -> Result<Cart, CartError> {
        let mut scope = self.begin(Operation::Remove, &inbound);
        let result = self.try_remove(&mut scope, inbound);
        if let Err(e) = &result {
            scope.fail(e);
        }
        result
    }

    pub fn view(&self, inbound: Inbound<()>) -> Result<Cart, CartError> {
        let mut scope = self.begin(Operation::View, &inbound);
        let result = self.try_view(&mut scope, inbound);
        if let Err(e) = &result {
            scope.fail(e);
        }
        result
    }

    fn begin<P>(&self, operation: Operation, inbound: &Inbound<P>) -> RequestScope {
        RequestScope::begin(
            self.telemetry.clone(),
            operation,
            inbound.request_id.as_deref(),
            &inbound.parent,
        )
    }

    fn try_add(&self, scope: &mut RequestScope, inbound: Inbound<Item>) -> Result<Cart, CartError> {
        let user_id = require_user(&inbound.user_id)?;
        scope.annotate_user(user_id);
        let item = inbound.payload?;
        scope.annotate_item(&item.id);

        let quantity = item.quantity;
        let cart = self.repository.add_item(user_id, item)?;

        scope.succeed(
            "Item added to cart",
            LogFields {
                quantity: Some(quantity),
                ..LogFields::default()
            },
        );
        Ok(cart)
    }

    fn try_remove(
        &self,
        scope: &mut RequestScope,
        inbound: Inbound<RemoveItem>,
    ) -> Result<Cart, CartError> {
        let user_id = require_user(&inbound.user_id)?;
        scope.annotate_user(user_id);
        let request = inbound.payload?;
        scope.annotate_item(&request.id);

        let (cart, removed) = self.repository.remove_item(user_id, &request.id)?;

        scope.succeed(
            "Item removed from cart",
            LogFields {
                quantity: Some(removed.quantity),
                item_count: Some(cart.items.len()),
                cart_total: Some(cart.total),
                ..LogFields::default()
            },
        );
        Ok(cart)
    }

    fn try_view(&self, scope: &mut RequestScope, inbound: Inbound<()>) -> Result<Cart, CartError> {
        let user_id = require_user(&inbound.user_id)?;
        scope.annotate_user(user_id);

        let cart = self.repository.view_cart(user_id)?;

        scope.succeed(
            "Cart viewed",
            LogFields {
                item_count: Some(cart.items.len()),
                cart_total: Some(cart.total),
                ..LogFields::default()
            },
        );
        Ok(cart)
    }
}

fn require_user(user_id: &Option<String>) -> Result<&str, CartError> {
    match user_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(CartError::validation("user_id", "must be provided")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Entity;
    use crate::observability::metrics::{REQUEST_COUNT, REQUEST_LATENCY};
    use crate::observability::sink::{InMemorySink, LogLevel};
    use rust_decimal::Decimal;

    fn setup() -> (CartOperations, Arc<InMemorySink>) {
        let sink = Arc::new(InMemorySink::new());
        let ops = CartOperations::new(Arc::new(CartRepository::new()), sink.clone());
        (ops, sink)
    }

    fn product(id: &str, cents: i64, quantity: u32) -> Item {
        Item {
            id: id.to_string(),
            name: format!("Product {}", id),
            unit_price: Decimal::new(cents, 2),
            quantity,
        }
    }

    fn endpoint(e: &str) -> Vec<(&'static str, String)> {
        vec![("endpoint", e.to_string())]
    }

    #[test]
    fn test_add_success_telemetry() {
        let (ops, sink) = setup();
        let cart = ops
            .add(Inbound::new("user1", product("1", 2999, 2)).with_request_id("req-1"))
            .unwrap();

        assert_eq!(cart.total, Decimal::new(5998, 2));
        assert_eq!(sink.counters(REQUEST_COUNT), vec![endpoint("/cart/add")]);
        assert_eq!(sink.histograms(REQUEST_LATENCY).len(), 1);

        let logs = sink.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Info);
        assert_eq!(logs[0].message, "Item added to cart");
        assert_eq!(logs[0].fields.user_id.as_deref(), Some("user1"));
        assert_eq!(logs[0].fields.item_id.as_deref(), Some("1"));
        assert_eq!(logs[0].fields.quantity, Some(2));
    }

    #[test]
    fn test_view_missing_cart_telemetry() {
        let (ops, sink) = setup();
        let err = ops.view(Inbound::new("ghost", ())).unwrap_err();

        assert_eq!(err, CartError::NotFound(Entity::Cart));
        assert_eq!(sink.counters(REQUEST_COUNT), vec![endpoint("/cart/view")]);
        assert_eq!(sink.histograms(REQUEST_LATENCY).len(), 1);

        let logs = sink.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Error);
        assert_eq!(logs[0].fields.user_id.as_deref(), Some("ghost"));
        assert_eq!(logs[0].fields.error.as_deref(), Some("cart not found"));
    }

    #[test]
    fn test_missing_user_is_validation_error() {
        let (ops, sink) = setup();
        let inbound = Inbound {
            request_id: None,
            user_id: None,
            parent: Context::new(),
            payload: Ok(product("1", 100, 1)),
        };

        assert_eq!(
            ops.add(inbound),
            Err(CartError::validation("user_id", "must be provided"))
        );
        assert_eq!(ops.view(Inbound::new("", ())).unwrap_err().kind(), crate::error::ErrorKind::Validation);
        assert_eq!(sink.counters(REQUEST_COUNT).len(), 2);
        assert!(sink.logs().iter().all(|l| l.fields.user_id.is_none()));
    }

    #[test]
    fn test_malformed_payload_counted() {
        let (ops, sink) = setup();
        let inbound: Inbound<RemoveItem> = Inbound {
            request_id: None,
            user_id: Some("user1".into()),
            parent: Context::new(),
            payload: Err(CartError::validation("body", "malformed JSON")),
        };

        assert!(ops.remove(inbound).is_err());
        assert_eq!(sink.counters(REQUEST_COUNT), vec![endpoint("/cart/remove")]);
        assert_eq!(sink.logs()[0].fields.user_id.as_deref(), Some("user1"));
    }

    #[test]
    fn test_add_then_remove() {
        let (ops, sink) = setup();
        ops.add(Inbound::new("user1", product("1", 2999, 2))).unwrap();
        let cart = ops
            .remove(Inbound::new("user1", RemoveItem { id: "1".into() }))
            .unwrap();

        assert!(cart.items.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
        assert!(ops.repository().snapshot_item_counts().is_empty());

        let removed = &sink.logs()[1];
        assert_eq!(removed.message, "Item removed from cart");
        assert_eq!(removed.fields.quantity, Some(2));
        assert_eq!(removed.fields.item_count, Some(0));
    }

    #[test]
    fn test_remove_unknown_item() {
        let (ops, _sink) = setup();
        let before = ops.add(Inbound::new("user1", product("1", 2999, 2))).unwrap();

        assert_eq!(
            ops.remove(Inbound::new("user1", RemoveItem { id: "9".into() })),
            Err(CartError::NotFound(Entity::Item))
        );
        assert_eq!(ops.view(Inbound::new("user1", ())).unwrap(), before);
    }

    #[test]
    fn test_failing_sink_never_affects_cart() {
        let (ops, sink) = setup();
        sink.set_failing(true);

        let cart = ops.add(Inbound::new("user1", product("1", 500, 4))).unwrap();
        assert_eq!(cart.total, Decimal::new(2000, 2));
        assert!(ops.remove(Inbound::new("user1", RemoveItem { id: "x".into() })).is_err());
        assert_eq!(ops.repository().snapshot_item_counts().get("user1"), Some(&4));
        assert!(sink.emissions().is_empty());
    }
}
