//! Cart data model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CartError;

/// One line entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Identifies the item within a cart. Not unique: duplicates are separate lines.
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Price per unit.
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl Item {
    /// Contribution of this line to the cart total, `None` if it overflows.
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    /// Check the constraints an item must satisfy to be inserted.
    pub fn validate(&self) -> Result<(), CartError> {
        if self.id.is_empty() {
            return Err(CartError::validation("id", "must not be empty"));
        }
        if self.quantity == 0 {
            return Err(CartError::validation("quantity", "must be greater than zero"));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(CartError::validation("price", "must not be negative"));
        }
        if self.line_total().is_none() {
            return Err(CartError::validation("price", "out of range"));
        }
        Ok(())
    }
}

/// A user's cart as returned to callers.
///
/// `total` always equals the sum of the line totals over `items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub items: Vec<Item>,
    pub total: Decimal,
}

impl Cart {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            items: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// Sum of quantities over all line entries.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, cents: i64, quantity: u32) -> Item {
        Item {
            id: id.to_string(),
            name: format!("Product {}", id),
            unit_price: Decimal::new(cents, 2),
            quantity,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item("1", 2999, 2).line_total(), Some(Decimal::new(5998, 2)));

        let huge = Item { unit_price: Decimal::MAX, ..item("1", 0, 2) };
        assert_eq!(huge.line_total(), None);
    }

    #[test]
    fn test_validate() {
        assert!(item("1", 2999, 1).validate().is_ok());
        assert!(item("1", 0, 1).validate().is_ok());
        assert_eq!(
            item("1", 2999, 0).validate(),
            Err(CartError::validation("quantity", "must be greater than zero"))
        );
        assert_eq!(
            item("", 2999, 1).validate(),
            Err(CartError::validation("id", "must not be empty"))
        );
        assert_eq!(
            item("1", -1, 1).validate(),
            Err(CartError::validation("price", "must not be negative"))
        );

        let huge = Item { unit_price: Decimal::MAX, ..item("1", 0, 2) };
        assert_eq!(huge.validate(), Err(CartError::validation("price", "out of range")));
    }

    #[test]
    fn test_wire_format() {
        let parsed: Item = serde_json::from_str(
            r#"{"id":"1","name":"Product 1","price":29.99,"quantity":2}"#,
        )
        .unwrap();
        assert_eq!(parsed, item("1", 2999, 2));

        let mut cart = Cart::new("user1");
        cart.total = parsed.line_total().unwrap();
        cart.items.push(parsed);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["user_id"], "user1");
        assert_eq!(json["items"][0]["price"], serde_json::json!(29.99));
        assert_eq!(json["total"], serde_json::json!(59.98));
    }
}
