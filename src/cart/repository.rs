//! Concurrency-safe cart storage.
//!
//! # Locking
//! Carts live in a sharded `DashMap` keyed by owner. Every mutation takes the
//! write guard of one entry, applies the item change, the total and the
//! item-count projection together, clones the result and releases the guard.
//! Owners in different shards never contend; owners that share a shard contend
//! only for the duration of that in-memory update.
//!
//! The projection sits in the same entry as the items, so a reader holding the
//! shard read lock sees both or neither side of a mutation. All methods are
//! synchronous: a cancelled request future cannot interrupt a critical section.
//!
//! Nothing in here logs or emits telemetry.

use std::collections::HashMap;

use dashmap::DashMap;

use crate::cart::model::{Cart, Item};
use crate::error::{CartError, Entity};

/// Cart plus its derived item-count projection.
#[derive(Debug)]
struct CartEntry {
    cart: Cart,
    /// Sum of `quantity` over `cart.items`. Zero means "absent from the projection".
    item_count: u64,
}

impl CartEntry {
    fn new(owner_id: &str) -> Self {
        Self {
            cart: Cart::new(owner_id),
            item_count: 0,
        }
    }

    /// Append `item`. Nothing changes if the new total would overflow.
    fn push(&mut self, item: Item) -> Result<(), CartError> {
        let total = item
            .line_total()
            .and_then(|line| self.cart.total.checked_add(line))
            .ok_or(CartError::validation("price", "out of range"))?;

        self.cart.total = total;
        self.item_count += u64::from(item.quantity);
        self.cart.items.push(item);
        Ok(())
    }

    /// Remove the earliest line entry with `item_id`.
    fn remove_first(&mut self, item_id: &str) -> Result<Item, CartError> {
        let pos = self
            .cart
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(CartError::NotFound(Entity::Item))?;
        let total = self.cart.items[pos]
            .line_total()
            .and_then(|line| self.cart.total.checked_sub(line))
            .ok_or(CartError::validation("price", "out of range"))?;

        let removed = self.cart.items.remove(pos);
        self.cart.total = total;
        self.item_count -= u64::from(removed.quantity);
        Ok(removed)
    }
}

/// Sole owner of cart state.
#[derive(Debug, Default)]
pub struct CartRepository {
    carts: DashMap<String, CartEntry>,
}

impl CartRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` to the owner's cart, creating the cart on first use.
    ///
    /// A rejected item leaves the cart untouched. A fresh cart always accepts
    /// a valid item, so no empty cart is created on failure.
    pub fn add_item(&self, owner_id: &str, item: Item) -> Result<Cart, CartError> {
        validate_owner(owner_id)?;
        item.validate()?;

        let mut entry = self
            .carts
            .entry(owner_id.to_string())
            .or_insert_with(|| CartEntry::new(owner_id));
        entry.push(item)?;
        let cart = entry.cart.clone();
        drop(entry);

        Ok(cart)
    }

    /// Remove the first line entry whose id is `item_id`.
    ///
    /// Returns the updated cart and the line that was removed.
    pub fn remove_item(&self, owner_id: &str, item_id: &str) -> Result<(Cart, Item), CartError> {
        validate_owner(owner_id)?;
        if item_id.is_empty() {
            return Err(CartError::validation("id", "must not be empty"));
        }

        let mut entry = self
            .carts
            .get_mut(owner_id)
            .ok_or(CartError::NotFound(Entity::Cart))?;
        let removed = entry.remove_first(item_id)?;
        let cart = entry.cart.clone();
        drop(entry);

        Ok((cart, removed))
    }

    /// Return a snapshot of the owner's cart.
    pub fn view_cart(&self, owner_id: &str) -> Result<Cart, CartError> {
        validate_owner(owner_id)?;
        self.carts
            .get(owner_id)
            .map(|entry| entry.cart.clone())
            .ok_or(CartError::NotFound(Entity::Cart))
    }

    /// Per-owner item counts for the `cart_items` gauge.
    ///
    /// Owners whose carts are empty are omitted. Each count is read under the
    /// entry's shard lock, so it always matches a complete mutation.
    pub fn snapshot_item_counts(&self) -> HashMap<String, u64> {
        self.carts
            .iter()
            .filter(|entry| entry.item_count > 0)
            .map(|entry| (entry.key().clone(), entry.item_count))
            .collect()
    }

    /// Number of carts ever created (empty carts included).
    pub fn cart_count(&self) -> usize {
        self.carts.len()
    }
}

fn validate_owner(owner_id: &str) -> Result<(), CartError> {
    if owner_id.is_empty() {
        return Err(CartError::validation("user_id", "must not be empty"));
    }
    Ok(())
}
