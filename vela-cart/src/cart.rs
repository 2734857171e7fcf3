use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vela_catalog::Product;
use vela_core::Money;

/// One desired line in a cart.
///
/// Name and unit price are snapshotted at insertion; prices are immutable
/// in this core, so line totals stay consistent without a catalog lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: u64,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Desired quantities keyed by product id, validated against live stock.
///
/// The cart never reserves or mutates stock; callers look the product up
/// in the catalog and pass it in wherever a stock check is needed. Failed
/// operations leave the cart untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: BTreeMap<u64, CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self { lines: BTreeMap::new() }
    }

    /// Add `quantity` units of `product`, checking the cumulative quantity
    /// against the product's current stock.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let in_cart = self.quantity_of(product.id).unwrap_or(0);
        let desired = in_cart + quantity;
        if product.stock < desired {
            return Err(CartError::InsufficientStock {
                product_id: product.id,
                requested: desired,
                available: product.stock,
            });
        }

        self.lines
            .entry(product.id)
            .and_modify(|line| line.quantity = desired)
            .or_insert_with(|| CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity,
            });
        Ok(())
    }

    /// Remove `quantity` units; the line disappears when it reaches zero.
    pub fn remove(&mut self, product_id: u64, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let line = self
            .lines
            .get_mut(&product_id)
            .ok_or(CartError::ItemNotFound(product_id))?;

        if quantity >= line.quantity {
            self.lines.remove(&product_id);
        } else {
            line.quantity -= quantity;
        }
        Ok(())
    }

    /// Set the line to exactly `quantity` units. Zero deletes the line
    /// (a no-op when absent); a positive value requires that much stock.
    pub fn set_quantity(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            self.lines.remove(&product.id);
            return Ok(());
        }

        if product.stock < quantity {
            return Err(CartError::InsufficientStock {
                product_id: product.id,
                requested: quantity,
                available: product.stock,
            });
        }

        self.lines
            .entry(product.id)
            .and_modify(|line| line.quantity = quantity)
            .or_insert_with(|| CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity,
            });
        Ok(())
    }

    /// Sum of unit price times quantity over all lines.
    pub fn total(&self) -> Money {
        self.lines
            .values()
            .fold(Money::zero(), |acc, line| acc + line.line_total())
    }

    /// The discount amount for a percentage in `[0, 100]`. Does not mutate
    /// the cart.
    pub fn discount(&self, pct: f64) -> Result<Money, CartError> {
        if !(0.0..=100.0).contains(&pct) {
            return Err(CartError::InvalidDiscount(pct));
        }
        Ok(self.total().percent_of(pct))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    pub fn quantity_of(&self, product_id: u64) -> Option<u32> {
        self.lines.get(&product_id).map(|line| line.quantity)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("quantity must be a positive integer")]
    InvalidQuantity,

    #[error("cannot hold {requested} units of product {product_id}: only {available} in stock")]
    InsufficientStock {
        product_id: u64,
        requested: u32,
        available: u32,
    },

    #[error("product not in cart: {0}")]
    ItemNotFound(u64),

    #[error("discount percentage must be between 0 and 100, got {0}")]
    InvalidDiscount(f64),
}
