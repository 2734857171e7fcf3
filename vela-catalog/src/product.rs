use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use vela_core::Money;

/// An item available for sale.
///
/// Identity is the id alone: equality and hashing ignore the mutable
/// fields, so a product can key collections safely while its stock moves.
/// Name, price and category are fixed at creation; stock changes only
/// through [`reduce_stock`](Product::reduce_stock) and
/// [`add_stock`](Product::add_stock).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub category: String,
}

impl Product {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock: u32,
        category: impl Into<String>,
    ) -> Result<Self, ProductError> {
        let name = name.into();
        let category = category.into();

        if id == 0 {
            return Err(ProductError::InvalidId);
        }
        if name.is_empty() {
            return Err(ProductError::EmptyName);
        }
        if !price.is_positive() {
            return Err(ProductError::NonPositivePrice);
        }
        if category.is_empty() {
            return Err(ProductError::EmptyCategory);
        }

        Ok(Self {
            id,
            name,
            description: description.into(),
            price,
            stock,
            category,
        })
    }

    /// Whether at least `quantity` units are in stock.
    pub fn is_available(&self, quantity: u32) -> Result<bool, ProductError> {
        if quantity == 0 {
            return Err(ProductError::InvalidQuantity);
        }
        Ok(self.stock >= quantity)
    }

    /// Take `quantity` units out of stock. Stock is unchanged on failure.
    pub fn reduce_stock(&mut self, quantity: u32) -> Result<(), ProductError> {
        if quantity == 0 {
            return Err(ProductError::InvalidQuantity);
        }
        if quantity > self.stock {
            return Err(ProductError::InsufficientStock {
                requested: quantity,
                available: self.stock,
            });
        }
        self.stock -= quantity;
        Ok(())
    }

    /// Return `quantity` units to stock.
    pub fn add_stock(&mut self, quantity: u32) -> Result<(), ProductError> {
        if quantity == 0 {
            return Err(ProductError::InvalidQuantity);
        }
        self.stock += quantity;
        Ok(())
    }
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Product {}

impl Hash for Product {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("product id must be positive")]
    InvalidId,

    #[error("product name must not be empty")]
    EmptyName,

    #[error("product category must not be empty")]
    EmptyCategory,

    #[error("product price must be positive")]
    NonPositivePrice,

    #[error("quantity must be a positive integer")]
    InvalidQuantity,

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },
}
