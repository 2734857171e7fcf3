use crate::product::{Product, ProductError};
use std::collections::HashMap;
use vela_core::{IdSequence, Money};

/// In-memory product store keyed by product id.
///
/// Owns the product id sequence; every stock mutation goes through
/// [`decrement_stock`](ProductCatalog::decrement_stock) and
/// [`increment_stock`](ProductCatalog::increment_stock) so sufficiency is
/// checked in one place.
#[derive(Debug, Default)]
pub struct ProductCatalog {
    products: HashMap<u64, Product>,
    ids: IdSequence,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self {
            products: HashMap::new(),
            ids: IdSequence::new(),
        }
    }

    /// Register a product under the next id and return it.
    pub fn add_product(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock: u32,
        category: impl Into<String>,
    ) -> Result<&Product, CatalogError> {
        let id = self.ids.next_id();
        let product = Product::new(id, name, description, price, stock, category)?;
        Ok(&*self.products.entry(id).or_insert(product))
    }

    pub fn get(&self, id: u64) -> Option<&Product> {
        self.products.get(&id)
    }

    /// Case-insensitive substring search over name and description, with an
    /// optional exact-category filter.
    pub fn search(&self, term: &str, category: Option<&str>) -> Vec<&Product> {
        let term = term.to_lowercase();
        self.products
            .values()
            .filter(|p| {
                p.name.to_lowercase().contains(&term)
                    || p.description.to_lowercase().contains(&term)
            })
            .filter(|p| match category {
                Some(c) => p.category.eq_ignore_ascii_case(c),
                None => true,
            })
            .collect()
    }

    /// Commit a sale: take `quantity` units out of stock.
    ///
    /// Stock is unchanged when the product is missing or short.
    pub fn decrement_stock(&mut self, id: u64, quantity: u32) -> Result<(), CatalogError> {
        let product = self
            .products
            .get_mut(&id)
            .ok_or(CatalogError::NotFound(id))?;

        product.reduce_stock(quantity).map_err(|err| match err {
            ProductError::InsufficientStock { requested, available } => {
                CatalogError::InsufficientStock { product_id: id, requested, available }
            }
            other => CatalogError::Product(other),
        })?;

        tracing::debug!(product_id = id, quantity, stock = product.stock, "stock decremented");
        Ok(())
    }

    /// Reverse a committed sale: return `quantity` units to stock.
    pub fn increment_stock(&mut self, id: u64, quantity: u32) -> Result<(), CatalogError> {
        let product = self
            .products
            .get_mut(&id)
            .ok_or(CatalogError::NotFound(id))?;

        product.add_stock(quantity)?;
        tracing::debug!(product_id = id, quantity, stock = product.stock, "stock incremented");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    NotFound(u64),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: u64,
        requested: u32,
        available: u32,
    },

    #[error(transparent)]
    Product(#[from] ProductError),
}
