pub mod cart;

pub use cart::{Cart, CartError, CartLine};
