pub mod lifecycle;
pub mod models;

pub use lifecycle::OrderStatus;
pub use models::{Address, Order, OrderError, OrderLine, OrderTimestamps};
