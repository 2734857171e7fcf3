pub mod service;
pub mod users;

pub use service::{
    CheckoutError, CheckoutService, OrderSummary, SalesReport, SettlementOutcome,
    SettlementStatus, StockIssue,
};
pub use users::{UserDirectory, UserError, UserProfile};
