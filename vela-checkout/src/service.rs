use crate::users::{UserDirectory, UserError, UserProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vela_cart::Cart;
use vela_catalog::{CatalogError, ProductCatalog};
use vela_core::{IdSequence, Money};
use vela_order::{Address, Order, OrderError, OrderLine, OrderStatus};
use vela_payment::{
    PaymentConfig, PaymentDetails, PaymentEngine, PaymentMethod, PaymentOutcome,
    PaymentOutcomeStatus, PricingError,
};

/// Overall result of one settlement attempt.
///
/// `ApprovedWithStockError` marks the recognized partial-failure state:
/// payment captured, stock commit incomplete, manual reconciliation
/// required. It is never silently collapsed into plain approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Approved,
    ApprovedWithStockError,
    Rejected,
    Error,
}

/// Detail of a failed stock commit, enough to reconcile by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockIssue {
    pub order_id: u64,
    pub product_id: u64,
    pub requested: u32,
    /// `None` when the product is missing from the catalog altogether.
    pub available: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub status: SettlementStatus,
    pub message: String,
    pub transaction_id: Option<String>,
    pub stock_issue: Option<StockIssue>,
}

impl SettlementOutcome {
    /// Pass a rejected or errored authorization through unchanged.
    fn from_authorization(outcome: PaymentOutcome) -> Self {
        let status = match outcome.status {
            PaymentOutcomeStatus::Rejected => SettlementStatus::Rejected,
            _ => SettlementStatus::Error,
        };
        Self {
            status,
            message: outcome.message,
            transaction_id: None,
            stock_issue: None,
        }
    }
}

/// One line of the sales report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: u64,
    pub customer_id: String,
    pub status: OrderStatus,
    pub total: Money,
    pub amount_paid: Option<Money>,
}

/// Aggregated sales figures over the order registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReport {
    pub total_settled: Money,
    pub settled_count: usize,
    pub orders: Vec<OrderSummary>,
}

/// Composes catalog, cart, payment engine and order lifecycle into the
/// checkout workflows.
///
/// All mutation goes through `&mut self`, so check-then-mutate sequences
/// (stock sufficiency, pending-only settlement) are exclusive within one
/// service value. Deployments sharing a service across tasks put it
/// behind an async lock at the outer layer.
pub struct CheckoutService {
    catalog: ProductCatalog,
    users: UserDirectory,
    payments: PaymentEngine,
    orders: HashMap<u64, Order>,
    order_ids: IdSequence,
}

impl CheckoutService {
    pub fn new(config: PaymentConfig) -> Result<Self, CheckoutError> {
        Ok(Self::with_engine(PaymentEngine::new(config)?))
    }

    pub fn with_engine(payments: PaymentEngine) -> Self {
        Self {
            catalog: ProductCatalog::new(),
            users: UserDirectory::new(),
            payments,
            orders: HashMap::new(),
            order_ids: IdSequence::new(),
        }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut ProductCatalog {
        &mut self.catalog
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn order(&self, order_id: u64) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Register a product in the catalog and return its assigned id.
    pub fn add_product(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock: u32,
        category: impl Into<String>,
    ) -> Result<u64, CheckoutError> {
        let product = self
            .catalog
            .add_product(name, description, price, stock, category)?;
        Ok(product.id)
    }

    pub fn register_user(
        &mut self,
        user_id: impl Into<String>,
        profile: UserProfile,
    ) -> Result<(), CheckoutError> {
        self.users.register(user_id, profile)?;
        Ok(())
    }

    /// Swap the payment pricing configuration.
    pub fn configure_payments(&mut self, config: PaymentConfig) -> Result<(), CheckoutError> {
        self.payments.reconfigure(config)?;
        Ok(())
    }

    /// Snapshot the cart into a new pending order and return its id.
    ///
    /// The registry is unchanged when the customer is unknown or the cart
    /// is empty.
    pub fn create_order(
        &mut self,
        customer_id: &str,
        cart: &Cart,
        address: Address,
        payment_method: impl Into<String>,
    ) -> Result<u64, CheckoutError> {
        if !self.users.exists(customer_id) {
            return Err(CheckoutError::UnknownCustomer(customer_id.to_string()));
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let lines: Vec<OrderLine> = cart
            .lines()
            .map(|line| OrderLine {
                product_id: line.product_id,
                name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();

        let order_id = self.order_ids.peek();
        let order = Order::new(order_id, customer_id, lines, address, payment_method)?;
        self.order_ids.next_id();
        self.orders.insert(order_id, order);

        tracing::info!(order_id, customer_id, "order created");
        Ok(order_id)
    }

    /// Authorize payment for a pending order and, on approval, commit the
    /// sale: record the payment and decrement stock for every line.
    ///
    /// The amount due is re-derived from the order's nominal total and its
    /// payment method; the caller's details supply only the installment
    /// count and the card/pix identifiers.
    pub async fn settle(
        &mut self,
        order_id: u64,
        details: &PaymentDetails,
    ) -> Result<SettlementOutcome, CheckoutError> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        if order.status() != OrderStatus::Pending {
            return Err(CheckoutError::NotPending { order_id, status: order.status() });
        }

        let amount_due = match PaymentMethod::parse(&order.payment_method) {
            Some(PaymentMethod::Pix) => self.payments.config().pix_price(order.total())?,
            Some(PaymentMethod::CreditCard) => {
                self.payments
                    .config()
                    .installment_price(order.total(), details.installments)?
                    .total
            }
            // Unknown tags flow through so authorization surfaces them.
            None => order.total(),
        };

        let outcome = self
            .payments
            .authorize(amount_due, &order.payment_method, details)
            .await;

        let Some(transaction_id) = outcome.approved_transaction().map(str::to_string) else {
            tracing::info!(order_id, status = ?outcome.status, "settlement not approved");
            return Ok(SettlementOutcome::from_authorization(outcome));
        };

        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        order.register_payment(&transaction_id, amount_due);
        tracing::info!(order_id, %amount_due, %transaction_id, "payment captured");

        let lines: Vec<(u64, u32)> = order
            .lines()
            .iter()
            .map(|line| (line.product_id, line.quantity))
            .collect();

        // Commit stock line by line; the first failure stops the commit
        // and downgrades the outcome, leaving earlier lines committed.
        let mut stock_issue = None;
        for (product_id, quantity) in lines {
            if let Err(err) = self.catalog.decrement_stock(product_id, quantity) {
                stock_issue = Some(match err {
                    CatalogError::InsufficientStock { product_id, requested, available } => {
                        StockIssue { order_id, product_id, requested, available: Some(available) }
                    }
                    _ => StockIssue { order_id, product_id, requested: quantity, available: None },
                });
                break;
            }
        }

        match stock_issue {
            None => Ok(SettlementOutcome {
                status: SettlementStatus::Approved,
                message: outcome.message,
                transaction_id: Some(transaction_id),
                stock_issue: None,
            }),
            Some(issue) => {
                tracing::warn!(
                    order_id,
                    product_id = issue.product_id,
                    requested = issue.requested,
                    available = ?issue.available,
                    "stock commit failed after payment capture"
                );
                Ok(SettlementOutcome {
                    status: SettlementStatus::ApprovedWithStockError,
                    message: format!(
                        "{}; stock commit failed for product {}",
                        outcome.message, issue.product_id
                    ),
                    transaction_id: Some(transaction_id),
                    stock_issue: Some(issue),
                })
            }
        }
    }

    /// Mark a paid order as shipped.
    pub fn mark_shipped(&mut self, order_id: u64) -> Result<(), CheckoutError> {
        self.advance(order_id, OrderStatus::Shipped)
    }

    /// Mark a shipped order as delivered.
    pub fn mark_delivered(&mut self, order_id: u64) -> Result<(), CheckoutError> {
        self.advance(order_id, OrderStatus::Delivered)
    }

    fn advance(&mut self, order_id: u64, target: OrderStatus) -> Result<(), CheckoutError> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        let from = order.status();
        if !order.transition(target) {
            return Err(CheckoutError::InvalidTransition { order_id, from, to: target });
        }
        tracing::info!(order_id, ?from, ?target, "order fulfillment advanced");
        Ok(())
    }

    /// Cancel an order, restoring stock when the prior status had already
    /// committed it (paid or shipped). Pending orders never touched stock
    /// and delivered orders are intentionally not restocked.
    pub fn cancel(&mut self, order_id: u64) -> Result<(), CheckoutError> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        let prior = order.status();
        if !order.transition(OrderStatus::Cancelled) {
            return Err(CheckoutError::InvalidTransition {
                order_id,
                from: prior,
                to: OrderStatus::Cancelled,
            });
        }

        if matches!(prior, OrderStatus::Paid | OrderStatus::Shipped) {
            let lines: Vec<(u64, u32)> = order
                .lines()
                .iter()
                .map(|line| (line.product_id, line.quantity))
                .collect();
            for (product_id, quantity) in lines {
                if let Err(err) = self.catalog.increment_stock(product_id, quantity) {
                    tracing::warn!(order_id, product_id, %err, "restock failed on cancellation");
                }
            }
        }

        tracing::info!(order_id, ?prior, "order cancelled");
        Ok(())
    }

    /// Sales report over the registry, optionally filtered by status.
    ///
    /// Settled means paid, shipped or delivered; the total sums only
    /// orders with a recorded paid amount.
    pub fn report(&self, status_filter: Option<OrderStatus>) -> SalesReport {
        let mut total_settled = Money::zero();
        let mut settled_count = 0;
        let mut orders = Vec::new();

        for order in self.orders.values() {
            if let Some(filter) = status_filter {
                if order.status() != filter {
                    continue;
                }
            }

            if order.status().is_settled() {
                settled_count += 1;
                if let Some(paid) = order.amount_paid() {
                    total_settled += paid;
                }
            }

            orders.push(OrderSummary {
                order_id: order.id,
                customer_id: order.customer_id.clone(),
                status: order.status(),
                total: order.total(),
                amount_paid: order.amount_paid(),
            });
        }

        orders.sort_by_key(|summary| summary.order_id);
        SalesReport { total_settled, settled_count, orders }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("customer not registered: {0}")]
    UnknownCustomer(String),

    #[error("cannot create an order from an empty cart")]
    EmptyCart,

    #[error("order not found: {0}")]
    OrderNotFound(u64),

    #[error("order {order_id} is not pending (status: {status:?})")]
    NotPending { order_id: u64, status: OrderStatus },

    #[error("order {order_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        order_id: u64,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            street: "1 Test Street".to_string(),
            city: "Testville".to_string(),
            postal_code: "12345-000".to_string(),
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    /// Service with one registered customer and two catalog products.
    fn service() -> CheckoutService {
        let mut service = CheckoutService::new(PaymentConfig::default()).unwrap();
        service.register_user("alice-1", profile()).unwrap();
        service
            .add_product("Smartphone", "Latest generation", Money::from_major_minor(3000, 0), 10, "Phones")
            .unwrap();
        service
            .add_product("Headphones", "Wireless", Money::from_major_minor(150, 0), 5, "Audio")
            .unwrap();
        service
    }

    fn cart_with(service: &CheckoutService, product_id: u64, quantity: u32) -> Cart {
        let mut cart = Cart::new();
        let product = service.catalog().get(product_id).unwrap();
        cart.add(product, quantity).unwrap();
        cart
    }

    #[test]
    fn test_create_order_requires_known_customer_and_lines() {
        let mut service = service();
        let cart = cart_with(&service, 1, 1);

        let err = service
            .create_order("ghost", &cart, address(), "PIX")
            .unwrap_err();
        assert!(matches!(err, CheckoutError::UnknownCustomer(_)));

        let err = service
            .create_order("alice-1", &Cart::new(), address(), "PIX")
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));

        // Nothing was registered, so the first real order still gets id 1
        let order_id = service
            .create_order("alice-1", &cart, address(), "PIX")
            .unwrap();
        assert_eq!(order_id, 1);
        assert_eq!(service.order(1).unwrap().status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_settle_unknown_or_non_pending_order() {
        let mut service = service();
        let cart = cart_with(&service, 2, 1);
        let order_id = service
            .create_order("alice-1", &cart, address(), "PIX")
            .unwrap();

        assert!(matches!(
            service.settle(99, &PaymentDetails::pix("k@x.com")).await,
            Err(CheckoutError::OrderNotFound(99))
        ));

        service
            .settle(order_id, &PaymentDetails::pix("k@x.com"))
            .await
            .unwrap();

        // Second attempt hits the pending-only guard
        let err = service
            .settle(order_id, &PaymentDetails::pix("k@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::NotPending { status: OrderStatus::Paid, .. }
        ));
    }

    #[tokio::test]
    async fn test_settle_pix_derives_discounted_amount_and_commits_stock() {
        let mut service = service();
        let cart = cart_with(&service, 2, 2); // 2 x $150.00
        let order_id = service
            .create_order("alice-1", &cart, address(), "PIX")
            .unwrap();

        let outcome = service
            .settle(order_id, &PaymentDetails::pix("alice@pix.com"))
            .await
            .unwrap();
        assert_eq!(outcome.status, SettlementStatus::Approved);

        let order = service.order(order_id).unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);
        // $300.00 minus the 10% pix discount
        assert_eq!(order.amount_paid(), Some(Money::from_major_minor(270, 0)));
        assert_eq!(service.catalog().get(2).unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_settle_card_derives_installment_total() {
        let mut service = service();
        let cart = cart_with(&service, 1, 1); // $3000.00
        let order_id = service
            .create_order("alice-1", &cart, address(), "CREDIT_CARD")
            .unwrap();

        let outcome = service
            .settle(order_id, &PaymentDetails::card("4111222233334444", 3))
            .await
            .unwrap();
        assert_eq!(outcome.status, SettlementStatus::Approved);

        // $3000.00 plus 5% flat installment interest
        let order = service.order(order_id).unwrap();
        assert_eq!(order.amount_paid(), Some(Money::from_major_minor(3150, 0)));
    }

    #[tokio::test]
    async fn test_rejected_settlement_changes_nothing() {
        let mut service = service();
        let cart = cart_with(&service, 1, 1);
        let order_id = service
            .create_order("alice-1", &cart, address(), "CREDIT_CARD")
            .unwrap();

        let outcome = service
            .settle(order_id, &PaymentDetails::card("4111_declined_1", 1))
            .await
            .unwrap();
        assert_eq!(outcome.status, SettlementStatus::Rejected);

        assert_eq!(service.order(order_id).unwrap().status(), OrderStatus::Pending);
        assert_eq!(service.catalog().get(1).unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_stock_shortfall_after_capture_downgrades_outcome() {
        let mut service = service();
        let cart = cart_with(&service, 2, 2);
        let order_id = service
            .create_order("alice-1", &cart, address(), "PIX")
            .unwrap();

        // Stock drains between order creation and settlement
        service.catalog_mut().decrement_stock(2, 4).unwrap();

        let outcome = service
            .settle(order_id, &PaymentDetails::pix("alice@pix.com"))
            .await
            .unwrap();
        assert_eq!(outcome.status, SettlementStatus::ApprovedWithStockError);

        let issue = outcome.stock_issue.unwrap();
        assert_eq!(issue.order_id, order_id);
        assert_eq!(issue.product_id, 2);
        assert_eq!(issue.requested, 2);
        assert_eq!(issue.available, Some(1));

        // Payment stays captured; the order is paid
        assert_eq!(service.order(order_id).unwrap().status(), OrderStatus::Paid);
        assert_eq!(service.catalog().get(2).unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_cancel_paid_order_restores_stock() {
        let mut service = service();
        let cart = cart_with(&service, 2, 2);
        let order_id = service
            .create_order("alice-1", &cart, address(), "PIX")
            .unwrap();

        service
            .settle(order_id, &PaymentDetails::pix("alice@pix.com"))
            .await
            .unwrap();
        assert_eq!(service.catalog().get(2).unwrap().stock, 3);

        service.cancel(order_id).unwrap();
        assert_eq!(service.order(order_id).unwrap().status(), OrderStatus::Cancelled);
        assert_eq!(service.catalog().get(2).unwrap().stock, 5);
    }

    #[test]
    fn test_cancel_pending_order_leaves_stock_alone() {
        let mut service = service();
        let cart = cart_with(&service, 2, 3);
        let order_id = service
            .create_order("alice-1", &cart, address(), "CREDIT_CARD")
            .unwrap();

        service.cancel(order_id).unwrap();
        assert_eq!(service.order(order_id).unwrap().status(), OrderStatus::Cancelled);
        assert_eq!(service.catalog().get(2).unwrap().stock, 5);

        assert!(matches!(service.cancel(42), Err(CheckoutError::OrderNotFound(42))));
    }

    #[tokio::test]
    async fn test_cancel_delivered_order_does_not_restock() {
        let mut service = service();
        let cart = cart_with(&service, 2, 1);
        let order_id = service
            .create_order("alice-1", &cart, address(), "PIX")
            .unwrap();
        service
            .settle(order_id, &PaymentDetails::pix("alice@pix.com"))
            .await
            .unwrap();

        service.mark_shipped(order_id).unwrap();
        service.mark_delivered(order_id).unwrap();

        service.cancel(order_id).unwrap();
        assert_eq!(service.order(order_id).unwrap().status(), OrderStatus::Cancelled);
        // Stock stays where settlement left it
        assert_eq!(service.catalog().get(2).unwrap().stock, 4);
    }

    #[tokio::test]
    async fn test_fulfillment_progression_is_status_gated() {
        let mut service = service();
        let cart = cart_with(&service, 2, 1);
        let order_id = service
            .create_order("alice-1", &cart, address(), "PIX")
            .unwrap();

        // Cannot ship an unpaid order
        let err = service.mark_shipped(order_id).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidTransition { from: OrderStatus::Pending, to: OrderStatus::Shipped, .. }
        ));

        service
            .settle(order_id, &PaymentDetails::pix("alice@pix.com"))
            .await
            .unwrap();
        service.mark_shipped(order_id).unwrap();
        service.mark_delivered(order_id).unwrap();
        assert_eq!(service.order(order_id).unwrap().status(), OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_report_totals_and_filter() {
        let mut service = service();

        let paid_cart = cart_with(&service, 2, 2);
        let paid_id = service
            .create_order("alice-1", &paid_cart, address(), "PIX")
            .unwrap();
        service
            .settle(paid_id, &PaymentDetails::pix("alice@pix.com"))
            .await
            .unwrap();

        let pending_cart = cart_with(&service, 1, 1);
        service
            .create_order("alice-1", &pending_cart, address(), "CREDIT_CARD")
            .unwrap();

        let report = service.report(None);
        assert_eq!(report.settled_count, 1);
        assert_eq!(report.total_settled, Money::from_major_minor(270, 0));
        assert_eq!(report.orders.len(), 2);

        let pending_only = service.report(Some(OrderStatus::Pending));
        assert_eq!(pending_only.settled_count, 0);
        assert_eq!(pending_only.total_settled, Money::zero());
        assert_eq!(pending_only.orders.len(), 1);
    }

    #[tokio::test]
    async fn test_configure_payments_changes_derived_amounts() {
        let mut service = service();
        service
            .configure_payments(PaymentConfig {
                pix_discount_rate: 0.5,
                ..Default::default()
            })
            .unwrap();

        let cart = cart_with(&service, 2, 2); // $300.00
        let order_id = service
            .create_order("alice-1", &cart, address(), "PIX")
            .unwrap();
        service
            .settle(order_id, &PaymentDetails::pix("alice@pix.com"))
            .await
            .unwrap();

        assert_eq!(
            service.order(order_id).unwrap().amount_paid(),
            Some(Money::from_major_minor(150, 0))
        );
    }
}
