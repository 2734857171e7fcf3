use crate::lifecycle::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vela_core::Money;

/// Orders over this nominal total ship free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_major_minor(200, 0);

/// Flat shipping fee below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Money = Money::from_major_minor(25, 0);

/// Delivery address attached to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
}

/// One purchased line, snapshotted from the cart at order creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: u64,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Timestamps for the closed set of lifecycle events. Each is stamped at
/// most once per transition into the matching status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTimestamps {
    pub created: DateTime<Utc>,
    pub paid: Option<DateTime<Utc>>,
    pub shipped: Option<DateTime<Utc>>,
    pub delivered: Option<DateTime<Utc>>,
    pub cancelled: Option<DateTime<Utc>>,
}

impl OrderTimestamps {
    fn at_creation() -> Self {
        Self {
            created: Utc::now(),
            paid: None,
            shipped: None,
            delivered: None,
            cancelled: None,
        }
    }
}

/// A finalized purchase: an immutable line snapshot plus mutable payment
/// and fulfillment state.
///
/// Orders are never deleted; the only way out is the cancelled state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub customer_id: String,
    lines: Vec<OrderLine>,
    total: Money,
    pub address: Address,
    pub payment_method: String,
    status: OrderStatus,
    pub timestamps: OrderTimestamps,
    transaction_id: Option<String>,
    amount_paid: Option<Money>,
}

impl Order {
    pub fn new(
        id: u64,
        customer_id: impl Into<String>,
        lines: Vec<OrderLine>,
        address: Address,
        payment_method: impl Into<String>,
    ) -> Result<Self, OrderError> {
        let customer_id = customer_id.into();
        let payment_method = payment_method.into();

        if id == 0 {
            return Err(OrderError::InvalidId);
        }
        if customer_id.is_empty() {
            return Err(OrderError::EmptyCustomer);
        }
        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if payment_method.is_empty() {
            return Err(OrderError::MissingPaymentMethod);
        }

        let total = lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.line_total());

        Ok(Self {
            id,
            customer_id,
            lines,
            total,
            address,
            payment_method,
            status: OrderStatus::Pending,
            timestamps: OrderTimestamps::at_creation(),
            transaction_id: None,
            amount_paid: None,
        })
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Nominal total computed from the line snapshot, before any
    /// method-specific fee or discount.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// The amount actually captured, which may differ from the nominal
    /// total through installment interest or pix discount.
    pub fn amount_paid(&self) -> Option<Money> {
        self.amount_paid
    }

    /// Attempt a status transition per the lifecycle table.
    ///
    /// Returns false without mutating anything when the target is not
    /// reachable from the current status. On success the matching event
    /// timestamp is stamped.
    pub fn transition(&mut self, target: OrderStatus) -> bool {
        if !self.status.can_transition_to(target) {
            return false;
        }

        self.status = target;
        let now = Utc::now();
        match target {
            OrderStatus::Paid => self.timestamps.paid = Some(now),
            OrderStatus::Shipped => self.timestamps.shipped = Some(now),
            OrderStatus::Delivered => self.timestamps.delivered = Some(now),
            OrderStatus::Cancelled => self.timestamps.cancelled = Some(now),
            OrderStatus::Pending => {}
        }
        true
    }

    /// Record the captured payment and move to `Paid`.
    ///
    /// Callers must only invoke this once, on a pending order; the
    /// orchestrator checks that precondition before calling.
    pub fn register_payment(&mut self, transaction_id: impl Into<String>, amount_paid: Money) -> bool {
        self.transaction_id = Some(transaction_id.into());
        self.amount_paid = Some(amount_paid);
        self.transition(OrderStatus::Paid)
    }

    /// An invoice can be issued only once the order has been paid for.
    pub fn invoice_eligible(&self) -> bool {
        self.status.is_settled()
    }

    /// Flat fee below the free-shipping threshold, zero above it.
    pub fn shipping_fee(&self) -> Money {
        if self.total > FREE_SHIPPING_THRESHOLD {
            Money::zero()
        } else {
            FLAT_SHIPPING_FEE
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order id must be positive")]
    InvalidId,

    #[error("customer id must not be empty")]
    EmptyCustomer,

    #[error("an order requires at least one line")]
    EmptyOrder,

    #[error("a payment method must be chosen")]
    MissingPaymentMethod,
}
