use serde::{Deserialize, Serialize};

/// Order status in the fulfillment lifecycle.
///
/// `Cancelled` is terminal; the cancelled-to-cancelled self-loop is the
/// only same-state transition the table permits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The targets this status may transition to.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Paid, Cancelled],
            Paid => &[Shipped, Cancelled],
            Shipped => &[Delivered, Cancelled],
            Delivered => &[Cancelled],
            Cancelled => &[Cancelled],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Paid, shipped and delivered orders count as settled sales.
    pub fn is_settled(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Delivered)
    }
}
