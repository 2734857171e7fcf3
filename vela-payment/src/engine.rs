use crate::gateway::{GatewayError, PaymentGateway, SimulatedGateway, SimulationMarkers};
use crate::pricing::{PaymentConfig, PricingError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use vela_core::Money;

/// Amounts above this are rejected as suspected fraud before any method
/// dispatch.
pub const FRAUD_AMOUNT_LIMIT: Money = Money::from_major_minor(20_000, 0);

const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Supported payment methods, parsed from the tag stored on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    Pix,
}

impl PaymentMethod {
    pub fn parse(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("CREDIT_CARD") {
            Some(PaymentMethod::CreditCard)
        } else if tag.eq_ignore_ascii_case("PIX") {
            Some(PaymentMethod::Pix)
        } else {
            None
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::Pix => "PIX",
        }
    }
}

/// What the customer supplied for the payment attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub card_number: Option<String>,
    pub installments: u32,
    pub pix_key: Option<String>,
}

impl Default for PaymentDetails {
    fn default() -> Self {
        Self {
            card_number: None,
            installments: 1,
            pix_key: None,
        }
    }
}

impl PaymentDetails {
    pub fn card(number: impl Into<String>, installments: u32) -> Self {
        Self {
            card_number: Some(number.into()),
            installments,
            ..Default::default()
        }
    }

    pub fn pix(key: impl Into<String>) -> Self {
        Self {
            pix_key: Some(key.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcomeStatus {
    Approved,
    Rejected,
    Error,
}

/// Result of one authorization attempt.
///
/// `Rejected` is terminal for the attempt; `Error` marks a transient
/// infrastructure failure the caller may retry as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub status: PaymentOutcomeStatus,
    pub message: String,
    pub transaction_id: Option<String>,
}

impl PaymentOutcome {
    fn approved(message: impl Into<String>, transaction_id: String) -> Self {
        Self {
            status: PaymentOutcomeStatus::Approved,
            message: message.into(),
            transaction_id: Some(transaction_id),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: PaymentOutcomeStatus::Rejected,
            message: message.into(),
            transaction_id: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: PaymentOutcomeStatus::Error,
            message: message.into(),
            transaction_id: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == PaymentOutcomeStatus::Approved
    }

    /// The transaction id, present only when the attempt was approved.
    pub fn approved_transaction(&self) -> Option<&str> {
        if self.is_approved() {
            self.transaction_id.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub status: RefundStatus,
    pub message: String,
    pub refund_id: Option<String>,
}

impl RefundOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            status: RefundStatus::Failure,
            message: message.into(),
            refund_id: None,
        }
    }
}

/// Pre-authorization screen applied to every attempt, independent of the
/// method's own approval logic.
#[derive(Debug, Clone)]
pub struct FraudScreen {
    amount_limit: Money,
    markers: SimulationMarkers,
}

impl FraudScreen {
    pub fn new(amount_limit: Money, markers: SimulationMarkers) -> Self {
        Self { amount_limit, markers }
    }

    fn flags(&self, amount: Money, details: &PaymentDetails) -> bool {
        if amount > self.amount_limit {
            return true;
        }
        details
            .card_number
            .as_deref()
            .is_some_and(|card| self.markers.is_suspicious(card))
    }
}

impl Default for FraudScreen {
    fn default() -> Self {
        Self::new(FRAUD_AMOUNT_LIMIT, SimulationMarkers::default())
    }
}

/// Authorizes payments and issues refunds.
///
/// Pricing is pure and lives on [`PaymentConfig`]; this type adds the
/// fraud screen and the deadline-bounded gateway call.
pub struct PaymentEngine {
    config: PaymentConfig,
    fraud: FraudScreen,
    gateway: Arc<dyn PaymentGateway>,
    gateway_timeout: Duration,
}

impl PaymentEngine {
    /// Engine backed by the simulated gateway with default markers.
    pub fn new(config: PaymentConfig) -> Result<Self, PricingError> {
        let markers = SimulationMarkers::default();
        Self::with_gateway(config, Arc::new(SimulatedGateway::new(markers.clone())), markers)
    }

    pub fn with_gateway(
        config: PaymentConfig,
        gateway: Arc<dyn PaymentGateway>,
        markers: SimulationMarkers,
    ) -> Result<Self, PricingError> {
        config.validate()?;
        Ok(Self {
            config,
            fraud: FraudScreen::new(FRAUD_AMOUNT_LIMIT, markers),
            gateway,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        })
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Swap the pricing configuration, keeping gateway and fraud screen.
    pub fn reconfigure(&mut self, config: PaymentConfig) -> Result<(), PricingError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Run one authorization attempt for `amount` with the given method
    /// tag and customer-supplied details.
    pub async fn authorize(
        &self,
        amount: Money,
        method_tag: &str,
        details: &PaymentDetails,
    ) -> PaymentOutcome {
        if !amount.is_positive() {
            return PaymentOutcome::rejected("payment amount must be positive");
        }

        if self.fraud.flags(amount, details) {
            tracing::warn!(%amount, method_tag, "payment flagged by fraud screen");
            return PaymentOutcome::rejected("payment rejected: suspected fraud");
        }

        let outcome = match PaymentMethod::parse(method_tag) {
            Some(PaymentMethod::CreditCard) => self.authorize_card(amount, details).await,
            Some(PaymentMethod::Pix) => self.authorize_pix(amount, details).await,
            None => PaymentOutcome::error(format!("unknown payment method: {method_tag}")),
        };

        tracing::info!(%amount, method_tag, status = ?outcome.status, "authorization finished");
        outcome
    }

    async fn authorize_card(&self, amount: Money, details: &PaymentDetails) -> PaymentOutcome {
        let card_number = match details.card_number.as_deref() {
            Some(card) if !card.is_empty() => card,
            _ => return PaymentOutcome::rejected("card number not provided"),
        };

        match self.bounded(self.gateway.charge_card(card_number, amount)).await {
            Err(outcome) => outcome,
            Ok(transaction_id) => {
                let message = if details.installments > 1 {
                    format!(
                        "card payment of {} approved in {}x of {}",
                        amount,
                        details.installments,
                        amount.split(details.installments)
                    )
                } else {
                    format!("card payment of {amount} approved")
                };
                PaymentOutcome::approved(message, transaction_id)
            }
        }
    }

    async fn authorize_pix(&self, amount: Money, details: &PaymentDetails) -> PaymentOutcome {
        let pix_key = match details.pix_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return PaymentOutcome::rejected("pix key not provided"),
        };

        match self.bounded(self.gateway.charge_pix(pix_key, amount)).await {
            Err(outcome) => outcome,
            Ok(transaction_id) => {
                PaymentOutcome::approved(format!("pix payment of {amount} approved"), transaction_id)
            }
        }
    }

    /// Issue a refund against a previously captured transaction.
    pub async fn refund(&self, transaction_id: &str, amount: Money) -> RefundOutcome {
        if transaction_id.is_empty() {
            return RefundOutcome::failure("original transaction id not provided");
        }
        if !amount.is_positive() {
            return RefundOutcome::failure("refund amount must be positive");
        }

        match self.bounded(self.gateway.refund(transaction_id, amount)).await {
            Err(outcome) => RefundOutcome::failure(outcome.message),
            Ok(refund_id) => RefundOutcome {
                status: RefundStatus::Success,
                message: format!("refund of {amount} for transaction {transaction_id} processed"),
                refund_id: Some(refund_id),
            },
        }
    }

    /// Await a gateway call under the configured deadline, mapping both
    /// an elapsed deadline and a gateway-reported timeout to the transient
    /// error outcome.
    async fn bounded<F>(&self, call: F) -> Result<String, PaymentOutcome>
    where
        F: Future<Output = Result<String, GatewayError>>,
    {
        match tokio::time::timeout(self.gateway_timeout, call).await {
            Err(_) | Ok(Err(GatewayError::Timeout)) => {
                Err(PaymentOutcome::error("payment gateway timed out"))
            }
            Ok(Err(GatewayError::Declined)) => {
                Err(PaymentOutcome::rejected("card authorization failed"))
            }
            Ok(Ok(transaction_id)) => Ok(transaction_id),
        }
    }
}
