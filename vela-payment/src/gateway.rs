use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vela_core::Money;

/// Trigger substrings that drive simulated gateway outcomes.
///
/// The simulation policy lives here, in one named place, so swapping the
/// simulated gateway for a real adapter removes every trigger with it.
/// A card identifier containing one of these substrings produces the
/// matching outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationMarkers {
    pub suspicious: String,
    pub timeout: String,
    pub declined: String,
}

impl Default for SimulationMarkers {
    fn default() -> Self {
        Self {
            suspicious: "suspicious_card".to_string(),
            timeout: "timeout".to_string(),
            declined: "declined".to_string(),
        }
    }
}

impl SimulationMarkers {
    pub fn is_suspicious(&self, card_number: &str) -> bool {
        card_number.contains(&self.suspicious)
    }

    pub fn simulates_timeout(&self, card_number: &str) -> bool {
        card_number.contains(&self.timeout)
    }

    pub fn simulates_decline(&self, card_number: &str) -> bool {
        card_number.contains(&self.declined)
    }
}

/// Seam between the payment engine and whatever settles the charge.
///
/// Implementations return a fresh transaction id on success. In a real
/// integration these calls cross the network; the engine bounds them with
/// a deadline and maps the expiry to its transient error outcome.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge_card(&self, card_number: &str, amount: Money) -> Result<String, GatewayError>;

    async fn charge_pix(&self, pix_key: &str, amount: Money) -> Result<String, GatewayError>;

    async fn refund(&self, transaction_id: &str, amount: Money) -> Result<String, GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway timed out")]
    Timeout,

    #[error("card authorization failed")]
    Declined,
}

/// Gateway simulation used in place of a real payment provider.
///
/// Outcomes are decided by [`SimulationMarkers`] embedded in the card
/// identifier; ids are random so repeated charges for the same identifier
/// and amount never collide.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    markers: SimulationMarkers,
}

impl SimulatedGateway {
    pub fn new(markers: SimulationMarkers) -> Self {
        Self { markers }
    }

    fn fresh_id(prefix: &str) -> String {
        format!("{}-{}", prefix, Uuid::new_v4().simple())
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge_card(&self, card_number: &str, amount: Money) -> Result<String, GatewayError> {
        if self.markers.simulates_timeout(card_number) {
            return Err(GatewayError::Timeout);
        }
        if self.markers.simulates_decline(card_number) {
            return Err(GatewayError::Declined);
        }

        tracing::debug!(%amount, "simulated card charge approved");
        Ok(Self::fresh_id("CARD"))
    }

    async fn charge_pix(&self, _pix_key: &str, amount: Money) -> Result<String, GatewayError> {
        tracing::debug!(%amount, "simulated pix charge approved");
        Ok(Self::fresh_id("PIX"))
    }

    async fn refund(&self, transaction_id: &str, amount: Money) -> Result<String, GatewayError> {
        tracing::debug!(transaction_id, %amount, "simulated refund issued");
        Ok(Self::fresh_id("RFN"))
    }
}
