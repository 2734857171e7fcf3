use serde::{Deserialize, Serialize};
use vela_core::Money;

/// Flat interest applied once when a card payment is split into more than
/// one installment.
pub const DEFAULT_INSTALLMENT_INTEREST: f64 = 0.05;

/// Discount applied to pix payments.
pub const DEFAULT_PIX_DISCOUNT: f64 = 0.10;

/// Method-specific pricing rates, both in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub installment_interest_rate: f64,
    pub pix_discount_rate: f64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            installment_interest_rate: DEFAULT_INSTALLMENT_INTEREST,
            pix_discount_rate: DEFAULT_PIX_DISCOUNT,
        }
    }
}

/// Total and per-installment amounts for a card payment in installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentQuote {
    pub total: Money,
    pub per_installment: Money,
}

impl PaymentConfig {
    pub fn validate(&self) -> Result<(), PricingError> {
        if !(0.0..=1.0).contains(&self.installment_interest_rate) {
            return Err(PricingError::InvalidRate(self.installment_interest_rate));
        }
        if !(0.0..=1.0).contains(&self.pix_discount_rate) {
            return Err(PricingError::InvalidRate(self.pix_discount_rate));
        }
        Ok(())
    }

    /// A single up-front card payment carries no fee or discount.
    pub fn cash_card_price(&self, amount: Money) -> Result<Money, PricingError> {
        if amount.cents() < 0 {
            return Err(PricingError::NegativeAmount);
        }
        Ok(amount)
    }

    /// Price a card payment in `installments` parts.
    ///
    /// Interest is flat, applied once, and only when there is more than one
    /// installment and the configured rate is above zero.
    pub fn installment_price(
        &self,
        amount: Money,
        installments: u32,
    ) -> Result<InstallmentQuote, PricingError> {
        if amount.cents() < 0 {
            return Err(PricingError::NegativeAmount);
        }
        if installments < 1 {
            return Err(PricingError::InvalidInstallments);
        }

        let total = if installments > 1 && self.installment_interest_rate > 0.0 {
            amount.apply_rate(1.0 + self.installment_interest_rate)
        } else {
            amount
        };

        Ok(InstallmentQuote {
            total,
            per_installment: total.split(installments),
        })
    }

    /// Price a pix payment: the configured discount comes off the amount.
    pub fn pix_price(&self, amount: Money) -> Result<Money, PricingError> {
        if amount.cents() < 0 {
            return Err(PricingError::NegativeAmount);
        }
        Ok(amount.apply_rate(1.0 - self.pix_discount_rate))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("rate must be between 0 and 1, got {0}")]
    InvalidRate(f64),

    #[error("amount must not be negative")]
    NegativeAmount,

    #[error("number of installments must be a positive integer")]
    InvalidInstallments,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(PaymentConfig::default().validate().is_ok());
        assert!(PaymentConfig { installment_interest_rate: 1.5, ..Default::default() }
            .validate()
            .is_err());
        assert!(PaymentConfig { pix_discount_rate: -0.1, ..Default::default() }
            .validate()
            .is_err());
    }

    #[test]
    fn test_installment_price_with_interest() {
        let config = PaymentConfig::default();

        // $1000.00 in 3 installments at 5% flat interest
        let quote = config
            .installment_price(Money::from_major_minor(1000, 0), 3)
            .unwrap();
        assert_eq!(quote.total, Money::from_major_minor(1050, 0));
        assert_eq!(quote.per_installment, Money::from_major_minor(350, 0));
    }

    #[test]
    fn test_single_installment_carries_no_interest() {
        let config = PaymentConfig::default();
        let quote = config
            .installment_price(Money::from_major_minor(1000, 0), 1)
            .unwrap();
        assert_eq!(quote.total, Money::from_major_minor(1000, 0));
        assert_eq!(quote.per_installment, Money::from_major_minor(1000, 0));
    }

    #[test]
    fn test_zero_rate_carries_no_interest() {
        let config = PaymentConfig { installment_interest_rate: 0.0, ..Default::default() };
        let quote = config
            .installment_price(Money::from_major_minor(900, 0), 3)
            .unwrap();
        assert_eq!(quote.total, Money::from_major_minor(900, 0));
        assert_eq!(quote.per_installment, Money::from_major_minor(300, 0));
    }

    #[test]
    fn test_pix_price_applies_discount() {
        let config = PaymentConfig::default();
        assert_eq!(
            config.pix_price(Money::from_major_minor(200, 0)).unwrap(),
            Money::from_major_minor(180, 0)
        );
    }

    #[test]
    fn test_cash_card_price_is_identity() {
        let config = PaymentConfig::default();
        let amount = Money::from_major_minor(123, 45);
        assert_eq!(config.cash_card_price(amount).unwrap(), amount);
    }

    #[test]
    fn test_validation_failures() {
        let config = PaymentConfig::default();
        assert!(matches!(
            config.cash_card_price(Money::from_cents(-1)),
            Err(PricingError::NegativeAmount)
        ));
        assert!(matches!(
            config.installment_price(Money::from_cents(100), 0),
            Err(PricingError::InvalidInstallments)
        ));
        assert!(matches!(
            config.pix_price(Money::from_cents(-100)),
            Err(PricingError::NegativeAmount)
        ));
    }
}
