pub mod engine;
pub mod gateway;
pub mod pricing;

pub use engine::{
    FraudScreen, PaymentDetails, PaymentEngine, PaymentMethod, PaymentOutcome,
    PaymentOutcomeStatus, RefundOutcome, RefundStatus,
};
pub use gateway::{GatewayError, PaymentGateway, SimulatedGateway, SimulationMarkers};
pub use pricing::{InstallmentQuote, PaymentConfig, PricingError};
