use thiserror::Error;

/// Engine-wide error taxonomy. Every variant carries a human-readable
/// message; `recovery_hint` supplies the optional suggestion surfaced to
/// the operator alongside it.
#[derive(Debug, Clone, Error)]
pub enum PricePulseError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("no baseline for product {ean} at hour period {hour_period}")]
    BaselineNotFound { ean: String, hour_period: u8 },

    #[error("invalid baseline: {0}")]
    InvalidBaseline(String),

    #[error("trigger error: {0}")]
    Trigger(String),

    #[error("no eligible products for simulation")]
    NoEligibleProducts,

    #[error("simulation error: {0}")]
    Simulation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("import error: {0}")]
    DataImport(String),
}

impl PricePulseError {
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            PricePulseError::Validation(_) => Some("Review input data and correct any errors."),
            PricePulseError::BaselineNotFound { .. } => {
                Some("Import baselines for this product or skip it for this cycle.")
            }
            PricePulseError::InvalidBaseline(_) => {
                Some("Verify baseline data and reimport if necessary.")
            }
            PricePulseError::Trigger(_) => Some("Review trigger configuration and try again."),
            PricePulseError::NoEligibleProducts => {
                Some("Load products with valid EANs and positive prices before starting.")
            }
            PricePulseError::Simulation(_) => {
                Some("Try resetting the simulation or checking product data.")
            }
            PricePulseError::Database(_) => Some("Check storage state and retry the operation."),
            PricePulseError::Authentication(_) => {
                Some("Try logging in again or contact support.")
            }
            PricePulseError::DataImport(_) => {
                Some("Verify file format and try importing again.")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PricePulseError>;
