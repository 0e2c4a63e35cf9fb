use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the amortization and scenario engine.
///
/// Every variant is scoped to the single computation that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FinancingError {
    #[error("Invalid parameter: {field} ({reason})")]
    InvalidParameter { field: String, reason: String },

    #[error("Extraordinary payment of {lump_sum} exceeds the outstanding balance of {balance}")]
    ExcessPayment { lump_sum: Decimal, balance: Decimal },

    #[error("Schedule has no installments")]
    EmptySchedule,

    #[error("Effective rate did not converge after {iterations} iterations (npv: {last_npv})")]
    NotConvergent { iterations: u32, last_npv: Decimal },
}

impl FinancingError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        FinancingError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type FinancingResult<T> = Result<T, FinancingError>;
