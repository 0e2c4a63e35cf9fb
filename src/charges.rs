//! Insurance and administrative fees added on top of each installment.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{FinancingError, FinancingResult};
use crate::types::{Installment, Money, Rate, Schedule};

/// Annual insurance rates and the monthly fee charged with every installment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeRates {
    /// Life and disability insurance, annual rate over the outstanding balance.
    pub annual_rate_on_balance: Rate,
    /// Property damage insurance, annual rate over the property value.
    pub annual_rate_on_asset: Rate,
    /// Fixed administrative fee per installment.
    pub monthly_fee: Money,
}

impl ChargeRates {
    fn validate(&self) -> FinancingResult<()> {
        if self.annual_rate_on_balance < Decimal::ZERO {
            return Err(FinancingError::invalid("annual_rate_on_balance", "cannot be negative"));
        }
        if self.annual_rate_on_asset < Decimal::ZERO {
            return Err(FinancingError::invalid("annual_rate_on_asset", "cannot be negative"));
        }
        if self.monthly_fee < Decimal::ZERO {
            return Err(FinancingError::invalid("monthly_fee", "cannot be negative"));
        }
        Ok(())
    }
}

/// Returns a copy of `schedule` with insurance and fees on every row.
///
/// Balance insurance is charged over the balance owed before each payment,
/// which for the first row is the principal. Interest and amortization are
/// untouched.
pub fn augment_charges(
    schedule: &Schedule,
    property_value: Money,
    charges: &ChargeRates,
) -> FinancingResult<Schedule> {
    charges.validate()?;
    if property_value < Decimal::ZERO {
        return Err(FinancingError::invalid("property_value", "cannot be negative"));
    }

    let monthly_on_balance = charges.annual_rate_on_balance / dec!(12);
    let asset_insurance = property_value * charges.annual_rate_on_asset / dec!(12);

    let installments = schedule
        .iter()
        .map(|row| {
            let insurance = row.opening_balance() * monthly_on_balance + asset_insurance;
            Installment {
                insurance,
                fee: charges.monthly_fee,
                total_payment: row.gross_payment + insurance + charges.monthly_fee,
                ..row.clone()
            }
        })
        .collect();

    Ok(schedule.with_installments(installments))
}
