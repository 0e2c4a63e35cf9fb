//! Reduction of an augmented schedule to the figures shown to the buyer.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::effective_rate::{effective_rate_with, SolverSettings};
use crate::error::{FinancingError, FinancingResult};
use crate::schedule::fixed_payment;
use crate::types::{Money, Rate, Schedule};

/// Share of the monthly income above which the first installment is flagged.
pub const AFFORDABILITY_LIMIT: Rate = dec!(0.30);

/// Share of the property value banks usually finance.
pub const MAX_FINANCED_SHARE: Rate = dec!(0.80);

/// How much the buyer can borrow with the income left after other debts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCapacity {
    /// Income times [`AFFORDABILITY_LIMIT`], minus the other obligations.
    pub monthly_capacity: Money,
    /// Loan whose fixed PRICE payment equals the capacity.
    pub max_loan: Money,
    /// Property the loan covers when it is [`MAX_FINANCED_SHARE`] of the value.
    pub estimated_property_value: Money,
}

/// Totals of a financing schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingSummary {
    pub total_interest: Money,
    pub total_amortization: Money,
    pub total_correction: Money,
    pub total_insurance: Money,
    pub total_fees: Money,
    /// Insurance plus fees.
    pub total_charges: Money,
    /// Sum of every total payment.
    pub total_paid: Money,
    pub first_payment: Money,
    pub last_payment: Money,
    /// Number of installments.
    pub term: u32,
    /// Annual effective total cost, `None` when the solver could not bracket it.
    pub effective_rate: Option<Rate>,
    /// First total payment over the monthly income.
    pub affordability_ratio: Option<Rate>,
    /// Set when the ratio is above [`AFFORDABILITY_LIMIT`]; never rejected here.
    pub exceeds_affordability: bool,
}

/// Summarizes `schedule` with the default solver settings.
pub fn summarize(schedule: &Schedule, monthly_income: Option<Money>) -> FinancingResult<FinancingSummary> {
    summarize_with(schedule, monthly_income, &SolverSettings::default())
}

/// Summarizes `schedule`.
///
/// # Errors
///
/// Returns [`FinancingError::EmptySchedule`] for a schedule without rows.
pub fn summarize_with(
    schedule: &Schedule,
    monthly_income: Option<Money>,
    settings: &SolverSettings,
) -> FinancingResult<FinancingSummary> {
    let (first, last) = match (schedule.first(), schedule.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(FinancingError::EmptySchedule),
    };

    let total_insurance: Money = schedule.iter().map(|i| i.insurance).sum();
    let total_fees: Money = schedule.iter().map(|i| i.fee).sum();

    let mut flows = Vec::with_capacity(schedule.len() + 1);
    flows.push(-schedule.principal);
    flows.extend(schedule.iter().map(|i| i.total_payment));
    let effective_rate = match effective_rate_with(&flows, settings) {
        Ok(rate) => Some(rate.annual),
        Err(FinancingError::NotConvergent { .. }) => None,
        Err(other) => return Err(other),
    };

    let affordability_ratio = monthly_income
        .filter(|income| *income > Decimal::ZERO)
        .map(|income| first.total_payment / income);
    let exceeds_affordability = affordability_ratio.is_some_and(|ratio| ratio > AFFORDABILITY_LIMIT);
    if exceeds_affordability {
        warn!(
            first_payment = %first.total_payment,
            ratio = ?affordability_ratio,
            "first installment exceeds the affordability limit"
        );
    }

    Ok(FinancingSummary {
        total_interest: schedule.total_interest(),
        total_amortization: schedule.total_amortization(),
        total_correction: schedule.iter().map(|i| i.correction).sum(),
        total_insurance,
        total_fees,
        total_charges: total_insurance + total_fees,
        total_paid: schedule.iter().map(|i| i.total_payment).sum(),
        first_payment: first.total_payment,
        last_payment: last.total_payment,
        term: schedule.len() as u32,
        effective_rate,
        affordability_ratio,
        exceeds_affordability,
    })
}

/// Largest installment and loan the buyer can take on.
///
/// Everything is zero when the obligations already use up the limit.
///
/// # Errors
///
/// Returns [`FinancingError::InvalidParameter`] for negative amounts, a
/// negative rate or a zero term.
pub fn payment_capacity(
    monthly_income: Money,
    other_obligations: Money,
    periodic_rate: Rate,
    term: u32,
) -> FinancingResult<PaymentCapacity> {
    if monthly_income < Decimal::ZERO || other_obligations < Decimal::ZERO {
        return Err(FinancingError::invalid("monthly_income", "amounts cannot be negative"));
    }
    // payment of one unit of principal
    let unit_payment = fixed_payment(Decimal::ONE, periodic_rate, term)?;

    let monthly_capacity = monthly_income * AFFORDABILITY_LIMIT - other_obligations;
    if monthly_capacity <= Decimal::ZERO {
        return Ok(PaymentCapacity {
            monthly_capacity: Decimal::ZERO,
            max_loan: Decimal::ZERO,
            estimated_property_value: Decimal::ZERO,
        });
    }

    let max_loan = monthly_capacity / unit_payment;
    Ok(PaymentCapacity {
        monthly_capacity,
        max_loan,
        estimated_property_value: max_loan / MAX_FINANCED_SHARE,
    })
}
