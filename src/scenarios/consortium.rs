//! Group-buying pool ("consórcio"): members pay into a common fund and get
//! the credit when drawn or when their bid covers what is left.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ScenarioKind, ScenarioSummary};
use crate::error::{FinancingError, FinancingResult};
use crate::rates::future_value;
use crate::types::{Money, Rate};

/// Quota of a consortium (group-buying pool) for a letter of credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsortiumInput {
    /// Value of the credit letter.
    pub credit_value: Money,
    /// Duration of the group in months.
    pub term_months: u32,
    /// Administration fee over the whole term, as a fraction of the credit.
    pub administration_fee_rate: Rate,
    /// Reserve fund over the whole term, as a fraction of the credit.
    #[serde(default)]
    pub reserve_fund_rate: Rate,
    /// Monthly insurance over the credit.
    #[serde(default)]
    pub insurance_rate: Rate,
    #[serde(default)]
    pub bid_value: Money,
    /// Annual appreciation of the property bought with the credit.
    #[serde(default)]
    pub appreciation: Rate,
}

/// Fixed monthly components of the installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsortiumBreakdown {
    pub common_fund: Money,
    pub administration_fee: Money,
    pub reserve_fund: Money,
    pub insurance: Money,
}

impl ConsortiumBreakdown {
    pub fn payment(&self) -> Money {
        self.common_fund + self.administration_fee + self.reserve_fund + self.insurance
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsortiumMonth {
    pub month: u32,
    pub payment: Money,
    pub accumulated_fund: Money,
    /// Whether the fund plus the bid already covers the credit.
    pub contemplated: bool,
}

/// Monthly payment, totals and month-by-month evolution of a quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsortiumResult {
    pub monthly_payment: Money,
    pub breakdown: ConsortiumBreakdown,
    pub total_common_fund: Money,
    pub total_administration_fee: Money,
    pub total_reserve_fund: Money,
    pub total_insurance: Money,
    pub total_paid: Money,
    /// `total_paid / credit - 1`
    pub effective_cost: Rate,
    /// First month where the accumulated fund plus the bid reaches the credit.
    pub contemplation_month: Option<u32>,
    pub future_property_value: Money,
    pub net_result: Money,
    pub bid_value: Money,
    pub evolution: Vec<ConsortiumMonth>,
}

impl ConsortiumResult {
    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary::new(
            ScenarioKind::Consortium,
            self.total_paid + self.bid_value,
            self.future_property_value,
            self.net_result,
        )
    }
}

/// Splits the credit over the term into fund, administration fee, reserve
/// fund and insurance, and values the property at the expected
/// contemplation month.
///
/// # Errors
///
/// Returns [`FinancingError::InvalidParameter`] for a non-positive credit, a
/// zero term or negative rates and bids.
pub fn evaluate_consortium(input: &ConsortiumInput) -> FinancingResult<ConsortiumResult> {
    if input.credit_value <= Decimal::ZERO {
        return Err(FinancingError::invalid("credit_value", "must be greater than zero"));
    }
    if input.term_months == 0 {
        return Err(FinancingError::invalid("term_months", "must be at least one month"));
    }
    if input.administration_fee_rate < Decimal::ZERO
        || input.reserve_fund_rate < Decimal::ZERO
        || input.insurance_rate < Decimal::ZERO
    {
        return Err(FinancingError::invalid("rates", "cannot be negative"));
    }
    if input.bid_value < Decimal::ZERO {
        return Err(FinancingError::invalid("bid_value", "cannot be negative"));
    }

    let credit = input.credit_value;
    let term = Decimal::from(input.term_months);
    let breakdown = ConsortiumBreakdown {
        common_fund: credit / term,
        administration_fee: credit * input.administration_fee_rate / term,
        reserve_fund: credit * input.reserve_fund_rate / term,
        insurance: credit * input.insurance_rate,
    };
    let monthly_payment = breakdown.payment();

    let mut contemplation_month = None;
    let evolution: Vec<ConsortiumMonth> = (1..=input.term_months)
        .map(|month| {
            let accumulated_fund = credit * Decimal::from(month) / term;
            if contemplation_month.is_none() && accumulated_fund + input.bid_value >= credit {
                contemplation_month = Some(month);
            }
            ConsortiumMonth {
                month,
                payment: monthly_payment,
                accumulated_fund,
                contemplated: contemplation_month.is_some(),
            }
        })
        .collect();

    let total_common_fund = breakdown.common_fund * term;
    let total_administration_fee = breakdown.administration_fee * term;
    let total_reserve_fund = breakdown.reserve_fund * term;
    let total_insurance = breakdown.insurance * term;
    let total_paid = total_common_fund + total_administration_fee + total_reserve_fund + total_insurance;

    let future_property_value = future_value(credit, input.appreciation, term / Decimal::from(12))?;

    Ok(ConsortiumResult {
        monthly_payment,
        breakdown,
        total_common_fund,
        total_administration_fee,
        total_reserve_fund,
        total_insurance,
        total_paid,
        effective_cost: total_paid / credit - Decimal::ONE,
        contemplation_month,
        future_property_value,
        net_result: future_property_value - total_paid - input.bid_value,
        bid_value: input.bid_value,
        evolution,
    })
}
