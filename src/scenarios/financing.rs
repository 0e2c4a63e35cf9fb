//! Bank financing: down payment plus an amortizing loan for the rest.
//!
//! The loan runs through the whole pipeline: schedule generation, optional
//! monetary correction, insurance and fees, due dates and the summary with
//! its effective total cost.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ScenarioKind, ScenarioSummary};
use crate::charges::{augment_charges, ChargeRates};
use crate::correction::{apply_correction, CorrectionIndex};
use crate::effective_rate::{effective_rate_with, SolverSettings};
use crate::error::{FinancingError, FinancingResult};
use crate::prepayment::{prepay_schedule, AmortizationImpact, PrepaymentPolicy};
use crate::rates::{annual_to_monthly, future_value};
use crate::schedule::{generate, with_due_dates};
use crate::summary::{summarize_with, FinancingSummary};
use crate::types::{AmortizationSystem, Installment, Money, Rate, Schedule};

/// A bank loan for the part of the property the down payment and FGTS do not cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingInput {
    pub property_value: Money,
    pub down_payment: Money,
    /// FGTS balance used on top of the down payment.
    #[serde(default)]
    pub fgts: Money,
    /// Transfer tax, deed and registry costs.
    #[serde(default)]
    pub acquisition_costs: Money,
    /// Effective annual interest rate as a decimal (0.105 for 10.5%).
    pub annual_interest_rate: Rate,
    pub term_months: u32,
    pub system: AmortizationSystem,
    #[serde(default)]
    pub monthly_income: Option<Money>,
    #[serde(default)]
    pub appreciation: Rate,
    #[serde(default)]
    pub charges: ChargeRates,
    #[serde(default)]
    pub correction: CorrectionIndex,
    #[serde(default)]
    pub first_due_date: Option<NaiveDate>,
}

impl FinancingInput {
    /// Property value minus down payment and FGTS.
    pub fn loan_amount(&self) -> Money {
        self.property_value - self.down_payment - self.fgts
    }

    fn validate(&self) -> FinancingResult<()> {
        if self.property_value <= Decimal::ZERO {
            return Err(FinancingError::invalid("property_value", "must be greater than zero"));
        }
        if self.down_payment < Decimal::ZERO || self.fgts < Decimal::ZERO {
            return Err(FinancingError::invalid("down_payment", "cannot be negative"));
        }
        if self.acquisition_costs < Decimal::ZERO {
            return Err(FinancingError::invalid("acquisition_costs", "cannot be negative"));
        }
        if self.loan_amount() <= Decimal::ZERO {
            return Err(FinancingError::invalid(
                "loan_amount",
                "down payment and FGTS must leave something to finance",
            ));
        }
        Ok(())
    }
}

/// An evaluated financing: the augmented schedule, its summary and the
/// scenario totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingScenario {
    pub loan_amount: Money,
    pub periodic_rate: Rate,
    pub schedule: Schedule,
    pub summary: FinancingSummary,
    /// Down payment, FGTS, acquisition costs and every installment.
    pub total_cost: Money,
    pub future_property_value: Money,
    pub net_result: Money,
}

impl FinancingScenario {
    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary::new(
            ScenarioKind::Financing,
            self.total_cost,
            self.future_property_value,
            self.net_result,
        )
    }
}

/// Financing schedule after an extraordinary payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingPrepayment {
    pub schedule: Schedule,
    pub impact: AmortizationImpact,
    /// Totals of the new schedule. The effective rate counts the lump sum as
    /// paid together with the last installment already settled.
    pub summary: FinancingSummary,
}

/// Evaluates `input` with the default solver settings.
pub fn evaluate_financing(input: &FinancingInput) -> FinancingResult<FinancingScenario> {
    evaluate_financing_with(input, &SolverSettings::default())
}

/// Runs the loan through generation, correction, charges, due dates and
/// the summary.
///
/// # Errors
///
/// Returns [`FinancingError::InvalidParameter`] when the inputs leave
/// nothing to finance or are out of range.
pub fn evaluate_financing_with(
    input: &FinancingInput,
    settings: &SolverSettings,
) -> FinancingResult<FinancingScenario> {
    input.validate()?;

    let loan_amount = input.loan_amount();
    let periodic_rate = annual_to_monthly(input.annual_interest_rate)?;
    debug!(
        loan = %loan_amount,
        periodic_rate = %periodic_rate,
        term = input.term_months,
        system = %input.system,
        "generating financing schedule"
    );

    let mut schedule = generate(loan_amount, periodic_rate, input.term_months, input.system)?;
    if !input.correction.is_fixed() {
        let series = input.correction.series(schedule.len());
        schedule = apply_correction(&schedule, loan_amount, &series)?;
        debug!(index = ?input.correction, "balance corrected");
    }
    schedule = augment_charges(&schedule, input.property_value, &input.charges)?;
    if let Some(first_due) = input.first_due_date {
        schedule = with_due_dates(&schedule, first_due)?;
    }

    let summary = summarize_with(&schedule, input.monthly_income, settings)?;
    let total_cost = input.down_payment + input.fgts + input.acquisition_costs + summary.total_paid;
    let years = Decimal::from(input.term_months) / Decimal::from(12);
    let future_property_value = future_value(input.property_value, input.appreciation, years)?;

    Ok(FinancingScenario {
        loan_amount,
        periodic_rate,
        schedule,
        summary,
        total_cost,
        future_property_value,
        net_result: future_property_value - total_cost,
    })
}

/// Applies `lump_sum` after `paid_installments` rows of an evaluated
/// scenario and prices the new tail with the same correction and charges.
///
/// # Errors
///
/// * Any error of [`prepay_schedule`].
/// * [`FinancingError::EmptySchedule`] when the lump sum settles the loan
///   before the first installment.
pub fn prepay_financing(
    input: &FinancingInput,
    scenario: &FinancingScenario,
    paid_installments: usize,
    lump_sum: Money,
    policy: PrepaymentPolicy,
    settings: &SolverSettings,
) -> FinancingResult<FinancingPrepayment> {
    let outcome = prepay_schedule(&scenario.schedule, paid_installments, lump_sum, policy)?;
    let impact = outcome.impact;
    let mut installments: Vec<Installment> = outcome.schedule.installments;
    let tail_rows = installments.split_off(paid_installments);

    if !tail_rows.is_empty() {
        let mut tail = Schedule {
            principal: impact.new_balance,
            periodic_rate: scenario.periodic_rate,
            system: scenario.schedule.system,
            installments: tail_rows,
        };
        if !input.correction.is_fixed() {
            let series = input.correction.series(scenario.schedule.len());
            let remaining = series.get(paid_installments..).unwrap_or_default();
            tail = apply_correction(&tail, impact.new_balance, remaining)?;
        }
        tail = augment_charges(&tail, input.property_value, &input.charges)?;
        installments.extend(tail.installments);
    }

    let schedule = scenario.schedule.with_installments(installments);
    let mut summary = summarize_with(&schedule, input.monthly_income, settings)?;

    let mut flows = Vec::with_capacity(schedule.len() + 1);
    flows.push(-schedule.principal);
    flows.extend(schedule.iter().map(|i| i.total_payment));
    flows[paid_installments] += lump_sum;
    summary.effective_rate = match effective_rate_with(&flows, settings) {
        Ok(rate) => Some(rate.annual),
        Err(FinancingError::NotConvergent { .. } | FinancingError::InvalidParameter { .. }) => None,
        Err(other) => return Err(other),
    };

    debug!(
        paid = paid_installments,
        new_term = impact.new_term,
        savings = %impact.interest_savings,
        "financing prepaid"
    );

    Ok(FinancingPrepayment {
        schedule,
        impact,
        summary,
    })
}
