//! Credit portability: moving the outstanding balance of a financing to
//! another bank at a different rate.
//!
//! The balance left after the installments already paid is refinanced over
//! the remaining term with the same system, correction, charges and due
//! dates. Savings are measured against the rows the buyer would still pay
//! under the current contract.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::financing::{FinancingInput, FinancingScenario};
use crate::charges::augment_charges;
use crate::correction::apply_correction;
use crate::effective_rate::SolverSettings;
use crate::error::{FinancingError, FinancingResult};
use crate::rates::annual_to_monthly;
use crate::schedule::{generate, with_due_dates};
use crate::summary::{summarize_with, FinancingSummary};
use crate::types::{Installment, Money, Rate, Schedule};

/// Offer from the new bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortabilityRequest {
    /// Installments already paid under the current contract.
    pub paid_installments: usize,
    /// Effective annual rate offered by the new bank.
    pub new_annual_interest_rate: Rate,
    /// Fees and registry costs of moving the contract.
    #[serde(default)]
    pub portability_cost: Money,
}

/// The refinanced contract and how it compares with staying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortabilityResult {
    /// Balance carried over to the new bank.
    pub balance: Money,
    pub remaining_term: u32,
    pub new_periodic_rate: Rate,
    pub schedule: Schedule,
    pub summary: FinancingSummary,
    /// Interest left to pay under the current contract.
    pub current_interest: Money,
    /// Total payments left under the current contract.
    pub current_total_paid: Money,
    pub interest_savings: Money,
    pub payment_savings: Money,
    /// First current installment minus the first new one.
    pub monthly_savings: Money,
    pub portability_cost: Money,
    /// Months until the accumulated savings pay for the move. `None` when
    /// the new contract never saves anything.
    pub payback_months: Option<u32>,
}

impl PortabilityResult {
    /// Savings net of the cost of moving.
    pub fn net_savings(&self) -> Money {
        self.payment_savings - self.portability_cost
    }
}

/// Refinances the balance of `scenario` after `request.paid_installments`
/// rows at the new bank's rate.
///
/// # Errors
///
/// Returns [`FinancingError::InvalidParameter`] when nothing is left to
/// refinance, the cost is negative or the new rate is out of range.
pub fn simulate_portability(
    input: &FinancingInput,
    scenario: &FinancingScenario,
    request: &PortabilityRequest,
    settings: &SolverSettings,
) -> FinancingResult<PortabilityResult> {
    let current = &scenario.schedule;
    let paid = request.paid_installments;
    if paid >= current.len() {
        return Err(FinancingError::invalid(
            "paid_installments",
            format!("{} installments leave nothing to refinance out of {}", paid, current.len()),
        ));
    }
    if request.portability_cost < Decimal::ZERO {
        return Err(FinancingError::invalid("portability_cost", "cannot be negative"));
    }

    let balance = match paid {
        0 => current.principal,
        _ => current.installments[paid - 1].remaining_balance,
    };
    let remaining_term = (current.len() - paid) as u32;
    let new_periodic_rate = annual_to_monthly(request.new_annual_interest_rate)?;

    let mut schedule = generate(balance, new_periodic_rate, remaining_term, current.system)?;
    if !input.correction.is_fixed() {
        let series = input.correction.series(current.len());
        let remaining = series.get(paid..).unwrap_or_default();
        schedule = apply_correction(&schedule, balance, remaining)?;
    }
    schedule = augment_charges(&schedule, input.property_value, &input.charges)?;
    if let Some(next_due) = current.installments[paid].due_date {
        schedule = with_due_dates(&schedule, next_due)?;
    }
    let summary = summarize_with(&schedule, input.monthly_income, settings)?;

    let current_rows = &current.installments[paid..];
    let current_interest: Money = current_rows.iter().map(|i| i.interest).sum();
    let current_total_paid: Money = current_rows.iter().map(|i| i.total_payment).sum();
    let monthly_savings = current_rows[0].total_payment - summary.first_payment;
    let payback_months = payback(current_rows, &schedule.installments, request.portability_cost);

    debug!(
        balance = %balance,
        remaining_term,
        new_rate = %new_periodic_rate,
        monthly_savings = %monthly_savings,
        payback = ?payback_months,
        "portability simulated"
    );

    Ok(PortabilityResult {
        balance,
        remaining_term,
        new_periodic_rate,
        interest_savings: current_interest - summary.total_interest,
        payment_savings: current_total_paid - summary.total_paid,
        current_interest,
        current_total_paid,
        monthly_savings,
        portability_cost: request.portability_cost,
        payback_months,
        schedule,
        summary,
    })
}

/// First month in which the accumulated difference covers `cost`. When it
/// never does within the term but savings are positive, the average monthly
/// saving extrapolates it.
fn payback(current: &[Installment], refinanced: &[Installment], cost: Money) -> Option<u32> {
    let mut accumulated = Decimal::ZERO;
    let mut months = 0u32;
    for (old, new) in current.iter().zip(refinanced) {
        accumulated += old.total_payment - new.total_payment;
        months += 1;
        if accumulated >= cost && accumulated > Decimal::ZERO {
            return Some(months);
        }
    }
    if accumulated <= Decimal::ZERO || months == 0 {
        return None;
    }
    let average = accumulated / Decimal::from(months);
    (cost / average).ceil().to_u32()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charges::ChargeRates;
    use crate::correction::CorrectionIndex;
    use crate::rates::monthly_to_annual;
    use crate::scenarios::financing::evaluate_financing;
    use crate::schedule::fixed_payment;
    use crate::types::AmortizationSystem;
    use chrono::NaiveDate;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn input(system: AmortizationSystem) -> FinancingInput {
        FinancingInput {
            property_value: dec!(300000),
            down_payment: dec!(80000),
            fgts: dec!(0),
            acquisition_costs: dec!(0),
            annual_interest_rate: monthly_to_annual(dec!(0.01)).unwrap(),
            term_months: 120,
            system,
            monthly_income: None,
            appreciation: dec!(0),
            charges: ChargeRates::default(),
            correction: CorrectionIndex::Fixed,
            first_due_date: None,
        }
    }

    fn request(cost: Money) -> PortabilityRequest {
        PortabilityRequest {
            paid_installments: 24,
            new_annual_interest_rate: monthly_to_annual(dec!(0.008)).unwrap(),
            portability_cost: cost,
        }
    }

    #[test]
    fn test_lower_rate_saves_interest() {
        let input = input(AmortizationSystem::Price);
        let scenario = evaluate_financing(&input).unwrap();
        let result = simulate_portability(&input, &scenario, &request(dec!(2800)), &SolverSettings::default()).unwrap();

        assert_eq!(result.balance, scenario.schedule.installments[23].remaining_balance);
        assert!((result.balance - dec!(194203.63)).abs() < dec!(5));
        assert_eq!(result.remaining_term, 96);
        assert_eq!(result.schedule.len(), 96);
        let new_payment = fixed_payment(result.balance, result.new_periodic_rate, 96).unwrap();
        assert!((result.summary.first_payment - new_payment).abs() < dec!(0.000001));
        assert_eq!(result.schedule.last().unwrap().remaining_balance, Decimal::ZERO);

        // 3156.36 a month today against 2905.93 at the new bank
        assert!((result.monthly_savings - dec!(250.43)).abs() < dec!(3));
        assert!((result.interest_savings - dec!(24040.96)).abs() < dec!(300));
        assert!((result.current_interest - dec!(108807.01)).abs() < dec!(300));
        // without charges both contracts differ only in interest
        assert!((result.payment_savings - result.interest_savings).abs() < dec!(0.000001));
        assert_eq!(result.payback_months, Some(12));
        assert_eq!(result.net_savings(), result.payment_savings - dec!(2800));
    }

    #[test]
    fn test_higher_rate_never_pays_back() {
        let input = input(AmortizationSystem::Sac);
        let scenario = evaluate_financing(&input).unwrap();
        let request = PortabilityRequest {
            new_annual_interest_rate: monthly_to_annual(dec!(0.012)).unwrap(),
            ..request(dec!(1000))
        };
        let result = simulate_portability(&input, &scenario, &request, &SolverSettings::default()).unwrap();

        assert!(result.interest_savings < Decimal::ZERO);
        assert!(result.monthly_savings < Decimal::ZERO);
        assert_eq!(result.payback_months, None);
    }

    #[test]
    fn test_cost_beyond_the_term_is_extrapolated() {
        let input = input(AmortizationSystem::Price);
        let scenario = evaluate_financing(&input).unwrap();
        let result =
            simulate_portability(&input, &scenario, &request(dec!(48000)), &SolverSettings::default()).unwrap();

        let average = result.payment_savings / dec!(96);
        let expected = (dec!(48000) / average).ceil().to_u32().unwrap();
        assert!(expected > 96);
        assert_eq!(result.payback_months, Some(expected));
    }

    #[test]
    fn test_new_contract_keeps_charges_and_dates() {
        let input = FinancingInput {
            charges: ChargeRates {
                monthly_fee: dec!(25),
                ..ChargeRates::default()
            },
            correction: CorrectionIndex::Tr,
            first_due_date: NaiveDate::from_ymd_opt(2026, 1, 10),
            ..input(AmortizationSystem::Sacre)
        };
        let scenario = evaluate_financing(&input).unwrap();
        let result = simulate_portability(&input, &scenario, &request(dec!(0)), &SolverSettings::default()).unwrap();

        let first = result.schedule.first().unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.fee, dec!(25));
        assert_eq!(first.correction, result.balance * dec!(0.0008));
        assert_eq!(first.due_date, NaiveDate::from_ymd_opt(2028, 1, 10));
        assert_eq!(result.schedule.last().unwrap().remaining_balance, Decimal::ZERO);
        assert_eq!(result.payback_months, Some(1));
    }

    #[rstest]
    #[case(120, dec!(0))]
    #[case(121, dec!(0))]
    #[case(24, dec!(-1))]
    fn test_invalid_requests(#[case] paid: usize, #[case] cost: Money) {
        let input = input(AmortizationSystem::Price);
        let scenario = evaluate_financing(&input).unwrap();
        let request = PortabilityRequest {
            paid_installments: paid,
            ..request(cost)
        };
        let result = simulate_portability(&input, &scenario, &request, &SolverSettings::default());
        assert!(matches!(result, Err(FinancingError::InvalidParameter { .. })));
    }
}
