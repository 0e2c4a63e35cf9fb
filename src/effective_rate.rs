//! Effective total cost (CET): the internal rate of return of a
//! disbursement-then-payments cash flow, found by bisection.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FinancingError, FinancingResult};
use crate::types::{Money, Rate};

/// Bounds of the bisection search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Stop once `|NPV(rate)|` falls below this value.
    pub tolerance: Decimal,
    pub max_iterations: u32,
    /// Largest periodic rate tried while bracketing the root.
    pub upper_cap: Rate,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            tolerance: dec!(0.0001),
            max_iterations: 100,
            upper_cap: dec!(100),
        }
    }
}

/// Periodic rate found by the solver and its annual equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRate {
    pub periodic: Rate,
    /// `(1 + periodic)^12 - 1`
    pub annual: Rate,
}

/// Net present value: `flow[0] + Σ flow[i] / (1 + rate)^i`.
///
/// Once the discount factor leaves the decimal range the remaining flows are
/// worth nothing at this rate and are skipped.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> FinancingResult<Money> {
    if rate <= dec!(-1) {
        return Err(FinancingError::invalid("rate", "discount rate must be greater than -100%"));
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut result = Decimal::ZERO;

    for (period, flow) in cash_flows.iter().enumerate() {
        if period > 0 {
            discount = match discount.checked_mul(one_plus_r) {
                Some(next) => next,
                None => break,
            };
        }
        result += flow / discount;
    }

    Ok(result)
}

fn opposite_signs(a: Decimal, b: Decimal) -> bool {
    (a < Decimal::ZERO && b > Decimal::ZERO) || (a > Decimal::ZERO && b < Decimal::ZERO)
}

fn validate_flows(cash_flows: &[Money]) -> FinancingResult<()> {
    if cash_flows.len() < 2 {
        return Err(FinancingError::invalid("cash_flows", "needs a disbursement and at least one payment"));
    }
    if cash_flows[0] >= Decimal::ZERO {
        return Err(FinancingError::invalid("cash_flows", "must start with a negative disbursement"));
    }
    Ok(())
}

/// Periodic internal rate of return of `cash_flows`.
///
/// Brackets the root on `[0, 1]`, doubling the upper bound up to
/// `settings.upper_cap`, then bisects.
///
/// # Errors
///
/// * [`FinancingError::InvalidParameter`] when the flow is too short or does
///   not start with a disbursement.
/// * [`FinancingError::NotConvergent`] when no sign change is found.
pub fn solve_periodic_rate(cash_flows: &[Money], settings: &SolverSettings) -> FinancingResult<Rate> {
    validate_flows(cash_flows)?;

    let mut lower = Decimal::ZERO;
    let mut npv_lower = npv(lower, cash_flows)?;
    if npv_lower.is_zero() {
        return Ok(lower);
    }

    let mut upper = Decimal::ONE;
    let mut npv_upper = npv(upper, cash_flows)?;
    while !opposite_signs(npv_lower, npv_upper) {
        if npv_upper.is_zero() {
            return Ok(upper);
        }
        if upper >= settings.upper_cap {
            warn!(upper = %upper, npv = %npv_upper, "could not bracket the effective rate");
            return Err(FinancingError::NotConvergent {
                iterations: 0,
                last_npv: npv_upper,
            });
        }
        upper = (upper * dec!(2)).min(settings.upper_cap);
        npv_upper = npv(upper, cash_flows)?;
    }
    debug!(lower = %lower, upper = %upper, "effective rate bracketed");

    let mut mid = lower;
    let mut npv_mid = npv_lower;
    for iteration in 0..settings.max_iterations {
        mid = (lower + upper) / dec!(2);
        npv_mid = npv(mid, cash_flows)?;

        if npv_mid.abs() < settings.tolerance {
            debug!(rate = %mid, iterations = iteration + 1, "effective rate converged");
            return Ok(mid);
        }

        if opposite_signs(npv_mid, npv_lower) {
            upper = mid;
        } else {
            lower = mid;
            npv_lower = npv_mid;
        }
    }

    debug!(rate = %mid, npv = %npv_mid, "effective rate stopped at iteration cap");
    Ok(mid)
}

/// Periodic and annualized effective rate with the default settings.
pub fn effective_rate(cash_flows: &[Money]) -> FinancingResult<EffectiveRate> {
    effective_rate_with(cash_flows, &SolverSettings::default())
}

/// Effective rate of `cash_flows`, where the first flow is the amount
/// received (negative) and the rest are the payments.
///
/// # Errors
///
/// * [`FinancingError::InvalidParameter`] when the flow is too short or does
///   not start with a disbursement.
/// * [`FinancingError::NotConvergent`] when no root is bracketed below the
///   solver cap, or the annualized rate overflows.
pub fn effective_rate_with(cash_flows: &[Money], settings: &SolverSettings) -> FinancingResult<EffectiveRate> {
    let periodic = solve_periodic_rate(cash_flows, settings)?;
    let annual = (Decimal::ONE + periodic)
        .checked_powu(12)
        .map(|factor| factor - Decimal::ONE)
        .ok_or(FinancingError::NotConvergent {
            iterations: settings.max_iterations,
            last_npv: Decimal::ZERO,
        })?;
    Ok(EffectiveRate { periodic, annual })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::generate;
    use crate::types::AmortizationSystem;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let flows = [dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &flows).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate_is_plain_sum() {
        let flows = [dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(Decimal::ZERO, &flows).unwrap(), dec!(50));
    }

    #[test]
    fn test_single_period_flow() {
        let rate = effective_rate(&[dec!(-1000), dec!(1100)]).unwrap();
        assert!((rate.periodic - dec!(0.10)).abs() < dec!(0.000001));
        let expected_annual = dec!(1.1).powu(12) - Decimal::ONE;
        assert!((rate.annual - expected_annual).abs() < dec!(0.0001));
    }

    #[rstest]
    #[case(AmortizationSystem::Price, dec!(0.01))]
    #[case(AmortizationSystem::Sac, dec!(0.0075))]
    #[case(AmortizationSystem::Sacre, dec!(0.012))]
    fn test_plain_schedule_recovers_contract_rate(#[case] system: AmortizationSystem, #[case] rate: Rate) {
        let schedule = generate(dec!(100000), rate, 120, system).unwrap();
        let mut flows = vec![-schedule.principal];
        flows.extend(schedule.iter().map(|i| i.total_payment));

        let solved = solve_periodic_rate(&flows, &SolverSettings::default()).unwrap();
        assert!((solved - rate).abs() < dec!(0.000001));
    }

    #[test]
    fn test_bracket_grows_for_expensive_flows() {
        // 300% per period lies beyond the initial [0, 1] bracket
        let rate = solve_periodic_rate(&[dec!(-100), dec!(400)], &SolverSettings::default()).unwrap();
        assert!((rate - dec!(3)).abs() < dec!(0.00001));
    }

    #[test]
    fn test_payments_below_disbursement_do_not_converge() {
        // the return is negative, there is no root in [0, 100]
        let result = solve_periodic_rate(&[dec!(-1000), dec!(300), dec!(300)], &SolverSettings::default());
        assert!(matches!(result, Err(FinancingError::NotConvergent { .. })));
    }

    #[test]
    fn test_zero_cost_loan_returns_zero() {
        let rate = solve_periodic_rate(&[dec!(-1200), dec!(600), dec!(600)], &SolverSettings::default()).unwrap();
        assert_eq!(rate, Decimal::ZERO);
    }

    #[rstest]
    #[case(&[dec!(-1000)])]
    #[case(&[dec!(1000), dec!(-1100)])]
    #[case(&[])]
    fn test_malformed_flows(#[case] flows: &[Decimal]) {
        let result = solve_periodic_rate(flows, &SolverSettings::default());
        assert!(matches!(result, Err(FinancingError::InvalidParameter { .. })));
    }

    #[test]
    fn test_solver_is_deterministic() {
        let flows: Vec<Decimal> = std::iter::once(dec!(-50000))
            .chain(std::iter::repeat_n(dec!(1500), 48))
            .collect();
        let first = solve_periodic_rate(&flows, &SolverSettings::default()).unwrap();
        let second = solve_periodic_rate(&flows, &SolverSettings::default()).unwrap();
        assert_eq!(first, second);
    }
}
