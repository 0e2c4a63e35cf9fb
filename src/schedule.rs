//! Amortization schedule generation for the PRICE, SAC and SACRE systems.
//!
//! All three systems share one loop: interest is always `balance * rate`, and
//! only the rule deciding how much principal is repaid each period changes.
//! The final installment always repays the whole residual so the schedule
//! closes at exactly zero.

use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};

use crate::error::{FinancingError, FinancingResult};
use crate::types::{validate_loan, AmortizationSystem, Installment, LoanParameters, Money, Rate, Schedule};

/// Number of periods between SACRE recalculations.
pub const SACRE_BLOCK: u32 = 12;

/// Fixed payment of the PRICE (French) system.
///
/// PMT = P * i / [1 - (1 + i)^-n], or `P / n` when the rate is zero. Once
/// `(1 + i)^n` leaves the decimal range the discount term is zero and the
/// payment is the interest on the principal.
pub fn fixed_payment(principal: Money, periodic_rate: Rate, term: u32) -> FinancingResult<Money> {
    validate_loan(principal, periodic_rate, term)?;

    let straight_line = principal / Decimal::from(term);
    if periodic_rate.is_zero() {
        return Ok(straight_line);
    }

    let discount = (Decimal::ONE + periodic_rate)
        .checked_powu(u64::from(term))
        .and_then(|factor| Decimal::ONE.checked_div(factor))
        .unwrap_or(Decimal::ZERO);
    let denominator = Decimal::ONE - discount;
    if denominator <= Decimal::ZERO {
        // rate too small to register over this term
        return Ok(straight_line);
    }

    principal
        .checked_mul(periodic_rate)
        .and_then(|interest| interest.checked_div(denominator))
        .ok_or_else(|| FinancingError::invalid("principal", "payment overflows for this rate"))
}

/// Builds the raw schedule (no correction, insurance or fees).
///
/// # Errors
///
/// Returns [`FinancingError::InvalidParameter`] when the principal is not
/// positive, the rate is negative or the term is zero.
pub fn generate(
    principal: Money,
    periodic_rate: Rate,
    term: u32,
    system: AmortizationSystem,
) -> FinancingResult<Schedule> {
    validate_loan(principal, periodic_rate, term)?;

    let installments = match system {
        AmortizationSystem::Price => {
            let payment = fixed_payment(principal, periodic_rate, term)?;
            amortize(principal, periodic_rate, term, |_, _, interest| payment - interest)
        }
        AmortizationSystem::Sac => {
            let amortization = principal / Decimal::from(term);
            amortize(principal, periodic_rate, term, |_, _, _| amortization)
        }
        AmortizationSystem::Sacre => {
            let mut block_amortization = Decimal::ZERO;
            amortize(principal, periodic_rate, term, |number, balance, _| {
                if (number - 1) % SACRE_BLOCK == 0 {
                    let remaining = term - number + 1;
                    block_amortization = balance / Decimal::from(remaining);
                }
                block_amortization
            })
        }
    };

    Ok(Schedule {
        principal,
        periodic_rate,
        system,
        installments,
    })
}

/// Same as [`generate`] for already validated parameters.
pub fn generate_for(params: &LoanParameters) -> FinancingResult<Schedule> {
    generate(params.principal, params.periodic_rate, params.term, params.system)
}

/// Runs the shared loop. `next_amortization(number, opening_balance, interest)`
/// decides the principal repaid in each period.
fn amortize<F>(principal: Money, periodic_rate: Rate, term: u32, mut next_amortization: F) -> Vec<Installment>
where
    F: FnMut(u32, Money, Money) -> Money,
{
    let mut balance = principal;
    let mut installments = Vec::with_capacity(term as usize);

    for number in 1..=term {
        let interest = balance * periodic_rate;
        let mut amortization = next_amortization(number, balance, interest);
        if number == term || amortization > balance {
            amortization = balance;
        }
        balance = (balance - amortization).max(Decimal::ZERO);

        installments.push(Installment::new(number, interest, amortization, balance));
    }

    installments
}

/// Stamps due dates one calendar month apart, starting at `first_due`.
pub fn with_due_dates(schedule: &Schedule, first_due: NaiveDate) -> FinancingResult<Schedule> {
    let installments = schedule
        .iter()
        .enumerate()
        .map(|(offset, installment)| {
            let due = first_due
                .checked_add_months(Months::new(offset as u32))
                .ok_or_else(|| FinancingError::invalid("first_due", "due date out of range"))?;
            Ok(Installment {
                due_date: Some(due),
                ..installment.clone()
            })
        })
        .collect::<FinancingResult<Vec<_>>>()?;

    Ok(schedule.with_installments(installments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn close(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn test_price_reference_values() {
        let schedule = generate(dec!(100000), dec!(0.01), 12, AmortizationSystem::Price).unwrap();

        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule.first().unwrap().gross_payment.round_dp(2), dec!(8884.88));
        assert!(close(schedule.total_interest(), dec!(6618.56), dec!(0.5)));
        assert_eq!(schedule.last().unwrap().remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_sac_reference_values() {
        let schedule = generate(dec!(100000), dec!(0.01), 12, AmortizationSystem::Sac).unwrap();

        assert_eq!(schedule.first().unwrap().gross_payment.round_dp(2), dec!(9333.33));
        assert_eq!(schedule.last().unwrap().gross_payment.round_dp(2), dec!(8416.67));
        assert!(close(schedule.total_interest(), dec!(6500), dec!(0.5)));
    }

    #[test]
    fn test_small_loan_totals() {
        let sac = generate(dec!(12000), dec!(0.01), 12, AmortizationSystem::Sac).unwrap();
        let sac_paid: Decimal = sac.iter().map(|i| i.gross_payment).sum();
        assert_eq!(sac_paid.round_dp(2), dec!(12780.00));

        let price = generate(dec!(12000), dec!(0.01), 12, AmortizationSystem::Price).unwrap();
        assert_eq!(price.first().unwrap().gross_payment.round_dp(2), dec!(1066.19));
    }

    #[rstest]
    #[case(AmortizationSystem::Price, dec!(250000), dec!(0.0085), 360)]
    #[case(AmortizationSystem::Sac, dec!(250000), dec!(0.0085), 360)]
    #[case(AmortizationSystem::Sacre, dec!(250000), dec!(0.0085), 360)]
    #[case(AmortizationSystem::Sacre, dec!(80000), dec!(0.012), 30)]
    #[case(AmortizationSystem::Price, dec!(5000), dec!(0), 7)]
    #[case(AmortizationSystem::Sac, dec!(1000), dec!(0.02), 1)]
    fn test_amortization_sums_to_principal(
        #[case] system: AmortizationSystem,
        #[case] principal: Money,
        #[case] rate: Rate,
        #[case] term: u32,
    ) {
        let schedule = generate(principal, rate, term, system).unwrap();

        assert_eq!(schedule.len(), term as usize);
        let relative = (schedule.total_amortization() - principal).abs() / principal;
        assert!(relative < dec!(0.000001));
        assert_eq!(schedule.last().unwrap().remaining_balance, Decimal::ZERO);

        let balances: Vec<Money> = schedule.iter().map(|i| i.remaining_balance).collect();
        assert!(balances.windows(2).all(|w| w[1] <= w[0]));
        assert!(balances.iter().all(|b| *b >= Decimal::ZERO));
    }

    #[test]
    fn test_price_payment_is_constant() {
        let schedule = generate(dec!(300000), dec!(0.009), 240, AmortizationSystem::Price).unwrap();
        let first = schedule.first().unwrap().gross_payment;
        assert!(schedule.iter().all(|i| close(i.gross_payment, first, dec!(0.000001))));
    }

    #[test]
    fn test_price_zero_rate_degenerates_to_straight_line() {
        let schedule = generate(dec!(1200), dec!(0), 12, AmortizationSystem::Price).unwrap();
        assert!(schedule.iter().all(|i| i.gross_payment == dec!(100) && i.interest.is_zero()));
    }

    #[test]
    fn test_sac_amortization_is_constant() {
        let schedule = generate(dec!(300000), dec!(0.009), 240, AmortizationSystem::Sac).unwrap();
        let first = schedule.first().unwrap().amortization;
        assert!(schedule.iter().all(|i| close(i.amortization, first, dec!(0.000001))));

        let payments: Vec<Money> = schedule.iter().map(|i| i.gross_payment).collect();
        assert!(payments.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_sacre_blocks_rebase_on_remaining_term() {
        let term = 30;
        let schedule = generate(dec!(90000), dec!(0.01), term, AmortizationSystem::Sacre).unwrap();

        for block in schedule.installments.chunks(SACRE_BLOCK as usize) {
            let amortization = block[0].amortization;
            assert!(block.iter().all(|i| close(i.amortization, amortization, dec!(0.000001))));
        }

        // the last block has six periods and is based on the balance after month 24
        let opening = schedule.opening_balance(24).unwrap();
        let expected = opening / dec!(6);
        assert!(close(schedule.installments[24].amortization, expected, dec!(0.000001)));
    }

    #[rstest]
    #[case(dec!(300000), dec!(0.05), 1200, dec!(15000))]
    #[case(dec!(300000), dec!(0.01), 7000, dec!(3000))]
    fn test_long_price_loan_pays_the_interest(
        #[case] principal: Money,
        #[case] rate: Rate,
        #[case] term: u32,
        #[case] interest_only: Money,
    ) {
        let schedule = generate(principal, rate, term, AmortizationSystem::Price).unwrap();

        assert_eq!(schedule.len(), term as usize);
        assert!(close(schedule.first().unwrap().gross_payment, interest_only, dec!(0.01)));
        assert!(close(schedule.total_amortization(), principal, dec!(0.000001)));
        assert_eq!(schedule.last().unwrap().remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_long_price_loan_can_be_corrected() {
        let schedule = generate(dec!(300000), dec!(0.05), 1200, AmortizationSystem::Price).unwrap();
        let series = vec![dec!(0.0008); schedule.len()];
        let corrected = crate::correction::apply_correction(&schedule, dec!(300000), &series).unwrap();
        assert_eq!(corrected.last().unwrap().remaining_balance, Decimal::ZERO);
    }

    #[rstest]
    #[case(dec!(0), dec!(0.01), 12)]
    #[case(dec!(1000), dec!(-0.001), 12)]
    #[case(dec!(1000), dec!(0.01), 0)]
    fn test_invalid_parameters(#[case] principal: Money, #[case] rate: Rate, #[case] term: u32) {
        let result = generate(principal, rate, term, AmortizationSystem::Price);
        assert!(matches!(result, Err(FinancingError::InvalidParameter { .. })));
    }

    #[test]
    fn test_regeneration_is_deterministic() {
        let params = LoanParameters::new(dec!(420000), dec!(0.0079), 420, AmortizationSystem::Sacre).unwrap();
        let first = generate_for(&params).unwrap();
        let second = generate_for(&params).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total_interest(), second.total_interest());
    }

    #[test]
    fn test_due_dates_advance_one_month() {
        let schedule = generate(dec!(1000), dec!(0.01), 3, AmortizationSystem::Sac).unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let dated = with_due_dates(&schedule, start).unwrap();

        let dates: Vec<NaiveDate> = dated.iter().filter_map(|i| i.due_date).collect();
        assert_eq!(
            dates,
            vec![
                start,
                NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            ]
        );
        assert_eq!(dated.total_interest(), schedule.total_interest());
    }
}
