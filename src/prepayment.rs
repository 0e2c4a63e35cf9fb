//! Extraordinary (lump-sum) payments and their effect on the rest of a loan.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FinancingError, FinancingResult};
use crate::schedule::{generate, with_due_dates};
use crate::types::{AmortizationSystem, Installment, Money, Rate, Schedule};

/// What the borrower wants to shrink after prepaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepaymentPolicy {
    ReduceTerm,
    ReducePayment,
}

/// State of the loan at the moment of the extraordinary payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepaymentRequest {
    pub current_balance: Money,
    /// Installment currently being paid (gross, without charges).
    pub current_payment: Money,
    pub periodic_rate: Rate,
    pub remaining_term: u32,
    pub system: AmortizationSystem,
    pub lump_sum: Money,
    pub policy: PrepaymentPolicy,
}

/// Outcome of an extraordinary payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationImpact {
    pub original_balance: Money,
    pub new_balance: Money,
    pub lump_sum: Money,
    pub original_term: u32,
    pub new_term: u32,
    pub original_payment: Money,
    pub new_payment: Money,
    /// Remaining interest avoided, never negative.
    pub interest_savings: Money,
    pub term_reduction: u32,
    /// Can be negative when the new first payment is larger.
    pub payment_reduction: Money,
    pub fully_paid: bool,
}

/// Remaining schedule of a loan after an extraordinary payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepaymentOutcome {
    pub schedule: Schedule,
    pub impact: AmortizationImpact,
}

impl PrepaymentRequest {
    fn validate(&self) -> FinancingResult<()> {
        if self.current_balance <= Decimal::ZERO {
            return Err(FinancingError::invalid("current_balance", "must be greater than zero"));
        }
        if self.periodic_rate < Decimal::ZERO {
            return Err(FinancingError::invalid("periodic_rate", "cannot be negative"));
        }
        if self.remaining_term == 0 {
            return Err(FinancingError::invalid("remaining_term", "must be at least one period"));
        }
        if self.lump_sum <= Decimal::ZERO {
            return Err(FinancingError::invalid("lump_sum", "must be greater than zero"));
        }
        if self.lump_sum > self.current_balance {
            return Err(FinancingError::ExcessPayment {
                lump_sum: self.lump_sum,
                balance: self.current_balance,
            });
        }
        Ok(())
    }
}

/// Term, first payment and remaining interest after the prepayment.
struct Reamortized {
    term: u32,
    payment: Money,
    interest: Money,
}

/// Simulates a lump-sum payment against the outstanding balance.
///
/// # Errors
///
/// * [`FinancingError::ExcessPayment`] when the lump sum is above the balance.
/// * [`FinancingError::InvalidParameter`] for a non-positive balance or lump
///   sum, a negative rate or a zero remaining term.
pub fn simulate_prepayment(request: &PrepaymentRequest) -> FinancingResult<AmortizationImpact> {
    request.validate()?;

    let term = request.remaining_term;
    let rate = request.periodic_rate;
    let original_interest = generate(request.current_balance, rate, term, request.system)?.total_interest();
    let new_balance = request.current_balance - request.lump_sum;

    if new_balance.is_zero() {
        return Ok(AmortizationImpact {
            original_balance: request.current_balance,
            new_balance,
            lump_sum: request.lump_sum,
            original_term: term,
            new_term: 0,
            original_payment: request.current_payment,
            new_payment: Decimal::ZERO,
            interest_savings: original_interest,
            term_reduction: term,
            payment_reduction: request.current_payment,
            fully_paid: true,
        });
    }

    let outcome = match (request.policy, request.system) {
        (PrepaymentPolicy::ReducePayment, system) => {
            let schedule = generate(new_balance, rate, term, system)?;
            Reamortized {
                term,
                payment: first_payment(&schedule),
                interest: schedule.total_interest(),
            }
        }
        (PrepaymentPolicy::ReduceTerm, AmortizationSystem::Price) => {
            reduce_price_term(new_balance, request.current_payment, rate, term)?
        }
        (PrepaymentPolicy::ReduceTerm, system) => {
            // keep repaying the same principal per period
            let amortization = request.current_balance / Decimal::from(term);
            let periods = whole_periods((new_balance / amortization).ceil(), term);
            let schedule = generate(new_balance, rate, periods, system)?;
            Reamortized {
                term: periods,
                payment: first_payment(&schedule),
                interest: schedule.total_interest(),
            }
        }
    };

    debug!(
        policy = ?request.policy,
        system = %request.system,
        new_term = outcome.term,
        new_payment = %outcome.payment,
        "prepayment re-amortized"
    );

    Ok(AmortizationImpact {
        original_balance: request.current_balance,
        new_balance,
        lump_sum: request.lump_sum,
        original_term: term,
        new_term: outcome.term,
        original_payment: request.current_payment,
        new_payment: outcome.payment.max(Decimal::ZERO),
        interest_savings: (original_interest - outcome.interest).max(Decimal::ZERO),
        term_reduction: term - outcome.term,
        payment_reduction: request.current_payment - outcome.payment,
        fully_paid: false,
    })
}

/// Holds the PRICE payment and solves `n = -ln(1 - B·r/P) / ln(1 + r)`.
///
/// A payment that does not even cover the interest on the new balance falls
/// back to the payment that amortizes it over the original term.
fn reduce_price_term(balance: Money, payment: Money, rate: Rate, term: u32) -> FinancingResult<Reamortized> {
    let interest_due = balance * rate;

    if payment <= interest_due {
        warn!(
            payment = %payment,
            interest_due = %interest_due,
            "current payment does not cover interest on the new balance, keeping the term"
        );
        let schedule = generate(balance, rate, term, AmortizationSystem::Price)?;
        return Ok(Reamortized {
            term,
            payment: first_payment(&schedule),
            interest: schedule.total_interest(),
        });
    }

    let periods = if rate.is_zero() {
        (balance / payment).ceil()
    } else {
        let remaining_share = Decimal::ONE - interest_due / payment;
        (-remaining_share.ln() / (Decimal::ONE + rate).ln()).ceil()
    };
    let periods = whole_periods(periods, term);

    Ok(Reamortized {
        term: periods,
        payment,
        interest: replay_interest(balance, rate, payment, periods),
    })
}

/// Interest paid while a fixed `payment` runs `balance` down over `periods`.
fn replay_interest(balance: Money, rate: Rate, payment: Money, periods: u32) -> Money {
    held_payment_rows(balance, rate, payment, periods)
        .iter()
        .map(|row| row.interest)
        .sum()
}

/// Rows of a PRICE loan that keeps paying `payment`; the last row takes
/// whatever is left.
fn held_payment_rows(balance: Money, rate: Rate, payment: Money, periods: u32) -> Vec<Installment> {
    let mut balance = balance;
    let mut rows = Vec::with_capacity(periods as usize);
    for number in 1..=periods {
        let interest = balance * rate;
        let mut amortization = (payment - interest).max(Decimal::ZERO);
        if number == periods || amortization > balance {
            amortization = balance;
        }
        balance -= amortization;
        rows.push(Installment::new(number, interest, amortization, balance));
    }
    rows
}

fn whole_periods(periods: Decimal, max: u32) -> u32 {
    periods.to_u32().unwrap_or(max).clamp(1, max)
}

fn first_payment(schedule: &Schedule) -> Money {
    schedule.first().map(|i| i.gross_payment).unwrap_or_default()
}

/// Applies a lump sum right after installment `paid_installments` of
/// `schedule` and rebuilds the remaining rows.
///
/// Rows already paid are kept as they are; the new tail is renumbered and,
/// when the original rows carried due dates, keeps the same calendar. Tail
/// rows come without charges or correction: run
/// [`augment_charges`](crate::charges::augment_charges) over the returned
/// schedule to price them again.
///
/// # Errors
///
/// * [`FinancingError::EmptySchedule`] for a schedule without rows.
/// * [`FinancingError::InvalidParameter`] when no installment is left after
///   `paid_installments`.
/// * Any error of [`simulate_prepayment`].
pub fn prepay_schedule(
    schedule: &Schedule,
    paid_installments: usize,
    lump_sum: Money,
    policy: PrepaymentPolicy,
) -> FinancingResult<PrepaymentOutcome> {
    if schedule.is_empty() {
        return Err(FinancingError::EmptySchedule);
    }
    let next = schedule.installments.get(paid_installments).ok_or_else(|| {
        FinancingError::invalid(
            "paid_installments",
            format!("schedule has only {} installments", schedule.len()),
        )
    })?;

    let current_balance = match paid_installments {
        0 => schedule.principal,
        paid => schedule.installments[paid - 1].remaining_balance,
    };
    let impact = simulate_prepayment(&PrepaymentRequest {
        current_balance,
        current_payment: next.gross_payment,
        periodic_rate: schedule.periodic_rate,
        remaining_term: (schedule.len() - paid_installments) as u32,
        system: schedule.system,
        lump_sum,
        policy,
    })?;

    let mut installments: Vec<Installment> = schedule.installments[..paid_installments].to_vec();
    if !impact.fully_paid {
        let holds_payment = policy == PrepaymentPolicy::ReduceTerm
            && schedule.system == AmortizationSystem::Price
            && impact.new_payment == impact.original_payment;
        let mut tail = if holds_payment {
            schedule.with_installments(held_payment_rows(
                impact.new_balance,
                schedule.periodic_rate,
                impact.new_payment,
                impact.new_term,
            ))
        } else {
            generate(impact.new_balance, schedule.periodic_rate, impact.new_term, schedule.system)?
        };
        if let Some(first_due) = next.due_date {
            tail = with_due_dates(&tail, first_due)?;
        }
        let offset = paid_installments as u32;
        installments.extend(tail.installments.into_iter().map(|row| Installment {
            number: row.number + offset,
            ..row
        }));
    }

    Ok(PrepaymentOutcome {
        schedule: schedule.with_installments(installments),
        impact,
    })
}
