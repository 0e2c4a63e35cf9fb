//! Monetary correction of the outstanding balance.
//!
//! Each period the balance is inflated by an index before interest and
//! amortization are recomputed with the rule of the schedule's own system.
//! The system travels with the schedule; it is never guessed from the shape
//! of the first rows.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{FinancingError, FinancingResult};
use crate::schedule::{fixed_payment, SACRE_BLOCK};
use crate::types::{AmortizationSystem, Installment, Money, Rate, Schedule};

/// Reference rate (TR), monthly.
pub const TR_MONTHLY: Rate = dec!(0.0008);
/// Consumer price index (IPCA), monthly.
pub const IPCA_MONTHLY: Rate = dec!(0.0038);
/// Savings account yield (poupança), monthly.
pub const SAVINGS_MONTHLY: Rate = dec!(0.0022);

/// Index used to correct the outstanding balance every period.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "rates")]
pub enum CorrectionIndex {
    /// No correction.
    #[default]
    Fixed,
    Tr,
    Ipca,
    Savings,
    /// Caller supplied monthly series.
    Custom(Vec<Rate>),
}

impl CorrectionIndex {
    /// Flat monthly rate of the preset indices.
    pub fn monthly_rate(&self) -> Option<Rate> {
        match self {
            CorrectionIndex::Fixed => Some(Decimal::ZERO),
            CorrectionIndex::Tr => Some(TR_MONTHLY),
            CorrectionIndex::Ipca => Some(IPCA_MONTHLY),
            CorrectionIndex::Savings => Some(SAVINGS_MONTHLY),
            CorrectionIndex::Custom(_) => None,
        }
    }

    /// Series with one entry per period. Custom series are returned as given.
    pub fn series(&self, periods: usize) -> Vec<Rate> {
        match (self, self.monthly_rate()) {
            (CorrectionIndex::Custom(rates), _) => rates.clone(),
            (_, Some(rate)) => vec![rate; periods],
            (_, None) => Vec::new(),
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, CorrectionIndex::Fixed)
    }
}

/// Re-derives `schedule` with the balance corrected by `index_series`.
///
/// `index_series` needs one fractional entry per installment (0.0008 for
/// 0.08%); extra entries are ignored. Insurance, fees and due dates already
/// on the rows are carried over.
///
/// # Errors
///
/// * [`FinancingError::EmptySchedule`] for a schedule without rows.
/// * [`FinancingError::InvalidParameter`] for a non-positive principal, a
///   series shorter than the schedule or an index at or below -100%.
pub fn apply_correction(schedule: &Schedule, principal: Money, index_series: &[Rate]) -> FinancingResult<Schedule> {
    if schedule.is_empty() {
        return Err(FinancingError::EmptySchedule);
    }
    if principal <= Decimal::ZERO {
        return Err(FinancingError::invalid("principal", "must be greater than zero"));
    }
    if index_series.len() < schedule.len() {
        return Err(FinancingError::invalid(
            "index_series",
            format!("expected {} entries, got {}", schedule.len(), index_series.len()),
        ));
    }

    let rate = schedule.periodic_rate;
    let periods = schedule.len();
    let mut balance = principal;
    let mut block_amortization = Decimal::ZERO;
    let mut installments = Vec::with_capacity(periods);

    for (offset, (row, index)) in schedule.iter().zip(index_series).enumerate() {
        if *index <= dec!(-1) {
            return Err(FinancingError::invalid("index_series", "index must be greater than -100%"));
        }

        let correction = balance * index;
        balance += correction;

        let remaining = (periods - offset) as u32;
        let interest = balance * rate;
        let mut amortization = if balance <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            match schedule.system {
                AmortizationSystem::Price => fixed_payment(balance, rate, remaining)? - interest,
                AmortizationSystem::Sac => balance / Decimal::from(remaining),
                AmortizationSystem::Sacre => {
                    if offset as u32 % SACRE_BLOCK == 0 {
                        block_amortization = balance / Decimal::from(remaining);
                    } else {
                        block_amortization *= Decimal::ONE + index;
                    }
                    block_amortization
                }
            }
        };
        if remaining == 1 || amortization > balance {
            amortization = balance;
        }
        balance = (balance - amortization).max(Decimal::ZERO);

        let gross_payment = interest + amortization;
        installments.push(Installment {
            gross_payment,
            interest,
            amortization,
            correction,
            total_payment: gross_payment + row.insurance + row.fee,
            remaining_balance: balance,
            ..row.clone()
        });
    }

    Ok(Schedule {
        principal,
        ..schedule.with_installments(installments)
    })
}
