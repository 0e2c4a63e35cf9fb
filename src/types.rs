use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FinancingError, FinancingResult};

/// Monetary amounts. Always `Decimal`, never `f64`.
pub type Money = Decimal;

/// Rates expressed as decimals (0.01 = 1%), never as percentages.
pub type Rate = Decimal;

/// Amortization system used to build a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AmortizationSystem {
    /// French system: constant payment.
    Price,
    /// Constant amortization.
    Sac,
    /// Amortization recalculated every twelve periods.
    Sacre,
}

impl fmt::Display for AmortizationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AmortizationSystem::Price => "PRICE",
            AmortizationSystem::Sac => "SAC",
            AmortizationSystem::Sacre => "SACRE",
        };
        f.write_str(name)
    }
}

impl FromStr for AmortizationSystem {
    type Err = FinancingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRICE" => Ok(AmortizationSystem::Price),
            "SAC" => Ok(AmortizationSystem::Sac),
            "SACRE" => Ok(AmortizationSystem::Sacre),
            other => Err(FinancingError::invalid(
                "system",
                format!("unknown amortization system '{other}'"),
            )),
        }
    }
}

/// Validated loan inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanParameters {
    /// Amount financed.
    pub principal: Money,
    /// Interest rate per period as a decimal.
    pub periodic_rate: Rate,
    /// Number of periods.
    pub term: u32,
    pub system: AmortizationSystem,
}

impl LoanParameters {
    pub fn new(
        principal: Money,
        periodic_rate: Rate,
        term: u32,
        system: AmortizationSystem,
    ) -> FinancingResult<Self> {
        validate_loan(principal, periodic_rate, term)?;
        Ok(LoanParameters {
            principal,
            periodic_rate,
            term,
            system,
        })
    }
}

pub(crate) fn validate_loan(principal: Money, periodic_rate: Rate, term: u32) -> FinancingResult<()> {
    if principal <= Decimal::ZERO {
        return Err(FinancingError::invalid("principal", "must be greater than zero"));
    }
    if periodic_rate < Decimal::ZERO {
        return Err(FinancingError::invalid("periodic_rate", "cannot be negative"));
    }
    if term == 0 {
        return Err(FinancingError::invalid("term", "must be at least one period"));
    }
    Ok(())
}

/// A single row of an amortization schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// Sequence number, starting at 1.
    pub number: u32,
    /// Interest plus amortization.
    pub gross_payment: Money,
    pub interest: Money,
    pub amortization: Money,
    /// Monetary correction added to the balance before this payment.
    pub correction: Money,
    pub insurance: Money,
    pub fee: Money,
    /// Gross payment plus insurance and fees.
    pub total_payment: Money,
    /// Balance left after this payment.
    pub remaining_balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl Installment {
    /// Balance before this payment and before its correction.
    pub fn opening_balance(&self) -> Money {
        self.remaining_balance + self.amortization - self.correction
    }

    pub(crate) fn new(number: u32, interest: Money, amortization: Money, remaining_balance: Money) -> Self {
        let gross_payment = interest + amortization;
        Installment {
            number,
            gross_payment,
            interest,
            amortization,
            correction: Decimal::ZERO,
            insurance: Decimal::ZERO,
            fee: Decimal::ZERO,
            total_payment: gross_payment,
            remaining_balance,
            due_date: None,
        }
    }
}

/// Ordered installments of one loan, together with the inputs that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub principal: Money,
    pub periodic_rate: Rate,
    pub system: AmortizationSystem,
    pub installments: Vec<Installment>,
}

impl Schedule {
    /// Number of installments.
    pub fn len(&self) -> usize {
        self.installments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }

    pub fn first(&self) -> Option<&Installment> {
        self.installments.first()
    }

    pub fn last(&self) -> Option<&Installment> {
        self.installments.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Installment> {
        self.installments.iter()
    }

    /// Balance owed right before installment `index` (zero based) is paid,
    /// not counting any correction applied in that period.
    pub fn opening_balance(&self, index: usize) -> Option<Money> {
        self.installments.get(index).map(Installment::opening_balance)
    }

    pub fn total_interest(&self) -> Money {
        self.iter().map(|i| i.interest).sum()
    }

    pub fn total_amortization(&self) -> Money {
        self.iter().map(|i| i.amortization).sum()
    }

    /// Installments with a new copy of the same loan header.
    pub(crate) fn with_installments(&self, installments: Vec<Installment>) -> Schedule {
        Schedule {
            principal: self.principal,
            periodic_rate: self.periodic_rate,
            system: self.system,
            installments,
        }
    }
}
