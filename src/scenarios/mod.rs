//! Scenario evaluators for every way of getting a home and the comparator
//! that ranks them.

pub mod cash;
pub mod compare;
pub mod consortium;
pub mod financing;
pub mod portability;
pub mod rent;

use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Kind of acquisition being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    CashPurchase,
    Financing,
    Consortium,
    Rent,
}

impl ScenarioKind {
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioKind::CashPurchase => "Cash purchase",
            ScenarioKind::Financing => "Financing",
            ScenarioKind::Consortium => "Consortium",
            ScenarioKind::Rent => "Rent",
        }
    }
}

/// The figures every scenario is ranked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub kind: ScenarioKind,
    pub label: String,
    /// Everything disbursed over the horizon.
    pub total_cost: Money,
    /// Property value, or investment value when renting, at the end of the horizon.
    pub future_value: Money,
    /// `future_value - total_cost`, adjusted per scenario.
    pub net_result: Money,
}

impl ScenarioSummary {
    pub fn new(kind: ScenarioKind, total_cost: Money, future_value: Money, net_result: Money) -> Self {
        ScenarioSummary {
            kind,
            label: kind.label().to_string(),
            total_cost,
            future_value,
            net_result,
        }
    }
}
