//! Buying the property outright.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ScenarioKind, ScenarioSummary};
use crate::error::{FinancingError, FinancingResult};
use crate::rates::growth;
use crate::types::{Money, Rate};

/// Input parameters for a cash purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashPurchaseInput {
    pub property_value: Money,
    /// Transfer tax, deed and registry costs.
    #[serde(default)]
    pub acquisition_costs: Money,
    /// Maintenance per year at today's prices.
    #[serde(default)]
    pub annual_maintenance: Money,
    pub horizon_years: u32,
    /// Annual return the money would earn if invested instead.
    pub alternative_return: Rate,
    /// Annual inflation applied to maintenance.
    #[serde(default)]
    pub inflation: Rate,
    /// Annual appreciation of the property.
    #[serde(default)]
    pub appreciation: Rate,
}

/// Results of a cash purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashPurchaseResult {
    pub total_acquisition_cost: Money,
    /// What the same money would have earned at the alternative return.
    pub opportunity_cost: Money,
    pub future_property_value: Money,
    pub accumulated_maintenance: Money,
    /// Appreciation net of maintenance, over the property value.
    pub investment_return: Rate,
    pub net_result: Money,
}

impl CashPurchaseResult {
    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary::new(
            ScenarioKind::CashPurchase,
            self.total_acquisition_cost + self.accumulated_maintenance,
            self.future_property_value,
            self.net_result,
        )
    }
}

/// Buying outright: the money leaves the alternative investment, the
/// property appreciates and maintenance grows with inflation.
pub fn evaluate_cash_purchase(input: &CashPurchaseInput) -> FinancingResult<CashPurchaseResult> {
    if input.property_value <= Decimal::ZERO {
        return Err(FinancingError::invalid("property_value", "must be greater than zero"));
    }
    if input.acquisition_costs < Decimal::ZERO || input.annual_maintenance < Decimal::ZERO {
        return Err(FinancingError::invalid("costs", "cannot be negative"));
    }
    if input.horizon_years == 0 {
        return Err(FinancingError::invalid("horizon_years", "must be at least one year"));
    }

    let total_acquisition_cost = input.property_value + input.acquisition_costs;
    let opportunity_cost =
        total_acquisition_cost * growth(input.alternative_return, input.horizon_years)? - total_acquisition_cost;
    let future_property_value = input.property_value * growth(input.appreciation, input.horizon_years)?;

    let mut accumulated_maintenance = Decimal::ZERO;
    for year in 0..input.horizon_years {
        accumulated_maintenance += input.annual_maintenance * growth(input.inflation, year)?;
    }

    let investment_return =
        (future_property_value - input.property_value - accumulated_maintenance) / input.property_value;
    let net_result = future_property_value - total_acquisition_cost - accumulated_maintenance;

    Ok(CashPurchaseResult {
        total_acquisition_cost,
        opportunity_cost,
        future_property_value,
        accumulated_maintenance,
        investment_return,
        net_result,
    })
}
