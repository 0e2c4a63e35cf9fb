//! Renting while the money that would buy the property stays invested.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{ScenarioKind, ScenarioSummary};
use crate::error::{FinancingError, FinancingResult};
use crate::rates::growth;
use crate::types::{Money, Rate};

/// Renting, with the purchase money invested instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentInput {
    pub monthly_rent: Money,
    /// Yearly readjustment of the rent (IGP-M or similar).
    pub annual_adjustment_rate: Rate,
    pub horizon_years: u32,
    #[serde(default)]
    pub deposit: Money,
    /// Yearly rental guarantee insurance.
    #[serde(default)]
    pub annual_insurance: Money,
    /// Monthly fee of the letting agent.
    #[serde(default)]
    pub monthly_administration_fee: Money,
    /// Yearly property tax (IPTU), corrected by inflation.
    #[serde(default)]
    pub annual_property_tax: Money,
    /// Monthly condominium fee, corrected by inflation.
    #[serde(default)]
    pub monthly_condominium_fee: Money,
    /// Amount invested instead of buying.
    #[serde(default)]
    pub investment: Money,
    pub investment_return: Rate,
    #[serde(default)]
    pub inflation: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentYear {
    pub year: u32,
    pub monthly_rent: Money,
    pub annual_rent: Money,
    pub administration_fee: Money,
    pub property_tax: Money,
    pub condominium_fee: Money,
    pub insurance: Money,
    pub annual_total: Money,
    pub cumulative_rent: Money,
    /// Everything paid so far, deposit included.
    pub cumulative_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentResult {
    pub total_rent: Money,
    pub total_additional_costs: Money,
    pub initial_costs: Money,
    pub total_cost: Money,
    pub future_investment_value: Money,
    pub investment_gain: Money,
    /// Investment value minus everything paid. Negative when renting costs
    /// more than the investment earns.
    pub net_result: Money,
    pub evolution: Vec<RentYear>,
}

impl RentResult {
    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary::new(
            ScenarioKind::Rent,
            self.total_cost,
            self.future_investment_value,
            self.net_result,
        )
    }
}

/// Rent and additional costs year by year, against what the investment
/// is worth at the end of the horizon.
pub fn evaluate_rent(input: &RentInput) -> FinancingResult<RentResult> {
    if input.monthly_rent <= Decimal::ZERO {
        return Err(FinancingError::invalid("monthly_rent", "must be greater than zero"));
    }
    if input.horizon_years == 0 {
        return Err(FinancingError::invalid("horizon_years", "must be at least one year"));
    }
    let costs = [
        input.deposit,
        input.annual_insurance,
        input.monthly_administration_fee,
        input.annual_property_tax,
        input.monthly_condominium_fee,
        input.investment,
    ];
    if costs.iter().any(|cost| *cost < Decimal::ZERO) {
        return Err(FinancingError::invalid("costs", "cannot be negative"));
    }

    let rent_factor = Decimal::ONE + input.annual_adjustment_rate;
    let inflation_factor = Decimal::ONE + input.inflation;
    let administration_fee = input.monthly_administration_fee * dec!(12);

    let mut monthly_rent = input.monthly_rent;
    let mut condominium = input.monthly_condominium_fee;
    let mut property_tax = input.annual_property_tax;
    let mut total_rent = Decimal::ZERO;
    let mut total_additional_costs = Decimal::ZERO;
    let mut evolution = Vec::with_capacity(input.horizon_years as usize);

    for year in 1..=input.horizon_years {
        if year > 1 {
            monthly_rent *= rent_factor;
            condominium *= inflation_factor;
            property_tax *= inflation_factor;
        }

        let annual_rent = monthly_rent * dec!(12);
        let condominium_fee = condominium * dec!(12);
        let additional = administration_fee + property_tax + condominium_fee + input.annual_insurance;
        total_rent += annual_rent;
        total_additional_costs += additional;

        evolution.push(RentYear {
            year,
            monthly_rent,
            annual_rent,
            administration_fee,
            property_tax,
            condominium_fee,
            insurance: input.annual_insurance,
            annual_total: annual_rent + additional,
            cumulative_rent: total_rent,
            cumulative_total: total_rent + total_additional_costs + input.deposit,
        });
    }

    let future_investment_value = input.investment * growth(input.investment_return, input.horizon_years)?;
    let total_cost = total_rent + total_additional_costs + input.deposit;

    Ok(RentResult {
        total_rent,
        total_additional_costs,
        initial_costs: input.deposit,
        total_cost,
        future_investment_value,
        investment_gain: future_investment_value - input.investment,
        net_result: future_investment_value - total_cost,
        evolution,
    })
}
