//! `br_housing` is a Rust library for comparing the ways of acquiring real estate in Brazil.
//!
//! It evaluates four scenarios side by side: buying in cash, bank financing, a
//! group-buying pool (*consórcio*) and renting while the money stays invested.
//! Financing is backed by an amortization engine for the three systems in use in Brazil:
//! - **PRICE (Sistema Francês de Amortização)**: fixed total payments throughout the term.
//! - **SAC (Sistema de Amortização Constante)**: fixed amortization, leading to decreasing
//!   payments over time.
//! - **SACRE (Sistema de Amortização Crescente)**: amortization recalculated every twelve
//!   months over what is left of the balance.
//!
//! On top of the schedules the engine applies monetary correction (TR, IPCA, savings or a
//! custom series), insurance and fees, finds the effective total cost (CET) and simulates
//! extraordinary payments.
//!
//! ## Usage
//!
//! Add `br_housing` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! br_housing = "0.5.0"
//! rust_decimal = "1.39.0"
//! rust_decimal_macros = "1.39.0"
//! ```
//!
//! Then generate a schedule and summarize it:
//!
//! ```rust
//! use br_housing::{generate, summarize, AmortizationSystem};
//! use rust_decimal_macros::dec;
//!
//! fn main() {
//!     let schedule = generate(dec!(100_000), dec!(0.01), 12, AmortizationSystem::Price)
//!         .expect("valid loan");
//!
//!     match summarize(&schedule, Some(dec!(40_000))) {
//!         Ok(summary) => {
//!             println!("First Payment:  {:.2}", summary.first_payment);
//!             println!("Total Interest: {:.2}", summary.total_interest);
//!             println!("Total Paid:     {:.2}", summary.total_paid);
//!         }
//!         Err(e) => {
//!             eprintln!("Error summarizing schedule: {}", e);
//!         }
//!     }
//! }
//! ```
//!
//! To compare several scenarios at once, describe them in JSON and call
//! [`evaluate_scenarios`]:
//!
//! ```rust
//! use br_housing::{evaluate_scenarios, ScenarioInputs};
//!
//! fn main() -> anyhow::Result<()> {
//!     let inputs = ScenarioInputs::from_json(r#"{
//!         "cash_purchase": {
//!             "property_value": "300000",
//!             "horizon_years": 10,
//!             "alternative_return": "0.08",
//!             "appreciation": "0.05"
//!         },
//!         "rent": {
//!             "monthly_rent": "1500",
//!             "annual_adjustment_rate": "0.05",
//!             "horizon_years": 10,
//!             "investment": "300000",
//!             "investment_return": "0.08"
//!         }
//!     }"#)?;
//!
//!     let report = evaluate_scenarios(&inputs)?;
//!     if let Some(best) = &report.comparison.best {
//!         println!("Best option: {} ({:.2})", best.label, best.net_result);
//!     }
//!     Ok(())
//! }
//! ```

pub mod charges;
pub mod config;
pub mod correction;
pub mod effective_rate;
pub mod error;
pub mod prepayment;
pub mod rates;
pub mod scenarios;
pub mod schedule;
pub mod summary;
pub mod types;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use charges::{augment_charges, ChargeRates};
pub use config::ScenarioInputs;
pub use correction::{apply_correction, CorrectionIndex};
pub use effective_rate::{effective_rate, effective_rate_with, npv, EffectiveRate, SolverSettings};
pub use error::{FinancingError, FinancingResult};
pub use prepayment::{
    prepay_schedule, simulate_prepayment, AmortizationImpact, PrepaymentOutcome, PrepaymentPolicy,
    PrepaymentRequest,
};
pub use rates::{annual_to_monthly, future_value, monthly_to_annual, normalize_annual_interest_rate, present_value};
pub use scenarios::cash::{evaluate_cash_purchase, CashPurchaseInput, CashPurchaseResult};
pub use scenarios::compare::{
    compare, compare_financings, Comparison, FinancingComparison, FinancingDifference, FinancingRow,
};
pub use scenarios::consortium::{evaluate_consortium, ConsortiumInput, ConsortiumResult};
pub use scenarios::financing::{
    evaluate_financing, evaluate_financing_with, prepay_financing, FinancingInput, FinancingPrepayment,
    FinancingScenario,
};
pub use scenarios::portability::{simulate_portability, PortabilityRequest, PortabilityResult};
pub use scenarios::rent::{evaluate_rent, RentInput, RentResult};
pub use scenarios::{ScenarioKind, ScenarioSummary};
pub use schedule::{fixed_payment, generate, generate_for, with_due_dates};
pub use summary::{payment_capacity, summarize, summarize_with, FinancingSummary, PaymentCapacity};
pub use types::{AmortizationSystem, Installment, LoanParameters, Money, Rate, Schedule};

/// Detailed results of every evaluated scenario and their ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub cash_purchase: Option<CashPurchaseResult>,
    pub financing: Option<FinancingScenario>,
    pub consortium: Option<ConsortiumResult>,
    pub rent: Option<RentResult>,
    /// Refinancing of the financing above at another bank.
    pub portability: Option<PortabilityResult>,
    pub comparison: Comparison,
}

/// Evaluates every scenario present in `inputs` and ranks them by net result.
///
/// This is the main entry point of the library.
///
/// # Errors
///
/// Returns the first scenario that fails, wrapped with the name of the scenario.
pub fn evaluate_scenarios(inputs: &ScenarioInputs) -> anyhow::Result<ScenarioReport> {
    if inputs.is_empty() {
        debug!("no scenario to evaluate");
    }
    let mut summaries = Vec::with_capacity(4);

    let cash_purchase = inputs
        .cash_purchase
        .as_ref()
        .map(evaluate_cash_purchase)
        .transpose()
        .context("Failed to evaluate the cash purchase")?;
    summaries.extend(cash_purchase.as_ref().map(CashPurchaseResult::summary));

    let financing = inputs
        .financing
        .as_ref()
        .map(|input| evaluate_financing_with(input, &inputs.solver))
        .transpose()
        .context("Failed to evaluate the financing")?;
    summaries.extend(financing.as_ref().map(FinancingScenario::summary));

    let consortium = inputs
        .consortium
        .as_ref()
        .map(evaluate_consortium)
        .transpose()
        .context("Failed to evaluate the consortium")?;
    summaries.extend(consortium.as_ref().map(ConsortiumResult::summary));

    let rent = inputs
        .rent
        .as_ref()
        .map(evaluate_rent)
        .transpose()
        .context("Failed to evaluate the rent")?;
    summaries.extend(rent.as_ref().map(RentResult::summary));

    let portability = match (&inputs.financing, &financing, &inputs.portability) {
        (Some(input), Some(scenario), Some(request)) => Some(
            simulate_portability(input, scenario, request, &inputs.solver)
                .context("Failed to simulate the portability")?,
        ),
        (_, _, Some(_)) => anyhow::bail!("Portability needs a financing scenario"),
        _ => None,
    };

    let comparison = compare(&summaries);
    debug!(
        scenarios = summaries.len(),
        best = ?comparison.best.as_ref().map(|s| s.kind),
        "scenarios ranked"
    );

    Ok(ScenarioReport {
        cash_purchase,
        financing,
        consortium,
        rent,
        portability,
        comparison,
    })
}
