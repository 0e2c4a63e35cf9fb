use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::effective_rate::SolverSettings;
use crate::scenarios::cash::CashPurchaseInput;
use crate::scenarios::consortium::ConsortiumInput;
use crate::scenarios::financing::FinancingInput;
use crate::scenarios::portability::PortabilityRequest;
use crate::scenarios::rent::RentInput;

/// Every scenario the buyer wants compared. Missing scenarios are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioInputs {
    pub cash_purchase: Option<CashPurchaseInput>,
    pub financing: Option<FinancingInput>,
    pub consortium: Option<ConsortiumInput>,
    pub rent: Option<RentInput>,
    /// Offer from another bank for the financing above.
    pub portability: Option<PortabilityRequest>,
    pub solver: SolverSettings,
}

impl ScenarioInputs {
    /// Parses the inputs from JSON. Money and rates are decimal strings.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse scenario inputs")
    }

    pub fn is_empty(&self) -> bool {
        self.cash_purchase.is_none() && self.financing.is_none() && self.consortium.is_none() && self.rent.is_none()
    }
}
