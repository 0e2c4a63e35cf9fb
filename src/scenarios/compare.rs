//! Ranking of heterogeneous scenarios by net result, and side-by-side
//! comparison of financing offers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::financing::FinancingScenario;
use super::ScenarioSummary;
use crate::error::{FinancingError, FinancingResult};
use crate::types::{AmortizationSystem, Money, Rate};

/// Scenarios ordered from the best to the worst net result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub ranked: Vec<ScenarioSummary>,
    pub best: Option<ScenarioSummary>,
}

/// Sorts by descending net result; ties keep their input order.
pub fn compare(summaries: &[ScenarioSummary]) -> Comparison {
    let mut ranked = summaries.to_vec();
    ranked.sort_by(|a, b| b.net_result.cmp(&a.net_result));
    let best = ranked.first().cloned();
    Comparison { ranked, best }
}

/// One financing offer as shown in the comparison table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingRow {
    pub name: String,
    pub loan_amount: Money,
    pub system: AmortizationSystem,
    pub term: u32,
    pub periodic_rate: Rate,
    pub first_payment: Money,
    pub last_payment: Money,
    pub total_interest: Money,
    pub total_paid: Money,
}

/// Relative change of an offer against the first one (0.05 is 5% more).
/// `None` when the first offer's figure is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingDifference {
    pub name: String,
    pub loan_amount: Option<Rate>,
    pub first_payment: Option<Rate>,
    pub total_interest: Option<Rate>,
    pub total_paid: Option<Rate>,
}

/// Financing offers side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingComparison {
    pub table: Vec<FinancingRow>,
    /// Every offer after the first, against the first.
    pub differences: Vec<FinancingDifference>,
    /// Offer names from the cheapest to the most expensive.
    pub by_total_paid: Vec<String>,
    pub by_first_payment: Vec<String>,
    pub by_last_payment: Vec<String>,
}

/// Compares named financing offers. Rankings are ascending and ties keep
/// their input order.
///
/// # Errors
///
/// Returns [`FinancingError::InvalidParameter`] with fewer than two offers.
pub fn compare_financings(scenarios: &[(String, FinancingScenario)]) -> FinancingResult<FinancingComparison> {
    if scenarios.len() < 2 {
        return Err(FinancingError::invalid("scenarios", "at least two offers are needed"));
    }

    let table: Vec<FinancingRow> = scenarios
        .iter()
        .map(|(name, scenario)| FinancingRow {
            name: name.clone(),
            loan_amount: scenario.loan_amount,
            system: scenario.schedule.system,
            term: scenario.summary.term,
            periodic_rate: scenario.periodic_rate,
            first_payment: scenario.summary.first_payment,
            last_payment: scenario.summary.last_payment,
            total_interest: scenario.summary.total_interest,
            total_paid: scenario.summary.total_paid,
        })
        .collect();

    let base = &table[0];
    let differences = table[1..]
        .iter()
        .map(|row| FinancingDifference {
            name: row.name.clone(),
            loan_amount: relative_change(row.loan_amount, base.loan_amount),
            first_payment: relative_change(row.first_payment, base.first_payment),
            total_interest: relative_change(row.total_interest, base.total_interest),
            total_paid: relative_change(row.total_paid, base.total_paid),
        })
        .collect();

    Ok(FinancingComparison {
        by_total_paid: ranked_names(&table, |row| row.total_paid),
        by_first_payment: ranked_names(&table, |row| row.first_payment),
        by_last_payment: ranked_names(&table, |row| row.last_payment),
        differences,
        table,
    })
}

fn relative_change(value: Money, base: Money) -> Option<Rate> {
    (value - base).checked_div(base)
}

fn ranked_names<F>(table: &[FinancingRow], key: F) -> Vec<String>
where
    F: Fn(&FinancingRow) -> Money,
{
    let mut rows: Vec<&FinancingRow> = table.iter().collect();
    rows.sort_by_key(|row| key(row));
    rows.into_iter().map(|row| row.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charges::ChargeRates;
    use crate::correction::CorrectionIndex;
    use crate::rates::monthly_to_annual;
    use crate::scenarios::financing::{evaluate_financing, FinancingInput};
    use crate::scenarios::ScenarioKind;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn summary(kind: ScenarioKind, net_result: Decimal) -> ScenarioSummary {
        ScenarioSummary::new(kind, dec!(100000), dec!(100000) + net_result, net_result)
    }

    fn sample() -> Vec<ScenarioSummary> {
        vec![
            summary(ScenarioKind::Rent, dec!(-12000)),
            summary(ScenarioKind::Financing, dec!(35000)),
            summary(ScenarioKind::Consortium, dec!(35000)),
            summary(ScenarioKind::CashPurchase, dec!(80000)),
        ]
    }

    #[test]
    fn test_ranks_by_net_result_with_stable_ties() {
        let comparison = compare(&sample());

        let kinds: Vec<ScenarioKind> = comparison.ranked.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ScenarioKind::CashPurchase,
                ScenarioKind::Financing,
                ScenarioKind::Consortium,
                ScenarioKind::Rent,
            ]
        );
        assert_eq!(comparison.best.unwrap().kind, ScenarioKind::CashPurchase);
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let once = compare(&sample());
        let twice = compare(&once.ranked);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let input = sample();
        let before = input.clone();
        let _ = compare(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn test_empty_comparison() {
        let comparison = compare(&[]);
        assert!(comparison.ranked.is_empty());
        assert_eq!(comparison.best, None);
    }

    fn offer(system: AmortizationSystem, monthly_rate: Decimal, term_months: u32) -> FinancingScenario {
        evaluate_financing(&FinancingInput {
            property_value: dec!(100000),
            down_payment: dec!(0),
            fgts: dec!(0),
            acquisition_costs: dec!(0),
            annual_interest_rate: monthly_to_annual(monthly_rate).unwrap(),
            term_months,
            system,
            monthly_income: None,
            appreciation: dec!(0),
            charges: ChargeRates::default(),
            correction: CorrectionIndex::Fixed,
            first_due_date: None,
        })
        .unwrap()
    }

    #[test]
    fn test_compare_financing_offers() {
        let offers = vec![
            ("price".to_string(), offer(AmortizationSystem::Price, dec!(0.01), 120)),
            ("sac".to_string(), offer(AmortizationSystem::Sac, dec!(0.01), 120)),
            ("short".to_string(), offer(AmortizationSystem::Price, dec!(0.01), 60)),
        ];
        let comparison = compare_financings(&offers).unwrap();

        assert_eq!(comparison.table.len(), 3);
        assert_eq!(comparison.table[1].system, AmortizationSystem::Sac);
        assert_eq!(comparison.table[2].term, 60);

        // SAC starts higher and ends lower; the short loan pays least interest
        assert_eq!(comparison.by_total_paid, vec!["short", "sac", "price"]);
        assert_eq!(comparison.by_first_payment, vec!["price", "sac", "short"]);
        assert_eq!(comparison.by_last_payment, vec!["sac", "price", "short"]);

        let names: Vec<&str> = comparison.differences.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["sac", "short"]);
        let sac = &comparison.differences[0];
        assert_eq!(sac.loan_amount, Some(Decimal::ZERO));
        assert!(sac.first_payment.unwrap() > Decimal::ZERO);
        assert!(sac.total_interest.unwrap() < Decimal::ZERO);
        let expected = (comparison.table[1].total_paid - comparison.table[0].total_paid) / comparison.table[0].total_paid;
        assert_eq!(sac.total_paid, Some(expected));
    }

    #[test]
    fn test_equal_offers_keep_input_order() {
        let offers = vec![
            ("a".to_string(), offer(AmortizationSystem::Sac, dec!(0.01), 24)),
            ("b".to_string(), offer(AmortizationSystem::Sac, dec!(0.01), 24)),
        ];
        let comparison = compare_financings(&offers).unwrap();

        assert_eq!(comparison.by_total_paid, vec!["a", "b"]);
        assert_eq!(comparison.differences[0].total_paid, Some(Decimal::ZERO));
    }

    #[test]
    fn test_interest_free_base_has_no_relative_interest() {
        let mut free = offer(AmortizationSystem::Price, dec!(0.01), 12);
        free.summary.total_interest = Decimal::ZERO;
        let offers = vec![
            ("free".to_string(), free),
            ("paid".to_string(), offer(AmortizationSystem::Price, dec!(0.01), 12)),
        ];
        let comparison = compare_financings(&offers).unwrap();
        assert_eq!(comparison.differences[0].total_interest, None);
    }

    #[test]
    fn test_single_offer_is_rejected() {
        let offers = vec![("only".to_string(), offer(AmortizationSystem::Sac, dec!(0.01), 12))];
        assert!(matches!(
            compare_financings(&offers),
            Err(FinancingError::InvalidParameter { .. })
        ));
    }
}
