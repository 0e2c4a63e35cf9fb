//! Rate conversions and compounding helpers shared by the scenario evaluators.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::error::{FinancingError, FinancingResult};
use crate::types::{Money, Rate};

const MONTHS_PER_YEAR: Decimal = dec!(12);

fn growth_factor(rate: Rate, field: &str) -> FinancingResult<Decimal> {
    let base = Decimal::ONE + rate;
    if base <= Decimal::ZERO {
        return Err(FinancingError::invalid(field, "must be greater than -100%"));
    }
    Ok(base)
}

/// Converts an effective annual rate into the equivalent monthly rate.
///
/// `(1 + annual)^(1/12) - 1`
pub fn annual_to_monthly(annual_rate: Rate) -> FinancingResult<Rate> {
    let base = growth_factor(annual_rate, "annual_rate")?;
    Ok(base.powd(Decimal::ONE / MONTHS_PER_YEAR) - Decimal::ONE)
}

/// Converts a monthly rate into the equivalent effective annual rate.
///
/// `(1 + monthly)^12 - 1`
pub fn monthly_to_annual(monthly_rate: Rate) -> FinancingResult<Rate> {
    let base = growth_factor(monthly_rate, "monthly_rate")?;
    Ok(base.powu(12) - Decimal::ONE)
}

/// Normalizes an annual interest rate given as a percentage (10.5 for 10.5%)
/// to the equivalent monthly decimal rate.
pub fn normalize_annual_interest_rate(percent: Decimal) -> FinancingResult<Rate> {
    annual_to_monthly(percent / dec!(100))
}

/// `(1 + rate)^periods` for a whole number of periods.
pub fn growth(rate: Rate, periods: u32) -> FinancingResult<Decimal> {
    growth_factor(rate, "rate")?
        .checked_powu(u64::from(periods))
        .ok_or_else(|| FinancingError::invalid("rate", "compounding overflows"))
}

/// Compounds `present_value` for `periods` periods. Fractional periods are allowed.
pub fn future_value(present_value: Money, rate: Rate, periods: Decimal) -> FinancingResult<Money> {
    let base = growth_factor(rate, "rate")?;
    Ok(present_value * base.powd(periods))
}

/// Discounts `future_value` back `periods` periods.
pub fn present_value(future_value: Money, rate: Rate, periods: Decimal) -> FinancingResult<Money> {
    let base = growth_factor(rate, "rate")?;
    Ok(future_value / base.powd(periods))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_annual_interest_rate() {
        // (1.12)^(1/12) - 1 = 0.009488...
        let monthly = normalize_annual_interest_rate(dec!(12)).unwrap();
        assert!(monthly > dec!(0.0094) && monthly < dec!(0.0095));
    }

    #[test]
    fn test_monthly_annual_round_trip() {
        let monthly = annual_to_monthly(dec!(0.10)).unwrap();
        let annual = monthly_to_annual(monthly).unwrap();
        assert!((annual - dec!(0.10)).abs() < dec!(0.00001));
    }

    #[test]
    fn test_monthly_to_annual_one_percent() {
        let annual = monthly_to_annual(dec!(0.01)).unwrap();
        assert!((annual - dec!(0.126825)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_future_and_present_value() {
        let fv = future_value(dec!(1000), dec!(0.10), dec!(2)).unwrap();
        assert!((fv - dec!(1210)).abs() < dec!(0.01));
        let pv = present_value(fv, dec!(0.10), dec!(2)).unwrap();
        assert!((pv - dec!(1000)).abs() < dec!(0.01));
    }

    #[test]
    fn test_growth_is_exact_for_whole_periods() {
        assert_eq!(growth(dec!(0.10), 3).unwrap(), dec!(1.331));
        assert_eq!(growth(dec!(0.05), 0).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_rate_below_minus_one_is_rejected() {
        assert!(annual_to_monthly(dec!(-1)).is_err());
        assert!(future_value(dec!(100), dec!(-1.5), dec!(1)).is_err());
    }
}
