//! Money helpers.
//!
//! Amounts are plain `Decimal`s in the clinic's single currency. The two-decimal
//! string produced by `format_money` is also the price component of the
//! reconciliation match key, so it must be stable for equal amounts.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Monetary amount in the clinic currency.
pub type Money = Decimal;

/// Render an amount with exactly two decimals (`150` → `"150.00"`).
///
/// Rounds half away from zero and never renders a negative zero.
pub fn format_money(amount: Money) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    format!("{rounded:.2}")
}

/// Reject negative amounts with a validation error naming the field.
pub fn ensure_non_negative(field: &str, amount: Money) -> DomainResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DomainError::validation(format!(
            "{field} must not be negative (got {})",
            format_money(amount)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn formats_fixed_two_decimals() {
        assert_eq!(format_money(dec!(150)), "150.00");
        assert_eq!(format_money(dec!(99.5)), "99.50");
        assert_eq!(format_money(dec!(0)), "0.00");
        assert_eq!(format_money(dec!(12.345)), "12.35");
        assert_eq!(format_money(dec!(-0.001)), "0.00");
    }

    #[test]
    fn equal_amounts_format_identically() {
        assert_eq!(format_money(dec!(100)), format_money(dec!(100.000)));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(ensure_non_negative("amount", dec!(0)).is_ok());
        assert!(ensure_non_negative("amount", dec!(10.00)).is_ok());

        let err = ensure_non_negative("amount", dec!(-1)).unwrap_err();
        assert_eq!(err, DomainError::validation("amount must not be negative (got -1.00)"));
    }
}
