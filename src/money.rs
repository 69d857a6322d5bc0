//! Conversion between decimal amounts and the integer cents stored in the database.
//!
//! Amounts are stored as whole cents so that SQL aggregates are exact. The
//! [Decimal] values handed to and returned from the rest of the crate always
//! have two fraction digits.

use rust_decimal::Decimal;

use crate::Error;

/// The number of fraction digits kept for every amount.
const SCALE: u32 = 2;

/// Convert `amount` to whole cents, rounding to two decimal places first.
///
/// # Errors
/// Returns [Error::AmountOutOfRange] if the amount does not fit into an `i64` number of cents.
pub(crate) fn to_cents(amount: Decimal) -> Result<i64, Error> {
    let mut rounded = amount.round_dp(SCALE);
    rounded.rescale(SCALE);

    i64::try_from(rounded.mantissa()).map_err(|_| Error::AmountOutOfRange(amount))
}

/// Convert `amount` to whole cents, rejecting zero and negative amounts.
///
/// # Errors
/// Returns [Error::InvalidAmount] if the amount rounds to zero or less, or
/// [Error::AmountOutOfRange] if it does not fit into an `i64` number of cents.
pub(crate) fn to_positive_cents(amount: Decimal) -> Result<i64, Error> {
    let cents = to_cents(amount)?;

    if cents <= 0 {
        return Err(Error::InvalidAmount(amount));
    }

    Ok(cents)
}

/// Convert a stored number of cents back to a decimal amount.
pub(crate) fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::Error;

    use super::{from_cents, to_cents, to_positive_cents};

    #[test]
    fn to_cents_scales_whole_amounts() {
        assert_eq!(to_cents(dec!(100)), Ok(10_000));
        assert_eq!(to_cents(dec!(12.3)), Ok(1_230));
        assert_eq!(to_cents(dec!(-0.05)), Ok(-5));
    }

    #[test]
    fn to_cents_rounds_extra_fraction_digits() {
        assert_eq!(to_cents(dec!(0.125)), Ok(12));
        assert_eq!(to_cents(dec!(0.135)), Ok(14));
    }

    #[test]
    fn to_cents_rejects_amounts_that_overflow() {
        let huge = Decimal::MAX;

        assert_eq!(to_cents(huge), Err(Error::AmountOutOfRange(huge)));
    }

    #[test]
    fn to_positive_cents_rejects_zero_and_negative() {
        assert_eq!(to_positive_cents(dec!(0)), Err(Error::InvalidAmount(dec!(0))));
        assert_eq!(
            to_positive_cents(dec!(-1.50)),
            Err(Error::InvalidAmount(dec!(-1.50)))
        );
        assert_eq!(
            to_positive_cents(dec!(0.001)),
            Err(Error::InvalidAmount(dec!(0.001)))
        );
    }

    #[test]
    fn from_cents_keeps_two_fraction_digits() {
        let amount = from_cents(13_500);

        assert_eq!(amount, dec!(135.00));
        assert_eq!(amount.to_string(), "135.00");
    }
}
