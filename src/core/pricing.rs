//! Discount pricing rules.
//!
//! A product keeps its undiscounted price in `old_price` while
//! `discount_percent` is above zero and exposes the discounted value in
//! `price`. These functions are pure; the product entity calls
//! [`derive_price`] from its save hook so every write path obeys them.

use crate::errors::{Error, Result};

/// Lowest price any product can have after a save.
pub const MIN_PRICE: i64 = 1;

/// Highest list price a product can be saved with.
pub const MAX_PRICE: i64 = 1_000_000_000_000;

/// Highest accepted discount.
pub const MAX_DISCOUNT_PERCENT: i32 = 100;

/// Result of applying the discount rules to a product's prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedPrice {
    /// Price the customer pays
    pub price: i64,
    /// Undiscounted price, `Some` only while a discount is active
    pub old_price: Option<i64>,
}

/// Checks that a discount lies in `0..=100`.
///
/// # Errors
/// Returns [`Error::InvalidDiscount`] otherwise.
pub fn validate_discount(percent: i32) -> Result<()> {
    if percent < 0 || percent > MAX_DISCOUNT_PERCENT {
        return Err(Error::InvalidDiscount { percent });
    }
    Ok(())
}

/// Checks that a list price lies in `MIN_PRICE..=MAX_PRICE`.
///
/// # Errors
/// Returns [`Error::InvalidPrice`] otherwise.
pub fn validate_price(price: i64) -> Result<()> {
    if !(MIN_PRICE..=MAX_PRICE).contains(&price) {
        return Err(Error::InvalidPrice { price });
    }
    Ok(())
}

/// Applies `percent` to `original`, rounding down and never going below
/// [`MIN_PRICE`].
#[must_use]
pub fn discounted(original: i64, percent: i32) -> i64 {
    let keep = i64::from(MAX_DISCOUNT_PERCENT - percent.clamp(0, MAX_DISCOUNT_PERCENT));
    (original.saturating_mul(keep) / 100).max(MIN_PRICE)
}

/// Unit price times quantity.
///
/// # Errors
/// Returns [`Error::Validation`] if the product does not fit in an `i64`.
pub fn line_total(price: i64, quantity: i32) -> Result<i64> {
    price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| Error::Validation {
            message: format!("Line total for {quantity} x {price} is too large"),
        })
}

/// Sums line totals.
///
/// # Errors
/// Returns [`Error::Validation`] if the sum does not fit in an `i64`.
pub fn sum_totals<I>(totals: I) -> Result<i64>
where
    I: IntoIterator<Item = i64>,
{
    totals
        .into_iter()
        .try_fold(0_i64, i64::checked_add)
        .ok_or_else(|| Error::Validation {
            message: "Total is too large".to_string(),
        })
}

/// Derives the stored prices from the current column values.
///
/// * discount > 0, no `old_price`: the current price becomes `old_price` and
///   `price` is discounted from it.
/// * discount > 0, `old_price` set: `price` is recomputed from `old_price`,
///   so changing the discount never compounds.
/// * discount == 0, `old_price` set: the original price is restored.
/// * discount == 0, no `old_price`: nothing changes.
#[must_use]
pub fn derive_price(price: i64, old_price: Option<i64>, discount_percent: i32) -> DerivedPrice {
    if discount_percent > 0 {
        let original = old_price.unwrap_or(price);
        return DerivedPrice {
            price: discounted(original, discount_percent),
            old_price: Some(original),
        };
    }

    match old_price {
        Some(original) => DerivedPrice {
            price: original.max(MIN_PRICE),
            old_price: None,
        },
        None => DerivedPrice {
            price: price.max(MIN_PRICE),
            old_price: None,
        },
    }
}
