//! Cart totals and price formatting.
//!
//! All arithmetic is done on integer minor units. The total is always the sum
//! of each selected license's own price, computed server-side.

use crate::error::CoreError;
use crate::types::MinorUnits;

/// Default settlement currency (ISO 4217, lowercase as the payment API expects).
pub const DEFAULT_CURRENCY: &str = "usd";

/// Sum item prices, rejecting negative prices and overflow.
pub fn cart_total<I>(prices: I) -> Result<MinorUnits, CoreError>
where
    I: IntoIterator<Item = MinorUnits>,
{
    prices.into_iter().try_fold(0, |acc: MinorUnits, price| {
        if price < 0 {
            return Err(CoreError::Validation(format!(
                "Negative price {price} in cart"
            )));
        }
        acc.checked_add(price)
            .ok_or_else(|| CoreError::Validation("Cart total overflows".into()))
    })
}

/// Render minor units as a human-readable amount, e.g. `12800` -> `"$128.00"`.
///
/// Only the symbol varies by currency; unknown currencies fall back to the
/// uppercase code as a suffix.
pub fn format_amount(amount: MinorUnits, currency: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let major = abs / 100;
    let minor = abs % 100;
    match currency.to_ascii_lowercase().as_str() {
        "usd" => format!("{sign}${major}.{minor:02}"),
        "eur" => format!("{sign}€{major}.{minor:02}"),
        "gbp" => format!("{sign}£{major}.{minor:02}"),
        other => format!("{sign}{major}.{minor:02} {}", other.to_ascii_uppercase()),
    }
}
