// 💰 Money - fixed-point amounts for the accrual ledger
//
// Amounts live in SQLite under whatever storage class the column affinity
// produced (INTEGER, REAL or TEXT). They are lifted into `Decimal` on read so
// repeated daily additions never drift, and written back as decimal text.

use rusqlite::types::ValueRef;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Currency prefix used in progress output
pub const CURRENCY_SYMBOL: &str = "K";

/// Convert a raw SQLite value into a `Decimal`.
///
/// REAL values go through their shortest round-trip text form, so a stored
/// `0.001` becomes exactly `0.001` rather than its binary expansion.
pub fn decimal_from_value(value: ValueRef<'_>) -> Result<Decimal, String> {
    match value {
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => {
            if !f.is_finite() {
                return Err(format!("non-finite amount {}", f));
            }
            parse_decimal(&f.to_string())
        }
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
            parse_decimal(text.trim())
        }
        ValueRef::Null => Err("amount is NULL".to_string()),
        ValueRef::Blob(_) => Err("amount stored as BLOB".to_string()),
    }
}

fn parse_decimal(text: &str) -> Result<Decimal, String> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| format!("invalid amount '{}': {}", text, e))
}

/// One day of simple interest: `deposit × daily_rate`, unrounded.
///
/// Returns `None` on overflow.
pub fn daily_accrual(deposit_amount: Decimal, daily_rate: Decimal) -> Option<Decimal> {
    deposit_amount.checked_mul(daily_rate)
}

/// Display form for progress lines, e.g. `K1.00`. Presentation only.
pub fn format_amount(amount: Decimal) -> String {
    format!("{}{:.2}", CURRENCY_SYMBOL, amount.round_dp(2))
}
