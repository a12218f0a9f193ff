//! Small conversion and id helpers shared by the gateway adapters and the
//! checkout controller: centavo conversion, 2-decimal amount strings,
//! idempotency key, local txid, tracking code, and expiration timestamps.
//! Money-helper shape follows the rinha `src/utils/money.rs`; conversions
//! mirror the original `pix-api.js`.

use chrono::{Duration, Utc};
use uuid::Uuid;

/// Decimal amount rendered as a fixed 2-decimal string, e.g. `28.0 -> "28.00"`.
/// Used where a gateway wants the value as a string (Gerencianet `valor.original`).
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Amount converted to integer centavos, `round(amount * 100)`.
/// PagSeguro expects integer centavos for `unit_amount` and `qr_codes` amounts.
pub fn amount_in_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// An idempotency key: millisecond timestamp plus a random component, matching
/// the original's `X-Idempotency-Key` (timestamp + random).
pub fn generate_idempotency_key() -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), Uuid::new_v4().simple())
}

/// A locally generated transaction id: 32 uppercase alphanumerics, as
/// Gerencianet requires for `PUT /v2/cob/{txid}`.
pub fn generate_txid() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()
}

/// A PIX tracking code for a completed checkout; prefixed `BR`.
pub fn generate_tracking_code() -> String {
    format!(
        "BR{}",
        Uuid::new_v4().simple().to_string()[..9].to_uppercase()
    )
}

/// An RFC 3339 timestamp `minutes` into the future, used for charge expiry.
pub fn expiration_timestamp(minutes: i64) -> String {
    (Utc::now() + Duration::minutes(minutes)).to_rfc3339()
}

/// The calendar day (`YYYY-MM-DD`) `minutes` into the future; Asaas `dueDate`.
pub fn expiration_day(minutes: i64) -> String {
    (Utc::now() + Duration::minutes(minutes))
        .format("%Y-%m-%d")
        .to_string()
}
