//! Field-by-field normalization of raw provider JSON into the canonical
//! payload.
//!
//! Providers return duck-typed JSON with inconsistent key names, date
//! locales, and confidence scales. Everything passes through here before
//! anything downstream sees it; raw provider JSON is never forwarded
//! unvalidated.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::canonical::{CanonicalPayload, ReservationStatus, ReservationType};

/// Pull the first JSON object out of a raw LLM response. Handles fenced
/// ```json blocks and bare objects surrounded by prose.
pub fn parse_provider_json(raw: &str) -> Option<serde_json::Value> {
    if let Some(fence_start) = raw.find("```json") {
        let body = &raw[fence_start + 7..];
        if let Some(fence_end) = body.find("```") {
            if let Ok(value) = serde_json::from_str(body[..fence_end].trim()) {
                return Some(value);
            }
        }
    }
    // Bare object: widest brace span
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(raw[start..=end].trim()).ok()
}

/// Map one provider's raw JSON object into a canonical payload.
pub fn normalize_payload(raw: &serde_json::Value) -> CanonicalPayload {
    let mut payload = CanonicalPayload::default();

    payload.metadata.reservation_type = first_str(raw, &["type", "reservationType", "category"])
        .and_then(|s| normalize_type(&s));
    payload.metadata.confidence = raw
        .get("confidence")
        .map(normalize_confidence)
        .unwrap_or(0);
    payload.metadata.status = first_str(raw, &["status"])
        .and_then(|s| normalize_status(&s))
        .unwrap_or_default();

    // Out-of-scope records get no field normalization at all.
    if payload.metadata.reservation_type.is_none() {
        return payload;
    }

    let core = &mut payload.core_fields;
    core.display_name = first_str(raw, &["displayName", "display_name", "name", "title"]);
    core.provider_name = first_str(raw, &["providerName", "provider_name", "carrier", "company"]);
    core.confirmation_code = first_str(
        raw,
        &["confirmationCode", "confirmation_code", "bookingReference", "locator"],
    );
    core.traveler_name = first_str(raw, &["travelerName", "traveler_name", "guestName"]);
    core.start_date =
        first_str(raw, &["startDate", "start_date", "date"]).and_then(|s| normalize_date(&s));
    core.start_time =
        first_str(raw, &["startTime", "start_time", "time"]).and_then(|s| normalize_time(&s));
    core.end_date = first_str(raw, &["endDate", "end_date"]).and_then(|s| normalize_date(&s));
    core.end_time = first_str(raw, &["endTime", "end_time"]).and_then(|s| normalize_time(&s));
    core.origin = first_str(raw, &["origin", "from"]);
    core.destination = first_str(raw, &["destination", "to"]);

    let financial = &mut payload.financial;
    financial.total_amount = raw
        .get("totalAmount")
        .or_else(|| raw.get("total_amount"))
        .or_else(|| raw.get("amount"))
        .and_then(normalize_money);
    financial.currency_code = first_str(raw, &["currencyCode", "currency_code", "currency"])
        .and_then(|s| normalize_currency(&s));
    financial.payment_method = first_str(raw, &["paymentMethod", "payment_method"]);
    financial.loyalty_points_used = raw
        .get("loyaltyPointsUsed")
        .or_else(|| raw.get("loyalty_points_used"))
        .and_then(|v| v.as_u64())
        .map(|v| v as u32);

    payload
}

fn first_str(raw: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = raw.get(key).and_then(|v| v.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

// ──────────────────────────────────────────────
// Scalar normalizers
// ──────────────────────────────────────────────

pub fn normalize_type(raw: &str) -> Option<ReservationType> {
    match raw.trim().to_lowercase().as_str() {
        "flight" | "voo" | "air" | "airline" => Some(ReservationType::Flight),
        "lodging" | "hotel" | "accommodation" | "hospedagem" | "stay" => {
            Some(ReservationType::Lodging)
        }
        "ground_transport" | "transport" | "transfer" | "car" | "car_rental" | "train"
        | "transporte" => Some(ReservationType::GroundTransport),
        "restaurant" | "restaurante" | "dining" => Some(ReservationType::Restaurant),
        _ => None,
    }
}

fn normalize_status(raw: &str) -> Option<ReservationStatus> {
    match raw.trim().to_lowercase().as_str() {
        "pending" | "pendente" => Some(ReservationStatus::Pending),
        "confirmed" | "confirmado" | "confirmada" => Some(ReservationStatus::Confirmed),
        "cancelled" | "canceled" | "cancelado" | "cancelada" => Some(ReservationStatus::Cancelled),
        _ => None,
    }
}

/// Normalize a provider confidence to the integer 0–100 scale.
/// Values in (0, 1] are read as fractions; anything else clamps to 0–100.
pub fn normalize_confidence(raw: &serde_json::Value) -> u8 {
    let value = match raw {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    let scaled = if value > 0.0 && value <= 1.0 {
        value * 100.0
    } else {
        value
    };
    scaled.round().clamp(0.0, 100.0) as u8
}

static PT_MONTHS: &[(&str, u32)] = &[
    ("janeiro", 1),
    ("fevereiro", 2),
    ("marco", 3),
    ("março", 3),
    ("abril", 4),
    ("maio", 5),
    ("junho", 6),
    ("julho", 7),
    ("agosto", 8),
    ("setembro", 9),
    ("outubro", 10),
    ("novembro", 11),
    ("dezembro", 12),
];

static LONG_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2})\s+de\s+([\p{L}]+)\s+de\s+(\d{4})").expect("long date regex")
});

/// Accepts ISO, DD/MM/YYYY, DD-MM-YYYY, DD.MM.YYYY, Portuguese long form
/// ("12 de março de 2026"), and English long forms. Output is ISO 8601.
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    // English long forms ("March 12, 2026" / "12 March 2026")
    for format in ["%B %d, %Y", "%d %B %Y", "%b %d, %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    // Portuguese long form
    if let Some(caps) = LONG_DATE.captures(trimmed) {
        let day: u32 = caps[1].parse().ok()?;
        let month_name = caps[2].to_lowercase();
        let year: i32 = caps[3].parse().ok()?;
        let month = PT_MONTHS
            .iter()
            .find(|(name, _)| *name == month_name)
            .map(|(_, n)| *n)?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        return Some(date.format("%Y-%m-%d").to_string());
    }

    None
}

static TIME_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::\d{2})?$").expect("time regex"));
static TIME_H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})h(\d{2})$").expect("time h regex"));

/// 24-hour HH:MM only. Accepts `H:MM`, `HH:MM:SS` (seconds dropped) and
/// the `14h30` token; rejects AM/PM forms.
pub fn normalize_time(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let caps = TIME_COLON
        .captures(trimmed)
        .or_else(|| TIME_H.captures(trimmed))?;
    let hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(format!("{hours:02}:{minutes:02}"))
}

/// Accepts numbers or strings in comma- or dot-decimal locales.
/// Result is rounded to 2 decimals.
pub fn normalize_money(raw: &serde_json::Value) -> Option<f64> {
    let value = match raw {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => parse_money_str(s)?,
        _ => return None,
    };
    Some(round2(value))
}

pub fn parse_money_str(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let normalized = match (last_dot, last_comma) {
        // Both present: the later one is the decimal separator
        (Some(d), Some(c)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        // Comma only: groups of three are thousands, anything else is cents
        (None, Some(c)) => {
            let after = cleaned.len() - c - 1;
            if after == 3 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        _ => cleaned,
    };
    normalized.parse().ok()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// ISO 4217-style codes pass through uppercased; common symbols map to
/// their usual currency.
pub fn normalize_currency(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    match trimmed {
        "R$" => return Some("BRL".into()),
        "US$" | "$" => return Some("USD".into()),
        "€" => return Some("EUR".into()),
        "£" => return Some("GBP".into()),
        _ => {}
    }
    let upper = trimmed.to_uppercase();
    if upper.len() == 3 && upper.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(upper)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── parse_provider_json ──

    #[test]
    fn json_from_fenced_block() {
        let raw = "Here you go:\n```json\n{\"type\": \"flight\"}\n```\nDone.";
        let value = parse_provider_json(raw).unwrap();
        assert_eq!(value["type"], "flight");
    }

    #[test]
    fn json_from_bare_object() {
        let raw = "The result is {\"type\": \"lodging\", \"confidence\": 80} as requested";
        let value = parse_provider_json(raw).unwrap();
        assert_eq!(value["confidence"], 80);
    }

    #[test]
    fn no_json_returns_none() {
        assert!(parse_provider_json("I cannot process this document.").is_none());
        assert!(parse_provider_json("").is_none());
    }

    // ── normalize_confidence ──

    #[test]
    fn confidence_fraction_scales_to_percent() {
        assert_eq!(normalize_confidence(&json!(0.92)), 92);
        assert_eq!(normalize_confidence(&json!(1.0)), 100);
        assert_eq!(normalize_confidence(&json!(0.004)), 0);
    }

    #[test]
    fn confidence_percent_passes_through() {
        assert_eq!(normalize_confidence(&json!(85)), 85);
        assert_eq!(normalize_confidence(&json!(85.6)), 86);
    }

    #[test]
    fn confidence_clamped_to_bounds() {
        assert_eq!(normalize_confidence(&json!(250)), 100);
        assert_eq!(normalize_confidence(&json!(-10)), 0);
        assert_eq!(normalize_confidence(&json!("not a number")), 0);
    }

    #[test]
    fn confidence_string_parsed() {
        assert_eq!(normalize_confidence(&json!("0.75")), 75);
        assert_eq!(normalize_confidence(&json!("60")), 60);
    }

    // ── normalize_date ──

    #[test]
    fn date_iso_passthrough() {
        assert_eq!(normalize_date("2026-03-10").as_deref(), Some("2026-03-10"));
    }

    #[test]
    fn date_european_formats() {
        assert_eq!(normalize_date("10/03/2026").as_deref(), Some("2026-03-10"));
        assert_eq!(normalize_date("10-03-2026").as_deref(), Some("2026-03-10"));
        assert_eq!(normalize_date("10.03.2026").as_deref(), Some("2026-03-10"));
    }

    #[test]
    fn date_portuguese_long_form() {
        assert_eq!(
            normalize_date("12 de março de 2026").as_deref(),
            Some("2026-03-12")
        );
        assert_eq!(
            normalize_date("1 de janeiro de 2027").as_deref(),
            Some("2027-01-01")
        );
    }

    #[test]
    fn date_english_long_form() {
        assert_eq!(
            normalize_date("March 12, 2026").as_deref(),
            Some("2026-03-12")
        );
        assert_eq!(normalize_date("12 March 2026").as_deref(), Some("2026-03-12"));
    }

    #[test]
    fn date_garbage_rejected() {
        assert!(normalize_date("tomorrow").is_none());
        assert!(normalize_date("32/13/2026").is_none());
        assert!(normalize_date("").is_none());
    }

    // ── normalize_time ──

    #[test]
    fn time_24h_accepted() {
        assert_eq!(normalize_time("14:00").as_deref(), Some("14:00"));
        assert_eq!(normalize_time("9:05").as_deref(), Some("09:05"));
        assert_eq!(normalize_time("23:59:59").as_deref(), Some("23:59"));
        assert_eq!(normalize_time("14h30").as_deref(), Some("14:30"));
    }

    #[test]
    fn time_invalid_rejected() {
        assert!(normalize_time("25:00").is_none());
        assert!(normalize_time("14:75").is_none());
        assert!(normalize_time("2:30 PM").is_none());
        assert!(normalize_time("noon").is_none());
    }

    // ── money & currency ──

    #[test]
    fn money_dot_decimal() {
        assert_eq!(normalize_money(&json!("1234.56")), Some(1234.56));
        assert_eq!(normalize_money(&json!("R$ 1234.56")), Some(1234.56));
    }

    #[test]
    fn money_comma_decimal_locale() {
        assert_eq!(normalize_money(&json!("1.234,56")), Some(1234.56));
        assert_eq!(normalize_money(&json!("R$ 89,90")), Some(89.9));
    }

    #[test]
    fn money_thousands_with_dot_decimal() {
        assert_eq!(normalize_money(&json!("1,234.56")), Some(1234.56));
    }

    #[test]
    fn money_number_rounded_two_decimals() {
        assert_eq!(normalize_money(&json!(10.999)), Some(11.0));
        assert_eq!(normalize_money(&json!(1234.5678)), Some(1234.57));
    }

    #[test]
    fn currency_symbols_and_codes() {
        assert_eq!(normalize_currency("R$").as_deref(), Some("BRL"));
        assert_eq!(normalize_currency("US$").as_deref(), Some("USD"));
        assert_eq!(normalize_currency("€").as_deref(), Some("EUR"));
        assert_eq!(normalize_currency("usd").as_deref(), Some("USD"));
        assert!(normalize_currency("dollars").is_none());
    }

    // ── normalize_payload ──

    #[test]
    fn full_payload_normalization() {
        let raw = json!({
            "type": "flight",
            "confidence": 0.9,
            "status": "confirmed",
            "displayName": "LA3405",
            "providerName": "LATAM",
            "confirmationCode": "XK7Q2P",
            "startDate": "10/03/2026",
            "startTime": "14:00",
            "origin": "GRU",
            "destination": "EZE",
            "totalAmount": "1.234,56",
            "currency": "R$",
        });
        let payload = normalize_payload(&raw);

        assert_eq!(
            payload.metadata.reservation_type,
            Some(ReservationType::Flight)
        );
        assert_eq!(payload.metadata.confidence, 90);
        assert_eq!(payload.metadata.status, ReservationStatus::Confirmed);
        assert_eq!(payload.core_fields.start_date.as_deref(), Some("2026-03-10"));
        assert_eq!(payload.core_fields.origin.as_deref(), Some("GRU"));
        assert_eq!(payload.financial.total_amount, Some(1234.56));
        assert_eq!(payload.financial.currency_code.as_deref(), Some("BRL"));
    }

    #[test]
    fn snake_case_keys_accepted() {
        let raw = json!({
            "type": "lodging",
            "confidence": 70,
            "display_name": "Hotel Fasano",
            "start_date": "2026-05-01",
            "end_date": "2026-05-05",
            "total_amount": 2500.0,
            "currency_code": "BRL",
        });
        let payload = normalize_payload(&raw);
        assert_eq!(
            payload.core_fields.display_name.as_deref(),
            Some("Hotel Fasano")
        );
        assert_eq!(payload.core_fields.end_date.as_deref(), Some("2026-05-05"));
        assert_eq!(payload.financial.total_amount, Some(2500.0));
    }

    #[test]
    fn null_type_skips_core_field_heuristics() {
        let raw = json!({
            "type": null,
            "confidence": 95,
            "displayName": "Grocery receipt",
            "totalAmount": 54.20,
        });
        let payload = normalize_payload(&raw);
        assert!(payload.metadata.reservation_type.is_none());
        // Out-of-scope: core fields untouched per the invariant
        assert!(payload.core_fields.display_name.is_none());
        assert!(payload.financial.total_amount.is_none());
        assert_eq!(payload.metadata.confidence, 95);
    }

    #[test]
    fn unknown_type_string_treated_as_out_of_scope() {
        let raw = json!({"type": "invoice", "confidence": 50});
        let payload = normalize_payload(&raw);
        assert!(payload.metadata.reservation_type.is_none());
    }
}
