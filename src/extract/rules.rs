//! Deterministic heuristic fallback — an ordered rule engine of
//! `(name, pattern, extractor)` pairs applied when every LLM candidate
//! failed.
//!
//! Rules only fill fields that are still unset, so earlier (stronger)
//! signals win. This path never fails; text with no travel signal yields
//! an empty out-of-scope payload, which is a correct outcome.

use std::sync::LazyLock;

use regex::Regex;

use super::canonical::{CanonicalPayload, ReservationType, Scope};
use super::normalize::{normalize_date, normalize_time, parse_money_str, round2};

/// Carriers recognized by name. Matching sets `provider_name` and leans
/// the type toward flight.
const KNOWN_CARRIERS: &[&str] = &[
    "LATAM",
    "GOL",
    "Azul",
    "TAP",
    "American Airlines",
    "United",
    "Delta",
    "Lufthansa",
    "Air France",
    "KLM",
    "Emirates",
    "Iberia",
    "Avianca",
    "Copa Airlines",
    "British Airways",
    "Qatar Airways",
];

static AIRPORT_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z]{3})\s*(?:-|–|—|->|→|x|to|para)\s*([A-Z]{3})\b").expect("airport pair")
});
static CITY_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\p{Lu}][\p{L}]+(?:\s[\p{Lu}][\p{L}]+)*)\s*(?:→|->)\s*([\p{Lu}][\p{L}]+(?:\s[\p{Lu}][\p{L}]+)*)")
        .expect("city route")
});
static FLIGHT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2}\s?\d{3,4})\b").expect("flight number"));
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("iso date"));
static EURO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}/\d{2}/\d{4}\b").expect("euro date"));
static LONG_DATE_PT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}\s+de\s+[\p{L}]+\s+de\s+\d{4}\b").expect("pt long date")
});
static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}:\d{2})\b").expect("clock time"));
static MONEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(R\$|US\$|USD|EUR|BRL|GBP|€|£|\$)\s*([0-9][0-9.,]*)").expect("money")
});
static CONFIRMATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:confirmation(?:\scode)?|booking(?:\sreference)?|record\slocator|localizador|reserva|c[oó]digo)\s*[:#]?\s*([A-Z0-9]{5,8})\b",
    )
    .expect("confirmation")
});

const LODGING_WORDS: &[&str] = &[
    "hotel", "hostel", "pousada", "resort", "airbnb", "check-in", "check-out", "checkin",
    "checkout", "hóspede", "guest", "suite", "diária",
];
const RESTAURANT_WORDS: &[&str] = &[
    "restaurant", "restaurante", "table for", "mesa para", "dinner", "jantar", "almoço", "menu",
    "tasting",
];
const GROUND_WORDS: &[&str] = &[
    "transfer", "shuttle", "car rental", "rental car", "aluguel de carro", "uber", "train",
    "trem", "bus", "ônibus", "pickup", "pick-up",
];
// "airport" alone is deliberately absent: transfers and shuttles mention
// airports constantly without being flights.
const FLIGHT_WORDS: &[&str] = &["flight", "voo", "boarding", "embarque", "gate", "portão", "airline"];

/// Apply the heuristic rule set to raw text. Never fails.
pub fn infer_from_text(text: &str, file_name_hint: Option<&str>) -> (CanonicalPayload, Scope) {
    let lower = text.to_lowercase();
    let hint_lower = file_name_hint.map(|h| h.to_lowercase()).unwrap_or_default();

    let reservation_type = infer_type(text, &lower, &hint_lower);
    let Some(reservation_type) = reservation_type else {
        // No travel signal anywhere: out-of-scope, no field heuristics.
        return (CanonicalPayload::out_of_scope(), Scope::OutsideScope);
    };

    let mut payload = CanonicalPayload::default();
    payload.metadata.reservation_type = Some(reservation_type);

    apply_route_rules(text, &mut payload);
    apply_carrier_rule(text, &mut payload);
    apply_flight_number_rule(text, &mut payload, reservation_type);
    apply_date_rules(text, &mut payload);
    apply_time_rules(text, &mut payload);
    apply_money_rule(text, &mut payload);
    apply_confirmation_rule(text, &mut payload);

    payload.metadata.confidence = heuristic_confidence(&payload);
    (payload, Scope::TripRelated)
}

fn infer_type(text: &str, lower: &str, hint_lower: &str) -> Option<ReservationType> {
    let has_flight_signal = AIRPORT_PAIR.is_match(text)
        || contains_any(lower, FLIGHT_WORDS)
        || contains_any(hint_lower, FLIGHT_WORDS)
        || KNOWN_CARRIERS.iter().any(|c| text.contains(c));
    if has_flight_signal {
        return Some(ReservationType::Flight);
    }
    if contains_any(lower, LODGING_WORDS) || contains_any(hint_lower, LODGING_WORDS) {
        return Some(ReservationType::Lodging);
    }
    if contains_any(lower, RESTAURANT_WORDS) {
        return Some(ReservationType::Restaurant);
    }
    if contains_any(lower, GROUND_WORDS) {
        return Some(ReservationType::GroundTransport);
    }
    None
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn apply_route_rules(text: &str, payload: &mut CanonicalPayload) {
    if let Some(caps) = AIRPORT_PAIR.captures(text) {
        payload.core_fields.origin = Some(caps[1].to_string());
        payload.core_fields.destination = Some(caps[2].to_string());
        return;
    }
    if let Some(caps) = CITY_ROUTE.captures(text) {
        payload.core_fields.origin = Some(caps[1].trim().to_string());
        payload.core_fields.destination = Some(caps[2].trim().to_string());
    }
}

fn apply_carrier_rule(text: &str, payload: &mut CanonicalPayload) {
    if payload.core_fields.provider_name.is_some() {
        return;
    }
    if let Some(carrier) = KNOWN_CARRIERS.iter().find(|c| text.contains(*c)) {
        payload.core_fields.provider_name = Some((*carrier).to_string());
    }
}

fn apply_flight_number_rule(
    text: &str,
    payload: &mut CanonicalPayload,
    reservation_type: ReservationType,
) {
    if reservation_type != ReservationType::Flight || payload.core_fields.display_name.is_some() {
        return;
    }
    if let Some(caps) = FLIGHT_NUMBER.captures(text) {
        payload.core_fields.display_name = Some(caps[1].replace(' ', ""));
    }
}

fn apply_date_rules(text: &str, payload: &mut CanonicalPayload) {
    let mut dates: Vec<String> = Vec::new();
    for pattern in [&*ISO_DATE, &*EURO_DATE, &*LONG_DATE_PT] {
        for m in pattern.find_iter(text) {
            if let Some(iso) = normalize_date(m.as_str()) {
                if !dates.contains(&iso) {
                    dates.push(iso);
                }
            }
        }
        if !dates.is_empty() {
            break; // one format family per document is enough
        }
    }
    let mut dates = dates.into_iter();
    if payload.core_fields.start_date.is_none() {
        payload.core_fields.start_date = dates.next();
    }
    if payload.core_fields.end_date.is_none() {
        if let Some(second) = dates.next() {
            // Only accept a plausible range
            if payload.core_fields.start_date.as_deref() <= Some(second.as_str()) {
                payload.core_fields.end_date = Some(second);
            }
        }
    }
}

fn apply_time_rules(text: &str, payload: &mut CanonicalPayload) {
    let mut times = CLOCK_TIME
        .find_iter(text)
        .filter_map(|m| normalize_time(m.as_str()));
    if payload.core_fields.start_time.is_none() {
        payload.core_fields.start_time = times.next();
    }
    if payload.core_fields.end_time.is_none() {
        payload.core_fields.end_time = times.next();
    }
}

fn apply_money_rule(text: &str, payload: &mut CanonicalPayload) {
    if payload.financial.total_amount.is_some() {
        return;
    }
    if let Some(caps) = MONEY.captures(text) {
        if let Some(amount) = parse_money_str(&caps[2]) {
            payload.financial.total_amount = Some(round2(amount));
            payload.financial.currency_code = Some(currency_for_token(&caps[1]));
        }
    }
}

fn currency_for_token(token: &str) -> String {
    match token {
        "R$" | "BRL" => "BRL",
        "US$" | "USD" | "$" => "USD",
        "EUR" | "€" => "EUR",
        "GBP" | "£" => "GBP",
        _ => "USD",
    }
    .to_string()
}

fn apply_confirmation_rule(text: &str, payload: &mut CanonicalPayload) {
    if payload.core_fields.confirmation_code.is_some() {
        return;
    }
    if let Some(caps) = CONFIRMATION.captures(text) {
        payload.core_fields.confirmation_code = Some(caps[1].to_uppercase());
    }
}

/// Conservatively low: regex inference is a plausible fallback, not a
/// trusted extraction.
fn heuristic_confidence(payload: &CanonicalPayload) -> u8 {
    let core = &payload.core_fields;
    let filled = [
        core.display_name.is_some(),
        core.provider_name.is_some(),
        core.confirmation_code.is_some(),
        core.start_date.is_some(),
        core.start_time.is_some(),
        core.origin.is_some(),
        core.destination.is_some(),
        payload.financial.total_amount.is_some(),
    ]
    .iter()
    .filter(|b| **b)
    .count() as u8;
    (25 + filled * 5).min(60)
}
