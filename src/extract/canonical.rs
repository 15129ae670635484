//! The canonical reservation payload — the normalized record every
//! provider's output is mapped into before anything downstream sees it.

use serde::{Deserialize, Serialize};

/// Reservation category. `None` on the metadata means the document is
/// out-of-scope (not a travel reservation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationType {
    Flight,
    Lodging,
    GroundTransport,
    Restaurant,
}

impl ReservationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Lodging => "lodging",
            Self::GroundTransport => "ground_transport",
            Self::Restaurant => "restaurant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

/// Whether a document is travel-related at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "trip_related")]
    TripRelated,
    #[serde(rename = "outside_scope")]
    OutsideScope,
}

/// Classification and confidence for one payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationMeta {
    #[serde(rename = "type")]
    pub reservation_type: Option<ReservationType>,
    /// Always on the integer 0–100 scale.
    pub confidence: u8,
    pub status: ReservationStatus,
}

/// The reservation fields proper. Every field independently nullable;
/// unresolvable fields stay `None`, never guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreFields {
    pub display_name: Option<String>,
    pub provider_name: Option<String>,
    pub confirmation_code: Option<String>,
    pub traveler_name: Option<String>,
    /// ISO 8601 date (YYYY-MM-DD).
    pub start_date: Option<String>,
    /// 24-hour HH:MM.
    pub start_time: Option<String>,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financial {
    /// Always rounded to 2 decimals when present.
    pub total_amount: Option<f64>,
    /// ISO 4217-style 3-letter code.
    pub currency_code: Option<String>,
    pub payment_method: Option<String>,
    pub loyalty_points_used: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEnrichment {
    pub travel_tip: Option<String>,
    pub how_to_arrive: Option<String>,
    pub nearby_attractions: Option<String>,
    pub nearby_restaurants: Option<String>,
}

/// The full canonical record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPayload {
    pub metadata: ReservationMeta,
    pub core_fields: CoreFields,
    pub financial: Financial,
    pub ai_enrichment: AiEnrichment,
}

impl CanonicalPayload {
    /// Empty-but-valid payload for documents with no travel signal.
    pub fn out_of_scope() -> Self {
        Self::default()
    }

    pub fn scope(&self) -> Scope {
        if self.metadata.reservation_type.is_none() {
            Scope::OutsideScope
        } else {
            Scope::TripRelated
        }
    }

    /// Soft invariant check: start date after end date. Feeds the
    /// candidate scorer; never rejected outright.
    pub fn date_range_inverted(&self) -> bool {
        match (&self.core_fields.start_date, &self.core_fields.end_date) {
            (Some(start), Some(end)) => start > end,
            _ => false,
        }
    }

    pub fn has_negative_amount(&self) -> bool {
        self.financial.total_amount.is_some_and(|v| v < 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_out_of_scope() {
        let payload = CanonicalPayload::out_of_scope();
        assert_eq!(payload.scope(), Scope::OutsideScope);
        assert!(payload.metadata.reservation_type.is_none());
        assert_eq!(payload.metadata.confidence, 0);
    }

    #[test]
    fn typed_payload_is_trip_related() {
        let mut payload = CanonicalPayload::default();
        payload.metadata.reservation_type = Some(ReservationType::Flight);
        assert_eq!(payload.scope(), Scope::TripRelated);
    }

    #[test]
    fn date_range_inversion_detected() {
        let mut payload = CanonicalPayload::default();
        payload.core_fields.start_date = Some("2026-03-15".into());
        payload.core_fields.end_date = Some("2026-03-10".into());
        assert!(payload.date_range_inverted());

        payload.core_fields.end_date = Some("2026-03-20".into());
        assert!(!payload.date_range_inverted());

        payload.core_fields.end_date = None;
        assert!(!payload.date_range_inverted());
    }

    #[test]
    fn negative_amount_detected() {
        let mut payload = CanonicalPayload::default();
        assert!(!payload.has_negative_amount());
        payload.financial.total_amount = Some(-12.5);
        assert!(payload.has_negative_amount());
    }

    #[test]
    fn wire_shape_uses_camel_case_and_type_alias() {
        let mut payload = CanonicalPayload::default();
        payload.metadata.reservation_type = Some(ReservationType::GroundTransport);
        payload.core_fields.display_name = Some("Airport transfer".into());

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["metadata"]["type"], "ground_transport");
        assert_eq!(json["coreFields"]["displayName"], "Airport transfer");
        assert_eq!(json["metadata"]["status"], "pending");
    }

    #[test]
    fn scope_serializes_glossary_terms() {
        assert_eq!(
            serde_json::to_string(&Scope::TripRelated).unwrap(),
            "\"trip_related\""
        );
        assert_eq!(
            serde_json::to_string(&Scope::OutsideScope).unwrap(),
            "\"outside_scope\""
        );
    }
}
