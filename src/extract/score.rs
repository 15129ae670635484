//! Candidate scoring and missing-field computation.
//!
//! The scorer deterministically ranks provider candidates; scoring, not
//! arrival order, picks the winner. Provider preference order is used
//! only as an explicit tie-break. Coefficients are empirically tuned
//! starting points (see DESIGN.md).

use super::canonical::{CanonicalPayload, ReservationType, Scope};
use crate::providers::ProviderId;

/// One scored, provider-attributed extraction attempt. Ephemeral:
/// discarded once a winner is chosen.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub canonical: CanonicalPayload,
    pub scope: Scope,
    pub provider: ProviderId,
    pub score: f32,
    pub missing_fields: Vec<&'static str>,
}

impl Candidate {
    pub fn new(canonical: CanonicalPayload, provider: ProviderId) -> Self {
        let scope = canonical.scope();
        let missing = missing_fields(&canonical, scope);
        let score = score_payload(&canonical, scope, missing.len());
        Self {
            canonical,
            scope,
            provider,
            score,
            missing_fields: missing,
        }
    }
}

/// Required-field checklist per reservation type. Pure function of
/// (type, payload, scope); out-of-scope records report zero missing fields.
pub fn missing_fields(payload: &CanonicalPayload, scope: Scope) -> Vec<&'static str> {
    if scope == Scope::OutsideScope {
        return vec![];
    }
    let core = &payload.core_fields;
    let mut missing = Vec::new();

    match payload.metadata.reservation_type {
        Some(ReservationType::Flight) => {
            if core.origin.is_none() {
                missing.push("origin");
            }
            if core.destination.is_none() {
                missing.push("destination");
            }
            if core.start_date.is_none() {
                missing.push("startDate");
            }
            if core.confirmation_code.is_none() && core.display_name.is_none() {
                missing.push("confirmationCode");
            }
        }
        Some(ReservationType::Lodging) => {
            if core.display_name.is_none() && core.provider_name.is_none() {
                missing.push("displayName");
            }
            if core.start_date.is_none() {
                missing.push("startDate");
            }
            if core.end_date.is_none() {
                missing.push("endDate");
            }
        }
        Some(ReservationType::GroundTransport) => {
            if core.origin.is_none() {
                missing.push("origin");
            }
            if core.destination.is_none() {
                missing.push("destination");
            }
            if core.start_date.is_none() {
                missing.push("startDate");
            }
        }
        Some(ReservationType::Restaurant) => {
            if core.display_name.is_none() {
                missing.push("displayName");
            }
            if core.start_date.is_none() {
                missing.push("startDate");
            }
            if core.start_time.is_none() {
                missing.push("startTime");
            }
        }
        None => {}
    }
    missing
}

/// `25·has_type + 0.2·confidence − 8·missing + 15·out_of_scope
/// − 15·date_inverted − 10·negative_amount`, floored at 0.
pub fn score_payload(payload: &CanonicalPayload, scope: Scope, missing_count: usize) -> f32 {
    let mut score = 0.0f32;
    if payload.metadata.reservation_type.is_some() {
        score += 25.0;
    }
    score += 0.2 * f32::from(payload.metadata.confidence);
    score -= 8.0 * missing_count as f32;
    if scope == Scope::OutsideScope {
        score += 15.0;
    }
    if payload.date_range_inverted() {
        score -= 15.0;
    }
    if payload.has_negative_amount() {
        score -= 10.0;
    }
    score.max(0.0)
}

/// Highest score wins; on ties the candidate earliest in the preference
/// order (its position in the input) is kept.
pub fn pick_winner(candidates: Vec<Candidate>) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.score <= current.score => {}
            _ => best = Some(candidate),
        }
    }
    best
}
