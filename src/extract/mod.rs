//! Canonical extraction — turns raw document text into a normalized,
//! provider-agnostic reservation payload.
//!
//! Two strategies, tried in order: parallel LLM candidates scored and
//! ranked, then a deterministic regex rule engine when every candidate
//! fails. The extractor never errors; the worst case is an empty
//! out-of-scope payload.

pub mod canonical;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod rules;
pub mod score;

pub use canonical::{
    AiEnrichment, CanonicalPayload, CoreFields, Financial, ReservationMeta, ReservationStatus,
    ReservationType, Scope,
};
pub use orchestrator::{CanonicalExtractor, ExtractionOutcome, ExtractionStrategy, ProviderMeta};
pub use score::{missing_fields, Candidate};
