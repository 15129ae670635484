//! Import queue — the document lifecycle from upload to saved
//! reservation.
//!
//! Uploads are fingerprinted before any network call; a re-upload of
//! bytes already processed short-circuits to the existing record instead
//! of burning OCR and inference quota again. Records whose extraction is
//! confident and complete are saved automatically; everything else lands
//! in review.

pub mod hash;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::extract::canonical::CanonicalPayload;
use crate::extract::orchestrator::ExtractionOutcome;
use crate::extract::{CanonicalExtractor, Scope};
use crate::ocr::{DocumentPayload, OcrError, OcrMethod, TextAcquisition};
use crate::providers::CallOptions;

pub use hash::content_hash;

/// Confidence floor for saving without human review.
pub const AUTO_SAVE_CONFIDENCE: u8 = 75;

// ──────────────────────────────────────────────
// Record types
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Extraction incomplete or low-confidence; awaiting confirmation.
    NeedsReview,
    Saved,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStages {
    pub ocr: StageStatus,
    pub extraction: StageStatus,
    pub save: StageStatus,
}

/// One imported document and everything the pipeline learned about it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub id: Uuid,
    pub content_hash: String,
    pub file_name: String,
    pub status: ImportStatus,
    pub stages: ImportStages,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    pub ocr_method: Option<OcrMethod>,
    pub warnings: Vec<String>,
    pub extraction: Option<ExtractionOutcome>,
    /// Set by `reprocess`: the payload the record had before the re-run.
    pub previous_canonical: Option<CanonicalPayload>,
    pub auto_extracted: bool,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import {0} not found")]
    NotFound(Uuid),
    #[error("import {0} has no acquired text to reprocess")]
    NoText(Uuid),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

// ──────────────────────────────────────────────
// Store seam
// ──────────────────────────────────────────────

pub trait DocumentStore: Send + Sync {
    fn get(&self, id: Uuid) -> Option<ImportRecord>;
    fn find_by_hash(&self, content_hash: &str) -> Option<ImportRecord>;
    fn put(&self, record: ImportRecord);
    fn list(&self) -> Vec<ImportRecord>;
}

/// Mutex-guarded in-memory store.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    records: Mutex<Vec<ImportRecord>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, id: Uuid) -> Option<ImportRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.iter().find(|r| r.id == id).cloned()
    }

    fn find_by_hash(&self, content_hash: &str) -> Option<ImportRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.iter().find(|r| r.content_hash == content_hash).cloned()
    }

    fn put(&self, record: ImportRecord) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    fn list(&self) -> Vec<ImportRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

// ──────────────────────────────────────────────
// Queue
// ──────────────────────────────────────────────

pub struct ImportQueue {
    store: Arc<dyn DocumentStore>,
    acquisition: TextAcquisition,
    extractor: CanonicalExtractor,
}

impl ImportQueue {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        acquisition: TextAcquisition,
        extractor: CanonicalExtractor,
    ) -> Self {
        Self {
            store,
            acquisition,
            extractor,
        }
    }

    /// Run the full pipeline on one upload. Pipeline failures come back
    /// as a stored `Failed` record, not an `Err`; the error variants are
    /// reserved for requests that never reach the pipeline.
    pub async fn process(
        &self,
        payload: DocumentPayload,
        options: &CallOptions,
    ) -> Result<ImportRecord, ImportError> {
        let span = tracing::info_span!("import", file = %payload.file_name);
        self.process_inner(payload, options).instrument(span).await
    }

    async fn process_inner(
        &self,
        payload: DocumentPayload,
        options: &CallOptions,
    ) -> Result<ImportRecord, ImportError> {
        let content_hash = content_hash(&payload.bytes);

        if let Some(mut existing) = self.store.find_by_hash(&content_hash) {
            tracing::info!(id = %existing.id, "duplicate upload, reusing record");
            existing
                .notes
                .push(format!("duplicate of upload {}, skipped", payload.file_name));
            existing.updated_at = Utc::now();
            self.store.put(existing.clone());
            return Ok(existing);
        }

        let now = Utc::now();
        let mut record = ImportRecord {
            id: Uuid::new_v4(),
            content_hash,
            file_name: payload.file_name.clone(),
            status: ImportStatus::NeedsReview,
            stages: ImportStages::default(),
            raw_text: None,
            ocr_method: None,
            warnings: Vec::new(),
            extraction: None,
            previous_canonical: None,
            auto_extracted: false,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let ocr = match self.acquisition.acquire(&payload, options).await {
            Ok(outcome) => outcome,
            Err(OcrError::InvalidPayload(reason)) => {
                return Err(ImportError::InvalidDocument(reason));
            }
            Err(OcrError::Exhausted { warnings }) => {
                record.stages.ocr = StageStatus::Failed;
                record.status = ImportStatus::Failed;
                record.warnings = warnings;
                self.store.put(record.clone());
                return Ok(record);
            }
        };

        record.stages.ocr = StageStatus::Completed;
        record.ocr_method = Some(ocr.method);
        record.warnings = ocr.warnings;
        record.raw_text = Some(ocr.text.clone());

        let outcome = self
            .extractor
            .extract(&ocr.text, Some(&payload.file_name), options)
            .await;
        record.stages.extraction = StageStatus::Completed;
        self.apply_extraction(&mut record, outcome);

        self.store.put(record.clone());
        Ok(record)
    }

    /// Confirm a reviewed record, replacing its payload with the edited
    /// version.
    pub fn save(
        &self,
        id: Uuid,
        canonical: CanonicalPayload,
    ) -> Result<ImportRecord, ImportError> {
        let mut record = self.store.get(id).ok_or(ImportError::NotFound(id))?;
        if let Some(extraction) = &mut record.extraction {
            extraction.canonical = canonical;
        }
        record.status = ImportStatus::Saved;
        record.stages.save = StageStatus::Completed;
        record.auto_extracted = false;
        record.updated_at = Utc::now();
        self.store.put(record.clone());
        Ok(record)
    }

    /// Re-run extraction on the stored text, keeping the prior payload
    /// as a snapshot for comparison.
    pub async fn reprocess(
        &self,
        id: Uuid,
        options: &CallOptions,
    ) -> Result<ImportRecord, ImportError> {
        let mut record = self.store.get(id).ok_or(ImportError::NotFound(id))?;
        let text = record.raw_text.clone().ok_or(ImportError::NoText(id))?;

        record.previous_canonical = record
            .extraction
            .as_ref()
            .map(|e| e.canonical.clone());

        let outcome = self
            .extractor
            .extract(&text, Some(&record.file_name), options)
            .await;
        record.stages.extraction = StageStatus::Completed;
        self.apply_extraction(&mut record, outcome);
        record.notes.push("reprocessed".into());

        self.store.put(record.clone());
        Ok(record)
    }

    pub fn get(&self, id: Uuid) -> Option<ImportRecord> {
        self.store.get(id)
    }

    pub fn list(&self) -> Vec<ImportRecord> {
        self.store.list()
    }

    fn apply_extraction(&self, record: &mut ImportRecord, outcome: ExtractionOutcome) {
        let confident = outcome.canonical.metadata.confidence >= AUTO_SAVE_CONFIDENCE;
        let complete = outcome.missing_fields.is_empty();
        let in_scope = outcome.scope == Scope::TripRelated;

        record.auto_extracted = confident && complete && in_scope;
        record.status = if record.auto_extracted {
            record.stages.save = StageStatus::Completed;
            ImportStatus::Saved
        } else {
            ImportStatus::NeedsReview
        };
        record.extraction = Some(outcome);
        record.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::canonical::ReservationType;
    use crate::ocr::hosted::MockHostedOcr;
    use crate::providers::{MockInferenceClient, ProviderConfig, ProviderId};

    const ITINERARY: &str = "LATAM Airlines confirmation\n\
                             Passenger: Maria Souza\n\
                             Flight LA3405 GRU-EZE\n\
                             Departure 2026-03-10 14:00\n\
                             Total R$ 1234.56";

    const FLIGHT_JSON: &str = r#"{"type":"flight","confidence":0.92,"origin":"GRU","destination":"EZE","startDate":"2026-03-10","confirmationCode":"XK7Q2P"}"#;
    const PARTIAL_JSON: &str = r#"{"type":"flight","confidence":0.55,"origin":"GRU"}"#;

    fn config(id: ProviderId) -> ProviderConfig {
        ProviderConfig {
            id,
            model: "m".into(),
            base_url: "http://localhost".into(),
            api_key: Some("k".into()),
        }
    }

    fn queue_with(mock: MockInferenceClient) -> ImportQueue {
        let client = Arc::new(mock);
        let acquisition = TextAcquisition::new(
            client.clone(),
            Arc::new(MockHostedOcr::new()),
            vec![config(ProviderId::OpenAi), config(ProviderId::Gemini)],
        );
        let extractor = CanonicalExtractor::new(
            client,
            vec![config(ProviderId::OpenAi), config(ProviderId::Gemini)],
            None,
        );
        ImportQueue::new(Arc::new(InMemoryDocumentStore::new()), acquisition, extractor)
    }

    fn text_payload(text: &str, name: &str) -> DocumentPayload {
        DocumentPayload {
            bytes: text.as_bytes().to_vec(),
            file_name: name.into(),
            mime_type: "text/plain".into(),
        }
    }

    #[tokio::test]
    async fn confident_complete_extraction_is_auto_saved() {
        let queue = queue_with(
            MockInferenceClient::new().with_response(ProviderId::OpenAi, FLIGHT_JSON),
        );
        let record = queue
            .process(text_payload(ITINERARY, "pass.txt"), &CallOptions::default())
            .await
            .unwrap();

        assert_eq!(record.status, ImportStatus::Saved);
        assert!(record.auto_extracted);
        assert_eq!(record.stages.ocr, StageStatus::Completed);
        assert_eq!(record.stages.extraction, StageStatus::Completed);
        assert_eq!(record.stages.save, StageStatus::Completed);
        assert_eq!(record.ocr_method, Some(OcrMethod::NativeText));
        let extraction = record.extraction.unwrap();
        assert_eq!(
            extraction.canonical.metadata.reservation_type,
            Some(ReservationType::Flight)
        );
    }

    #[tokio::test]
    async fn incomplete_extraction_needs_review() {
        let queue = queue_with(
            MockInferenceClient::new().with_response(ProviderId::OpenAi, PARTIAL_JSON),
        );
        let record = queue
            .process(text_payload(ITINERARY, "pass.txt"), &CallOptions::default())
            .await
            .unwrap();

        assert_eq!(record.status, ImportStatus::NeedsReview);
        assert!(!record.auto_extracted);
        assert_eq!(record.stages.save, StageStatus::Pending);
        assert!(!record.extraction.unwrap().missing_fields.is_empty());
    }

    #[tokio::test]
    async fn import_runs_on_a_spawned_task() {
        let queue = queue_with(
            MockInferenceClient::new().with_response(ProviderId::OpenAi, FLIGHT_JSON),
        );
        // tokio::spawn demands a Send future, like the HTTP handlers do
        let record = tokio::spawn(async move {
            queue
                .process(text_payload(ITINERARY, "pass.txt"), &CallOptions::default())
                .await
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(record.status, ImportStatus::Saved);
    }

    #[tokio::test]
    async fn duplicate_upload_reuses_the_record() {
        let queue = queue_with(
            MockInferenceClient::new().with_response(ProviderId::OpenAi, FLIGHT_JSON),
        );
        let first = queue
            .process(text_payload(ITINERARY, "pass.txt"), &CallOptions::default())
            .await
            .unwrap();
        // Same bytes under a different filename is still a duplicate
        let second = queue
            .process(text_payload(ITINERARY, "renamed.txt"), &CallOptions::default())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(queue.list().len(), 1);
        assert!(second.notes.iter().any(|n| n.contains("duplicate")));
    }

    #[tokio::test]
    async fn manual_save_confirms_a_review_record() {
        let queue = queue_with(
            MockInferenceClient::new().with_response(ProviderId::OpenAi, PARTIAL_JSON),
        );
        let record = queue
            .process(text_payload(ITINERARY, "pass.txt"), &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(record.status, ImportStatus::NeedsReview);

        let mut edited = record.extraction.as_ref().unwrap().canonical.clone();
        edited.core_fields.destination = Some("EZE".into());
        let saved = queue.save(record.id, edited).unwrap();

        assert_eq!(saved.status, ImportStatus::Saved);
        assert_eq!(saved.stages.save, StageStatus::Completed);
        assert!(!saved.auto_extracted);
        assert_eq!(
            saved.extraction.unwrap().canonical.core_fields.destination.as_deref(),
            Some("EZE")
        );
    }

    #[tokio::test]
    async fn reprocess_snapshots_the_previous_payload() {
        let queue = queue_with(
            MockInferenceClient::new().with_response(ProviderId::OpenAi, FLIGHT_JSON),
        );
        let record = queue
            .process(text_payload(ITINERARY, "pass.txt"), &CallOptions::default())
            .await
            .unwrap();
        assert!(record.previous_canonical.is_none());

        let reprocessed = queue.reprocess(record.id, &CallOptions::default()).await.unwrap();
        let previous = reprocessed.previous_canonical.unwrap();
        assert_eq!(previous.core_fields.origin.as_deref(), Some("GRU"));
        assert!(reprocessed.notes.iter().any(|n| n == "reprocessed"));
    }

    #[tokio::test]
    async fn exhausted_pipeline_stores_a_failed_record() {
        // Image payload, no canned vision responses, hosted unconfigured
        let queue = queue_with(MockInferenceClient::new());
        let payload = DocumentPayload {
            bytes: vec![0x89, b'P', b'N', b'G', 1, 2, 3],
            file_name: "scan.png".into(),
            mime_type: "image/png".into(),
        };
        let record = queue.process(payload, &CallOptions::default()).await.unwrap();

        assert_eq!(record.status, ImportStatus::Failed);
        assert_eq!(record.stages.ocr, StageStatus::Failed);
        assert!(!record.warnings.is_empty());
        assert!(queue.get(record.id).is_some());
    }

    #[tokio::test]
    async fn unknown_id_errors() {
        let queue = queue_with(MockInferenceClient::new());
        let missing = Uuid::new_v4();
        assert!(matches!(
            queue.save(missing, CanonicalPayload::default()),
            Err(ImportError::NotFound(_))
        ));
        assert!(matches!(
            queue.reprocess(missing, &CallOptions::default()).await,
            Err(ImportError::NotFound(_))
        ));
    }
}
