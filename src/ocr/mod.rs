//! Text acquisition — produces raw text from a document through a strict
//! priority chain: native extraction → hosted OCR → parallel vision OCR →
//! last-resort vision.

pub mod hosted;
pub mod native;
pub mod orchestrator;
pub mod quality;

use serde::Serialize;

pub use hosted::{HostedOcrClient, HostedOcrError, MockHostedOcr, OcrSpaceClient};
pub use orchestrator::TextAcquisition;
pub use quality::{quality_metrics, QualityMetrics};

/// The document as received from the caller, before any stage runs.
#[derive(Debug, Clone)]
pub struct DocumentPayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// Machine-readable tag for the stage that produced the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrMethod {
    NativePdf,
    NativeText,
    HostedOcr,
    VisionParallel,
    VisionFallback,
}

impl OcrMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativePdf => "native_pdf",
            Self::NativeText => "native_text",
            Self::HostedOcr => "hosted_ocr",
            Self::VisionParallel => "vision_parallel",
            Self::VisionFallback => "vision_fallback",
        }
    }
}

/// Successful acquisition: the text, which stage produced it, and every
/// warning accumulated from skipped or failed earlier stages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrOutcome {
    pub text: String,
    pub method: OcrMethod,
    pub warnings: Vec<String>,
    #[serde(rename = "qualityMetrics")]
    pub quality: QualityMetrics,
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// Every stage failed. Carries the aggregated per-stage warnings so
    /// the caller can still offer manual entry.
    #[error("all text acquisition stages failed ({} warnings)", warnings.len())]
    Exhausted { warnings: Vec<String> },
    #[error("invalid document payload: {0}")]
    InvalidPayload(String),
}
