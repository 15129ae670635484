//! Endpoint handlers, one module per resource.

pub mod enrich;
pub mod extract;
pub mod features;
pub mod health;
pub mod imports;
pub mod ocr;
