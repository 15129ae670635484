//! Native extraction — no network call.
//!
//! PDFs with an embedded text layer go through `pdf-extract`; plain text
//! is decoded as UTF-8. The result is only accepted when the structural
//! density heuristic passes: scanned PDFs expose a text layer of a few
//! stray glyphs, and a pure length check lets that garbage through.

use super::{DocumentPayload, OcrMethod};

/// Minimum letters, digit count, and line count for native text to be
/// accepted without OCR.
const MIN_LETTERS: usize = 60;
const MIN_DIGITS: usize = 2;
const MIN_LINES: usize = 3;

/// Try native extraction. `None` means the format has no native text
/// path (images) or decoding failed; density is judged separately.
pub fn extract_native(payload: &DocumentPayload) -> Option<(String, OcrMethod)> {
    if is_pdf(payload) {
        let text = pdf_extract::extract_text_from_mem(&payload.bytes).ok()?;
        return Some((text, OcrMethod::NativePdf));
    }
    if is_plain_text(payload) {
        let text = String::from_utf8(payload.bytes.clone()).ok()?;
        return Some((text, OcrMethod::NativeText));
    }
    None
}

pub fn is_pdf(payload: &DocumentPayload) -> bool {
    payload.mime_type == "application/pdf" || payload.bytes.starts_with(b"%PDF")
}

fn is_plain_text(payload: &DocumentPayload) -> bool {
    payload.mime_type.starts_with("text/")
        || payload.file_name.to_lowercase().ends_with(".txt")
}

/// Structural density: enough letters, enough digits, enough lines.
/// Travel documents always carry dates or codes, so a digit floor is a
/// cheap discriminator against decorative text layers.
pub fn passes_density(text: &str) -> bool {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
    let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    letters >= MIN_LETTERS && digits >= MIN_DIGITS && lines >= MIN_LINES
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(bytes: &[u8], name: &str, mime: &str) -> DocumentPayload {
        DocumentPayload {
            bytes: bytes.to_vec(),
            file_name: name.into(),
            mime_type: mime.into(),
        }
    }

    #[test]
    fn plain_text_extracted_as_native_text() {
        let p = payload(b"Flight LA3405\nGRU-EZE\n2026-03-10", "doc.txt", "text/plain");
        let (text, method) = extract_native(&p).unwrap();
        assert_eq!(method, OcrMethod::NativeText);
        assert!(text.contains("LA3405"));
    }

    #[test]
    fn image_has_no_native_path() {
        let p = payload(&[0x89, b'P', b'N', b'G'], "scan.png", "image/png");
        assert!(extract_native(&p).is_none());
    }

    #[test]
    fn pdf_detected_by_magic_bytes_without_mime() {
        let p = payload(b"%PDF-1.7 truncated", "doc.bin", "application/octet-stream");
        assert!(is_pdf(&p));
        // Truncated PDF: extraction fails, which is a None, not a panic
        assert!(extract_native(&p).is_none());
    }

    #[test]
    fn invalid_utf8_text_is_none() {
        let p = payload(&[0xFF, 0xFE, 0x80], "notes.txt", "text/plain");
        assert!(extract_native(&p).is_none());
    }

    #[test]
    fn density_accepts_realistic_itinerary() {
        let text = "LATAM Airlines confirmation\n\
                    Passenger: Maria Souza\n\
                    Flight LA3405 GRU-EZE\n\
                    Departure 2026-03-10 14:00\n\
                    Total R$ 1234.56";
        assert!(passes_density(text));
    }

    #[test]
    fn density_rejects_short_text() {
        assert!(!passes_density("hello"));
        assert!(!passes_density(""));
    }

    #[test]
    fn density_rejects_single_line_blob() {
        // Plenty of letters but no line structure
        let blob = "a".repeat(500);
        assert!(!passes_density(&blob));
    }

    #[test]
    fn density_rejects_letters_without_digits() {
        let text = "some scattered words\nfrom a decorative layer\nwith no dates or codes at all here";
        assert!(!passes_density(text));
    }
}
