//! Prompt builders for extraction and enrichment calls.
//!
//! One prompt is shared by every provider in a parallel stage so that
//! candidates differ only by model behavior, never by instructions.

/// System prompt for reservation extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "\
You are a travel reservation extractor. Given the text of one document, \
return a single JSON object and nothing else. Fields: type (one of \
\"flight\", \"lodging\", \"ground_transport\", \"restaurant\", or null if the \
document is not a travel reservation), confidence (0-100), status \
(\"pending\", \"confirmed\" or \"cancelled\"), displayName, providerName, \
confirmationCode, travelerName, startDate (YYYY-MM-DD), startTime (24h \
HH:MM), endDate, endTime, origin, destination, totalAmount, currencyCode \
(3-letter), paymentMethod, loyaltyPointsUsed. Use null for any field not \
present in the document. Never invent values.";

/// Build the extraction user prompt. The filename is a hint only.
pub fn build_extraction_prompt(raw_text: &str, file_name_hint: Option<&str>) -> String {
    let mut prompt = String::with_capacity(raw_text.len() + 128);
    if let Some(name) = file_name_hint {
        prompt.push_str("File name: ");
        prompt.push_str(name);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Document text:\n");
    prompt.push_str(raw_text);
    prompt
}

/// Prompt used by the vision OCR stages: transcription, not interpretation.
pub const VISION_OCR_PROMPT: &str = "\
Extract ALL visible text from this document image, preserving line breaks \
and reading order. Include codes, dates, times, and amounts exactly as \
printed. Output only the transcribed text, no commentary.";

/// System prompt for the enrichment calls (tips, restaurant suggestions).
pub const ENRICHMENT_SYSTEM_PROMPT: &str = "\
You are a concise travel assistant. Respond with a single JSON object and \
nothing else.";

pub fn build_tips_prompt(location: &str) -> String {
    format!(
        "For a traveler arriving in {location}, return JSON with fields: \
         travelTip (one practical local tip), howToArrive (how to get there \
         from the nearest airport or station), nearbyAttractions (2-3 \
         highlights, comma separated)."
    )
}

pub fn build_restaurants_prompt(city: &str) -> String {
    format!(
        "Suggest restaurants in {city}. Return JSON with one field: \
         nearbyRestaurants (3-4 well-regarded options with one short note \
         each, semicolon separated)."
    )
}
