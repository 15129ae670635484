//! Text quality scoring for OCR outputs.
//!
//! Used to rank parallel vision results and to annotate every outcome
//! with a comparable score. The score is heuristic and only meaningful
//! relative to other outputs of the same document.

use serde::Serialize;

/// Structural measurements plus the composite score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub chars: usize,
    pub lines: usize,
    pub digit_ratio: f32,
    pub score: f32,
}

/// Score a text's fitness as OCR output.
///
/// Length contributes up to 40 points (saturating at 2000 chars), line
/// structure up to 20 (saturating at 60 lines). Travel vocabulary and
/// airport-style codes add fixed bonuses. An extreme digit ratio, which
/// usually means a table of garbage glyphs, costs 10. Never negative.
pub fn quality_metrics(text: &str) -> QualityMetrics {
    let chars = text.chars().count();
    let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
    let digit_ratio = if chars == 0 {
        0.0
    } else {
        digits as f32 / chars as f32
    };

    let mut score = (chars.min(2000) as f32 / 2000.0) * 40.0;
    score += (lines.min(60) as f32 / 60.0) * 20.0;
    if has_airport_code(text) {
        score += 15.0;
    }
    if has_travel_vocab(text) {
        score += 10.0;
    }
    if digit_ratio > 0.5 {
        score -= 10.0;
    }

    QualityMetrics {
        chars,
        lines,
        digit_ratio,
        score: score.max(0.0),
    }
}

/// Standalone three-uppercase-letter token, the shape of an IATA code.
fn has_airport_code(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric()).any(|tok| {
        tok.len() == 3 && tok.chars().all(|c| c.is_ascii_uppercase())
    })
}

fn has_travel_vocab(text: &str) -> bool {
    const WORDS: &[&str] = &[
        "check-in",
        "check in",
        "checkin",
        "boarding",
        "embarque",
        "reservation",
        "reserva",
        "confirmation",
        "itinerary",
        "passenger",
        "passageiro",
    ];
    let lower = text.to_lowercase();
    WORDS.iter().any(|w| lower.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_scores_zero() {
        let m = quality_metrics("");
        assert_eq!(m.chars, 0);
        assert_eq!(m.score, 0.0);
    }

    #[test]
    fn itinerary_outscores_noise() {
        let itinerary = "LATAM Airlines\nPassenger: Maria Souza\nFlight LA3405\n\
                         GRU to EZE\nBoarding 13:20\nCheck-in closes 13:40\n\
                         Confirmation XK7Q2P";
        let noise = "000 111 222 333 444 555 666 777 888 999";
        let good = quality_metrics(itinerary);
        let bad = quality_metrics(noise);
        assert!(good.score > bad.score);
    }

    #[test]
    fn airport_code_bonus_applies() {
        let with_code = quality_metrics("departing from GRU tomorrow morning early");
        let without = quality_metrics("departing from gru tomorrow morning early");
        assert!((with_code.score - without.score - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn travel_vocab_bonus_applies() {
        let with_vocab = quality_metrics("online check-in opens two days before");
        let without = quality_metrics("online shopping opens two days before");
        assert!((with_vocab.score - without.score - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn digit_heavy_text_penalized() {
        let m = quality_metrics("1234567890 1234567890 1234567890 ab");
        assert!(m.digit_ratio > 0.5);
        // Length and line contributions are small here, score stays low
        assert!(m.score < 5.0);
    }

    #[test]
    fn length_contribution_saturates() {
        let long = "word ".repeat(1000);
        let longer = "word ".repeat(5000);
        let a = quality_metrics(&long);
        let b = quality_metrics(&longer);
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(quality_metrics("abc")).unwrap();
        assert!(json.get("digitRatio").is_some());
    }
}
