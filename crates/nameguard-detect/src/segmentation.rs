//! Name-part segmentation for Ukrainian/Russian person names
//!
//! Splits an extracted text span into surname, given name, and patronymic
//! slots, with confidence derived from how many slots fill and whether the
//! fill is linguistically typical. Also hosts the regex safety net used when
//! a tagger finds no entities.

use nameguard_core::{DetectionResult, NameCategory, NameParts};
use regex::Regex;

/// Patronymic suffixes (Ukrainian and Russian)
const PATRONYMIC_SUFFIXES: &[&str] = &[
    "ович", "івна", "овна", "евич", "ївна", "евна", "івич", "ич",
];

/// Surname suffixes used when parsing rule-extracted names
const SURNAME_SUFFIXES: &[&str] = &[
    "енко", "ко", "чук", "ук", "юк", "ський", "цький", "ов", "ев", "єв", "ін", "їн", "ак", "як",
    "ик",
];

/// Wider surname suffix set used for single-word tagger output
const TAGGER_SURNAME_SUFFIXES: &[&str] = &[
    "ченко", "енко", "чук", "ук", "юк", "ак", "як", "ський", "цький", "зький", "ний", "ий", "ов",
    "ев", "єв", "ін", "їн", "ко", "ло", "но", "ишин", "шин",
];

/// True if the word carries a patronymic suffix
pub fn is_patronymic(word: &str) -> bool {
    let word = word.to_lowercase();
    PATRONYMIC_SUFFIXES.iter().any(|s| word.ends_with(s))
}

/// Heuristic surname check for rule-extracted names
pub fn looks_like_surname(word: &str) -> bool {
    let word = word.to_lowercase();
    SURNAME_SUFFIXES.iter().any(|s| word.ends_with(s))
}

/// Classify a tagger-produced name by word count
///
/// Three or more words make a full name, two make surname plus given name,
/// and a single word is split between surname and given name by suffix.
pub fn classify_by_word_count(name: &str) -> NameCategory {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.len() {
        0 => NameCategory::NoName,
        1 => {
            let word = words[0].to_lowercase();
            if TAGGER_SURNAME_SUFFIXES.iter().any(|s| word.ends_with(s)) {
                NameCategory::SurnameOnly
            } else {
                NameCategory::NameOnly
            }
        }
        2 => NameCategory::SurnameName,
        _ => NameCategory::FullName,
    }
}

/// Parse an extracted span into name parts with a confidence score
pub fn parse_name_parts(text: &str) -> NameParts {
    let text = text.trim();
    let words: Vec<&str> = text.split_whitespace().collect();

    let mut result = NameParts::new(text, 0.0);

    match words.len() {
        3 => {
            result.surname = Some(words[0].to_string());
            result.first_name = Some(words[1].to_string());
            result.patronymic = Some(words[2].to_string());
            result.confidence = if is_patronymic(words[2]) { 0.95 } else { 0.7 };
        }
        2 => {
            if is_patronymic(words[1]) {
                result.first_name = Some(words[0].to_string());
                result.patronymic = Some(words[1].to_string());
                result.confidence = 0.85;
            } else {
                result.surname = Some(words[0].to_string());
                result.first_name = Some(words[1].to_string());
                result.confidence = 0.8;
            }
        }
        1 => {
            if looks_like_surname(words[0]) {
                result.surname = Some(words[0].to_string());
                result.confidence = 0.6;
            } else {
                result.first_name = Some(words[0].to_string());
                result.confidence = 0.5;
            }
        }
        _ => {}
    }

    result
}

/// Regex extractors for the three known name shapes
pub struct PatternExtractor {
    full_name: Regex,
    three_words: Regex,
    two_names: Regex,
}

impl PatternExtractor {
    pub fn new() -> Self {
        // Third word must carry a patronymic suffix
        let full_name = Regex::new(
            r"([А-ЯІЇЄҐ][а-яіїєґ']+)\s+([А-ЯІЇЄҐ][а-яіїєґ']+)\s+([А-ЯІЇЄҐ][а-яіїєґ']+(?:ович|івна|овна|евич|ївна|евна|івич|ич))",
        )
        .expect("full name pattern is valid");

        let three_words = Regex::new(
            r"^([А-ЯІЇЄҐ][а-яіїєґ']+)\s+([А-ЯІЇЄҐ][а-яіїєґ']+)\s+([А-ЯІЇЄҐ][а-яіїєґ']+)$",
        )
        .expect("three word pattern is valid");

        let two_names = Regex::new(r"([А-ЯІЇЄҐ][а-яіїєґ']+)\s+([А-ЯІЇЄҐ][а-яіїєґ']+)")
            .expect("two name pattern is valid");

        Self {
            full_name,
            three_words,
            two_names,
        }
    }

    /// Extract an unambiguous surname + name + patronymic match, if present
    pub fn extract_full_name(&self, text: &str) -> Option<NameParts> {
        if let Some(caps) = self.full_name.captures(text) {
            let surname = caps.get(1)?.as_str();
            let confidence = if looks_like_surname(surname) || surname.chars().count() > 3 {
                0.9
            } else {
                0.85
            };
            let mut parts = NameParts::new(caps.get(0)?.as_str(), confidence);
            parts.surname = Some(surname.to_string());
            parts.first_name = Some(caps.get(2)?.as_str().to_string());
            parts.patronymic = Some(caps.get(3)?.as_str().to_string());
            return Some(parts);
        }

        // Anchored three-word shape where the patronymic suffix check is
        // applied separately
        if let Some(caps) = self.three_words.captures(text.trim()) {
            if is_patronymic(caps.get(3)?.as_str()) {
                let mut parts = NameParts::new(caps.get(0)?.as_str(), 0.9);
                parts.surname = Some(caps.get(1)?.as_str().to_string());
                parts.first_name = Some(caps.get(2)?.as_str().to_string());
                parts.patronymic = Some(caps.get(3)?.as_str().to_string());
                return Some(parts);
            }
        }

        None
    }

    /// Extract a name by pattern, trying the most specific shape first
    pub fn extract_name(&self, text: &str) -> Option<NameParts> {
        if let Some(parts) = self.extract_full_name(text) {
            return Some(parts);
        }

        if let Some(caps) = self.two_names.captures(text) {
            let mut parts = NameParts::new(caps.get(0)?.as_str(), 0.6);
            parts.surname = Some(caps.get(1)?.as_str().to_string());
            parts.first_name = Some(caps.get(2)?.as_str().to_string());
            return Some(parts);
        }

        None
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold name parts into a detection result at the given tier
pub fn parts_to_result(parts: &NameParts, tier_used: u8) -> DetectionResult {
    let (category, detected) = match (&parts.surname, &parts.first_name, &parts.patronymic) {
        (Some(s), Some(f), Some(p)) => {
            (NameCategory::FullName, Some(format!("{} {} {}", s, f, p)))
        }
        (Some(s), Some(f), None) => (NameCategory::SurnameName, Some(format!("{} {}", s, f))),
        // Given name plus patronymic counts as a two-part name
        (None, Some(f), Some(p)) => (NameCategory::SurnameName, Some(format!("{} {}", f, p))),
        (Some(s), None, None) => (NameCategory::SurnameOnly, Some(s.clone())),
        (None, Some(f), None) => (NameCategory::NameOnly, Some(f.clone())),
        _ => (NameCategory::NoName, None),
    };

    match detected {
        Some(name) => DetectionResult::detected(category, name, parts.confidence, tier_used),
        None => DetectionResult::no_name(parts.confidence, tier_used),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patronymic_suffixes() {
        assert!(is_patronymic("Олександрович"));
        assert!(is_patronymic("Петрівна"));
        assert!(is_patronymic("Сергеевна"));
        assert!(!is_patronymic("Іванов"));
        assert!(!is_patronymic("Петро"));
    }

    #[test]
    fn test_surname_heuristic() {
        assert!(looks_like_surname("Петренко"));
        assert!(looks_like_surname("Ковальчук"));
        assert!(looks_like_surname("Іванов"));
        assert!(!looks_like_surname("Петро"));
    }

    #[test]
    fn test_parse_three_words() {
        let parts = parse_name_parts("Булатов Руслан Олександрович");
        assert_eq!(parts.surname.as_deref(), Some("Булатов"));
        assert_eq!(parts.first_name.as_deref(), Some("Руслан"));
        assert_eq!(parts.patronymic.as_deref(), Some("Олександрович"));
        assert_eq!(parts.confidence, 0.95);
    }

    #[test]
    fn test_parse_two_words() {
        let parts = parse_name_parts("Іванов Петро");
        assert_eq!(parts.surname.as_deref(), Some("Іванов"));
        assert_eq!(parts.first_name.as_deref(), Some("Петро"));
        assert_eq!(parts.confidence, 0.8);

        let parts = parse_name_parts("Петро Олександрович");
        assert!(parts.surname.is_none());
        assert_eq!(parts.first_name.as_deref(), Some("Петро"));
        assert_eq!(parts.patronymic.as_deref(), Some("Олександрович"));
        assert_eq!(parts.confidence, 0.85);
    }

    #[test]
    fn test_parse_single_word() {
        let surname = parse_name_parts("Петренко");
        assert_eq!(surname.surname.as_deref(), Some("Петренко"));
        assert_eq!(surname.confidence, 0.6);

        let name = parse_name_parts("Олена");
        assert_eq!(name.first_name.as_deref(), Some("Олена"));
        assert_eq!(name.confidence, 0.5);
    }

    #[test]
    fn test_extract_full_name_pattern() {
        let extractor = PatternExtractor::new();

        let parts = extractor
            .extract_full_name("Переказ для Булатов Руслан Олександрович дякую")
            .unwrap();
        assert_eq!(parts.surname.as_deref(), Some("Булатов"));
        assert_eq!(parts.patronymic.as_deref(), Some("Олександрович"));
        assert!(parts.confidence >= 0.85);

        assert!(extractor.extract_full_name("Зарплата за грудень").is_none());
    }

    #[test]
    fn test_extract_two_name_fallback() {
        let extractor = PatternExtractor::new();

        let parts = extractor.extract_name("Іванов Петро").unwrap();
        assert_eq!(parts.surname.as_deref(), Some("Іванов"));
        assert_eq!(parts.confidence, 0.6);
    }

    #[test]
    fn test_classify_by_word_count() {
        assert_eq!(
            classify_by_word_count("Іванов Петро Сергійович"),
            NameCategory::FullName
        );
        assert_eq!(classify_by_word_count("Іванов Петро"), NameCategory::SurnameName);
        assert_eq!(classify_by_word_count("Петренко"), NameCategory::SurnameOnly);
        assert_eq!(classify_by_word_count("Олена"), NameCategory::NameOnly);
        assert_eq!(classify_by_word_count(""), NameCategory::NoName);
    }

    #[test]
    fn test_parts_to_result_invariant() {
        let parts = parse_name_parts("Булатов Руслан Олександрович");
        let result = parts_to_result(&parts, 2);
        assert!(result.has_name);
        assert_eq!(result.category, NameCategory::FullName);
        assert_eq!(
            result.detected_name.as_deref(),
            Some("Булатов Руслан Олександрович")
        );

        let empty = parts_to_result(&NameParts::new("", 0.0), 2);
        assert!(!empty.has_name);
        assert!(empty.detected_name.is_none());
    }
}
