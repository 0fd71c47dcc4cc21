//! Parsing and validation of verifier completions
//!
//! The model is asked for one of five tagged formats, but completions drift,
//! so parsing is layered: explicit tag lookup first, then a capitalized-run
//! fallback. Every extracted name then passes validation against the source
//! text so the verifier can never introduce words the comment does not
//! contain, return payment vocabulary as a name, or leak a greeting.

use crate::patterns::PatternMatcher;
use crate::segmentation::classify_by_word_count;
use nameguard_core::{DetectionResult, NameCategory};
use regex::Regex;

/// Tier number reported for verifier answers
const VERIFIER_TIER: u8 = 3;

/// Confidence for a well-formed verifier extraction
const EXTRACTION_CONFIDENCE: f32 = 0.85;

/// Confidence for an explicit no-name answer
const NO_NAME_CONFIDENCE: f32 = 0.9;

/// Confidence after a validation pass rejected the extraction
const REJECTED_CONFIDENCE: f32 = 0.7;

/// Answer-format tags mapped to result categories
const TAG_CATEGORIES: &[(&str, NameCategory)] = &[
    ("ПОВНЕ_ПІБ", NameCategory::FullName),
    ("ПРІЗВИЩЕ_ІМЯ", NameCategory::SurnameName),
    ("ТІЛЬКИ_ПРІЗВИЩЕ", NameCategory::SurnameOnly),
    ("ТІЛЬКИ_ІМЯ", NameCategory::NameOnly),
];

/// Parses raw completions into detection results
pub struct CompletionParser {
    name_run: Regex,
}

impl CompletionParser {
    pub fn new() -> Self {
        let name_run = Regex::new(r"([А-ЯІЇЄҐ][а-яіїєґ']+(?:\s+[А-ЯІЇЄҐ][а-яіїєґ']+)*)")
            .expect("name run pattern is valid");
        Self { name_run }
    }

    /// Parse a completion produced for `source_text`
    pub fn parse(
        &self,
        completion: &str,
        source_text: &str,
        patterns: &PatternMatcher,
    ) -> DetectionResult {
        let completion = completion.trim();

        if completion.contains("НЕМАЄ_ПІБ") || completion.to_lowercase().contains("немає")
        {
            return DetectionResult::no_name(NO_NAME_CONFIDENCE, VERIFIER_TIER)
                .with_tier_detail("verifier");
        }

        let (name, category) = match self.extract_tagged(completion) {
            Some(found) => found,
            None => match self.extract_fallback(completion) {
                Some(found) => found,
                None => {
                    return DetectionResult::no_name(REJECTED_CONFIDENCE, VERIFIER_TIER)
                        .with_tier_detail("unparseable")
                }
            },
        };

        self.validate(&name, category, source_text, patterns)
    }

    /// Read a `TAG | name` answer, taking only the tagged line
    fn extract_tagged(&self, completion: &str) -> Option<(String, NameCategory)> {
        let line = completion.lines().find(|l| l.contains('|'))?;
        let (tag, name) = line.split_once('|')?;
        let tag = tag.trim();
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let category = TAG_CATEGORIES
            .iter()
            .find(|(t, _)| tag.contains(t))
            .map(|(_, c)| *c)
            .unwrap_or_else(|| classify_by_word_count(name));
        Some((name.to_string(), category))
    }

    /// Take the longest run of capitalized Cyrillic words as the name
    fn extract_fallback(&self, completion: &str) -> Option<(String, NameCategory)> {
        let best = self
            .name_run
            .find_iter(completion)
            .max_by_key(|m| m.as_str().chars().count())?;
        let name = best.as_str().to_string();
        let category = classify_by_word_count(&name);
        Some((name, category))
    }

    /// Run the validation passes over an extracted name
    fn validate(
        &self,
        name: &str,
        category: NameCategory,
        source_text: &str,
        patterns: &PatternMatcher,
    ) -> DetectionResult {
        if patterns.is_greeting(name) {
            return DetectionResult::no_name(NO_NAME_CONFIDENCE, VERIFIER_TIER)
                .with_tier_detail("greeting_suppressed");
        }

        let tokens: Vec<&str> = name.split_whitespace().collect();

        if tokens.iter().any(|t| patterns.is_stop_word(t)) {
            return DetectionResult::no_name(REJECTED_CONFIDENCE, VERIFIER_TIER)
                .with_tier_detail("stop_word_rejected");
        }

        // Tokens absent from the comment are model inventions and are dropped
        let source_lower = source_text.to_lowercase();
        let grounded: Vec<&str> = tokens
            .iter()
            .copied()
            .filter(|t| source_lower.contains(&t.to_lowercase()))
            .collect();

        if grounded.is_empty() {
            return DetectionResult::no_name(REJECTED_CONFIDENCE, VERIFIER_TIER)
                .with_tier_detail("hallucination_rejected");
        }

        let (name, category) = if grounded.len() == tokens.len() {
            (name.to_string(), category)
        } else {
            let truncated = grounded.join(" ");
            let category = classify_by_word_count(&truncated);
            (truncated, category)
        };

        match category {
            NameCategory::NoName => {
                DetectionResult::no_name(REJECTED_CONFIDENCE, VERIFIER_TIER)
                    .with_tier_detail("verifier")
            }
            _ => DetectionResult::detected(category, name, EXTRACTION_CONFIDENCE, VERIFIER_TIER)
                .with_tier_detail("verifier"),
        }
    }
}

impl Default for CompletionParser {
    fn default() -> Self {
        Self::new()
    }
}
