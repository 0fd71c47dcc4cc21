//! Person-entity taggers
//!
//! The [`PersonTagger`] trait is the seam between the detection cascade and
//! whatever produces person spans: a deterministic lexical scanner, an
//! in-process transformer, or nothing at all when models are unavailable.
//! Adapters treat a not-ready tagger as absent rather than as an error.

use crate::patterns::PatternMatcher;
use crate::segmentation::{is_patronymic, looks_like_surname};
use async_trait::async_trait;
use nameguard_core::Result;
use std::sync::Arc;

/// A contiguous person mention found in the input text
///
/// Offsets are byte positions into the original string, so spans can be
/// sliced back out of the source without re-tokenizing.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonSpan {
    pub text: String,
    pub score: f32,
    pub start: usize,
    pub end: usize,
}

impl PersonSpan {
    pub fn new(text: impl Into<String>, score: f32, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            score,
            start,
            end,
        }
    }
}

/// Source of person spans for the NER tier
#[async_trait]
pub trait PersonTagger: Send + Sync {
    /// Load model weights or other state; returns whether the tagger is usable
    ///
    /// Implementations use interior mutability so a shared reference can be
    /// loaded once at startup and queried afterwards.
    async fn load(&self) -> Result<bool>;

    /// True once the tagger can answer [`tag_persons`](Self::tag_persons)
    fn is_ready(&self) -> bool;

    /// Find person mentions in the text
    async fn tag_persons(&self, text: &str) -> Result<Vec<PersonSpan>>;

    /// Short identifier used in logs and tier detail strings
    fn name(&self) -> &str;
}

/// Deterministic tagger built on capitalization and Slavic name morphology
///
/// Always ready. Groups runs of capitalized Cyrillic words, skipping payment
/// vocabulary, and scores each run by whether its words carry patronymic or
/// surname suffixes.
pub struct LexicalPersonTagger {
    patterns: Arc<PatternMatcher>,
}

impl LexicalPersonTagger {
    pub fn new(patterns: Arc<PatternMatcher>) -> Self {
        Self { patterns }
    }

    fn is_name_candidate(&self, word: &str) -> bool {
        if self.patterns.is_purpose_word(word) || self.patterns.is_stop_word(word) {
            return false;
        }
        let mut chars = word.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => return false,
        };
        if !is_upper_cyrillic(first) {
            return false;
        }
        // Remaining characters must be lowercase Cyrillic or an apostrophe;
        // a single capital letter (an initial) does not qualify here
        let mut rest = 0usize;
        for c in chars {
            if !is_lower_cyrillic(c) && c != '\'' && c != '’' {
                return false;
            }
            rest += 1;
        }
        rest >= 1
    }

    fn score_word(word: &str) -> f32 {
        if is_patronymic(word) {
            0.9
        } else if looks_like_surname(word) {
            0.75
        } else {
            0.6
        }
    }
}

#[async_trait]
impl PersonTagger for LexicalPersonTagger {
    async fn load(&self) -> Result<bool> {
        Ok(true)
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn tag_persons(&self, text: &str) -> Result<Vec<PersonSpan>> {
        let mut spans = Vec::new();
        let mut run: Option<(usize, usize, f32, usize)> = None;

        for (start, word) in tokens_with_offsets(text) {
            let end = start + word.len();
            if self.is_name_candidate(word) {
                let score = Self::score_word(word);
                run = Some(match run {
                    Some((run_start, _, sum, count)) => (run_start, end, sum + score, count + 1),
                    None => (start, end, score, 1),
                });
            } else if let Some((run_start, run_end, sum, count)) = run.take() {
                spans.push(make_span(text, run_start, run_end, sum, count));
            }
        }
        if let Some((run_start, run_end, sum, count)) = run {
            spans.push(make_span(text, run_start, run_end, sum, count));
        }

        Ok(spans)
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

fn make_span(text: &str, start: usize, end: usize, score_sum: f32, count: usize) -> PersonSpan {
    let span_text = text[start..end]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    PersonSpan::new(span_text, score_sum / count as f32, start, end)
}

fn tokens_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_whitespace()
        .map(move |w| (w.as_ptr() as usize - text.as_ptr() as usize, w))
}

fn is_upper_cyrillic(c: char) -> bool {
    ('А'..='Я').contains(&c) || matches!(c, 'І' | 'Ї' | 'Є' | 'Ґ' | 'Ё')
}

fn is_lower_cyrillic(c: char) -> bool {
    ('а'..='я').contains(&c) || matches!(c, 'і' | 'ї' | 'є' | 'ґ' | 'ё')
}
