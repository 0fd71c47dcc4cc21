//! Tier 2 NER adapters and the arbiter that reconciles them
//!
//! Two independent adapters analyze the same text: a rule adapter that runs
//! pattern extraction backed by the lexical tagger, and a transformer adapter
//! that wraps a token-classification model with context re-query and span
//! merging. The arbiter picks one answer from whatever subset produced one.

use crate::segmentation::{classify_by_word_count, parse_name_parts, parts_to_result, PatternExtractor};
use crate::tagger::{PersonSpan, PersonTagger};
use nameguard_core::{DetectionResult, NameCategory, Result};
use std::sync::Arc;

/// Tier number reported by both adapters
const NER_TIER: u8 = 2;

/// Neutral context prefixes that help a tagger see a bare name as a person
const CONTEXT_PREFIXES: &[&str] = &["Переказ для ", "Платіж для ", "Це "];

/// Maximum byte gap between spans that still merge into one mention
const MERGE_GAP: usize = 2;

/// Pattern-first adapter backed by the lexical tagger
pub struct RuleNerAdapter {
    extractor: PatternExtractor,
    tagger: Arc<dyn PersonTagger>,
}

impl RuleNerAdapter {
    pub fn new(tagger: Arc<dyn PersonTagger>) -> Self {
        Self {
            extractor: PatternExtractor::new(),
            tagger,
        }
    }

    /// Analyze the text; `None` means the adapter has nothing to offer
    pub async fn analyze(&self, text: &str) -> Result<Option<DetectionResult>> {
        if !self.tagger.is_ready() {
            return Ok(None);
        }

        // An unambiguous full-name pattern needs no tagger at all
        if let Some(parts) = self.extractor.extract_full_name(text) {
            if parts.confidence > 0.7 {
                let result = parts_to_result(&parts, NER_TIER).with_tier_detail("rule_pattern");
                return Ok(Some(result));
            }
        }

        let persons = self.tagger.tag_persons(text).await?;

        if persons.is_empty() {
            // Weak pattern fallback before giving up
            if let Some(parts) = self.extractor.extract_name(text) {
                if parts.confidence > 0.5 {
                    let result = parts_to_result(&parts, NER_TIER).with_tier_detail("rule_pattern");
                    return Ok(Some(result));
                }
            }
            return Ok(Some(
                DetectionResult::no_name(0.8, NER_TIER).with_tier_detail("rule_tagger"),
            ));
        }

        let best = persons
            .iter()
            .max_by_key(|s| s.text.chars().count())
            .cloned()
            .unwrap_or_else(|| persons[0].clone());
        let tagged_parts = parse_name_parts(&best.text);

        // A complete pattern match beats a partial tagged mention
        if !tagged_parts.is_complete() {
            if let Some(pattern_parts) = self.extractor.extract_name(text) {
                if pattern_parts.is_complete() && pattern_parts.confidence >= tagged_parts.confidence
                {
                    let result =
                        parts_to_result(&pattern_parts, NER_TIER).with_tier_detail("rule_pattern");
                    return Ok(Some(result));
                }
            }
        }

        Ok(Some(
            parts_to_result(&tagged_parts, NER_TIER).with_tier_detail("rule_tagger"),
        ))
    }
}

/// Adapter around a transformer tagger with re-query and merge logic
pub struct TransformerNerAdapter {
    extractor: PatternExtractor,
    tagger: Arc<dyn PersonTagger>,
}

impl TransformerNerAdapter {
    pub fn new(tagger: Arc<dyn PersonTagger>) -> Self {
        Self {
            extractor: PatternExtractor::new(),
            tagger,
        }
    }

    /// Analyze the text; `None` means the model is unavailable
    pub async fn analyze(&self, text: &str) -> Result<Option<DetectionResult>> {
        if !self.tagger.is_ready() {
            return Ok(None);
        }

        let mut persons = self.tagger.tag_persons(text).await?;

        // Bare names often lack the sentence context a tagger expects, so
        // retry with a neutral prefix and map offsets back to the original
        if persons.is_empty() {
            persons = self.requery_with_context(text).await?;
        }

        if persons.is_empty() {
            // Regex safety net for names the model misses entirely
            if let Some(parts) = self.extractor.extract_name(text) {
                if parts.confidence > 0.5 {
                    let result = parts_to_result(&parts, NER_TIER)
                        .with_tier_detail("transformer_pattern");
                    return Ok(Some(result));
                }
            }
            return Ok(Some(
                DetectionResult::no_name(0.8, NER_TIER).with_tier_detail("transformer"),
            ));
        }

        let (mention, score) = best_merged_mention(text, persons);
        let category = classify_by_word_count(&mention);
        let result = match category {
            NameCategory::NoName => DetectionResult::no_name(score, NER_TIER),
            _ => DetectionResult::detected(category, mention, score, NER_TIER),
        };
        Ok(Some(result.with_tier_detail("transformer")))
    }

    async fn requery_with_context(&self, text: &str) -> Result<Vec<PersonSpan>> {
        for prefix in CONTEXT_PREFIXES {
            let prefixed = format!("{}{}", prefix, text);
            let found = self.tagger.tag_persons(&prefixed).await?;

            let corrected: Vec<PersonSpan> = found
                .into_iter()
                .filter(|s| s.start >= prefix.len())
                .map(|s| {
                    PersonSpan::new(s.text, s.score, s.start - prefix.len(), s.end - prefix.len())
                })
                .collect();

            if !corrected.is_empty() {
                return Ok(corrected);
            }
        }
        Ok(Vec::new())
    }
}

/// Merge near-adjacent spans and pick the strongest resulting mention
///
/// Groups spans whose byte gap is at most [`MERGE_GAP`], ranks groups by
/// word count then average score, and re-slices the winning range from the
/// original text.
fn best_merged_mention(text: &str, mut spans: Vec<PersonSpan>) -> (String, f32) {
    spans.sort_by_key(|s| s.start);

    let mut groups: Vec<Vec<&PersonSpan>> = Vec::new();
    for span in &spans {
        match groups.last_mut() {
            Some(group) if span.start.saturating_sub(group.last().map(|s| s.end).unwrap_or(0)) <= MERGE_GAP => {
                group.push(span);
            }
            _ => groups.push(vec![span]),
        }
    }

    let best = groups
        .into_iter()
        .max_by(|a, b| {
            let key = |g: &Vec<&PersonSpan>| {
                let start = g.first().map(|s| s.start).unwrap_or(0);
                let end = g.last().map(|s| s.end).unwrap_or(0);
                let words = text[start..end].split_whitespace().count();
                let avg = g.iter().map(|s| s.score).sum::<f32>() / g.len() as f32;
                (words, avg)
            };
            let (wa, sa) = key(a);
            let (wb, sb) = key(b);
            wa.cmp(&wb).then(sa.total_cmp(&sb))
        })
        .unwrap_or_default();

    if best.is_empty() {
        return (String::new(), 0.0);
    }

    let start = best[0].start;
    let end = best[best.len() - 1].end;
    let mention = text[start..end]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let avg = best.iter().map(|s| s.score).sum::<f32>() / best.len() as f32;
    (mention, avg)
}

/// Reconcile the two adapters' answers into one
///
/// A full name from either side wins outright; otherwise the strictly more
/// confident answer wins, with the rule adapter taking ties.
pub fn arbitrate(
    rule: Option<DetectionResult>,
    transformer: Option<DetectionResult>,
) -> Option<DetectionResult> {
    match (rule, transformer) {
        (Some(r), Some(t)) => {
            let r_full = r.category == NameCategory::FullName;
            let t_full = t.category == NameCategory::FullName;
            if r_full && !t_full {
                Some(r)
            } else if t_full && !r_full {
                Some(t)
            } else if t.confidence > r.confidence {
                Some(t)
            } else {
                Some(r)
            }
        }
        (Some(r), None) => Some(r),
        (None, Some(t)) => Some(t),
        (None, None) => None,
    }
}
