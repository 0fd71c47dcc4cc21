//! Tier 1 quick filter
//!
//! Cheap, deterministic screening that resolves the obvious no-name cases
//! before any model runs. The filter either answers NO_NAME with full
//! confidence or defers to the next tier; it never errors and never claims
//! a name was found.

use crate::patterns::PatternMatcher;
use nameguard_core::DetectionResult;
use regex::Regex;
use std::sync::Arc;

/// Minimum comment length (in characters) worth analyzing
const MIN_COMMENT_CHARS: usize = 3;

/// Deterministic first-tier screen over the free-text portion of a comment
pub struct QuickFilter {
    patterns: Arc<PatternMatcher>,
    numeric_only: Regex,
}

impl QuickFilter {
    pub fn new(patterns: Arc<PatternMatcher>) -> Self {
        // Digits, punctuation, and currency markers; a comment left empty
        // after removing these carries no name
        let numeric_only = Regex::new(r"[\d\s\.,\-+/\\()₴$€грнuahusdeur]+")
            .expect("numeric filter pattern is valid");
        Self {
            patterns,
            numeric_only,
        }
    }

    /// Screen the text, returning a final NO_NAME result or deferring
    ///
    /// `Some` means the tier resolved the request; `None` means the text
    /// may contain a name and must continue down the cascade.
    pub fn process(&self, text: &str) -> Option<DetectionResult> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Some(self.no_name("empty"));
        }

        if trimmed.chars().count() < MIN_COMMENT_CHARS {
            return Some(self.no_name("too_short"));
        }

        if self.is_numeric_only(trimmed) {
            return Some(self.no_name("numeric_only"));
        }

        if self.patterns.matches_no_name(trimmed) {
            return Some(self.no_name("no_name_pattern"));
        }

        // A positive indicator defers with intent; anything else defers
        // because the tier cannot rule a name out
        None
    }

    /// True if the text looks like a name candidate to the indicator rules
    pub fn has_name_indicator(&self, text: &str) -> bool {
        self.patterns.matches_name_indicator(text)
    }

    fn is_numeric_only(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.numeric_only.replace_all(&lowered, "").is_empty()
    }

    fn no_name(&self, detail: &str) -> DetectionResult {
        DetectionResult::no_name(1.0, 1).with_tier_detail(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nameguard_core::NameCategory;

    fn filter() -> QuickFilter {
        QuickFilter::new(Arc::new(PatternMatcher::new().unwrap()))
    }

    #[test]
    fn test_empty_and_short_resolve_no_name() {
        let f = filter();

        let empty = f.process("   ").unwrap();
        assert!(!empty.has_name);
        assert_eq!(empty.category, NameCategory::NoName);
        assert_eq!(empty.confidence, 1.0);
        assert_eq!(empty.tier_used, 1);

        let short = f.process("зп").unwrap();
        assert!(!short.has_name);
        assert_eq!(short.tier_detail.as_deref(), Some("too_short"));
    }

    #[test]
    fn test_numeric_only_resolves_no_name() {
        let f = filter();

        assert!(f.process("1000 грн").is_some());
        assert!(f.process("250.50").is_some());
        assert!(f.process("100 + 200 uah").is_some());
    }

    #[test]
    fn test_no_name_patterns_resolve() {
        let f = filter();

        let result = f.process("Зарплата за грудень").unwrap();
        assert!(!result.has_name);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.tier_detail.as_deref(), Some("no_name_pattern"));

        assert!(f.process("Оплата послуг").is_some());
        assert!(f.process("Рахунок №123").is_some());
        assert!(f.process("за січень").is_some());
    }

    #[test]
    fn test_name_candidates_defer() {
        let f = filter();

        assert!(f.process("Переказ Іванову Петру").is_none());
        assert!(f.process("Булатов Руслан Олександрович").is_none());
        // Uncertain free text defers rather than resolving
        assert!(f.process("дякую за допомогу другу").is_none());
    }

    #[test]
    fn test_indicator_exposed_for_telemetry() {
        let f = filter();

        assert!(f.has_name_indicator("Переказ Іванову Петру"));
        assert!(!f.has_name_indicator("просто текст без імен"));
    }

    #[test]
    fn test_greetings_resolve_at_tier_one() {
        let f = filter();

        let result = f.process("Слава Україні").unwrap();
        assert!(!result.has_name);
        assert_eq!(result.tier_used, 1);
    }
}
