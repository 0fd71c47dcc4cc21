//! Sanctions name index and matcher
//!
//! The matcher deliberately trades recall for precision: a surname match is
//! mandatory, a present given name must also agree, and a bare first name is
//! never enough evidence. Partial overlap without those gates stays a
//! non-match so unrelated people sharing a common first name are never
//! flagged.

use nameguard_core::{NameCategory, SanctionsCheckResult, SanctionsRecord};
use std::collections::HashMap;
use std::sync::Arc;

/// Partial matches never exceed this confidence
const PARTIAL_CONFIDENCE_CAP: f32 = 0.9;

/// Tokens shorter than this carry no matching weight
const MIN_TOKEN_LEN: usize = 3;

/// Normalize a name for comparison
///
/// Lower-cases, strips apostrophes and hyphens, and collapses internal
/// whitespace so spelling variants of the same name collide.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.trim().chars() {
        if matches!(c, '\'' | '’' | 'ʼ' | '-') {
            continue;
        }
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
            continue;
        }
        for lower in c.to_lowercase() {
            out.push(lower);
        }
        last_space = false;
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Immutable dual index over the sanctions registry
///
/// Built once from parsed records and swapped wholesale on reload, so
/// lookups never observe a partially built state.
pub struct SanctionsIndex {
    names: HashMap<String, Arc<SanctionsRecord>>,
    parts: HashMap<String, Vec<Arc<SanctionsRecord>>>,
}

impl SanctionsIndex {
    /// An index with no records; every check returns not-found
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
            parts: HashMap::new(),
        }
    }

    /// Build both indexes from registry records
    pub fn build(records: Vec<SanctionsRecord>) -> Self {
        let mut names: HashMap<String, Arc<SanctionsRecord>> = HashMap::new();
        let mut parts: HashMap<String, Vec<Arc<SanctionsRecord>>> = HashMap::new();

        for record in records {
            let record = Arc::new(record);
            let normalized = normalize(&record.name);
            if normalized.is_empty() {
                continue;
            }

            for word in normalized.split(' ') {
                if word.chars().count() >= MIN_TOKEN_LEN {
                    parts
                        .entry(word.to_string())
                        .or_default()
                        .push(Arc::clone(&record));
                }
            }

            names.insert(normalized, Arc::clone(&record));

            // Aliases only ever fill gaps; the first spelling seen wins
            for alias in &record.aliases {
                let alias_normalized = normalize(alias);
                if !alias_normalized.is_empty() && !names.contains_key(&alias_normalized) {
                    names.insert(alias_normalized, Arc::clone(&record));
                }
            }
        }

        Self { names, parts }
    }

    /// Number of indexed full names and aliases
    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    /// Number of distinct indexed tokens
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Screen a detected name against the registry
    pub fn check(&self, name: &str, category: NameCategory) -> SanctionsCheckResult {
        if self.names.is_empty() || name.trim().is_empty() {
            return SanctionsCheckResult::not_found();
        }

        // A bare given name or patronymic is never sufficient evidence
        if category == NameCategory::NameOnly {
            return SanctionsCheckResult::not_found();
        }

        let normalized = normalize(name);

        if let Some(record) = self.names.get(&normalized) {
            return SanctionsCheckResult::exact(record.name.clone(), record.status);
        }

        let query_words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
        if query_words.is_empty() {
            return SanctionsCheckResult::not_found();
        }

        let Some((best, shared)) = self.best_candidate(&query_words) else {
            return SanctionsCheckResult::not_found();
        };

        let candidate = normalize(&best.name);
        let candidate_words: Vec<&str> = candidate.split(' ').collect();

        // Surname gate: the first token must agree
        if candidate_words.first() != query_words.first() {
            return SanctionsCheckResult::not_found();
        }

        // Given-name gate: when both sides carry one, it must agree too
        if query_words.len() >= 2 && candidate_words.len() >= 2 && query_words[1] != candidate_words[1]
        {
            return SanctionsCheckResult::not_found();
        }

        if shared >= 2 || shared == query_words.len() {
            let confidence =
                shared as f32 / query_words.len().max(candidate_words.len()) as f32;
            return SanctionsCheckResult::partial(
                best.name.clone(),
                best.status,
                confidence.min(PARTIAL_CONFIDENCE_CAP),
            );
        }

        SanctionsCheckResult::not_found()
    }

    /// Tally shared tokens per registry id and pick the strongest candidate
    ///
    /// Equal counts resolve to the lowest registry id, numerically where the
    /// ids parse as numbers, so repeated checks are deterministic.
    fn best_candidate(&self, query_words: &[&str]) -> Option<(Arc<SanctionsRecord>, usize)> {
        let mut tallies: HashMap<&str, (Arc<SanctionsRecord>, usize)> = HashMap::new();

        for word in query_words {
            if word.chars().count() < MIN_TOKEN_LEN {
                continue;
            }
            if let Some(candidates) = self.parts.get(*word) {
                for record in candidates {
                    tallies
                        .entry(record.sid.as_str())
                        .and_modify(|(_, count)| *count += 1)
                        .or_insert_with(|| (Arc::clone(record), 1));
                }
            }
        }

        tallies
            .into_values()
            .min_by(|(a, count_a), (b, count_b)| {
                count_b
                    .cmp(count_a)
                    .then_with(|| sid_order(&a.sid).cmp(&sid_order(&b.sid)))
            })
            .filter(|(_, count)| *count >= 1)
    }
}

fn sid_order(sid: &str) -> (u64, &str) {
    match sid.parse::<u64>() {
        Ok(n) => (n, ""),
        Err(_) => (u64::MAX, sid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nameguard_core::{MatchType, SanctionsStatus};

    fn record(sid: &str, name: &str, aliases: &[&str]) -> SanctionsRecord {
        SanctionsRecord {
            sid: sid.to_string(),
            name: name.to_string(),
            translit_name: String::new(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            status: SanctionsStatus::Active,
        }
    }

    fn index() -> SanctionsIndex {
        SanctionsIndex::build(vec![
            record("101", "Вітченко Ігор Петрович", &["Vitchenko Igor"]),
            record("102", "Іванов Олег Олександрович", &[]),
            record("103", "Петров Максим Іванович", &[]),
        ])
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize("Мар'яненко-Коваль  Олена"), "маряненкоковаль олена");
        assert_eq!(normalize("  Іванов   Петро "), "іванов петро");
    }

    #[test]
    fn test_exact_match() {
        let result = index().check("Вітченко Ігор Петрович", NameCategory::FullName);
        assert!(result.found);
        assert_eq!(result.match_type, MatchType::Exact);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.matched_name.as_deref(), Some("Вітченко Ігор Петрович"));
    }

    #[test]
    fn test_alias_matches_exactly() {
        let result = index().check("Vitchenko Igor", NameCategory::SurnameName);
        assert!(result.found);
        assert_eq!(result.match_type, MatchType::Exact);
    }

    #[test]
    fn test_surname_gate_rejects() {
        // Shares given name and patronymic, different surname
        let result = index().check("Мельник Ігор Петрович", NameCategory::FullName);
        assert!(!result.found);
    }

    #[test]
    fn test_given_name_gate_rejects() {
        let result = index().check("Іванов Петро Олександрович", NameCategory::FullName);
        assert!(!result.found);
    }

    #[test]
    fn test_partial_match_surname_and_given_name() {
        let result = index().check("Іванов Олег", NameCategory::SurnameName);
        assert!(result.found);
        assert_eq!(result.match_type, MatchType::Partial);
        assert!(result.confidence <= 0.9);
    }

    #[test]
    fn test_name_only_never_matches() {
        let result = index().check("Ігор", NameCategory::NameOnly);
        assert!(!result.found);

        // Even an exact registry token does not flag a bare given name
        let result = index().check("Олег", NameCategory::NameOnly);
        assert!(!result.found);
    }

    #[test]
    fn test_single_shared_surname_token_matches() {
        // One token that is the full query still satisfies the
        // every-query-token rule
        let result = index().check("Вітченко", NameCategory::SurnameOnly);
        assert!(result.found);
        assert_eq!(result.match_type, MatchType::Partial);
    }

    #[test]
    fn test_tie_breaks_to_lowest_sid() {
        let idx = SanctionsIndex::build(vec![
            record("205", "Шевченко Андрій Павлович", &[]),
            record("204", "Шевченко Андрій Олегович", &[]),
        ]);

        // Both candidates share two tokens; the lower sid must win
        let result = idx.check("Шевченко Андрій Вікторович", NameCategory::FullName);
        assert!(result.found);
        assert_eq!(
            result.matched_name.as_deref(),
            Some("Шевченко Андрій Олегович")
        );
    }

    #[test]
    fn test_empty_index_finds_nothing() {
        let result = SanctionsIndex::empty().check("Іванов Петро", NameCategory::SurnameName);
        assert!(!result.found);
        assert!(result.checked);
    }
}
