//! Pipeline orchestrator
//!
//! Runs one comment through the tier cascade: prefix split, cache lookup,
//! quick filter, the two NER adapters, optional verifier escalation, then
//! sanctions screening. Every failure mode downstream degrades to a valid
//! result; this module never returns an error to the caller.

use crate::cache::{CacheStats, ResultCache};
use crate::ner_adapter::{arbitrate, RuleNerAdapter, TransformerNerAdapter};
use crate::patterns::PatternMatcher;
use crate::quick_filter::QuickFilter;
use crate::segmentation::{parts_to_result, PatternExtractor};
use crate::verifier::{GenerativeVerifier, VerifyOutcome};
use nameguard_core::{DetectionResult, NameCategory, Result};
use nameguard_sanctions::SanctionsRegistry;
use nameguard_telemetry::{PipelineStats, RequestAuditLog, StatsSnapshot};
use std::sync::Arc;
use std::time::Instant;

/// Tier reported for decisions made before any model runs
const QUICK_TIER: u8 = 1;

/// Confidence a verifier answer must exceed a kept NER answer by to win
const VERIFIER_CONFIDENCE_MARGIN: f32 = 0.1;

/// The full detection cascade behind one `detect` call
pub struct DetectionPipeline {
    patterns: Arc<PatternMatcher>,
    quick_filter: QuickFilter,
    extractor: PatternExtractor,
    rule_adapter: RuleNerAdapter,
    transformer_adapter: TransformerNerAdapter,
    verifier: Option<GenerativeVerifier>,
    cache: Option<ResultCache>,
    sanctions: Arc<SanctionsRegistry>,
    audit: Arc<RequestAuditLog>,
    stats: PipelineStats,
    verification_threshold: f32,
}

impl DetectionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        patterns: Arc<PatternMatcher>,
        rule_adapter: RuleNerAdapter,
        transformer_adapter: TransformerNerAdapter,
        verifier: Option<GenerativeVerifier>,
        cache: Option<ResultCache>,
        sanctions: Arc<SanctionsRegistry>,
        audit: Arc<RequestAuditLog>,
        stats: PipelineStats,
        verification_threshold: f32,
    ) -> Self {
        Self {
            quick_filter: QuickFilter::new(Arc::clone(&patterns)),
            extractor: PatternExtractor::new(),
            patterns,
            rule_adapter,
            transformer_adapter,
            verifier,
            cache,
            sanctions,
            audit,
            stats,
            verification_threshold,
        }
    }

    /// Screen one payment comment
    ///
    /// Always produces a result; downstream tier failures are absorbed here.
    pub async fn detect(&self, request_id: &str, comment: &str) -> DetectionResult {
        let started = Instant::now();
        self.stats.record_request();
        metrics::counter!("nameguard_requests_total").increment(1);

        let free_text = split_free_text(comment, &self.patterns);

        if free_text.is_empty() {
            let result = DetectionResult::no_name(1.0, QUICK_TIER).with_tier_detail("empty");
            return self.finalize(request_id, comment, free_text, result, started, false);
        }

        // Cache is keyed on the original comment, not the split portion
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(comment) {
                self.stats.record_cache_hit();
                metrics::counter!("nameguard_cache_hits_total").increment(1);
                let result = hit.with_timing(elapsed_ms(started));
                self.audit.record(request_id, comment, free_text, &result);
                return result;
            }
        }

        if let Some(result) = self.quick_filter.process(free_text) {
            return self.finalize(request_id, comment, free_text, result, started, true);
        }

        let (rule, transformer) = tokio::join!(
            self.rule_adapter.analyze(free_text),
            self.transformer_adapter.analyze(free_text)
        );
        let rule = flatten_adapter("ner_rule", rule);
        let transformer = flatten_adapter("ner_transformer", transformer);

        let result = match arbitrate(rule, transformer) {
            Some(tier2) => self.escalate_or_keep(tier2, free_text).await,
            None => self.verify_directly(free_text).await,
        };

        self.finalize(request_id, comment, free_text, result, started, true)
    }

    /// Escalate a low-confidence NER answer to the verifier, keeping the NER
    /// answer unless the verifier's is clearly better
    async fn escalate_or_keep(&self, tier2: DetectionResult, text: &str) -> DetectionResult {
        if tier2.confidence < self.verification_threshold {
            if let Some(verifier) = &self.verifier {
                match verifier.verify(text).await {
                    VerifyOutcome::Answer(answer) => {
                        if verifier_wins(&answer, &tier2) {
                            return answer;
                        }
                    }
                    VerifyOutcome::TimedOut => {
                        self.stats.record_verifier_timeout();
                        metrics::counter!("nameguard_errors_total", "stage" => "verifier_timeout")
                            .increment(1);
                    }
                    VerifyOutcome::Failed => {
                        metrics::counter!("nameguard_errors_total", "stage" => "verifier")
                            .increment(1);
                    }
                    VerifyOutcome::Skipped | VerifyOutcome::Unavailable => {}
                }
            }
        }
        self.polish_kept(tier2, text)
    }

    /// Final corrections applied only to a kept NER answer
    fn polish_kept(&self, result: DetectionResult, text: &str) -> DetectionResult {
        if let Some(name) = &result.detected_name {
            if self.patterns.is_greeting(name) {
                return DetectionResult::no_name(0.9, result.tier_used)
                    .with_tier_detail("greeting_override");
            }
        }

        // An unambiguous patronymic pattern in the text outranks a weaker
        // category from the models
        if result.category != NameCategory::FullName {
            if let Some(parts) = self.extractor.extract_full_name(text) {
                let confidence = parts.confidence.max(result.confidence).max(0.9);
                let mut upgraded = parts_to_result(&parts, result.tier_used);
                upgraded.confidence = confidence;
                return upgraded.with_tier_detail("full_name_upgrade");
            }
        }

        result
    }

    /// Tier 3 with no NER answer to fall back on
    async fn verify_directly(&self, text: &str) -> DetectionResult {
        if let Some(verifier) = &self.verifier {
            match verifier.verify(text).await {
                VerifyOutcome::Answer(answer) => return answer,
                VerifyOutcome::TimedOut => {
                    self.stats.record_verifier_timeout();
                    metrics::counter!("nameguard_errors_total", "stage" => "verifier_timeout")
                        .increment(1);
                }
                VerifyOutcome::Failed => {
                    metrics::counter!("nameguard_errors_total", "stage" => "verifier").increment(1);
                }
                VerifyOutcome::Skipped | VerifyOutcome::Unavailable => {}
            }
        }
        DetectionResult::no_name(0.5, QUICK_TIER).with_tier_detail("degraded_default")
    }

    /// Attach sanctions, timing, counters, cache, and the audit line
    fn finalize(
        &self,
        request_id: &str,
        comment: &str,
        free_text: &str,
        mut result: DetectionResult,
        started: Instant,
        cacheable: bool,
    ) -> DetectionResult {
        let degraded = result.tier_detail.as_deref() == Some("degraded_default");

        if result.has_name {
            if let Some(name) = result.detected_name.clone() {
                let check = self.sanctions.check(&name, result.category);
                if check.found {
                    metrics::counter!("nameguard_sanctions_hits_total").increment(1);
                }
                result = result.with_sanctions_check(check);
            }
        }

        let elapsed = elapsed_ms(started);
        result = result.with_timing(elapsed);
        metrics::histogram!("nameguard_pipeline_latency_us").record(elapsed * 1000.0);

        if degraded {
            // Degraded answers are visible in telemetry and never cached
            self.stats.record_degraded_default();
            metrics::counter!("nameguard_tier_decisions_total", "tier" => "degraded").increment(1);
        } else {
            self.stats.record_tier(result.tier_used);
            let tier = match result.tier_used {
                1 => "1",
                2 => "2",
                _ => "3",
            };
            metrics::counter!("nameguard_tier_decisions_total", "tier" => tier).increment(1);

            if cacheable {
                if let Some(cache) = &self.cache {
                    cache.put(comment, result.clone());
                }
            }
        }

        self.audit.record(request_id, comment, free_text, &result);
        result
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    pub fn sanctions(&self) -> &SanctionsRegistry {
        &self.sanctions
    }

    pub fn verifier_ready(&self) -> bool {
        self.verifier.as_ref().is_some_and(|v| v.is_ready())
    }
}

/// Pick the free-text portion of a comment that may carry a purpose prefix
///
/// Split on the first dash. When the tail is a single standard purpose word
/// and the head has two or more words, the comment is name-first and the
/// head is the free text. Otherwise the tail is, unless it is empty.
pub fn split_free_text<'a>(comment: &'a str, patterns: &PatternMatcher) -> &'a str {
    let Some((before, after)) = comment.split_once('-') else {
        return comment.trim();
    };

    let before = before.trim();
    let after = after.trim();

    if after.is_empty() {
        return before;
    }

    let mut after_words = after.split_whitespace();
    let single_purpose = match (after_words.next(), after_words.next()) {
        (Some(word), None) => patterns.is_purpose_word(word),
        _ => false,
    };

    if single_purpose && before.split_whitespace().count() >= 2 {
        before
    } else {
        after
    }
}

/// The verifier's answer replaces the NER answer only when it finds a name
/// the NER missed, a more complete category, or materially higher confidence
fn verifier_wins(answer: &DetectionResult, tier2: &DetectionResult) -> bool {
    (answer.has_name && !tier2.has_name)
        || answer.category.completeness() > tier2.category.completeness()
        || answer.confidence > tier2.confidence + VERIFIER_CONFIDENCE_MARGIN
}

/// An adapter error means that adapter has no answer, never a failed request
fn flatten_adapter(
    stage: &'static str,
    outcome: Result<Option<DetectionResult>>,
) -> Option<DetectionResult> {
    match outcome {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(stage, error = %e, "ner adapter failed");
            metrics::counter!("nameguard_errors_total", "stage" => stage).increment(1);
            None
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::{LexicalPersonTagger, PersonSpan, PersonTagger};
    use async_trait::async_trait;
    use std::io::Write;

    struct OfflineTagger;

    #[async_trait]
    impl PersonTagger for OfflineTagger {
        async fn load(&self) -> Result<bool> {
            Ok(false)
        }

        fn is_ready(&self) -> bool {
            false
        }

        async fn tag_persons(&self, _text: &str) -> Result<Vec<PersonSpan>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "offline"
        }
    }

    fn lexical_pipeline(sanctions: Arc<SanctionsRegistry>) -> DetectionPipeline {
        let patterns = Arc::new(PatternMatcher::new().unwrap());
        let tagger: Arc<dyn PersonTagger> =
            Arc::new(LexicalPersonTagger::new(Arc::clone(&patterns)));
        DetectionPipeline::new(
            Arc::clone(&patterns),
            RuleNerAdapter::new(Arc::clone(&tagger)),
            TransformerNerAdapter::new(tagger),
            None,
            Some(ResultCache::new(16)),
            sanctions,
            Arc::new(RequestAuditLog::disabled()),
            PipelineStats::new(),
            0.85,
        )
    }

    fn no_registry() -> Arc<SanctionsRegistry> {
        Arc::new(SanctionsRegistry::open("/nonexistent/sanctions.tsv"))
    }

    #[tokio::test]
    async fn test_purpose_prefix_without_name() {
        let pipeline = lexical_pipeline(no_registry());
        let result = pipeline.detect("req", "Заробітна плата-").await;
        assert!(!result.has_name);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.tier_used, 1);
    }

    #[tokio::test]
    async fn test_purpose_prefix_with_full_name() {
        let pipeline = lexical_pipeline(no_registry());
        let result = pipeline
            .detect("req", "Заробітна плата-Булатов Руслан Олександрович")
            .await;
        assert!(result.has_name);
        assert_eq!(result.category, NameCategory::FullName);
        assert!(result.detected_name.unwrap().contains("Булатов"));
    }

    #[tokio::test]
    async fn test_name_first_split() {
        let patterns = PatternMatcher::new().unwrap();
        assert_eq!(
            split_free_text("Іванов Петро-зарплата", &patterns),
            "Іванов Петро"
        );
        assert_eq!(
            split_free_text("Зарплата-Іванов Петро", &patterns),
            "Іванов Петро"
        );
        assert_eq!(split_free_text("Переказ коштів", &patterns), "Переказ коштів");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_tiers() {
        let pipeline = lexical_pipeline(no_registry());

        let first = pipeline.detect("req-1", "Переказ для Іванов Петро").await;
        let second = pipeline.detect("req-2", "Переказ для Іванов Петро").await;
        assert_eq!(first.category, second.category);
        assert_eq!(first.detected_name, second.detected_name);

        let stats = pipeline.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(
            stats.tier1_handled + stats.tier2_handled + stats.tier3_handled,
            1
        );
    }

    #[tokio::test]
    async fn test_embedded_greeting_is_overridden() {
        let pipeline = lexical_pipeline(no_registry());
        let result = pipeline.detect("req", "Переказ Слава Україні").await;
        assert!(!result.has_name);
        assert_eq!(result.tier_detail.as_deref(), Some("greeting_override"));
    }

    #[tokio::test]
    async fn test_degraded_default_when_no_tier_available() {
        let patterns = Arc::new(PatternMatcher::new().unwrap());
        let tagger: Arc<dyn PersonTagger> = Arc::new(OfflineTagger);
        let pipeline = DetectionPipeline::new(
            Arc::clone(&patterns),
            RuleNerAdapter::new(Arc::clone(&tagger)),
            TransformerNerAdapter::new(tagger),
            None,
            None,
            no_registry(),
            Arc::new(RequestAuditLog::disabled()),
            PipelineStats::new(),
            0.85,
        );

        let result = pipeline.detect("req", "Переказ для Іванов Петро").await;
        assert!(!result.has_name);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.tier_detail.as_deref(), Some("degraded_default"));
        assert_eq!(pipeline.stats().degraded_defaults, 1);
    }

    #[tokio::test]
    async fn test_sanctions_attached_to_detected_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sanctions.tsv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "sid\tname\ttranslit_name\taliases\tstatus").unwrap();
        writeln!(file, "1\tІванов Петро\tIvanov Petro\t\tactive").unwrap();

        let registry = Arc::new(SanctionsRegistry::open(&path));
        let pipeline = lexical_pipeline(registry);

        let result = pipeline.detect("req", "Переказ для Іванов Петро").await;
        assert!(result.has_name);
        let check = result.sanctions_check.unwrap();
        assert!(check.checked);
        assert!(check.found);
        assert_eq!(check.matched_name.as_deref(), Some("Іванов Петро"));
    }

    #[tokio::test]
    async fn test_no_separator_name_detected() {
        let pipeline = lexical_pipeline(no_registry());
        let result = pipeline
            .detect("req", "Переказ Іванову Петру Олександровичу")
            .await;
        assert!(result.has_name);
    }

    #[tokio::test]
    async fn test_empty_comment() {
        let pipeline = lexical_pipeline(no_registry());
        let result = pipeline.detect("req", "   ").await;
        assert!(!result.has_name);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.tier_used, 1);
    }
}
