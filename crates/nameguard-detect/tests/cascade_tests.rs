//! Detection cascade integration tests
//!
//! Exercise the pipeline end to end through its public API: deterministic
//! tier-1 screening, repeatability, and how verifier answers are admitted
//! or rejected once they reach the cascade.

use async_trait::async_trait;
use nameguard_core::Result;
use nameguard_detect::{
    CompletionBackend, DetectionPipeline, GenerativeVerifier, LexicalPersonTagger, PatternMatcher,
    PersonTagger, ResultCache, RuleNerAdapter, TransformerNerAdapter,
};
use nameguard_sanctions::SanctionsRegistry;
use nameguard_telemetry::{PipelineStats, RequestAuditLog};
use std::sync::Arc;
use std::time::Duration;

/// Backend that always returns the same completion
struct ScriptedBackend {
    response: String,
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn load(&self) -> Result<bool> {
        Ok(true)
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn build_pipeline(
    verifier: Option<GenerativeVerifier>,
    cache: Option<ResultCache>,
) -> DetectionPipeline {
    let patterns = Arc::new(PatternMatcher::new().unwrap());
    let tagger: Arc<dyn PersonTagger> = Arc::new(LexicalPersonTagger::new(Arc::clone(&patterns)));
    DetectionPipeline::new(
        patterns,
        RuleNerAdapter::new(Arc::clone(&tagger)),
        TransformerNerAdapter::new(tagger),
        verifier,
        cache,
        Arc::new(SanctionsRegistry::open("/nonexistent/sanctions.tsv")),
        Arc::new(RequestAuditLog::disabled()),
        PipelineStats::new(),
        0.85,
    )
}

fn scripted_verifier(response: &str) -> GenerativeVerifier {
    GenerativeVerifier::new(
        Arc::new(ScriptedBackend {
            response: response.to_string(),
        }),
        Arc::new(PatternMatcher::new().unwrap()),
        2,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_standard_comments_resolve_at_tier_one() {
    let pipeline = build_pipeline(None, None);

    let no_name_comments = vec![
        "Зарплата за грудень",
        "1000 грн",
        "Оплата послуг",
        "за січень",
        "Рахунок №123",
        "Поповнення рахунку",
        "Слава Україні",
    ];

    for comment in no_name_comments {
        let result = pipeline.detect("req", comment).await;
        assert!(!result.has_name, "'{}' should carry no name", comment);
        assert_eq!(result.tier_used, 1, "'{}' should resolve at tier 1", comment);
        assert_eq!(result.confidence, 1.0, "'{}' should be certain", comment);
        assert!(
            result.sanctions_check.is_none(),
            "'{}' should not be screened",
            comment
        );
    }
}

#[tokio::test]
async fn test_repeated_detection_is_stable_without_cache() {
    let pipeline = build_pipeline(None, None);
    let comment = "Переказ для Булатов Руслан Олександрович";

    let first = pipeline.detect("req-1", comment).await;
    for id in ["req-2", "req-3"] {
        let again = pipeline.detect(id, comment).await;
        assert_eq!(again.has_name, first.has_name);
        assert_eq!(again.category, first.category);
        assert_eq!(again.detected_name, first.detected_name);
        assert_eq!(again.confidence, first.confidence);
        assert_eq!(again.tier_used, first.tier_used);
    }
    assert_eq!(pipeline.stats().cache_hits, 0);
}

#[tokio::test]
async fn test_repeated_detection_is_stable_with_cache() {
    let pipeline = build_pipeline(None, Some(ResultCache::new(16)));
    let comment = "Переказ для Булатов Руслан Олександрович";

    let first = pipeline.detect("req-1", comment).await;
    let again = pipeline.detect("req-2", comment).await;
    assert_eq!(again.has_name, first.has_name);
    assert_eq!(again.category, first.category);
    assert_eq!(again.detected_name, first.detected_name);
    assert_eq!(pipeline.stats().cache_hits, 1);
}

#[tokio::test]
async fn test_verifier_recovers_name_the_taggers_missed() {
    // All-lowercase names are invisible to the capitalization-driven tagger
    let verifier = scripted_verifier("ПРІЗВИЩЕ_ІМЯ | Іванов Петро");
    let pipeline = build_pipeline(Some(verifier), None);

    let result = pipeline.detect("req", "переказ для іванов петро").await;
    assert!(result.has_name);
    assert_eq!(result.tier_used, 3);
    assert_eq!(result.detected_name.as_deref(), Some("Іванов Петро"));
}

#[tokio::test]
async fn test_hallucinated_verifier_answer_never_surfaces() {
    // The scripted name does not occur in the comment at all
    let verifier = scripted_verifier("ПРІЗВИЩЕ_ІМЯ | Шевченко Тарас");
    let pipeline = build_pipeline(Some(verifier), None);

    let result = pipeline.detect("req", "переказ другу за каву").await;
    assert!(!result.has_name);
    assert!(result.detected_name.is_none());
    assert_eq!(result.tier_used, 2);
}

#[tokio::test]
async fn test_stop_word_verifier_answer_never_surfaces() {
    let verifier = scripted_verifier("ТІЛЬКИ_ІМЯ | Оплата");
    let pipeline = build_pipeline(Some(verifier), None);

    let result = pipeline.detect("req", "дякую за оплата праці").await;
    assert!(!result.has_name);
    assert!(result.detected_name.is_none());
}

#[tokio::test]
async fn test_confident_ner_answer_skips_verification() {
    // A scripted answer that would change the outcome must never be consulted
    // when the NER tier is already confident
    let verifier = scripted_verifier("НЕМАЄ_ПІБ");
    let pipeline = build_pipeline(Some(verifier), None);

    let result = pipeline
        .detect("req", "Переказ для Булатов Руслан Олександрович")
        .await;
    assert!(result.has_name);
    assert_eq!(result.tier_used, 2);
    assert!(result.detected_name.unwrap().contains("Булатов"));
}

#[tokio::test]
async fn test_audit_line_written_per_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.csv");

    let patterns = Arc::new(PatternMatcher::new().unwrap());
    let tagger: Arc<dyn PersonTagger> = Arc::new(LexicalPersonTagger::new(Arc::clone(&patterns)));
    let pipeline = DetectionPipeline::new(
        patterns,
        RuleNerAdapter::new(Arc::clone(&tagger)),
        TransformerNerAdapter::new(tagger),
        None,
        None,
        Arc::new(SanctionsRegistry::open("/nonexistent/sanctions.tsv")),
        Arc::new(RequestAuditLog::open(&path)),
        PipelineStats::new(),
        0.85,
    );

    pipeline.detect("req-audit-1", "Переказ для Іванов Петро").await;
    pipeline.detect("req-audit-2", "Зарплата за грудень").await;

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3, "header plus one line per request");
    assert!(lines[1].contains("req-audit-1"));
    assert!(lines[2].contains("req-audit-2"));
}
