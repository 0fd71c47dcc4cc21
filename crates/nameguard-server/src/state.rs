//! Application state construction

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use nameguard_detect::{
    CompletionBackend, DetectionPipeline, GenerativeVerifier, GgufBackend, GgufSource,
    LexicalPersonTagger, ModelLocation, OllamaBackend, PatternMatcher, PersonTagger, ResultCache,
    RuleNerAdapter, TokenClassificationTagger, TransformerNerAdapter, VerifierBackendKind,
};
use nameguard_sanctions::SanctionsRegistry;
use nameguard_telemetry::{PipelineStats, RequestAuditLog};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub pipeline: Arc<DetectionPipeline>,
    pub sanctions: Arc<SanctionsRegistry>,
    pub tagger: Arc<dyn PersonTagger>,
    pub metrics_handle: PrometheusHandle,
    pub started: Instant,
}

impl AppState {
    /// Build all collaborators and wire the pipeline
    ///
    /// Model loading failures degrade the corresponding tier instead of
    /// failing startup; the service always comes up.
    pub async fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Result<Self> {
        let detector = &config.detector;
        let patterns = Arc::new(PatternMatcher::new()?);

        let lexical: Arc<dyn PersonTagger> =
            Arc::new(LexicalPersonTagger::new(Arc::clone(&patterns)));

        let location = match &detector.tagger.model_path {
            Some(path) => ModelLocation::Local { path: path.clone() },
            None => ModelLocation::HuggingFace {
                repo: detector.tagger.model_repo.clone(),
                revision: "main".to_string(),
            },
        };
        let transformer: Arc<dyn PersonTagger> = Arc::new(TokenClassificationTagger::new(
            location,
            &detector.tagger.device,
            detector.tagger.max_input_length,
        ));
        if detector.tagger.enabled {
            match transformer.load().await {
                Ok(true) => info!("transformer tagger ready"),
                Ok(false) => warn!("transformer tagger unavailable, tier 2b degraded"),
                Err(e) => warn!(error = %e, "transformer tagger load failed, tier 2b degraded"),
            }
        } else {
            info!("transformer tagger disabled by configuration");
        }

        let verifier = if detector.verifier.enabled {
            let backend: Arc<dyn CompletionBackend> = match detector.verifier.backend {
                VerifierBackendKind::Http => Arc::new(OllamaBackend::new(
                    &detector.verifier.backend_url,
                    &detector.verifier.model_name,
                    detector.verifier.temperature,
                    detector.verifier.max_tokens,
                )),
                VerifierBackendKind::Local => Arc::new(GgufBackend::new(
                    GgufSource::HuggingFace {
                        repo: detector.verifier.model_repo.clone(),
                        gguf_file: detector.verifier.model_file.clone(),
                    },
                    detector.verifier.temperature,
                    detector.verifier.max_tokens,
                )),
            };
            let verifier = GenerativeVerifier::new(
                backend,
                Arc::clone(&patterns),
                detector.verifier.max_concurrent,
                detector.verifier_timeout(),
            );
            match verifier.load().await {
                Ok(true) => info!("verifier ready"),
                Ok(false) => warn!("verifier unavailable, tier 3 degraded"),
                Err(e) => warn!(error = %e, "verifier load failed, tier 3 degraded"),
            }
            Some(verifier)
        } else {
            info!("verifier disabled by configuration");
            None
        };

        let sanctions = Arc::new(SanctionsRegistry::open(&detector.sanctions_path));
        let registry_stats = sanctions.stats();
        if registry_stats.loaded {
            info!(names = registry_stats.total_names, "sanctions registry loaded");
        } else {
            warn!("sanctions registry unavailable, screening reports not_checked");
        }

        let cache = detector
            .cache
            .enabled
            .then(|| ResultCache::new(detector.cache.capacity));

        let audit = if config.audit.enabled {
            Arc::new(RequestAuditLog::open(&config.audit.path))
        } else {
            Arc::new(RequestAuditLog::disabled())
        };

        let pipeline = DetectionPipeline::new(
            patterns,
            RuleNerAdapter::new(lexical),
            TransformerNerAdapter::new(Arc::clone(&transformer)),
            verifier,
            cache,
            Arc::clone(&sanctions),
            audit,
            PipelineStats::new(),
            detector.verification_threshold,
        );

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            sanctions,
            tagger: transformer,
            metrics_handle,
            started: Instant::now(),
        })
    }
}
