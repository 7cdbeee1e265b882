//! Stage 1: per-sheet enrichment pipeline
//!
//! One independent provider call per extracted document, with bounded
//! in-flight concurrency, a per-unit deadline, and deterministic fallback
//! substitution. The pipeline returns only after every unit has settled,
//! and the result mapping always has exactly one entry per input
//! document, in input order.

use futures::future::join_all;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use insights_core::{
    ExtractedDocument, FallbackReason, InsightSet, LimitsConfig, PER_SHEET_INSIGHT_COUNT,
};

use crate::prompts;
use crate::provider::{decode_string_list, GenerationConstraints, InsightProvider};
use crate::EnrichmentError;

/// Marker appended when a document body is cut before dispatch.
const TRUNCATION_MARKER: &str = "\n[table truncated]";

pub struct EnrichmentPipeline {
    provider: Arc<dyn InsightProvider>,
    limits: LimitsConfig,
}

impl EnrichmentPipeline {
    pub fn new(provider: Arc<dyn InsightProvider>, limits: LimitsConfig) -> Self {
        Self { provider, limits }
    }

    /// Enrich every document concurrently; never fails, never drops a key.
    ///
    /// The effective concurrency is the smaller of the document count and
    /// the configured ceiling. Each unit has its own deadline; a timeout,
    /// provider fault, or malformed response substitutes the fallback set
    /// for that sheet only.
    pub async fn enrich_all(
        &self,
        documents: &[ExtractedDocument],
    ) -> IndexMap<String, InsightSet> {
        if documents.is_empty() {
            return IndexMap::new();
        }

        let permits = documents.len().min(self.limits.max_concurrency.max(1));
        let semaphore = Arc::new(Semaphore::new(permits));
        let started = Instant::now();

        let units = documents.iter().map(|doc| {
            let provider = self.provider.clone();
            let semaphore = semaphore.clone();
            let limits = self.limits.clone();
            async move {
                // Closed only if the semaphore is dropped, which it is not.
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let set = enrich_one(provider.as_ref(), doc, &limits).await;
                (doc.identifier.clone(), set)
            }
        });

        let results = join_all(units).await;

        let mapping: IndexMap<String, InsightSet> = results.into_iter().collect();
        let fallbacks = mapping.values().filter(|s| s.is_fallback()).count();

        info!(
            documents = documents.len(),
            fallbacks,
            concurrency = permits,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Per-sheet enrichment settled"
        );
        debug_assert_eq!(mapping.len(), documents.len());

        mapping
    }
}

async fn enrich_one(
    provider: &dyn InsightProvider,
    doc: &ExtractedDocument,
    limits: &LimitsConfig,
) -> InsightSet {
    let body = truncate_body(&doc.body, limits.max_body_len);
    let prompt = prompts::per_sheet(&body);
    let deadline = limits.unit_timeout();

    let result = match tokio::time::timeout(
        deadline,
        provider.generate(&prompt, GenerationConstraints::per_sheet()),
    )
    .await
    {
        Ok(outcome) => outcome.and_then(|raw| decode_string_list(&raw, PER_SHEET_INSIGHT_COUNT)),
        Err(_) => Err(EnrichmentError::Timeout(deadline)),
    };

    match result {
        Ok(items) => {
            debug!(document_id = %doc.identifier, "Insights generated");
            InsightSet::generated(items)
        }
        Err(e) => {
            let reason = fallback_reason(&e);
            warn!(document_id = %doc.identifier, error = %e, "Enrichment unit degraded to fallback");
            InsightSet::fallback_for(&doc.sheet.display_name, reason)
        }
    }
}

fn fallback_reason(error: &EnrichmentError) -> FallbackReason {
    match error {
        EnrichmentError::Timeout(_) => FallbackReason::Timeout,
        EnrichmentError::MalformedResponse(_) => FallbackReason::MalformedResponse,
        EnrichmentError::Provider(_) | EnrichmentError::Http(_) => FallbackReason::ProviderError,
    }
}

/// Bound the dispatched body, marking the cut. Throughput/fidelity
/// trade-off: the enrichment call has its own cost and timeout budget.
fn truncate_body(body: &str, max_len: usize) -> String {
    if body.chars().count() <= max_len {
        return body.to_string();
    }
    let cut: String = body.chars().take(max_len).collect();
    format!("{cut}{TRUNCATION_MARKER}")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scriptable provider: responses keyed by a substring of the prompt,
    /// with a default, optional per-call delay, and a call log.
    pub struct ScriptedProvider {
        responses: Mutex<HashMap<String, Result<String, String>>>,
        default: Result<String, String>,
        delay: Option<std::time::Duration>,
        pub calls: AtomicUsize,
        pub max_inflight: AtomicUsize,
        inflight: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn returning(default: &str) -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                default: Ok(default.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
                max_inflight: AtomicUsize::new(0),
                inflight: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            let mut p = Self::returning("[]");
            p.default = Err(message.to_string());
            p
        }

        pub fn with_response_for(self, needle: &str, response: Result<String, String>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(needle.to_string(), response);
            self
        }

        pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn valid_items(n: usize) -> String {
            let items: Vec<String> = (0..n).map(|i| format!("\"insight {i}\"")).collect();
            format!("[{}]", items.join(", "))
        }
    }

    #[async_trait]
    impl InsightProvider for ScriptedProvider {
        async fn generate(
            &self,
            prompt: &str,
            _constraints: GenerationConstraints,
        ) -> crate::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_inflight.fetch_max(now, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let scripted = {
                let responses = self.responses.lock().unwrap();
                responses
                    .iter()
                    .find(|(needle, _)| prompt.contains(needle.as_str()))
                    .map(|(_, r)| r.clone())
            };

            self.inflight.fetch_sub(1, Ordering::SeqCst);

            match scripted.unwrap_or_else(|| self.default.clone()) {
                Ok(raw) => Ok(raw),
                Err(msg) => Err(EnrichmentError::Provider(msg)),
            }
        }
    }
}
