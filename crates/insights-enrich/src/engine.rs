//! End-to-end insight engine
//!
//! Runs one upload-processing pass: enumerate and select sheets, extract
//! each selected sheet directly (the preferred strategy; no alignment
//! step needed), then the three enrichment stages in strict order. Only
//! an empty or unopenable catalog aborts; every other fault degrades per
//! its component contract, so the final report is always structurally
//! complete.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use insights_core::{EngineConfig, InsightReport};
use insights_extract::catalog::{list_sheets, WorkbookSource};
use insights_extract::extract::extract_documents;

use crate::aggregate::{deepen, summarize};
use crate::pipeline::EnrichmentPipeline;
use crate::provider::{ChatCompletionsProvider, InsightProvider};

pub struct InsightEngine {
    config: EngineConfig,
    provider: Arc<dyn InsightProvider>,
}

impl InsightEngine {
    pub fn new(config: EngineConfig, provider: Arc<dyn InsightProvider>) -> Self {
        Self { config, provider }
    }

    /// Build an engine backed by the HTTP chat-completions provider.
    pub fn from_config(config: EngineConfig) -> crate::Result<Self> {
        let provider = Arc::new(ChatCompletionsProvider::new(config.provider.clone())?);
        Ok(Self::new(config, provider))
    }

    /// Process one workbook into the full three-layer report.
    pub async fn run<W>(&self, source: Arc<W>) -> Result<InsightReport, insights_extract::ExtractError>
    where
        W: WorkbookSource + 'static,
    {
        let started = Instant::now();

        // Catalog enumeration is the only fatal step.
        let catalog = list_sheets(source.as_ref())?;
        let selected = catalog.selected();

        let markdown_dir = self.config.output.markdown_dir.as_ref().map(PathBuf::from);
        let (documents, names) =
            extract_documents(source, &selected, markdown_dir.as_deref()).await;

        info!(
            selected = selected.len(),
            extracted = documents.len(),
            "Extraction phase complete"
        );

        let pipeline = EnrichmentPipeline::new(self.provider.clone(), self.config.limits.clone());
        let sheets = pipeline.enrich_all(&documents).await;

        let cross_sheet = summarize(self.provider.as_ref(), &sheets, &names).await;
        let deeper = deepen(self.provider.as_ref(), &sheets, &names, &cross_sheet).await;

        info!(
            sheets = sheets.len(),
            cross_sheet_sentinel = cross_sheet.is_sentinel(),
            deeper_sentinel = deeper.is_sentinel(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Insight run complete"
        );

        Ok(InsightReport {
            sheets,
            names,
            cross_sheet,
            deeper,
        })
    }
}
