//! Core types and configuration for the sheet-insights pipeline
//!
//! This crate carries the data model shared across extraction and
//! enrichment: sheet references and selection policy, extracted documents
//! and their identifier/name mapping, the three derived insight layers,
//! and the engine configuration.

pub mod config;
pub mod types;

pub use config::{EngineConfig, LimitsConfig, OutputConfig, ProviderConfig};
pub use types::{
    CrossSheetInsights, DeeperInsights, ExtractedDocument, FallbackReason, InsightReport,
    InsightSet, NameMapping, SelectionPolicy, SheetRef, CROSS_SHEET_INSIGHT_COUNT,
    CROSS_SHEET_SENTINEL, DEEPER_INSIGHT_COUNT, DEEPER_SENTINEL, NO_DATA_INSIGHT,
    PER_SHEET_INSIGHT_COUNT,
};
