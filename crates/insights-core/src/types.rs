//! Shared data model for the sheet-insights pipeline
//!
//! Everything here is scoped to one upload-processing run: sheets are
//! enumerated, documents extracted, and the three insight layers derived in
//! strict stage order. All types are immutable once constructed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of insight items produced per sheet (Stage 1).
pub const PER_SHEET_INSIGHT_COUNT: usize = 5;

/// Number of cross-sheet insight items (Stage 2).
pub const CROSS_SHEET_INSIGHT_COUNT: usize = 10;

/// Number of deeper insight items (Stage 3).
pub const DEEPER_INSIGHT_COUNT: usize = 5;

/// Canonical per-sheet placeholder the provider emits for empty sheets.
pub const NO_DATA_INSIGHT: &str = "No data available";

/// Canonical Stage-2 sentinel when the input is too thin to compare.
pub const CROSS_SHEET_SENTINEL: &str = "Not enough data available";

/// Canonical Stage-3 sentinel when nothing new can be derived.
pub const DEEPER_SENTINEL: &str = "Insufficient new data patterns available for additional insights";

/// One named tabular unit within a workbook.
///
/// `position` is the sheet's ordinal within the workbook and drives
/// selection slicing; `display_name` is the human-visible name and is not
/// guaranteed unique across re-uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRef {
    pub display_name: String,
    pub position: usize,
}

impl SheetRef {
    pub fn new(display_name: impl Into<String>, position: usize) -> Self {
        Self {
            display_name: display_name.into(),
            position,
        }
    }
}

/// Deterministic rule choosing which sheets to process.
///
/// The skip-leading variant is computed from catalog size alone: workbooks
/// conventionally lead with one or two summary sheets that carry no
/// per-supplier data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Caller-provided list of display names, processed in catalog order.
    Explicit(Vec<String>),
    /// Skip the first `k` sheets (k in {0, 1, 2}).
    SkipLeading(usize),
}

impl SelectionPolicy {
    /// Size-based policy: skip 2 leading sheets when there are more than
    /// two, 1 when there are exactly two, otherwise none.
    pub fn from_catalog_size(total: usize) -> Self {
        let k = if total > 2 {
            2
        } else if total > 1 {
            1
        } else {
            0
        };
        Self::SkipLeading(k)
    }

    /// Apply the policy, preserving original relative order.
    pub fn select(&self, all_sheets: &[SheetRef]) -> Vec<SheetRef> {
        match self {
            Self::SkipLeading(k) => all_sheets.iter().skip(*k).cloned().collect(),
            Self::Explicit(names) => all_sheets
                .iter()
                .filter(|s| names.iter().any(|n| n == &s.display_name))
                .cloned()
                .collect(),
        }
    }

    /// Number of leading sheets this policy drops, if it is exactly a
    /// "skip first k" selection over the given catalog. Used by the bulk
    /// alignment path.
    pub fn leading_skip(&self, all_sheets: &[SheetRef]) -> usize {
        match self {
            Self::SkipLeading(k) => *k,
            Self::Explicit(_) => {
                let selected = self.select(all_sheets);
                for k in [2usize, 1] {
                    if all_sheets.len() >= k && selected == all_sheets[k..] {
                        return k;
                    }
                }
                0
            }
        }
    }
}

/// One sheet's extracted textual table, ready for enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub sheet: SheetRef,
    /// Filesystem-safe identifier, unique within the run.
    pub identifier: String,
    /// Delimited table representation, bounded in size.
    pub body: String,
    /// Data rows emitted into the body.
    pub source_row_count: usize,
}

/// Identifier → display name mapping, one entry per extracted document.
///
/// Enrichment results are keyed by identifier for stability; this recovers
/// the human-readable sheet name for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMapping {
    entries: HashMap<String, String>,
}

impl NameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, display_name: impl Into<String>) {
        self.entries.insert(identifier.into(), display_name.into());
    }

    pub fn display_name(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Why a fallback insight set was substituted for a provider result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Timeout,
    MalformedResponse,
    ProviderError,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::MalformedResponse => write!(f, "malformed response"),
            Self::ProviderError => write!(f, "provider error"),
        }
    }
}

/// Stage-1 result for one sheet: exactly five short statements, either
/// generated by the provider or substituted deterministically.
///
/// A fallback is structurally valid and flows through the later stages
/// like any other set; it is never a hole in the result mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightSet {
    Generated { items: Vec<String> },
    Fallback { items: Vec<String>, reason: FallbackReason },
}

impl InsightSet {
    pub fn generated(items: Vec<String>) -> Self {
        Self::Generated { items }
    }

    /// Deterministic substitute referencing the sheet identity, so the
    /// result mapping stays complete when a unit fails.
    pub fn fallback_for(display_name: &str, reason: FallbackReason) -> Self {
        let items = vec![
            format!("Insights for sheet '{display_name}' could not be generated automatically."),
            format!("The data in sheet '{display_name}' was received but not analyzed ({reason})."),
            format!("Re-running the analysis may produce insights for '{display_name}'."),
            format!("No trends or anomalies were evaluated for '{display_name}'."),
            format!("Figures in '{display_name}' remain available in the extracted table."),
        ];
        Self::Fallback { items, reason }
    }

    pub fn items(&self) -> &[String] {
        match self {
            Self::Generated { items } | Self::Fallback { items, .. } => items,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// True when every item is the canonical "no data" placeholder; such
    /// sheets are excluded from the Stage-2 input.
    pub fn reports_no_data(&self) -> bool {
        let items = self.items();
        !items.is_empty() && items.iter().all(|i| i == NO_DATA_INSIGHT)
    }
}

/// Stage-2 output: ten comparative statements across all sheets, or the
/// single-element sentinel when the input is too thin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossSheetInsights(pub Vec<String>);

impl CrossSheetInsights {
    pub fn sentinel() -> Self {
        Self(vec![CROSS_SHEET_SENTINEL.to_string()])
    }

    pub fn is_sentinel(&self) -> bool {
        self.0.len() == 1 && self.0[0] == CROSS_SHEET_SENTINEL
    }
}

/// Stage-3 output: five statements not already covered by the earlier
/// stages, or the single-element sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeeperInsights(pub Vec<String>);

impl DeeperInsights {
    pub fn sentinel() -> Self {
        Self(vec![DEEPER_SENTINEL.to_string()])
    }

    pub fn is_sentinel(&self) -> bool {
        self.0.len() == 1 && self.0[0] == DEEPER_SENTINEL
    }
}

/// Complete output of one pipeline run.
///
/// `sheets` preserves document insertion order and always has one entry
/// per extracted document; the aggregate layers degrade to their sentinel
/// values rather than being absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub sheets: IndexMap<String, InsightSet>,
    pub names: NameMapping,
    pub cross_sheet: CrossSheetInsights,
    pub deeper: DeeperInsights,
}
