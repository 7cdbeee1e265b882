//! Stages 2 and 3: fan-in aggregation
//!
//! Each stage is a single provider call over the complete output of the
//! prior stage(s). There is no partial-failure handling to do here; a
//! failed or malformed call degrades to the stage's canonical sentinel
//! and never raises. Stage ordering is strict: `summarize` requires
//! Stage 1 to have fully settled, `deepen` requires `summarize`'s output.

use indexmap::IndexMap;
use serde_json::json;
use tracing::{debug, warn};

use insights_core::{
    CrossSheetInsights, DeeperInsights, InsightSet, NameMapping, CROSS_SHEET_INSIGHT_COUNT,
    DEEPER_INSIGHT_COUNT,
};

use crate::prompts;
use crate::provider::{decode_string_list, GenerationConstraints, InsightProvider};

/// Stage 2: cross-sheet insights over the full per-sheet result set.
///
/// Sheets whose insight set is the "no data" placeholder are excluded
/// from the serialized input; fallback sets are structurally valid and
/// stay in. With nothing left to compare, the sentinel is returned
/// without a provider call.
pub async fn summarize(
    provider: &dyn InsightProvider,
    sheets: &IndexMap<String, InsightSet>,
    names: &NameMapping,
) -> CrossSheetInsights {
    let input = serialize_sheets(sheets, names, true);
    if input.as_object().map_or(true, |m| m.is_empty()) {
        debug!("No sheet insights with data; skipping cross-sheet call");
        return CrossSheetInsights::sentinel();
    }

    let serialized = pretty(&input);
    let prompt = prompts::cross_sheet(&serialized);

    match provider
        .generate(&prompt, GenerationConstraints::cross_sheet())
        .await
        .and_then(|raw| decode_string_list(&raw, CROSS_SHEET_INSIGHT_COUNT))
    {
        Ok(items) => CrossSheetInsights(items),
        Err(e) => {
            warn!(error = %e, "Cross-sheet aggregation degraded to sentinel");
            CrossSheetInsights::sentinel()
        }
    }
}

/// Stage 3: deeper insights over Stage 1 + Stage 2 outputs.
///
/// The anti-duplication requirement is a content constraint carried by
/// the prompt, not verified programmatically.
pub async fn deepen(
    provider: &dyn InsightProvider,
    sheets: &IndexMap<String, InsightSet>,
    names: &NameMapping,
    cross_sheet: &CrossSheetInsights,
) -> DeeperInsights {
    let input = json!({
        "sheet_insights": serialize_sheets(sheets, names, false),
        "general_insights": cross_sheet.0,
    });

    let serialized = pretty(&input);
    let prompt = prompts::deeper(&serialized);

    match provider
        .generate(&prompt, GenerationConstraints::deeper())
        .await
        .and_then(|raw| decode_string_list(&raw, DEEPER_INSIGHT_COUNT))
    {
        Ok(items) => DeeperInsights(items),
        Err(e) => {
            warn!(error = %e, "Deeper aggregation degraded to sentinel");
            DeeperInsights::sentinel()
        }
    }
}

/// Per-sheet results as a JSON object keyed by display name, falling back
/// to the identifier when no mapping entry exists.
fn serialize_sheets(
    sheets: &IndexMap<String, InsightSet>,
    names: &NameMapping,
    exclude_no_data: bool,
) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for (identifier, set) in sheets {
        if exclude_no_data && set.reports_no_data() {
            continue;
        }
        let key = names.display_name(identifier).unwrap_or(identifier);
        out.insert(key.to_string(), json!(set.items()));
    }
    serde_json::Value::Object(out)
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
