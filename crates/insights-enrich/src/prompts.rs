//! Prompt templates for the three enrichment stages
//!
//! The pipeline treats prompt content as non-normative: it asks for a raw
//! JSON array of short strings and validates only that shape. Arity
//! expectations mirror the fixed insight counts in `insights_core`.

use insights_core::{CROSS_SHEET_SENTINEL, DEEPER_SENTINEL};

const PER_SHEET_TEMPLATE: &str = "\
You are a senior data analyst. Based on the following table content, \
generate exactly five concise insights as a raw JSON array of strings.

Instructions:
- Be fully accurate with dates, figures, and trends; no extrapolation.
- Each insight must highlight patterns, trends, gaps, or performance \
observations strictly from the actual data.
- Use clear, factual language; avoid phrases like 'the data shows'.
- If the table reports no data, return ['No data available'] repeated \
five times.
- Return only the JSON array of 5 strings, no markdown or explanations.
";

const CROSS_SHEET_TEMPLATE: &str = "\
You are an expert data analyst. Given the following JSON object of \
sheet-wise insights, generate exactly 10 deep and comparative insights \
across all sheets:
- Keep each point to 10-15 words.
- Compare and contrast patterns across sheets where applicable.
- Include exact numbers, percentages, or statistical findings.
- Avoid generic or vague summaries.

Return a valid JSON list with exactly 10 strings, and only JSON.
";

const DEEPER_TEMPLATE: &str = "\
You are an expert data analyst. You are given individual sheet-wise \
insights and general comparative insights. Generate exactly 5 NEW and \
DEEPER insights that were NOT covered in either input: hidden \
correlations, temporal patterns, performance gaps, risk signals, and \
benchmarking observations.

Requirements:
- Each insight must be 15-25 words, specific, and data-driven.
- Do not repeat any information from the inputs.

Return a valid JSON list with exactly 5 strings, and only JSON.
";

/// Stage-1 prompt for one sheet's table text.
pub fn per_sheet(body: &str) -> String {
    format!("{PER_SHEET_TEMPLATE}\n```\n{body}\n```")
}

/// Stage-2 prompt over the serialized per-sheet result set.
pub fn cross_sheet(serialized_insights: &str) -> String {
    format!(
        "{CROSS_SHEET_TEMPLATE}\nIf there is not enough data, return: [\"{CROSS_SHEET_SENTINEL}\"].\n```\n{serialized_insights}\n```"
    )
}

/// Stage-3 prompt over the serialized Stage-1 and Stage-2 outputs.
pub fn deeper(serialized_inputs: &str) -> String {
    format!(
        "{DEEPER_TEMPLATE}\nIf there is not enough new data, return: [\"{DEEPER_SENTINEL}\"].\n\nExisting Data:\n```json\n{serialized_inputs}\n```"
    )
}
