//! Sheet grid to delimited table rendering
//!
//! Converts one sheet's cell grid into a bounded textual table: up to five
//! leading metadata lines, then a pipe-delimited table whose first row is
//! separated from the rest by a dashed rule. The output is deterministic
//! for a given grid, so re-extraction of an unchanged sheet is
//! byte-identical.

use serde::{Deserialize, Serialize};

/// Rows reserved at the top of a sheet for free-form metadata.
const METADATA_ROWS: usize = 5;

/// Cap on emitted data rows, for enrichment throughput.
const MAX_DATA_ROWS: usize = 50;

/// Column count comes from the widest of this many leading data rows.
const WIDTH_PROBE_ROWS: usize = 10;

/// Cells longer than this are cut with an ellipsis marker.
const MAX_CELL_LEN: usize = 50;

/// Placeholder emitted when a sheet has no usable rows.
pub const NO_DATA_ROW: &str = "No data found in this sheet";

/// Rendered table text for one sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableText {
    /// Non-blank header rows joined cell-by-cell with spaces.
    pub metadata_lines: Vec<String>,
    /// Pipe-delimited table, one line per row plus one separator line.
    pub table: String,
    /// Data rows emitted into the table (0 for the placeholder case).
    pub data_row_count: usize,
}

impl TableText {
    /// Render a raw grid following the fixed layout convention: rows 1-5
    /// are metadata, data starts at row 6.
    pub fn from_grid(grid: &[Vec<String>]) -> Self {
        let metadata_lines = grid
            .iter()
            .take(METADATA_ROWS)
            .map(|row| {
                row.iter()
                    .map(|c| clean_cell(c))
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect();

        let data_rows: Vec<Vec<String>> = grid
            .iter()
            .skip(METADATA_ROWS)
            .map(|row| row.iter().map(|c| clean_cell(c)).collect::<Vec<String>>())
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .take(MAX_DATA_ROWS)
            .collect();

        if data_rows.is_empty() {
            return Self {
                metadata_lines,
                table: format!("| {NO_DATA_ROW} |"),
                data_row_count: 0,
            };
        }

        // Deliberate speed trade-off: only the leading rows set the width.
        let width = data_rows
            .iter()
            .take(WIDTH_PROBE_ROWS)
            .map(Vec::len)
            .max()
            .unwrap_or(1)
            .max(1);

        let mut lines = Vec::with_capacity(data_rows.len() + 1);
        for (i, row) in data_rows.iter().enumerate() {
            lines.push(render_row(row, width));
            if i == 0 {
                lines.push(separator_row(width));
            }
        }

        Self {
            metadata_lines,
            table: lines.join("\n"),
            data_row_count: data_rows.len(),
        }
    }

    /// Metadata lines and table combined into one document body.
    pub fn to_markdown(&self) -> String {
        if self.metadata_lines.is_empty() {
            self.table.clone()
        } else {
            format!("{}\n\n{}", self.metadata_lines.join("\n"), self.table)
        }
    }
}

/// Stringify one cell for table emission: newlines become spaces, the
/// structural delimiter is stripped, and long values are cut at
/// `MAX_CELL_LEN` characters with an ellipsis marker.
fn clean_cell(raw: &str) -> String {
    let cleaned: String = raw
        .replace(['\n', '\r'], " ")
        .chars()
        .filter(|c| *c != '|')
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.chars().count() > MAX_CELL_LEN {
        let cut: String = cleaned.chars().take(MAX_CELL_LEN).collect();
        format!("{cut}...")
    } else {
        cleaned
    }
}

fn render_row(row: &[String], width: usize) -> String {
    let mut cells: Vec<&str> = row.iter().take(width).map(String::as_str).collect();
    // Narrow rows are right-padded; wider rows were cut by `take` above.
    cells.resize(width, "");
    format!("| {} |", cells.join(" | "))
}

fn separator_row(width: usize) -> String {
    let dashes = vec!["---"; width];
    format!("| {} |", dashes.join(" | "))
}
