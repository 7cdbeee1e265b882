//! Extraction driver
//!
//! Walks the selected sheets of a workbook, renders each grid into its
//! table text, assigns identifiers, and optionally persists each document
//! as a markdown file. Per-sheet failures (unreadable grid, failed write)
//! exclude that sheet and the run proceeds with the rest; only the caller
//! can abort, and only on an empty catalog.

use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use insights_core::{ExtractedDocument, NameMapping, SheetRef};

use crate::catalog::WorkbookSource;
use crate::identity::IdentifierRegistry;
use crate::table::TableText;

/// How many sheets read their grids at once. Grid reads are blocking
/// parser work, so this stays small.
const EXTRACT_CONCURRENCY: usize = 4;

/// Extract every selected sheet into a document.
///
/// Results come back in selection order regardless of read completion
/// order. The returned mapping recovers display names from identifiers
/// after enrichment.
pub async fn extract_documents<W>(
    source: Arc<W>,
    selected: &[SheetRef],
    markdown_dir: Option<&Path>,
) -> (Vec<ExtractedDocument>, NameMapping)
where
    W: WorkbookSource + 'static,
{
    let registry = IdentifierRegistry::new();
    let mut names = NameMapping::new();
    let mut documents: Vec<Option<ExtractedDocument>> = vec![None; selected.len()];

    // Suffixing of duplicate names follows selection order, not read
    // completion order, so identifiers are stable across runs.
    let identifiers: Vec<String> = selected
        .iter()
        .map(|sheet| registry.assign(&sheet.display_name, sheet.position))
        .collect();

    let markdown_dir = match markdown_dir {
        Some(dir) => match tokio::fs::create_dir_all(dir).await {
            Ok(()) => Some(dir),
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Cannot create markdown directory; persistence disabled"
                );
                None
            }
        },
        None => None,
    };

    for batch in selected.chunks(EXTRACT_CONCURRENCY) {
        let mut set: JoinSet<(usize, Result<Vec<Vec<String>>, crate::ExtractError>)> =
            JoinSet::new();

        for sheet in batch {
            let source = source.clone();
            let name = sheet.display_name.clone();
            let index = sheet.position;
            set.spawn_blocking(move || (index, source.read_grid(&name)));
        }

        while let Some(joined) = set.join_next().await {
            let (position, grid) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Sheet read task failed; sheet excluded");
                    continue;
                }
            };

            let Some(slot) = selected.iter().position(|s| s.position == position) else {
                continue;
            };
            let sheet = &selected[slot];

            let grid = match grid {
                Ok(grid) => grid,
                Err(e) => {
                    warn!(sheet = %sheet.display_name, error = %e, "Sheet unreadable; excluded from run");
                    continue;
                }
            };

            let table = TableText::from_grid(&grid);
            let identifier = identifiers[slot].clone();
            let body = table.to_markdown();

            if let Some(dir) = markdown_dir {
                let path = dir.join(format!("{identifier}.md"));
                if let Err(e) = tokio::fs::write(&path, &body).await {
                    warn!(
                        sheet = %sheet.display_name,
                        path = %path.display(),
                        error = %e,
                        "Markdown write failed; sheet excluded from run"
                    );
                    continue;
                }
                debug!(path = %path.display(), "Markdown persisted");
            }

            names.insert(&identifier, &sheet.display_name);
            documents[slot] = Some(ExtractedDocument {
                sheet: sheet.clone(),
                identifier,
                body,
                source_row_count: table.data_row_count,
            });
        }
    }

    let documents: Vec<ExtractedDocument> = documents.into_iter().flatten().collect();

    info!(
        extracted = documents.len(),
        selected = selected.len(),
        "Sheet extraction complete"
    );

    (documents, names)
}
