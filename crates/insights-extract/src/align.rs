//! Bulk-parse document/sheet alignment
//!
//! Some parsing providers process the whole workbook in one call and
//! return an ordered batch of documents whose count and order are not
//! contractually tied to the sheet list. This module reconciles such a
//! batch with the intended sheet selection: drop the leading documents
//! the selection skipped, then truncate the longer side to the shorter
//! length. Misalignment degrades the run instead of aborting it, but
//! every mismatch is recorded for observability.
//!
//! Direct per-sheet extraction (the preferred path, used by the engine)
//! never needs this.

use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

use insights_core::{SelectionPolicy, SheetRef};

use crate::Result;

/// One externally parsed document, in provider order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub text: String,
}

/// Whole-workbook parsing provider.
#[async_trait]
pub trait BulkParser: Send + Sync {
    /// Parse the file into an ordered batch of per-sheet documents.
    /// Count and order are best-effort only.
    async fn parse(&self, file: &Path) -> Result<Vec<ParsedDocument>>;
}

/// What alignment had to do to reconcile the two sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentReport {
    /// Leading documents dropped to mirror the sheet selection.
    pub skipped_leading: usize,
    /// Documents beyond the reconciled length, discarded.
    pub dropped_documents: usize,
    /// Selected sheets beyond the reconciled length, excluded from
    /// extraction.
    pub dropped_sheets: usize,
}

impl AlignmentReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_documents == 0 && self.dropped_sheets == 0
    }
}

/// Reconcile an externally parsed batch with the selected sheet list.
///
/// Returns `(sheet, document)` pairs in selection order plus a report of
/// everything that was dropped. Best-effort by design: a silent
/// misalignment of content is preferred over aborting the run.
pub fn align_documents(
    mut documents: Vec<ParsedDocument>,
    all_sheets: &[SheetRef],
    selected: &[SheetRef],
    policy: &SelectionPolicy,
) -> (Vec<(SheetRef, ParsedDocument)>, AlignmentReport) {
    let mut report = AlignmentReport::default();

    // The bulk parser saw every sheet; mirror the selection's leading skip.
    let skip = policy.leading_skip(all_sheets).min(documents.len());
    if skip > 0 {
        documents.drain(..skip);
        report.skipped_leading = skip;
    }

    if documents.len() != selected.len() {
        let reconciled = documents.len().min(selected.len());
        report.dropped_documents = documents.len() - reconciled;
        report.dropped_sheets = selected.len() - reconciled;
        warn!(
            documents = documents.len(),
            selected_sheets = selected.len(),
            reconciled,
            "Parsed document count does not match sheet selection; truncating to the shorter side"
        );
        documents.truncate(reconciled);
    }

    let pairs = selected
        .iter()
        .take(documents.len())
        .cloned()
        .zip(documents)
        .collect();

    (pairs, report)
}
