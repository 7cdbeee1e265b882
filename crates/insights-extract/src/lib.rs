//! Workbook cataloging, table extraction, and document alignment
//!
//! This crate turns an uploaded workbook into a set of extracted documents
//! ready for enrichment: it enumerates and selects sheets, renders each
//! selected sheet's grid into a bounded pipe-delimited table, assigns a
//! collision-free filesystem-safe identifier per sheet, and (for callers
//! on the bulk-parse path) reconciles externally parsed documents against
//! the selected sheet list.

pub mod align;
pub mod catalog;
pub mod extract;
pub mod identity;
pub mod table;

pub use align::{align_documents, AlignmentReport, BulkParser, ParsedDocument};
pub use catalog::{list_sheets, SheetCatalog, WorkbookSource, XlsxWorkbook};
pub use extract::extract_documents;
pub use identity::IdentifierRegistry;
pub use table::TableText;

/// Error types for extraction operations
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The workbook could not be opened or contains no sheets. This is
    /// the only fatal error: the run aborts before any extraction.
    #[error("Workbook catalog error: {0}")]
    Catalog(String),

    /// One sheet failed to extract; the run proceeds without it.
    #[error("Sheet '{name}' extraction failed: {reason}")]
    Sheet { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractError::Catalog("no sheets found".to_string());
        assert!(err.to_string().contains("catalog error"));

        let err = ExtractError::Sheet {
            name: "Vendor A".to_string(),
            reason: "unreadable range".to_string(),
        };
        assert!(err.to_string().contains("Vendor A"));
    }
}
