//! Sheet catalog and workbook access
//!
//! `WorkbookSource` is the seam between the pipeline and whatever holds
//! the spreadsheet; `XlsxWorkbook` is the calamine-backed implementation
//! for uploaded `.xlsx` files. Catalog enumeration is the only step that
//! can abort a run: an unopenable workbook or one with zero sheets is
//! rejected before any extraction happens.

use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

use insights_core::{SelectionPolicy, SheetRef};

use crate::{ExtractError, Result};

/// Read access to one workbook's sheets.
///
/// Implementations are expected to be cheap to query for names after
/// construction; `read_grid` may do real parsing work and is driven
/// through `spawn_blocking` by the extraction driver.
pub trait WorkbookSource: Send + Sync {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// The sheet's cell grid, stringified row by row. Empty cells become
    /// empty strings; trailing geometry is whatever the format reports.
    fn read_grid(&self, sheet_name: &str) -> Result<Vec<Vec<String>>>;
}

/// Calamine-backed `.xlsx` workbook.
///
/// Calamine parses worksheets lazily and requires `&mut` access, so the
/// reader sits behind a mutex to keep `WorkbookSource` shareable across
/// extraction workers.
pub struct XlsxWorkbook {
    inner: Mutex<Xlsx<BufReader<File>>>,
    names: Vec<String>,
}

impl XlsxWorkbook {
    /// Open a workbook from disk. Fails with `ExtractError::Catalog` if
    /// the file cannot be parsed as xlsx.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| ExtractError::Catalog(format!("cannot open {}: {e}", path.display())))?;
        let names = workbook.sheet_names().to_owned();

        debug!(path = %path.display(), sheet_count = names.len(), "Workbook opened");

        Ok(Self {
            inner: Mutex::new(workbook),
            names,
        })
    }

    /// Open a workbook without blocking the async runtime.
    pub async fn open_async(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // Unzipping and parsing the package is CPU-bound.
        tokio::task::spawn_blocking(move || Self::open(path))
            .await
            .map_err(|e| ExtractError::Catalog(format!("workbook open task failed: {e}")))?
    }
}

impl WorkbookSource for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn read_grid(&self, sheet_name: &str) -> Result<Vec<Vec<String>>> {
        let range = self
            .inner
            .lock()
            .worksheet_range(sheet_name)
            .map_err(|e| ExtractError::Sheet {
                name: sheet_name.to_string(),
                reason: e.to_string(),
            })?;

        let grid = range
            .rows()
            .map(|row| row.iter().map(stringify_cell).collect())
            .collect();

        Ok(grid)
    }
}

fn stringify_cell(cell: &Data) -> String {
    if cell.is_empty() {
        String::new()
    } else {
        cell.to_string()
    }
}

/// Enumerated catalog plus the selection derived from its size.
#[derive(Debug, Clone)]
pub struct SheetCatalog {
    pub all_sheets: Vec<SheetRef>,
    pub policy: SelectionPolicy,
}

impl SheetCatalog {
    /// Ordered sub-sequence of sheets the run will process.
    pub fn selected(&self) -> Vec<SheetRef> {
        self.policy.select(&self.all_sheets)
    }
}

/// Enumerate sheet identities and derive the size-based selection policy.
///
/// A workbook with zero sheets rejects the whole run; no heuristic on
/// sheet content or name is applied.
pub fn list_sheets(source: &dyn WorkbookSource) -> Result<SheetCatalog> {
    let names = source.sheet_names();
    if names.is_empty() {
        return Err(ExtractError::Catalog("workbook contains no sheets".to_string()));
    }

    let all_sheets: Vec<SheetRef> = names
        .into_iter()
        .enumerate()
        .map(|(position, display_name)| SheetRef { display_name, position })
        .collect();

    let policy = SelectionPolicy::from_catalog_size(all_sheets.len());

    info!(
        sheet_count = all_sheets.len(),
        skipped = all_sheets.len() - policy.select(&all_sheets).len(),
        "Sheet catalog enumerated"
    );

    Ok(SheetCatalog { all_sheets, policy })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// In-memory workbook for tests.
    pub struct GridWorkbook {
        names: Vec<String>,
        grids: HashMap<String, Vec<Vec<String>>>,
    }

    impl GridWorkbook {
        pub fn new(sheets: Vec<(&str, Vec<Vec<&str>>)>) -> Self {
            let names = sheets.iter().map(|(n, _)| n.to_string()).collect();
            let grids = sheets
                .into_iter()
                .map(|(n, g)| {
                    let grid = g
                        .into_iter()
                        .map(|row| row.into_iter().map(str::to_string).collect())
                        .collect();
                    (n.to_string(), grid)
                })
                .collect();
            Self { names, grids }
        }

        pub fn empty() -> Self {
            Self {
                names: Vec::new(),
                grids: HashMap::new(),
            }
        }
    }

    impl WorkbookSource for GridWorkbook {
        fn sheet_names(&self) -> Vec<String> {
            self.names.clone()
        }

        fn read_grid(&self, sheet_name: &str) -> Result<Vec<Vec<String>>> {
            self.grids
                .get(sheet_name)
                .cloned()
                .ok_or_else(|| ExtractError::Sheet {
                    name: sheet_name.to_string(),
                    reason: "sheet not present".to_string(),
                })
        }
    }
}
