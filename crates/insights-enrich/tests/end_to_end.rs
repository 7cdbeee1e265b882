//! End-to-end run over an in-memory workbook with a scripted provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use insights_core::{EngineConfig, InsightSet, PER_SHEET_INSIGHT_COUNT};
use insights_enrich::{EnrichmentError, GenerationConstraints, InsightEngine, InsightProvider};
use insights_extract::{ExtractError, WorkbookSource};

/// In-memory workbook: name → grid.
struct FakeWorkbook {
    names: Vec<String>,
    grids: HashMap<String, Vec<Vec<String>>>,
}

impl FakeWorkbook {
    fn new(sheets: Vec<(&str, Vec<Vec<&str>>)>) -> Self {
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
}

impl WorkbookSource for FakeWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn read_grid(&self, sheet_name: &str) -> Result<Vec<Vec<String>>, ExtractError> {
        self.grids
            .get(sheet_name)
            .cloned()
            .ok_or_else(|| ExtractError::Sheet {
                name: sheet_name.to_string(),
                reason: "missing".to_string(),
            })
    }
}

/// Provider that fails for prompts containing a marker string and answers
/// stage prompts by arity otherwise.
struct StagedProvider {
    fail_on: Option<String>,
    calls: AtomicUsize,
    stage_prompts: Mutex<Vec<String>>,
}

impl StagedProvider {
    fn new(fail_on: Option<&str>) -> Self {
        Self {
            fail_on: fail_on.map(str::to_string),
            calls: AtomicUsize::new(0),
            stage_prompts: Mutex::new(Vec::new()),
        }
    }

    fn array_of(n: usize, tag: &str) -> String {
        let items: Vec<String> = (0..n).map(|i| format!("\"{tag} {i}\"")).collect();
        format!("[{}]", items.join(", "))
    }
}

#[async_trait]
impl InsightProvider for StagedProvider {
    async fn generate(
        &self,
        prompt: &str,
        _constraints: GenerationConstraints,
    ) -> Result<String, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.stage_prompts.lock().unwrap().push(prompt.to_string());

        if let Some(marker) = &self.fail_on {
            if prompt.contains(marker) {
                return Err(EnrichmentError::Provider("simulated outage".to_string()));
            }
        }

        // Distinguish stages by what the prompt asks for.
        if prompt.contains("exactly 10") {
            Ok(Self::array_of(10, "cross"))
        } else if prompt.contains("NEW and DEEPER") {
            Ok(Self::array_of(5, "deeper"))
        } else {
            Ok(Self::array_of(5, "sheet"))
        }
    }
}

fn vendor_grid(tag: &str) -> Vec<Vec<&'static str>> {
    let _ = tag;
    vec![
        vec!["Monthly report"],
        vec![],
        vec![],
        vec![],
        vec![],
        vec!["Month", "Deliveries"],
        vec!["Jan", "12"],
        vec!["Feb", "15"],
    ]
}

fn four_sheet_workbook() -> Arc<FakeWorkbook> {
    Arc::new(FakeWorkbook::new(vec![
        ("Average Summary", vendor_grid("avg")),
        ("Analysis SUMMARY", vendor_grid("ana")),
        ("Vendor A", vendor_grid("a")),
        ("Vendor B", vendor_grid("b")),
    ]))
}

#[tokio::test]
async fn full_run_selects_vendor_sheets_and_produces_all_layers() {
    let provider = Arc::new(StagedProvider::new(None));
    let engine = InsightEngine::new(EngineConfig::default(), provider.clone());

    let report = engine.run(four_sheet_workbook()).await.unwrap();

    let ids: Vec<&str> = report.sheets.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["Vendor_A", "Vendor_B"]);
    assert_eq!(report.names.display_name("Vendor_A"), Some("Vendor A"));
    assert_eq!(report.names.display_name("Vendor_B"), Some("Vendor B"));

    for set in report.sheets.values() {
        assert_eq!(set.items().len(), PER_SHEET_INSIGHT_COUNT);
        assert!(!set.is_fallback());
    }
    assert_eq!(report.cross_sheet.0.len(), 10);
    assert_eq!(report.deeper.0.len(), 5);
}

#[tokio::test]
async fn provider_outage_for_one_sheet_degrades_only_that_sheet() {
    // Vendor B's rows carry a marker so its Stage-1 prompt fails. The
    // Stage-2/3 prompts embed insight text, not table text, so they are
    // unaffected.
    let workbook = Arc::new(FakeWorkbook::new(vec![
        ("Average Summary", vendor_grid("avg")),
        ("Analysis SUMMARY", vendor_grid("ana")),
        ("Vendor A", vendor_grid("a")),
        (
            "Vendor B",
            vec![
                vec!["OUTAGE_MARKER"],
                vec![],
                vec![],
                vec![],
                vec![],
                vec!["Month", "Deliveries"],
                vec!["Jan", "3"],
            ],
        ),
    ]));

    let provider = Arc::new(StagedProvider::new(Some("OUTAGE_MARKER")));
    let engine = InsightEngine::new(EngineConfig::default(), provider.clone());

    let report = engine.run(workbook).await.unwrap();

    // Both sheets are present regardless of the failure.
    assert_eq!(report.sheets.len(), 2);
    assert!(!report.sheets["Vendor_A"].is_fallback());

    let fallback = &report.sheets["Vendor_B"];
    assert!(fallback.is_fallback());
    assert_eq!(fallback.items().len(), PER_SHEET_INSIGHT_COUNT);
    assert!(fallback.items().iter().all(|i| i.contains("Vendor B")));

    // Stage 2 still sees both sheets (the fallback is structurally valid)
    // and returns its full list.
    assert_eq!(report.cross_sheet.0.len(), 10);
    assert_eq!(report.deeper.0.len(), 5);

    let prompts = provider.stage_prompts.lock().unwrap();
    let stage2 = prompts
        .iter()
        .find(|p| p.contains("exactly 10"))
        .expect("stage 2 prompt");
    assert!(stage2.contains("Vendor A"));
    assert!(stage2.contains("Vendor B"));
}

#[tokio::test]
async fn empty_workbook_aborts_before_extraction() {
    let provider = Arc::new(StagedProvider::new(None));
    let engine = InsightEngine::new(EngineConfig::default(), provider.clone());

    let workbook = Arc::new(FakeWorkbook::new(vec![]));
    let err = engine.run(workbook).await.unwrap_err();

    assert!(matches!(err, ExtractError::Catalog(_)));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_sheet_is_still_enriched_never_skipped() {
    let workbook = Arc::new(FakeWorkbook::new(vec![
        ("Summary", vendor_grid("s")),
        ("Blank", vec![vec![""], vec![]]),
    ]));

    let provider = Arc::new(StagedProvider::new(None));
    let engine = InsightEngine::new(EngineConfig::default(), provider.clone());

    let report = engine.run(workbook).await.unwrap();

    // Two sheets → skip one → only "Blank" is selected, and its
    // placeholder document still goes through Stage 1.
    assert_eq!(report.sheets.len(), 1);
    assert!(matches!(report.sheets["Blank"], InsightSet::Generated { .. }));

    let prompts = provider.stage_prompts.lock().unwrap();
    assert!(prompts[0].contains("No data found in this sheet"));
}

#[tokio::test]
async fn report_serializes_with_stable_keys() {
    let provider = Arc::new(StagedProvider::new(None));
    let engine = InsightEngine::new(EngineConfig::default(), provider);

    let report = engine.run(four_sheet_workbook()).await.unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert!(value["sheets"]["Vendor_A"]["items"].is_array());
    assert_eq!(value["cross_sheet"].as_array().unwrap().len(), 10);
    assert_eq!(value["deeper"].as_array().unwrap().len(), 5);
}
