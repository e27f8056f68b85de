pub mod case;
pub mod definitions;
pub mod fetch;

pub use case::{Case, CaseCategory, ExtractionRecord, Location, format_currency, non_empty};
pub use definitions::{builtin_definitions, load_definitions};
pub use fetch::DocumentFetcher;

use tracing::{info, warn};

/// Cases with their extraction records attached.
#[derive(Debug, Default)]
pub struct LoadedCases {
    pub cases: Vec<Case>,
    /// Documents that were referenced but could not be loaded.
    pub failed_documents: usize,
}

/// Attach both extraction records to every definition.
///
/// Cases load concurrently; a case is only returned once both of its
/// documents have resolved. Failed documents become empty records, so the
/// overall load never fails and every definition comes back in order.
pub async fn load_cases(fetcher: &DocumentFetcher, definitions: Vec<Case>) -> LoadedCases {
    let loads = definitions
        .into_iter()
        .map(|definition| load_case(fetcher, definition));

    let loaded = futures::future::join_all(loads).await;
    let failed_documents: usize = loaded.iter().map(|(_, failed)| failed).sum();
    let cases: Vec<Case> = loaded.into_iter().map(|(case, _)| case).collect();

    info!(cases = cases.len(), failed_documents, "Case registry loaded");

    LoadedCases {
        cases,
        failed_documents,
    }
}

async fn load_case(fetcher: &DocumentFetcher, mut case: Case) -> (Case, usize) {
    let (advanced, reasoning) = tokio::join!(
        fetcher.load_record(&case.advanced_path),
        fetcher.load_record(&case.reasoning_path),
    );

    let mut failed = 0;
    case.advanced = record_or_empty(&case.id, &case.advanced_path, advanced, &mut failed);
    case.reasoning = record_or_empty(&case.id, &case.reasoning_path, reasoning, &mut failed);
    (case, failed)
}

fn record_or_empty(
    case_id: &str,
    uri: &str,
    outcome: anyhow::Result<ExtractionRecord>,
    failed: &mut usize,
) -> ExtractionRecord {
    outcome.unwrap_or_else(|e| {
        warn!(case_id, uri, error = %e, "Failed to load document, using empty record");
        *failed += 1;
        ExtractionRecord::new()
    })
}
