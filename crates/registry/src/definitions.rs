use crate::case::{Case, CaseCategory, Location};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// Read case definitions from a JSON array on disk.
///
/// Only an unreadable file or a document that is not an array is an error.
/// Entries are decoded one by one: malformed fields read as absent and an
/// entry that is not an object is skipped.
pub async fn load_definitions(path: &Path) -> Result<Vec<Case>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .context(format!("Failed to read case definitions: {:?}", path))?;

    let entries: Vec<Value> =
        serde_json::from_str(&content).context("Failed to parse case definitions")?;

    let total = entries.len();
    let definitions: Vec<Case> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Case>(entry) {
            Ok(case) => Some(case),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed case definition");
                None
            }
        })
        .collect();

    info!(path = ?path, loaded = definitions.len(), skipped = total - definitions.len(), "Case definitions read");
    Ok(definitions)
}

/// The four demo cases the dashboard ships with.
pub fn builtin_definitions() -> Vec<Case> {
    vec![
        definition(
            "ATP-45009856-10",
            "ChemPlus Chicago Depot",
            CaseCategory::Atp,
            "ChemPlus",
            "ChemPlus – Chicago Depot",
            ("Chicago", "IL", 41.8781, -87.6298),
            "/data/fwdataforcelanesedemo/ATP%201/ATP%20Sample%204.pdf",
            "/data/fwdataforcelanesedemo/ATP%201/ATP_SAMPLE_4.json",
            "/data/fwdataforcelanesedemo/ATP%201/ATP_subsprod_sample5.json",
            "ATP failed, no stock across plants. MRP simulation scheduled for 2025-11-28; tentative promise after 2026-01-07.",
            "ATP Pending",
            29200.0,
            "2025-11-25",
        ),
        definition(
            "ATP-44001177-04",
            "Futura Plastics Dallas",
            CaseCategory::Atp,
            "Futura Plastics",
            "Futura Plastics – Dallas Hub",
            ("Dallas", "TX", 32.7767, -96.797),
            "/data/fwdataforcelanesedemo/ATP%201/ATP%20Sample%201.pdf",
            "/data/fwdataforcelanesedemo/ATP%201/ATP_Sample_1.json",
            "/data/fwdataforcelanesedemo/ATP%201/ATP_subsprod_sample5_atp.json",
            "Partial ATP confirmed. 45% ships 2025-12-03; balance pending vendor allocation.",
            "ATP Partial",
            18750.0,
            "2025-12-02",
        ),
        definition(
            "LOG-782234",
            "Pacific Logistics Corridor",
            CaseCategory::Logistics,
            "Pacific Logistics",
            "Chemelle – Riverside",
            ("Los Angeles", "CA", 34.0522, -118.2437),
            "/data/fwdataforcelanesedemo/Logistic%201/Logistics_Sample%206.pdf",
            "/data/manual/logistics_sample_adv.json",
            "/data/manual/logistics_sample_reasoning.json",
            "Container delayed at Long Beach. Recommend diverting to Oakland and notifying customer of 4-day slip.",
            "Logistics Hold",
            40210.0,
            "2025-11-29",
        ),
        definition(
            "PRC-118920",
            "Polymer Pricing Review",
            CaseCategory::Pricing,
            "Chemelle Strategic Accounts",
            "Celanese Europe BV",
            ("Frankfurt", "DE", 50.1109, 8.6821),
            "/data/fwdataforcelanesedemo/Pricing1/Pricing-Formula%20not%20Updated_Sample%201.pdf",
            "/data/manual/pricing_sample_adv.json",
            "/data/manual/pricing_sample_reasoning.json",
            "Formula update pending CFO approval. Recommend provisional credit note and status call with buyer.",
            "Pricing Review",
            65890.0,
            "2025-12-10",
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn definition(
    id: &str,
    label: &str,
    category: CaseCategory,
    vendor: &str,
    customer: &str,
    (city, state, lat, lon): (&str, &str, f64, f64),
    pdf: &str,
    advanced_path: &str,
    reasoning_path: &str,
    notes: &str,
    status: &str,
    amount: f64,
    due_date: &str,
) -> Case {
    Case {
        id: id.to_string(),
        label: label.to_string(),
        category,
        vendor: vendor.to_string(),
        customer: customer.to_string(),
        location: Some(Location {
            city: city.to_string(),
            state: state.to_string(),
            lat: Some(lat),
            lon: Some(lon),
        }),
        pdf: pdf.to_string(),
        advanced_path: advanced_path.to_string(),
        reasoning_path: reasoning_path.to_string(),
        atp_notes: Some(notes.to_string()),
        status: Some(status.to_string()),
        amount: Some(amount),
        due_date: Some(due_date.to_string()),
        advanced: Default::default(),
        reasoning: Default::default(),
    }
}
