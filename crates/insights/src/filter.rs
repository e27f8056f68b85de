use crate::status::{StatusSeverity, classify_status};
use registry::{Case, CaseCategory};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(CaseCategory),
}

impl CategoryFilter {
    /// `ALL` (any case) or a category label; blank means `All`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(CaseCategory::parse(value))
        }
    }

    pub fn matches(&self, category: CaseCategory) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => *wanted == category,
        }
    }
}

/// Cases matching the category filter whose id, vendor or customer contains
/// `query` (case-insensitive). List order is preserved.
pub fn filter_cases<'a>(cases: &'a [Case], query: &str, filter: CategoryFilter) -> Vec<&'a Case> {
    let needle = query.to_lowercase();

    cases
        .iter()
        .filter(|case| filter.matches(case.category))
        .filter(|case| {
            let haystack = format!("{} {} {}", case.id, case.vendor, case.customer).to_lowercase();
            haystack.contains(&needle)
        })
        .collect()
}

/// One row of the case queue, with display defaults applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRow {
    pub id: String,
    pub label: String,
    pub vendor: String,
    pub customer: String,
    #[serde(rename = "type")]
    pub category: CaseCategory,
    pub status: String,
    pub severity: StatusSeverity,
    pub amount: String,
    pub due_date: String,
}

impl CaseRow {
    pub fn from_case(case: &Case) -> Self {
        Self {
            id: or_default(&case.id, "N/A"),
            label: or_default(&case.label, "Unnamed Case"),
            vendor: or_default(&case.vendor, "N/A"),
            customer: or_default(&case.customer, "N/A"),
            category: case.category,
            status: case.status().unwrap_or("Unknown").to_string(),
            severity: classify_status(case.status()),
            amount: case.display_amount().unwrap_or_else(|| "N/A".to_string()),
            due_date: case.due_date().unwrap_or("TBD").to_string(),
        }
    }
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
