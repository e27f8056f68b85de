use registry::{Case, CaseCategory};
use serde::{Deserialize, Serialize};

/// Invoices represented by one case in the monthly volume figure.
pub const INVOICES_PER_CASE: usize = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_invoices: usize,
    pub approved: usize,
    pub pending: usize,
    pub atp_alerts: usize,
    pub approved_percent: u8,
    pub pending_percent: u8,
}

/// Derive the KPI summary for a case list.
pub fn compute_stats(cases: &[Case]) -> DashboardStats {
    if cases.is_empty() {
        return DashboardStats::default();
    }

    let total = cases.len();
    let mut approved = 0;
    let mut pending = 0;
    let mut atp_alerts = 0;

    for case in cases {
        let status = case.status_lower();
        let ready = status.contains("ready");

        if ready {
            approved += 1;
        }
        if status.contains("pending") || status.contains("review") {
            pending += 1;
        }
        if case.category == CaseCategory::Atp && !ready {
            atp_alerts += 1;
        }
    }

    DashboardStats {
        total_invoices: total * INVOICES_PER_CASE,
        approved,
        pending,
        atp_alerts,
        approved_percent: percent(approved, total),
        pending_percent: percent(pending, total),
    }
}

/// Rounded half-up share of `part` in `total`; `part` never exceeds `total`.
fn percent(part: usize, total: usize) -> u8 {
    ((part * 200 + total) / (total * 2)).min(100) as u8
}
