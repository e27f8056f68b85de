use crate::session::HistoryTurn;
use insights::DashboardStats;
use registry::Case;
use serde::{Deserialize, Serialize};

/// How many cases of the portfolio travel with every request.
pub const RECENT_CASES: usize = 5;

/// What the dashboard currently shows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatContext<'a> {
    pub cases: &'a [Case],
    pub stats: Option<&'a DashboardStats>,
    pub current_case: Option<&'a Case>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    Case,
    Dashboard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_invoices: usize,
    pub approved: usize,
    pub pending: usize,
    pub atp_alerts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub id: String,
    pub vendor: String,
    pub customer: String,
    #[serde(rename = "type")]
    pub category: String,
    pub status: String,
    pub atp_notes: String,
}

/// The open case: the summary plus its amount, sent as `null` when unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCaseSummary {
    #[serde(flatten)]
    pub summary: CaseSummary,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsData {
    pub statistics: Option<StatsSummary>,
    pub recent_cases: Vec<CaseSummary>,
    pub current_case: Option<CurrentCaseSummary>,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub chat_history: Vec<HistoryTurn>,
    pub context_type: ContextType,
    pub claims_data: ClaimsData,
    pub client: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatsSummary {
    pub fn from_stats(stats: &DashboardStats) -> Self {
        Self {
            total_invoices: stats.total_invoices,
            approved: stats.approved,
            pending: stats.pending,
            atp_alerts: stats.atp_alerts,
        }
    }
}

impl CaseSummary {
    pub fn from_case(case: &Case) -> Self {
        Self {
            id: or_na(&case.id),
            vendor: or_na(&case.vendor),
            customer: or_na(&case.customer),
            category: case.category.to_string(),
            status: case.status().unwrap_or("Unknown").to_string(),
            atp_notes: case.notes().unwrap_or("No notes").to_string(),
        }
    }
}

impl CurrentCaseSummary {
    pub fn from_case(case: &Case) -> Self {
        Self {
            summary: CaseSummary::from_case(case),
            amount: case.amount,
        }
    }
}

impl ClaimsData {
    pub fn from_context(context: &ChatContext<'_>) -> Self {
        Self {
            statistics: context.stats.map(StatsSummary::from_stats),
            recent_cases: context
                .cases
                .iter()
                .take(RECENT_CASES)
                .map(CaseSummary::from_case)
                .collect(),
            current_case: context.current_case.map(CurrentCaseSummary::from_case),
        }
    }
}

/// Case block prepended to the user's question while a case is open.
pub fn case_context_intro(case: &Case) -> String {
    let summary = CaseSummary::from_case(case);
    format!(
        "Case context:\n- Case ID: {}\n- Vendor: {}\n- Customer: {}\n- Type: {}\n- Status: {}\n- ATP Notes: {}\n\n",
        summary.id, summary.vendor, summary.customer, summary.category, summary.status, summary.atp_notes
    )
}

fn or_na(value: &str) -> String {
    if value.is_empty() {
        "N/A".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insights::compute_stats;
    use registry::builtin_definitions;
    use serde_json::json;

    #[test]
    fn test_claims_data_shape() {
        let mut cases = builtin_definitions();
        cases.extend(builtin_definitions());
        let stats = compute_stats(&cases);
        let context = ChatContext {
            cases: &cases,
            stats: Some(&stats),
            current_case: Some(&cases[2]),
        };

        let value = serde_json::to_value(ClaimsData::from_context(&context)).unwrap();
        assert_eq!(value["recentCases"].as_array().unwrap().len(), RECENT_CASES);
        assert_eq!(value["statistics"]["totalInvoices"], json!(192));
        assert_eq!(value["currentCase"]["id"], json!("LOG-782234"));
        assert_eq!(value["currentCase"]["type"], json!("Logistics"));
        assert_eq!(value["currentCase"]["amount"], json!(40210.0));
        assert!(value["recentCases"][0].get("amount").is_none());
    }

    #[test]
    fn test_missing_amount_is_sent_as_null() {
        let mut case = builtin_definitions().remove(0);
        case.amount = None;
        let context = ChatContext {
            cases: std::slice::from_ref(&case),
            stats: None,
            current_case: Some(&case),
        };

        let value = serde_json::to_value(ClaimsData::from_context(&context)).unwrap();
        let current = value["currentCase"].as_object().unwrap();
        assert_eq!(current.get("amount"), Some(&json!(null)));
        assert_eq!(current["id"], json!("ATP-45009856-10"));
    }

    #[test]
    fn test_dashboard_context_has_no_current_case() {
        let value = serde_json::to_value(ClaimsData::from_context(&ChatContext::default())).unwrap();
        assert!(value["statistics"].is_null());
        assert!(value["currentCase"].is_null());
        assert_eq!(value["recentCases"], json!([]));
    }

    #[test]
    fn test_case_context_intro() {
        let intro = case_context_intro(&builtin_definitions()[0]);
        assert!(intro.starts_with("Case context:\n- Case ID: ATP-45009856-10\n"));
        assert!(intro.contains("- Status: ATP Pending\n"));
        assert!(intro.ends_with("tentative promise after 2026-01-07.\n\n"));

        let bare: Case = serde_json::from_value(json!({})).unwrap();
        let intro = case_context_intro(&bare);
        assert!(intro.contains("- Case ID: N/A\n"));
        assert!(intro.contains("- Status: Unknown\n"));
        assert!(intro.contains("- ATP Notes: No notes\n"));
    }

    #[test]
    fn test_reply_tolerates_missing_fields() {
        let reply: ChatReply = serde_json::from_value(json!({ "error": "x" })).unwrap();
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("x"));
    }
}
