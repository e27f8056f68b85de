use serde::{Deserialize, Serialize};

/// Visual severity of a free-text status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSeverity {
    Ok,
    Pending,
    Risk,
}

/// Keyword classification: pending/partial first, then hold/review.
pub fn classify_status(status: Option<&str>) -> StatusSeverity {
    let value = status.unwrap_or_default().to_lowercase();

    if value.contains("pending") || value.contains("partial") {
        StatusSeverity::Pending
    } else if value.contains("hold") || value.contains("review") {
        StatusSeverity::Risk
    } else {
        StatusSeverity::Ok
    }
}
