use crate::stages::PipelineKind;
use registry::{Case, non_empty};

/// Notification draft for a processed case.
///
/// Only the case fields feed the template, so the same case always yields
/// the same draft.
pub fn draft_email(kind: PipelineKind, case: &Case) -> String {
    let vendor = non_empty(Some(&case.vendor)).unwrap_or("Vendor");
    let customer = non_empty(Some(&case.customer)).unwrap_or("Customer");
    let notes = case.notes().unwrap_or("No notes available.");
    let status = case.status().unwrap_or("Unknown");
    let case_id = non_empty(Some(&case.id)).unwrap_or("N/A");
    let amount = case.display_amount().unwrap_or_else(|| "TBD".to_string());
    let due_date = case.due_date().unwrap_or("TBD");

    match kind {
        PipelineKind::Logistics => format!(
            "Subject: Logistics Status Update - {case_id}

Dear {customer} Team,

We have completed processing your logistics order {case_id}.

Logistics Status: {status}
Order Amount: {amount}
Expected Delivery: {due_date}

{notes}

The extracted data has been integrated into our systems. Please review the attached logistics document and confirm delivery details. If you have any questions about shipping, customs clearance, or delivery schedules, please contact our logistics team.

Best regards,
Enterprise Logistics Team"
        ),
        PipelineKind::Fulfillment => format!(
            "Subject: ATP Status Update - {case_id}

Dear {vendor} Team,

We have completed our analysis of your order {case_id} for {customer}.

ATP Status: {status}

{notes}

Please review the attached invoice and ATP confirmation details. If you have any questions or need to discuss alternative fulfillment options, please contact our ATP team.

Best regards,
Enterprise ATP Team"
        ),
    }
}
