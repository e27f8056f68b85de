use crate::machine::{LogEntry, Phase, PipelineMachine, StageMessage, search_logs};
use crate::stages::PipelineKind;
use registry::{Case, ExtractionRecord};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub status: StageStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedExtraction {
    pub title: &'static str,
    pub record: ExtractionRecord,
}

/// Serializable view of a run, as the case modal renders it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub case_id: String,
    pub kind: PipelineKind,
    pub phase: Phase,
    pub running: bool,
    pub active_stage: Option<&'static str>,
    pub message: Option<StageMessage>,
    pub processed: bool,
    pub stages: Vec<StageView>,
    pub completed_stages: Vec<&'static str>,
    pub logs: Vec<LogEntry>,
    pub email_draft: Option<String>,
    pub extractions: Vec<RevealedExtraction>,
}

impl PipelineSnapshot {
    /// Capture the machine state; `log_search` narrows the returned log.
    pub fn capture(machine: &PipelineMachine, log_search: Option<&str>) -> Self {
        let kind = machine.kind();
        let state = machine.state();
        let phase = machine.phase();

        let active_index = state.active_stage.and_then(|id| kind.position(id));
        let stages = kind
            .stages()
            .iter()
            .enumerate()
            .map(|(idx, stage)| StageView {
                id: stage.id,
                label: stage.label,
                icon: stage.icon,
                status: stage_status(phase, active_index, idx),
            })
            .collect();

        let completed_stages = kind
            .stages()
            .iter()
            .map(|s| s.id)
            .filter(|id| state.completed.contains(id))
            .collect();

        let logs = match log_search {
            Some(query) if !query.is_empty() => search_logs(&state.log, query)
                .into_iter()
                .cloned()
                .collect(),
            _ => state.log.clone(),
        };

        Self {
            case_id: machine.case().id.clone(),
            kind,
            phase,
            running: state.running,
            active_stage: state.active_stage,
            message: state.message.clone(),
            processed: state.processed,
            stages,
            completed_stages,
            logs,
            email_draft: state.email_draft.clone(),
            extractions: revealed_extractions(kind, &state.completed, machine.case()),
        }
    }
}

fn stage_status(phase: Phase, active_index: Option<usize>, idx: usize) -> StageStatus {
    match (phase, active_index) {
        (Phase::Finished, _) => StageStatus::Completed,
        (_, Some(active)) if idx < active => StageStatus::Completed,
        (Phase::Idle, _) => StageStatus::Pending,
        (_, Some(active)) if idx == active => StageStatus::Active,
        _ => StageStatus::Pending,
    }
}

/// Extraction sections unlocked by the stages completed so far.
pub fn revealed_extractions(
    kind: PipelineKind,
    completed: &HashSet<&'static str>,
    case: &Case,
) -> Vec<RevealedExtraction> {
    let mut sections = Vec::new();
    let merged = case.merged_extraction();

    match kind {
        PipelineKind::Fulfillment => {
            if completed.contains("advanced") {
                sections.push(RevealedExtraction {
                    title: "Advanced extraction",
                    record: case.advanced.clone(),
                });
            }
            if completed.contains("reasoning") {
                sections.push(RevealedExtraction {
                    title: "Reasoning extraction",
                    record: case.reasoning.clone(),
                });
            }
            if completed.contains("combination") && !merged.is_empty() {
                sections.push(RevealedExtraction {
                    title: "Combination agent",
                    record: merged,
                });
            }
        }
        PipelineKind::Logistics => {
            if completed.contains("stage12") && !merged.is_empty() {
                sections.push(RevealedExtraction {
                    title: "Extracted Data (Master JSON)",
                    record: merged,
                });
            }
        }
    }

    sections
}
