use crate::email::draft_email;
use crate::placeholder::PlaceholderGenerator;
use crate::stages::{COMMUNICATION_STAGE, PipelineKind, StageDescriptor};
use crate::timing::PipelineTiming;
use chrono::{DateTime, Utc};
use registry::Case;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const PROCESSED_MESSAGE: &str = "Stage processed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "camelCase")]
pub enum Phase {
    Idle,
    StageRunning(usize),
    StageCompletionShown(usize),
    StageProcessed(usize),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub stage: String,
    pub message: String,
    pub kind: LogKind,
}

/// The transient status line under the active stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "camelCase")]
pub enum StageMessage {
    InProgress(String),
    Completed(String),
}

/// Everything a run shows. Rebuilt from scratch on every (re-)run.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub active_stage: Option<&'static str>,
    pub message: Option<StageMessage>,
    pub processed: bool,
    pub completed: HashSet<&'static str>,
    pub log: Vec<LogEntry>,
    pub email_draft: Option<String>,
    pub running: bool,
}

/// Timer-free stage sequencer.
///
/// `start` and `step` each perform one transition and return the delay
/// before the next one, or `None` once the run has finished. The caller owns
/// the waiting.
pub struct PipelineMachine {
    case: Arc<Case>,
    kind: PipelineKind,
    timing: PipelineTiming,
    generator: PlaceholderGenerator,
    phase: Phase,
    state: RunState,
}

impl PipelineMachine {
    pub fn new(case: Arc<Case>, timing: PipelineTiming, generator: PlaceholderGenerator) -> Self {
        let kind = PipelineKind::for_category(case.category);
        Self {
            case,
            kind,
            timing,
            generator,
            phase: Phase::Idle,
            state: RunState::default(),
        }
    }

    pub fn case(&self) -> &Arc<Case> {
        &self.case
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Discard any previous progress and enter the first stage.
    pub fn start(&mut self) -> Option<Duration> {
        self.state = RunState {
            running: true,
            ..RunState::default()
        };
        debug!(case_id = %self.case.id, kind = ?self.kind, "Pipeline run started");
        self.enter_stage(0)
    }

    /// Perform the transition that follows the current phase.
    pub fn step(&mut self) -> Option<Duration> {
        match self.phase {
            Phase::Idle | Phase::Finished => None,
            Phase::StageRunning(i) => {
                let stage = self.stage(i);
                let text = stage.completion.render(&mut self.generator);
                self.state.message = Some(StageMessage::Completed(text.clone()));
                self.log(stage, text, LogKind::Info);
                self.phase = Phase::StageCompletionShown(i);
                Some(self.timing.completion.sample(&mut self.generator))
            }
            Phase::StageCompletionShown(i) => {
                let stage = self.stage(i);
                self.state.message = None;
                self.state.processed = true;
                self.state.completed.insert(stage.id);
                self.log(stage, PROCESSED_MESSAGE.to_string(), LogKind::Success);
                self.phase = Phase::StageProcessed(i);
                Some(self.timing.processed.sample(&mut self.generator))
            }
            Phase::StageProcessed(i) => {
                let stage = self.stage(i);
                self.state.processed = false;
                if stage.id == COMMUNICATION_STAGE {
                    self.state.email_draft = Some(draft_email(self.kind, &self.case));
                }
                self.enter_stage(i + 1)
            }
        }
    }

    fn enter_stage(&mut self, index: usize) -> Option<Duration> {
        let Some(stage) = self.kind.stages().get(index) else {
            self.phase = Phase::Finished;
            self.state.running = false;
            debug!(case_id = %self.case.id, "Pipeline run finished");
            return None;
        };

        debug!(case_id = %self.case.id, stage = stage.id, "Entering stage");
        self.state.active_stage = Some(stage.id);
        self.state.message = Some(StageMessage::InProgress(stage.running.to_string()));
        self.state.processed = false;
        self.log(stage, stage.running.to_string(), LogKind::Info);
        self.phase = Phase::StageRunning(index);
        Some(self.timing.running.sample(&mut self.generator))
    }

    fn stage(&self, index: usize) -> &'static StageDescriptor {
        &self.kind.stages()[index]
    }

    fn log(&mut self, stage: &StageDescriptor, message: String, kind: LogKind) {
        self.state.log.push(LogEntry {
            timestamp: Utc::now(),
            stage: stage.label.to_string(),
            message,
            kind,
        });
    }
}

/// Log entries whose message or stage label contains `query`,
/// case-insensitively.
pub fn search_logs<'a>(log: &'a [LogEntry], query: &str) -> Vec<&'a LogEntry> {
    let needle = query.to_lowercase();
    log.iter()
        .filter(|entry| {
            entry.message.to_lowercase().contains(&needle)
                || entry.stage.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry::builtin_definitions;

    fn machine_for(index: usize, seed: u64) -> PipelineMachine {
        let case = Arc::new(builtin_definitions()[index].clone());
        PipelineMachine::new(
            case,
            PipelineTiming::default(),
            PlaceholderGenerator::with_seed(seed),
        )
    }

    fn run_to_end(machine: &mut PipelineMachine) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut next = machine.start();
        while let Some(delay) = next {
            delays.push(delay);
            next = machine.step();
        }
        delays
    }

    fn processed_stages(machine: &PipelineMachine) -> Vec<String> {
        machine
            .state()
            .log
            .iter()
            .filter(|e| e.kind == LogKind::Success)
            .map(|e| e.stage.clone())
            .collect()
    }

    #[test]
    fn test_fulfillment_visits_six_stages_in_order() {
        let mut machine = machine_for(0, 1);
        let delays = run_to_end(&mut machine);

        let expected: Vec<String> = PipelineKind::Fulfillment
            .stages()
            .iter()
            .map(|s| s.label.to_string())
            .collect();
        assert_eq!(processed_stages(&machine), expected);
        assert_eq!(expected.last().unwrap(), "Communication Agent");
        assert_eq!(machine.state().completed.len(), 6);
        assert_eq!(delays.len(), 6 * 3);
        assert_eq!(machine.state().log.len(), 6 * 3);
        assert!(machine.is_finished());
        assert!(!machine.state().running);
    }

    #[test]
    fn test_logistics_visits_fourteen_stages() {
        let mut machine = machine_for(2, 1);
        run_to_end(&mut machine);

        assert_eq!(machine.kind(), PipelineKind::Logistics);
        assert_eq!(processed_stages(&machine).len(), 14);
        assert_eq!(machine.state().completed.len(), 14);
        assert!(machine.state().completed.contains("stage12"));
        assert!(machine.state().completed.contains(COMMUNICATION_STAGE));
    }

    #[test]
    fn test_pricing_uses_fulfillment_pipeline() {
        let machine = machine_for(3, 1);
        assert_eq!(machine.kind(), PipelineKind::Fulfillment);
    }

    #[test]
    fn test_phase_sequence_for_first_stage() {
        let mut machine = machine_for(0, 5);
        assert_eq!(machine.phase(), Phase::Idle);
        assert_eq!(machine.step(), None);

        let first = machine.start().unwrap();
        assert!(first >= Duration::from_millis(3000) && first < Duration::from_millis(5000));
        assert_eq!(machine.phase(), Phase::StageRunning(0));
        assert_eq!(machine.state().active_stage, Some("start"));
        assert_eq!(
            machine.state().message,
            Some(StageMessage::InProgress("Initializing agentic pipeline...".to_string()))
        );

        let second = machine.step().unwrap();
        assert!(second >= Duration::from_millis(2000) && second < Duration::from_millis(3000));
        assert_eq!(machine.phase(), Phase::StageCompletionShown(0));
        assert!(matches!(machine.state().message, Some(StageMessage::Completed(_))));
        assert!(machine.state().completed.is_empty());

        let third = machine.step().unwrap();
        assert!(third >= Duration::from_millis(1000) && third < Duration::from_millis(2000));
        assert_eq!(machine.phase(), Phase::StageProcessed(0));
        assert!(machine.state().processed);
        assert_eq!(machine.state().message, None);
        assert!(machine.state().completed.contains("start"));

        machine.step().unwrap();
        assert_eq!(machine.phase(), Phase::StageRunning(1));
        assert_eq!(machine.state().active_stage, Some("advanced"));
        assert!(!machine.state().processed);
    }

    #[test]
    fn test_email_only_after_communication_stage() {
        let mut machine = machine_for(0, 2);
        let mut next = machine.start();
        while next.is_some() && machine.phase() != Phase::StageProcessed(5) {
            assert!(machine.state().email_draft.is_none());
            next = machine.step();
        }
        assert!(machine.state().email_draft.is_none());

        assert_eq!(machine.step(), None);
        let draft = machine.state().email_draft.as_deref().unwrap();
        assert!(draft.contains("ATP-45009856-10"));
        assert!(draft.contains("ATP Pending"));
    }

    #[test]
    fn test_restart_clears_progress() {
        let mut machine = machine_for(2, 3);
        machine.start();
        for _ in 0..10 {
            machine.step();
        }
        assert!(!machine.state().completed.is_empty());

        machine.start();
        assert_eq!(machine.phase(), Phase::StageRunning(0));
        assert!(machine.state().completed.is_empty());
        assert_eq!(machine.state().log.len(), 1);
        assert!(machine.state().email_draft.is_none());
        assert!(machine.state().running);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = machine_for(2, 42);
        let mut b = machine_for(2, 42);
        assert_eq!(run_to_end(&mut a), run_to_end(&mut b));

        let messages = |m: &PipelineMachine| -> Vec<String> {
            m.state().log.iter().map(|e| e.message.clone()).collect()
        };
        assert_eq!(messages(&a), messages(&b));
    }

    #[test]
    fn test_finished_machine_stays_finished() {
        let mut machine = machine_for(0, 1);
        run_to_end(&mut machine);
        let log_len = machine.state().log.len();

        assert_eq!(machine.step(), None);
        assert_eq!(machine.state().log.len(), log_len);
    }

    #[test]
    fn test_search_logs() {
        let mut machine = machine_for(0, 1);
        run_to_end(&mut machine);
        let log = &machine.state().log;

        assert_eq!(search_logs(log, "").len(), log.len());
        assert_eq!(search_logs(log, "STAGE PROCESSED").len(), 6);
        assert_eq!(search_logs(log, "query supply").len(), 3);
        assert!(search_logs(log, "no such entry").is_empty());
    }
}
