use crate::machine::PipelineMachine;
use crate::placeholder::PlaceholderGenerator;
use crate::snapshot::PipelineSnapshot;
use crate::timing::PipelineTiming;
use registry::Case;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to the one scheduled transition chain of a run.
///
/// Cancelling (or dropping) the handle aborts the task.
struct PendingTask {
    handle: JoinHandle<()>,
}

impl PendingTask {
    fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for PendingTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Shared {
    /// Bumped on every start and stop; a task only mutates its own run.
    generation: u64,
    machine: Option<PipelineMachine>,
}

/// Runs the pipeline for the currently open case on the tokio clock.
///
/// At most one case is open and at most one transition is pending at any
/// time. Opening another case, re-running, stopping or dropping the driver
/// cancels the pending transition.
pub struct PipelineDriver {
    shared: Arc<Mutex<Shared>>,
    pending: Mutex<Option<PendingTask>>,
    timing: PipelineTiming,
    seed: Option<u64>,
}

impl PipelineDriver {
    pub fn new(timing: PipelineTiming, seed: Option<u64>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                machine: None,
            })),
            pending: Mutex::new(None),
            timing,
            seed,
        }
    }

    /// Open `case` and start a fresh run, replacing whatever was open.
    /// Returns `true` when an unfinished run was cancelled.
    pub fn open(&self, case: Arc<Case>) -> bool {
        let mut pending = lock(&self.pending);
        let cancelled = cancel_pending(&mut pending);

        let (generation, first_delay) = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            let generator = match self.seed {
                Some(seed) => PlaceholderGenerator::with_seed(seed.wrapping_add(shared.generation)),
                None => PlaceholderGenerator::new(),
            };
            let mut machine = PipelineMachine::new(case, self.timing, generator);
            let delay = machine.start();
            info!(case_id = %machine.case().id, kind = ?machine.kind(), generation = shared.generation, "Pipeline opened");
            shared.machine = Some(machine);
            (shared.generation, delay)
        };

        if let Some(delay) = first_delay {
            *pending = Some(PendingTask::spawn(drive(self.shared.clone(), generation, delay)));
        }
        cancelled
    }

    /// Restart the open case from its first stage. `None` when no case is
    /// open, otherwise whether an unfinished run was cancelled.
    pub fn rerun(&self) -> Option<bool> {
        let case = lock(&self.shared).machine.as_ref().map(|m| m.case().clone());
        case.map(|case| self.open(case))
    }

    /// Close the open case. Returns `true` when an unfinished run was
    /// cancelled.
    pub fn close(&self) -> bool {
        let mut pending = lock(&self.pending);
        let cancelled = cancel_pending(&mut pending);

        let mut shared = lock(&self.shared);
        shared.generation += 1;
        if let Some(machine) = shared.machine.take() {
            info!(case_id = %machine.case().id, cancelled, "Pipeline closed");
        }
        cancelled
    }

    pub fn open_case_id(&self) -> Option<String> {
        lock(&self.shared).machine.as_ref().map(|m| m.case().id.clone())
    }

    pub fn snapshot(&self, log_search: Option<&str>) -> Option<PipelineSnapshot> {
        lock(&self.shared)
            .machine
            .as_ref()
            .map(|m| PipelineSnapshot::capture(m, log_search))
    }

    /// Whether a transition is still scheduled.
    pub fn has_pending(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }
}

impl Drop for PipelineDriver {
    fn drop(&mut self) {
        let mut pending = lock(&self.pending);
        cancel_pending(&mut pending);
    }
}

/// Abort the scheduled chain, reporting whether it was still live.
fn cancel_pending(pending: &mut Option<PendingTask>) -> bool {
    match pending.take() {
        Some(task) if !task.handle.is_finished() => {
            debug!("Cancelling pending pipeline transition");
            task.cancel();
            true
        }
        _ => false,
    }
}

async fn drive(shared: Arc<Mutex<Shared>>, generation: u64, mut delay: Duration) {
    loop {
        tokio::time::sleep(delay).await;

        let next = {
            let mut guard = lock(&shared);
            if guard.generation != generation {
                return;
            }
            match guard.machine.as_mut() {
                Some(machine) => machine.step(),
                None => return,
            }
        };

        match next {
            Some(d) => delay = d,
            None => return,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
