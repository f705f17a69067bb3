//! Runs the layout on a background worker and lets an observer step
//! through it one boundary change at a time.
//!
//! ```text
//! caller thread                      worker thread
//! ─────────────                      ─────────────
//! start() ── spawn ────────────────► layout::apply(state)
//!                                      │ operation changed ─► LayoutEvent
//!                                      │ boundary changed  ─► LayoutEvent
//! events() ◄──────── mpsc ─────────────┤
//!                                      │ gate: AckSignal::wait()
//! advance() ── AckSignal::set() ─────► │ (resumes)
//! cancel()  ── AckSignal::release() ─► │ wait fails → run cancelled
//! ```

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::chart_box::BoxId;
use crate::diagram::Diagram;
use crate::error::Error;
use crate::geometry::Rect;
use crate::layout::{
    self, Boundary, BoxSizeFn, Flow, LayoutObserver, LayoutState, Operation, Progress,
    VisualTree,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("acknowledgment signal is no longer valid")]
pub struct SignalReleased;

#[derive(Debug, Default)]
struct SignalState {
    armed: bool,
    released: bool,
}

/// Auto-reset binary signal gating the worker at checkpoints.
///
/// A successful [`wait`](Self::wait) consumes the armed state. Once
/// released, every wait fails, including the ones already blocked.
#[derive(Debug, Default)]
pub struct AckSignal {
    state: Mutex<SignalState>,
    changed: Condvar,
}

impl AckSignal {
    pub fn new(armed: bool) -> Self {
        Self {
            state: Mutex::new(SignalState {
                armed,
                released: false,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wait(&self) -> Result<(), SignalReleased> {
        let mut state = self.lock();
        loop {
            if state.released {
                return Err(SignalReleased);
            }
            if state.armed {
                state.armed = false;
                return Ok(());
            }
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Arms the signal, waking one waiter. No effect once released.
    pub fn set(&self) {
        let mut state = self.lock();
        if !state.released {
            state.armed = true;
            self.changed.notify_one();
        }
    }

    pub fn release(&self) {
        let mut state = self.lock();
        state.released = true;
        self.changed.notify_all();
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }
}

/// Owned notification delivered to the observer side of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    OperationChanged {
        operation: Operation,
        /// Set from `VerticalLayout` onwards.
        visual_tree: Option<Arc<VisualTree>>,
        /// Exteriors of the boxes in `visual_tree`, in tree order.
        exteriors: Vec<(BoxId, Rect)>,
    },
    /// The boundary steps carry the placed branch geometry.
    BoundaryChanged {
        operation: Operation,
        boundary: Boundary,
    },
}

impl LayoutEvent {
    pub fn operation(&self) -> Operation {
        match self {
            LayoutEvent::OperationChanged { operation, .. }
            | LayoutEvent::BoundaryChanged { operation, .. } => *operation,
        }
    }
}

/// Moves notifications off the worker thread.
struct EventForwarder {
    events: Sender<LayoutEvent>,
}

impl LayoutObserver for EventForwarder {
    fn operation_changed(&mut self, state: &LayoutState, operation: Operation) -> Flow {
        let visual_tree = state.shared_visual_tree();
        let exteriors = visual_tree
            .as_deref()
            .map(|tree| {
                tree.pre_order()
                    .into_iter()
                    .map(|idx| {
                        let box_id = tree.node(idx).box_id;
                        let exterior = state
                            .diagram
                            .boxes
                            .get(box_id)
                            .map(|b| b.frame.exterior)
                            .unwrap_or_default();
                        (box_id, exterior)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let event = LayoutEvent::OperationChanged {
            operation,
            visual_tree,
            exteriors,
        };
        match self.events.send(event) {
            Ok(()) => Flow::Continue,
            Err(_) => Flow::Unsubscribe,
        }
    }

    fn boundary_changed(&mut self, state: &LayoutState, boundary: &Boundary) -> Flow {
        let event = LayoutEvent::BoundaryChanged {
            operation: state.current_operation(),
            boundary: boundary.clone(),
        };
        match self.events.send(event) {
            Ok(()) => Flow::Continue,
            Err(_) => Flow::Unsubscribe,
        }
    }
}

/// Blocks the worker on every boundary change inside the gate window.
struct StepGate {
    signal: Arc<AckSignal>,
    after: Operation,
    before: Operation,
}

impl LayoutObserver for StepGate {
    fn boundary_changed(&mut self, state: &LayoutState, _boundary: &Boundary) -> Flow {
        let operation = state.current_operation();
        if operation <= self.after || operation >= self.before {
            return Flow::Continue;
        }
        match self.signal.wait() {
            Ok(()) => Flow::Continue,
            Err(SignalReleased) => {
                tracing::debug!(%operation, "step signal released while waiting");
                Flow::Cancel
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteppingOptions {
    /// Pause the worker at boundary changes until [`SteppingCoordinator::advance`].
    pub interactive: bool,
    /// Boundary changes pause only strictly after this operation...
    pub gate_after: Operation,
    /// ...and strictly before this one.
    pub gate_before: Operation,
}

impl Default for SteppingOptions {
    fn default() -> Self {
        Self {
            interactive: false,
            gate_after: Operation::VerticalLayout,
            gate_before: Operation::Completed,
        }
    }
}

impl SteppingOptions {
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(Diagram),
    /// The step signal was released mid-run; no result is produced.
    Cancelled,
    Failed(Error),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn into_diagram(self) -> Option<Diagram> {
        match self {
            RunOutcome::Completed(diagram) => Some(diagram),
            _ => None,
        }
    }
}

/// One layout pass running on its own worker thread.
#[derive(Debug)]
pub struct LayoutRun {
    id: u64,
    events: Receiver<LayoutEvent>,
    worker: JoinHandle<RunOutcome>,
}

impl LayoutRun {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Notifications in the order the worker produced them. The channel
    /// closes once the worker stops notifying.
    pub fn events(&self) -> &Receiver<LayoutEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Blocks until the worker exits.
    pub fn wait(self) -> RunOutcome {
        let LayoutRun { id, events, worker } = self;
        drop(events);
        worker.join().unwrap_or_else(|_| {
            tracing::warn!(run = id, "layout worker panicked");
            RunOutcome::Failed(Error::WorkerPanicked)
        })
    }
}

/// Cloneable handle to the current run's step signal, usable from any thread.
#[derive(Debug, Clone)]
pub struct StepHandle {
    signal: Arc<AckSignal>,
}

impl StepHandle {
    pub fn advance(&self) {
        self.signal.set();
    }

    pub fn cancel(&self) {
        self.signal.release();
    }
}

/// Starts layout runs and steps through them. A new run supersedes the
/// previous one.
#[derive(Debug, Default)]
pub struct SteppingCoordinator {
    options: SteppingOptions,
    signal: Option<Arc<AckSignal>>,
    runs: u64,
}

impl SteppingCoordinator {
    pub fn new(options: SteppingOptions) -> Self {
        Self {
            options,
            signal: None,
            runs: 0,
        }
    }

    pub fn options(&self) -> SteppingOptions {
        self.options
    }

    pub fn set_options(&mut self, options: SteppingOptions) {
        self.options = options;
    }

    /// Lays out `diagram` on a fresh worker thread.
    ///
    /// Any run still in progress is cancelled first.
    pub fn start(
        &mut self,
        diagram: Diagram,
        box_size: Option<BoxSizeFn>,
    ) -> crate::Result<LayoutRun> {
        self.start_with_observers(diagram, box_size, Vec::new())
    }

    /// Like [`start`](Self::start), with `observers` subscribed on the
    /// worker. They see the live [`LayoutState`] at every notification and
    /// are notified before the step gate pauses.
    pub fn start_with_observers(
        &mut self,
        diagram: Diagram,
        box_size: Option<BoxSizeFn>,
        observers: Vec<Box<dyn LayoutObserver>>,
    ) -> crate::Result<LayoutRun> {
        self.cancel();
        let signal = Arc::new(AckSignal::new(true));
        self.signal = Some(signal.clone());
        self.runs += 1;
        let id = self.runs;

        let (tx, rx) = mpsc::channel();
        let mut state = LayoutState::new(diagram);
        if let Some(box_size) = box_size {
            state.set_box_size_fn(box_size);
        }
        state.subscribe(Box::new(EventForwarder { events: tx }));
        for observer in observers {
            state.subscribe(observer);
        }
        if self.options.interactive {
            state.subscribe(Box::new(StepGate {
                signal: signal.clone(),
                after: self.options.gate_after,
                before: self.options.gate_before,
            }));
        }

        tracing::info!(run = id, interactive = self.options.interactive, "starting layout run");
        let worker = thread::Builder::new()
            .name(format!("orgchart-layout-{id}"))
            .spawn(move || run_worker(id, state, signal))
            .map_err(|err| Error::WorkerSpawn(err.to_string()))?;

        Ok(LayoutRun {
            id,
            events: rx,
            worker,
        })
    }

    /// Lets the worker continue past its current (or next) pause.
    pub fn advance(&self) {
        if let Some(signal) = &self.signal {
            signal.set();
        }
    }

    /// Releases the step signal, cancelling a paused interactive run.
    pub fn cancel(&mut self) {
        if let Some(signal) = self.signal.take() {
            signal.release();
        }
    }

    pub fn step_handle(&self) -> Option<StepHandle> {
        self.signal.clone().map(|signal| StepHandle { signal })
    }
}

impl Drop for SteppingCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_worker(id: u64, mut state: LayoutState, signal: Arc<AckSignal>) -> RunOutcome {
    let outcome = match layout::apply(&mut state) {
        Ok(Progress::Completed) => {
            tracing::info!(run = id, "layout run completed");
            RunOutcome::Completed(state.into_diagram())
        }
        Ok(Progress::Cancelled) => {
            tracing::info!(run = id, "layout run cancelled");
            RunOutcome::Cancelled
        }
        Err(err) => {
            tracing::warn!(run = id, error = %err, "layout run failed");
            RunOutcome::Failed(err)
        }
    };
    signal.release();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pre_armed_signal_passes_once() {
        let signal = AckSignal::new(true);
        assert_eq!(signal.wait(), Ok(()));
        signal.set();
        signal.set();
        assert_eq!(signal.wait(), Ok(()));
        signal.release();
        assert_eq!(signal.wait(), Err(SignalReleased));
    }

    #[test]
    fn release_wakes_blocked_waiter() {
        let signal = Arc::new(AckSignal::new(false));
        let waiter = {
            let signal = signal.clone();
            thread::spawn(move || signal.wait())
        };
        thread::sleep(Duration::from_millis(20));
        signal.release();
        assert_eq!(waiter.join().unwrap(), Err(SignalReleased));
    }

    #[test]
    fn set_wakes_blocked_waiter() {
        let signal = Arc::new(AckSignal::new(false));
        let waiter = {
            let signal = signal.clone();
            thread::spawn(move || signal.wait())
        };
        thread::sleep(Duration::from_millis(20));
        signal.set();
        assert_eq!(waiter.join().unwrap(), Ok(()));
    }

    #[test]
    fn set_after_release_is_ignored() {
        let signal = AckSignal::new(false);
        signal.release();
        signal.set();
        assert!(signal.is_released());
        assert_eq!(signal.wait(), Err(SignalReleased));
    }

    #[test]
    fn gate_window_is_exclusive() {
        let options = SteppingOptions::default();
        assert!(options.gate_after < Operation::HorizontalLayout);
        assert!(Operation::ConnectorsLayout < options.gate_before);
    }
}
