use std::fmt;
use std::sync::Arc;

use crate::diagram::Diagram;
use crate::error::Error;
use crate::geometry::Size;

use super::boundary::Boundary;
use super::visual_tree::VisualTree;

/// Stages of one layout pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Preparing,
    PreprocessVisualTree,
    VerticalLayout,
    HorizontalLayout,
    ConnectorsLayout,
    Completed,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Preparing => "preparing",
            Operation::PreprocessVisualTree => "preprocess-visual-tree",
            Operation::VerticalLayout => "vertical-layout",
            Operation::HorizontalLayout => "horizontal-layout",
            Operation::ConnectorsLayout => "connectors-layout",
            Operation::Completed => "completed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an observer wants after handling a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop receiving notifications; the run goes on.
    Unsubscribe,
    /// Drop every observer and stop the run at this checkpoint.
    Cancel,
}

/// Receives notifications from the thread running the layout.
pub trait LayoutObserver: Send {
    fn operation_changed(&mut self, _state: &LayoutState, _operation: Operation) -> Flow {
        Flow::Continue
    }

    fn boundary_changed(&mut self, _state: &LayoutState, _boundary: &Boundary) -> Flow {
        Flow::Continue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub type BoxSizeFn = Box<dyn Fn(&str) -> Option<Size> + Send>;

/// The layout stopped before `Completed`.
#[derive(Debug)]
pub(crate) enum Halt {
    Cancelled,
    Failed(Error),
}

impl From<Error> for Halt {
    fn from(err: Error) -> Self {
        Halt::Failed(err)
    }
}

pub(crate) type Step<T> = std::result::Result<T, Halt>;

/// Mutable state of one layout pass over a [`Diagram`].
pub struct LayoutState {
    pub diagram: Diagram,
    box_size: Option<BoxSizeFn>,
    current_operation: Operation,
    visual_tree: Option<Arc<VisualTree>>,
    observers: Vec<(ObserverId, Box<dyn LayoutObserver>)>,
    next_observer_id: u64,
    cancelled: bool,
}

impl fmt::Debug for LayoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutState")
            .field("diagram", &self.diagram)
            .field("current_operation", &self.current_operation)
            .field("observers", &self.observers.len())
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

impl LayoutState {
    pub fn new(diagram: Diagram) -> Self {
        Self {
            diagram,
            box_size: None,
            current_operation: Operation::Preparing,
            visual_tree: None,
            observers: Vec::new(),
            next_observer_id: 0,
            cancelled: false,
        }
    }

    /// Sizes boxes by data id. Without one, the configured default size is used.
    pub fn set_box_size_fn(&mut self, box_size: BoxSizeFn) {
        self.box_size = Some(box_size);
    }

    pub(crate) fn box_size(&self, data_id: &str) -> Option<Size> {
        match &self.box_size {
            Some(size) => size(data_id),
            None => Some(self.diagram.settings.default_box_size()),
        }
    }

    pub fn current_operation(&self) -> Operation {
        self.current_operation
    }

    /// Available from `VerticalLayout` onwards.
    pub fn visual_tree(&self) -> Option<&VisualTree> {
        self.visual_tree.as_deref()
    }

    /// Shared handle to the visual tree, for holding past this notification.
    pub fn shared_visual_tree(&self) -> Option<Arc<VisualTree>> {
        self.visual_tree.clone()
    }

    pub(crate) fn set_visual_tree(&mut self, tree: Arc<VisualTree>) {
        self.visual_tree = Some(tree);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn into_diagram(self) -> Diagram {
        self.diagram
    }

    pub fn subscribe(&mut self, observer: Box<dyn LayoutObserver>) -> ObserverId {
        self.next_observer_id += 1;
        let id = ObserverId(self.next_observer_id);
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Moves to `operation` and notifies observers.
    pub(crate) fn enter(&mut self, operation: Operation) -> Step<()> {
        debug_assert!(
            operation > self.current_operation || operation == Operation::Preparing,
            "operations must advance: {} -> {operation}",
            self.current_operation
        );
        self.current_operation = operation;
        tracing::debug!(%operation, "layout operation changed");
        self.notify(|observer, state| observer.operation_changed(state, operation))
    }

    pub(crate) fn boundary_changed(&mut self, boundary: &Boundary) -> Step<()> {
        self.notify(|observer, state| observer.boundary_changed(state, boundary))
    }

    fn notify(
        &mut self,
        mut deliver: impl FnMut(&mut dyn LayoutObserver, &LayoutState) -> Flow,
    ) -> Step<()> {
        if self.cancelled {
            return Err(Halt::Cancelled);
        }
        let mut observers = std::mem::take(&mut self.observers);
        let mut cancel = false;
        let state: &LayoutState = self;
        observers.retain_mut(|(_, observer)| {
            if cancel {
                return true;
            }
            match deliver(observer.as_mut(), state) {
                Flow::Continue => true,
                Flow::Unsubscribe => false,
                Flow::Cancel => {
                    cancel = true;
                    false
                }
            }
        });
        if cancel {
            self.cancelled = true;
            tracing::info!(operation = %self.current_operation, "layout cancelled by observer");
            return Err(Halt::Cancelled);
        }
        self.observers = observers;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        seen: Arc<Mutex<Vec<Operation>>>,
        flow: Flow,
    }

    impl LayoutObserver for Recorder {
        fn operation_changed(&mut self, _state: &LayoutState, operation: Operation) -> Flow {
            self.seen.lock().unwrap().push(operation);
            self.flow
        }
    }

    fn recorder(flow: Flow) -> (Arc<Mutex<Vec<Operation>>>, Box<dyn LayoutObserver>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer = Recorder {
            seen: seen.clone(),
            flow,
        };
        (seen, Box::new(observer))
    }

    #[test]
    fn operations_are_ordered() {
        assert!(Operation::Preparing < Operation::VerticalLayout);
        assert!(Operation::HorizontalLayout < Operation::Completed);
    }

    #[test]
    fn unsubscribe_removes_observer() {
        let mut state = LayoutState::new(Diagram::default());
        let (seen, observer) = recorder(Flow::Continue);
        let id = state.subscribe(observer);
        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
        state.enter(Operation::PreprocessVisualTree).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn observer_can_unsubscribe_itself() {
        let mut state = LayoutState::new(Diagram::default());
        let (seen, observer) = recorder(Flow::Unsubscribe);
        state.subscribe(observer);
        state.enter(Operation::PreprocessVisualTree).unwrap();
        state.enter(Operation::VerticalLayout).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Operation::PreprocessVisualTree]);
        assert_eq!(state.observer_count(), 0);
    }

    #[test]
    fn cancel_drops_every_observer() {
        let mut state = LayoutState::new(Diagram::default());
        let (_, cancelling) = recorder(Flow::Cancel);
        let (later, bystander) = recorder(Flow::Continue);
        state.subscribe(cancelling);
        state.subscribe(bystander);
        assert!(matches!(
            state.enter(Operation::PreprocessVisualTree),
            Err(Halt::Cancelled)
        ));
        assert!(state.is_cancelled());
        assert_eq!(state.observer_count(), 0);
        assert!(later.lock().unwrap().is_empty());
        assert!(matches!(
            state.enter(Operation::VerticalLayout),
            Err(Halt::Cancelled)
        ));
    }
}
