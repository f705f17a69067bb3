mod boundary;
mod state;
mod strategy;
mod visual_tree;
pub use boundary::*;
pub use state::{BoxSizeFn, Flow, LayoutObserver, LayoutState, ObserverId, Operation};
pub use strategy::*;
pub use visual_tree::*;

use state::{Halt, Step};

use crate::chart_box::{BoxFrame, BoxId, Connector};
use crate::container::BoxContainer;
use crate::diagram::Diagram;
use crate::error::{Error, Result};
use crate::geometry::{Rect, Size};
use std::sync::Arc;

/// How a call to [`apply`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Completed,
    /// An observer cancelled the run; geometry is left half-computed.
    Cancelled,
}

/// Runs every layout operation over `state.diagram`, notifying observers
/// along the way.
pub fn apply(state: &mut LayoutState) -> Result<Progress> {
    match run_operations(state) {
        Ok(()) => Ok(Progress::Completed),
        Err(Halt::Cancelled) => Ok(Progress::Cancelled),
        Err(Halt::Failed(err)) => Err(err),
    }
}

fn run_operations(state: &mut LayoutState) -> Step<()> {
    state.enter(Operation::Preparing)?;

    state.enter(Operation::PreprocessVisualTree)?;
    let tree = Arc::new(VisualTree::build(&state.diagram.boxes)?);
    state.set_visual_tree(tree.clone());

    state.enter(Operation::VerticalLayout)?;
    vertical_layout(state, &tree)?;

    state.enter(Operation::HorizontalLayout)?;
    horizontal_layout(state, &tree)?;

    state.enter(Operation::ConnectorsLayout)?;
    connectors_layout(state, &tree)?;

    state.enter(Operation::Completed)
}

/// Clears every frame so the next layout starts from scratch.
pub fn reset_box_positions(diagram: &mut Diagram) {
    for chart_box in diagram.boxes.iter_mut() {
        chart_box.frame = BoxFrame::default();
    }
}

/// Bounding rectangle of every visible, layout-affecting box in `tree`.
pub fn compute_branch_visual_bounding_rect(tree: &VisualTree, boxes: &BoxContainer) -> Rect {
    let mut bounds: Option<Rect> = None;
    tree.iterate_child_first(|node| {
        if let Some(chart_box) = boxes.get(node.box_id)
            && !chart_box.is_special
            && chart_box.affects_layout
        {
            let exterior = chart_box.frame.exterior;
            bounds = Some(bounds.map_or(exterior, |b| b.union(&exterior)));
        }
        true
    });
    bounds.unwrap_or_default()
}

fn box_size(state: &LayoutState, box_id: BoxId) -> Result<Size> {
    let chart_box = state.diagram.boxes.get(box_id).ok_or(Error::UnknownBox(box_id))?;
    if chart_box.is_special || !chart_box.affects_layout {
        return Ok(Size::default());
    }
    match chart_box.data_id.as_deref() {
        Some(data_id) => state.box_size(data_id).ok_or_else(|| Error::MissingBoxSize {
            data_id: data_id.to_string(),
        }),
        None => Ok(state.diagram.settings.default_box_size()),
    }
}

fn strategy_of(diagram: &Diagram, box_id: BoxId) -> Result<LayoutStrategy> {
    let chart_box = diagram.boxes.get(box_id).ok_or(Error::UnknownBox(box_id))?;
    strategy_for(&diagram.settings, chart_box).cloned()
}

fn exterior(boxes: &BoxContainer, box_id: BoxId) -> Rect {
    boxes
        .get(box_id)
        .map(|b| b.frame.exterior)
        .unwrap_or_default()
}

fn set_exterior(boxes: &mut BoxContainer, box_id: BoxId, rect: Rect) {
    if let Some(chart_box) = boxes.get_mut(box_id) {
        chart_box.frame.exterior = rect;
    }
}

/// Sizes every visible box and assigns top coordinates; lefts start at zero.
///
/// Walks the tree with an explicit stack so chain depth is bounded only by
/// memory.
fn vertical_layout(state: &mut LayoutState, tree: &VisualTree) -> Step<()> {
    let mut sizes = Vec::with_capacity(tree.len());
    for idx in 0..tree.len() {
        sizes.push(box_size(state, tree.node(idx).box_id)?);
    }

    let mut open: Vec<OpenBranch> = Vec::new();
    let mut pending = Some((0usize, 0.0f32));
    // bottom of the branch that was just closed
    let mut closed: Option<f32> = None;
    loop {
        if let Some((idx, top)) = pending.take() {
            let node = tree.node(idx);
            let rect = Rect::new(0.0, top, sizes[idx].width, sizes[idx].height);
            set_exterior(&mut state.diagram.boxes, node.box_id, rect);
            if node.children.is_empty() {
                closed = Some(rect.bottom());
            } else {
                let strategy = strategy_of(&state.diagram, node.box_id)?;
                open.push(OpenBranch {
                    idx,
                    next_child: 0,
                    child_top: strategy.first_child_top(rect.bottom(), &state.diagram.settings),
                    bottom: rect.bottom(),
                    strategy,
                });
            }
        }

        let Some(branch) = open.last_mut() else {
            break;
        };
        if let Some(child_bottom) = closed.take() {
            branch.bottom = branch.bottom.max(child_bottom);
            if let Some(next) = branch
                .strategy
                .next_sibling_top(child_bottom, &state.diagram.settings)
            {
                branch.child_top = next;
            }
        }
        let children = &tree.node(branch.idx).children;
        if let Some(&child) = children.get(branch.next_child) {
            branch.next_child += 1;
            pending = Some((child, branch.child_top));
        } else {
            closed = Some(branch.bottom);
            open.pop();
        }
    }

    tracing::debug!(
        boxes = tree.len(),
        bottom = closed.unwrap_or_default(),
        "vertical layout done"
    );
    Ok(())
}

/// A branch whose children are still being placed.
struct OpenBranch {
    idx: usize,
    next_child: usize,
    child_top: f32,
    bottom: f32,
    strategy: LayoutStrategy,
}

fn shift_branch(boxes: &mut BoxContainer, tree: &VisualTree, idx: usize, dx: f32) {
    if dx == 0.0 {
        return;
    }
    for member in tree.branch(idx) {
        if let Some(chart_box) = boxes.get_mut(tree.node(member).box_id) {
            chart_box.frame.exterior.translate(dx, 0.0);
        }
    }
}

/// Places sibling branches bottom-up so that none of them overlap.
///
/// Fires a boundary notification each time a child branch joins its parent.
fn horizontal_layout(state: &mut LayoutState, tree: &VisualTree) -> Step<()> {
    let mut branches: Vec<Boundary> = vec![Boundary::new(); tree.len()];
    for idx in tree.post_order() {
        let node = tree.node(idx);
        let strategy = strategy_of(&state.diagram, node.box_id)?;
        let spacing = state.diagram.settings.sibling_spacing;
        let mut parent = exterior(&state.diagram.boxes, node.box_id);
        let mut merged = Boundary::new();

        for &child in &node.children {
            let mut branch = std::mem::take(&mut branches[child]);
            let shift = match &strategy {
                LayoutStrategy::Linear { .. } => merged.required_shift(&branch, spacing),
                LayoutStrategy::Stack { indent } => {
                    let child_left = branch
                        .bounding_rect()
                        .map_or_else(
                            || exterior(&state.diagram.boxes, tree.node(child).box_id).left,
                            |r| r.left,
                        );
                    Some(parent.left + indent - child_left)
                }
            };
            if let Some(shift) = shift {
                shift_branch(&mut state.diagram.boxes, tree, child, shift);
                branch.translate(shift);
            }
            if merged.is_empty() {
                merged = branch;
            } else {
                merged.merge(&branch);
            }
            state.boundary_changed(&merged)?;
        }

        if let LayoutStrategy::Linear { parent_alignment } = strategy
            && let (Some(&first), Some(&last)) = (node.children.first(), node.children.last())
        {
            let first = exterior(&state.diagram.boxes, tree.node(first).box_id);
            let last = exterior(&state.diagram.boxes, tree.node(last).box_id);
            parent.left = match parent_alignment {
                BranchParentAlignment::Left => first.left,
                BranchParentAlignment::Center => {
                    (first.center_x() + last.center_x()) / 2.0 - parent.width / 2.0
                }
                BranchParentAlignment::Right => last.right() - parent.width,
            };
            set_exterior(&mut state.diagram.boxes, node.box_id, parent);
        }

        merged.add_rect(node.box_id, &parent);
        branches[idx] = merged;
    }
    Ok(())
}

/// Routes connectors and computes branch exteriors.
fn connectors_layout(state: &mut LayoutState, tree: &VisualTree) -> Step<()> {
    for idx in tree.post_order() {
        let node = tree.node(idx);
        let own = exterior(&state.diagram.boxes, node.box_id);
        let (is_special, affects_layout) = state
            .diagram
            .boxes
            .get(node.box_id)
            .map(|b| (b.is_special, b.affects_layout))
            .ok_or(Error::UnknownBox(node.box_id))?;

        let mut branch_exterior: Option<Rect> = (!is_special && affects_layout).then_some(own);
        let mut child_rects = Vec::with_capacity(node.children.len());
        for &child in &node.children {
            let child_box = state
                .diagram
                .boxes
                .get(tree.node(child).box_id)
                .ok_or(Error::UnknownBox(tree.node(child).box_id))?;
            if child_box.affects_layout {
                child_rects.push(child_box.frame.exterior);
            }
            let child_branch = child_box.frame.branch_exterior;
            if child_branch.width > 0.0 || child_branch.height > 0.0 {
                branch_exterior =
                    Some(branch_exterior.map_or(child_branch, |b| b.union(&child_branch)));
            }
        }

        let connector = if is_special || !affects_layout || child_rects.is_empty() {
            None
        } else {
            let strategy = strategy_of(&state.diagram, node.box_id)?;
            Some(Connector {
                segments: strategy.connector(&own, &child_rects, &state.diagram.settings),
            })
        };

        if let Some(chart_box) = state.diagram.boxes.get_mut(node.box_id) {
            chart_box.frame.branch_exterior = branch_exterior.unwrap_or(own);
            chart_box.frame.connector = connector;
        }
    }
    Ok(())
}
