use std::fmt;

use crate::geometry::{Edge, Rect};

/// Container-scoped box identifier. Dense, starting at 1 for each generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxId(pub u32);

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Line segments linking a box to its visible children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connector {
    pub segments: Vec<Edge>,
}

/// Geometry written by the layout algorithm.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxFrame {
    /// The box itself.
    pub exterior: Rect,
    /// The box together with every visible descendant.
    pub branch_exterior: Rect,
    pub connector: Option<Connector>,
}

/// One positionable node of the chart.
///
/// Only [`BoxContainer`](crate::container::BoxContainer) creates boxes, so
/// `id` and `visual_parent_id` always refer to the same container.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBox {
    pub id: BoxId,
    pub data_id: Option<String>,
    pub visual_parent_id: Option<BoxId>,
    pub is_special: bool,
    pub is_collapsed: bool,
    pub affects_layout: bool,
    pub layout_strategy_id: Option<String>,
    pub frame: BoxFrame,
}

impl ChartBox {
    pub(crate) fn new(id: BoxId, data_id: Option<String>, visual_parent_id: BoxId) -> Self {
        Self {
            id,
            data_id,
            visual_parent_id: Some(visual_parent_id),
            is_special: false,
            is_collapsed: false,
            affects_layout: true,
            layout_strategy_id: None,
            frame: BoxFrame::default(),
        }
    }

    /// The synthetic root guaranteeing a single-root hierarchy.
    pub(crate) fn special(id: BoxId) -> Self {
        Self {
            id,
            data_id: None,
            visual_parent_id: None,
            is_special: true,
            is_collapsed: false,
            affects_layout: true,
            layout_strategy_id: None,
            frame: BoxFrame::default(),
        }
    }

    pub fn is_data_bound(&self) -> bool {
        self.data_id.is_some()
    }
}
