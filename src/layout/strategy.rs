use serde::{Deserialize, Serialize};

use crate::chart_box::ChartBox;
use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::geometry::{Edge, Point, Rect};

/// Where a parent sits relative to the row of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchParentAlignment {
    Left,
    #[default]
    Center,
    Right,
}

/// How the children of one box are arranged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayoutStrategy {
    /// Children in a single row below the parent.
    #[serde(rename_all = "camelCase")]
    Linear {
        #[serde(default)]
        parent_alignment: BranchParentAlignment,
    },
    /// Children in a column hanging off a vertical spine, `indent` to the
    /// right of the parent's left edge.
    Stack {
        #[serde(default = "default_indent")]
        indent: f32,
    },
}

fn default_indent() -> f32 {
    20.0
}

impl LayoutStrategy {
    pub fn linear() -> Self {
        LayoutStrategy::Linear {
            parent_alignment: BranchParentAlignment::Center,
        }
    }

    pub fn stack() -> Self {
        LayoutStrategy::Stack {
            indent: default_indent(),
        }
    }

    /// Top of the first child; `bottom` is the parent's bottom edge.
    pub(crate) fn first_child_top(&self, bottom: f32, config: &LayoutConfig) -> f32 {
        bottom + config.parent_child_spacing
    }

    /// Top of the sibling following a branch that ends at `branch_bottom`.
    /// `None` keeps siblings on the same row.
    pub(crate) fn next_sibling_top(
        &self,
        branch_bottom: f32,
        config: &LayoutConfig,
    ) -> Option<f32> {
        match self {
            LayoutStrategy::Linear { .. } => None,
            LayoutStrategy::Stack { .. } => Some(branch_bottom + config.stack_spacing),
        }
    }

    /// Connector segments from `parent` to its visible `children`.
    pub(crate) fn connector(
        &self,
        parent: &Rect,
        children: &[Rect],
        config: &LayoutConfig,
    ) -> Vec<Edge> {
        let (Some(first), Some(last)) = (children.first(), children.last()) else {
            return Vec::new();
        };
        match self {
            LayoutStrategy::Linear { .. } => {
                let bus_y = parent.bottom() + config.parent_child_spacing / 2.0;
                let mut segments = vec![Edge::new(
                    Point::new(parent.center_x(), parent.bottom()),
                    Point::new(parent.center_x(), bus_y),
                )];
                let bus_left = first.center_x().min(parent.center_x());
                let bus_right = last.center_x().max(parent.center_x());
                if bus_right > bus_left {
                    segments.push(Edge::new(
                        Point::new(bus_left, bus_y),
                        Point::new(bus_right, bus_y),
                    ));
                }
                for child in children {
                    segments.push(Edge::new(
                        Point::new(child.center_x(), bus_y),
                        Point::new(child.center_x(), child.top),
                    ));
                }
                segments
            }
            LayoutStrategy::Stack { indent } => {
                let spine_x = parent.left + indent / 2.0;
                let mut segments = vec![Edge::new(
                    Point::new(spine_x, parent.bottom()),
                    Point::new(spine_x, last.center_y()),
                )];
                for child in children {
                    segments.push(Edge::new(
                        Point::new(spine_x, child.center_y()),
                        Point::new(child.left, child.center_y()),
                    ));
                }
                segments
            }
        }
    }
}

/// The strategy laying out the children of `chart_box`.
pub fn strategy_for<'a>(
    config: &'a LayoutConfig,
    chart_box: &ChartBox,
) -> Result<&'a LayoutStrategy> {
    let id = chart_box
        .layout_strategy_id
        .as_deref()
        .unwrap_or(&config.default_strategy_id);
    config
        .strategies
        .get(id)
        .ok_or_else(|| Error::UnknownStrategy(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_table_deserializes() {
        let parsed: LayoutStrategy =
            serde_json::from_str(r#"{"kind":"linear","parentAlignment":"left"}"#).unwrap();
        assert_eq!(
            parsed,
            LayoutStrategy::Linear {
                parent_alignment: BranchParentAlignment::Left
            }
        );
        let parsed: LayoutStrategy = serde_json::from_str(r#"{"kind":"stack"}"#).unwrap();
        assert_eq!(parsed, LayoutStrategy::stack());
    }

    #[test]
    fn linear_connector_reaches_every_child() {
        let config = LayoutConfig::default();
        let parent = Rect::new(40.0, 0.0, 20.0, 10.0);
        let children = [
            Rect::new(0.0, 30.0, 20.0, 10.0),
            Rect::new(80.0, 30.0, 20.0, 10.0),
        ];
        let segments = LayoutStrategy::linear().connector(&parent, &children, &config);
        assert_eq!(segments.len(), 4);
        for child in &children {
            assert!(
                segments
                    .iter()
                    .any(|s| s.to == Point::new(child.center_x(), child.top))
            );
        }
    }

    #[test]
    fn stack_connector_hangs_off_spine() {
        let config = LayoutConfig::default();
        let parent = Rect::new(0.0, 0.0, 40.0, 10.0);
        let children = [
            Rect::new(20.0, 30.0, 20.0, 10.0),
            Rect::new(20.0, 50.0, 20.0, 10.0),
        ];
        let segments = LayoutStrategy::stack().connector(&parent, &children, &config);
        assert_eq!(segments[0].from, Point::new(10.0, 10.0));
        assert_eq!(segments[0].to, Point::new(10.0, 55.0));
        assert_eq!(segments[2].to, Point::new(20.0, 55.0));
    }

    #[test]
    fn unknown_strategy_id_is_reported() {
        let config = LayoutConfig::default();
        let mut chart_box = ChartBox::special(crate::chart_box::BoxId(1));
        chart_box.layout_strategy_id = Some("spiral".to_string());
        assert_eq!(
            strategy_for(&config, &chart_box).unwrap_err(),
            Error::UnknownStrategy("spiral".to_string())
        );
    }
}
