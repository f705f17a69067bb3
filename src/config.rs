use crate::geometry::Size;
use crate::layout::{BranchParentAlignment, LayoutStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const LINEAR_STRATEGY_ID: &str = "linear";
pub const STACK_STRATEGY_ID: &str = "stack";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Vertical gap between a parent and its first row of children.
    pub parent_child_spacing: f32,
    /// Horizontal gap between sibling branches in a row.
    pub sibling_spacing: f32,
    /// Vertical gap between stacked sibling branches.
    pub stack_spacing: f32,
    pub box_width: f32,
    pub box_height: f32,
    pub strategies: BTreeMap<String, LayoutStrategy>,
    pub default_strategy_id: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let mut strategies = BTreeMap::new();
        strategies.insert(LINEAR_STRATEGY_ID.to_string(), LayoutStrategy::linear());
        strategies.insert(STACK_STRATEGY_ID.to_string(), LayoutStrategy::stack());
        Self {
            parent_child_spacing: 20.0,
            sibling_spacing: 10.0,
            stack_spacing: 10.0,
            box_width: 80.0,
            box_height: 50.0,
            strategies,
            default_strategy_id: LINEAR_STRATEGY_ID.to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn default_box_size(&self) -> Size {
        Size::new(self.box_width, self.box_height)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    parent_child_spacing: Option<f32>,
    sibling_spacing: Option<f32>,
    stack_spacing: Option<f32>,
    box_width: Option<f32>,
    box_height: Option<f32>,
    parent_alignment: Option<BranchParentAlignment>,
    strategies: Option<BTreeMap<String, LayoutStrategy>>,
    default_strategy_id: Option<String>,
}

/// Loads a layout config, overlaying the file's values on the defaults.
///
/// Accepts strict JSON first and falls back to JSON5.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let mut config = LayoutConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed = parse_config_file(&contents)?;

    if let Some(v) = parsed.parent_child_spacing {
        config.parent_child_spacing = v;
    }
    if let Some(v) = parsed.sibling_spacing {
        config.sibling_spacing = v;
    }
    if let Some(v) = parsed.stack_spacing {
        config.stack_spacing = v;
    }
    if let Some(v) = parsed.box_width {
        config.box_width = v;
    }
    if let Some(v) = parsed.box_height {
        config.box_height = v;
    }
    if let Some(alignment) = parsed.parent_alignment {
        config.strategies.insert(
            LINEAR_STRATEGY_ID.to_string(),
            LayoutStrategy::Linear {
                parent_alignment: alignment,
            },
        );
    }
    if let Some(strategies) = parsed.strategies {
        config.strategies.extend(strategies);
    }
    if let Some(id) = parsed.default_strategy_id {
        config.default_strategy_id = id;
    }

    if !config.strategies.contains_key(&config.default_strategy_id) {
        return Err(anyhow::anyhow!(
            "default strategy {:?} is not defined",
            config.default_strategy_id
        ));
    }
    tracing::debug!(path = %path.display(), "loaded layout config");
    Ok(config)
}

fn parse_config_file(contents: &str) -> anyhow::Result<ConfigFile> {
    match serde_json::from_str::<ConfigFile>(contents) {
        Ok(parsed) => Ok(parsed),
        Err(json_err) => json5::from_str::<ConfigFile>(contents)
            .map_err(|_| anyhow::anyhow!("invalid layout config: {json_err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_knows_its_default_strategy() {
        let config = LayoutConfig::default();
        assert!(config.strategies.contains_key(&config.default_strategy_id));
    }

    #[test]
    fn json5_config_is_accepted() {
        let parsed = parse_config_file(
            r#"{
                // comments are fine in JSON5
                siblingSpacing: 24,
                strategies: { wide: { kind: "linear", parentAlignment: "right" } },
                defaultStrategyId: "wide",
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.sibling_spacing, Some(24.0));
        assert_eq!(parsed.default_strategy_id.as_deref(), Some("wide"));
        assert!(parsed.strategies.unwrap().contains_key("wide"));
    }

    #[test]
    fn missing_path_yields_defaults() {
        assert_eq!(load_config(None).unwrap(), LayoutConfig::default());
    }
}
