use crate::config::LayoutConfig;
use crate::container::BoxContainer;

/// A chart: its boxes plus the settings used to lay them out.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    pub boxes: BoxContainer,
    pub settings: LayoutConfig,
}

impl Diagram {
    pub fn new(boxes: BoxContainer, settings: LayoutConfig) -> Self {
        Self { boxes, settings }
    }
}
