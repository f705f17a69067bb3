pub mod chart_box;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod container;
pub mod data_source;
pub mod diagram;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod stepping;

pub use chart_box::{BoxFrame, BoxId, ChartBox, Connector};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{LayoutConfig, load_config};
pub use container::BoxContainer;
pub use data_source::{ChartDataSource, MemoryDataSource};
pub use diagram::Diagram;
pub use error::{Error, Result};
pub use geometry::{Edge, Point, Rect, Size};
pub use layout::{LayoutState, Operation};
pub use stepping::{LayoutEvent, RunOutcome, SteppingCoordinator, SteppingOptions};
