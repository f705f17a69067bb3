use crate::chart_box::BoxId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("data item id {data_id:?} is already bound to a box")]
    DuplicateDataId { data_id: String },
    #[error("data item {data_id:?} refers to unknown parent {parent_id:?}")]
    UnknownParent { data_id: String, parent_id: String },
    #[error("box {0} does not exist in this container")]
    UnknownBox(BoxId),
    #[error("data item {data_id:?} is part of a parent cycle and never reaches the root")]
    Cycle { data_id: String },
    #[error("no size available for data item {data_id:?}")]
    MissingBoxSize { data_id: String },
    #[error("layout strategy {0:?} is not registered")]
    UnknownStrategy(String),
    #[error("container has no system root; reload it from a data source first")]
    MissingRoot,
    #[error("failed to spawn layout worker: {0}")]
    WorkerSpawn(String),
    #[error("layout worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, Error>;
