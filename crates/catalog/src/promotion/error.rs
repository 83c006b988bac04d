use content_core::{CoreError, ResourceType, Space};
use thiserror::Error;

use crate::diff::DiffError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum PromotionError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Diff(#[from] DiffError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid promotion request: {0}")]
    InvalidRequest(String),
    #[error("a promotion from [{from}] to [{to}] is already in progress")]
    InProgress { from: Space, to: Space },
    #[error("promotion rejected: {0}")]
    Rejected(String),
    #[error("{resource_type} [{id}] not found in space [{space}]")]
    NotFound {
        resource_type: ResourceType,
        id: String,
        space: Space,
    },
}
