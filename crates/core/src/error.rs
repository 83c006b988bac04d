use thiserror::Error;

use crate::space::Space;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown space: {0}")]
    UnknownSpace(String),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Space [{0}] cannot be promoted.")]
    NoFurtherPromotion(Space),
}
