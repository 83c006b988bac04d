pub mod diff;
pub mod editor;
pub mod hash;
pub mod patch;
pub mod promotion;
pub mod resource;
pub mod store;
pub mod summary;

pub use diff::{diff, diff_singleton, Change, ChangeOperation, ChangeSet, DiffError, Inventory};
pub use editor::{EditError, ResourceEditor};
pub use hash::{aggregate_digest, content_digest};
pub use patch::{PatchError, PatchFailure, PatchOperation};
pub use promotion::{
    PromotionError, PromotionLocks, PromotionPreview, PromotionReport, PromotionRequest,
    PromotionService, PromotionValidator,
};
pub use resource::{Resource, ResourceError, ResourceRecord};
pub use store::{ContentStore, FileStore, MemoryStore, Precondition, StoreError};
pub use summary::{space_digest, SpaceSummary};
