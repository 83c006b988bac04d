pub mod config;
pub mod document;
pub mod error;
pub mod resource_type;
pub mod space;

pub use config::Config;
pub use document::{DocumentMap, DocumentTree};
pub use error::*;
pub use resource_type::ResourceType;
pub use space::Space;
