//! Object mapping and collection metadata.

mod mapper;
mod metadata;

pub use mapper::DocumentMapper;
pub use metadata::{CollectionMetadata, MetadataRegistry, DEFAULT_ID_FIELD};
