//! Collection metadata registry.

use crate::error::{CoreError, CoreResult};
use std::collections::HashMap;

/// Field that holds the primary key unless configured otherwise.
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Storage settings for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMetadata {
    /// Collection name.
    pub name: String,
    /// Record field holding the primary key. Never part of an update.
    pub id_field: String,
}

impl CollectionMetadata {
    /// Creates metadata with the default id field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }

    /// Sets the id field.
    #[must_use]
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }
}

/// Metadata for every managed collection.
///
/// Built once at startup and passed to each [`crate::UnitOfWork`].
///
/// ```rust
/// use docmap_core::{CollectionMetadata, MetadataRegistry};
///
/// let registry = MetadataRegistry::new()
///     .with(CollectionMetadata::new("users"))
///     .with(CollectionMetadata::new("orders").id_field("order_no"));
///
/// assert_eq!(registry.get("orders").unwrap().id_field, "order_no");
/// assert!(registry.get("missing").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    collections: HashMap<String, CollectionMetadata>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection.
    #[must_use]
    pub fn with(mut self, metadata: CollectionMetadata) -> Self {
        self.register(metadata);
        self
    }

    /// Adds or replaces a collection.
    pub fn register(&mut self, metadata: CollectionMetadata) {
        self.collections.insert(metadata.name.clone(), metadata);
    }

    /// Looks up a collection.
    pub fn get(&self, name: &str) -> CoreResult<&CollectionMetadata> {
        self.collections
            .get(name)
            .ok_or_else(|| CoreError::UnknownCollection {
                name: name.to_string(),
            })
    }

    /// Returns true if the collection is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Number of registered collections.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Iterates over collection names in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}
