//! Conversion between application objects and records.

use crate::error::CoreResult;
use crate::snapshot::ObjectId;
use crate::update::TargetDocument;
use docmap_codec::Document;

/// Trait for types that can be managed by a [`crate::UnitOfWork`].
///
/// Implementors must provide:
/// - `collection()`: the collection the type is stored in
/// - `object_id()`: the stable identifier of the instance
/// - `to_document()`: the record for the current state
/// - `from_document()`: hydration from a stored record
///
/// # Example
///
/// ```rust
/// use docmap_codec::{Document, Value};
/// use docmap_core::{CoreError, CoreResult, DocumentMapper, ObjectId};
///
/// struct Counter {
///     id: ObjectId,
///     hits: i64,
/// }
///
/// impl DocumentMapper for Counter {
///     fn collection() -> &'static str {
///         "counters"
///     }
///
///     fn object_id(&self) -> ObjectId {
///         self.id
///     }
///
///     fn to_document(&self) -> CoreResult<Document> {
///         let mut doc = Document::new();
///         doc.insert("hits".into(), Value::Integer(self.hits));
///         Ok(doc)
///     }
///
///     fn from_document(id: ObjectId, doc: &Document) -> CoreResult<Self> {
///         let hits = doc
///             .get("hits")
///             .and_then(Value::as_integer)
///             .ok_or_else(|| CoreError::mapping("missing hits"))?;
///         Ok(Counter { id, hits })
///     }
/// }
/// ```
pub trait DocumentMapper: Sized {
    /// Name of the collection holding this type.
    fn collection() -> &'static str;

    /// Returns the object's stable identifier.
    ///
    /// This ID must not change over the object's lifetime.
    fn object_id(&self) -> ObjectId;

    /// Serializes the current state.
    fn to_document(&self) -> CoreResult<Document>;

    /// Builds an object from a stored record.
    fn from_document(id: ObjectId, doc: &Document) -> CoreResult<Self>;

    /// Describes the current state for change detection.
    ///
    /// The default diffs the plain record. Override to turn counters into
    /// atomic increments.
    fn to_target(&self) -> CoreResult<TargetDocument> {
        Ok(TargetDocument::from(self.to_document()?))
    }
}
