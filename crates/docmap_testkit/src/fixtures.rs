//! Test fixtures and unit of work helpers.
//!
//! Provides a ready-made store/registry/unit of work bundle, a sample
//! mapped type and the records used by the common diff scenarios.

use docmap_codec::{Document, Value};
use docmap_core::{
    CollectionMetadata, Config, CoreError, CoreResult, DocumentMapper, InMemoryStore,
    MetadataRegistry, ObjectId, Target, TargetDocument, UnitOfWork,
};
use std::sync::Arc;

/// A store, registry and unit of work wired together.
pub struct TestContext {
    /// The backing store, shared with the unit of work.
    pub store: Arc<InMemoryStore>,
    /// The collection registry.
    pub registry: Arc<MetadataRegistry>,
    /// The unit of work under test.
    pub uow: UnitOfWork<InMemoryStore>,
}

impl TestContext {
    /// Creates a context with the sample collections registered.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Creates a context using the given configuration.
    pub fn with_config(config: &Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let registry = Arc::new(sample_registry());
        let uow = UnitOfWork::new(Arc::clone(&store), Arc::clone(&registry), config);
        Self {
            store,
            registry,
            uow,
        }
    }

    /// Starts a fresh unit of work over the same store, as a new request would.
    pub fn new_unit_of_work(&self, config: &Config) -> UnitOfWork<InMemoryStore> {
        UnitOfWork::new(Arc::clone(&self.store), Arc::clone(&self.registry), config)
    }

    /// Reads a stored record.
    pub fn stored(&self, collection: &str, id: ObjectId) -> Option<Document> {
        self.store
            .records(collection)
            .into_iter()
            .find_map(|(stored_id, doc)| (stored_id == id).then_some(doc))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test with a fresh unit of work.
///
/// # Example
///
/// ```rust
/// use docmap_testkit::{with_unit_of_work, Profile};
///
/// with_unit_of_work(|ctx| {
///     let profile = Profile::new("ada");
///     ctx.uow.persist(&profile).unwrap();
///     assert_eq!(ctx.uow.flush().unwrap().inserted, 1);
/// });
/// ```
pub fn with_unit_of_work<F, R>(f: F) -> R
where
    F: FnOnce(&mut TestContext) -> R,
{
    let mut ctx = TestContext::new();
    f(&mut ctx)
}

/// Registry holding the sample collections.
pub fn sample_registry() -> MetadataRegistry {
    MetadataRegistry::new().with(CollectionMetadata::new(Profile::collection()))
}

/// Postal address nested in a [`Profile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    /// City name.
    pub city: String,
    /// Postal code, if known.
    pub zip: Option<String>,
}

/// A sample mapped type with nested, array and counter fields.
///
/// `visits` is written as an atomic increment of the visits recorded since
/// the last flush.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Stable identifier.
    pub id: ObjectId,
    /// Login name.
    pub name: String,
    /// Postal address.
    pub address: Address,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Total visit count.
    pub visits: i64,
    unflushed_visits: i64,
}

impl Profile {
    /// Creates a profile with a random id.
    pub fn new(name: &str) -> Self {
        Self::with_id(ObjectId::new(), name)
    }

    /// Creates a profile whose id is derived from its name.
    pub fn keyed(name: &str) -> Self {
        Self::with_id(ObjectId::from_key(Self::collection(), name), name)
    }

    fn with_id(id: ObjectId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            address: Address::default(),
            tags: Vec::new(),
            visits: 0,
            unflushed_visits: 0,
        }
    }

    /// Records visits.
    pub fn visit(&mut self, count: i64) {
        self.visits += count;
        self.unflushed_visits += count;
    }

    /// Forgets the visits recorded before the last flush.
    pub fn flushed(&mut self) {
        self.unflushed_visits = 0;
    }
}

impl DocumentMapper for Profile {
    fn collection() -> &'static str {
        "profiles"
    }

    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn to_document(&self) -> CoreResult<Document> {
        let mut address = Document::new();
        address.insert("city".into(), Value::from(self.address.city.as_str()));
        address.insert("zip".into(), Value::from(self.address.zip.clone()));

        let mut doc = Document::new();
        doc.insert("name".into(), Value::from(self.name.as_str()));
        doc.insert("address".into(), Value::Document(address));
        doc.insert(
            "tags".into(),
            Value::Array(self.tags.iter().map(|t| Value::from(t.as_str())).collect()),
        );
        doc.insert("visits".into(), Value::Integer(self.visits));
        Ok(doc)
    }

    fn from_document(id: ObjectId, doc: &Document) -> CoreResult<Self> {
        let name = doc
            .get("name")
            .and_then(Value::as_text)
            .ok_or_else(|| CoreError::mapping("profile without name"))?
            .to_string();
        let address = doc
            .get("address")
            .and_then(Value::as_document)
            .map(|address| Address {
                city: address
                    .get("city")
                    .and_then(Value::as_text)
                    .unwrap_or_default()
                    .to_string(),
                zip: address
                    .get("zip")
                    .and_then(Value::as_text)
                    .map(str::to_string),
            })
            .unwrap_or_default();
        let tags = doc
            .get("tags")
            .and_then(Value::as_array)
            .unwrap_or_default()
            .iter()
            .filter_map(|t| t.as_text().map(str::to_string))
            .collect();
        let visits = doc.get("visits").and_then(Value::as_integer).unwrap_or(0);

        Ok(Self {
            id,
            name,
            address,
            tags,
            visits,
            unflushed_visits: 0,
        })
    }

    fn to_target(&self) -> CoreResult<TargetDocument> {
        let mut target = TargetDocument::from(self.to_document()?);
        if self.unflushed_visits != 0 {
            target.insert("visits", Target::Increment(self.unflushed_visits.into()));
        }
        Ok(target)
    }
}

/// Records for the common diff scenarios.
pub mod scenarios {
    use docmap_codec::{Document, Value};

    /// Snapshot of the mixed-change scenario.
    pub fn mixed_old() -> Document {
        record(&[
            ("same", Value::from("v")),
            ("diff", Value::from("v")),
            ("gone", Value::from("v")),
            (
                "arr",
                Value::Array(vec![Value::from(1), Value::from(2), Value::from(3)]),
            ),
        ])
    }

    /// Current state of the mixed-change scenario.
    pub fn mixed_new() -> Document {
        record(&[
            ("same", Value::from("v")),
            ("diff", Value::from("v2")),
            ("new", Value::from("n")),
            ("arr", Value::Array(vec![Value::from(1), Value::from(2)])),
        ])
    }

    /// A nested record two levels deep.
    pub fn nested() -> Document {
        let mut inner = Document::new();
        inner.insert("y".into(), Value::from(2));
        let mut outer = Document::new();
        outer.insert("x".into(), Value::from(1));
        outer.insert("inner".into(), Value::Document(inner));
        record(&[("e", Value::Document(outer))])
    }

    /// Builds a record from field pairs.
    pub fn record(fields: &[(&str, Value)]) -> Document {
        fields
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }
}
