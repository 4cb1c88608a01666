//! # DocMap Core
//!
//! Change tracking core of the DocMap object-document mapper.
//!
//! This crate provides:
//! - A diff engine that turns an old and a new record into a partial
//!   update statement (`$set`, `$unset`, `$inc`, `$push`)
//! - Update statements that render to the store's update protocol and can
//!   be applied to documents
//! - Conversion between nested records and dotted-path records
//! - A snapshot store holding the last persisted state of managed objects
//! - A unit of work that tracks objects and flushes their changes through a
//!   [`DocumentStore`]
//!
//! ## Usage
//!
//! ```
//! use docmap_codec::{Document, Value};
//! use docmap_core::DiffEngine;
//!
//! let mut old = Document::new();
//! old.insert("name".into(), Value::from("Ada"));
//! old.insert("legacy".into(), Value::Bool(true));
//!
//! let mut new = Document::new();
//! new.insert("name".into(), Value::from("Ada Lovelace"));
//!
//! let update = DiffEngine::default().diff(Some(&old), &new).unwrap();
//! assert_eq!(update.set().unwrap()["name"], Value::from("Ada Lovelace"));
//! assert!(update.unset().unwrap().contains("legacy"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod aggregate;
mod config;
mod error;
mod mapping;
mod path;
mod snapshot;
mod store;
mod unit_of_work;
mod update;

pub use aggregate::{aggregate, disaggregate, FlatRecord, KeyHandler, SpecialKeys, QUERY_OPERATORS};
pub use config::{Config, ShapeConflictPolicy};
pub use error::{CoreError, CoreResult};
pub use mapping::{CollectionMetadata, DocumentMapper, MetadataRegistry, DEFAULT_ID_FIELD};
pub use path::FieldPath;
pub use snapshot::{ObjectId, SnapshotStore};
pub use store::{DocumentStore, InMemoryStore};
pub use unit_of_work::{FlushReport, UnitOfWork};
pub use update::{
    compute_update, DiffEngine, Number, Target, TargetDocument, UpdateOperator, UpdateStatement,
    EACH_MODIFIER,
};
