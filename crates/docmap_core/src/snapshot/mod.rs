//! Object identity and snapshots.

mod id;
mod store;

pub use id::ObjectId;
pub use store::SnapshotStore;
