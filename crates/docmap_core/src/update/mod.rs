//! Change detection and partial update statements.

mod apply;
mod diff;
mod statement;
mod target;

pub use diff::{compute_update, DiffEngine};
pub use statement::{Number, UpdateOperator, UpdateStatement, EACH_MODIFIER};
pub use target::{Target, TargetDocument};
