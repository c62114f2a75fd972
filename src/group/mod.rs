//! Work grouping and identity assignment
//!
//! A work group is the unit of dispatch: a set of input paths sharing one
//! content-derived identity. The identity is the same for the same path set
//! no matter the order or the run that produced it.

mod grouper;
mod hasher;
mod types;

pub use grouper::{plan_groups, GroupPlan, PlannedGroup};
pub use hasher::{compute_group_hash, HASH_HEX_LEN};
pub use types::WorkItem;
