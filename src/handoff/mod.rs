//! Run-scoped key/value channel between the fetch step and the load step.

pub mod error;
pub mod store;
