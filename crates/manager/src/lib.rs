//! Dependency resolution orchestration for depot.
//!
//! The [`Manager`] drives the whole resolution pipeline for a declared
//! dependency: finalize the version constraint against the registry, check
//! the local cache, reconcile cache freshness by content digest, fetch and
//! parse when stale or missing, then walk the declared dependencies of the
//! resolved package the same way. Every package encountered lands in an
//! [`depot_core::Accumulator`]; a [`Snapshot`] merges the validators of a
//! whole closure into one queryable view.
//!
//! The manager owns no run state. Collaborators (cache, resolver, marshaler)
//! are shared immutably; accumulator, visited set and traversal worklist are
//! created per call and returned or dropped with it.

mod resolve;
mod snapshot;

pub use resolve::Manager;
pub use snapshot::{Snapshot, Validation};
