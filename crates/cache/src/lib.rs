//! Local package cache for depot.
//!
//! Parsed packages are stored on disk keyed by their finalized identity,
//! so repeat resolutions can skip the registry fetch entirely when the
//! registry digest still matches the cached one:
//!
//! ```text
//! ~/.cache/depot/packages/
//! └── registry.example.com-acme-db/
//!     └── 1.2.0/
//!         └── package.json    # digest + metadata document
//! ```
//!
//! The cache stores the package's metadata document and digest, not the raw
//! image; validators are recompiled from the stored schemas on load.

mod local;

pub use local::LocalCache;
