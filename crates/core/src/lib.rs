//! Core types for the depot package manager.
//!
//! depot resolves typed schema packages distributed as OCI images. This crate
//! holds everything the rest of the workspace agrees on:
//!
//! - The data model: [`Dependency`] identities, [`PackageMeta`] documents,
//!   [`ParsedPackage`] results and the per-run [`Accumulator`]
//! - Per-type schema validation: [`TypeId`] and [`SchemaValidator`]
//! - The unified [`Error`] type and [`Result`] alias
//! - The contracts the resolution manager consumes: [`PackageCache`],
//!   [`ImageResolver`] and [`PackageMarshaler`]
//!
//! The crates implementing those contracts (`depot-cache`, `depot-oci`) and
//! the orchestration crate (`depot-manager`) all depend on this one and on
//! nothing else inside the workspace.

mod contract;
mod dependency;
mod errors;
mod package;
mod schema;

pub use contract::{FetchedImage, ImageLayer, ImageResolver, PackageCache, PackageMarshaler};
pub use dependency::{Dependency, PackageKind};
pub use errors::{Error, Result};
pub use package::{
    Accumulator, DeclaredDependency, PACKAGE_MEDIA_TYPE, PackageMeta, ParsedPackage, SchemaEntry,
};
pub use schema::{SchemaValidator, TypeId};
