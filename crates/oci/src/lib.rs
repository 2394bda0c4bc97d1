//! OCI-backed registry access for depot.
//!
//! This crate provides the production implementations of two depot contracts:
//!
//! - [`OciResolver`]: resolves version constraints to concrete tags, tags to
//!   content digests, and pulls raw package images from an OCI registry
//! - [`ImageMarshaler`]: turns a pulled image into a parsed package by
//!   locating and decoding its package metadata layer
//!
//! Freshness decisions elsewhere in depot rest entirely on the manifest
//! digests this crate reports.

mod marshal;
mod registry;

pub use marshal::ImageMarshaler;
pub use registry::OciResolver;
