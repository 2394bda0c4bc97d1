//! Contracts the resolution manager depends on.
//!
//! These are the three seams between the orchestration core and its external
//! collaborators: the package cache, the registry-side image resolver and the
//! package marshaler. `depot-cache` and `depot-oci` provide the production
//! implementations; tests script their own.

use crate::dependency::Dependency;
use crate::package::ParsedPackage;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// One layer of a fetched package image.
#[derive(Debug, Clone)]
pub struct ImageLayer {
    /// Media type the registry reported for the layer.
    pub media_type: String,
    /// Raw layer bytes.
    pub data: Bytes,
}

/// Raw content pulled from a registry, prior to marshaling.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Content digest of the image the layers came from.
    pub digest: String,
    /// The image layers in manifest order.
    pub layers: Vec<ImageLayer>,
}

impl FetchedImage {
    /// The first layer carrying the given media type.
    #[must_use]
    pub fn layer(&self, media_type: &str) -> Option<&ImageLayer> {
        self.layers.iter().find(|l| l.media_type == media_type)
    }
}

/// Storage for parsed packages keyed by finalized identity.
#[async_trait]
pub trait PackageCache: Send + Sync {
    /// Look up a package. Fails with [`crate::Error::NotFound`] on a miss;
    /// any other failure is a real storage error and propagates.
    async fn get(&self, dep: &Dependency) -> Result<Arc<ParsedPackage>>;

    /// Store a package under the finalized identity. Idempotent; the last
    /// write for an identity wins.
    async fn store(&self, dep: &Dependency, package: Arc<ParsedPackage>) -> Result<()>;
}

/// Registry-side resolution of constraints, digests and content.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Resolve the identity's version constraint to a concrete version.
    /// Deterministic for identical constraint and registry state; may differ
    /// between calls when the registry changes.
    async fn resolve_tag(&self, dep: &Dependency) -> Result<String>;

    /// Content digest currently tagged for the finalized identity.
    async fn resolve_digest(&self, dep: &Dependency) -> Result<String>;

    /// Pull the raw package content for the finalized identity.
    async fn fetch(&self, dep: &Dependency) -> Result<FetchedImage>;
}

/// Converts fetched content into a parsed package.
#[async_trait]
pub trait PackageMarshaler: Send + Sync {
    /// Parse raw image content for `package`. Fails with
    /// [`crate::Error::MalformedPackage`] on invalid content.
    async fn parse(&self, package: &str, image: FetchedImage) -> Result<Arc<ParsedPackage>>;
}
