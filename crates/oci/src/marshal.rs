//! Package marshaling: raw image content into parsed packages.

use async_trait::async_trait;
use depot_core::{
    Error, FetchedImage, PACKAGE_MEDIA_TYPE, PackageMarshaler, PackageMeta, ParsedPackage, Result,
};
use std::sync::Arc;
use tracing::debug;

/// Decodes the package metadata layer of a fetched image.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageMarshaler;

impl ImageMarshaler {
    /// Create a marshaler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PackageMarshaler for ImageMarshaler {
    async fn parse(&self, package: &str, image: FetchedImage) -> Result<Arc<ParsedPackage>> {
        let layer = image.layer(PACKAGE_MEDIA_TYPE).ok_or_else(|| {
            Error::malformed(package, format!("no {PACKAGE_MEDIA_TYPE} layer"))
        })?;

        let meta: PackageMeta = serde_json::from_slice(&layer.data)
            .map_err(|e| Error::malformed(package, format!("invalid package document: {e}")))?;

        if meta.name != package {
            return Err(Error::malformed(
                package,
                format!("document names '{}', expected '{package}'", meta.name),
            ));
        }

        debug!(
            %package,
            digest = %image.digest,
            kind = %meta.kind,
            dependencies = meta.depends_on.len(),
            schemas = meta.schemas.len(),
            "parsed package"
        );
        ParsedPackage::from_meta(meta, image.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use depot_core::{ImageLayer, PackageKind, TypeId};
    use serde_json::json;

    const NAME: &str = "registry.example.com/acme/db";

    fn document() -> serde_json::Value {
        json!({
            "name": NAME,
            "kind": "module",
            "version": "1.2.0",
            "dependsOn": [
                {"package": "registry.example.com/acme/base", "constraints": "^2.0"}
            ],
            "schemas": [
                {
                    "type": {"name": "acme.example.com/Database", "version": "v1"},
                    "schema": {"type": "object"}
                }
            ]
        })
    }

    fn image_with(media_type: &str, body: Vec<u8>) -> FetchedImage {
        FetchedImage {
            digest: "sha256:d1".to_string(),
            layers: vec![ImageLayer {
                media_type: media_type.to_string(),
                data: Bytes::from(body),
            }],
        }
    }

    #[tokio::test]
    async fn parses_package_layer() {
        let image = image_with(PACKAGE_MEDIA_TYPE, document().to_string().into_bytes());
        let pkg = ImageMarshaler::new().parse(NAME, image).await.unwrap();

        assert_eq!(pkg.package(), NAME);
        assert_eq!(pkg.kind(), PackageKind::Module);
        assert_eq!(pkg.version(), "1.2.0");
        assert_eq!(pkg.digest(), "sha256:d1");
        assert_eq!(pkg.dependencies().len(), 1);
        assert!(
            pkg.validators()
                .contains_key(&TypeId::new("acme.example.com/Database", "v1"))
        );
    }

    #[tokio::test]
    async fn rejects_image_without_package_layer() {
        let image = image_with("application/octet-stream", b"blob".to_vec());
        let err = ImageMarshaler::new()
            .parse(NAME, image)
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::MalformedPackage { .. }));
    }

    #[tokio::test]
    async fn rejects_undecodable_document() {
        let image = image_with(PACKAGE_MEDIA_TYPE, b"not json".to_vec());
        let err = ImageMarshaler::new()
            .parse(NAME, image)
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::MalformedPackage { .. }));
    }

    #[tokio::test]
    async fn rejects_name_mismatch() {
        let mut doc = document();
        doc["name"] = json!("registry.example.com/other/pkg");
        let image = image_with(PACKAGE_MEDIA_TYPE, doc.to_string().into_bytes());
        let err = ImageMarshaler::new()
            .parse(NAME, image)
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::MalformedPackage { .. }));
    }
}
