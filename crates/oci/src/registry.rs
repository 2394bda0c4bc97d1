//! OCI registry client implementing the image resolver contract.

use async_trait::async_trait;
use depot_core::{
    Dependency, Error, FetchedImage, ImageLayer, ImageResolver, PACKAGE_MEDIA_TYPE, Result,
};
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use semver::{Version, VersionReq};
use tracing::{debug, info, trace};

/// OCI registry-backed resolver.
///
/// Version constraints are matched against the registry's tag list using
/// semver; digests come from the manifest of the finalized reference.
pub struct OciResolver {
    client: Client,
}

impl Default for OciResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl OciResolver {
    /// Create a resolver with default client configuration.
    #[must_use]
    pub fn new() -> Self {
        let config = ClientConfig {
            protocol: ClientProtocol::Https,
            ..Default::default()
        };
        Self {
            client: Client::new(config),
        }
    }

    /// Authentication for a registry.
    ///
    /// Anonymous by default; `DEPOT_REGISTRY_TOKEN` supplies a bearer-style
    /// basic credential when set.
    fn auth(_reference: &Reference) -> RegistryAuth {
        if let Ok(token) = std::env::var("DEPOT_REGISTRY_TOKEN") {
            return RegistryAuth::Basic(String::new(), token);
        }
        RegistryAuth::Anonymous
    }
}

#[async_trait]
impl ImageResolver for OciResolver {
    async fn resolve_tag(&self, dep: &Dependency) -> Result<String> {
        // An exact version passes through; there is nothing left to choose.
        if parse_version(&dep.constraints).is_some() {
            trace!(package = %dep.package, version = %dep.constraints, "constraint already concrete");
            return Ok(dep.constraints.clone());
        }

        let reference = parse_reference(&dep.package)?;
        let req = VersionReq::parse(&dep.constraints).map_err(|e| {
            Error::resolution(
                &dep.package,
                format!("invalid constraint '{}': {e}", dep.constraints),
            )
        })?;

        let auth = Self::auth(&reference);
        let tags = self
            .client
            .list_tags(&reference, &auth, None, None)
            .await
            .map_err(|e| Error::resolution(&dep.package, e.to_string()))?;

        let tag = select_tag(&tags.tags, &req).ok_or_else(|| {
            Error::resolution(
                &dep.package,
                format!("no tag satisfies '{}'", dep.constraints),
            )
        })?;

        info!(package = %dep.package, constraints = %dep.constraints, %tag, "resolved tag");
        Ok(tag)
    }

    async fn resolve_digest(&self, dep: &Dependency) -> Result<String> {
        let reference = tagged_reference(dep)?;
        let auth = Self::auth(&reference);
        let digest = self
            .client
            .fetch_manifest_digest(&reference, &auth)
            .await
            .map_err(|e| Error::resolution(&dep.package, e.to_string()))?;
        trace!(key = %dep.key(), %digest, "resolved digest");
        Ok(digest)
    }

    async fn fetch(&self, dep: &Dependency) -> Result<FetchedImage> {
        let reference = tagged_reference(dep)?;
        let auth = Self::auth(&reference);
        debug!(key = %dep.key(), "pulling package image");

        let image = self
            .client
            .pull(&reference, &auth, vec![PACKAGE_MEDIA_TYPE])
            .await
            .map_err(|e| Error::resolution(&dep.package, e.to_string()))?;

        let digest = match image.digest {
            Some(digest) => digest,
            None => self
                .client
                .fetch_manifest_digest(&reference, &auth)
                .await
                .map_err(|e| Error::resolution(&dep.package, e.to_string()))?,
        };

        let layers = image
            .layers
            .into_iter()
            .map(|l| ImageLayer {
                media_type: l.media_type,
                data: l.data.into(),
            })
            .collect();

        Ok(FetchedImage { digest, layers })
    }
}

/// Pick the highest semver tag satisfying the requirement. Tags that do not
/// parse as versions are ignored; a leading `v` is tolerated and the original
/// tag string is returned untouched.
fn select_tag(tags: &[String], req: &VersionReq) -> Option<String> {
    let mut best: Option<(Version, &String)> = None;
    for tag in tags {
        let Some(version) = parse_version(tag) else {
            continue;
        };
        if !req.matches(&version) {
            continue;
        }
        if best.as_ref().is_none_or(|(b, _)| version > *b) {
            best = Some((version, tag));
        }
    }
    best.map(|(_, tag)| tag.clone())
}

fn parse_version(tag: &str) -> Option<Version> {
    Version::parse(tag.strip_prefix('v').unwrap_or(tag)).ok()
}

/// Parse a bare package reference.
fn parse_reference(package: &str) -> Result<Reference> {
    package.parse().map_err(|e: oci_distribution::ParseError| {
        Error::resolution(package, format!("invalid reference: {e}"))
    })
}

/// Reference for a finalized identity, tagged with its concrete version.
fn tagged_reference(dep: &Dependency) -> Result<Reference> {
    let base = parse_reference(&dep.package)?;
    Ok(Reference::with_tag(
        base.registry().to_string(),
        base.repository().to_string(),
        dep.constraints.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn select_tag_picks_highest_match() {
        let req = VersionReq::parse("^1.0").unwrap();
        let got = select_tag(&tags(&["1.0.0", "1.2.0", "1.1.3", "2.0.0"]), &req);
        assert_eq!(got.as_deref(), Some("1.2.0"));
    }

    #[test]
    fn select_tag_keeps_v_prefix() {
        let req = VersionReq::parse("^1.0").unwrap();
        let got = select_tag(&tags(&["v1.0.0", "v1.4.2", "latest"]), &req);
        assert_eq!(got.as_deref(), Some("v1.4.2"));
    }

    #[test]
    fn select_tag_ignores_non_semver_tags() {
        let req = VersionReq::parse("*").unwrap();
        let got = select_tag(&tags(&["latest", "edge", "1.0.0"]), &req);
        assert_eq!(got.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn select_tag_reports_no_match() {
        let req = VersionReq::parse("^3.0").unwrap();
        assert!(select_tag(&tags(&["1.0.0", "2.0.0"]), &req).is_none());
    }

    #[test]
    fn parse_reference_accepts_tagged_repo() {
        let r = parse_reference("registry.example.com/acme/db").unwrap();
        assert_eq!(r.registry(), "registry.example.com");
        assert_eq!(r.repository(), "acme/db");
    }

    #[test]
    fn parse_reference_rejects_garbage() {
        assert!(parse_reference("not a valid reference!!!").is_err());
    }

    #[test]
    fn tagged_reference_uses_finalized_version() {
        let mut dep = Dependency::new("registry.example.com/acme/db", "^1.0");
        dep.finalize("1.2.0");
        let r = tagged_reference(&dep).unwrap();
        assert_eq!(r.tag(), Some("1.2.0"));
    }
}
