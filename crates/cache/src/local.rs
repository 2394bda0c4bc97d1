//! Filesystem-backed implementation of the package cache contract.

use async_trait::async_trait;
use depot_core::{Dependency, Error, PackageCache, PackageMeta, ParsedPackage, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Filename of a cache entry inside its identity directory.
const ENTRY_FILE: &str = "package.json";

/// On-disk representation of one cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredPackage {
    digest: String,
    meta: PackageMeta,
}

/// Filesystem-backed package cache.
///
/// Entries live at `<root>/<sanitized package>/<version>/package.json`.
/// Writes go through a sibling temp file and a rename, so a torn write never
/// clobbers a good entry; the last completed write for an identity wins.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl Default for LocalCache {
    fn default() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("depot")
            .join("packages");
        Self::new(root)
    }
}

impl LocalCache {
    /// Create a cache rooted at the given directory.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for a finalized identity.
    fn entry_path(&self, dep: &Dependency) -> PathBuf {
        self.root
            .join(sanitize(&dep.package))
            .join(&dep.constraints)
            .join(ENTRY_FILE)
    }
}

/// Flatten a package reference into a single path segment.
fn sanitize(package: &str) -> String {
    package
        .chars()
        .map(|c| if c == '/' || c == ':' { '-' } else { c })
        .collect()
}

#[async_trait]
impl PackageCache for LocalCache {
    async fn get(&self, dep: &Dependency) -> Result<Arc<ParsedPackage>> {
        let path = self.entry_path(dep);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(key = %dep.key(), "cache miss");
                return Err(Error::not_found(dep.key()));
            }
            Err(e) => return Err(Error::storage(e, &path, "read")),
        };

        let stored: StoredPackage = serde_json::from_slice(&raw).map_err(|e| {
            Error::serialization(format!("decode {}: {e}", path.display()))
        })?;
        trace!(key = %dep.key(), digest = %stored.digest, "cache hit");
        ParsedPackage::from_meta(stored.meta, stored.digest)
    }

    async fn store(&self, dep: &Dependency, package: Arc<ParsedPackage>) -> Result<()> {
        let path = self.entry_path(dep);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage(e, parent, "create"))?;
        }

        let stored = StoredPackage {
            digest: package.digest().to_string(),
            meta: package.meta().clone(),
        };
        let body = serde_json::to_vec_pretty(&stored)
            .map_err(|e| Error::serialization(format!("encode {}: {e}", dep.key())))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| Error::storage(e, &tmp, "write"))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::storage(e, &path, "rename"))?;

        debug!(key = %dep.key(), digest = %package.digest(), "stored package");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::{DeclaredDependency, PackageKind, SchemaEntry, TypeId};
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_package(version: &str, digest: &str) -> Arc<ParsedPackage> {
        let meta = PackageMeta {
            name: "registry.example.com/acme/db".to_string(),
            kind: PackageKind::Module,
            version: version.to_string(),
            depends_on: vec![DeclaredDependency {
                package: "registry.example.com/acme/base".to_string(),
                constraints: "^2.0".to_string(),
            }],
            schemas: vec![SchemaEntry {
                type_id: TypeId::new("acme.example.com/Database", "v1"),
                schema: json!({"type": "object"}),
            }],
        };
        ParsedPackage::from_meta(meta, digest).unwrap()
    }

    fn finalized(version: &str) -> Dependency {
        let mut dep = Dependency::new("registry.example.com/acme/db", "^1.0");
        dep.finalize(version);
        dep
    }

    #[test]
    fn sanitize_flattens_separators() {
        assert_eq!(
            sanitize("registry.example.com/acme/db"),
            "registry.example.com-acme-db"
        );
        assert_eq!(sanitize("localhost:5000/pkg"), "localhost-5000-pkg");
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().to_path_buf());
        let dep = finalized("1.2.0");
        let pkg = sample_package("1.2.0", "sha256:d1");

        cache.store(&dep, Arc::clone(&pkg)).await.unwrap();
        let loaded = cache.get(&dep).await.unwrap();

        assert_eq!(loaded.digest(), "sha256:d1");
        assert_eq!(loaded.version(), "1.2.0");
        assert_eq!(loaded.kind(), PackageKind::Module);
        assert_eq!(loaded.dependencies().len(), 1);
        assert!(
            loaded
                .validators()
                .contains_key(&TypeId::new("acme.example.com/Database", "v1"))
        );
    }

    #[tokio::test]
    async fn miss_is_reported_as_not_found() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().to_path_buf());
        let err = cache.get(&finalized("1.2.0")).await.expect_err("must miss");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().to_path_buf());
        let dep = finalized("1.2.0");

        cache
            .store(&dep, sample_package("1.2.0", "sha256:d1"))
            .await
            .unwrap();
        cache
            .store(&dep, sample_package("1.2.0", "sha256:d2"))
            .await
            .unwrap();

        let loaded = cache.get(&dep).await.unwrap();
        assert_eq!(loaded.digest(), "sha256:d2");
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_serialization_error() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().to_path_buf());
        let dep = finalized("1.2.0");

        let path = cache.entry_path(&dep);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();

        let err = cache.get(&dep).await.expect_err("must fail");
        assert!(matches!(err, Error::Serialization { .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn distinct_versions_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().to_path_buf());

        cache
            .store(&finalized("1.2.0"), sample_package("1.2.0", "sha256:d1"))
            .await
            .unwrap();
        cache
            .store(&finalized("1.3.0"), sample_package("1.3.0", "sha256:d3"))
            .await
            .unwrap();

        assert_eq!(
            cache.get(&finalized("1.2.0")).await.unwrap().digest(),
            "sha256:d1"
        );
        assert_eq!(
            cache.get(&finalized("1.3.0")).await.unwrap().digest(),
            "sha256:d3"
        );
    }
}
