//! Error types shared across the depot workspace.

use miette::Diagnostic;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for all depot operations.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A version constraint could not be satisfied, or the registry was
    /// unreachable while finalizing or resolving a digest.
    #[error("failed to resolve '{package}': {reason}")]
    #[diagnostic(
        code(depot::resolve),
        help("Check the version constraint and registry connectivity")
    )]
    Resolution {
        /// Package reference being resolved.
        package: String,
        /// What went wrong.
        reason: String,
    },

    /// Cache miss. The manager absorbs this and fetches instead; it is never
    /// surfaced to callers of the resolution entry points.
    #[error("package not cached: {key}")]
    #[diagnostic(code(depot::cache::not_found))]
    NotFound {
        /// Finalized identity that was looked up.
        key: String,
    },

    /// Fetched content could not be turned into a package.
    #[error("malformed package '{package}': {reason}")]
    #[diagnostic(
        code(depot::marshal),
        help("The registry content is not a valid depot package")
    )]
    MalformedPackage {
        /// Package reference the content was fetched for.
        package: String,
        /// What made the content unusable.
        reason: String,
    },

    /// An I/O failure in the cache other than a miss.
    #[error("cache {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(depot::cache::io),
        help("Check file permissions on the cache directory")
    )]
    Storage {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Path involved, if known.
        path: Option<Box<Path>>,
        /// Operation that failed (e.g. "read", "write", "rename").
        operation: String,
    },

    /// A stored cache entry could not be encoded or decoded.
    #[error("cache serialization error: {message}")]
    #[diagnostic(code(depot::cache::serialization))]
    Serialization {
        /// What failed to round-trip.
        message: String,
    },

    /// An external call exceeded the configured deadline. Retrying is the
    /// caller's decision; the manager never retries on its own.
    #[error("{operation} timed out after {limit:?}")]
    #[diagnostic(code(depot::timeout), help("Raise the call deadline or retry"))]
    Timeout {
        /// The external call that ran out of time.
        operation: String,
        /// The deadline that was exceeded.
        limit: Duration,
    },

    /// The resolution run was cancelled. Cache writes already committed
    /// remain valid.
    #[error("resolution cancelled")]
    #[diagnostic(code(depot::cancelled))]
    Cancelled,

    /// A finalized identity was revisited on the current resolution path.
    #[error("cyclic dependency: {}", chain.join(" -> "))]
    #[diagnostic(
        code(depot::cycle),
        help("Break the cycle in the declared dependencies")
    )]
    CyclicDependency {
        /// The path of finalized identities, ending in the repeated one.
        chain: Vec<String>,
    },
}

impl Error {
    /// Create a resolution error.
    #[must_use]
    pub fn resolution(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// Create a cache-miss error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a malformed-package error.
    #[must_use]
    pub fn malformed(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPackage {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage error with path context.
    #[must_use]
    pub fn storage(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Storage {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create a storage error without path context.
    #[must_use]
    pub fn storage_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Storage {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit,
        }
    }

    /// Create a cyclic-dependency error from the offending path.
    #[must_use]
    pub fn cycle(chain: Vec<String>) -> Self {
        Self::CyclicDependency { chain }
    }

    /// Whether this error is a cache miss, the one outcome the resolution
    /// manager converts into a fetch rather than propagating.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for depot operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_predicate() {
        assert!(Error::not_found("a@1.0.0").is_not_found());
        assert!(!Error::resolution("a", "unreachable").is_not_found());
        assert!(!Error::Cancelled.is_not_found());
    }

    #[test]
    fn cycle_display_shows_path() {
        let err = Error::cycle(vec![
            "a@1.0.0".to_string(),
            "b@2.0.0".to_string(),
            "a@1.0.0".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "cyclic dependency: a@1.0.0 -> b@2.0.0 -> a@1.0.0"
        );
    }

    #[test]
    fn storage_display_includes_path() {
        let err = Error::storage(
            std::io::Error::other("denied"),
            Path::new("/tmp/depot/pkg.json"),
            "write",
        );
        assert_eq!(err.to_string(), "cache write failed: /tmp/depot/pkg.json");
    }
}
