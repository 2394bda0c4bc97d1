//! The resolution walk: finalize, cache-reconcile, fetch, traverse.

use crate::snapshot::Snapshot;
use depot_core::{
    Accumulator, Dependency, Error, ImageResolver, PackageCache, PackageMarshaler, ParsedPackage,
    Result,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Orchestrates dependency resolution against a cache and a registry.
pub struct Manager {
    cache: Arc<dyn PackageCache>,
    resolver: Arc<dyn ImageResolver>,
    marshaler: Arc<dyn PackageMarshaler>,
    call_timeout: Option<Duration>,
}

/// A pending traversal step: a declared dependency plus the chain of
/// finalized identities above it, for cycle detection.
struct Frame {
    dep: Dependency,
    chain: Arc<Vec<String>>,
}

/// State scoped to one resolution run, never stored on the manager.
struct Run {
    cancel: CancellationToken,
    /// Finalized identity -> package already resolved in this run. Repeat
    /// encounters across sibling paths are served from here without touching
    /// cache or registry again.
    visited: HashMap<String, Arc<ParsedPackage>>,
}

impl Run {
    fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            visited: HashMap::new(),
        }
    }

    /// Fail fast between traversal steps once cancellation was requested.
    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

impl Manager {
    /// Create a manager from its collaborators.
    pub fn new(
        cache: Arc<dyn PackageCache>,
        resolver: Arc<dyn ImageResolver>,
        marshaler: Arc<dyn PackageMarshaler>,
    ) -> Self {
        Self {
            cache,
            resolver,
            marshaler,
            call_timeout: None,
        }
    }

    /// Bound every external call (tag resolve, digest resolve, fetch) by a
    /// deadline. Expiry surfaces as [`Error::Timeout`]; the manager never
    /// retries on its own.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Resolve one dependency and its transitive closure.
    ///
    /// Returns the finalized root identity (kind and version populated) and
    /// the accumulator of every package encountered, in depth-first
    /// declaration order with the parent before its dependencies.
    pub async fn resolve(&self, dep: Dependency) -> Result<(Dependency, Accumulator)> {
        self.resolve_with(dep, CancellationToken::new()).await
    }

    /// Like [`Manager::resolve`], cooperatively cancellable through `cancel`.
    /// Cache writes committed before cancellation remain valid.
    pub async fn resolve_with(
        &self,
        dep: Dependency,
        cancel: CancellationToken,
    ) -> Result<(Dependency, Accumulator)> {
        let mut run = Run::new(cancel);
        let mut acc = Accumulator::new();
        let resolved = self.resolve_closure(dep, &mut run, &mut acc).await?;
        Ok((resolved, acc))
    }

    /// Resolve several root dependencies and merge the validators of every
    /// package in their closures into a [`Snapshot`].
    pub async fn snapshot(&self, deps: Vec<Dependency>) -> Result<Snapshot> {
        self.snapshot_with(deps, CancellationToken::new()).await
    }

    /// Like [`Manager::snapshot`], cooperatively cancellable through `cancel`.
    pub async fn snapshot_with(
        &self,
        deps: Vec<Dependency>,
        cancel: CancellationToken,
    ) -> Result<Snapshot> {
        let mut run = Run::new(cancel);
        let mut acc = Accumulator::new();
        for dep in deps {
            self.resolve_closure(dep, &mut run, &mut acc).await?;
        }
        Ok(Snapshot::from_accumulator(&acc))
    }

    /// Walk one root and everything reachable from it, appending each
    /// package to `acc`. The traversal is an explicit depth-first worklist;
    /// each frame carries its ancestor chain so a revisit on the current
    /// path fails as [`Error::CyclicDependency`] instead of recursing
    /// forever. A failure anywhere in the walk, root included, aborts the
    /// walk and propagates.
    async fn resolve_closure(
        &self,
        root: Dependency,
        run: &mut Run,
        acc: &mut Accumulator,
    ) -> Result<Dependency> {
        info!(package = %root.package, constraints = %root.constraints, "resolving dependency closure");
        run.checkpoint()?;

        let mut resolved = root;
        self.finalize(&mut resolved, run).await?;
        let root_key = resolved.key();

        let root_pkg = self.lookup_or_retrieve(&resolved, &root_key, run).await?;
        acc.push(Arc::clone(&root_pkg));
        resolved.kind = root_pkg.kind();

        let chain = Arc::new(vec![root_key]);
        let mut stack: Vec<Frame> = frames_for(&root_pkg, &chain);

        while let Some(Frame { mut dep, chain }) = stack.pop() {
            run.checkpoint()?;

            self.finalize(&mut dep, run).await?;
            let key = dep.key();

            if chain.contains(&key) {
                let mut cycle = (*chain).clone();
                cycle.push(key);
                return Err(Error::cycle(cycle));
            }

            let pkg = self.lookup_or_retrieve(&dep, &key, run).await?;
            acc.push(Arc::clone(&pkg));

            let child_chain = Arc::new({
                let mut c = (*chain).clone();
                c.push(key);
                c
            });
            stack.extend(frames_for(&pkg, &child_chain));
        }

        debug!(root = %resolved, packages = acc.len(), "closure resolved");
        Ok(resolved)
    }

    /// Serve a finalized identity from this run's visited set, or retrieve
    /// it through cache and registry and remember it.
    async fn lookup_or_retrieve(
        &self,
        dep: &Dependency,
        key: &str,
        run: &mut Run,
    ) -> Result<Arc<ParsedPackage>> {
        if let Some(seen) = run.visited.get(key) {
            trace!(%key, "repeat encounter, serving from this run");
            return Ok(Arc::clone(seen));
        }
        let pkg = self.retrieve(dep, run).await?;
        run.visited.insert(key.to_string(), Arc::clone(&pkg));
        Ok(pkg)
    }

    /// Produce the package for a finalized identity: from the cache when its
    /// digest still matches the registry, freshly fetched otherwise. A cache
    /// miss triggers the fetch path; any other cache failure propagates.
    async fn retrieve(&self, dep: &Dependency, run: &Run) -> Result<Arc<ParsedPackage>> {
        match self.cache.get(dep).await {
            Ok(cached) => {
                // Digest equality against the registry is the sole freshness
                // oracle; versions and timestamps are never consulted.
                let digest = self
                    .external("digest resolve", run, self.resolver.resolve_digest(dep))
                    .await?;
                if cached.digest() == digest {
                    trace!(key = %dep.key(), %digest, "cache entry is current");
                    Ok(cached)
                } else {
                    debug!(
                        key = %dep.key(),
                        cached = %cached.digest(),
                        registry = %digest,
                        "digest changed, refreshing"
                    );
                    self.refresh(dep, run).await
                }
            }
            Err(e) if e.is_not_found() => {
                trace!(key = %dep.key(), "not cached, fetching");
                self.refresh(dep, run).await
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch, parse and write through to the cache, overwriting any stale
    /// entry for the identity.
    async fn refresh(&self, dep: &Dependency, run: &Run) -> Result<Arc<ParsedPackage>> {
        let image = self
            .external("fetch", run, self.resolver.fetch(dep))
            .await?;
        let pkg = self.marshaler.parse(&dep.package, image).await?;
        self.cache.store(dep, Arc::clone(&pkg)).await?;
        debug!(key = %dep.key(), digest = %pkg.digest(), "stored fresh package");
        Ok(pkg)
    }

    /// Replace the constraint with the concrete version chosen by the
    /// resolver. Must precede any cache lookup or fetch for the identity.
    async fn finalize(&self, dep: &mut Dependency, run: &Run) -> Result<()> {
        let version = self
            .external("tag resolve", run, self.resolver.resolve_tag(dep))
            .await?;
        trace!(package = %dep.package, constraints = %dep.constraints, %version, "finalized");
        dep.finalize(version);
        Ok(())
    }

    /// Race an external call against cancellation and the configured
    /// deadline.
    async fn external<T>(
        &self,
        operation: &'static str,
        run: &Run,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let bounded = async {
            match self.call_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::timeout(operation, limit)),
                },
                None => call.await,
            }
        };
        tokio::select! {
            () = run.cancel.cancelled() => Err(Error::Cancelled),
            result = bounded => result,
        }
    }
}

/// Traversal frames for a package's declared dependencies, pushed in reverse
/// so the first declared dependency is resolved first.
fn frames_for(pkg: &ParsedPackage, chain: &Arc<Vec<String>>) -> Vec<Frame> {
    pkg.dependencies()
        .iter()
        .rev()
        .map(|child| Frame {
            dep: child.clone(),
            chain: Arc::clone(chain),
        })
        .collect()
}
