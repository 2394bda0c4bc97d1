//! Command execution: wires the cache, registry and manager together.

use crate::cli::{Cli, Command};
use depot_cache::LocalCache;
use depot_core::{Dependency, Error};
use depot_manager::Manager;
use depot_oci::{ImageMarshaler, OciResolver};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One resolved package in a report.
#[derive(Debug, Serialize)]
struct PackageReport {
    package: String,
    kind: String,
    version: String,
    digest: String,
    dependencies: usize,
}

/// Output of `depot resolve`.
#[derive(Debug, Serialize)]
struct ResolveReport {
    resolved: Dependency,
    packages: Vec<PackageReport>,
}

/// Run the parsed command to completion.
pub async fn run(cli: Cli, cancel: CancellationToken) -> miette::Result<()> {
    let manager = build_manager(&cli);

    match cli.command {
        Command::Resolve { spec } => {
            let dep = Dependency::parse(&spec);
            let (resolved, acc) = manager.resolve_with(dep, cancel).await?;
            let report = ResolveReport {
                resolved,
                packages: acc
                    .iter()
                    .map(|p| PackageReport {
                        package: p.package().to_string(),
                        kind: p.kind().to_string(),
                        version: p.version().to_string(),
                        digest: p.digest().to_string(),
                        dependencies: p.dependencies().len(),
                    })
                    .collect(),
            };
            println!("{}", render(&report)?);
        }
        Command::Snapshot { specs } => {
            let deps = specs.iter().map(|s| Dependency::parse(s)).collect();
            let snapshot = manager.snapshot_with(deps, cancel).await?;
            let view: serde_json::Map<String, serde_json::Value> = snapshot
                .view()
                .iter()
                .map(|(type_id, validator)| (type_id.to_string(), validator.schema().clone()))
                .collect();
            println!("{}", render(&view)?);
        }
    }

    Ok(())
}

fn build_manager(cli: &Cli) -> Manager {
    let cache = cli
        .cache_dir
        .clone()
        .map_or_else(LocalCache::default, LocalCache::new);
    tracing::debug!(root = %cache.root().display(), "using package cache");

    let mut manager = Manager::new(
        Arc::new(cache),
        Arc::new(OciResolver::new()),
        Arc::new(ImageMarshaler::new()),
    );
    if let Some(seconds) = cli.call_timeout {
        manager = manager.with_call_timeout(Duration::from_secs(seconds));
    }
    manager
}

fn render<T: Serialize>(value: &T) -> miette::Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::serialization(format!("render report: {e}")).into())
}
