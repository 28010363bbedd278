//! Explicit artifact pruning.
//!
//! Ingestion never deletes anything; old captures accumulate until
//! `tabr prune` is run. Pruning keeps the newest `keep` artifacts by the
//! timestamp embedded in their file names and always keeps the artifact the
//! latest pointer names.

use anyhow::Result;

use crate::store::TabStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: Vec<String>,
    pub removed: Vec<String>,
}

/// Sort key for an artifact name: the timestamp and the collision counter
/// (0 when there is none).
///
/// `tabs_2024-05-01T10-00-00.000001-1.json` → `("2024-05-01T10-00-00.000001", 1)`
/// `tab_2024-05-01T10-00-00.000001_https_a.dev.json` → `("2024-05-01T10-00-00.000001", 0)`
pub fn artifact_sort_key(name: &str) -> (&str, u64) {
    let rest = name
        .strip_prefix("tabs_")
        .or_else(|| name.strip_prefix("tab_"))
        .unwrap_or(name);
    let rest = rest.strip_suffix(".json").unwrap_or(rest);
    let segment = rest.split('_').next().unwrap_or(rest);

    // The timestamp's own last `-` is followed by `SS.ffffff`, never digits only.
    match segment.rsplit_once('-') {
        Some((ts, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => {
            (ts, n.parse().unwrap_or(u64::MAX))
        }
        _ => (segment, 0),
    }
}

pub async fn prune(store: &dyn TabStore, keep: usize, dry_run: bool) -> Result<PruneReport> {
    if keep == 0 {
        anyhow::bail!("keep must be >= 1");
    }

    let latest = store.read_latest().await?.map(|p| p.filename);

    let mut names = store.list_artifacts().await?;
    // Newest first.
    names.sort_by(|a, b| artifact_sort_key(b).cmp(&artifact_sort_key(a)).then(b.cmp(a)));

    let mut report = PruneReport::default();
    for (i, name) in names.into_iter().enumerate() {
        if i < keep || latest.as_deref() == Some(name.as_str()) {
            report.kept.push(name);
        } else {
            report.removed.push(name);
        }
    }

    if !dry_run {
        for name in &report.removed {
            store.remove_artifact(name).await?;
            tracing::info!(filename = %name, "removed artifact");
        }
    }

    Ok(report)
}

/// CLI entry point for `tabr prune`.
pub async fn run_prune(store: &dyn TabStore, keep: usize, dry_run: bool) -> Result<()> {
    let report = prune(store, keep, dry_run).await?;

    if dry_run {
        println!("prune (dry-run)");
    } else {
        println!("prune");
    }
    println!("  kept: {}", report.kept.len());
    println!("  removed: {}", report.removed.len());
    for name in &report.removed {
        println!("    {}", name);
    }
    println!("ok");
    Ok(())
}
