//! Deferred deletion of uploaded files.
//!
//! Deletion waits until the response has finished so nothing still being
//! written to the client can reference a removed file. Failures are logged
//! and counted, never returned.

mod finish;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::form::NestedTree;
use crate::observability::Metrics;

pub use finish::{FinishSignal, Finished, NotifyOnFinish, finish_signal};

/// Which uploads to delete once the response is done.
///
/// Deserializes from `false`/`"none"`, `true`/`"all"`, or a list of
/// top-level file field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "PolicyRepr", into = "PolicyRepr")]
pub enum DeletePolicy {
    #[default]
    None,
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum PolicyRepr {
    Flag(bool),
    Keyword(String),
    Names(Vec<String>),
}

impl TryFrom<PolicyRepr> for DeletePolicy {
    type Error = String;

    fn try_from(repr: PolicyRepr) -> Result<Self, Self::Error> {
        match repr {
            PolicyRepr::Flag(true) => Ok(DeletePolicy::All),
            PolicyRepr::Flag(false) => Ok(DeletePolicy::None),
            PolicyRepr::Keyword(word) => match word.to_ascii_lowercase().as_str() {
                "all" | "true" => Ok(DeletePolicy::All),
                "none" | "false" | "" => Ok(DeletePolicy::None),
                other => Err(format!(
                    "delete_on_finish must be a boolean, \"all\", \"none\" or a list of names, got '{other}'"
                )),
            },
            PolicyRepr::Names(names) if names.is_empty() => Ok(DeletePolicy::None),
            PolicyRepr::Names(names) => Ok(DeletePolicy::Named(names)),
        }
    }
}

impl From<DeletePolicy> for PolicyRepr {
    fn from(policy: DeletePolicy) -> Self {
        match policy {
            DeletePolicy::None => PolicyRepr::Flag(false),
            DeletePolicy::All => PolicyRepr::Flag(true),
            DeletePolicy::Named(names) => PolicyRepr::Names(names),
        }
    }
}

/// Outcome of one cleanup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Paths of the uploads selected by `policy`. Names missing from `files`
/// select nothing.
pub fn collect_paths(policy: &DeletePolicy, files: &NestedTree) -> Vec<PathBuf> {
    let selected: Vec<&NestedTree> = match policy {
        DeletePolicy::None => return Vec::new(),
        DeletePolicy::All => vec![files],
        DeletePolicy::Named(names) => names.iter().filter_map(|name| files.get(name)).collect(),
    };

    let mut seen = HashSet::new();
    selected
        .into_iter()
        .flat_map(NestedTree::files)
        .map(|handle| handle.path.clone())
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Spawns a task that deletes `paths` after the returned signal fires.
///
/// Returns `None` when there is nothing to delete.
pub fn schedule(
    paths: Vec<PathBuf>,
    metrics: Arc<Metrics>,
) -> Option<(FinishSignal, JoinHandle<CleanupReport>)> {
    if paths.is_empty() {
        return None;
    }

    let (signal, finished) = finish_signal();
    let handle = tokio::spawn(async move {
        finished.wait().await;

        let results = join_all(paths.iter().map(tokio::fs::remove_file)).await;
        let mut report = CleanupReport::default();

        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(()) => {
                    report.deleted += 1;
                    metrics.file_deleted();
                }
                Err(err) => {
                    report.failed += 1;
                    metrics.cleanup_failed();
                    warn!(path = %path.display(), error = %err, "Failed to delete upload");
                }
            }
        }

        debug!(deleted = report.deleted, failed = report.failed, "Upload cleanup finished");
        report
    });

    Some((signal, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{EntryAggregator, FileHandle, decode};
    use tempfile::TempDir;

    fn files_tree(dir: &TempDir, names: &[&str]) -> NestedTree {
        let mut agg = EntryAggregator::new();
        for name in names {
            let path = dir.path().join(name.replace(['[', ']'], "_"));
            std::fs::write(&path, b"data").unwrap();
            agg.record(
                *name,
                FileHandle {
                    field_name: name.to_string(),
                    original_filename: format!("{name}.txt"),
                    path,
                    size: 4,
                    content_type: None,
                },
            );
        }
        decode(agg.into_flat_map()).unwrap()
    }

    #[test]
    fn test_policy_deserializes_from_all_shapes() {
        let parse = |s: &str| serde_json::from_str::<DeletePolicy>(s).unwrap();

        assert_eq!(parse("true"), DeletePolicy::All);
        assert_eq!(parse("false"), DeletePolicy::None);
        assert_eq!(parse("\"all\""), DeletePolicy::All);
        assert_eq!(parse("\"none\""), DeletePolicy::None);
        assert_eq!(parse("[]"), DeletePolicy::None);
        assert_eq!(
            parse("[\"avatar\", \"docs\"]"),
            DeletePolicy::Named(vec!["avatar".into(), "docs".into()])
        );
        assert!(serde_json::from_str::<DeletePolicy>("\"some\"").is_err());
    }

    #[test]
    fn test_collect_paths_by_policy() {
        let dir = TempDir::new().unwrap();
        let files = files_tree(&dir, &["avatar", "docs[a]", "docs[b]"]);

        assert!(collect_paths(&DeletePolicy::None, &files).is_empty());
        assert_eq!(collect_paths(&DeletePolicy::All, &files).len(), 3);

        let named = DeletePolicy::Named(vec!["docs".into(), "missing".into(), "docs".into()]);
        let paths = collect_paths(&named, &files);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.file_name().unwrap().to_string_lossy().starts_with("docs")));
    }

    #[tokio::test]
    async fn test_deletes_only_after_finish() {
        let dir = TempDir::new().unwrap();
        let files = files_tree(&dir, &["avatar"]);
        let paths = collect_paths(&DeletePolicy::All, &files);
        let metrics = Arc::new(Metrics::new());

        let (mut signal, handle) = schedule(paths.clone(), metrics.clone()).unwrap();
        tokio::task::yield_now().await;
        assert!(paths[0].exists());

        signal.fire();
        let report = handle.await.unwrap();

        assert_eq!(report, CleanupReport { deleted: 1, failed: 0 });
        assert!(!paths[0].exists());
        assert_eq!(metrics.snapshot().files_deleted, 1);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let dir = TempDir::new().unwrap();
        let metrics = Arc::new(Metrics::new());
        let missing = dir.path().join("already-gone");

        let (signal, handle) = schedule(vec![missing], metrics.clone()).unwrap();
        drop(signal);
        let report = handle.await.unwrap();

        assert_eq!(report, CleanupReport { deleted: 0, failed: 1 });
        assert_eq!(metrics.snapshot().cleanup_failures, 1);
    }

    #[test]
    fn test_nothing_to_schedule() {
        assert!(schedule(Vec::new(), Arc::new(Metrics::new())).is_none());
    }
}
