// src/watch/event_handler.rs

//! Maps raw notify events onto per-class triggers.

use std::collections::BTreeMap;
use std::path::Path;

use notify::{Event, EventKind};
use tracing::{debug, warn};

use crate::types::AssetClass;
use crate::watch::WatchTrigger;
use crate::watch::patterns::WatchBinding;

/// Create, modify and remove events re-run tasks; access events never do.
pub fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Classes to re-run for one notify event.
///
/// A class appears at most once per event even when several of the event's
/// paths match it (e.g. both sides of a rename).
pub fn triggers_for_event(root: &Path, event: &Event, bindings: &[WatchBinding]) -> Vec<WatchTrigger> {
    if !is_relevant(&event.kind) {
        return Vec::new();
    }

    let mut hits: BTreeMap<AssetClass, String> = BTreeMap::new();
    for path in &event.paths {
        let Some(rel) = relative_to(root, path) else {
            warn!(?path, ?root, "event path is outside of the project root");
            continue;
        };
        for binding in bindings.iter().filter(|b| b.matches(&rel)) {
            hits.entry(binding.class()).or_insert_with(|| rel.clone());
        }
    }

    if !hits.is_empty() {
        debug!(kind = ?event.kind, classes = ?hits.keys().collect::<Vec<_>>(), "watch match");
    }
    hits.into_iter()
        .map(|(class, rel_path)| WatchTrigger { class, rel_path })
        .collect()
}

/// `path` relative to `root` with forward slashes.
///
/// Falls back to comparing canonical paths, which matters where the watcher
/// reports a different absolute prefix for the same directory (macOS
/// `/private/var`).
fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let to_string = |rel: &Path| rel.to_string_lossy().replace('\\', "/");
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_string(rel));
    }
    let root = root.canonicalize().ok()?;
    // Removed files cannot be canonicalized; canonicalize the parent instead.
    let canonical = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => path.parent()?.canonicalize().ok()?.join(path.file_name()?),
    };
    canonical.strip_prefix(&root).ok().map(to_string)
}
