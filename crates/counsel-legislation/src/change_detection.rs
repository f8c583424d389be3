//! Periodic, best-effort change detection (§4.3): snapshot the dataset
//! statistics, diff against the most recently persisted snapshot, and
//! report what changed. Snapshots are timestamped files so a restart does
//! not lose history.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::DatasetStatistics;

/// One detected change between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasetChange {
    CollectionAdded { name: String, count: u64 },
    CollectionRemoved { name: String, count: u64 },
    CollectionCountChanged { name: String, previous: u64, current: u64 },
    TotalItemsChanged { previous: u64, current: u64 },
}

/// Diffs two statistics snapshots, reporting every collection-level and
/// total-level change. Order is deterministic: total first, then
/// collections in sorted key order (both maps are `BTreeMap`s).
pub fn diff(previous: &DatasetStatistics, current: &DatasetStatistics) -> Vec<DatasetChange> {
    let mut changes = Vec::new();

    if previous.total_items != current.total_items {
        changes.push(DatasetChange::TotalItemsChanged {
            previous: previous.total_items,
            current: current.total_items,
        });
    }

    for (name, &count) in &current.collections {
        match previous.collections.get(name) {
            None => changes.push(DatasetChange::CollectionAdded { name: name.clone(), count }),
            Some(&prev_count) if prev_count != count => changes.push(DatasetChange::CollectionCountChanged {
                name: name.clone(),
                previous: prev_count,
                current: count,
            }),
            _ => {}
        }
    }

    for (name, &count) in &previous.collections {
        if !current.collections.contains_key(name) {
            changes.push(DatasetChange::CollectionRemoved { name: name.clone(), count });
        }
    }

    changes
}

/// Persists snapshots as timestamped JSON files under a directory and
/// recovers the most recent one on startup.
pub struct SnapshotStore {
    directory: PathBuf,
}

impl SnapshotStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    fn file_name(at: DateTime<Utc>) -> String {
        format!("snapshot-{}.json", at.format("%Y%m%dT%H%M%S%.fZ"))
    }

    /// Writes a new snapshot file, named by `at`.
    pub fn persist(&self, snapshot: &DatasetStatistics, at: DateTime<Utc>) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(Self::file_name(at));
        let body = serde_json::to_vec_pretty(snapshot)?;
        std::fs::write(path, body)
    }

    /// Loads the lexicographically last snapshot file (timestamps sort as
    /// strings because the file name format is fixed-width), or `None` if
    /// the directory has never been written to.
    pub fn load_latest(&self) -> std::io::Result<Option<DatasetStatistics>> {
        if !self.directory.exists() {
            return Ok(None);
        }
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&self.directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        entries.sort();
        let Some(latest) = entries.pop() else { return Ok(None) };
        Self::read_snapshot(&latest)
    }

    fn read_snapshot(path: &Path) -> std::io::Result<Option<DatasetStatistics>> {
        let body = std::fs::read(path)?;
        Ok(serde_json::from_slice(&body).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: u64, collections: &[(&str, u64)]) -> DatasetStatistics {
        DatasetStatistics {
            total_items: total,
            collections: collections.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            last_updated: None,
        }
    }

    #[test]
    fn no_changes_when_snapshots_are_identical() {
        let a = stats(100, &[("ukpga", 50), ("uksi", 50)]);
        assert!(diff(&a, &a.clone()).is_empty());
    }

    #[test]
    fn detects_new_amended_and_removed_collections() {
        let previous = stats(100, &[("ukpga", 50), ("uksi", 50)]);
        let current = stats(130, &[("ukpga", 60), ("asp", 20)]);
        let changes = diff(&previous, &current);
        assert!(changes.contains(&DatasetChange::TotalItemsChanged { previous: 100, current: 130 }));
        assert!(changes.contains(&DatasetChange::CollectionCountChanged {
            name: "ukpga".to_string(),
            previous: 50,
            current: 60
        }));
        assert!(changes.contains(&DatasetChange::CollectionAdded { name: "asp".to_string(), count: 20 }));
        assert!(changes.contains(&DatasetChange::CollectionRemoved { name: "uksi".to_string(), count: 50 }));
    }

    #[test]
    fn snapshot_round_trips_through_the_store() {
        let dir = std::env::temp_dir().join(format!("counsel-legislation-test-{}", uuid_like()));
        let store = SnapshotStore::new(&dir);
        assert!(store.load_latest().unwrap().is_none());

        let snapshot = stats(42, &[("ukpga", 42)]);
        let at = DateTime::parse_from_rfc3339("2026-08-01T12:00:00Z").unwrap().with_timezone(&Utc);
        store.persist(&snapshot, at).unwrap();

        let loaded = store.load_latest().unwrap().unwrap();
        assert_eq!(loaded, snapshot);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_latest_picks_the_most_recent_of_several_snapshots() {
        let dir = std::env::temp_dir().join(format!("counsel-legislation-test-{}", uuid_like()));
        let store = SnapshotStore::new(&dir);

        let early = DateTime::parse_from_rfc3339("2026-08-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2026-08-01T23:00:00Z").unwrap().with_timezone(&Utc);
        store.persist(&stats(1, &[]), early).unwrap();
        store.persist(&stats(2, &[]), late).unwrap();

        let loaded = store.load_latest().unwrap().unwrap();
        assert_eq!(loaded.total_items, 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    fn uuid_like() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        format!("{}", SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos())
    }
}
