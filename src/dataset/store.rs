use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::types::{ChainId, PoolStatSnapshot, PoolVersion, RosterEntry, SnapshotDate};

/// A record with a composite identity inside its dataset.
pub trait Keyed {
    type Key: PartialEq + std::fmt::Debug;

    fn key(&self) -> Self::Key;

    fn snapshot_date(&self) -> SnapshotDate;
}

impl Keyed for PoolStatSnapshot {
    type Key = (SnapshotDate, ChainId, PoolVersion);

    fn key(&self) -> Self::Key {
        (self.snapshot_date, self.chain, self.version)
    }

    fn snapshot_date(&self) -> SnapshotDate {
        self.snapshot_date
    }
}

impl Keyed for RosterEntry {
    /// Address lowercased: checksummed and plain hex spellings are the same holder.
    type Key = (SnapshotDate, String);

    fn key(&self) -> Self::Key {
        (self.snapshot_date, self.holder_address.to_ascii_lowercase())
    }

    fn snapshot_date(&self) -> SnapshotDate {
        self.snapshot_date
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Replaced the record at this index.
    Replaced(usize),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub replaced: usize,
    pub removed: usize,
}

/// Replace the record sharing `new`'s key in place, or append it.
pub fn upsert<T: Keyed>(records: &mut Vec<T>, new: T) -> UpsertOutcome {
    let key = new.key();
    match records.iter().position(|r| r.key() == key) {
        Some(idx) => {
            records[idx] = new;
            UpsertOutcome::Replaced(idx)
        }
        None => {
            records.push(new);
            UpsertOutcome::Inserted
        }
    }
}

/// Sequential `upsert` of every record, each against the evolving sequence.
pub fn upsert_all<T: Keyed>(records: &mut Vec<T>, new: impl IntoIterator<Item = T>) -> MergeSummary {
    let mut summary = MergeSummary::default();
    for rec in new {
        match upsert(records, rec) {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Replaced(_) => summary.replaced += 1,
        }
    }
    summary
}

/// Make `new` the complete set of records for `date`: upsert each, then drop
/// any other record for `date` the new set did not produce. Records for other
/// dates are untouched.
pub fn replace_date<T: Keyed>(records: &mut Vec<T>, date: SnapshotDate, new: Vec<T>) -> MergeSummary {
    let keep: Vec<T::Key> = new.iter().map(|r| r.key()).collect();
    let mut summary = upsert_all(records, new);
    let before = records.len();
    records.retain(|r| r.snapshot_date() != date || keep.contains(&r.key()));
    summary.removed = before - records.len();
    summary
}

/// A JSON-array dataset file.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the dataset. A missing or unreadable file yields an empty sequence;
    /// an unparsable file is first copied aside (see [`Self::preserve`]).
    pub async fn load<T: DeserializeOwned>(&self) -> Vec<T> {
        let Some(bytes) = self.read_bytes().await else {
            return Vec::new();
        };
        match self.parse(&bytes) {
            Some(records) => records,
            None => {
                self.preserve(&bytes).await;
                Vec::new()
            }
        }
    }

    /// Like [`Self::load`] but never touches the filesystem beyond reading.
    pub async fn read<T: DeserializeOwned>(&self) -> Vec<T> {
        match self.read_bytes().await {
            Some(bytes) => self.parse(&bytes).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    async fn read_bytes(&self) -> Option<Vec<u8>> {
        match tokio::fs::read(&self.path).await {
            Ok(b) => Some(b),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "dataset not found, starting empty");
                None
            }
            Err(e) => {
                error!(path = %self.path.display(), "Error reading existing data: {e}");
                None
            }
        }
    }

    fn parse<T: DeserializeOwned>(&self, bytes: &[u8]) -> Option<Vec<T>> {
        match serde_json::from_slice::<Vec<T>>(bytes) {
            Ok(records) => {
                debug!(path = %self.path.display(), count = records.len(), "dataset loaded");
                Some(records)
            }
            Err(e) => {
                error!(path = %self.path.display(), "Error parsing existing data: {e}");
                None
            }
        }
    }

    /// Copy unparsable bytes to `<file>.corrupt`, or `<file>.corrupt.N` if
    /// earlier copies exist. Earlier copies are never overwritten.
    async fn preserve(&self, bytes: &[u8]) {
        let mut aside = self.sibling("corrupt");
        let mut n = 1u32;
        while tokio::fs::try_exists(&aside).await.unwrap_or(false) {
            aside = self.sibling(&format!("corrupt.{n}"));
            n += 1;
        }
        match tokio::fs::write(&aside, bytes).await {
            Ok(()) => warn!("Unreadable dataset preserved at {}", aside.display()),
            Err(e) => error!("Could not preserve unreadable dataset at {}: {e}", aside.display()),
        }
    }

    /// Serialize the full sequence (pretty-printed) to `<file>.tmp`, then
    /// rename it over the target so readers never see a partial file.
    pub async fn save<T: Serialize>(&self, records: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.sibling("tmp");
        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        info!(path = %self.path.display(), count = records.len(), "Data written to {}", self.path.display());
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> SnapshotDate {
        s.parse().unwrap()
    }

    fn stat(date: &str, chain: ChainId, version: PoolVersion, stakers: u64) -> PoolStatSnapshot {
        PoolStatSnapshot {
            snapshot_date: d(date),
            resolved_height: 1,
            chain,
            version,
            staker_count: stakers,
            total_staked: 10,
        }
    }

    fn entry(date: &str, addr: &str, vote: u128) -> RosterEntry {
        RosterEntry {
            snapshot_date: d(date),
            holder_address: addr.to_string(),
            pos_amount: 0,
            token_amount: 0,
            voting_weight: vote,
        }
    }

    #[test]
    fn upsert_twice_keeps_one_record_with_latest_value() {
        let mut records = Vec::new();
        assert_eq!(upsert(&mut records, stat("20250101", ChainId::Core, PoolVersion::V1, 5)), UpsertOutcome::Inserted);
        assert_eq!(
            upsert(&mut records, stat("20250101", ChainId::Core, PoolVersion::V1, 9)),
            UpsertOutcome::Replaced(0)
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].staker_count, 9);
    }

    #[test]
    fn upsert_preserves_unrelated_records_and_positions() {
        let mut records = vec![
            stat("20250101", ChainId::Core, PoolVersion::V1, 1),
            stat("20250101", ChainId::Espace, PoolVersion::V1, 2),
            stat("20250101", ChainId::Espace, PoolVersion::V2, 3),
        ];
        upsert(&mut records, stat("20250101", ChainId::Espace, PoolVersion::V1, 20));
        upsert(&mut records, stat("20250111", ChainId::Espace, PoolVersion::V1, 4));
        let counts: Vec<u64> = records.iter().map(|r| r.staker_count).collect();
        assert_eq!(counts, vec![1, 20, 3, 4]);
    }

    #[test]
    fn upsert_all_applies_sequentially() {
        let mut records = vec![entry("20250224", "0xaa", 1)];
        let summary = upsert_all(
            &mut records,
            vec![entry("20250224", "0xbb", 2), entry("20250224", "0xBB", 3), entry("20250224", "0xAA", 4)],
        );
        assert_eq!(summary, MergeSummary { inserted: 1, replaced: 2, removed: 0 });
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].voting_weight, 4);
        assert_eq!(records[1].voting_weight, 3);
    }

    #[test]
    fn replace_date_drops_stale_entries_for_that_date_only() {
        let mut records = vec![
            entry("20250209", "0xaa", 1),
            entry("20250224", "0xaa", 2),
            entry("20250224", "0xgone", 3),
            entry("20250209", "0xgone", 4),
        ];
        let summary = replace_date(&mut records, d("20250224"), vec![entry("20250224", "0xAa", 20), entry("20250224", "0xcc", 5)]);
        assert_eq!(summary, MergeSummary { inserted: 1, replaced: 1, removed: 1 });
        let keys: Vec<(String, String)> = records
            .iter()
            .map(|r| (r.snapshot_date.to_string(), r.holder_address.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("20250209".to_string(), "0xaa".to_string()),
                ("20250224".to_string(), "0xAa".to_string()),
                ("20250209".to_string(), "0xgone".to_string()),
                ("20250224".to_string(), "0xcc".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("none.json"));
        let records: Vec<PoolStatSnapshot> = store.load().await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("nested").join("poolStats.json"));
        let records = vec![
            stat("20250111", ChainId::Espace, PoolVersion::V2, 7),
            stat("20250101", ChainId::Core, PoolVersion::V1, 3),
        ];
        store.save(&records).await.unwrap();
        let loaded: Vec<PoolStatSnapshot> = store.load().await;
        assert_eq!(loaded, records);
        assert!(!dir.path().join("nested").join("poolStats.json.tmp").exists());

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("[\n"), "pretty-printed array expected");
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty_and_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poolStats.json");
        std::fs::write(&path, b"[{\"snapshotDate\": \"2025").unwrap();
        let store = DatasetStore::new(&path);
        let records: Vec<PoolStatSnapshot> = store.load().await;
        assert!(records.is_empty());
        let aside = std::fs::read(dir.path().join("poolStats.json.corrupt")).unwrap();
        assert_eq!(aside, b"[{\"snapshotDate\": \"2025");
    }

    #[tokio::test]
    async fn later_corruption_does_not_overwrite_earlier_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poolStats.json");
        let store = DatasetStore::new(&path);

        std::fs::write(&path, b"first").unwrap();
        let _: Vec<PoolStatSnapshot> = store.load().await;
        std::fs::write(&path, b"second").unwrap();
        let _: Vec<PoolStatSnapshot> = store.load().await;

        assert_eq!(std::fs::read(dir.path().join("poolStats.json.corrupt")).unwrap(), b"first");
        assert_eq!(std::fs::read(dir.path().join("poolStats.json.corrupt.1")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn read_leaves_corrupt_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poolStats.json");
        std::fs::write(&path, b"not json").unwrap();
        let store = DatasetStore::new(&path);

        let records: Vec<PoolStatSnapshot> = store.read().await;
        assert!(records.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"not json");
    }

    #[tokio::test]
    async fn two_runs_same_key_leave_second_value_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("poolStats.json"));
        for stakers in [10, 11] {
            let mut records: Vec<PoolStatSnapshot> = store.load().await;
            upsert(&mut records, stat("20250121", ChainId::Espace, PoolVersion::V1, stakers));
            store.save(&records).await.unwrap();
        }
        let records: Vec<PoolStatSnapshot> = store.load().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].staker_count, 11);
    }
}
