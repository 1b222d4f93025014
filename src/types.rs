use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Chain / pool identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Core,
    Espace,
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChainId::Core => "core",
            ChainId::Espace => "espace",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolVersion {
    V1,
    V2,
}

impl std::fmt::Display for PoolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PoolVersion::V1 => "v1",
            PoolVersion::V2 => "v2",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// SnapshotDate
// ---------------------------------------------------------------------------

/// Civil calendar date, serialized as an 8-digit `YYYYMMDD` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotDate(NaiveDate);

impl SnapshotDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for SnapshotDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

impl FromStr for SnapshotDate {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::Date(format!("expected YYYYMMDD, got {s:?}")));
        }
        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map(Self)
            .map_err(|e| AppError::Date(format!("invalid date {s:?}: {e}")))
    }
}

impl TryFrom<String> for SnapshotDate {
    type Error = AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SnapshotDate> for String {
    fn from(d: SnapshotDate) -> Self {
        d.to_string()
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// One pool's statistics at the block matching a snapshot date.
/// Identity: (snapshot_date, chain, version).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatSnapshot {
    pub snapshot_date: SnapshotDate,
    #[serde(rename = "epochNumber")]
    pub resolved_height: u64,
    pub chain: ChainId,
    pub version: PoolVersion,
    #[serde(rename = "stakerNumber")]
    pub staker_count: u64,
    #[serde(rename = "totalPOS")]
    pub total_staked: u128,
}

/// One stake-holder's voting weight on a snapshot date.
/// Identity: (snapshot_date, holder_address), address compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub snapshot_date: SnapshotDate,
    #[serde(rename = "espaceAddr")]
    pub holder_address: String,
    pub pos_amount: u128,
    #[serde(rename = "abcAmount")]
    pub token_amount: u128,
    #[serde(rename = "vote")]
    pub voting_weight: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> SnapshotDate {
        SnapshotDate::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn snapshot_date_formats_as_eight_digits() {
        assert_eq!(date(2025, 2, 9).to_string(), "20250209");
    }

    #[test]
    fn snapshot_date_rejects_malformed_strings() {
        assert!("2025029".parse::<SnapshotDate>().is_err());
        assert!("2025-02-09".parse::<SnapshotDate>().is_err());
        assert!("20250230".parse::<SnapshotDate>().is_err());
    }

    #[test]
    fn pool_stat_uses_dataset_field_names() {
        let rec = PoolStatSnapshot {
            snapshot_date: date(2025, 1, 11),
            resolved_height: 123,
            chain: ChainId::Espace,
            version: PoolVersion::V2,
            staker_count: 42,
            total_staked: 9000,
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["snapshotDate"], "20250111");
        assert_eq!(v["epochNumber"], 123);
        assert_eq!(v["chain"], "espace");
        assert_eq!(v["version"], "v2");
        assert_eq!(v["stakerNumber"], 42);
        assert_eq!(v["totalPOS"], 9000);
    }

    #[test]
    fn roster_entry_reads_existing_dataset_row() {
        let raw = r#"{"snapshotDate":"20250224","espaceAddr":"0xAbC","posAmount":5000,"abcAmount":400,"vote":1}"#;
        let e: RosterEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(e.snapshot_date, date(2025, 2, 24));
        assert_eq!(e.holder_address, "0xAbC");
        assert_eq!(e.token_amount, 400);
        assert_eq!(e.voting_weight, 1);
    }
}
