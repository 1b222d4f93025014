use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ChainId, PoolStatSnapshot, PoolVersion, RosterEntry, SnapshotDate};

/// Displayed pool totals are divided by this.
pub const POS_DISPLAY_DIVISOR: f64 = 10.0;

/// Per-date chart data for one series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolSeries {
    pub dates: Vec<String>,
    pub staker_numbers: Vec<u64>,
    /// Pool totals scaled for display; fractional tenths are kept.
    pub pos_amounts: Vec<f64>,
}

/// Series label for a record, e.g. "v1 core".
pub fn series_label(version: PoolVersion, chain: ChainId) -> String {
    format!("{version} {chain}")
}

/// The v1 core pool holds the v1 eSpace pool's stake too; its total is
/// reported net of the same-date v1 eSpace total.
pub fn net_v1_core(records: &[PoolStatSnapshot]) -> Vec<PoolStatSnapshot> {
    let v1_espace: BTreeMap<SnapshotDate, u128> = records
        .iter()
        .filter(|r| r.version == PoolVersion::V1 && r.chain == ChainId::Espace)
        .map(|r| (r.snapshot_date, r.total_staked))
        .collect();

    records
        .iter()
        .map(|r| {
            let mut r = r.clone();
            if r.version == PoolVersion::V1 && r.chain == ChainId::Core {
                if let Some(espace) = v1_espace.get(&r.snapshot_date) {
                    r.total_staked = r.total_staked.saturating_sub(*espace);
                }
            }
            r
        })
        .collect()
}

/// Chart data for `series` ("All" or a label from [`series_label`]).
/// Multiple records on one date are summed; dates ascend.
pub fn pool_series(records: &[PoolStatSnapshot], series: &str) -> PoolSeries {
    let mut by_date: BTreeMap<SnapshotDate, (u64, u128)> = BTreeMap::new();
    for r in net_v1_core(records) {
        if series != "All" && series_label(r.version, r.chain) != series {
            continue;
        }
        let slot = by_date.entry(r.snapshot_date).or_default();
        slot.0 = slot.0.saturating_add(r.staker_count);
        slot.1 = slot.1.saturating_add(r.total_staked);
    }

    let mut out = PoolSeries::default();
    for (date, (stakers, total)) in by_date {
        out.dates.push(date.to_string());
        out.staker_numbers.push(stakers);
        out.pos_amounts.push(total as f64 / POS_DISPLAY_DIVISOR);
    }
    out
}

/// Roster entries whose address contains `query` (case-insensitive), highest
/// voting weight first.
pub fn search_roster(entries: &[RosterEntry], query: &str) -> Vec<RosterEntry> {
    let needle = query.trim().to_lowercase();
    let mut hits: Vec<RosterEntry> = entries
        .iter()
        .filter(|e| needle.is_empty() || e.holder_address.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    hits.sort_by(|a, b| b.voting_weight.cmp(&a.voting_weight));
    hits
}
