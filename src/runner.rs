use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::chain::{BlockTimestampResolver, ChainReader, Dialect, RpcChainReader};
use crate::collector::{PoolSource, PoolStatCollector, RosterCollector};
use crate::config::{self, Config, POOL_PROBE_DELAY_MS, ROSTER_PROBE_DELAY_MS, ROSTER_STAKER_DELAY_MS};
use crate::dataset::{self, DatasetStore, MergeSummary, UpsertOutcome};
use crate::error::{AppError, Result};
use crate::retry::{with_retry, RetryPolicy};
use crate::schedule::{should_run, ScheduleRule};
use crate::types::{ChainId, PoolStatSnapshot, PoolVersion, RosterEntry, SnapshotDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CollectorKind {
    /// Core-space v1 pool
    CoreV1,
    /// eSpace v1 then v2 pools
    Espace,
    EspaceV1,
    EspaceV2,
    /// Voting-weight roster of the eSpace v2 pool
    TeslaRoster,
}

impl std::fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CollectorKind::CoreV1 => "core-v1",
            CollectorKind::Espace => "espace",
            CollectorKind::EspaceV1 => "espace-v1",
            CollectorKind::EspaceV2 => "espace-v2",
            CollectorKind::TeslaRoster => "tesla-roster",
        };
        write!(f, "{s}")
    }
}

impl CollectorKind {
    pub fn schedule(&self) -> Result<ScheduleRule> {
        match self {
            CollectorKind::TeslaRoster => ScheduleRule::roster(),
            _ => Ok(ScheduleRule::pool_stats()),
        }
    }

    /// Pool contracts this collector snapshots, in collection order.
    pub fn pool_sources(&self, cfg: &Config) -> Result<Vec<PoolSource>> {
        let v1_core = || -> Result<PoolSource> {
            Ok(PoolSource {
                chain: ChainId::Core,
                version: PoolVersion::V1,
                address: config::require(&cfg.v1_core_pool, "ABC_V1_CORE_POOL_ADDR")?.to_string(),
            })
        };
        let v1_espace = || -> Result<PoolSource> {
            Ok(PoolSource {
                chain: ChainId::Espace,
                version: PoolVersion::V1,
                address: config::require(&cfg.v1_espace_pool, "ABC_V1_ESPACE_POOL_ADDR")?.to_string(),
            })
        };
        let v2_espace = || -> Result<PoolSource> {
            Ok(PoolSource {
                chain: ChainId::Espace,
                version: PoolVersion::V2,
                address: config::require(&cfg.v2_espace_pool, "ABC_V2_ESPACE_POOL_ADDR")?.to_string(),
            })
        };
        match self {
            CollectorKind::CoreV1 => Ok(vec![v1_core()?]),
            CollectorKind::Espace => Ok(vec![v1_espace()?, v2_espace()?]),
            CollectorKind::EspaceV1 => Ok(vec![v1_espace()?]),
            CollectorKind::EspaceV2 => Ok(vec![v2_espace()?]),
            CollectorKind::TeslaRoster => Ok(Vec::new()),
        }
    }
}

/// One JSON-RPC reader per chain, built from configuration.
#[derive(Clone)]
pub struct Readers {
    pub core: Arc<dyn ChainReader>,
    pub espace: Arc<dyn ChainReader>,
}

impl Readers {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.rpc_timeout_secs);
        Ok(Self {
            core: Arc::new(RpcChainReader::new(cfg.core_rpc_url.clone(), Dialect::for_chain(ChainId::Core), timeout)?),
            espace: Arc::new(RpcChainReader::new(cfg.espace_rpc_url.clone(), Dialect::for_chain(ChainId::Espace), timeout)?),
        })
    }

    pub fn for_chain(&self, chain: ChainId) -> Arc<dyn ChainReader> {
        match chain {
            ChainId::Core => Arc::clone(&self.core),
            ChainId::Espace => Arc::clone(&self.espace),
        }
    }
}

/// Result of a pool-stat run across its sources.
#[derive(Debug, Default)]
pub struct PoolRunReport {
    pub written: Vec<PoolStatSnapshot>,
    /// (source label, error text) for sources that produced no record.
    pub failed: Vec<(String, String)>,
}

/// Schedule check; logs and returns false when the date is not scheduled.
pub fn is_scheduled(kind: CollectorKind, date: SnapshotDate) -> Result<bool> {
    let rule = kind.schedule()?;
    let go = should_run(date, &rule);
    if !go {
        info!(collector = %kind, snapshot_date = %date, "Skipping {date} - not a scheduled snapshot date");
    }
    Ok(go)
}

/// Run a collector end to end for `date`.
///
/// Pool-stat collectors only fail on configuration problems: per-source
/// failures are logged and reported. The roster collector fails if the roster
/// cannot be collected or saved.
pub async fn run(kind: CollectorKind, cfg: &Config, date: SnapshotDate) -> Result<()> {
    if !is_scheduled(kind, date)? {
        return Ok(());
    }
    let readers = Readers::from_config(cfg)?;

    match kind {
        CollectorKind::TeslaRoster => {
            let collector = RosterCollector::new(
                Arc::clone(&readers.espace),
                config::require(&cfg.v2_espace_pool, "ABC_V2_ESPACE_POOL_ADDR")?.to_string(),
                config::require(&cfg.abc_token, "ESPACE_ABC_TOKEN_ADDR")?.to_string(),
                BlockTimestampResolver::new(Duration::from_millis(ROSTER_PROBE_DELAY_MS)),
                Duration::from_millis(ROSTER_STAKER_DELAY_MS),
                RetryPolicy::default(),
            );
            let store = DatasetStore::new(cfg.roster_path());
            run_roster(&store, &collector, date).await?;
            info!("Tesla snapshot collection complete");
        }
        _ => {
            let collectors: Vec<PoolStatCollector> = kind
                .pool_sources(cfg)?
                .into_iter()
                .map(|source| {
                    let reader = readers.for_chain(source.chain);
                    PoolStatCollector::new(
                        source,
                        reader,
                        BlockTimestampResolver::new(Duration::from_millis(POOL_PROBE_DELAY_MS)),
                    )
                })
                .collect();
            let store = DatasetStore::new(cfg.pool_stats_path());
            let report = run_pool_stats(&store, &collectors, date, RetryPolicy::default()).await;
            info!(
                collector = %kind,
                written = report.written.len(),
                failed = report.failed.len(),
                "{kind} data collection complete",
            );
        }
    }
    Ok(())
}

/// Collect every source in turn, saving after each successful record so a
/// later failure cannot discard an earlier source's result.
pub async fn run_pool_stats(
    store: &DatasetStore,
    collectors: &[PoolStatCollector],
    date: SnapshotDate,
    retry: RetryPolicy,
) -> PoolRunReport {
    let mut records: Vec<PoolStatSnapshot> = store.load().await;
    let mut report = PoolRunReport::default();

    for collector in collectors {
        let label = collector.source().to_string();
        info!(pool = %label, snapshot_date = %date, "Fetching {label} data for {date}");

        let record = match with_retry(retry, &label, || collector.collect(date)).await {
            Ok(r) => r,
            Err(AppError::Decode(msg)) => {
                warn!(pool = %label, snapshot_date = %date, "Skipping write - malformed value: {msg}");
                report.failed.push((label, msg));
                continue;
            }
            Err(e) => {
                error!(pool = %label, snapshot_date = %date, "Error fetching {label} data: {e}");
                report.failed.push((label, e.to_string()));
                continue;
            }
        };

        info!(
            snapshot_date = %record.snapshot_date,
            chain = %record.chain,
            version = %record.version,
            height = record.resolved_height,
            stakers = record.staker_count,
            total = %record.total_staked,
            "Record collected",
        );

        let mut next = records.clone();
        match dataset::upsert(&mut next, record.clone()) {
            UpsertOutcome::Inserted => info!("Added new record for {date}, {}, {}", record.version, record.chain),
            UpsertOutcome::Replaced(position) => {
                info!(position, "Updated existing record for {date}, {}, {}", record.version, record.chain)
            }
        }
        match store.save(&next).await {
            Ok(()) => {
                records = next;
                report.written.push(record);
            }
            Err(e) => {
                error!(pool = %label, "Failed to write {}: {e}", store.path().display());
                report.failed.push((label, e.to_string()));
            }
        }
    }

    report
}

/// Collect the roster and make it the complete set of entries for `date`.
pub async fn run_roster(store: &DatasetStore, collector: &RosterCollector, date: SnapshotDate) -> Result<MergeSummary> {
    info!(snapshot_date = %date, "Fetching Tesla snapshot for {date}");
    let mut records: Vec<RosterEntry> = store.load().await;

    let existing = records.iter().filter(|r| r.snapshot_date == date).count();
    if existing > 0 {
        info!("Found {existing} existing records for {date}. They will be updated.");
    }

    let entries = collector.collect(date).await.inspect_err(|e| {
        error!(snapshot_date = %date, "Error fetching Tesla snapshot: {e}");
    })?;
    info!("Fetched {} staker records", entries.len());

    let summary = dataset::replace_date(&mut records, date, entries);
    info!(
        inserted = summary.inserted,
        replaced = summary.replaced,
        removed = summary.removed,
        "Roster merged for {date}",
    );
    store.save(&records).await?;
    Ok(summary)
}
