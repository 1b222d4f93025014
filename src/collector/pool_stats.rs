use std::sync::Arc;

use tracing::info;

use crate::calendar::local_midnight_unix;
use crate::chain::abi::{encode_call, WordDecoder, POOL_SUMMARY, STAKER_NUMBER};
use crate::chain::{BlockTimestampResolver, ChainReader};
use crate::config::WORD_SIZE;
use crate::error::Result;
use crate::types::{ChainId, PoolStatSnapshot, PoolVersion, SnapshotDate};

/// One staking pool contract to snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSource {
    pub chain: ChainId,
    pub version: PoolVersion,
    pub address: String,
}

impl std::fmt::Display for PoolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.version, self.chain)
    }
}

/// Staker count and pool total for one pool at the block matching a date.
pub struct PoolStatCollector {
    source: PoolSource,
    reader: Arc<dyn ChainReader>,
    resolver: BlockTimestampResolver,
    decoder: WordDecoder,
}

impl PoolStatCollector {
    pub fn new(source: PoolSource, reader: Arc<dyn ChainReader>, resolver: BlockTimestampResolver) -> Self {
        Self {
            source,
            reader,
            resolver,
            decoder: WordDecoder::new(WORD_SIZE),
        }
    }

    pub fn source(&self) -> &PoolSource {
        &self.source
    }

    pub async fn collect(&self, date: SnapshotDate) -> Result<PoolStatSnapshot> {
        let target = local_midnight_unix(date)?;
        self.collect_at(date, target).await
    }

    /// Collect for `date` using an explicit target timestamp.
    pub async fn collect_at(&self, date: SnapshotDate, target_unix: i64) -> Result<PoolStatSnapshot> {
        let resolution = self.resolver.resolve(self.reader.as_ref(), target_unix).await?;
        let height = resolution.height();
        info!(
            pool = %self.source,
            snapshot_date = %date,
            height,
            probes = resolution.probes,
            exact = resolution.exact,
            "Block number found: {height}",
        );

        let address = self.source.address.as_str();
        let staker_raw = self
            .reader
            .call(address, &encode_call(STAKER_NUMBER), height)
            .await?;
        let summary_raw = self
            .reader
            .call(address, &encode_call(POOL_SUMMARY), height)
            .await?;

        let staker_count = self.decoder.uint_u64(&staker_raw, 0)?;
        // poolSummary word 0 is the pool's total PoS votes.
        let total_staked = self.decoder.uint(&summary_raw, 0)?;

        Ok(PoolStatSnapshot {
            snapshot_date: date,
            resolved_height: height,
            chain: self.source.chain,
            version: self.source.version,
            staker_count,
            total_staked,
        })
    }
}
