use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::calendar::local_midnight_unix;
use crate::chain::abi::{
    encode_call, encode_call_address, encode_call_uint, WordDecoder, BALANCE_OF, STAKER_ADDRESS,
    STAKER_NUMBER, USER_SUMMARY,
};
use crate::chain::{BlockTimestampResolver, ChainReader};
use crate::config::{roster_scaling, WORD_SIZE};
use crate::error::{AppError, Result};
use crate::retry::{with_retry, RetryPolicy};
use crate::types::{RosterEntry, SnapshotDate};

/// Divisors and multipliers turning raw contract values into roster amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterScaling {
    pub pos_vote_unit: u128,
    pub pos_weight_divisor: u128,
    pub token_unit: u128,
    pub token_weight_divisor: u128,
}

impl Default for RosterScaling {
    fn default() -> Self {
        Self {
            pos_vote_unit: roster_scaling::POS_VOTE_UNIT,
            pos_weight_divisor: roster_scaling::POS_WEIGHT_DIVISOR,
            token_unit: 10u128.pow(roster_scaling::TOKEN_DECIMALS),
            token_weight_divisor: roster_scaling::TOKEN_WEIGHT_DIVISOR,
        }
    }
}

/// Scaled amounts for one holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weights {
    pub pos_amount: u128,
    pub token_amount: u128,
    pub voting_weight: u128,
}

impl RosterScaling {
    /// `votes` is the holder's PoS vote count, `balance` the raw token balance.
    pub fn weigh(&self, votes: u128, balance: u128) -> Result<Weights> {
        if self.pos_weight_divisor == 0 || self.token_unit == 0 || self.token_weight_divisor == 0 {
            return Err(AppError::Config("roster scaling divisor is zero".into()));
        }
        let pos_amount = votes
            .checked_mul(self.pos_vote_unit)
            .ok_or_else(|| AppError::Decode(format!("pos amount overflow for {votes} votes")))?;
        let token_amount = balance / self.token_unit;
        let pos_weight = votes / self.pos_weight_divisor;
        let token_weight = token_amount / self.token_weight_divisor;
        Ok(Weights {
            pos_amount,
            token_amount,
            voting_weight: pos_weight.min(token_weight),
        })
    }
}

pub struct RosterCollector {
    reader: Arc<dyn ChainReader>,
    pool_address: String,
    token_address: String,
    resolver: BlockTimestampResolver,
    staker_delay: Duration,
    retry: RetryPolicy,
    scaling: RosterScaling,
    decoder: WordDecoder,
}

impl RosterCollector {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        pool_address: String,
        token_address: String,
        resolver: BlockTimestampResolver,
        staker_delay: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            reader,
            pool_address,
            token_address,
            resolver,
            staker_delay,
            retry,
            scaling: RosterScaling::default(),
            decoder: WordDecoder::new(WORD_SIZE),
        }
    }

    pub async fn collect(&self, date: SnapshotDate) -> Result<Vec<RosterEntry>> {
        let target = local_midnight_unix(date)?;
        self.collect_at(date, target).await
    }

    /// Enumerate every staker at the block matching `target_unix`.
    /// Each chain read is retried on its own; any read that exhausts its
    /// retries aborts the whole roster.
    pub async fn collect_at(&self, date: SnapshotDate, target_unix: i64) -> Result<Vec<RosterEntry>> {
        let resolution = with_retry(self.retry, "resolve roster block", || {
            self.resolver.resolve(self.reader.as_ref(), target_unix)
        })
        .await?;
        let height = resolution.height();
        info!(snapshot_date = %date, height, probes = resolution.probes, exact = resolution.exact, "Roster block found: {height}");

        let count_call = encode_call(STAKER_NUMBER);
        let count_raw = with_retry(self.retry, "stakerNumber", || {
            self.reader.call(&self.pool_address, &count_call, height)
        })
        .await?;
        let staker_count = self.decoder.uint_u64(&count_raw, 0)?;
        info!(snapshot_date = %date, staker_count, "Enumerating stakers");

        // Index 0 is a sentinel slot in the pool contract.
        let last = staker_count.saturating_sub(1);
        let mut entries = Vec::new();
        for index in 1..staker_count {
            info!("Processing staker {index} of {last}");
            tokio::time::sleep(self.staker_delay).await;
            let label = format!("staker {index}");
            let entry = with_retry(self.retry, &label, || self.fetch_staker(date, index, height)).await?;
            entries.push(entry);
        }

        Ok(entries)
    }

    async fn fetch_staker(&self, date: SnapshotDate, index: u64, height: u64) -> Result<RosterEntry> {
        let addr_raw = self
            .reader
            .call(
                &self.pool_address,
                &encode_call_uint(STAKER_ADDRESS, u128::from(index)),
                height,
            )
            .await?;
        let holder = self.decoder.address(&addr_raw, 0)?;

        let summary_raw = self
            .reader
            .call(&self.pool_address, &encode_call_address(USER_SUMMARY, &holder)?, height)
            .await?;
        let balance_raw = self
            .reader
            .call(&self.token_address, &encode_call_address(BALANCE_OF, &holder)?, height)
            .await?;

        // userSummary word 0 is the holder's PoS vote count.
        let votes = self.decoder.uint(&summary_raw, 0)?;
        let balance = self.decoder.uint(&balance_raw, 0)?;
        let w = self.scaling.weigh(votes, balance)?;

        Ok(RosterEntry {
            snapshot_date: date,
            holder_address: holder,
            pos_amount: w.pos_amount,
            token_amount: w.token_amount,
            voting_weight: w.voting_weight,
        })
    }
}
