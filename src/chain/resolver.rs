use std::time::Duration;

use tracing::{debug, info, warn};

use crate::chain::reader::{BlockHeader, ChainReader};
use crate::error::Result;

/// Outcome of a timestamp search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub block: BlockHeader,
    /// Number of `block_at` reads performed.
    pub probes: u32,
    pub exact: bool,
}

impl Resolution {
    pub fn height(&self) -> u64 {
        self.block.height
    }
}

/// Binary search over block height for the block whose timestamp is closest
/// to a target. Assumes timestamps are non-decreasing in height.
///
/// The result is the best block among those actually read, starting from the
/// latest block. A missing block stops the search early; the best block seen
/// so far is returned.
#[derive(Debug, Clone)]
pub struct BlockTimestampResolver {
    probe_delay: Duration,
}

impl BlockTimestampResolver {
    pub fn new(probe_delay: Duration) -> Self {
        Self { probe_delay }
    }

    pub async fn resolve(&self, reader: &dyn ChainReader, target: i64) -> Result<Resolution> {
        let latest = reader.latest_block().await?;
        let mut closest = latest;
        let mut probes = 0u32;
        let mut low = 0u64;
        let mut high = latest.height;

        while low <= high {
            tokio::time::sleep(self.probe_delay).await;

            let mid = low + (high - low) / 2;
            probes += 1;
            let Some(block) = reader.block_at(mid).await? else {
                warn!(height = mid, probes, "missing block during timestamp search; using closest so far");
                break;
            };
            debug!(height = block.height, timestamp = block.timestamp, target, "probe");

            if distance(block.timestamp, target) < distance(closest.timestamp, target) {
                closest = block;
            }

            if block.timestamp < target {
                low = mid + 1;
            } else if block.timestamp > target {
                if mid == 0 {
                    break;
                }
                high = mid - 1;
            } else {
                info!(height = block.height, probes, "exact timestamp match");
                return Ok(Resolution { block, probes, exact: true });
            }
        }

        info!(
            height = closest.height,
            timestamp = closest.timestamp,
            target,
            probes,
            "resolved closest block",
        );
        Ok(Resolution { block: closest, probes, exact: false })
    }
}

fn distance(a: i64, b: i64) -> u64 {
    a.abs_diff(b)
}
