use async_trait::async_trait;

use crate::error::Result;

/// Height and timestamp of one block (or epoch, on the core chain).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Read-only access to one chain.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// The most recent block the node will serve state for.
    async fn latest_block(&self) -> Result<BlockHeader>;

    /// Block at `height`, or `None` if the node returned no block.
    async fn block_at(&self, height: u64) -> Result<Option<BlockHeader>>;

    /// Execute a read-only contract call against state at `height`.
    async fn call(&self, to: &str, data: &[u8], height: u64) -> Result<Vec<u8>>;
}
