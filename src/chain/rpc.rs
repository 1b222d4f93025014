use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::chain::abi::decode_hex;
use crate::chain::reader::{BlockHeader, ChainReader};
use crate::error::{AppError, Result};
use crate::types::ChainId;

/// Method names and field layout of one chain's JSON-RPC flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub get_block: &'static str,
    pub call: &'static str,
    pub latest_tag: &'static str,
    pub height_field: &'static str,
}

impl Dialect {
    /// Conflux core space: epochs, `cfx_` namespace.
    pub const CORE: Dialect = Dialect {
        get_block: "cfx_getBlockByEpochNumber",
        call: "cfx_call",
        latest_tag: "latest_mined",
        height_field: "epochNumber",
    };

    /// eSpace: Ethereum-compatible `eth_` namespace.
    pub const ESPACE: Dialect = Dialect {
        get_block: "eth_getBlockByNumber",
        call: "eth_call",
        latest_tag: "latest",
        height_field: "number",
    };

    pub fn for_chain(chain: ChainId) -> Self {
        match chain {
            ChainId::Core => Self::CORE,
            ChainId::Espace => Self::ESPACE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

/// `ChainReader` over HTTP JSON-RPC.
pub struct RpcChainReader {
    client: reqwest::Client,
    url: String,
    dialect: Dialect,
}

impl RpcChainReader {
    pub fn new(url: String, dialect: Dialect, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url, dialect })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        debug!(method, url = %self.url, "rpc request");

        let resp = self.client.post(&self.url).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Rpc(format!("{method}: HTTP {status}")));
        }
        let rpc: RpcResponse = resp.json().await?;
        if let Some(err) = rpc.error {
            return Err(AppError::Rpc(format!(
                "{method}: {} (code {})",
                err.message.unwrap_or_else(|| "unknown error".to_string()),
                err.code.map_or("n/a".to_string(), |c| c.to_string()),
            )));
        }
        Ok(rpc.result.unwrap_or(Value::Null))
    }

    async fn get_block(&self, tag: String) -> Result<Option<BlockHeader>> {
        let result = self
            .request(self.dialect.get_block, json!([tag, false]))
            .await?;
        parse_block(&result, self.dialect.height_field)
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn latest_block(&self) -> Result<BlockHeader> {
        self.get_block(self.dialect.latest_tag.to_string())
            .await?
            .ok_or_else(|| AppError::Rpc("node returned no latest block".to_string()))
    }

    async fn block_at(&self, height: u64) -> Result<Option<BlockHeader>> {
        self.get_block(format!("{height:#x}")).await
    }

    async fn call(&self, to: &str, data: &[u8], height: u64) -> Result<Vec<u8>> {
        let params = json!([
            { "to": to, "data": format!("0x{}", hex::encode(data)) },
            format!("{height:#x}"),
        ]);
        let result = self.request(self.dialect.call, params).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| AppError::Rpc(format!("{}: result is not a hex string", self.dialect.call)))?;
        decode_hex(raw)
    }
}

/// Parse a block object. `null` means the node has no such block.
pub fn parse_block(v: &Value, height_field: &str) -> Result<Option<BlockHeader>> {
    if v.is_null() {
        return Ok(None);
    }
    let height = quantity(v.get(height_field), height_field)?;
    let timestamp = quantity(v.get("timestamp"), "timestamp")?;
    let timestamp = i64::try_from(timestamp)
        .map_err(|_| AppError::Decode(format!("timestamp {timestamp} out of range")))?;
    Ok(Some(BlockHeader { height, timestamp }))
}

/// Parse a `0x`-prefixed hex quantity.
pub fn quantity(v: Option<&Value>, field: &str) -> Result<u64> {
    let s = v
        .and_then(|x| x.as_str())
        .ok_or_else(|| AppError::Decode(format!("block field {field} missing")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| AppError::Decode(format!("block field {field}={s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_core_epoch_block() {
        let v = json!({ "epochNumber": "0x64", "timestamp": "0x5dc", "hash": "0xabc" });
        let b = parse_block(&v, Dialect::CORE.height_field).unwrap().unwrap();
        assert_eq!(b, BlockHeader { height: 100, timestamp: 1500 });
    }

    #[test]
    fn parses_espace_block() {
        let v = json!({ "number": "0x1", "timestamp": "0x3e8" });
        let b = parse_block(&v, Dialect::ESPACE.height_field).unwrap().unwrap();
        assert_eq!(b, BlockHeader { height: 1, timestamp: 1000 });
    }

    #[test]
    fn null_block_is_missing_not_error() {
        assert_eq!(parse_block(&Value::Null, "number").unwrap(), None);
    }

    #[test]
    fn malformed_quantity_is_decode_error() {
        let v = json!({ "number": "0xzz", "timestamp": "0x1" });
        assert!(matches!(parse_block(&v, "number"), Err(AppError::Decode(_))));
        let v = json!({ "timestamp": "0x1" });
        assert!(parse_block(&v, "number").is_err());
    }

    #[test]
    fn dialect_per_chain() {
        assert_eq!(Dialect::for_chain(ChainId::Core).call, "cfx_call");
        assert_eq!(Dialect::for_chain(ChainId::Espace).get_block, "eth_getBlockByNumber");
    }
}
