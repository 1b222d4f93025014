use std::path::PathBuf;

use crate::error::{AppError, Result};

pub const CORE_RPC_URL: &str = "https://main.confluxrpc.com";
pub const ESPACE_RPC_URL: &str = "https://evm.confluxrpc.com";

pub const POOL_STATS_FILE: &str = "poolStats.json";
pub const ROSTER_FILE: &str = "teslaSnapshot.json";

/// Delay between binary-search probes for the pool-stat collectors (milliseconds).
pub const POOL_PROBE_DELAY_MS: u64 = 200;

/// Delay between binary-search probes for the roster collector (milliseconds).
/// The roster run is long and shares the eSpace quota with the per-staker reads.
pub const ROSTER_PROBE_DELAY_MS: u64 = 2_000;

/// Throttle before each per-staker read batch in the roster collector (milliseconds).
pub const ROSTER_STAKER_DELAY_MS: u64 = 2_000;

/// Attempts per chain-read unit before the failure is surfaced.
pub const RETRY_ATTEMPTS: u32 = 3;

/// Fixed pause between attempts (milliseconds).
pub const RETRY_DELAY_MS: u64 = 2_000;

/// Width of one ABI word in bytes.
pub const WORD_SIZE: usize = 32;

/// Pool-stat snapshots are taken on these days of the month.
pub const POOL_STAT_DAYS: &[u32] = &[1, 11, 21];

/// Roster snapshot schedule.
pub mod roster_schedule {
    /// One-off snapshot dates taken before the recurring cadence started.
    pub const SPECIFIC_DATES: &[&str] = &["20241021", "20241101", "20250110", "20250209"];
    pub const ANCHOR: &str = "20250209";
    pub const INTERVAL_DAYS: i64 = 15;
}

/// Fixed-point scaling applied to raw roster values.
///
/// These encode tokenomics of the pool and token contracts and are not
/// derivable from the chain: one PoS vote is 1000 CFX, five votes make one
/// voting unit, and 188 whole ABC tokens make one voting unit.
pub mod roster_scaling {
    pub const POS_VOTE_UNIT: u128 = 1_000;
    pub const POS_WEIGHT_DIVISOR: u128 = 5;
    pub const TOKEN_DECIMALS: u32 = 18;
    pub const TOKEN_WEIGHT_DIVISOR: u128 = 188;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub data_dir: PathBuf,
    pub core_rpc_url: String,
    pub espace_rpc_url: String,
    /// Core-space v1 pool contract (ABC_V1_CORE_POOL_ADDR)
    pub v1_core_pool: Option<String>,
    /// eSpace v1 pool contract (ABC_V1_ESPACE_POOL_ADDR)
    pub v1_espace_pool: Option<String>,
    /// eSpace v2 pool contract, also the roster source (ABC_V2_ESPACE_POOL_ADDR)
    pub v2_espace_pool: Option<String>,
    /// ABC token contract on eSpace (ESPACE_ABC_TOKEN_ADDR)
    pub abc_token: Option<String>,
    pub api_port: u16,
    pub rpc_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            core_rpc_url: std::env::var("CORE_RPC_URL")
                .unwrap_or_else(|_| CORE_RPC_URL.to_string()),
            espace_rpc_url: std::env::var("ESPACE_RPC_URL")
                .unwrap_or_else(|_| ESPACE_RPC_URL.to_string()),
            v1_core_pool: non_empty_var("ABC_V1_CORE_POOL_ADDR"),
            v1_espace_pool: non_empty_var("ABC_V1_ESPACE_POOL_ADDR"),
            v2_espace_pool: non_empty_var("ABC_V2_ESPACE_POOL_ADDR"),
            abc_token: non_empty_var("ESPACE_ABC_TOKEN_ADDR"),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            rpc_timeout_secs: std::env::var("RPC_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .unwrap_or(30),
        })
    }

    pub fn pool_stats_path(&self) -> PathBuf {
        self.data_dir.join(POOL_STATS_FILE)
    }

    pub fn roster_path(&self) -> PathBuf {
        self.data_dir.join(ROSTER_FILE)
    }
}

/// Returns the configured address or a `Config` error naming the variable.
pub fn require<'a>(value: &'a Option<String>, var: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| AppError::Config(format!("{var} is not set")))
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
