pub mod pool_stats;
pub mod roster;

pub use pool_stats::{PoolSource, PoolStatCollector};
pub use roster::RosterCollector;
