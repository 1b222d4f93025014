pub mod abi;
pub mod reader;
pub mod resolver;
pub mod rpc;

pub use reader::ChainReader;
pub use resolver::BlockTimestampResolver;
pub use rpc::{Dialect, RpcChainReader};
