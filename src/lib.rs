pub mod baseline;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod model;
pub mod normalize;
pub mod query;
pub mod rate_limit;
pub mod score;
pub mod search;
pub mod source;
pub mod store;
pub mod table;

pub use config::EngineConfig;
pub use error::FareError;
pub use search::FareEngine;
