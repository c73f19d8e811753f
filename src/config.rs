use std::path::PathBuf;
use std::time::Duration;

use crate::baseline::DEFAULT_HISTORY_WINDOW;
use crate::rate_limit::{DEFAULT_LIMIT, DEFAULT_WINDOW};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_HISTORY_DAYS: u32 = 60;
pub const CACHE_NAMESPACE: &str = "search";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lifetime of a cached raw provider response.
    pub cache_ttl: Duration,
    pub rate_limit: usize,
    pub rate_window: Duration,
    /// Snapshots retained per route key.
    pub history_window: usize,
    /// JSON-lines snapshot store; history stays in-process when unset.
    pub history_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            rate_limit: DEFAULT_LIMIT,
            rate_window: DEFAULT_WINDOW,
            history_window: DEFAULT_HISTORY_WINDOW,
            history_file: None,
        }
    }
}
