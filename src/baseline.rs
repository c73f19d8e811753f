use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::FareError;
use crate::model::{Offer, PriceSnapshot};

pub const DEFAULT_HISTORY_WINDOW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopsBucket {
    Direct,
    One,
    #[default]
    Any,
}

impl StopsBucket {
    pub fn from_stops(stops: u32) -> Self {
        match stops {
            0 => Self::Direct,
            1 => Self::One,
            _ => Self::Any,
        }
    }

    pub fn from_str_loose(s: &str) -> Result<Self, FareError> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "one" => Ok(Self::One),
            "any" => Ok(Self::Any),
            _ => Err(FareError::Validation(format!(
                "invalid stops bucket: {s} (expected direct, one or any)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::One => "one",
            Self::Any => "any",
        }
    }
}

/// Partition key for price history: `FROM-TO-CABIN-BUCKET`, uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteKey(String);

impl RouteKey {
    pub fn new(from: &str, to: &str, cabin: &str, bucket: StopsBucket) -> Self {
        Self(format!("{from}-{to}-{cabin}-{}", bucket.as_str()).to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rolling per-route price windows.
///
/// Every operation runs while holding the map shard for its route key, so a
/// batch appended by `record_snapshots` (including the truncation that
/// follows) is seen entirely or not at all by readers of the same key.
/// Unrelated keys only contend when they hash to the same shard.
#[derive(Debug)]
pub struct BaselineTracker {
    windows: DashMap<RouteKey, VecDeque<PriceSnapshot>>,
    capacity: usize,
}

impl Default for BaselineTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl BaselineTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends one snapshot per offer, then drops the oldest entries beyond
    /// the window capacity. Returns the snapshots that were appended.
    pub fn record_snapshots(
        &self,
        route_key: &RouteKey,
        offers: &[Offer],
        now: DateTime<Utc>,
    ) -> Vec<PriceSnapshot> {
        let batch: Vec<PriceSnapshot> = offers
            .iter()
            .map(|o| PriceSnapshot {
                price: o.price,
                collected_at: now,
            })
            .collect();

        let mut window = self.windows.entry(route_key.clone()).or_default();
        window.extend(batch.iter().copied());
        while window.len() > self.capacity {
            window.pop_front();
        }
        batch
    }

    pub fn median_baseline(&self, route_key: &RouteKey) -> Option<f64> {
        let mut prices: Vec<f64> = {
            let window = self.windows.get(route_key)?;
            window.iter().map(|s| s.price).collect()
        };
        if prices.is_empty() {
            return None;
        }
        prices.sort_by(f64::total_cmp);

        let mid = prices.len() / 2;
        if prices.len() % 2 == 0 {
            Some((prices[mid - 1] + prices[mid]) / 2.0)
        } else {
            Some(prices[mid])
        }
    }

    /// Snapshots collected within the last `days` days, in insertion order.
    /// A range too large to represent keeps the whole window.
    pub fn read_price_history(
        &self,
        route_key: &RouteKey,
        days: u32,
        now: DateTime<Utc>,
    ) -> Vec<PriceSnapshot> {
        let cutoff = Duration::try_days(i64::from(days)).and_then(|d| now.checked_sub_signed(d));
        self.windows
            .get(route_key)
            .map(|window| {
                window
                    .iter()
                    .filter(|s| cutoff.is_none_or(|c| s.collected_at >= c))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn route_count(&self) -> usize {
        self.windows.len()
    }
}
