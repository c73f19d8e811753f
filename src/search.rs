use std::sync::Arc;

use chrono::{DateTime, Days, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::baseline::{BaselineTracker, RouteKey, StopsBucket};
use crate::cache::{make_cache_key, TtlCache};
use crate::config::{EngineConfig, CACHE_NAMESPACE};
use crate::error::FareError;
use crate::model::{Offer, PriceSnapshot, ScoredOffer, SearchPage};
use crate::normalize::normalize_offers;
use crate::query::{Cabin, SearchParams, SortBy};
use crate::rate_limit::RateLimiter;
use crate::score::score_offer;
use crate::source::OfferSource;
use crate::store::{JsonlSnapshotStore, SnapshotStore, SnapshotWriter};

const PREWARM_DEPART_IN_DAYS: u64 = 45;
const PREWARM_RETURN_IN_DAYS: u64 = 52;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrewarmOutcome {
    pub to: String,
    pub count: usize,
}

/// Process-wide search state: raw-response cache, per-client limiter and
/// per-route price history. Build one at startup and share it by reference.
pub struct FareEngine {
    config: EngineConfig,
    cache: TtlCache<Value>,
    limiter: RateLimiter,
    tracker: BaselineTracker,
    store: Option<Arc<dyn SnapshotStore>>,
    writer: Option<SnapshotWriter>,
}

impl std::fmt::Debug for FareEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FareEngine")
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .field("routes", &self.tracker.route_count())
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl FareEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tracker: BaselineTracker::new(config.history_window),
            cache: TtlCache::new(),
            limiter: RateLimiter::new(),
            store: None,
            writer: None,
            config,
        }
    }

    /// Engine that mirrors every recorded batch into `store` in the
    /// background. Must be called from within a tokio runtime.
    pub fn with_store(config: EngineConfig, store: Arc<dyn SnapshotStore>) -> Self {
        let mut engine = Self::new(config);
        engine.writer = Some(SnapshotWriter::spawn(Arc::clone(&store)));
        engine.store = Some(store);
        engine
    }

    /// Uses the JSON-lines store named by `config.history_file`, if any.
    pub fn from_config(config: EngineConfig) -> Self {
        match config.history_file.clone() {
            Some(path) => Self::with_store(config, Arc::new(JsonlSnapshotStore::new(path))),
            None => Self::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &BaselineTracker {
        &self.tracker
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    pub async fn search(
        &self,
        client: &str,
        params: &SearchParams,
        source: &dyn OfferSource,
    ) -> Result<SearchPage, FareError> {
        self.limiter
            .check(client, self.config.rate_limit, self.config.rate_window)?;
        params.validate()?;
        self.run_search(params, source, Utc::now()).await
    }

    /// Cache lookup, fetch on miss, normalize, record, baseline, score, sort
    /// and paginate. The baseline is read after the batch is recorded, so a
    /// route's first batch is scored against its own median.
    pub async fn run_search(
        &self,
        params: &SearchParams,
        source: &dyn OfferSource,
        now: DateTime<Utc>,
    ) -> Result<SearchPage, FareError> {
        let key = make_cache_key(CACHE_NAMESPACE, &params.provider_query())?;

        let raw = match self.cache.get(&key) {
            Some(raw) => {
                tracing::debug!(%key, "cache hit");
                raw
            }
            None => {
                tracing::debug!(%key, "cache miss; fetching offers");
                let raw = source.fetch(params).await?;
                self.cache.set(key, raw.clone(), self.config.cache_ttl);
                raw
            }
        };

        let offers = normalize_offers(&raw);
        let route_key = route_key_for(&params.from, &params.to, params.cabin, &offers);
        self.record(&route_key, &offers, now);

        let baseline = self.tracker.median_baseline(&route_key);
        tracing::debug!(route_key = %route_key, ?baseline, "baseline after record");

        let mut scored: Vec<ScoredOffer> = offers
            .into_iter()
            .map(|offer| score_offer(&offer, baseline).apply(offer))
            .collect();
        sort_offers(&mut scored, params.sort_by);

        let total = scored.len();
        let start = (params.page.max(1) as usize - 1).saturating_mul(params.per_page as usize);
        let items: Vec<ScoredOffer> = scored
            .into_iter()
            .skip(start)
            .take(params.per_page as usize)
            .collect();

        tracing::info!(
            route_key = %route_key,
            total,
            returned = items.len(),
            "search complete"
        );

        Ok(SearchPage {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
            route_key: route_key.to_string(),
            baseline,
        })
    }

    fn record(&self, route_key: &RouteKey, offers: &[Offer], now: DateTime<Utc>) {
        let batch = self.tracker.record_snapshots(route_key, offers, now);
        if let Some(writer) = &self.writer {
            writer.dispatch(route_key.clone(), batch);
        }
    }

    pub async fn price_history(&self, route_key: &RouteKey, days: u32) -> Vec<PriceSnapshot> {
        self.price_history_at(route_key, days, Utc::now()).await
    }

    /// Reads the persistent store when one is configured, falling back to
    /// the in-process window. Rows come back oldest first.
    pub async fn price_history_at(
        &self,
        route_key: &RouteKey,
        days: u32,
        now: DateTime<Utc>,
    ) -> Vec<PriceSnapshot> {
        if let Some(store) = &self.store {
            let since = Duration::try_days(i64::from(days))
                .and_then(|d| now.checked_sub_signed(d))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            match store.history(route_key, since).await {
                Ok(rows) => return rows,
                Err(e) => {
                    tracing::warn!(
                        route_key = %route_key,
                        error = %e,
                        "snapshot store read failed; using in-process history"
                    );
                }
            }
        }

        let mut rows = self.tracker.read_price_history(route_key, days, now);
        rows.sort_by_key(|s| s.collected_at);
        rows
    }

    /// Seeds history for `from` to each destination with a round-trip economy
    /// search departing in 45 days. Bypasses the cache and the limiter; a
    /// failed destination reports a count of zero.
    pub async fn prewarm(
        &self,
        from: &str,
        destinations: &[String],
        source: &dyn OfferSource,
    ) -> Vec<PrewarmOutcome> {
        let now = Utc::now();
        let today = now.date_naive();
        let date_in = |days: u64| {
            today
                .checked_add_days(Days::new(days))
                .unwrap_or(today)
                .format("%Y-%m-%d")
                .to_string()
        };
        let from = from.to_uppercase();

        let mut outcomes = Vec::with_capacity(destinations.len());
        for dest in destinations {
            let to = dest.trim().to_uppercase();
            let params = SearchParams {
                round_trip: true,
                from: from.clone(),
                to: to.clone(),
                depart_date: date_in(PREWARM_DEPART_IN_DAYS),
                return_date: Some(date_in(PREWARM_RETURN_IN_DAYS)),
                sort_by: SortBy::Price,
                ..SearchParams::default()
            };

            let count = match source.fetch(&params).await {
                Ok(raw) => {
                    let offers = normalize_offers(&raw);
                    let route_key = route_key_for(&from, &to, Cabin::Economy, &offers);
                    self.record(&route_key, &offers, now);
                    offers.len()
                }
                Err(e) => {
                    tracing::warn!(from = %from, to = %to, error = %e, "prewarm fetch failed");
                    0
                }
            };
            tracing::info!(from = %from, to = %to, count, "prewarmed route");
            outcomes.push(PrewarmOutcome { to, count });
        }
        outcomes
    }

    /// Waits for pending snapshot writes to reach the store.
    pub async fn shutdown(self) {
        if let Some(writer) = self.writer {
            writer.flush().await;
        }
    }
}

/// Route key for a batch, bucketed by the fewest stops of any offer in it.
pub fn route_key_for(from: &str, to: &str, cabin: Cabin, offers: &[Offer]) -> RouteKey {
    let min_stops = offers.iter().map(|o| o.stops).min().unwrap_or(0);
    RouteKey::new(
        from,
        to,
        cabin.provider_code(),
        StopsBucket::from_stops(min_stops),
    )
}

pub fn sort_offers(offers: &mut [ScoredOffer], sort_by: SortBy) {
    match sort_by {
        SortBy::Score => offers.sort_by(|a, b| b.score.total_cmp(&a.score)),
        SortBy::Price => offers.sort_by(|a, b| a.offer.price.total_cmp(&b.offer.price)),
        SortBy::Duration => offers.sort_by_key(|o| o.offer.total_duration_minutes),
    }
}
