use std::sync::{Arc, RwLock};

use crate::modules::catalog::{Event, EventCatalog};
use crate::modules::prediction::{derive_rate, EventRates};
use crate::modules::ratelimit::RateLimiter;
use crate::modules::scheduler::SchedulerState;
use crate::modules::stats::Stats;
use crate::modules::tracking::games::GameBounds;
use crate::modules::tracking::store::TrackingStore;

pub(crate) struct Data {
    pub(crate) store: Arc<dyn TrackingStore>,
    pub(crate) scheduler: Arc<SchedulerState>,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) catalog: RwLock<EventCatalog>,
    pub(crate) tiers: Vec<u32>,
    pub(crate) game_bounds: GameBounds,
    pub(crate) stats: Stats,
}

impl Data {
    pub(crate) fn new(
        store: Arc<dyn TrackingStore>,
        scheduler: Arc<SchedulerState>,
        rate_limiter: RateLimiter,
        tiers: Vec<u32>,
        game_bounds: GameBounds,
    ) -> Self {
        Self {
            store,
            scheduler,
            rate_limiter,
            catalog: RwLock::new(EventCatalog::default()),
            tiers,
            game_bounds,
            stats: Stats::new(),
        }
    }

    fn with_catalog<T>(&self, f: impl FnOnce(&EventCatalog) -> T) -> T {
        f(&self.catalog.read().expect("catalog lock got poisoned"))
    }

    pub(crate) fn current_event(&self, now: i64) -> Option<Event> {
        self.with_catalog(|c| c.current_event(now).cloned())
    }

    pub(crate) fn finished_events(&self, now: i64) -> Vec<Event> {
        self.with_catalog(|c| c.finished_events(now).into_iter().cloned().collect())
    }

    pub(crate) fn final_rate(&self, event: &Event, tier: u32, history: &[EventRates]) -> f64 {
        self.with_catalog(|c| derive_rate(event, tier, history, c))
    }
}

pub(crate) type Error = Box<dyn std::error::Error + Send + Sync>;
pub(crate) type Context<'a> = poise::Context<'a, Arc<Data>, Error>;
