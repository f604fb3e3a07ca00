use poise::serenity_prelude::{self as serenity};

use super::sample::{RankSample, UserRankSample};
use crate::modules::prediction::EventRates;
use crate::modules::trackers::tracker::{NewTracker, TrackedThreshold};
use crate::types::Error;

pub(crate) mod memory;
pub(crate) mod postgres;

pub(crate) use memory::MemoryStore;
pub(crate) use postgres::PgStore;

/// Persistence for rank snapshots, learned event rates and trackers.
///
/// Samples are append-only. Sample queries return rows ordered by timestamp,
/// with rows sharing a timestamp kept in insertion order.
#[serenity::async_trait]
pub(crate) trait TrackingStore: Send + Sync {
    async fn insert_tier_sample(&self, sample: &RankSample) -> Result<(), Error>;
    async fn tier_samples(&self, event_id: u32, tier: u32) -> Result<Vec<RankSample>, Error>;
    async fn latest_tier_sample(
        &self,
        event_id: u32,
        tier: u32,
    ) -> Result<Option<RankSample>, Error>;
    async fn player_samples(
        &self,
        event_id: u32,
        player_id: &str,
    ) -> Result<Vec<RankSample>, Error>;
    async fn latest_player_sample(
        &self,
        event_id: u32,
        player_id: &str,
    ) -> Result<Option<RankSample>, Error>;

    async fn insert_user_sample(&self, sample: &UserRankSample) -> Result<(), Error>;
    async fn user_samples(
        &self,
        event_id: u32,
        user_id: &str,
    ) -> Result<Vec<UserRankSample>, Error>;

    async fn save_event_rates(&self, rates: &EventRates) -> Result<(), Error>;
    async fn event_rates(&self, event_type: &str) -> Result<Vec<EventRates>, Error>;
    async fn has_event_rates(&self, event_id: u32) -> Result<bool, Error>;
    /// Ids of every event with at least one stored tier sample.
    async fn sampled_events(&self) -> Result<Vec<u32>, Error>;

    async fn create_tracker(&self, tracker: NewTracker) -> Result<TrackedThreshold, Error>;
    async fn trackers(&self) -> Result<Vec<TrackedThreshold>, Error>;
    async fn channel_trackers(&self, channel_id: u64) -> Result<Vec<TrackedThreshold>, Error>;
    /// Remembers the score and timestamp of the last sample a tracker observed.
    async fn update_tracker_score(&self, id: i64, score: i64, timestamp: i64)
        -> Result<(), Error>;
    /// Returns false when no tracker with that id exists in the channel.
    async fn delete_tracker(&self, id: i64, channel_id: u64) -> Result<bool, Error>;
}
