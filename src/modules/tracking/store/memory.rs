use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use poise::serenity_prelude::{self as serenity};

use super::TrackingStore;
use crate::modules::prediction::EventRates;
use crate::modules::tracking::sample::{RankSample, UserRankSample};
use crate::modules::trackers::tracker::{NewTracker, TrackedThreshold};
use crate::types::Error;

#[derive(Default)]
struct Tables {
    cutoffs: Vec<RankSample>,
    users: Vec<UserRankSample>,
    rates: BTreeMap<u32, EventRates>,
    trackers: BTreeMap<i64, TrackedThreshold>,
    next_tracker_id: i64,
}

/// Process-local store, used when no database is configured.
#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().expect("memory store lock got poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().expect("memory store lock got poisoned")
    }
}

fn sorted<T, F: Fn(&T) -> i64>(rows: impl Iterator<Item = T>, key: F) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    // stable, so equal timestamps keep insertion order
    rows.sort_by_key(|r| key(r));
    rows
}

#[serenity::async_trait]
impl TrackingStore for MemoryStore {
    async fn insert_tier_sample(&self, sample: &RankSample) -> Result<(), Error> {
        self.write().cutoffs.push(sample.clone());
        Ok(())
    }

    async fn tier_samples(&self, event_id: u32, tier: u32) -> Result<Vec<RankSample>, Error> {
        let tables = self.read();
        Ok(sorted(
            tables
                .cutoffs
                .iter()
                .filter(|s| s.event_id == event_id && s.tier == tier)
                .cloned(),
            |s| s.timestamp,
        ))
    }

    async fn latest_tier_sample(
        &self,
        event_id: u32,
        tier: u32,
    ) -> Result<Option<RankSample>, Error> {
        Ok(self.tier_samples(event_id, tier).await?.pop())
    }

    async fn player_samples(
        &self,
        event_id: u32,
        player_id: &str,
    ) -> Result<Vec<RankSample>, Error> {
        let tables = self.read();
        Ok(sorted(
            tables
                .cutoffs
                .iter()
                .filter(|s| s.event_id == event_id && s.player_id == player_id)
                .cloned(),
            |s| s.timestamp,
        ))
    }

    async fn latest_player_sample(
        &self,
        event_id: u32,
        player_id: &str,
    ) -> Result<Option<RankSample>, Error> {
        Ok(self.player_samples(event_id, player_id).await?.pop())
    }

    async fn insert_user_sample(&self, sample: &UserRankSample) -> Result<(), Error> {
        self.write().users.push(sample.clone());
        Ok(())
    }

    async fn user_samples(
        &self,
        event_id: u32,
        user_id: &str,
    ) -> Result<Vec<UserRankSample>, Error> {
        let tables = self.read();
        Ok(sorted(
            tables
                .users
                .iter()
                .filter(|s| s.event_id == event_id && s.user_id == user_id)
                .cloned(),
            |s| s.timestamp,
        ))
    }

    async fn save_event_rates(&self, rates: &EventRates) -> Result<(), Error> {
        self.write().rates.insert(rates.event_id, rates.clone());
        Ok(())
    }

    async fn event_rates(&self, event_type: &str) -> Result<Vec<EventRates>, Error> {
        Ok(self
            .read()
            .rates
            .values()
            .filter(|r| r.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn has_event_rates(&self, event_id: u32) -> Result<bool, Error> {
        Ok(self.read().rates.contains_key(&event_id))
    }

    async fn sampled_events(&self) -> Result<Vec<u32>, Error> {
        let ids: BTreeSet<u32> = self.read().cutoffs.iter().map(|s| s.event_id).collect();
        Ok(ids.into_iter().collect())
    }

    async fn create_tracker(&self, tracker: NewTracker) -> Result<TrackedThreshold, Error> {
        let mut tables = self.write();
        tables.next_tracker_id += 1;
        let created = TrackedThreshold::from_new(tables.next_tracker_id, tracker);
        tables.trackers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn trackers(&self) -> Result<Vec<TrackedThreshold>, Error> {
        Ok(self.read().trackers.values().cloned().collect())
    }

    async fn channel_trackers(&self, channel_id: u64) -> Result<Vec<TrackedThreshold>, Error> {
        Ok(self
            .read()
            .trackers
            .values()
            .filter(|t| t.channel_id == channel_id)
            .cloned()
            .collect())
    }

    async fn update_tracker_score(
        &self,
        id: i64,
        score: i64,
        timestamp: i64,
    ) -> Result<(), Error> {
        if let Some(tracker) = self.write().trackers.get_mut(&id) {
            tracker.last_observed_score = Some(score);
            tracker.last_observed_at = Some(timestamp);
        }
        Ok(())
    }

    async fn delete_tracker(&self, id: i64, channel_id: u64) -> Result<bool, Error> {
        let mut tables = self.write();
        match tables.trackers.get(&id) {
            Some(t) if t.channel_id == channel_id => {
                tables.trackers.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::modules::trackers::tracker::{TrackCondition, TrackTarget};

    fn sample(tier: u32, timestamp: i64, score: i64, player: &str) -> RankSample {
        RankSample {
            event_id: 3,
            tier,
            timestamp,
            score,
            player_id: player.into(),
            game_num: 0,
        }
    }

    #[tokio::test]
    async fn test_tier_samples_round_trip_in_order() {
        let store = MemoryStore::new();
        let inserted = vec![
            sample(100, 1_000, 10, "a"),
            sample(100, 2_000, 20, "a"),
            sample(100, 2_000, 25, "b"),
            sample(100, 3_000, 30, "b"),
        ];
        for s in &inserted {
            store.insert_tier_sample(s).await.unwrap();
        }
        store.insert_tier_sample(&sample(200, 1_500, 5, "c")).await.unwrap();

        let pairs: Vec<(i64, i64)> = store
            .tier_samples(3, 100)
            .await
            .unwrap()
            .iter()
            .map(|s| (s.timestamp, s.score))
            .collect();
        assert_eq!(pairs, vec![(1_000, 10), (2_000, 20), (2_000, 25), (3_000, 30)]);

        let by_player: Vec<(i64, i64)> = store
            .player_samples(3, "b")
            .await
            .unwrap()
            .iter()
            .map(|s| (s.timestamp, s.score))
            .collect();
        assert_eq!(by_player, vec![(2_000, 25), (3_000, 30)]);

        assert_eq!(store.latest_tier_sample(3, 100).await.unwrap().unwrap().score, 30);
        assert_eq!(store.latest_player_sample(3, "c").await.unwrap().unwrap().tier, 200);
        assert!(store.latest_player_sample(4, "c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_samples() {
        let store = MemoryStore::new();
        for (ts, score) in [(2_000, 200), (1_000, 100)] {
            store
                .insert_user_sample(&UserRankSample {
                    user_id: "u".into(),
                    tier: 50,
                    event_id: 3,
                    timestamp: ts,
                    score,
                })
                .await
                .unwrap();
        }

        let samples = store.user_samples(3, "u").await.unwrap();
        assert_eq!(samples.iter().map(|s| s.score).collect::<Vec<_>>(), vec![100, 200]);
        assert!(store.user_samples(3, "v").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_rates_by_type() {
        let store = MemoryStore::new();
        let rates = EventRates {
            event_id: 9,
            event_type: "marathon".into(),
            rates: BTreeMap::from([(100, 1.1)]),
        };
        store.save_event_rates(&rates).await.unwrap();

        assert!(store.has_event_rates(9).await.unwrap());
        assert!(!store.has_event_rates(10).await.unwrap());
        assert_eq!(store.event_rates("marathon").await.unwrap(), vec![rates]);
        assert!(store.event_rates("cheerful_carnival").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tracker_lifecycle() {
        let store = MemoryStore::new();
        let created = store
            .create_tracker(NewTracker {
                owner_id: 1,
                channel_id: 10,
                target: TrackTarget::Tier(100),
                condition: TrackCondition::Cutoff(500),
            })
            .await
            .unwrap();

        store.update_tracker_score(created.id, 400, 7).await.unwrap();
        let listed = store.channel_trackers(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].last_observed_score, Some(400));
        assert_eq!(listed[0].last_observed_at, Some(7));
        assert!(store.channel_trackers(11).await.unwrap().is_empty());

        // only removable from its own channel
        assert!(!store.delete_tracker(created.id, 11).await.unwrap());
        assert!(store.delete_tracker(created.id, 10).await.unwrap());
        assert!(store.trackers().await.unwrap().is_empty());
    }
}
