use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};
use tracing::{debug, info, warn};

use super::games::{next_game_num, GameBounds};
use super::sample::RankSample;
use super::store::TrackingStore;
use crate::modules::catalog::Event;
use crate::modules::prediction::predictor::fit_trend;
use crate::modules::prediction::EventRates;
use crate::modules::scheduler::request::{RankingEntry, RankingParams};
use crate::types::{Data, Error};
use crate::util::now_ms;

pub(crate) async fn poll_rankings(_ctx: &serenity::Context, data: Arc<Data>) -> Result<(), Error> {
    let now = now_ms();
    let Some(event) = data.current_event(now) else {
        debug!("no event active, skipping ranking poll");
        return Ok(());
    };
    if !event.is_aggregating(now) {
        debug!(event_id = event.id, "event aggregation ended, skipping ranking poll");
        return Ok(());
    }

    let responses = futures::future::join_all(data.tiers.iter().map(|tier| {
        data.scheduler
            .ranking(false, event.id, RankingParams::for_rank(*tier))
    }))
    .await;

    let mut stored = 0;
    for (tier, response) in data.tiers.iter().zip(responses) {
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(event_id = event.id, tier, "couldn't fetch ranking: {}", err);
                continue;
            }
        };

        let Some(entry) = response.at_rank(*tier) else {
            warn!(event_id = event.id, tier, "ranking response didn't include tier");
            continue;
        };

        if ingest_entry(data.store.as_ref(), &data.game_bounds, event.id, now, entry)
            .await?
            .is_some()
        {
            stored += 1;
        }
    }

    debug!(event_id = event.id, stored, "ranking poll finished");
    Ok(())
}

/// Appends a tier sample for a ranking entry, stamping the game number from
/// the player's previous sample. Entries scoring below the player's stored
/// score are stale and skipped.
pub(crate) async fn ingest_entry(
    store: &dyn TrackingStore,
    bounds: &GameBounds,
    event_id: u32,
    timestamp: i64,
    entry: &RankingEntry,
) -> Result<Option<RankSample>, Error> {
    let previous = store.latest_player_sample(event_id, &entry.user_id).await?;

    if let Some(prev) = &previous {
        if entry.score < prev.score {
            warn!(
                event_id,
                player_id = %entry.user_id,
                stored = prev.score,
                received = entry.score,
                "ignoring stale ranking entry"
            );
            return Ok(None);
        }
    }

    let sample = RankSample {
        event_id,
        tier: entry.rank,
        timestamp,
        score: entry.score,
        player_id: entry.user_id.clone(),
        game_num: next_game_num(previous.as_ref(), entry.score, bounds),
    };
    store.insert_tier_sample(&sample).await?;

    Ok(Some(sample))
}

pub(crate) async fn record_event_rates(_ctx: &serenity::Context, data: Arc<Data>) -> Result<(), Error> {
    let finished = data.finished_events(now_ms());
    let recorded = record_missing_rates(data.store.as_ref(), &finished, &data.tiers).await?;
    if recorded > 0 {
        debug!(events = recorded, "event rates backfilled");
    }
    Ok(())
}

/// Records rates for every finished event that has samples but no rates yet.
/// Returns how many events were recorded.
pub(crate) async fn record_missing_rates(
    store: &dyn TrackingStore,
    finished: &[Event],
    tiers: &[u32],
) -> Result<usize, Error> {
    let sampled: BTreeSet<u32> = store.sampled_events().await?.into_iter().collect();
    let mut recorded = 0;

    for event in finished.iter().filter(|e| sampled.contains(&e.id)) {
        if store.has_event_rates(event.id).await? {
            continue;
        }

        let rates = compute_event_rates(store, event, tiers).await?;
        if rates.rates.is_empty() {
            debug!(event_id = event.id, "not enough data to record event rates");
            continue;
        }

        store.save_event_rates(&rates).await?;
        info!(event_id = event.id, tiers = rates.rates.len(), "recorded event rates");
        recorded += 1;
    }

    Ok(recorded)
}

/// Ratio of each tier's final score to its mid-event trend projection.
pub(crate) async fn compute_event_rates(
    store: &dyn TrackingStore,
    event: &Event,
    tiers: &[u32],
) -> Result<EventRates, Error> {
    let mut rates = BTreeMap::new();

    for tier in tiers {
        let samples = store.tier_samples(event.id, *tier).await?;
        let Some(last) = samples.iter().rev().find(|s| s.timestamp <= event.aggregate_at) else {
            continue;
        };
        let Some(trend) = fit_trend(&samples, event) else {
            continue;
        };

        let projected = trend.at(event.duration() as f64);
        if projected > 0.0 {
            rates.insert(*tier, last.score as f64 / projected);
        }
    }

    Ok(EventRates {
        event_id: event.id,
        event_type: event.event_type.clone(),
        rates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::tracking::store::MemoryStore;
    use crate::util::{DAY_MS, HOUR_MS};

    fn entry(rank: u32, score: i64, user_id: &str) -> RankingEntry {
        RankingEntry {
            rank,
            score,
            user_id: user_id.into(),
            name: String::new(),
        }
    }

    #[tokio::test]
    async fn test_ingest_stamps_game_numbers() {
        let store = MemoryStore::new();
        let bounds = GameBounds::default();

        let first = ingest_entry(&store, &bounds, 1, 0, &entry(100, 10_000, "a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.game_num, 0);

        let second = ingest_entry(&store, &bounds, 1, 60_000, &entry(100, 12_000, "a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.game_num, 1);

        // catch-up jump isn't a game
        let third = ingest_entry(&store, &bounds, 1, 120_000, &entry(99, 200_000, "a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(third.game_num, 1);
        assert_eq!(third.tier, 99);

        // a different player takes over the tier and starts from zero
        let other = ingest_entry(&store, &bounds, 1, 120_000, &entry(100, 150_000, "b"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(other.game_num, 0);

        assert_eq!(store.tier_samples(1, 100).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_stale_entries_are_skipped() {
        let store = MemoryStore::new();
        let bounds = GameBounds::default();

        ingest_entry(&store, &bounds, 1, 0, &entry(10, 50_000, "a"))
            .await
            .unwrap();
        let stale = ingest_entry(&store, &bounds, 1, 60_000, &entry(10, 40_000, "a"))
            .await
            .unwrap();

        assert!(stale.is_none());
        assert_eq!(store.player_samples(1, "a").await.unwrap().len(), 1);
    }

    fn three_day_event(id: u32) -> Event {
        Event {
            id,
            event_type: "marathon".into(),
            name: String::new(),
            start_at: 0,
            aggregate_at: 3 * DAY_MS,
            closed_at: 3 * DAY_MS + HOUR_MS,
            characters: BTreeSet::new(),
        }
    }

    /// 10k/hour for two days then 20k/hour on the final day
    async fn push_final_surge(store: &MemoryStore, event_id: u32) {
        for hour in 0..=72 {
            let score = if hour <= 48 {
                hour * 10_000
            } else {
                480_000 + (hour - 48) * 20_000
            };
            store
                .insert_tier_sample(&RankSample {
                    event_id,
                    tier: 100,
                    timestamp: hour * HOUR_MS,
                    score,
                    player_id: "p".into(),
                    game_num: 0,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_compute_event_rates_from_final_surge() {
        let store = MemoryStore::new();
        let event = three_day_event(5);
        push_final_surge(&store, 5).await;

        let rates = compute_event_rates(&store, &event, &[100, 200]).await.unwrap();
        assert_eq!(rates.event_type, "marathon");
        assert!(!rates.rates.contains_key(&200));

        // trend projects 720k, actual is 960k
        let rate = rates.rates[&100];
        assert!((rate - 960_000.0 / 720_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rates_backfilled_for_every_finished_event() {
        let store = MemoryStore::new();
        push_final_surge(&store, 5).await;
        push_final_surge(&store, 6).await;
        let finished = vec![three_day_event(5), three_day_event(6), three_day_event(7)];

        // bot was down when 5 and 6 ended; 7 was never sampled
        let recorded = record_missing_rates(&store, &finished, &[100]).await.unwrap();
        assert_eq!(recorded, 2);
        assert!(store.has_event_rates(5).await.unwrap());
        assert!(store.has_event_rates(6).await.unwrap());
        assert!(!store.has_event_rates(7).await.unwrap());

        assert_eq!(record_missing_rates(&store, &finished, &[100]).await.unwrap(), 0);
    }
}
