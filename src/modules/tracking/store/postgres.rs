use std::collections::BTreeMap;

use poise::serenity_prelude::{self as serenity};

use super::TrackingStore;
use crate::modules::prediction::EventRates;
use crate::modules::tracking::sample::{RankSample, UserRankSample};
use crate::modules::trackers::tracker::{
    NewTracker, TrackCondition, TrackTarget, TrackedThreshold, TrackerState,
};
use crate::types::Error;

const CUTOFF_COLUMNS: &str = "EventID AS event_id, Tier AS tier, Timestamp AS timestamp, Score AS score, ID AS player_id, GameNum AS game_num";
const USER_COLUMNS: &str =
    "id AS user_id, Tier AS tier, EventID AS event_id, Timestamp AS timestamp, Score AS score";
const TRACKER_COLUMNS: &str =
    "id, owner_id, channel_id, tier, player_id, cutoff, min_gain, max_gain, last_score, last_timestamp";

#[derive(sqlx::FromRow)]
struct CutoffRow {
    event_id: i32,
    tier: i32,
    timestamp: i64,
    score: i64,
    player_id: String,
    game_num: i32,
}

impl TryFrom<CutoffRow> for RankSample {
    type Error = Error;

    fn try_from(row: CutoffRow) -> Result<Self, Self::Error> {
        Ok(Self {
            event_id: row.event_id.try_into()?,
            tier: row.tier.try_into()?,
            timestamp: row.timestamp,
            score: row.score,
            player_id: row.player_id,
            game_num: row.game_num.try_into()?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    tier: i32,
    event_id: i32,
    timestamp: i64,
    score: i64,
}

impl TryFrom<UserRow> for UserRankSample {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.user_id,
            tier: row.tier.try_into()?,
            event_id: row.event_id.try_into()?,
            timestamp: row.timestamp,
            score: row.score,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RateRow {
    event_id: i32,
    event_type: String,
    tier: i32,
    rate: f64,
}

#[derive(sqlx::FromRow)]
struct TrackerRow {
    id: i64,
    owner_id: i64,
    channel_id: i64,
    tier: Option<i32>,
    player_id: Option<String>,
    cutoff: Option<i64>,
    min_gain: Option<i64>,
    max_gain: Option<i64>,
    last_score: Option<i64>,
    last_timestamp: Option<i64>,
}

impl TryFrom<TrackerRow> for TrackedThreshold {
    type Error = Error;

    fn try_from(row: TrackerRow) -> Result<Self, Self::Error> {
        let target = match (row.tier, row.player_id) {
            (Some(tier), _) => TrackTarget::Tier(tier.try_into()?),
            (None, Some(player_id)) => TrackTarget::Player(player_id),
            (None, None) => return Err(format!("tracker {} has no target", row.id).into()),
        };

        let condition = match row.cutoff {
            Some(cutoff) => TrackCondition::Cutoff(cutoff),
            None => TrackCondition::Gain {
                min: row.min_gain,
                max: row.max_gain,
            },
        };

        Ok(Self {
            id: row.id,
            owner_id: row.owner_id.try_into()?,
            channel_id: row.channel_id.try_into()?,
            target,
            condition,
            last_observed_score: row.last_score,
            last_observed_at: row.last_timestamp,
            state: TrackerState::Armed,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, Error>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

pub(crate) struct PgStore {
    db: sqlx::PgPool,
}

impl PgStore {
    pub(crate) fn new(db: sqlx::PgPool) -> Self {
        Self { db }
    }
}

#[serenity::async_trait]
impl TrackingStore for PgStore {
    async fn insert_tier_sample(&self, sample: &RankSample) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO cutoffs (EventID, Tier, Timestamp, Score, ID, GameNum) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(i32::try_from(sample.event_id)?)
        .bind(i32::try_from(sample.tier)?)
        .bind(sample.timestamp)
        .bind(sample.score)
        .bind(&sample.player_id)
        .bind(i32::try_from(sample.game_num)?)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn tier_samples(&self, event_id: u32, tier: u32) -> Result<Vec<RankSample>, Error> {
        let rows: Vec<CutoffRow> = sqlx::query_as(&format!(
            "SELECT {} FROM cutoffs WHERE EventID = $1 AND Tier = $2 ORDER BY Timestamp, seq",
            CUTOFF_COLUMNS
        ))
        .bind(i32::try_from(event_id)?)
        .bind(i32::try_from(tier)?)
        .fetch_all(&self.db)
        .await?;

        collect(rows)
    }

    async fn latest_tier_sample(
        &self,
        event_id: u32,
        tier: u32,
    ) -> Result<Option<RankSample>, Error> {
        let row: Option<CutoffRow> = sqlx::query_as(&format!(
            "SELECT {} FROM cutoffs WHERE EventID = $1 AND Tier = $2 ORDER BY Timestamp DESC, seq DESC LIMIT 1",
            CUTOFF_COLUMNS
        ))
        .bind(i32::try_from(event_id)?)
        .bind(i32::try_from(tier)?)
        .fetch_optional(&self.db)
        .await?;

        row.map(RankSample::try_from).transpose()
    }

    async fn player_samples(
        &self,
        event_id: u32,
        player_id: &str,
    ) -> Result<Vec<RankSample>, Error> {
        let rows: Vec<CutoffRow> = sqlx::query_as(&format!(
            "SELECT {} FROM cutoffs WHERE EventID = $1 AND ID = $2 ORDER BY Timestamp, seq",
            CUTOFF_COLUMNS
        ))
        .bind(i32::try_from(event_id)?)
        .bind(player_id)
        .fetch_all(&self.db)
        .await?;

        collect(rows)
    }

    async fn latest_player_sample(
        &self,
        event_id: u32,
        player_id: &str,
    ) -> Result<Option<RankSample>, Error> {
        let row: Option<CutoffRow> = sqlx::query_as(&format!(
            "SELECT {} FROM cutoffs WHERE EventID = $1 AND ID = $2 ORDER BY Timestamp DESC, seq DESC LIMIT 1",
            CUTOFF_COLUMNS
        ))
        .bind(i32::try_from(event_id)?)
        .bind(player_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(RankSample::try_from).transpose()
    }

    async fn insert_user_sample(&self, sample: &UserRankSample) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO users (id, Tier, EventID, Timestamp, Score) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&sample.user_id)
        .bind(i32::try_from(sample.tier)?)
        .bind(i32::try_from(sample.event_id)?)
        .bind(sample.timestamp)
        .bind(sample.score)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn user_samples(
        &self,
        event_id: u32,
        user_id: &str,
    ) -> Result<Vec<UserRankSample>, Error> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE EventID = $1 AND id = $2 ORDER BY Timestamp, seq",
            USER_COLUMNS
        ))
        .bind(i32::try_from(event_id)?)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        collect(rows)
    }

    async fn save_event_rates(&self, rates: &EventRates) -> Result<(), Error> {
        let mut tx = self.db.begin().await?;
        for (tier, rate) in &rates.rates {
            sqlx::query(
                "INSERT INTO event_rates (event_id, event_type, tier, rate) VALUES ($1, $2, $3, $4) ON CONFLICT (event_id, tier) DO UPDATE SET rate = $4",
            )
            .bind(i32::try_from(rates.event_id)?)
            .bind(&rates.event_type)
            .bind(i32::try_from(*tier)?)
            .bind(rate)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn event_rates(&self, event_type: &str) -> Result<Vec<EventRates>, Error> {
        let rows: Vec<RateRow> = sqlx::query_as(
            "SELECT event_id, event_type, tier, rate FROM event_rates WHERE event_type = $1 ORDER BY event_id, tier",
        )
        .bind(event_type)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: BTreeMap<u32, EventRates> = BTreeMap::new();
        for row in rows {
            let event_id = u32::try_from(row.event_id)?;
            grouped
                .entry(event_id)
                .or_insert_with(|| EventRates {
                    event_id,
                    event_type: row.event_type.clone(),
                    rates: BTreeMap::new(),
                })
                .rates
                .insert(row.tier.try_into()?, row.rate);
        }

        Ok(grouped.into_values().collect())
    }

    async fn has_event_rates(&self, event_id: u32) -> Result<bool, Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM event_rates WHERE event_id = $1)",
        )
        .bind(i32::try_from(event_id)?)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    async fn sampled_events(&self) -> Result<Vec<u32>, Error> {
        let ids: Vec<i32> =
            sqlx::query_scalar("SELECT DISTINCT EventID FROM cutoffs ORDER BY EventID")
                .fetch_all(&self.db)
                .await?;

        Ok(ids.into_iter().map(u32::try_from).collect::<Result<_, _>>()?)
    }

    async fn create_tracker(&self, tracker: NewTracker) -> Result<TrackedThreshold, Error> {
        let (tier, player_id) = match &tracker.target {
            TrackTarget::Tier(tier) => (Some(i32::try_from(*tier)?), None),
            TrackTarget::Player(id) => (None, Some(id.clone())),
        };
        let (cutoff, min_gain, max_gain) = match tracker.condition {
            TrackCondition::Cutoff(cutoff) => (Some(cutoff), None, None),
            TrackCondition::Gain { min, max } => (None, min, max),
        };

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO trackers (owner_id, channel_id, tier, player_id, cutoff, min_gain, max_gain) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(i64::try_from(tracker.owner_id)?)
        .bind(i64::try_from(tracker.channel_id)?)
        .bind(tier)
        .bind(player_id)
        .bind(cutoff)
        .bind(min_gain)
        .bind(max_gain)
        .fetch_one(&self.db)
        .await?;

        Ok(TrackedThreshold::from_new(id, tracker))
    }

    async fn trackers(&self) -> Result<Vec<TrackedThreshold>, Error> {
        let rows: Vec<TrackerRow> =
            sqlx::query_as(&format!("SELECT {} FROM trackers ORDER BY id", TRACKER_COLUMNS))
                .fetch_all(&self.db)
                .await?;

        collect(rows)
    }

    async fn channel_trackers(&self, channel_id: u64) -> Result<Vec<TrackedThreshold>, Error> {
        let rows: Vec<TrackerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trackers WHERE channel_id = $1 ORDER BY id",
            TRACKER_COLUMNS
        ))
        .bind(i64::try_from(channel_id)?)
        .fetch_all(&self.db)
        .await?;

        collect(rows)
    }

    async fn update_tracker_score(
        &self,
        id: i64,
        score: i64,
        timestamp: i64,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE trackers SET last_score = $2, last_timestamp = $3 WHERE id = $1")
            .bind(id)
            .bind(score)
            .bind(timestamp)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn delete_tracker(&self, id: i64, channel_id: u64) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM trackers WHERE id = $1 AND channel_id = $2")
            .bind(id)
            .bind(i64::try_from(channel_id)?)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
