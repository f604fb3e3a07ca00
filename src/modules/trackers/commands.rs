use tracing::debug;

use super::tracker::{NewTracker, TrackCondition, TrackTarget, MAX_TRACKERS_PER_CHANNEL};
use crate::types::{Context, Error};
use crate::util::format_score;

/// A tracker either watches for a cutoff or for gains, never both.
pub(crate) fn build_condition(
    cutoff: Option<i64>,
    min_gain: Option<i64>,
    max_gain: Option<i64>,
) -> Result<TrackCondition, &'static str> {
    match (cutoff, min_gain, max_gain) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            Err("a tracker takes either a cutoff or gain bounds, not both")
        }
        (Some(cutoff), None, None) if cutoff > 0 => Ok(TrackCondition::Cutoff(cutoff)),
        (Some(_), None, None) => Err("cutoff must be positive"),
        (None, None, None) => Err("give a cutoff or at least one gain bound"),
        (None, Some(min), Some(max)) if min > max => Err("min-gain can't be above max-gain"),
        (None, min, max) => Ok(TrackCondition::Gain { min, max }),
    }
}

fn describe(condition: &TrackCondition) -> String {
    match condition {
        TrackCondition::Cutoff(cutoff) => format!("reaches {}", format_score(*cutoff)),
        TrackCondition::Gain { min, max } => format!(
            "gains {} to {}",
            min.map_or("any".into(), format_score),
            max.map_or("any".into(), format_score)
        ),
    }
}

async fn create_tracker(
    ctx: Context<'_>,
    target: TrackTarget,
    cutoff: Option<i64>,
    min_gain: Option<i64>,
    max_gain: Option<i64>,
) -> Result<(), Error> {
    let condition = match build_condition(cutoff, min_gain, max_gain) {
        Ok(condition) => condition,
        Err(msg) => {
            ctx.reply(format!("error: {}", msg)).await?;
            return Ok(());
        }
    };

    let store = &ctx.data().store;
    let channel_id = ctx.channel_id().get();
    if store.channel_trackers(channel_id).await?.len() >= MAX_TRACKERS_PER_CHANNEL {
        ctx.reply(format!(
            "this channel already has {} trackers, remove one with /untrack first",
            MAX_TRACKERS_PER_CHANNEL
        ))
        .await?;
        return Ok(());
    }

    let tracker = store
        .create_tracker(NewTracker {
            owner_id: ctx.author().id.get(),
            channel_id,
            target,
            condition,
        })
        .await?;

    debug!(tracker_id = tracker.id, channel_id, "tracker created");
    ctx.reply(format!(
        "tracker #{} created, you'll be pinged when {} {}",
        tracker.id,
        tracker.target,
        describe(&tracker.condition)
    ))
    .await?;
    Ok(())
}

#[poise::command(slash_command, rename = "track-tier")]
pub(crate) async fn track_tier(
    ctx: Context<'_>,
    #[description = "Leaderboard position"] tier: u32,
    #[description = "Notify once the score reaches this"] cutoff: Option<i64>,
    #[description = "Notify on gains of at least this"] min_gain: Option<i64>,
    #[description = "Notify on gains of at most this"] max_gain: Option<i64>,
) -> Result<(), Error> {
    create_tracker(ctx, TrackTarget::Tier(tier), cutoff, min_gain, max_gain).await
}

#[poise::command(slash_command, rename = "track-player")]
pub(crate) async fn track_player(
    ctx: Context<'_>,
    #[description = "Game account id"] player_id: String,
    #[description = "Notify once the score reaches this"] cutoff: Option<i64>,
    #[description = "Notify on gains of at least this"] min_gain: Option<i64>,
    #[description = "Notify on gains of at most this"] max_gain: Option<i64>,
) -> Result<(), Error> {
    let player_id = player_id.trim().to_owned();
    if player_id.is_empty() || !player_id.chars().all(|c| c.is_ascii_digit()) {
        ctx.reply(format!("error: invalid player id, {}", player_id))
            .await?;
        return Ok(());
    }

    create_tracker(ctx, TrackTarget::Player(player_id), cutoff, min_gain, max_gain).await
}

#[poise::command(slash_command, rename = "trackers")]
pub(crate) async fn trackers(ctx: Context<'_>) -> Result<(), Error> {
    let trackers = ctx
        .data()
        .store
        .channel_trackers(ctx.channel_id().get())
        .await?;

    let text = if trackers.is_empty() {
        "no trackers in this channel".to_string()
    } else {
        trackers
            .iter()
            .map(|t| {
                format!(
                    "`#{}` • {} {} • by <@{}>",
                    t.id,
                    t.target,
                    describe(&t.condition),
                    t.owner_id
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    };

    ctx.reply(text).await?;
    Ok(())
}

#[poise::command(slash_command, rename = "untrack")]
pub(crate) async fn untrack(
    ctx: Context<'_>,
    #[description = "Tracker number, see /trackers"] id: i64,
) -> Result<(), Error> {
    let removed = ctx
        .data()
        .store
        .delete_tracker(id, ctx.channel_id().get())
        .await?;

    ctx.reply(match removed {
        true => format!("tracker #{} removed", id),
        false => format!("no tracker #{} in this channel", id),
    })
    .await?;
    Ok(())
}
