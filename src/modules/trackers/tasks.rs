use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};
use tracing::{debug, error, info};

use super::tracker::{Notification, TrackTarget, TrackedThreshold};
use crate::modules::tracking::store::TrackingStore;
use crate::types::{Data, Error};
use crate::util::now_ms;

pub(crate) async fn check_trackers(ctx: &serenity::Context, data: Arc<Data>) -> Result<(), Error> {
    let Some(event) = data.current_event(now_ms()) else {
        return Ok(());
    };

    for tracker in data.store.trackers().await? {
        let id = tracker.id;
        let notifications = match step_tracker(data.store.as_ref(), event.id, tracker).await {
            Ok(notifications) => notifications,
            Err(err) => {
                error!(tracker_id = id, "error checking tracker: {}", err);
                continue;
            }
        };

        for notification in notifications {
            if let Err(err) = serenity::ChannelId::new(notification.channel_id)
                .say(&ctx.http, notification.message())
                .await
            {
                error!(
                    tracker_id = id,
                    channel_id = notification.channel_id,
                    "couldn't send tracker notification: {}",
                    err
                );
            }
        }
    }

    Ok(())
}

/// Feeds every sample stored since the tracker last looked, oldest first, and
/// persists the result: a fired tracker is deleted, an armed one remembers the
/// last score it saw. A tracker that never looked starts from the newest sample.
pub(crate) async fn step_tracker(
    store: &dyn TrackingStore,
    event_id: u32,
    mut tracker: TrackedThreshold,
) -> Result<Vec<Notification>, Error> {
    let mut samples = match &tracker.target {
        TrackTarget::Tier(tier) => store.tier_samples(event_id, *tier).await?,
        TrackTarget::Player(player_id) => store.player_samples(event_id, player_id).await?,
    };
    match tracker.last_observed_at {
        Some(seen) => samples.retain(|s| s.timestamp > seen),
        None => samples = samples.pop().into_iter().collect(),
    }
    let Some(last) = samples.last().map(|s| (s.score, s.timestamp)) else {
        return Ok(Vec::new());
    };

    let mut notifications = Vec::new();
    for sample in &samples {
        let observation = tracker.observe(sample.score);
        notifications.extend(observation.notification);
        if observation.retire {
            store.delete_tracker(tracker.id, tracker.channel_id).await?;
            info!(tracker_id = tracker.id, target = %tracker.target, "tracker fired");
            return Ok(notifications);
        }
    }

    let (score, timestamp) = last;
    store.update_tracker_score(tracker.id, score, timestamp).await?;
    debug!(
        tracker_id = tracker.id,
        score,
        samples = samples.len(),
        "tracker updated"
    );

    Ok(notifications)
}
