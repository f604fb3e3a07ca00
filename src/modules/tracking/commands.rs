use poise::serenity_prelude::{self as serenity};
use tracing::debug;

use super::games::{infer_games, GamesSummary};
use super::hourly::{last_hour_games, last_hour_gain, peak_hourly_gain};
use super::sample::UserRankSample;
use crate::modules::prediction::predict;
use crate::modules::scheduler::request::RankingParams;
use crate::types::{Context, Error};
use crate::util::{format_estimate, format_score, now_ms, relative_time, HOUR_MS};

const NO_EVENT: &str = "no event is currently running";

#[poise::command(slash_command, rename = "cutoff")]
pub(crate) async fn cutoff(
    ctx: Context<'_>,
    #[description = "Leaderboard position"] tier: u32,
    #[description = "Show the trend equation"] detailed: Option<bool>,
) -> Result<(), Error> {
    ctx.defer().await?;
    let now = now_ms();
    let data = ctx.data();

    let Some(event) = data.current_event(now) else {
        ctx.reply(NO_EVENT).await?;
        return Ok(());
    };

    let samples = data.store.tier_samples(event.id, tier).await?;
    let Some(latest) = samples.last() else {
        ctx.reply(format!("no data for T{} yet", tier)).await?;
        return Ok(());
    };

    let history = data.store.event_rates(&event.event_type).await?;
    let rate = data.final_rate(&event, tier, &history);
    let prediction = predict(&samples, &event, rate);
    debug!(event_id = event.id, tier, rate, "cutoff prediction requested");

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("T{} cutoff • {}", tier, event.name))
        .field("Score", format_score(latest.score), true)
        .field(
            "Last hour",
            format!("+{}", format_score(last_hour_gain(&samples, now))),
            true,
        )
        .field("Updated", relative_time(latest.timestamp), true)
        .field("Estimate", prediction.to_string(), true);

    embed = match prediction.projection() {
        None => embed.field("Smoothed", "N/A", true),
        Some(p) => {
            let embed = embed.field(
                "Smoothed",
                format!(
                    "{} ± {}",
                    format_estimate(p.smoothed_estimate),
                    format_estimate(p.smoothed_error)
                ),
                true,
            );
            if detailed.unwrap_or(false) {
                embed.field("Trend", format!("`{}`", p.equation()), false)
            } else {
                embed
            }
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed.footer(
        serenity::CreateEmbedFooter::new(format!("Ends {}", relative_time(event.aggregate_at))),
    )))
    .await?;
    Ok(())
}

#[poise::command(slash_command, rename = "leaderboard")]
pub(crate) async fn leaderboard(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let now = now_ms();
    let data = ctx.data();

    let Some(event) = data.current_event(now) else {
        ctx.reply(NO_EVENT).await?;
        return Ok(());
    };

    let mut lines = Vec::with_capacity(data.tiers.len());
    for tier in &data.tiers {
        let samples = data.store.tier_samples(event.id, *tier).await?;
        let Some(latest) = samples.last() else {
            lines.push(format!("`T{}` • N/A", tier));
            continue;
        };

        lines.push(format!(
            "`T{}` • {} (+{})",
            tier,
            format_score(latest.score),
            format_score(last_hour_gain(&samples, now))
        ));
    }

    let embed = serenity::CreateEmbed::new()
        .title(format!("Leaderboard • {}", event.name))
        .description(lines.join("\n"));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// One line per event day, game counts for each hour since the event start.
fn heatmap_text(summary: &GamesSummary) -> String {
    summary
        .heatmap()
        .iter()
        .enumerate()
        .map(|(day, hours)| {
            let counts = hours
                .iter()
                .map(|count| format!("{:>2}", count))
                .collect::<Vec<String>>()
                .join(" ");
            format!("D{:<2} {}", day + 1, counts)
        })
        .collect::<Vec<String>>()
        .join("\n")
}

#[poise::command(slash_command, rename = "games")]
pub(crate) async fn games(
    ctx: Context<'_>,
    #[description = "Leaderboard position"] tier: u32,
) -> Result<(), Error> {
    ctx.defer().await?;
    let now = now_ms();
    let data = ctx.data();

    let Some(event) = data.current_event(now) else {
        ctx.reply(NO_EVENT).await?;
        return Ok(());
    };

    let Some(latest) = data.store.latest_tier_sample(event.id, tier).await? else {
        ctx.reply(format!("no data for T{} yet", tier)).await?;
        return Ok(());
    };

    let samples = data
        .store
        .player_samples(event.id, &latest.player_id)
        .await?;
    let summary = infer_games(&samples, event.start_at, &data.game_bounds);
    if !summary.has_games() {
        ctx.reply(format!("no usable game data for T{}", tier)).await?;
        return Ok(());
    }

    let busiest = summary
        .busiest_hour()
        .map(|(hour, count)| {
            format!(
                "{} games, {}",
                count,
                relative_time(event.start_at + hour as i64 * HOUR_MS)
            )
        })
        .unwrap_or_else(|| "N/A".into());

    let embed = serenity::CreateEmbed::new()
        .title(format!("T{} games • {}", tier, event.name))
        .field("Games", summary.game_count().to_string(), true)
        .field(
            "Avg points/game",
            summary
                .average_points()
                .map_or("N/A".into(), format_estimate),
            true,
        )
        .field(
            "Last hour",
            format!(
                "{} games, +{}",
                last_hour_games(&summary.annotated, now),
                format_score(last_hour_gain(&samples, now))
            ),
            true,
        )
        .field("Peak hour", format!("+{}", format_score(peak_hourly_gain(&samples))), true)
        .field("Busiest hour", busiest, true)
        .field("Games per hour", format!("```\n{}\n```", heatmap_text(&summary)), false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[poise::command(slash_command, rename = "rank")]
pub(crate) async fn rank(
    ctx: Context<'_>,
    #[description = "Game account id"] user_id: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let user_id = user_id.trim().to_owned();
    if user_id.is_empty() || !user_id.chars().all(|c| c.is_ascii_digit()) {
        ctx.reply(format!("error: invalid user id, {}", user_id)).await?;
        return Ok(());
    }

    let now = now_ms();
    let Some(event) = data.current_event(now) else {
        ctx.reply(NO_EVENT).await?;
        return Ok(());
    };

    if let Err(limited) = data.rate_limiter.check(ctx.author().id.get()) {
        ctx.reply(limited.to_string()).await?;
        return Ok(());
    }

    ctx.defer().await?;
    let response = data
        .scheduler
        .ranking(true, event.id, RankingParams::for_user(&user_id))
        .await?;
    let Some(entry) = response.for_user(&user_id) else {
        ctx.reply(format!("`{}` isn't ranked in this event", user_id))
            .await?;
        return Ok(());
    };

    data.store
        .insert_user_sample(&UserRankSample {
            user_id: user_id.clone(),
            tier: entry.rank,
            event_id: event.id,
            timestamp: now,
            score: entry.score,
        })
        .await?;
    let samples = data.store.user_samples(event.id, &user_id).await?;

    let name = if entry.name.is_empty() {
        match data.scheduler.profile(true, &user_id).await {
            Ok(profile) => profile["user"]["name"].as_str().unwrap_or_default().to_owned(),
            Err(err) => {
                debug!(user_id = %user_id, "couldn't fetch profile: {}", err);
                String::new()
            }
        }
    } else {
        entry.name.clone()
    };

    let embed = serenity::CreateEmbed::new()
        .title(if name.is_empty() {
            format!("`{}`", user_id)
        } else {
            format!("{} (`{}`)", name, user_id)
        })
        .field("Rank", format!("T{}", entry.rank), true)
        .field("Score", format_score(entry.score), true)
        .field(
            "Last hour",
            format!("+{}", format_score(last_hour_gain(&samples, now))),
            true,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
