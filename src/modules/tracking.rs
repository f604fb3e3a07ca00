use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};

use crate::spawn_task;
use crate::types::{Data, Error};

pub(crate) mod commands;
pub(crate) mod games;
pub(crate) mod hourly;
pub(crate) mod sample;
pub(crate) mod store;
pub(crate) mod tasks;

pub(crate) fn commands() -> Vec<poise::Command<Arc<Data>, Error>> {
    vec![
        commands::cutoff(),
        commands::leaderboard(),
        commands::games(),
        commands::rank(),
    ]
}

pub(crate) fn start_tasks(ctx: serenity::Context, data: Arc<Data>, poll_seconds: u32) {
    spawn_task!(poll_seconds, tasks::poll_rankings, ctx, data);
    spawn_task!(600, tasks::record_event_rates, ctx, data);
}
