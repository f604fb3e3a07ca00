use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};

use crate::spawn_task;
use crate::types::{Data, Error};

pub(crate) mod commands;
pub(crate) mod tasks;
pub(crate) mod tracker;

pub(crate) fn commands() -> Vec<poise::Command<Arc<Data>, Error>> {
    vec![
        commands::track_tier(),
        commands::track_player(),
        commands::trackers(),
        commands::untrack(),
    ]
}

pub(crate) fn start_tasks(ctx: serenity::Context, data: Arc<Data>, poll_seconds: u32) {
    spawn_task!(poll_seconds, tasks::check_trackers, ctx, data);
}
