use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};

use crate::spawn_task;
use crate::types::Data;

pub(crate) mod master;
pub(crate) mod tasks;

pub(crate) use master::{Event, EventCatalog};

pub(crate) fn start_tasks(ctx: serenity::Context, data: Arc<Data>) {
    spawn_task!(3600, tasks::refresh_catalog, ctx, data);
}
