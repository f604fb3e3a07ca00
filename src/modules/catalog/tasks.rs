use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};
use tracing::info;

use super::master::{EventCatalog, MasterCard, MasterEvent, MasterEventCard};
use crate::types::{Data, Error};

pub(crate) async fn refresh_catalog(_ctx: &serenity::Context, data: Arc<Data>) -> Result<(), Error> {
    let catalog = fetch_catalog(&data).await?;
    let count = catalog.len();

    *data.catalog.write().expect("catalog lock got poisoned") = catalog;

    info!(events = count, "event catalog refreshed");
    Ok(())
}

pub(crate) async fn fetch_catalog(data: &Data) -> Result<EventCatalog, Error> {
    let (events, event_cards, cards) = futures::try_join!(
        data.scheduler.master::<Vec<MasterEvent>>("events"),
        data.scheduler.master::<Vec<MasterEventCard>>("eventCards"),
        data.scheduler.master::<Vec<MasterCard>>("cards"),
    )?;

    Ok(EventCatalog::from_master(events, event_cards, cards))
}
