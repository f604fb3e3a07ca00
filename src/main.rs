use std::{sync::Arc, time::Duration};

use poise::serenity_prelude::{self as serenity};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions,
};
use tracing::{debug, error, info, log::LevelFilter, warn};

use crate::modules::ratelimit::RateLimiter;
use crate::modules::tracking::store::{MemoryStore, PgStore, TrackingStore};
use crate::modules::{catalog, scheduler, stats, trackers, tracking};
use crate::types::{Data, Error};

mod config;
mod events;
mod modules;
mod task;
mod types;
mod util;

async fn connect_store(url: &str) -> Result<Arc<dyn TrackingStore>, Error> {
    if url.is_empty() {
        warn!("DATABASE_URL not set, samples will only be kept in memory");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let connect_opts = url
        .parse::<PgConnectOptions>()
        .map_err(|err| format!("couldn't parse db url: {}", err))?
        .log_statements(LevelFilter::Trace)
        .log_slow_statements(LevelFilter::Warn, Duration::from_secs(5));

    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(connect_opts)
        .await?;

    sqlx::migrate!().run(&db).await?;
    info!("connected to db, migrations applied");

    Ok(Arc::new(PgStore::new(db)))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = config::load_config().expect("error loading envfile");
    let tiers = config
        .tracking
        .tracked_tiers()
        .expect("error parsing TRACKING_TIERS");
    let game_bounds = config.tracking.game_bounds();
    let poll_seconds = config.tracking.poll_seconds;

    let store = connect_store(&config.db.url)
        .await
        .expect("error setting up storage");
    let scheduler = scheduler::start(&config.api).expect("error starting api workers");
    let rate_limiter = RateLimiter::new(config.api.rate_limit);

    let intents = serenity::GatewayIntents::non_privileged();
    let options = poise::FrameworkOptions {
        pre_command: |ctx| {
            Box::pin(async move {
                debug!("executing command /{}...", ctx.invoked_command_name());
            })
        },
        post_command: |ctx| {
            Box::pin(async move {
                debug!("finished executing command /{}", ctx.invoked_command_name());
            })
        },
        event_handler: |ctx, event, framework, data| {
            Box::pin(events::handler(ctx, event, framework, data))
        },
        commands: tracking::commands()
            .into_iter()
            .chain(trackers::commands())
            .chain(stats::commands())
            .collect(),
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .options(options)
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let data = Arc::new(Data::new(
                    store,
                    scheduler,
                    rate_limiter,
                    tiers,
                    game_bounds,
                ));

                if let Err(err) = catalog::tasks::refresh_catalog(ctx, data.clone()).await {
                    error!("error loading event catalog: {}", err);
                }

                catalog::start_tasks(ctx.to_owned(), data.clone());
                tracking::start_tasks(ctx.to_owned(), data.clone(), poll_seconds);
                trackers::start_tasks(ctx.to_owned(), data.clone(), poll_seconds);
                stats::start_tasks(data.clone());

                Ok(data)
            })
        })
        .build();

    let client = serenity::ClientBuilder::new(config.bot.token, intents)
        .framework(framework)
        .await;

    client.unwrap().start().await.unwrap();
}
