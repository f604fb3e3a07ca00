use std::sync::Arc;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::types::Error;

pub(crate) mod client;
pub(crate) mod queue;
pub(crate) mod request;
pub(crate) mod worker;

pub(crate) use queue::SchedulerState;

/// Builds the shared queues and starts one worker per configured account.
pub(crate) fn start(config: &ApiConfig) -> Result<Arc<SchedulerState>, Error> {
    let state = Arc::new(SchedulerState::new(Duration::from_millis(
        config.poll_interval_ms,
    )));

    let clients = config
        .account_tokens()
        .into_iter()
        .enumerate()
        .map(|(idx, token)| {
            client::HttpApiClient::new(&config.base_url, token, idx)
                .map(|c| Arc::new(c) as Arc<dyn client::ApiClient>)
        })
        .collect::<Result<Vec<_>, _>>()?;

    // workers run for the lifetime of the process
    drop(worker::spawn_workers(state.clone(), clients));

    Ok(state)
}
