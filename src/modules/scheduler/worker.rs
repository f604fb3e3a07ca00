use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::ApiClient;
use super::queue::{ApiResult, SchedulerState};
use super::request::ApiRequest;

/// Starts one polling worker per client. Each worker has at most one request
/// in flight, so the pool size bounds concurrency against the game API.
pub(crate) fn spawn_workers(
    state: Arc<SchedulerState>,
    clients: Vec<Arc<dyn ApiClient>>,
) -> Vec<JoinHandle<()>> {
    clients
        .into_iter()
        .enumerate()
        .map(|(id, client)| {
            state.register_worker();
            info!(worker = id, account = client.name(), "starting api worker");
            tokio::spawn(run_worker(id, state.clone(), client))
        })
        .collect()
}

async fn run_worker(id: usize, state: Arc<SchedulerState>, client: Arc<dyn ApiClient>) {
    loop {
        match state.pop() {
            Some(queued) => {
                let kind = queued.request.kind();
                let result = execute(client.as_ref(), &queued.request).await;

                state.record_outcome(result.is_ok());
                if let Err(err) = &result {
                    warn!(worker = id, kind, "api request failed: {}", err);
                }

                if queued.respond_to.send(result).is_err() {
                    debug!(worker = id, kind, "requester went away before the response");
                }
            }
            None => tokio::time::sleep(state.poll_interval()).await,
        }

        tokio::task::yield_now().await;
    }
}

async fn execute(client: &dyn ApiClient, request: &ApiRequest) -> ApiResult {
    match request {
        ApiRequest::Profile { user_id } => client.profile(user_id).await,
        ApiRequest::Ranking { event_id, params } => client.ranking(*event_id, params).await,
        ApiRequest::Master { resource } => client.master(resource).await,
    }
}
