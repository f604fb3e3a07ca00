use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Mutex,
};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::trace;

use super::client::ApiError;
use super::request::{ApiRequest, RankingParams, RankingResponse};

pub(crate) type ApiResult = Result<Value, ApiError>;

pub(crate) struct QueuedRequest {
    pub(crate) request: ApiRequest,
    pub(crate) respond_to: oneshot::Sender<ApiResult>,
}

#[derive(Default)]
struct Queues {
    priority: VecDeque<QueuedRequest>,
    normal: VecDeque<QueuedRequest>,
}

/// Both request queues plus counters, shared between callers and the worker pool.
///
/// Each queue is served newest-first; the priority queue is always drained
/// before the normal one is looked at.
pub(crate) struct SchedulerState {
    queues: Mutex<Queues>,
    poll_interval: Duration,
    workers: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueDepth {
    pub(crate) priority: usize,
    pub(crate) normal: usize,
}

impl SchedulerState {
    pub(crate) fn new(poll_interval: Duration) -> Self {
        Self {
            queues: Mutex::new(Queues::default()),
            poll_interval,
            workers: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn enqueue(&self, priority: bool, queued: QueuedRequest) {
        let mut queues = self.queues.lock().expect("scheduler queue mutex got poisoned");
        trace!(priority, kind = queued.request.kind(), "enqueue");

        if priority {
            queues.priority.push_back(queued);
        } else {
            queues.normal.push_back(queued);
        }
    }

    /// Removes the next request to run, if any. The request leaves the queue
    /// before the lock is released so no two workers can see it.
    pub(crate) fn pop(&self) -> Option<QueuedRequest> {
        let mut queues = self.queues.lock().expect("scheduler queue mutex got poisoned");
        queues
            .priority
            .pop_back()
            .or_else(|| queues.normal.pop_back())
    }

    pub(crate) fn depth(&self) -> QueueDepth {
        let queues = self.queues.lock().expect("scheduler queue mutex got poisoned");
        QueueDepth {
            priority: queues.priority.len(),
            normal: queues.normal.len(),
        }
    }

    /// Queues `request` and waits for whichever worker picks it up.
    pub(crate) async fn request(&self, priority: bool, request: ApiRequest) -> ApiResult {
        let (respond_to, response) = oneshot::channel();
        self.enqueue(
            priority,
            QueuedRequest {
                request,
                respond_to,
            },
        );

        response.await.map_err(|_| ApiError::SchedulerClosed)?
    }

    pub(crate) async fn profile(&self, priority: bool, user_id: &str) -> ApiResult {
        self.request(
            priority,
            ApiRequest::Profile {
                user_id: user_id.to_owned(),
            },
        )
        .await
    }

    pub(crate) async fn ranking(
        &self,
        priority: bool,
        event_id: u32,
        params: RankingParams,
    ) -> Result<RankingResponse, ApiError> {
        let value = self
            .request(priority, ApiRequest::Ranking { event_id, params })
            .await?;
        serde_json::from_value(value).map_err(|err| ApiError::Malformed(err.to_string()))
    }

    pub(crate) async fn master<T: DeserializeOwned>(&self, resource: &str) -> Result<T, ApiError> {
        let value = self
            .request(
                false,
                ApiRequest::Master {
                    resource: resource.to_owned(),
                },
            )
            .await?;
        serde_json::from_value(value).map_err(|err| ApiError::Malformed(err.to_string()))
    }

    pub(crate) fn register_worker(&self) {
        self.workers.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.load(Ordering::SeqCst)
    }

    pub(crate) fn record_outcome(&self, success: bool) {
        if success {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub(crate) fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master(name: &str) -> (QueuedRequest, oneshot::Receiver<ApiResult>) {
        let (respond_to, rx) = oneshot::channel();
        (
            QueuedRequest {
                request: ApiRequest::Master {
                    resource: name.into(),
                },
                respond_to,
            },
            rx,
        )
    }

    fn popped_name(state: &SchedulerState) -> Option<String> {
        state.pop().map(|q| match q.request {
            ApiRequest::Master { resource } => resource,
            other => panic!("unexpected request {:?}", other),
        })
    }

    #[test]
    fn test_single_queue_is_lifo() {
        let state = SchedulerState::new(Duration::from_millis(10));
        let mut receivers = Vec::new();
        for name in ["a", "b", "c"] {
            let (queued, rx) = master(name);
            receivers.push(rx);
            state.enqueue(false, queued);
        }

        assert_eq!(popped_name(&state).as_deref(), Some("c"));
        assert_eq!(popped_name(&state).as_deref(), Some("b"));
        assert_eq!(popped_name(&state).as_deref(), Some("a"));
        assert_eq!(popped_name(&state), None);
    }

    #[test]
    fn test_priority_served_before_normal() {
        let state = SchedulerState::new(Duration::from_millis(10));
        let mut receivers = Vec::new();
        for (priority, name) in [(false, "n1"), (true, "p1"), (false, "n2"), (true, "p2")] {
            let (queued, rx) = master(name);
            receivers.push(rx);
            state.enqueue(priority, queued);
        }

        assert_eq!(
            state.depth(),
            QueueDepth {
                priority: 2,
                normal: 2
            }
        );
        assert_eq!(popped_name(&state).as_deref(), Some("p2"));
        assert_eq!(popped_name(&state).as_deref(), Some("p1"));
        assert_eq!(popped_name(&state).as_deref(), Some("n2"));

        // a late priority request still jumps ahead of the remaining normal one
        let (queued, _rx) = master("p3");
        state.enqueue(true, queued);
        assert_eq!(popped_name(&state).as_deref(), Some("p3"));
        assert_eq!(popped_name(&state).as_deref(), Some("n1"));
    }

    #[tokio::test]
    async fn test_request_fails_when_dropped_unanswered() {
        let state = SchedulerState::new(Duration::from_millis(10));
        let request = state.request(
            false,
            ApiRequest::Master {
                resource: "events".into(),
            },
        );
        let (result, _) = tokio::join!(request, async {
            // give the request a chance to be queued, then drop it without answering
            tokio::task::yield_now().await;
            drop(state.pop());
        });

        assert!(matches!(result, Err(ApiError::SchedulerClosed)));
    }
}
