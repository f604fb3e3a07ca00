use poise::serenity_prelude::{self as serenity};
use serde_json::Value;

use super::request::RankingParams;

/// Game API access through a single account.
#[serenity::async_trait]
pub(crate) trait ApiClient: Send + Sync {
    fn name(&self) -> &str;
    async fn profile(&self, user_id: &str) -> Result<Value, ApiError>;
    async fn ranking(&self, event_id: u32, params: &RankingParams) -> Result<Value, ApiError>;
    async fn master(&self, resource: &str) -> Result<Value, ApiError>;
}

pub(crate) struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    name: String,
}

impl HttpApiClient {
    pub(crate) fn new(base_url: &str, token: String, index: usize) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tierwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
            name: format!("account-{}", index),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| ApiError::Malformed(err.to_string()))
    }
}

#[serenity::async_trait]
impl ApiClient for HttpApiClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn profile(&self, user_id: &str) -> Result<Value, ApiError> {
        self.get(&format!("user/{}/profile", user_id), &[]).await
    }

    async fn ranking(&self, event_id: u32, params: &RankingParams) -> Result<Value, ApiError> {
        self.get(&format!("event/{}/ranking", event_id), &params.to_query())
            .await
    }

    async fn master(&self, resource: &str) -> Result<Value, ApiError> {
        self.get(&format!("master/{}", resource), &[]).await
    }
}

pub(crate) enum ApiError {
    Http(reqwest::Error),
    Status { status: u16, body: String },
    Malformed(String),
    SchedulerClosed,
}

impl ApiError {
    pub(crate) fn as_str(&self) -> String {
        match self {
            Self::Http(err) => format!("error calling game api: {}", err),
            Self::Status { status, body } => {
                format!("game api responded with {}: {}", status, body)
            }
            Self::Malformed(err) => format!("malformed game api response: {}", err),
            Self::SchedulerClosed => "request dropped before a worker answered it".into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.write_str(&self.as_str())
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, fmt)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}
