//! HTTP client for the backtest queue API

use crate::config::ClientConfig;
use crate::jobs::error::{ActionError, ClientError, SubmitError};
use crate::jobs::types::{ActionOutcome, JobHandle, ResetStuckResponse, SubmitRejection, SubmitRequest};
use crate::models::job::{CompletedResult, Job, JobId};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

const CANCEL: &str = "cancel";
const DELETE: &str = "delete";
const FORCE_FAIL: &str = "force-fail";
const RESET_STUCK: &str = "reset-stuck";

/// Operations the job monitor needs from the queue backend
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, SubmitError>;

    /// All non-terminal jobs of the current user in one call
    async fn live_jobs(&self) -> Result<Vec<Job>, ClientError>;

    /// `None` when the user has no finished backtest yet
    async fn latest_result(&self) -> Result<Option<CompletedResult>, ClientError>;

    async fn cancel(&self, id: &JobId) -> Result<ActionOutcome, ActionError>;

    async fn delete(&self, id: &JobId) -> Result<ActionOutcome, ActionError>;

    async fn force_fail(&self, id: &JobId) -> Result<ActionOutcome, ActionError>;

    /// Fail every job stuck in processing; returns how many were reset
    async fn reset_stuck(&self) -> Result<u32, ActionError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JobList {
    Bare(Vec<Job>),
    Wrapped { jobs: Vec<Job> },
}

impl From<JobList> for Vec<Job> {
    fn from(list: JobList) -> Self {
        match list {
            JobList::Bare(jobs) | JobList::Wrapped { jobs } => jobs,
        }
    }
}

pub struct HttpQueueClient {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpQueueClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(ClientError::Build)?;
        let mut queue = Self::with_client(config.base_url.as_str(), client)?;
        queue.api_token = config.api_token.clone();
        Ok(queue)
    }

    /// Use a preconfigured `reqwest::Client`, e.g. one pointed at a mock server
    pub fn with_client(base_url: impl AsRef<str>, client: reqwest::Client) -> Result<Self, ClientError> {
        let raw = base_url.as_ref();
        let base_url = Url::parse(raw)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: raw.to_string(),
                reason: "URL cannot carry a path".to_string(),
            });
        }
        Ok(Self {
            client,
            base_url,
            api_token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, url: &Url) -> Result<Response, ClientError> {
        builder.send().await.map_err(|e| ClientError::Transport {
            endpoint: url.path().to_string(),
            source: e,
        })
    }

    /// Send a bodyless action request and map the status to an outcome
    async fn run_action(
        &self,
        action: &'static str,
        target: String,
        method: Method,
        url: Url,
        already_settled: Option<StatusCode>,
    ) -> Result<(ActionOutcome, Response), ActionError> {
        let response = self.send(self.request(method, url.clone()), &url).await?;
        let status = response.status();

        if status.is_success() {
            info!(action, target = %target, "QueueClient: {} applied to {}", action, target);
            return Ok((ActionOutcome::Applied, response));
        }
        if Some(status) == already_settled {
            info!(
                action,
                target = %target,
                status = status.as_u16(),
                "QueueClient: {} on {} already settled",
                action,
                target
            );
            return Ok((ActionOutcome::AlreadySettled, response));
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            action,
            target = %target,
            status = status.as_u16(),
            "QueueClient: {} on {} failed with {}",
            action,
            target,
            status
        );
        if status.is_client_error() {
            return Err(ActionError::Rejected {
                target,
                action,
                message: error_message(&body, status),
            });
        }
        Err(ClientError::Status {
            endpoint: url.path().to_string(),
            status: status.as_u16(),
            body,
        }
        .into())
    }
}

async fn read_json<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, ClientError> {
    let endpoint = url.path().to_string();
    let status = response.status();
    let body = response.text().await.map_err(|e| ClientError::Transport {
        endpoint: endpoint.clone(),
        source: e,
    })?;

    if !status.is_success() {
        return Err(ClientError::Status {
            endpoint,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| ClientError::Decode {
        endpoint,
        message: e.to_string(),
    })
}

/// `error` field of a JSON error body, or the raw body, or the status reason
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(rejection) = serde_json::from_str::<SubmitRejection>(body) {
        if !rejection.error.trim().is_empty() {
            return rejection.error;
        }
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[async_trait]
impl QueueClient for HttpQueueClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, SubmitError> {
        let url = self.endpoint(&["api", "backtests"]);
        let response = self
            .send(self.request(Method::POST, url.clone()).json(request), &url)
            .await?;
        let status = response.status();

        if status.is_success() {
            let handle: JobHandle = read_json(&url, response).await?;
            info!(
                job_id = %handle.id,
                strategy = %request.strategy_name(),
                queue_position = ?handle.queue_position,
                eta_minutes = ?handle.estimated_wait_minutes,
                "QueueClient: submitted {} as job {}",
                request.strategy_name(),
                handle.id
            );
            return Ok(handle);
        }

        let body = response.text().await.unwrap_or_default();
        let rejection = serde_json::from_str::<SubmitRejection>(&body).unwrap_or_default();

        if rejection.limit_reached || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                strategy = %request.strategy_name(),
                status = status.as_u16(),
                "QueueClient: submission limit reached"
            );
            return Err(SubmitError::LimitReached {
                message: error_message(&body, status),
                upgrade: rejection.upgrade,
            });
        }

        if status.is_client_error() {
            let message = error_message(&body, status);
            warn!(
                strategy = %request.strategy_name(),
                status = status.as_u16(),
                error = %message,
                "QueueClient: submission rejected"
            );
            return Err(SubmitError::Rejected(message));
        }

        Err(ClientError::Status {
            endpoint: url.path().to_string(),
            status: status.as_u16(),
            body,
        }
        .into())
    }

    async fn live_jobs(&self) -> Result<Vec<Job>, ClientError> {
        let url = self.endpoint(&["api", "backtests", "queue"]);
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
        let list: JobList = read_json(&url, response).await?;
        let jobs: Vec<Job> = Vec::from(list).into_iter().map(Job::normalized).collect();
        debug!(count = jobs.len(), "QueueClient: fetched {} live jobs", jobs.len());
        Ok(jobs)
    }

    async fn latest_result(&self) -> Result<Option<CompletedResult>, ClientError> {
        let url = self.endpoint(&["api", "backtests", "results", "latest"]);
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;

        if matches!(response.status(), StatusCode::NO_CONTENT | StatusCode::NOT_FOUND) {
            debug!("QueueClient: no completed result yet");
            return Ok(None);
        }

        let result: Option<CompletedResult> = read_json(&url, response).await?;
        Ok(result)
    }

    async fn cancel(&self, id: &JobId) -> Result<ActionOutcome, ActionError> {
        let url = self.endpoint(&["api", "backtests", "queue", id.as_str(), "cancel"]);
        let (outcome, _) = self
            .run_action(CANCEL, id.to_string(), Method::POST, url, Some(StatusCode::CONFLICT))
            .await?;
        Ok(outcome)
    }

    async fn delete(&self, id: &JobId) -> Result<ActionOutcome, ActionError> {
        let url = self.endpoint(&["api", "backtests", "queue", id.as_str()]);
        let (outcome, _) = self
            .run_action(DELETE, id.to_string(), Method::DELETE, url, Some(StatusCode::NOT_FOUND))
            .await?;
        Ok(outcome)
    }

    async fn force_fail(&self, id: &JobId) -> Result<ActionOutcome, ActionError> {
        let url = self.endpoint(&["api", "admin", "queue", id.as_str(), "fail"]);
        let (outcome, _) = self
            .run_action(FORCE_FAIL, id.to_string(), Method::POST, url, None)
            .await?;
        Ok(outcome)
    }

    async fn reset_stuck(&self) -> Result<u32, ActionError> {
        let url = self.endpoint(&["api", "admin", "queue", "reset-stuck"]);
        let (_, response) = self
            .run_action(RESET_STUCK, "stuck jobs".to_string(), Method::POST, url.clone(), None)
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(0);
        }
        let reset: ResetStuckResponse = read_json(&url, response).await?;
        info!(reset = reset.reset, "QueueClient: reset {} stuck jobs", reset.reset);
        Ok(reset.reset)
    }
}
