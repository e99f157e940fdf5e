//! HTTP client for the remote job controller.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::{config::ServerCfg, jobs::JobState};

/// Failure of a single job-controller request.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RequestError {
    /// Transport failure, timeout, or connection refused.
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx status, or a 2xx body that carried an `error` field.
    #[error("{message}")]
    Server { status: u16, message: String },
    /// A 2xx response whose body was not a job state.
    #[error("invalid response body: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RequestError {
    fn from(e: reqwest::Error) -> Self {
        RequestError::Network(e.to_string())
    }
}

/// Body of the start request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub start_id: u64,
    pub batch_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_sec: Option<u64>,
}

/// Operations exposed by the job controller.
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn start(&self, req: &StartRequest) -> Result<JobState, RequestError>;
    async fn pause(&self) -> Result<JobState, RequestError>;
    async fn resume(&self) -> Result<JobState, RequestError>;
    async fn stop(&self) -> Result<JobState, RequestError>;
    async fn status(&self) -> Result<JobState, RequestError>;
}

/// `JobApi` over reqwest. Holds no job state.
#[derive(Clone, Debug)]
pub struct HttpJobApi {
    http: Client,
    /// e.g. `http://127.0.0.1:5000/api/admin/job`
    endpoint: String,
}

impl HttpJobApi {
    /// Build a client for the configured server and job kind.
    pub fn new(cfg: &ServerCfg) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs.max(1)))
            .build()?;
        let endpoint = format!(
            "{}/api/admin/{}",
            cfg.base_url.trim_end_matches('/'),
            cfg.job_kind.path_segment()
        );
        Ok(Self { http, endpoint })
    }

    fn url(&self, op: &str) -> String {
        format!("{}/{}", self.endpoint, op)
    }

    async fn post(&self, op: &str) -> Result<JobState, RequestError> {
        let resp = self.http.post(self.url(op)).send().await?;
        decode_state(resp).await
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn start(&self, req: &StartRequest) -> Result<JobState, RequestError> {
        let resp = self.http.post(self.url("start")).json(req).send().await?;
        decode_state(resp).await
    }

    async fn pause(&self) -> Result<JobState, RequestError> {
        self.post("pause").await
    }

    async fn resume(&self) -> Result<JobState, RequestError> {
        self.post("resume").await
    }

    async fn stop(&self) -> Result<JobState, RequestError> {
        self.post("stop").await
    }

    async fn status(&self) -> Result<JobState, RequestError> {
        let resp = self.http.get(self.url("status")).send().await?;
        decode_state(resp).await
    }
}

/// Turn a response into a job state, normalizing every failure shape.
async fn decode_state(resp: Response) -> Result<JobState, RequestError> {
    let status = resp.status();
    let body = resp.bytes().await?;

    if !status.is_success() {
        // Unparseable error bodies count as `{}`.
        let value = serde_json::from_slice::<serde_json::Value>(&body).unwrap_or_default();
        return Err(server_error(status, error_field(&value)));
    }

    let state = serde_json::from_slice::<JobState>(&body)
        .map_err(|e| RequestError::Parse(e.to_string()))?;
    match state.error.as_deref().map(str::trim) {
        Some(msg) if !msg.is_empty() => Err(server_error(status, Some(msg))),
        _ => Ok(state),
    }
}

fn error_field(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn server_error(status: StatusCode, message: Option<&str>) -> RequestError {
    RequestError::Server {
        status: status.as_u16(),
        message: message
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobKind;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer, kind: JobKind) -> HttpJobApi {
        let cfg = ServerCfg {
            base_url: format!("{}/", server.uri()),
            job_kind: kind,
            request_timeout_secs: 5,
        };
        HttpJobApi::new(&cfg).unwrap()
    }

    #[tokio::test]
    async fn start_posts_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/job/start"))
            .and(body_json(serde_json::json!({"startId": 5, "batchSize": 100})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "running": true, "paused": false, "percent": 0, "state": "running"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, JobKind::Single);
        let req = StartRequest {
            start_id: 5,
            batch_size: 100,
            interval_sec: None,
        };
        let state = api.start(&req).await.unwrap();
        assert!(state.running);
        assert_eq!(state.percent, Some(0.0));
    }

    #[tokio::test]
    async fn dual_job_uses_its_own_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/dualjob/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "running": true, "paused": true, "alternating": true, "nextClientId": 2
            })))
            .mount(&server)
            .await;

        let state = api_for(&server, JobKind::Dual).status().await.unwrap();
        assert!(state.paused);
        assert_eq!(state.next_client_id, Some(2));
    }

    #[tokio::test]
    async fn server_error_uses_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/job/pause"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(serde_json::json!({"error": "job not running"})),
            )
            .mount(&server)
            .await;

        let err = api_for(&server, JobKind::Single).pause().await.unwrap_err();
        assert_eq!(
            err,
            RequestError::Server {
                status: 409,
                message: "job not running".into()
            }
        );
    }

    #[tokio::test]
    async fn server_error_without_json_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/job/stop"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = api_for(&server, JobKind::Single).stop().await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn success_with_garbage_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/job/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = api_for(&server, JobKind::Single).status().await.unwrap_err();
        assert!(matches!(err, RequestError::Parse(_)));
    }

    #[tokio::test]
    async fn rejection_inside_success_body_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/dualjob/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "running": false, "paused": false, "error": "second API key is not configured"
            })))
            .mount(&server)
            .await;

        let req = StartRequest {
            start_id: 1,
            batch_size: 50,
            interval_sec: Some(30),
        };
        let err = api_for(&server, JobKind::Dual).start(&req).await.unwrap_err();
        assert_eq!(
            err,
            RequestError::Server {
                status: 200,
                message: "second API key is not configured".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let cfg = ServerCfg {
            // Port 9 (discard) on localhost is expected to refuse connections.
            base_url: "http://127.0.0.1:9".into(),
            job_kind: JobKind::Single,
            request_timeout_secs: 2,
        };
        let err = HttpJobApi::new(&cfg).unwrap().status().await.unwrap_err();
        assert!(matches!(err, RequestError::Network(_)));
    }
}
