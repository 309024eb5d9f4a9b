use lander_domain::repositories::training_api::{ApiError, TrainingApi};
use lander_domain::value_objects::command::{EvaluationReport, RecordingReport};
use lander_domain::value_objects::snapshot::Snapshot;
use lander_domain::value_objects::video::{VideoDescriptor, VideoListing};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::Instrument;
use url::Url;

#[derive(Debug, Serialize)]
struct WeightsBody<'a> {
    weights_file: Option<&'a str>,
}

/// HTTP client for the training service's `/health` and `/train/*` routes.
pub struct HttpTrainingClient {
    base_url: String,
    origin: String,
    pub timeout_ms: u64,
    client: Client,
}

impl HttpTrainingClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, String> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|err| format!("invalid api base url {base_url}: {err}"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(format!(
                "invalid api base url {base_url}: scheme must be http or https"
            ));
        }
        let origin = parsed.origin().ascii_serialization();

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            origin,
            timeout_ms,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Scheme, host and port of the base URL. Media is served from here.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn fetch_health(&self) -> Result<serde_json::Value, ApiError> {
        let builder = self.client.get(self.endpoint("/health"));
        self.call("health", builder).await
    }

    pub async fn fetch_status(&self) -> Result<Snapshot, ApiError> {
        let builder = self.client.get(self.endpoint("/train/status"));
        let snapshot: Snapshot = self.call("status", builder).await?;
        snapshot.validate().map_err(ApiError::Protocol)?;
        Ok(snapshot)
    }

    pub async fn post_start(&self) -> Result<serde_json::Value, ApiError> {
        let builder = self.client.post(self.endpoint("/train/start"));
        self.call("start", builder).await
    }

    pub async fn post_stop(&self) -> Result<serde_json::Value, ApiError> {
        let builder = self.client.post(self.endpoint("/train/stop"));
        self.call("stop", builder).await
    }

    pub async fn post_evaluate(
        &self,
        weights_file: Option<&str>,
    ) -> Result<EvaluationReport, ApiError> {
        let builder = self
            .client
            .post(self.endpoint("/train/evaluate"))
            .json(&WeightsBody { weights_file });
        let report: EvaluationReport = self.call("evaluate", builder).await?;
        if report.ok && report.mean.is_none() {
            return Err(ApiError::Protocol(
                "evaluate response has ok=true but no mean".to_string(),
            ));
        }
        Ok(report)
    }

    pub async fn post_record_video(
        &self,
        weights_file: Option<&str>,
    ) -> Result<RecordingReport, ApiError> {
        let builder = self
            .client
            .post(self.endpoint("/train/video"))
            .json(&WeightsBody { weights_file });
        self.call("video", builder).await
    }

    pub async fn list_weights(&self) -> Result<Vec<String>, ApiError> {
        let builder = self.client.get(self.endpoint("/train/weights"));
        self.call("weights", builder).await
    }

    pub async fn list_videos(&self) -> Result<Vec<VideoDescriptor>, ApiError> {
        let builder = self.client.get(self.endpoint("/train/videos"));
        let listing: VideoListing = self.call("videos", builder).await?;
        Ok(listing.videos)
    }

    pub fn resolve_media_url(&self, path: &str) -> String {
        resolve_media_url(&self.origin, path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let span = tracing::info_span!(
            "infra.api.call",
            endpoint,
            base_url = %self.base_url,
            timeout_ms = self.timeout_ms
        );
        async move {
            metrics::counter!("lander.infra.api.requests_total", "endpoint" => endpoint)
                .increment(1);
            let start = Instant::now();
            let (status, result) = send_and_decode::<T>(builder).await;
            let duration_ms = start.elapsed().as_millis() as f64;
            let status_label = status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string());

            match &result {
                Ok(_) => {
                    metrics::histogram!(
                        "lander.infra.api.call_ms",
                        "endpoint" => endpoint,
                        "result" => "ok"
                    )
                    .record(duration_ms);
                }
                Err(err) => {
                    metrics::counter!(
                        "lander.infra.api.errors_total",
                        "endpoint" => endpoint,
                        "kind" => err.kind(),
                        "status" => status_label.clone()
                    )
                    .increment(1);
                    metrics::histogram!(
                        "lander.infra.api.call_ms",
                        "endpoint" => endpoint,
                        "result" => "err"
                    )
                    .record(duration_ms);
                    tracing::debug!(status = %status_label, error = %err, "api call failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}

async fn send_and_decode<T: DeserializeOwned>(
    builder: RequestBuilder,
) -> (Option<u16>, Result<T, ApiError>) {
    let resp = match builder.send().await {
        Ok(resp) => resp,
        Err(err) => return (None, Err(transport_error(err))),
    };
    let status = resp.status();
    if !status.is_success() {
        return (
            Some(status.as_u16()),
            Err(ApiError::Protocol(format!(
                "http error: status {}",
                status.as_u16()
            ))),
        );
    }
    let body = match resp.bytes().await {
        Ok(body) => body,
        Err(err) => return (Some(status.as_u16()), Err(transport_error(err))),
    };
    let parsed = serde_json::from_slice::<T>(&body)
        .map_err(|err| ApiError::Protocol(format!("failed to parse response: {err}")));
    (Some(status.as_u16()), parsed)
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Transport(format!("request timed out: {err}"))
    } else {
        ApiError::Transport(format!("request failed: {err}"))
    }
}

/// Joins a server-relative path to `origin`. Absolute URLs pass through.
pub fn resolve_media_url(origin: &str, path: &str) -> String {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let origin = origin.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{origin}{path}")
    } else {
        format!("{origin}/{path}")
    }
}

impl TrainingApi for HttpTrainingClient {
    fn fetch_health(&self) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send {
        HttpTrainingClient::fetch_health(self)
    }

    fn fetch_status(&self) -> impl Future<Output = Result<Snapshot, ApiError>> + Send {
        HttpTrainingClient::fetch_status(self)
    }

    fn post_start(&self) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send {
        HttpTrainingClient::post_start(self)
    }

    fn post_stop(&self) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send {
        HttpTrainingClient::post_stop(self)
    }

    fn post_evaluate(
        &self,
        weights_file: Option<&str>,
    ) -> impl Future<Output = Result<EvaluationReport, ApiError>> + Send {
        HttpTrainingClient::post_evaluate(self, weights_file)
    }

    fn post_record_video(
        &self,
        weights_file: Option<&str>,
    ) -> impl Future<Output = Result<RecordingReport, ApiError>> + Send {
        HttpTrainingClient::post_record_video(self, weights_file)
    }

    fn list_weights(&self) -> impl Future<Output = Result<Vec<String>, ApiError>> + Send {
        HttpTrainingClient::list_weights(self)
    }

    fn list_videos(&self) -> impl Future<Output = Result<Vec<VideoDescriptor>, ApiError>> + Send {
        HttpTrainingClient::list_videos(self)
    }

    fn resolve_media_url(&self, path: &str) -> String {
        HttpTrainingClient::resolve_media_url(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_media_url, HttpTrainingClient};
    use lander_domain::repositories::training_api::ApiError;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn http_response(status: u16, reason: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn json_ok(body: &str) -> String {
        http_response(200, "OK", "application/json", body)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.trim()
                            .eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&raw).to_string()
    }

    /// Serves `responses` in order and reports every request it saw.
    fn try_spawn_server(responses: Vec<String>) -> Option<(String, mpsc::Receiver<String>)> {
        let listener = TcpListener::bind("127.0.0.1:0").ok()?;
        let addr = listener.local_addr().ok()?;
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().expect("accept");
                let request = read_request(&mut stream);
                let _ = tx.send(request);
                stream
                    .write_all(response.as_bytes())
                    .expect("write response");
            }
        });

        Some((format!("http://{}/api/v1", addr), rx))
    }

    #[test]
    fn new_rejects_non_http_scheme() {
        let err = HttpTrainingClient::new("ftp://host/api", 1000).err().expect("error");
        assert!(err.contains("scheme"));
        assert!(HttpTrainingClient::new("not a url", 1000).is_err());
    }

    #[test]
    fn origin_drops_base_path() {
        let client =
            HttpTrainingClient::new("http://host:8000/api/v1/", 1000).expect("client");
        assert_eq!(client.origin(), "http://host:8000");
        assert_eq!(client.base_url(), "http://host:8000/api/v1");
    }

    #[test]
    fn media_url_resolves_against_origin() {
        assert_eq!(
            resolve_media_url("http://host:8000", "/videos/ep12.mp4"),
            "http://host:8000/videos/ep12.mp4"
        );
        assert_eq!(
            resolve_media_url("http://host:8000", "videos/ep12.mp4"),
            "http://host:8000/videos/ep12.mp4"
        );
        assert_eq!(
            resolve_media_url("http://host:8000", "https://cdn.example/v.mp4"),
            "https://cdn.example/v.mp4"
        );
    }

    #[tokio::test]
    async fn fetch_status_parses_snapshot() {
        let body = r#"{"running":false,"hasAgent":true,"episodes":12,"lastReward":210.5,"epsilon":0.05,"memorySize":500,"historyTail":[[10,190.0],[11,205.0],[12,210.5]]}"#;
        let Some((base_url, requests)) = try_spawn_server(vec![json_ok(body)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let client = HttpTrainingClient::new(&base_url, 2000).expect("client");

        let snapshot = client.fetch_status().await.expect("status");
        assert_eq!(snapshot.episode_count, 12);
        assert_eq!(snapshot.history_tail.len(), 3);

        let request = requests.recv_timeout(Duration::from_secs(1)).expect("request");
        assert!(request.starts_with("GET /api/v1/train/status "));
    }

    #[tokio::test]
    async fn fetch_status_rejects_malformed_body() {
        let Some((base_url, _requests)) =
            try_spawn_server(vec![json_ok(r#"{"running":"yes"}"#)])
        else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let client = HttpTrainingClient::new(&base_url, 2000).expect("client");

        let err = client.fetch_status().await.expect_err("malformed");
        assert!(matches!(err, ApiError::Protocol(_)));
    }

    #[tokio::test]
    async fn fetch_status_rejects_unordered_history() {
        let body = r#"{"running":true,"hasAgent":true,"episodes":2,"lastReward":1.0,"epsilon":0.5,"memorySize":1,"historyTail":[[2,1.0],[1,1.0]]}"#;
        let Some((base_url, _requests)) = try_spawn_server(vec![json_ok(body)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let client = HttpTrainingClient::new(&base_url, 2000).expect("client");

        let err = client.fetch_status().await.expect_err("unordered");
        assert!(err.to_string().contains("out of order"));
    }

    #[tokio::test]
    async fn server_error_is_protocol_error_without_retry() {
        let Some((base_url, requests)) = try_spawn_server(vec![http_response(
            500,
            "Internal Server Error",
            "text/plain",
            "oops",
        )]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let client = HttpTrainingClient::new(&base_url, 2000).expect("client");

        let err = client.post_start().await.expect_err("500");
        assert_eq!(err, ApiError::Protocol("http error: status 500".to_string()));
        assert!(requests.recv_timeout(Duration::from_secs(1)).is_ok());
        assert!(requests.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0") else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client =
            HttpTrainingClient::new(&format!("http://{addr}/api/v1"), 500).expect("client");
        let err = client.fetch_health().await.expect_err("refused");
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn slow_server_times_out_as_transport_error() {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0") else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let addr = listener.local_addr().expect("addr");
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                thread::sleep(Duration::from_millis(600));
                drop(stream);
            }
        });

        let client =
            HttpTrainingClient::new(&format!("http://{addr}/api/v1"), 100).expect("client");
        let err = client.fetch_status().await.expect_err("timeout");
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn evaluate_sends_selected_weights() {
        let Some((base_url, requests)) = try_spawn_server(vec![json_ok(
            r#"{"ok":true,"mean":201.25,"scores":[200.0,202.5]}"#,
        )]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let client = HttpTrainingClient::new(&base_url, 2000).expect("client");

        let report = client
            .post_evaluate(Some("dqn_ep500.pth"))
            .await
            .expect("evaluate");
        assert!(report.ok);
        assert_eq!(report.scores, vec![200.0, 202.5]);

        let request = requests.recv_timeout(Duration::from_secs(1)).expect("request");
        assert!(request.starts_with("POST /api/v1/train/evaluate "));
        assert!(request.contains(r#"{"weights_file":"dqn_ep500.pth"}"#));
    }

    #[tokio::test]
    async fn evaluate_ok_without_mean_is_protocol_error() {
        let Some((base_url, _requests)) =
            try_spawn_server(vec![json_ok(r#"{"ok":true,"scores":[]}"#)])
        else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let client = HttpTrainingClient::new(&base_url, 2000).expect("client");

        let err = client.post_evaluate(None).await.expect_err("no mean");
        assert!(matches!(err, ApiError::Protocol(_)));
    }

    #[tokio::test]
    async fn record_video_sends_null_weights() {
        let Some((base_url, requests)) =
            try_spawn_server(vec![json_ok(r#"{"ok":false,"path":null}"#)])
        else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let client = HttpTrainingClient::new(&base_url, 2000).expect("client");

        let report = client.post_record_video(None).await.expect("video");
        assert!(!report.ok);
        assert!(report.path.is_none());

        let request = requests.recv_timeout(Duration::from_secs(1)).expect("request");
        assert!(request.starts_with("POST /api/v1/train/video "));
        assert!(request.contains(r#"{"weights_file":null}"#));
    }

    #[tokio::test]
    async fn listings_parse() {
        let Some((base_url, _requests)) = try_spawn_server(vec![
            json_ok(r#"["dqn_final.pth","dqn_ep100.pth"]"#),
            json_ok(
                r#"{"videos":[{"name":"ep12.mp4","url":"/videos/ep12.mp4","sizeBytes":4096,"modified":1700000000.25}]}"#,
            ),
        ]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let client = HttpTrainingClient::new(&base_url, 2000).expect("client");

        let weights = client.list_weights().await.expect("weights");
        assert_eq!(weights, vec!["dqn_final.pth", "dqn_ep100.pth"]);

        let videos = client.list_videos().await.expect("videos");
        assert_eq!(videos.len(), 1);
        assert_eq!(
            client.resolve_media_url(&videos[0].url),
            format!("{}/videos/ep12.mp4", client.origin())
        );
    }
}
