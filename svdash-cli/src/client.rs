//! HTTP binding of the supervisor API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use svdash_core::api::{ApiError, SupervisorApi};
use svdash_core::manage::{ManageRequest, ManageResult};
use svdash_core::model::Supervisor;

const SUPERVISORS_PATH: &str = "supervisors/";
const MANAGE_PATH: &str = "supervisors/manage/";

pub struct HttpSupervisorApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSupervisorApi {
    pub fn new(base_url: &str, timeout: Duration, token: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("svdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: parse_detail(&body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Transport("request timed out".into())
    } else {
        ApiError::Transport(e.to_string())
    }
}

/// Pull the `detail` field out of an error body. Non-string details (such
/// as validation error lists) are returned as compact JSON.
fn parse_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl SupervisorApi for HttpSupervisorApi {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_supervisors(&self) -> Result<Vec<Supervisor>, ApiError> {
        let url = self.endpoint(SUPERVISORS_PATH);
        tracing::debug!(event = "client.fetch.started", url = %url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(transport_error)?;
        Self::decode(response).await
    }

    async fn manage(&self, request: ManageRequest) -> Result<ManageResult, ApiError> {
        let url = self.endpoint(MANAGE_PATH);
        tracing::debug!(
            event = "client.manage.started",
            url = %url,
            action = %request.action,
        );

        let response = self
            .authorize(self.client.post(&url).json(&request))
            .send()
            .await
            .map_err(transport_error)?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svdash_core::manage::ManageAction;
    use svdash_core::model::{Process, ProcessState, SupervisorServer};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Answer one request with a canned response. The handle yields the raw
    /// request as received.
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api/v1", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (base_url, handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + body_len {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn api(base_url: &str, token: Option<&str>) -> HttpSupervisorApi {
        HttpSupervisorApi::new(base_url, Duration::from_secs(5), token.map(String::from)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_token_and_decodes() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"[{"server":{"name":"web-1"},"processes":[{"name":"api","group":"web","state":"RUNNING"}]}]"#,
        )
        .await;

        let supervisors = api(&base_url, Some("tok-123"))
            .fetch_supervisors()
            .await
            .unwrap();
        assert_eq!(supervisors.len(), 1);
        assert_eq!(supervisors[0].processes[0].state, ProcessState::Running);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/v1/supervisors/ HTTP/1.1"));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("authorization: bearer tok-123")
        );
    }

    #[tokio::test]
    async fn test_no_token_means_no_authorization_header() {
        let (base_url, server) = serve_once("200 OK", "[]").await;

        let supervisors = api(&base_url, None).fetch_supervisors().await.unwrap();
        assert!(supervisors.is_empty());

        let request = server.await.unwrap();
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_error_status_carries_detail() {
        let (base_url, server) =
            serve_once("403 Forbidden", r#"{"detail": "Not authenticated"}"#).await;

        let err = api(&base_url, None).fetch_supervisors().await.unwrap_err();
        server.await.unwrap();

        assert_eq!(
            err,
            ApiError::Status {
                status: 403,
                detail: Some("Not authenticated".into()),
            }
        );
        assert_eq!(
            err.notification_text(),
            "Something went wrong: \n\nNot authenticated"
        );
    }

    #[tokio::test]
    async fn test_undecodable_body_is_a_decode_error() {
        let (base_url, server) = serve_once("200 OK", r#"{"not": "a list"}"#).await;

        let err = api(&base_url, None).fetch_supervisors().await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, ApiError::Decode(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_manage_posts_request_body() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"operationResult": {"ok": true, "isFault": false}}"#,
        )
        .await;

        let request = ManageRequest::new(
            ManageAction::CloneProcess,
            &SupervisorServer {
                name: "web-1".into(),
                url: None,
                version: None,
                error: None,
            },
            &Process {
                name: "api".into(),
                group: "web".into(),
                state: ProcessState::Running,
                pid: None,
                description: None,
            },
        );
        let result = api(&base_url, Some("tok-123"))
            .manage(request)
            .await
            .unwrap();
        assert!(result.verdict().success);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/v1/supervisors/manage/ HTTP/1.1"));
        assert!(raw.contains(r#""type":"clone_process""#));
        assert!(raw.contains(r#""process":"api""#));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api/v1", listener.local_addr().unwrap());
        drop(listener);

        let err = api(&base_url, None).fetch_supervisors().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "got {:?}", err);
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let api =
            HttpSupervisorApi::new("http://localhost:8000/api/v1/", Duration::from_secs(1), None)
                .unwrap();
        assert_eq!(
            api.endpoint(SUPERVISORS_PATH),
            "http://localhost:8000/api/v1/supervisors/"
        );
        assert_eq!(
            api.endpoint(MANAGE_PATH),
            "http://localhost:8000/api/v1/supervisors/manage/"
        );
    }

    #[test]
    fn test_parse_detail() {
        assert_eq!(
            parse_detail(r#"{"detail": "Not authenticated"}"#),
            Some("Not authenticated".to_string())
        );
        assert_eq!(
            parse_detail(r#"{"detail": [{"loc": ["body", "type"]}]}"#),
            Some(r#"[{"loc":["body","type"]}]"#.to_string())
        );
        assert_eq!(parse_detail(r#"{"detail": null}"#), None);
        assert_eq!(parse_detail(r#"{"message": "nope"}"#), None);
        assert_eq!(parse_detail("<html>502 Bad Gateway</html>"), None);
        assert_eq!(parse_detail(""), None);
    }
}
