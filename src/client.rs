use std::path::Path;

use log::info;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::HistoryError;
use crate::models::HistoryRecord;
use crate::normalize::normalize_history;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// The history endpoint wraps sessions as `{ user, speeches }`; saved exports
/// may be a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryPayload {
    Wrapped {
        #[serde(default)]
        user: Option<String>,
        speeches: Vec<Value>,
    },
    Bare(Vec<Value>),
}

#[derive(Clone)]
pub struct HistoryClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HistoryClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Fetch and normalize the signed-in user's sessions. One attempt, no retry.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Unauthenticated` when the API rejects the token,
    /// and other variants for transport, status, or payload failures.
    pub async fn fetch_history(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let url = format!("{}/history", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(HistoryError::Unauthenticated)
            }
            status if !status.is_success() => return Err(HistoryError::Status(status)),
            _ => {}
        }

        let body = response.text().await?;
        parse_history_payload(&body)
    }
}

pub fn load_history_file(path: &Path) -> Result<Vec<HistoryRecord>, HistoryError> {
    let body = std::fs::read_to_string(path)?;
    parse_history_payload(&body)
}

pub fn parse_history_payload(body: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
    let entries = match serde_json::from_str::<HistoryPayload>(body)? {
        HistoryPayload::Wrapped { user, speeches } => {
            if let Some(user) = user {
                info!("loaded history for {user}");
            }
            speeches
        }
        HistoryPayload::Bare(entries) => entries,
    };

    let total = entries.len();
    let records = normalize_history(entries);
    info!("normalized {} of {total} sessions", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers a single request with a canned response and hands back the
    /// raw request head.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn rejected_token_is_unauthenticated() {
        let (base_url, server) = serve_once("401 Unauthorized", r#"{"detail":"expired"}"#).await;
        let client = HistoryClient::new(base_url, "stale-token");

        let err = client.fetch_history().await.unwrap_err();
        assert!(err.is_unauthenticated());

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /history "), "{request}");
        assert!(request.contains("authorization: bearer stale-token"), "{request}");
    }

    #[tokio::test]
    async fn server_error_is_reported_once() {
        let (base_url, server) = serve_once("500 Internal Server Error", "{}").await;
        let client = HistoryClient::new(format!("{base_url}/"), "token");

        let err = client.fetch_history().await.unwrap_err();
        assert!(!err.is_unauthenticated());
        assert!(
            matches!(err, HistoryError::Status(status) if status == StatusCode::INTERNAL_SERVER_ERROR),
            "{err:?}"
        );
        // The listener only ever accepts one connection.
        server.await.unwrap();
    }

    #[tokio::test]
    async fn successful_fetch_is_normalized() {
        let body = r#"{"user":"sam","speeches":[{"id":2,"created_at":"2025-01-03T10:00:00Z"},{"id":1,"created_at":"2025-01-02T10:00:00Z"}]}"#;
        let (base_url, server) = serve_once("200 OK", body).await;
        let client = HistoryClient::new(base_url, "token");

        let records = client.fetch_history().await.unwrap();
        let ids: Vec<i64> = records.iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![1, 2]);
        server.await.unwrap();
    }

    #[test]
    fn wrapped_and_bare_payloads_parse() {
        let wrapped = r#"{"user":"sam","speeches":[{"id":1,"created_at":"2025-01-02T10:00:00"}]}"#;
        let records = parse_history_payload(wrapped).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].created_at.is_some());

        let bare = r#"[{"id":5,"transcript":"Hi"},{"id":6}]"#;
        let records = parse_history_payload(bare).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].transcript.as_deref(), Some("Hi"));
    }

    #[test]
    fn non_history_json_is_a_decode_error() {
        let err = parse_history_payload(r#"{"detail":"nope"}"#).unwrap_err();
        assert!(matches!(err, HistoryError::Decode(_)));
        assert!(!err.is_unauthenticated());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_history_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, HistoryError::Io(_)));
    }
}
