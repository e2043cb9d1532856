//! HTTP client for the meal sync endpoint of the backend API.

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;

use mealtrack_core::sync::{SyncBatchRequest, SyncBatchResponse};

use crate::error::{Result, SyncApiError};

/// Default timeout for API requests. This is the only abort mechanism a
/// sync cycle has; a timeout surfaces as an ordinary request failure.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Error body shape returned by the backend.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    detail: String,
}

/// Client for the meal sync REST API.
#[derive(Debug, Clone)]
pub struct MealSyncClient {
    client: reqwest::Client,
    base_url: String,
}

impl MealSyncClient {
    /// Create a new sync client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the backend API (e.g., "https://api.mealtrack.app")
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create headers for an API request.
    fn headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| SyncApiError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(SyncApiError::api(status.as_u16(), error.detail));
            }
            return Err(SyncApiError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            SyncApiError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Push the locally pending batch and receive the server's merge result.
    ///
    /// The server keys records on `client_id`, so resubmitting the same
    /// batch after a dropped response is idempotent.
    ///
    /// POST /api/v1/meals/sync
    pub async fn push_meals(
        &self,
        token: &str,
        request: &SyncBatchRequest,
    ) -> Result<SyncBatchResponse> {
        let url = format!("{}/api/v1/meals/sync", self.base_url);
        debug!(
            "Pushing {} pending meal record(s) to {}",
            request.meals.len(),
            url
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers(token)?)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        headers: HashMap<String, String>,
        body: String,
    }

    fn header_end_offset(buffer: &[u8]) -> Option<usize> {
        buffer.windows(4).position(|window| window == b"\r\n\r\n")
    }

    async fn read_http_request(stream: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
        let mut buffer = Vec::new();
        loop {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                return None;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if header_end_offset(&buffer).is_some() {
                break;
            }
        }

        let header_end = header_end_offset(&buffer)?;
        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let mut lines = head.lines();
        let _request_line = lines.next()?.to_string();

        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        while buffer.len() < header_end + 4 + content_length {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
        }

        let body = String::from_utf8_lossy(&buffer[header_end + 4..]).to_string();
        Some(CapturedRequest { headers, body })
    }

    async fn start_mock_server(
        status: u16,
        body: String,
    ) -> (
        String,
        Arc<TokioMutex<Vec<CapturedRequest>>>,
        tokio::task::JoinHandle<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let captured = Arc::new(TokioMutex::new(Vec::<CapturedRequest>::new()));
        let captured_clone = Arc::clone(&captured);

        let handle = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(value) => value,
                    Err(_) => break,
                };
                let captured_inner = Arc::clone(&captured_clone);
                let body = body.clone();
                tokio::spawn(async move {
                    let Some(request) = read_http_request(&mut stream).await else {
                        return;
                    };
                    captured_inner.lock().await.push(request);
                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.flush().await;
                });
            }
        });

        (format!("http://{}", addr), captured, handle)
    }

    fn empty_request() -> SyncBatchRequest {
        SyncBatchRequest {
            meals: Vec::new(),
            last_sync_at: None,
        }
    }

    #[tokio::test]
    async fn push_sends_bearer_token_and_parses_response() {
        let (base_url, captured, server) = start_mock_server(
            200,
            r#"{"synced_count":2,"conflicts":["abc"],"server_meals":[]}"#.to_string(),
        )
        .await;

        let client = MealSyncClient::new(&base_url);
        let response = client
            .push_meals("token-123", &empty_request())
            .await
            .expect("push success");

        assert_eq!(response.synced_count, 2);
        assert_eq!(response.conflicts, vec!["abc".to_string()]);
        assert!(response.server_meals.is_empty());

        let requests = captured.lock().await.clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Bearer token-123")
        );
        let body: serde_json::Value =
            serde_json::from_str(&requests[0].body).expect("request body is JSON");
        assert!(body.get("meals").expect("meals field").is_array());
        assert!(body.get("last_sync_at").expect("watermark field").is_null());

        server.abort();
    }

    #[tokio::test]
    async fn server_meals_deserialize_with_ids_and_dates() {
        let meal_json = r#"{
            "id": 7, "client_id": "c-1", "name": "rice", "portion": "1 bowl",
            "calories": 200.0, "sodium": 2.0, "purine": 20.0,
            "protein": null, "carbs": 45.0, "fat": null, "fiber": null,
            "meal_type": "LUNCH", "category": "STAPLE",
            "record_date": "2026-08-01", "note": null, "image_url": null,
            "ai_recognized": false, "sync_status": "SYNCED",
            "created_at": "2026-08-01T10:00:00Z", "updated_at": "2026-08-01T10:00:00Z"
        }"#;
        let (base_url, _captured, server) = start_mock_server(
            200,
            format!(r#"{{"synced_count":1,"conflicts":[],"server_meals":[{}]}}"#, meal_json),
        )
        .await;

        let client = MealSyncClient::new(&base_url);
        let response = client
            .push_meals("token", &empty_request())
            .await
            .expect("push success");

        assert_eq!(response.server_meals.len(), 1);
        let meal = &response.server_meals[0];
        assert_eq!(meal.id, 7);
        assert_eq!(meal.client_id, "c-1");
        assert_eq!(
            meal.record_date,
            chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
        );

        server.abort();
    }

    #[tokio::test]
    async fn api_error_detail_is_surfaced() {
        let (base_url, _captured, server) =
            start_mock_server(401, r#"{"detail":"Not authenticated"}"#.to_string()).await;

        let client = MealSyncClient::new(&base_url);
        let err = client
            .push_meals("expired", &empty_request())
            .await
            .expect_err("push should fail");

        match &err {
            SyncApiError::Api { status, message } => {
                assert_eq!(*status, 401);
                assert!(message.contains("Not authenticated"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
        assert_eq!(err.retry_class(), crate::error::ApiRetryClass::ReauthRequired);

        server.abort();
    }
}
