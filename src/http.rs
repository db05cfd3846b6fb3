//! Shared JSON-over-HTTP plumbing for the remote providers.
//!
//! Retry strategy, applied uniformly to Gemini and Pinecone calls:
//! - HTTP 429 and 5xx → retry with exponential backoff (1s, 2s, 4s, ...
//!   capped at 32s)
//! - other 4xx → fail immediately
//! - network errors → retry

use std::time::Duration;

use reqwest::header::HeaderMap;

/// POST a JSON body and parse the JSON response, retrying transient
/// failures. Errors are plain strings; callers fold them into their own
/// error kind.
pub(crate) async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    headers: &HeaderMap,
    body: &serde_json::Value,
    max_retries: u32,
) -> std::result::Result<serde_json::Value, String> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| format!("invalid JSON response: {e}"));
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let text = response.text().await.unwrap_or_default();
                    last_err = Some(format!("HTTP {status}: {text}"));
                    continue;
                }

                let text = response.text().await.unwrap_or_default();
                return Err(format!("HTTP {status}: {text}"));
            }
            Err(e) => {
                last_err = Some(e.to_string());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| "request failed after retries".to_string()))
}
