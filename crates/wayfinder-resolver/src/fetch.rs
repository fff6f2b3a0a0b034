//! Raw spec retrieval from a URL or the filesystem.

use std::time::Duration;

use crate::error::FetchError;

/// Default deadline for fetching a spec over the network.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieve raw spec text.
///
/// `http`/`https` sources are fetched with a bounded timeout; anything
/// else is treated as a filesystem path. Connection failures, non-2xx
/// statuses, and timeouts come back as typed [`FetchError`]s.
pub async fn fetch_spec(source: &str, timeout: Duration) -> Result<String, FetchError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_url(source, timeout).await
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| FetchError::Io {
                path: source.to_string(),
                source: e,
            })
    }
}

async fn fetch_url(url: &str, timeout: Duration) -> Result<String, FetchError> {
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            FetchError::Http {
                url: url.to_string(),
                source: e,
            }
        }
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(classify)?;

    let response = client.get(url).send().await.map_err(classify)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(classify)
}
