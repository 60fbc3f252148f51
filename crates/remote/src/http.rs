//! Response helpers shared by the HTTP backends.

use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::BackendError;

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a [`BackendError::Api`] containing the status
/// and body text on failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(BackendError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let response = ensure_success(response).await?;
    Ok(response.json::<T>().await?)
}

/// Stream a successful response body into `sink` chunk by chunk.
pub(crate) async fn stream_body(
    response: reqwest::Response,
    sink: &mut (dyn AsyncWrite + Unpin + Send),
) -> Result<u64, BackendError> {
    let response = ensure_success(response).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        sink.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    sink.flush().await?;

    Ok(written)
}

/// True if `locator` is an absolute http(s) URL.
pub(crate) fn is_url(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}
