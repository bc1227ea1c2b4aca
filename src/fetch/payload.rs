// src/fetch/payload.rs

use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::fs;
use url::Url;

use crate::error::DownloadError;

/// GET `url` and buffer the whole body, calling `on_progress(received, total)`
/// after every chunk. `total` is 0 when the server sent no length.
pub async fn download_payload<F>(
    client: &Client,
    url: &Url,
    mut on_progress: F,
) -> Result<Vec<u8>, DownloadError>
where
    F: FnMut(u64, u64),
{
    let resp = client.get(url.clone()).send().await?.error_for_status()?;
    let total = resp.content_length().unwrap_or(0);

    let mut body = Vec::new();
    let mut received = 0u64;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        received += chunk.len() as u64;
        body.extend_from_slice(&chunk);
        on_progress(received, total);
    }

    Ok(body)
}

/// Write the complete payload to `dest`, creating or truncating it.
pub async fn save_payload(dest: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    fs::write(dest, bytes)
        .await
        .map_err(|source| DownloadError::Write {
            path: dest.to_path_buf(),
            source,
        })
}

/// Whole-number percentage of one transfer, `None` while nothing is known.
pub fn percent(received: u64, total: u64) -> Option<u8> {
    if received == 0 || total == 0 {
        return None;
    }
    let pct = (u128::from(received) * 100 / u128::from(total)).min(100);
    Some(pct as u8)
}
