// src/fetch/download.rs
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fetch the raw bytes behind `url`.
///
/// A non-success status (typically 404 before a release is published) is
/// `Ok(None)`. Transport errors are retried a bounded number of times and
/// then surfaced.
pub async fn retrieve(client: &Client, url: &str) -> Result<Option<Vec<u8>>> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let bytes = resp
                    .bytes()
                    .await
                    .with_context(|| format!("reading body of {}", url))?;
                debug!(url, bytes = bytes.len(), "downloaded");
                return Ok(Some(bytes.to_vec()));
            }
            Ok(resp) => {
                let status = resp.status();
                if status == StatusCode::NOT_FOUND {
                    debug!(url, "not published");
                } else {
                    warn!(url, %status, "unexpected status");
                }
                return Ok(None);
            }
            Err(e) if attempt < MAX_RETRIES => {
                warn!(url, attempt, error = %e, "request failed, retrying");
                sleep(RETRY_DELAY).await;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("GET {} after {} attempts", url, attempt));
            }
        }
    }
}
