// src/distribution/download.rs

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Stream `url` into `destination`, replacing any existing file.
pub async fn download_to(url: &str, destination: &Path) -> Result<u64> {
    info!(url, destination = %destination.display(), "downloading distribution");

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating dir {:?}", parent))?;
    }

    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .with_context(|| format!("downloading {url}"))?;

    let mut file = tokio::fs::File::create(destination)
        .await
        .with_context(|| format!("creating file {:?}", destination))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("reading body of {url}"))?
    {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("writing to file {:?}", destination))?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    info!(bytes = written, "download complete");
    Ok(written)
}
