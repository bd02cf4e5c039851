//! Streaming HTTP downloads.

use crate::error::ProvisionError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn discard_part(part: &Path) {
    if let Err(e) = fs::remove_file(part).await {
        log::debug!("[Download] Could not remove {}: {}", part.display(), e);
    }
}

/// Fetch `url` into `dest`, returning the number of bytes written.
///
/// The body streams into `<dest>.part` and is renamed into place only after
/// the last chunk lands, so an interrupted download never looks complete.
pub async fn fetch_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<u64, ProvisionError> {
    let failed = |reason: String| ProvisionError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    log::info!("[Download] Fetching {} -> {}", url, dest.display());
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("HTTP {}", status)));
    }

    let part = part_path(dest);
    let mut file = fs::File::create(&part).await?;
    let mut written: u64 = 0;

    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if let Err(e) = file.write_all(&chunk).await {
                    drop(file);
                    discard_part(&part).await;
                    return Err(e.into());
                }
                written += chunk.len() as u64;
            }
            Ok(None) => break,
            Err(e) => {
                drop(file);
                discard_part(&part).await;
                return Err(failed(e.to_string()));
            }
        }
    }

    let finished = async {
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&part, dest).await
    }
    .await;
    if let Err(e) = finished {
        discard_part(&part).await;
        return Err(e.into());
    }

    log::info!("[Download] Completed {} ({} bytes)", dest.display(), written);
    Ok(written)
}
