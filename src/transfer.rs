//! Download transfer
//!
//! Follows a built download URL and streams the response body to disk. The
//! server decides what the bytes are (a single file or a ZIP archive); the
//! client only picks a local file name.

use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::browser::BrowserError;

/// Bytes written so far and the expected total (0 when unknown)
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Name used when neither the caller nor the server yields a usable one
const DEFAULT_FILE_NAME: &str = "download";

/// Last path component of `name`, or `None` if nothing usable remains.
/// Remote-supplied names go through here so a write never leaves the target dir.
pub fn safe_file_name(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}

/// File name from a `Content-Disposition` header, if it carries one
pub fn content_disposition_filename(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        safe_file_name(value.trim().trim_matches('"'))
    })
}

/// Local destination: `output` if given, otherwise the server-provided name,
/// otherwise `fallback`, inside the current directory
pub fn resolve_destination(output: Option<&Path>, server_name: Option<&str>, fallback: &str) -> PathBuf {
    if let Some(path) = output {
        return path.to_path_buf();
    }
    let name = server_name
        .and_then(safe_file_name)
        .or_else(|| safe_file_name(fallback))
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    PathBuf::from(name)
}

/// Stream `url` into a file. Returns the path written and the byte count.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: Url,
    output: Option<&Path>,
    fallback_name: &str,
    on_progress: Option<ProgressFn>,
) -> Result<(PathBuf, u64), BrowserError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| BrowserError::Remote(format!("Network error: {}", e)))?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or_else(|| format!("Download failed (HTTP {})", status));
        return Err(BrowserError::Remote(message));
    }

    let server_name = resp
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(content_disposition_filename);
    let destination = resolve_destination(output, server_name.as_deref(), fallback_name);

    let total_size = resp.content_length().unwrap_or(0);
    let mut file = tokio::fs::File::create(&destination)
        .await
        .map_err(|e| BrowserError::Remote(format!("Cannot create {:?}: {}", destination, e)))?;

    let downloaded = match write_body(resp, &mut file, total_size, on_progress).await {
        Ok(bytes) => bytes,
        Err(e) => {
            drop(file);
            // never leave a truncated file behind
            let _ = tokio::fs::remove_file(&destination).await;
            return Err(e);
        }
    };

    tracing::info!("Downloaded {} bytes to {:?}", downloaded, destination);
    Ok((destination, downloaded))
}

async fn write_body(
    resp: reqwest::Response,
    file: &mut tokio::fs::File,
    total_size: u64,
    on_progress: Option<ProgressFn>,
) -> Result<u64, BrowserError> {
    let mut stream = resp.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| BrowserError::Remote(format!("Transfer failed: {}", e)))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| BrowserError::Remote(format!("Transfer failed: {}", e)))?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = on_progress {
            cb(downloaded, total_size);
        }
    }

    file.flush()
        .await
        .map_err(|e| BrowserError::Remote(format!("Transfer failed: {}", e)))?;
    Ok(downloaded)
}
