use std::env;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use log::{info, warn};
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::DownloadError;

/// Deterministic cache path for a page index. Presence of the file marks the
/// page as already downloaded.
pub fn page_image_path(work_dir: &Path, index: usize) -> PathBuf {
    work_dir.join(format!("{}.jpeg", index))
}

/// Ensures a directory exists, creating it if necessary
pub fn ensure_dir_exists(path: &Path) -> Result<(), DownloadError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(DownloadError::IoError)?;
    }
    Ok(())
}

/// Downloads every page image into `work_dir`, strictly in order. Pages
/// whose file already exists are skipped without any network traffic, so a
/// partial earlier run resumes where it stopped. A page that fails all retry
/// attempts is logged and skipped; the stage itself always completes.
/// Returns the number of newly downloaded files.
pub async fn download_images(
    client: &reqwest::Client,
    config: &Config,
    urls: &[String],
    work_dir: &Path,
) -> Result<usize, DownloadError> {
    ensure_dir_exists(work_dir)?;

    let main_progress_style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} pages ({eta})"
    )
    .unwrap()
    .with_key("eta", |state: &ProgressState, w: &mut dyn Write| write!(w, "{:.1}s", state.eta().as_secs_f64()).unwrap())
    .progress_chars("#>-");

    let main_pb = ProgressBar::new(urls.len() as u64);
    main_pb.set_style(main_progress_style);
    main_pb.set_message("Downloading pages...");

    let mut downloaded = 0;
    for (index, url) in urls.iter().enumerate() {
        let image_path = page_image_path(work_dir, index);

        if image_path.exists() {
            info!("page {} already on disk, skipping", index);
            main_pb.inc(1);
            continue;
        }

        let result = config
            .retry
            .run(&format!("page {} download", index), || {
                let image_path = image_path.clone();
                async move { download_image(client, config, url, &image_path).await }
            })
            .await;

        match result {
            Ok(()) => {
                downloaded += 1;
                main_pb.inc(1);
            }
            Err(err) => {
                // The loop carries on; the missing file surfaces as a fatal
                // read error at assembly time.
                warn!("giving up on page {}: {}", index, err);
                eprintln!("✗ Failed to download page {}: {}", index, err);
                main_pb.inc(1);
            }
        }
    }

    main_pb.finish_with_message("All downloads complete!");
    Ok(downloaded)
}

/// Downloads a single page image, streaming the body to disk chunk by chunk.
/// Anything other than HTTP 200 counts as a failed attempt.
async fn download_image(
    client: &reqwest::Client,
    config: &Config,
    url: &str,
    path: &Path,
) -> Result<(), DownloadError> {
    // Intermediaries cache failed responses for these image URLs; a fresh
    // `_retry` value per attempt makes every attempt a distinct resource.
    let busted = format!("{}&_retry={}", url, epoch_millis());

    let mut response = client
        .get(&busted)
        .timeout(config.request_timeout)
        .send()
        .await?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(DownloadError::ParsingError(format!(
            "HTTP error: {} for URL {}",
            response.status(),
            url
        )));
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(DownloadError::IoError)?;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(DownloadError::IoError)?;
    }
    file.flush().await.map_err(DownloadError::IoError)?;

    Ok(())
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Builds the output PDF path from the document title and id.
pub fn build_output_path(output_dir: &Path, title: &str, fid: &str) -> PathBuf {
    output_dir.join(format!("{}_{}.pdf", sanitize_filename(title), fid))
}

/// Strips characters unsafe in filenames. Unlike a slug, spaces and case are
/// preserved so the document title stays readable in the output name.
pub fn sanitize_filename(input: &str) -> String {
    let invalid_chars = match env::consts::OS {
        "windows" => r#"\/:*?"<>|"#,
        _ => "/", // Unix-like systems mainly forbid slashes
    };

    let mut result = input.to_string();
    for c in invalid_chars.chars() {
        result = result.replace(c, "_");
    }

    // Ensure filename doesn't start with a dot (hidden file on Unix)
    if result.starts_with('.') {
        result = format!("_{}", result);
    }

    // Trim to a length every common filesystem accepts
    while result.len() > 255 {
        result.pop();
    }

    result
}
