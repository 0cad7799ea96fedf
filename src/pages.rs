use std::collections::HashMap;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use serde::Deserialize;

use crate::config::Config;
use crate::error::DownloadError;
use crate::paper_info::PaperInfo;

/// One page entry returned by the paging endpoint: a page index (as a
/// string) and the image URL for that page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageEntry {
    pub id: String,
    pub src: String,
}

#[derive(Debug, Deserialize)]
struct PageBatch {
    list: Vec<PageEntry>,
}

/// Page-index → image-URL map built incrementally across batch queries.
/// Completeness is checked once, in `into_ordered`, instead of failing on a
/// late lookup.
#[derive(Debug, Default)]
pub struct PageMap {
    entries: HashMap<usize, String>,
}

impl PageMap {
    /// Folds a batch into the map. Overlapping batches repeat indices;
    /// last-write-wins is safe because the same index always carries the
    /// same URL. Entries with a non-numeric id are logged and dropped.
    pub fn merge(&mut self, batch: Vec<PageEntry>) {
        for entry in batch {
            match entry.id.parse::<usize>() {
                Ok(index) => {
                    self.entries.insert(index, entry.src);
                }
                Err(_) => warn!("ignoring page entry with non-numeric id {:?}", entry.id),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(&index).map(String::as_str)
    }

    /// Checks that every index in `[0, end)` was discovered and returns the
    /// URLs in page order. The first hole aborts with a named error.
    pub fn into_ordered(mut self, end: usize) -> Result<Vec<String>, DownloadError> {
        (0..end)
            .map(|index| {
                self.entries
                    .remove(&index)
                    .ok_or(DownloadError::MissingPage(index))
            })
            .collect()
    }
}

/// Offsets queried against the paging endpoint to cover `[start, end)`.
///
/// The endpoint returns `batch_size` consecutive pages per query, so the
/// stride advances by `batch_size` while a full window still fits. The
/// stride alone misses trailing pages whenever the range length is not a
/// multiple of the batch size, so one extra query anchored at the last full
/// window is always issued; the overlap re-fetches some indices, which the
/// page map absorbs.
pub fn batch_offsets(start: usize, end: usize, batch_size: usize) -> Vec<usize> {
    let anchor = end.saturating_sub(batch_size - 1);
    let mut offsets = Vec::new();

    let mut page = start;
    while page <= anchor {
        offsets.push(page);
        page += batch_size;
    }
    offsets.push(anchor);
    offsets
}

/// Produces the ordered image-URL list for every page of the document.
/// Batch queries that fail all retries contribute nothing; the resulting
/// hole is reported by the completeness check at the end.
pub async fn discover_page_urls(
    client: &reqwest::Client,
    config: &Config,
    info: &PaperInfo,
) -> Result<Vec<String>, DownloadError> {
    let (start, end) = info.page_range()?;
    let fid = info.document_id()?;
    let filename = info.remote_filename()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap()
        .tick_strings(&[
            "⠋ ", "⠙ ", "⠹ ", "⠸ ", "⠼ ", "⠴ ", "⠦ ", "⠧ ", "⠇ ", "⠏ "
        ])
    );
    spinner.set_message(format!("Discovering image URLs for {} pages...", end));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut map = PageMap::default();
    for offset in batch_offsets(start, end, config.page_batch_size) {
        let batch = fetch_page_batch(client, config, offset, fid, filename).await;
        map.merge(batch);
    }

    let ordered = map.into_ordered(end)?;
    spinner.finish_with_message(format!("✓ Found {} page image URLs", ordered.len()));
    Ok(ordered)
}

/// One batch query under the shared retry policy. Exhausted retries degrade
/// to an empty batch; discovery carries on with the next offset.
async fn fetch_page_batch(
    client: &reqwest::Client,
    config: &Config,
    page: usize,
    fid: &str,
    filename: &str,
) -> Vec<PageEntry> {
    // Query parameters must match the remote servlet exactly, including the
    // empty userid and visitid.
    let url = format!(
        "{}/jumpServlet?page={}&fid={}&userid=&filename={}&visitid=",
        config.base_url, page, fid, filename
    );
    let url: &str = &url;
    debug!("requesting page batch at offset {}", page);

    let result = config
        .retry
        .run(&format!("page batch {}", page), || async move {
            let response = client
                .get(url)
                .timeout(config.request_timeout)
                .send()
                .await?
                .error_for_status()?;
            let body = response.text().await?;
            let batch: PageBatch = serde_json::from_str(&body)
                .map_err(|e| DownloadError::ParsingError(format!("page batch {}: {}", page, e)))?;
            Ok::<_, DownloadError>(batch.list)
        })
        .await;

    match result {
        Ok(list) => list,
        Err(err) => {
            warn!("giving up on page batch {}: {}", page, err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, src: &str) -> PageEntry {
        PageEntry {
            id: id.to_string(),
            src: src.to_string(),
        }
    }

    #[test]
    fn test_batch_offsets_with_trailing_overlap() {
        // 5 pages, batches of 3: stride hits 0 and 3, anchor repeats 3.
        assert_eq!(batch_offsets(0, 5, 3), vec![0, 3, 3]);
    }

    #[test]
    fn test_batch_offsets_exact_multiple() {
        assert_eq!(batch_offsets(0, 6, 3), vec![0, 3, 4]);
    }

    #[test]
    fn test_batch_offsets_cover_whole_range() {
        for end in 3..40 {
            let offsets = batch_offsets(0, end, 3);
            for index in 0..end {
                assert!(
                    offsets.iter().any(|&o| o <= index && index < o + 3),
                    "page {} not covered for end={} (offsets {:?})",
                    index,
                    end,
                    offsets
                );
            }
        }
    }

    #[test]
    fn test_merge_overwrites_duplicates_with_same_url() {
        let mut map = PageMap::default();
        map.merge(vec![entry("0", "http://img/0"), entry("1", "http://img/1")]);
        map.merge(vec![entry("1", "http://img/1"), entry("2", "http://img/2")]);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(1), Some("http://img/1"));
    }

    #[test]
    fn test_merge_drops_non_numeric_ids() {
        let mut map = PageMap::default();
        map.merge(vec![entry("0", "http://img/0"), entry("cover", "http://img/cover")]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_into_ordered_is_sorted_and_complete() {
        let mut map = PageMap::default();
        map.merge(vec![
            entry("2", "http://img/2"),
            entry("0", "http://img/0"),
            entry("1", "http://img/1"),
        ]);

        let ordered = map.into_ordered(3).unwrap();
        assert_eq!(ordered, vec!["http://img/0", "http://img/1", "http://img/2"]);
    }

    #[test]
    fn test_into_ordered_reports_first_hole() {
        let mut map = PageMap::default();
        map.merge(vec![entry("0", "http://img/0"), entry("2", "http://img/2")]);

        match map.into_ordered(3) {
            Err(DownloadError::MissingPage(index)) => assert_eq!(index, 1),
            other => panic!("expected MissingPage, got {:?}", other),
        }
    }

    #[test]
    fn test_into_ordered_empty_range() {
        let map = PageMap::default();
        assert!(map.into_ordered(0).unwrap().is_empty());
    }
}
