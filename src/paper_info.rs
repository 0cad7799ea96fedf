use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use crate::config::Config;
use crate::error::DownloadError;

/// Document metadata scraped from the viewer index page. Fields the page did
/// not carry stay `None`; nothing is validated at fetch time. A missing
/// field surfaces as a `MetadataField` error when an accessor first needs it.
#[derive(Debug, Clone, Default)]
pub struct PaperInfo {
    /// Display title (`infoname`), used for the output PDF name.
    pub title: Option<String>,
    /// Internal filename (`filename`) the paging endpoint expects.
    pub filename: Option<String>,
    /// First page index as the viewer reports it (`startpage`).
    pub start_page: Option<String>,
    /// One past the last page index (`endpage`).
    pub end_page: Option<String>,
    /// Document id echoed back by the viewer (`fid`).
    pub fid: Option<String>,
}

impl PaperInfo {
    /// Fetches the viewer index page for a document id and scrapes its
    /// metadata fields. A non-2xx response or network error propagates; this
    /// stage has no retry. No timeout either: the index page is rendered
    /// server-side and can be slow.
    pub async fn fetch(client: &reqwest::Client, config: &Config, fid: &str) -> Result<Self, DownloadError> {
        let url = format!("{}/pdfindex1.jsp?fid={}", config.base_url, fid);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&[
                "⠋ ", "⠙ ", "⠹ ", "⠸ ", "⠼ ", "⠴ ", "⠦ ", "⠧ ", "⠇ ", "⠏ "
            ])
        );
        spinner.set_message(format!("Fetching document info for fid {}...", fid));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let response = client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;
        let info = Self::from_html(&body);

        debug!("scraped metadata: {:?}", info);
        match info.title {
            Some(ref title) => spinner.finish_with_message(format!("✓ Found document: {}", title)),
            None => spinner.finish_with_message("✓ Index page fetched (no title found)".to_string()),
        }
        Ok(info)
    }

    /// Extracts the `value` attribute of the named `<input>` elements. Absent
    /// elements simply leave the field empty.
    pub fn from_html(body: &str) -> Self {
        let document = scraper::Html::parse_document(body.trim());
        Self {
            title: input_value(&document, "infoname"),
            filename: input_value(&document, "filename"),
            start_page: input_value(&document, "startpage"),
            end_page: input_value(&document, "endpage"),
            fid: input_value(&document, "fid"),
        }
    }

    /// Page range `[start, end)` of the document. Errors if either bound was
    /// missing from the index page or does not parse as a page number.
    pub fn page_range(&self) -> Result<(usize, usize), DownloadError> {
        let start = numeric_field(&self.start_page, "startpage")?;
        let end = numeric_field(&self.end_page, "endpage")?;
        Ok((start, end))
    }

    pub fn document_id(&self) -> Result<&str, DownloadError> {
        required_field(&self.fid, "fid")
    }

    pub fn remote_filename(&self) -> Result<&str, DownloadError> {
        required_field(&self.filename, "filename")
    }

    pub fn display_title(&self) -> Result<&str, DownloadError> {
        required_field(&self.title, "infoname")
    }
}

fn input_value(document: &scraper::Html, id: &str) -> Option<String> {
    let selector = scraper::Selector::parse(&format!("input#{}", id)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.attr("value"))
        .map(|value| value.to_string())
}

fn required_field<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, DownloadError> {
    value
        .as_deref()
        .ok_or_else(|| DownloadError::MetadataField(name.to_string()))
}

fn numeric_field(value: &Option<String>, name: &str) -> Result<usize, DownloadError> {
    value
        .as_deref()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| DownloadError::MetadataField(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_PAGE: &str = r#"
        <html><body>
            <input type="hidden" id="infoname" value="Paper A" />
            <input type="hidden" id="filename" value="paperA" />
            <input type="hidden" id="startpage" value="0" />
            <input type="hidden" id="endpage" value="5" />
            <input type="hidden" id="fid" value="12345" />
        </body></html>
    "#;

    #[test]
    fn test_from_html_extracts_all_fields() {
        let info = PaperInfo::from_html(INDEX_PAGE);
        assert_eq!(info.title.as_deref(), Some("Paper A"));
        assert_eq!(info.filename.as_deref(), Some("paperA"));
        assert_eq!(info.page_range().unwrap(), (0, 5));
        assert_eq!(info.document_id().unwrap(), "12345");
    }

    #[test]
    fn test_missing_fields_are_deferred_not_fatal() {
        let info = PaperInfo::from_html("<html><body>session expired</body></html>");
        assert!(info.title.is_none());

        // The error names the field that was first needed.
        match info.page_range() {
            Err(DownloadError::MetadataField(name)) => assert_eq!(name, "startpage"),
            other => panic!("expected MetadataField error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_page_bound_is_an_error() {
        let info = PaperInfo {
            start_page: Some(String::from("0")),
            end_page: Some(String::from("last")),
            ..PaperInfo::default()
        };
        assert!(matches!(
            info.page_range(),
            Err(DownloadError::MetadataField(_))
        ));
    }
}
