use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};

use crate::error::DownloadError;
use crate::retry::RetryPolicy;

/// Base URL of the library's DRM viewer.
pub const DEFAULT_BASE_URL: &str = "https://drm.lib.pku.edu.cn";

/// The viewer rejects requests without a browser-like user agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Cookie string used when the prompt is left blank.
pub const DEFAULT_COOKIE: &str = "";

/// Settings shared by every pipeline stage. Stages receive this explicitly;
/// nothing reads process-wide state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote viewer.
    pub base_url: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Directory holding downloaded page images until assembly.
    pub work_dir: PathBuf,
    /// Number of consecutive pages the paging endpoint returns per query.
    pub page_batch_size: usize,
    /// Timeout for batch and image requests. The index page request is
    /// deliberately unbounded.
    pub request_timeout: Duration,
    /// Retry policy for batch queries and image downloads.
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            work_dir: PathBuf::from("temp"),
            page_batch_size: 3,
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::new(5, Duration::from_secs(1)),
        }
    }
}

/// Session cookies parsed from a raw `"name=value; name2=value2"` string.
/// Immutable once parsed; attached to every request as the only
/// authentication mechanism.
#[derive(Debug, Clone, Default)]
pub struct SessionCookies {
    pairs: Vec<(String, String)>,
}

impl SessionCookies {
    /// Parses a raw cookie string. Items without a `=` are skipped; only the
    /// first `=` separates name from value, so values may contain `=`.
    pub fn parse(raw: &str) -> Self {
        let mut pairs = Vec::new();
        for item in raw.split(';') {
            if let Some((name, value)) = item.trim().split_once('=') {
                pairs.push((name.to_string(), value.to_string()));
            }
        }
        Self { pairs }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Renders the cookies back into a `Cookie` header value.
    pub fn header_value(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Builds the HTTP client used by every stage: user agent and session
/// cookies as default headers, no client-wide timeout (the metadata fetch
/// has none; batch and image requests set their own).
pub fn build_client(config: &Config, cookies: &SessionCookies) -> Result<reqwest::Client, DownloadError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .map_err(|e| DownloadError::InvalidHeader(format!("user agent: {}", e)))?,
    );
    if !cookies.is_empty() {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&cookies.header_value())
                .map_err(|e| DownloadError::InvalidHeader(format!("cookie: {}", e)))?,
        );
    }

    let client = reqwest::Client::builder().default_headers(headers).build()?;
    Ok(client)
}
