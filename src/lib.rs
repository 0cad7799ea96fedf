// Expose modules for integration testing
pub mod config;
pub mod downloader;
pub mod error;
pub mod pages;
pub mod paper_info;
pub mod pdf;
pub mod retry;

// Re-export important types for easier use in tests
pub use config::{Config, SessionCookies};
pub use error::DownloadError;
pub use paper_info::PaperInfo;
pub use retry::RetryPolicy;
