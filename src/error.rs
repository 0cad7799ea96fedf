use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum DownloadError {
    RequestFailed(reqwest::Error),
    IoError(std::io::Error),
    ParsingError(String),
    SelectorError(String),
    InvalidHeader(String),
    MetadataField(String),
    MissingPage(usize),
    ImageProcessingError(String),
    PdfGenerationError(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::RequestFailed(e) => write!(f, "Failed to make HTTP request: {}", e),
            DownloadError::IoError(e) => write!(f, "IO operation failed: {}", e),
            DownloadError::ParsingError(msg) => write!(f, "Failed to parse response: {}", msg),
            DownloadError::SelectorError(msg) => write!(f, "Invalid CSS selector: {}", msg),
            DownloadError::InvalidHeader(msg) => write!(f, "Invalid request header: {}", msg),
            DownloadError::MetadataField(name) => write!(f, "Metadata field missing or unusable: {}", name),
            DownloadError::MissingPage(index) => write!(f, "No image URL discovered for page {}", index),
            DownloadError::ImageProcessingError(msg) => write!(f, "Image processing error: {}", msg),
            DownloadError::PdfGenerationError(msg) => write!(f, "PDF generation error: {}", msg),
        }
    }
}

impl Error for DownloadError {}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::RequestFailed(err)
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::IoError(err)
    }
}

impl From<genpdf::error::Error> for DownloadError {
    fn from(err: genpdf::error::Error) -> Self {
        DownloadError::PdfGenerationError(err.to_string())
    }
}
