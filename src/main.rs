use std::io::{self, Write};
use std::path::Path;

use clap::Parser;

mod config;
mod downloader;
mod error;
mod pages;
mod paper_info;
mod pdf;
mod retry;

use config::{build_client, Config, SessionCookies, DEFAULT_BASE_URL, DEFAULT_COOKIE};
use downloader::download_images;
use error::DownloadError;
use pages::discover_page_urls;
use paper_info::PaperInfo;
use pdf::assemble_pdf;

/// Download a document from a library DRM viewer and bundle its pages as a PDF
#[derive(Debug, Parser)]
#[command(version, about, long_about = "Download a document from a library DRM viewer and bundle its page images into a single PDF")]
pub struct Args {
    /// Base URL of the DRM viewer
    #[arg(short, long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Session cookie string ("name=value; name2=value2"); prompted for when omitted
    #[arg(short, long)]
    pub cookie: Option<String>,

    /// Document id to fetch; when omitted, ids are prompted for in a loop
    #[arg(short, long)]
    pub fid: Option<String>,

    /// Directory the finished PDF is written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: String,
}

#[tokio::main]
async fn main() -> Result<(), DownloadError> {
    env_logger::init();
    let args = Args::parse();

    let cookie_str = match args.cookie {
        Some(cookie) => cookie,
        None => prompt("Cookie string: ")?,
    };
    let cookie_str = if cookie_str.trim().is_empty() {
        DEFAULT_COOKIE.to_string()
    } else {
        cookie_str
    };
    let cookies = SessionCookies::parse(&cookie_str);

    let config = Config {
        base_url: args.base_url,
        ..Config::default()
    };
    let client = build_client(&config, &cookies)?;
    let output_dir = Path::new(&args.output_dir);

    // Single-shot mode: one fid from the command line, then exit.
    if let Some(fid) = args.fid {
        return run_pipeline(&client, &config, fid.trim(), output_dir).await;
    }

    // Interactive mode: one pipeline run per entered id. A failed run is
    // reported and the loop moves on to the next prompt.
    loop {
        let input = prompt("Document fid: ")?;
        let fid = input.trim();
        if fid.is_empty() {
            break;
        }

        if let Err(err) = run_pipeline(&client, &config, fid, output_dir).await {
            eprintln!("✗ Pipeline failed for fid {}: {}", fid, err);
        }
    }

    Ok(())
}

/// Runs the four stages for one document: metadata fetch, page-URL
/// discovery, sequential image download, PDF assembly.
async fn run_pipeline(
    client: &reqwest::Client,
    config: &Config,
    fid: &str,
    output_dir: &Path,
) -> Result<(), DownloadError> {
    let info = PaperInfo::fetch(client, config, fid).await?;
    println!("Document: {}", info.title.as_deref().unwrap_or("(untitled)"));

    let urls = discover_page_urls(client, config, &info).await?;

    println!("Downloading {} page images", urls.len());
    let downloaded = download_images(client, config, &urls, &config.work_dir).await?;
    println!("Downloaded {} new page images", downloaded);

    match assemble_pdf(&info, &config.work_dir, output_dir)? {
        Some(path) => println!("✓ PDF created: {}", path.display()),
        None => eprintln!("✗ No page images found, PDF was not generated"),
    }

    Ok(())
}

// Reads one trimmed-on-use line from stdin; EOF yields an empty string,
// which the interactive loop treats as "stop".
fn prompt(message: &str) -> Result<String, DownloadError> {
    print!("{}", message);
    io::stdout().flush().map_err(DownloadError::IoError)?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(DownloadError::IoError)?;
    Ok(input)
}
