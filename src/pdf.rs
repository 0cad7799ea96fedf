use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use log::{debug, info, trace, warn};

use crate::downloader::{build_output_path, page_image_path};
use crate::error::DownloadError;
use crate::paper_info::PaperInfo;

/// Builds the final PDF from the downloaded page images, then removes the
/// image cache directory. Returns the output path, or `None` when the
/// expected image set was empty and no PDF was produced.
///
/// The cache directory is removed whether or not assembly succeeded; a
/// failed assembly therefore forces a full re-download on the next run.
pub fn assemble_pdf(
    info: &PaperInfo,
    work_dir: &Path,
    output_dir: &Path,
) -> Result<Option<PathBuf>, DownloadError> {
    let (_, end) = info.page_range()?;
    let title = info.display_title()?;
    let fid = info.document_id()?;

    let image_paths: Vec<PathBuf> = (0..end).map(|i| page_image_path(work_dir, i)).collect();

    let result = if image_paths.is_empty() {
        info!("no page images expected, PDF not generated");
        Ok(None)
    } else {
        let output_path = build_output_path(output_dir, title, fid);
        debug!("assembling {} pages into {:?}", image_paths.len(), output_path);
        create_pdf_from_images(&image_paths, &output_path, title).map(|_| Some(output_path))
    };

    if work_dir.exists() {
        fs::remove_dir_all(work_dir).map_err(DownloadError::IoError)?;
    }

    result
}

/// Generates a PDF from a collection of image paths, one page per image, in
/// the given order. Any missing or unreadable image is fatal; there is no
/// partial-PDF fallback.
pub fn create_pdf_from_images(
    image_paths: &[impl AsRef<Path>],
    output_path: &Path,
    title: &str,
) -> Result<(), DownloadError> {
    if image_paths.is_empty() {
        return Err(DownloadError::PdfGenerationError(String::from(
            "Cannot create PDF: no images provided",
        )));
    }

    debug!("Creating PDF from {} images", image_paths.len());
    trace!("Output path: {:?}", output_path);

    let font_family = find_system_font()
        .map_err(|e| DownloadError::PdfGenerationError(format!("Failed to load font: {}", e)))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(title);
    doc.set_paper_size(genpdf::PaperSize::A4);

    // A4 is 210mm wide; leave 6mm margins on each side.
    let available_width = 210.0 - 12.0;

    for (i, path) in image_paths.iter().enumerate() {
        trace!("Processing image {}/{}", i + 1, image_paths.len());

        // Scale each page image to fill the page width, assuming 300 DPI.
        let img_data = load_image_from_path(path)?;
        let img_width_mm = img_data.width() as f64 * 25.4 / 300.0;
        let scale_factor = available_width / img_width_mm;
        trace!(
            "Image dimensions: {}x{}, scale factor: {:.2}",
            img_data.width(),
            img_data.height(),
            scale_factor
        );

        let img = genpdf::elements::Image::from_path(path)
            .map_err(|e| DownloadError::ImageProcessingError(format!("Failed to load image: {}", e)))?
            .with_alignment(genpdf::Alignment::Center)
            .with_scale(genpdf::Scale::new(scale_factor, scale_factor));

        doc.push(img);

        if i < image_paths.len() - 1 {
            doc.push(genpdf::elements::PageBreak::new());
        }
    }

    debug!("Rendering PDF to file: {:?}", output_path);
    doc.render_to_file(output_path)?;
    info!("PDF created successfully with {} pages", image_paths.len());

    Ok(())
}

/// Whether a usable system font could be located. PDF assembly needs one
/// even though the document is image-only; tests and the font_probe binary
/// use this to skip or report.
pub fn font_available() -> bool {
    find_system_font().is_ok()
}

/// Locates a font the PDF engine can embed, trying each candidate path in
/// order. All four styles map to the same face; the document carries no
/// visible text.
fn find_system_font() -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, String> {
    debug!("Looking for a usable system font");

    for path in font_candidates() {
        if !path.exists() {
            trace!("Font file not found: {}", path.display());
            continue;
        }

        let Ok(bytes) = fs::read(&path) else {
            trace!("Font file not readable: {}", path.display());
            continue;
        };

        match genpdf::fonts::FontData::new(bytes, None) {
            Ok(font_data) => {
                info!("Using system font: {}", path.display());
                return Ok(genpdf::fonts::FontFamily {
                    regular: font_data.clone(),
                    bold: font_data.clone(),
                    italic: font_data.clone(),
                    bold_italic: font_data,
                });
            }
            Err(e) => {
                // TTC collections in particular often fail here; keep trying.
                trace!("Failed to load font {}: {}", path.display(), e);
            }
        }
    }

    warn!("Could not load any suitable font");
    Err(String::from("no usable system font found"))
}

/// Candidate font files by platform, best-known first, including the user's
/// own font directory.
fn font_candidates() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = match env::consts::OS {
        "macos" => vec![
            PathBuf::from("/System/Library/Fonts/Geneva.ttf"),
            PathBuf::from("/System/Library/Fonts/Monaco.ttf"),
            PathBuf::from("/System/Library/Fonts/Helvetica.ttc"),
            PathBuf::from("/Library/Fonts/Arial.ttf"),
        ],
        "windows" => vec![
            PathBuf::from("C:\\Windows\\Fonts\\arial.ttf"),
            PathBuf::from("C:\\Windows\\Fonts\\verdana.ttf"),
            PathBuf::from("C:\\Windows\\Fonts\\tahoma.ttf"),
            PathBuf::from("C:\\Windows\\Fonts\\times.ttf"),
            PathBuf::from("C:\\Windows\\Fonts\\calibri.ttf"),
        ],
        _ => vec![
            PathBuf::from("/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"),
            PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            PathBuf::from("/usr/share/fonts/TTF/DejaVuSans.ttf"),
            PathBuf::from("/usr/share/fonts/liberation/LiberationSans-Regular.ttf"),
            PathBuf::from("/usr/share/fonts/truetype/ubuntu/Ubuntu-R.ttf"),
            PathBuf::from("/usr/share/fonts/noto/NotoSans-Regular.ttf"),
            PathBuf::from("/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf"),
        ],
    };

    if let Some(home) = dirs::home_dir() {
        match env::consts::OS {
            "macos" => {
                candidates.push(home.join("Library/Fonts/Arial.ttf"));
            }
            "windows" => {
                candidates.push(home.join("AppData\\Local\\Microsoft\\Windows\\Fonts\\arial.ttf"));
            }
            _ => {
                candidates.push(home.join(".local/share/fonts/DejaVuSans.ttf"));
                candidates.push(home.join(".local/share/fonts/LiberationSans-Regular.ttf"));
            }
        }
    }

    candidates
}

fn load_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, DownloadError> {
    image::open(path.as_ref())
        .map_err(|e| DownloadError::PdfGenerationError(format!("Failed to load image: {}", e)))
}
