use std::env;
use std::fs;
use std::path::PathBuf;

// Checks which fonts on this machine the PDF assembler can actually use.
// PDF assembly needs an embeddable font even though the output is image-only;
// run this when assembly fails with a font error.
fn main() {
    println!("Font probe");
    println!("==========");

    let candidates: Vec<PathBuf> = match env::consts::OS {
        "macos" => vec![
            PathBuf::from("/System/Library/Fonts/Geneva.ttf"),
            PathBuf::from("/System/Library/Fonts/Monaco.ttf"),
            PathBuf::from("/System/Library/Fonts/Helvetica.ttc"),
        ],
        "windows" => vec![
            PathBuf::from("C:\\Windows\\Fonts\\arial.ttf"),
            PathBuf::from("C:\\Windows\\Fonts\\verdana.ttf"),
            PathBuf::from("C:\\Windows\\Fonts\\calibri.ttf"),
        ],
        _ => vec![
            PathBuf::from("/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"),
            PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            PathBuf::from("/usr/share/fonts/TTF/DejaVuSans.ttf"),
        ],
    };

    for path in &candidates {
        probe(path);
    }

    println!();
    if download_paper::pdf::font_available() {
        println!("✓ The assembler will find a usable font on this machine");
    } else {
        println!("✗ No usable font found; PDF assembly will fail here");
    }
}

fn probe(path: &PathBuf) {
    println!("\n{}", path.display());
    if !path.exists() {
        println!("  not present");
        return;
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            println!("  unreadable: {}", e);
            return;
        }
    };
    println!("  read {} bytes", bytes.len());

    // rusttype is what the PDF engine parses glyph metrics with, so a
    // failure here predicts a failure at assembly time.
    match rusttype::Font::try_from_vec(bytes.clone()) {
        Some(font) => {
            let metrics = font.v_metrics(rusttype::Scale::uniform(24.0));
            println!(
                "  rusttype ok (ascent {:.1}, descent {:.1})",
                metrics.ascent, metrics.descent
            );
        }
        None => println!("  rusttype failed to parse"),
    }

    match genpdf::fonts::FontData::new(bytes, None) {
        Ok(_) => println!("  genpdf ok"),
        Err(e) => println!("  genpdf failed: {}", e),
    }
}
