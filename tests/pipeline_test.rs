use std::fs;
use std::io::Cursor;
use std::time::Duration;

use mockito::{Matcher, Server};

use download_paper::config::{build_client, Config, SessionCookies};
use download_paper::downloader::{download_images, page_image_path};
use download_paper::pages::discover_page_urls;
use download_paper::paper_info::PaperInfo;
use download_paper::pdf::{assemble_pdf, font_available};
use download_paper::retry::RetryPolicy;

const INDEX_HTML: &str = r#"
    <html><body>
        <input type="hidden" id="infoname" value="Paper A" />
        <input type="hidden" id="filename" value="paperA" />
        <input type="hidden" id="startpage" value="0" />
        <input type="hidden" id="endpage" value="5" />
        <input type="hidden" id="fid" value="12345" />
    </body></html>
"#;

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut img = image::RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]);
    }

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

// Full run against a mock viewer: metadata, discovery, download, assembly.
#[tokio::test]
async fn test_pipeline_end_to_end() {
    let mut server = Server::new_async().await;
    let base = server.url();

    let root = std::env::temp_dir().join("paper_pipeline_e2e_test");
    let _ = fs::remove_dir_all(&root);
    let work_dir = root.join("temp");
    let output_dir = root.join("out");
    fs::create_dir_all(&output_dir).unwrap();

    let _index = server
        .mock("GET", "/pdfindex1.jsp")
        .match_query(Matcher::UrlEncoded("fid".into(), "12345".into()))
        .with_status(200)
        .with_body(INDEX_HTML)
        .create_async()
        .await;

    let batch = |ids: &[usize]| {
        let list = ids
            .iter()
            .map(|i| format!(r#"{{"id":"{}","src":"{}/img/{}.jpg?f=paperA"}}"#, i, base, i))
            .collect::<Vec<_>>()
            .join(",");
        format!(r#"{{"list":[{}]}}"#, list)
    };
    let _batch0 = server
        .mock("GET", "/jumpServlet")
        .match_query(Matcher::UrlEncoded("page".into(), "0".into()))
        .with_status(200)
        .with_body(batch(&[0, 1, 2]))
        .create_async()
        .await;
    let _batch3 = server
        .mock("GET", "/jumpServlet")
        .match_query(Matcher::UrlEncoded("page".into(), "3".into()))
        .with_status(200)
        .with_body(batch(&[3, 4]))
        .expect(2)
        .create_async()
        .await;

    let mut image_mocks = Vec::new();
    for i in 0..5 {
        let mock = server
            .mock("GET", format!("/img/{}.jpg", i).as_str())
            .match_query(Matcher::Regex("_retry=\\d+".to_string()))
            .with_status(200)
            .with_body(jpeg_bytes(400, 600))
            .expect(1)
            .create_async()
            .await;
        image_mocks.push(mock);
    }

    let config = Config {
        base_url: base.clone(),
        work_dir: work_dir.clone(),
        retry: RetryPolicy::new(5, Duration::ZERO),
        ..Config::default()
    };
    let client = build_client(&config, &SessionCookies::parse("JSESSIONID=e2e")).unwrap();

    let info = PaperInfo::fetch(&client, &config, "12345").await.unwrap();
    let urls = discover_page_urls(&client, &config, &info).await.unwrap();
    assert_eq!(urls.len(), 5);

    let downloaded = download_images(&client, &config, &urls, &work_dir).await.unwrap();
    assert_eq!(downloaded, 5);
    for i in 0..5 {
        assert!(page_image_path(&work_dir, i).exists());
    }
    for mock in &image_mocks {
        mock.assert_async().await;
    }

    let result = assemble_pdf(&info, &work_dir, &output_dir);

    // The image cache is gone no matter how assembly went
    assert!(!work_dir.exists());

    if font_available() {
        let pdf_path = result.unwrap().unwrap();
        assert_eq!(pdf_path, output_dir.join("Paper A_12345.pdf"));
        assert!(pdf_path.exists());
        assert!(fs::metadata(&pdf_path).unwrap().len() > 100);
    } else {
        eprintln!("no usable system font, assembly outcome not checked");
    }

    let _ = fs::remove_dir_all(&root);
}
