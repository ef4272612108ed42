// tests/integration_tests.rs
//
// End-to-end tests through the public surface: the HTTP service bound to an
// ephemeral port, exercised with a real client over the wire.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, GenericImageView, RgbImage};
use jpegme::engine::{CodecRegistry, Format};
use jpegme::server;
use tokio::net::TcpListener;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 30) as u8, (y * 30) as u8, 128])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn png_data_uri(width: u32, height: u32) -> String {
    format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png_bytes(width, height))
    )
}

/// Percent-encode a query value (base64 payloads carry `+` and `/`).
fn query_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

async fn spawn_service() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener));
    format!("http://{addr}")
}

fn decode_service_body(body: &str) -> DynamicImage {
    let jpeg = STANDARD.decode(body.trim()).expect("body is valid base64");
    assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    CodecRegistry::builtin()
        .get(Format::Jpeg)
        .unwrap()
        .decode(&jpeg)
        .expect("body decodes as JPEG")
}

#[tokio::test]
async fn test_post_convert_roundtrip() {
    let base = spawn_service().await;

    let body = serde_json::json!({
        "params": { "quality": 40, "iterations": 2, "interleave_gif": false },
        "image": png_data_uri(2, 2),
    });
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/convert"))
        .header("content-type", "application/json")
        .body(serde_json::to_vec(&body).unwrap())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let text = resp.text().await.unwrap();
    assert_eq!(decode_service_body(&text).dimensions(), (2, 2));
}

#[tokio::test]
async fn test_post_convert_interleaved() {
    let base = spawn_service().await;

    let body = serde_json::json!({
        "params": { "quality": 50, "iterations": 4, "interleave_gif": true },
        "image": png_data_uri(8, 8),
    });
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/convert"))
        .header("content-type", "application/json")
        .body(serde_json::to_vec(&body).unwrap())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let text = resp.text().await.unwrap();
    assert_eq!(decode_service_body(&text).dimensions(), (8, 8));
}

#[tokio::test]
async fn test_get_convert_with_inline_source() {
    let base = spawn_service().await;

    let url = format!(
        "{base}/api/convert?image_url={}&quality=30&iterations=3",
        query_encode(&png_data_uri(4, 4))
    );
    let resp = reqwest::get(&url).await.unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let text = resp.text().await.unwrap();
    assert_eq!(decode_service_body(&text).dimensions(), (4, 4));
}

#[tokio::test]
async fn test_get_convert_applies_defaults() {
    let base = spawn_service().await;

    let url = format!(
        "{base}/api/convert?image_url={}",
        query_encode(&png_data_uri(2, 2))
    );
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn test_convert_rejects_out_of_range_params() {
    let base = spawn_service().await;

    for query in [
        "image_url=x&quality=0",
        "image_url=x&quality=101",
        "image_url=x&iterations=0",
        "image_url=x&iterations=11",
        "image_url=x&quality=abc",
    ] {
        let resp = reqwest::get(format!("{base}/api/convert?{query}"))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "query: {query}");
    }
}

#[tokio::test]
async fn test_convert_rejects_bad_json_body() {
    let base = spawn_service().await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/convert"))
        .body("not json at all")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn test_convert_rejects_unsupported_method() {
    let base = spawn_service().await;

    let resp = reqwest::Client::new()
        .put(format!("{base}/api/convert"))
        .body("")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 405);
}

#[tokio::test]
async fn test_convert_unfetchable_source_is_server_error() {
    let base = spawn_service().await;

    // A bare path is neither a URL nor a data URI
    let resp = reqwest::get(format!("{base}/api/convert?image_url=%2Ftmp%2Fcat.jpg"))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
}

#[tokio::test]
async fn test_static_index_and_missing_file() {
    let base = spawn_service().await;

    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let body = resp.text().await.unwrap();
    assert!(body.contains("/api/convert"));

    let resp = reqwest::get(format!("{base}/missing.css")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
