// src/server.rs
//
// HTTP service: GET|POST /api/convert plus static file serving.
// Hand-parsed HTTP/1.1 on a tokio TCP listener - one task per connection, no
// shared mutable state between invocations, a hard 10-second deadline around
// acquisition + degradation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::acquire::{self, ImageSource};
use crate::engine::{distort, CodecRegistry};
use crate::error::{JpegmeError, Result};
use crate::job::DistortJob;

/// Wall-clock budget spanning source acquisition plus the full degradation
/// loop. The engine has no internal cancellation; on expiry the in-flight
/// task is abandoned and its result discarded.
pub const CONVERT_DEADLINE: Duration = Duration::from_secs(10);

/// Request head lines larger than this are rejected outright.
const MAX_HEAD_LINE_BYTES: usize = 16 * 1024;

/// Body cap: a 10 MB image as a base64 data URI inside a JSON envelope.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const STATIC_ROOT: &str = "static";

/// POST body envelope, matching the front end's JSON shape.
#[derive(Deserialize)]
struct ConvertRequest {
    #[serde(default)]
    params: DistortJob,
    image: String,
}

struct Request {
    method: String,
    path: String,
    query: String,
    body: Vec<u8>,
}

struct Response {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Response {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into().into_bytes(),
        }
    }

    fn from_error(err: &JpegmeError) -> Self {
        Self::text(err.category().http_status(), err.to_string())
    }
}

/// `0.0.0.0:$PORT`, default port 5000.
pub fn bind_address() -> String {
    let port = std::env::var("PORT")
        .ok()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "5000".to_string());
    format!("0.0.0.0:{port}")
}

/// Bind from the environment and serve forever.
pub async fn run() -> std::io::Result<()> {
    let addr = bind_address();
    let listener = TcpListener::bind(&addr).await?;
    log::info!("starting HTTP server at http://{addr}");
    serve(listener).await
}

/// Accept loop. Split out from [`run`] so tests can bind an ephemeral port.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    let registry = Arc::new(CodecRegistry::builtin());
    loop {
        let (stream, peer) = listener.accept().await?;
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, registry).await {
                log::debug!("connection from {peer} dropped: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    registry: Arc<CodecRegistry>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let response = match read_request(&mut reader).await? {
        Some(request) => handle_request(request, registry).await,
        None => Response::text(400, "malformed request"),
    };

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        status_text(response.status),
        response.content_type,
        response.body.len()
    );
    write_half.write_all(head.as_bytes()).await?;
    write_half.write_all(&response.body).await?;
    write_half.flush().await
}

async fn read_request<R>(reader: &mut R) -> std::io::Result<Option<Request>>
where
    R: AsyncBufReadExt + AsyncReadExt + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(m), Some(t)) => (m.to_string(), t.to_string()),
        _ => return Ok(None),
    };
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target, String::new()),
    };

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).await? == 0 {
            break;
        }
        if header.len() > MAX_HEAD_LINE_BYTES {
            return Ok(None);
        }
        let header = header.trim();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    if content_length > MAX_BODY_BYTES {
        return Ok(None);
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(Some(Request {
        method,
        path,
        query,
        body,
    }))
}

async fn handle_request(request: Request, registry: Arc<CodecRegistry>) -> Response {
    match request.path.as_str() {
        "/api/convert" => handle_convert(request, registry).await,
        _ => serve_static(&request).await,
    }
}

async fn handle_convert(request: Request, registry: Arc<CodecRegistry>) -> Response {
    let parsed = match request.method.as_str() {
        "GET" => parse_convert_query(&request.query),
        "POST" => parse_convert_body(&request.body),
        _ => return Response::text(405, "must send GET or POST request"),
    };

    let (image, job) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => return Response::from_error(&err),
    };

    log::info!(
        "convert: quality={} iterations={} interleave={}",
        job.quality,
        job.iterations,
        job.interleave
    );

    let result = tokio::time::timeout(CONVERT_DEADLINE, convert(image, job, registry)).await;
    match result {
        Ok(Ok(body)) => Response {
            status: 200,
            content_type: "text/plain; charset=utf-8",
            body,
        },
        Ok(Err(err)) => {
            log::warn!("convert failed: {err}");
            Response::from_error(&err)
        }
        Err(_) => {
            let err = JpegmeError::deadline_exceeded(CONVERT_DEADLINE.as_secs());
            log::warn!("convert failed: {err}");
            Response::from_error(&err)
        }
    }
}

/// Acquisition + degradation for one request. The engine call is CPU-bound
/// and runs off the reactor; the deadline wrapper in [`handle_convert`]
/// abandons it wholesale on expiry.
async fn convert(image: String, job: DistortJob, registry: Arc<CodecRegistry>) -> Result<Vec<u8>> {
    let source = ImageSource::classify(&image)?;
    let raster = acquire::resolve_image(source, &registry).await?;
    let output = tokio::task::spawn_blocking(move || {
        let mut out = Vec::new();
        distort(raster, &job, &mut out, &registry)?;
        Ok::<_, JpegmeError>(out)
    })
    .await
    .map_err(|e| JpegmeError::encode_failed("jpeg", format!("engine task failed: {e}")))??;
    Ok(output)
}

fn parse_convert_query(query: &str) -> Result<(String, DistortJob)> {
    let params = parse_query(query);

    let image = params.get("image_url").cloned().unwrap_or_default();
    if image.is_empty() {
        return Err(JpegmeError::invalid_parameter(
            "image_url",
            "",
            "an image URL or data URI is required",
        ));
    }

    let quality = match params.get("quality") {
        None => 50,
        Some(raw) => {
            let value: i64 = raw.parse().map_err(|_| {
                JpegmeError::invalid_parameter("quality", raw.clone(), "must be an integer")
            })?;
            if !(1..=100).contains(&value) {
                return Err(JpegmeError::invalid_parameter(
                    "quality",
                    raw.clone(),
                    "quality must be between 1 and 100 (inclusive)",
                ));
            }
            value as u8
        }
    };

    let iterations = match params.get("iterations") {
        None => 1,
        Some(raw) => {
            let value: i64 = raw.parse().map_err(|_| {
                JpegmeError::invalid_parameter("iterations", raw.clone(), "must be an integer")
            })?;
            if !(1..=10).contains(&value) {
                return Err(JpegmeError::invalid_parameter(
                    "iterations",
                    raw.clone(),
                    "iterations must be between 1 and 10 (inclusive)",
                ));
            }
            value as u32
        }
    };

    let interleave = params
        .get("interleave_gif")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    Ok((
        image,
        DistortJob {
            quality,
            iterations,
            interleave,
        },
    ))
}

fn parse_convert_body(body: &[u8]) -> Result<(String, DistortJob)> {
    let request: ConvertRequest = serde_json::from_slice(body)
        .map_err(|e| JpegmeError::invalid_parameter("body", "<json>", e.to_string()))?;
    request.params.validate()?;
    Ok((request.image, request.params))
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    fn hex(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => match (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

// =============================================================================
// STATIC FILES
// =============================================================================

async fn serve_static(request: &Request) -> Response {
    if request.method != "GET" {
        return Response::text(405, "must send GET request");
    }

    let relative = request.path.trim_start_matches('/');
    let relative = if relative.is_empty() {
        "index.html"
    } else {
        relative
    };

    // No traversal out of the static root.
    if relative.split('/').any(|part| part == "..") {
        return Response::text(404, "not found");
    }

    let path = std::path::Path::new(STATIC_ROOT).join(relative);
    match tokio::fs::read(&path).await {
        Ok(body) => Response {
            status: 200,
            content_type: content_type_for(&path),
            body,
        },
        Err(_) => Response::text(404, "not found"),
    }
}

fn content_type_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}
