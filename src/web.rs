//! Browser front end: a password-gated upload form served with `axum`.
//!
//! Every request re-derives its state from the submitted form. The
//! recognised text and the model's Markdown answer travel back to the
//! browser in hidden fields, so switching between plain and Markdown output
//! never calls the model again.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | login + upload form |
//! | `POST /scan` | multipart `password`, `image` → OCR result |
//! | `POST /refine` | `password`, `text` → AI clean-up |
//! | `POST /format` | `password`, `text`, `markdown`, `format` → re-render |
//! | `POST /download` | `password`, `kind`, `text` → `.txt` attachment |
//! | `GET /health` | liveness |
//!
//! Because the form is stateless, the password is echoed back in hidden
//! inputs on every result page. It is visible in the page source and may
//! be kept by the browser cache, so serve the form over HTTPS only and
//! treat the password as a shared access code, not a personal credential.

use crate::app::{App, Scan, NO_TEXT_MESSAGE};
use crate::error::HwOcrError;
use crate::pipeline::image::ImagePayload;
use crate::session::{Download, OutputFormat, RefinedVariants};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Largest accepted request body (phone photos of notes run to several MB).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const TITLE: &str = "OCR Tulisan Tangan dengan Google Cloud Vision API";

/// Build the router with all routes.
pub fn router(app: Arc<App>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "OK" }))
        .route("/scan", post(scan))
        .route("/refine", post(refine))
        .route("/format", post(reformat))
        .route("/download", post(download))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

/// Serve the web form on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, app: Arc<App>) -> Result<(), HwOcrError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| HwOcrError::Internal(format!("Failed to bind {addr}: {e}")))?;
    info!("Web form listening on http://{}", addr);

    axum::serve(listener, router(app))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| HwOcrError::Internal(format!("Server error: {e}")))
}

// ── Errors ───────────────────────────────────────────────────────────────

enum WebError {
    App(HwOcrError),
    BadRequest(String),
}

impl From<HwOcrError> for WebError {
    fn from(e: HwOcrError) -> Self {
        WebError::App(e)
    }
}

fn status_for(e: &HwOcrError) -> StatusCode {
    match e {
        HwOcrError::AccessDenied => StatusCode::UNAUTHORIZED,
        HwOcrError::UnsupportedImage { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        HwOcrError::OcrAuth { .. }
        | HwOcrError::OcrRequest { .. }
        | HwOcrError::OcrService { .. }
        | HwOcrError::RefineFailed { .. } => StatusCode::BAD_GATEWAY,
        HwOcrError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            // Denied: show nothing but the login form again.
            WebError::App(HwOcrError::AccessDenied) => (
                StatusCode::UNAUTHORIZED,
                page(&login_form(Some("Password salah."))),
            )
                .into_response(),
            WebError::App(e) => {
                let body = format!("{}{}", alert("error", &e.to_string()), login_form(None));
                (status_for(&e), page(&body)).into_response()
            }
            WebError::BadRequest(msg) => {
                let body = format!("{}{}", alert("error", &msg), login_form(None));
                (StatusCode::BAD_REQUEST, page(&body)).into_response()
            }
        }
    }
}

// ── Forms ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RefineForm {
    password: String,
    text: String,
    #[serde(default)]
    format: OutputFormat,
}

#[derive(Debug, Deserialize)]
struct FormatForm {
    password: String,
    text: String,
    markdown: String,
    #[serde(default)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DownloadKind {
    Ocr,
    Refined,
}

#[derive(Debug, Deserialize)]
struct DownloadForm {
    password: String,
    kind: DownloadKind,
    text: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index() -> Html<String> {
    page(&login_form(None))
}

async fn scan(State(app): State<Arc<App>>, mut multipart: Multipart) -> Result<Html<String>, WebError> {
    let mut password = String::new();
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(format!("Invalid upload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("password") => {
                password = field
                    .text()
                    .await
                    .map_err(|e| WebError::BadRequest(format!("Invalid upload: {e}")))?;
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| WebError::BadRequest(format!("Invalid upload: {e}")))?;
                if !bytes.is_empty() {
                    upload = Some((file_name, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }

    app.authorize(&password)?;

    let (file_name, bytes) =
        upload.ok_or_else(|| WebError::BadRequest("Pilih gambar terlebih dahulu.".into()))?;
    let image = ImagePayload::from_upload(file_name, bytes)?;
    let scan = app.scan(&image).await?;

    let mut body = image_preview(&image);
    match scan {
        Scan::NoText => body.push_str(&alert("warning", NO_TEXT_MESSAGE)),
        Scan::Text(session) => body.push_str(&ocr_section(&password, session.recognized().as_str())),
    }
    Ok(page(&body))
}

async fn refine(State(app): State<Arc<App>>, Form(form): Form<RefineForm>) -> Result<Html<String>, WebError> {
    app.authorize(&form.password)?;
    if form.text.trim().is_empty() {
        return Err(WebError::BadRequest(NO_TEXT_MESSAGE.into()));
    }

    let variants = app.refine_text(&form.text).await?;
    let body = format!(
        "{}{}",
        ocr_section(&form.password, &form.text),
        refined_section(&form.password, &form.text, &variants, form.format)
    );
    Ok(page(&body))
}

async fn reformat(State(app): State<Arc<App>>, Form(form): Form<FormatForm>) -> Result<Html<String>, WebError> {
    app.authorize(&form.password)?;

    let variants = RefinedVariants::from_refined(form.markdown.trim());
    let body = format!(
        "{}{}",
        ocr_section(&form.password, &form.text),
        refined_section(&form.password, &form.text, &variants, form.format)
    );
    Ok(page(&body))
}

async fn download(State(app): State<Arc<App>>, Form(form): Form<DownloadForm>) -> Result<Response, WebError> {
    app.authorize(&form.password)?;

    let file = match form.kind {
        DownloadKind::Ocr => Download::recognized(form.text),
        DownloadKind::Refined => Download::refined(form.text),
    };
    Ok(attachment(file))
}

fn attachment(file: Download) -> Response {
    (
        [
            (header::CONTENT_TYPE, file.mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        file.body,
    )
        .into_response()
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Escape text for HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="id">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{TITLE}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 860px; margin: 2rem auto; padding: 0 1rem; }}
textarea {{ width: 100%; height: 400px; font-family: ui-monospace, monospace; }}
img.preview {{ max-width: 100%; border: 1px solid #ddd; }}
.alert {{ padding: .75rem 1rem; border-radius: .4rem; margin: 1rem 0; }}
.alert.error {{ background: #fde2e1; }}
.alert.warning {{ background: #fff4d6; }}
form.inline {{ display: inline-block; margin-right: .5rem; }}
</style>
</head>
<body>
<h1>{TITLE}</h1>
{body}
</body>
</html>"#
    ))
}

fn alert(kind: &str, message: &str) -> String {
    format!(
        "<div class=\"alert {kind}\">{}</div>\n",
        escape_html(message)
    )
}

fn hidden(name: &str, value: &str) -> String {
    format!(
        "<input type=\"hidden\" name=\"{name}\" value=\"{}\">",
        escape_html(value)
    )
}

fn login_form(notice: Option<&str>) -> String {
    let mut html = String::new();
    if let Some(msg) = notice {
        html.push_str(&alert("error", msg));
    }
    html.push_str(
        r#"<form method="post" action="/scan" enctype="multipart/form-data">
<p><label>Masukkan password: <input type="password" name="password" required></label></p>
<p><label>Unggah gambar tulisan tangan (png/jpg/jpeg): <input type="file" name="image" accept=".png,.jpg,.jpeg,image/png,image/jpeg" required></label></p>
<p><button type="submit">Proses OCR</button></p>
</form>
"#,
    );
    html
}

fn image_preview(image: &ImagePayload) -> String {
    format!(
        "<figure><img class=\"preview\" alt=\"Gambar Unggahan\" src=\"data:{};base64,{}\"><figcaption>Gambar Unggahan</figcaption></figure>\n",
        image.kind().mime_type(),
        STANDARD.encode(image.bytes())
    )
}

fn download_form(password: &str, kind: &str, text: &str, label: &str) -> String {
    format!(
        "<form class=\"inline\" method=\"post\" action=\"/download\">{}{}{}<button type=\"submit\">{label}</button></form>\n",
        hidden("password", password),
        hidden("kind", kind),
        hidden("text", text),
    )
}

fn ocr_section(password: &str, text: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<h2>Hasil OCR:</h2>\n<textarea readonly aria-label=\"Teks hasil OCR\">{}</textarea>\n",
        escape_html(text)
    );
    html.push_str(&download_form(password, "ocr", text, "💾 Unduh hasil sebagai TXT"));
    let _ = write!(
        html,
        "<form class=\"inline\" method=\"post\" action=\"/refine\">{}{}<button type=\"submit\">✨ Rapikan dengan AI</button></form>\n",
        hidden("password", password),
        hidden("text", text),
    );
    html
}

fn refined_section(password: &str, text: &str, variants: &RefinedVariants, format: OutputFormat) -> String {
    let checked = |f: OutputFormat| if f == format { " checked" } else { "" };
    let shown = variants.select(format);

    let mut html = String::new();
    let _ = write!(
        html,
        "<h2>Hasil Rapi:</h2>\n<form method=\"post\" action=\"/format\">{}{}{}\
<label><input type=\"radio\" name=\"format\" value=\"plain\"{}> Teks biasa</label> \
<label><input type=\"radio\" name=\"format\" value=\"markdown\"{}> Markdown</label> \
<button type=\"submit\">Terapkan</button></form>\n",
        hidden("password", password),
        hidden("text", text),
        hidden("markdown", &variants.markdown),
        checked(OutputFormat::Plain),
        checked(OutputFormat::Markdown),
    );
    let _ = write!(
        html,
        "<textarea readonly aria-label=\"Teks hasil rapi\">{}</textarea>\n",
        escape_html(shown)
    );
    html.push_str(&download_form(password, "refined", shown, "💾 Unduh hasil rapi sebagai TXT"));
    html
}
