//! End-to-end tests for hwocr against the live Google Vision and Gemini APIs.
//!
//! They read the same environment as the binary (`password`,
//! `GOOGLE_APPLICATION_CREDENTIALS_JSON`, `GEMINI_API_KEY`) and are gated
//! behind `E2E_ENABLED` so they never run in CI unless requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! The OCR tests look for a photo at `test_cases/handwriting.jpg`, or at the
//! path in `HWOCR_E2E_IMAGE`.

use hwocr::{App, AppConfig, HwOcrError, ImagePayload, OutputFormat, RunOptions, Scan};
use std::path::PathBuf;
use std::sync::{Once, OnceLock};

// ── Test helpers ─────────────────────────────────────────────────────────────

static LOGGING: Once = Once::new();

fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hwocr=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

static LIVE: OnceLock<(AppConfig, PathBuf)> = OnceLock::new();

/// Read the live config and write the credential file exactly once, so the
/// environment is only modified by the first test that gets here.
fn live_config() -> &'static (AppConfig, PathBuf) {
    LIVE.get_or_init(|| {
        let config = AppConfig::from_env().expect("live configuration should be complete");
        let path = hwocr::credentials::provision(Some(&config.credentials_json))
            .expect("credential file should be written")
            .expect("credential blob is present");
        (config, path)
    })
}

fn live_app(config: AppConfig) -> App {
    let (_, path) = live_config();
    App::with_credentials_file(config, path.clone()).expect("app should build")
}

fn sample_image() -> PathBuf {
    std::env::var("HWOCR_E2E_IMAGE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/handwriting.jpg"))
}

/// Skip this test unless E2E_ENABLED is set; yields the live app.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_logging();
        live_app(live_config().0.clone())
    }};
    ($path:expr) => {{
        let app = e2e_skip_unless_ready!();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test image not found: {}", p.display());
            return;
        }
        (app, p)
    }};
}

// ── Configuration (live env) ─────────────────────────────────────────────────

#[tokio::test]
async fn test_live_config_writes_credential_file() {
    let app = e2e_skip_unless_ready!();

    let path = app.credentials_path().expect("credential file should be written");
    assert!(path.exists(), "{} should exist", path.display());
    assert_eq!(
        std::env::var(hwocr::config::ENV_CREDENTIALS_PATH).ok().as_deref(),
        path.to_str()
    );
}

#[tokio::test]
async fn test_live_wrong_password_is_denied() {
    let app = e2e_skip_unless_ready!();
    let wrong = format!("{}-salah", app.config().password);
    assert!(matches!(app.authorize(&wrong), Err(HwOcrError::AccessDenied)));
}

// ── OCR (needs Google Vision) ────────────────────────────────────────────────

#[tokio::test]
async fn test_live_ocr_reads_handwriting() {
    let (app, path) = e2e_skip_unless_ready!(sample_image());

    let image = ImagePayload::from_path(&path).await.expect("sample image should load");
    match app.scan(&image).await.expect("OCR should succeed") {
        Scan::NoText => panic!("expected text in {}", path.display()),
        Scan::Text(session) => {
            let text = session.recognized().as_str();
            assert!(!text.trim().is_empty());
            println!("OCR ✓  {} chars\n{text}", text.chars().count());
        }
    }
}

#[tokio::test]
async fn test_live_ocr_then_refine_plain() {
    let (app, path) = e2e_skip_unless_ready!(sample_image());

    let image = ImagePayload::from_path(&path).await.expect("sample image should load");
    let options = RunOptions {
        refine: true,
        format: OutputFormat::Plain,
    };
    let Scan::Text(session) = app.run(&image, options).await.expect("pipeline should succeed") else {
        panic!("expected text in {}", path.display());
    };

    let plain = session.display().expect("refined text should be present");
    assert!(!plain.is_empty());
    assert!(!plain.contains("**"), "plain variant still has bold markers: {plain}");
    println!("Refined ✓\n{plain}");
}

// ── Refinement only (needs Gemini) ───────────────────────────────────────────

#[tokio::test]
async fn test_live_refine_keeps_numbering() {
    let app = e2e_skip_unless_ready!();

    let raw = "S0al 1. Hitung\nlah 12 + 30\nSoal 2. Sebutkan ibu k0ta Indonesia";
    let variants = app.refine_text(raw).await.expect("refine should succeed");

    assert!(variants.markdown.contains('1'), "numbering lost: {}", variants.markdown);
    assert!(variants.markdown.contains('2'), "numbering lost: {}", variants.markdown);
    assert_eq!(variants.plain, hwocr::strip_markdown(&variants.markdown));
}

#[tokio::test]
async fn test_live_bad_model_fails_cleanly() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }
    init_logging();

    let mut config = live_config().0.clone();
    config.model = "definitely-not-a-model".into();
    let app = live_app(config);

    let result = app.refine_text("Soal 1").await;
    assert!(result.is_err(), "unknown model should not produce text");
}
