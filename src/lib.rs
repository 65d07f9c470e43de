//! # hwocr
//!
//! Read handwritten notes from photos with Google Cloud Vision, then
//! optionally tidy the text up with a generative model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! password ─▶ image ─▶ OCR ─┬─▶ "Tidak ada teks terdeteksi."
//!  (gate)    (png/jpg) (Vision) └─▶ text ─▶ refine (LLM) ─▶ plain | markdown
//! ```
//!
//! Both external calls go through traits ([`OcrService`], [`TextGenerator`])
//! so the pipeline runs against mocks in tests. The production
//! implementations are [`VisionClient`] and [`LlmGenerator`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hwocr::{App, ImagePayload, OutputFormat, RunOptions, Scan};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads `password`, GOOGLE_APPLICATION_CREDENTIALS_JSON and GEMINI_API_KEY.
//!     let app = App::from_env()?;
//!     app.authorize("rahasia")?;
//!
//!     let image = ImagePayload::from_path("catatan.jpg".as_ref()).await?;
//!     let options = RunOptions { refine: true, format: OutputFormat::Plain };
//!     match app.run(&image, options).await? {
//!         Scan::NoText => eprintln!("{}", hwocr::NO_TEXT_MESSAGE),
//!         Scan::Text(session) => println!("{}", session.display().unwrap_or_default()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `hwocr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `web`   | on      | Enables [`web`], the axum upload form behind `hwocr serve` |
//!
//! Library-only use:
//! ```toml
//! hwocr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod access;
pub mod app;
pub mod config;
pub mod credentials;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod session;
#[cfg(feature = "web")]
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use access::{authorize, Access, AccessGate};
pub use app::{App, RunOptions, Scan, NO_TEXT_MESSAGE};
pub use config::{AppConfig, AppConfigBuilder};
pub use error::HwOcrError;
pub use pipeline::image::ImagePayload;
pub use pipeline::ocr::{OcrService, RecognizedText};
pub use pipeline::postprocess::strip_markdown;
pub use pipeline::refine::{LlmGenerator, TextGenerator};
pub use pipeline::vision::VisionClient;
pub use session::{Download, OutputFormat, RefinedVariants, Session};
