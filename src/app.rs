//! Application context: the long-lived pieces every interaction shares.
//!
//! [`App`] is built once at startup. It owns the configuration, the access
//! gate, the single OCR client and the single text generator, and exposes
//! the interaction-level operations the web form and the CLI call.
//!
//! ```text
//! authorize ─▶ scan ──▶ NoText                      (stop, tell the user)
//!                 └───▶ Text(Session) ─▶ refine ─▶ display(format)
//! ```
//!
//! Every external call is bounded by the configured timeout. Dropping the
//! future of an interaction (e.g. the HTTP client went away) cancels the
//! call that is in flight.

use crate::access::AccessGate;
use crate::config::AppConfig;
use crate::credentials;
use crate::error::HwOcrError;
use crate::pipeline::image::ImagePayload;
use crate::pipeline::ocr::{self, OcrService};
use crate::pipeline::refine::{self, LlmGenerator, TextGenerator};
use crate::pipeline::vision::VisionClient;
use crate::session::{OutputFormat, RefinedVariants, Session};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Message shown when OCR ran fine but found nothing.
pub const NO_TEXT_MESSAGE: &str = "Tidak ada teks terdeteksi.";

/// Result of running OCR on one image.
#[derive(Debug, Clone)]
pub enum Scan {
    /// The service answered and found no text. Refinement is skipped.
    NoText,
    /// Text was found; the session carries it forward.
    Text(Session),
}

impl Scan {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Scan::NoText => None,
            Scan::Text(s) => Some(s),
        }
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            Scan::NoText => None,
            Scan::Text(s) => Some(s),
        }
    }
}

/// Options for [`App::run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run the AI clean-up step after OCR.
    pub refine: bool,
    /// Variant selected for display and download.
    pub format: OutputFormat,
}

/// Shared application state.
pub struct App {
    config: AppConfig,
    gate: AccessGate,
    ocr: Arc<dyn OcrService>,
    generator: Arc<dyn TextGenerator>,
    credentials_path: Option<PathBuf>,
}

impl App {
    /// Build the production app from the process environment.
    pub fn from_env() -> Result<Self, HwOcrError> {
        Self::from_config(AppConfig::from_env()?)
    }

    /// Provision credentials and construct the real service clients.
    ///
    /// Provisioning exports `GOOGLE_APPLICATION_CREDENTIALS`, so call this
    /// before starting any other threads.
    pub fn from_config(config: AppConfig) -> Result<Self, HwOcrError> {
        let path = credentials::provision(Some(&config.credentials_json))?
            .ok_or_else(|| HwOcrError::Internal("credential file was not written".into()))?;
        Self::with_credentials_file(config, path)
    }

    /// Construct the real service clients around an already written key file.
    pub fn with_credentials_file(config: AppConfig, path: PathBuf) -> Result<Self, HwOcrError> {
        let vision = VisionClient::from_credentials_file(&path, &config)?;
        let generator = LlmGenerator::from_config(&config)?;

        let mut app = Self::with_services(config, Arc::new(vision), Arc::new(generator));
        app.credentials_path = Some(path);
        Ok(app)
    }

    /// Assemble an app around caller-supplied services.
    pub fn with_services(
        config: AppConfig,
        ocr: Arc<dyn OcrService>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            gate: AccessGate::new(config.password.clone()),
            config,
            ocr,
            generator,
            credentials_path: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Path of the materialised credential file, if this app wrote one.
    pub fn credentials_path(&self) -> Option<&Path> {
        self.credentials_path.as_deref()
    }

    /// Check the submitted password. Callers stop the interaction on `Err`.
    pub fn authorize(&self, submitted: &str) -> Result<(), HwOcrError> {
        self.gate.check(submitted)
    }

    /// Run OCR on `image`.
    pub async fn scan(&self, image: &ImagePayload) -> Result<Scan, HwOcrError> {
        let text = ocr::recognize(self.ocr.as_ref(), image, self.config.ocr_timeout_secs).await?;
        if text.is_empty() {
            info!("No text detected in {}", image.name());
            return Ok(Scan::NoText);
        }
        Ok(Scan::Text(Session::new(text)))
    }

    /// Refine arbitrary text and derive both display variants.
    pub async fn refine_text(&self, raw_text: &str) -> Result<RefinedVariants, HwOcrError> {
        let refined = refine::refine(
            self.generator.as_ref(),
            raw_text,
            self.config.refine_timeout_secs,
        )
        .await?;
        Ok(RefinedVariants::from_refined(refined))
    }

    /// Refine the session's recognised text in place.
    pub async fn refine(&self, session: &mut Session) -> Result<(), HwOcrError> {
        let variants = self.refine_text(session.recognized().as_str()).await?;
        session.set_variants(variants);
        Ok(())
    }

    /// OCR, then optionally refine, in one call.
    pub async fn run(&self, image: &ImagePayload, options: RunOptions) -> Result<Scan, HwOcrError> {
        let mut scan = self.scan(image).await?;
        if let Scan::Text(ref mut session) = scan {
            session.set_format(options.format);
            if options.refine {
                self.refine(session).await?;
            }
        }
        Ok(scan)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("credentials_path", &self.credentials_path)
            .finish_non_exhaustive()
    }
}
