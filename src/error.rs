//! Error types for the hwocr library.
//!
//! Every failure the tool can hit maps to one [`HwOcrError`] variant. Each
//! variant carries enough context for the presentation layer to show a useful
//! message without digging into the source error.
//!
//! Two outcomes are deliberately *not* errors: an image on which the OCR
//! service found no text (that is `Ok` with an empty
//! [`crate::pipeline::ocr::RecognizedText`]), and a refinement whose model
//! answer is empty after trimming.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the hwocr library.
#[derive(Debug, Error)]
pub enum HwOcrError {
    // ── Access ────────────────────────────────────────────────────────────
    /// The submitted password did not match the configured one.
    #[error("Access denied: wrong password")]
    AccessDenied,

    // ── Config errors ─────────────────────────────────────────────────────
    /// A required environment variable is absent or empty.
    #[error("Missing configuration: environment variable '{var}' is not set.\n{hint}")]
    MissingConfig { var: &'static str, hint: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Credential errors ─────────────────────────────────────────────────
    /// The credential blob could not be written to a temporary file.
    #[error("Failed to write credential file: {source}")]
    CredentialWrite {
        #[source]
        source: std::io::Error,
    },

    /// The credential blob is not a usable service-account key.
    #[error("Invalid service-account credentials: {detail}")]
    InvalidCredentials { detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Uploaded bytes are not a PNG or JPEG image.
    #[error("Unsupported image '{name}': only png, jpg and jpeg are accepted")]
    UnsupportedImage { name: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// Obtaining an OAuth access token for the OCR service failed.
    #[error("OCR authentication failed: {detail}")]
    OcrAuth { detail: String },

    /// The OCR HTTP request failed before the service could answer.
    #[error("OCR request failed: {detail}")]
    OcrRequest { detail: String },

    /// The OCR service answered with an error of its own.
    #[error("Error from Google Vision API: {message}")]
    OcrService { message: String },

    // ── Refine errors ─────────────────────────────────────────────────────
    /// The generative-text provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The generative-text service returned an error.
    #[error("AI refinement failed: {detail}")]
    RefineFailed { detail: String },

    // ── Shared ────────────────────────────────────────────────────────────
    /// An external call exceeded its configured timeout.
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    /// Could not write a result file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HwOcrError {
    /// Whether the user can reasonably retry the same interaction.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HwOcrError::OcrRequest { .. } | HwOcrError::RefineFailed { .. } | HwOcrError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_names_variable() {
        let e = HwOcrError::MissingConfig {
            var: "GEMINI_API_KEY",
            hint: "Set it to your Gemini key.",
        };
        let msg = e.to_string();
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
        assert!(msg.contains("Gemini key"));
    }

    #[test]
    fn ocr_service_display() {
        let e = HwOcrError::OcrService {
            message: "Bad image data.".into(),
        };
        assert_eq!(e.to_string(), "Error from Google Vision API: Bad image data.");
    }

    #[test]
    fn timeout_display() {
        let e = HwOcrError::Timeout {
            stage: "OCR",
            secs: 60,
        };
        assert_eq!(e.to_string(), "OCR timed out after 60s");
    }

    #[test]
    fn transient_classification() {
        assert!(HwOcrError::Timeout { stage: "OCR", secs: 1 }.is_transient());
        assert!(HwOcrError::RefineFailed { detail: "503".into() }.is_transient());
        assert!(!HwOcrError::AccessDenied.is_transient());
        assert!(!HwOcrError::OcrService { message: "x".into() }.is_transient());
    }
}
