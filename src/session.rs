//! Per-interaction state: what was recognised, what the model made of it,
//! and which variant the user wants to see.
//!
//! Nothing here is persisted. A web request or a CLI run builds a
//! [`Session`], renders from it, and drops it.

use crate::pipeline::ocr::RecognizedText;
use crate::pipeline::postprocess::strip_markdown;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// File name offered for the raw OCR text.
pub const OCR_FILE_NAME: &str = "hasil_ocr.txt";
/// File name offered for the refined text.
pub const REFINED_FILE_NAME: &str = "hasil_rapi.txt";
pub const TEXT_MIME: &str = "text/plain; charset=utf-8";

/// How the refined text is displayed and downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown stripped. (default)
    #[default]
    Plain,
    /// The model's answer as-is.
    Markdown,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "txt" | "text" => Ok(OutputFormat::Plain),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown format '{other}' (expected plain or markdown)")),
        }
    }
}

/// Both renderings of one refined answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinedVariants {
    pub markdown: String,
    pub plain: String,
}

impl RefinedVariants {
    /// Derive the plain variant from the model's (trimmed) answer.
    pub fn from_refined(markdown: impl Into<String>) -> Self {
        let markdown = markdown.into();
        let plain = strip_markdown(&markdown);
        Self { markdown, plain }
    }

    pub fn select(&self, format: OutputFormat) -> &str {
        match format {
            OutputFormat::Plain => &self.plain,
            OutputFormat::Markdown => &self.markdown,
        }
    }
}

/// A file offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub body: String,
}

impl Download {
    pub fn recognized(text: impl Into<String>) -> Self {
        Self {
            file_name: OCR_FILE_NAME,
            mime: TEXT_MIME,
            body: text.into(),
        }
    }

    pub fn refined(text: impl Into<String>) -> Self {
        Self {
            file_name: REFINED_FILE_NAME,
            mime: TEXT_MIME,
            body: text.into(),
        }
    }
}

/// State of one interaction after OCR found text.
#[derive(Debug, Clone)]
pub struct Session {
    recognized: RecognizedText,
    refined: Option<RefinedVariants>,
    format: OutputFormat,
}

impl Session {
    pub fn new(recognized: RecognizedText) -> Self {
        Self {
            recognized,
            refined: None,
            format: OutputFormat::default(),
        }
    }

    pub fn recognized(&self) -> &RecognizedText {
        &self.recognized
    }

    pub fn refined(&self) -> Option<&RefinedVariants> {
        self.refined.as_ref()
    }

    pub fn set_refined(&mut self, markdown: impl Into<String>) {
        self.set_variants(RefinedVariants::from_refined(markdown));
    }

    /// Store variants that were already derived, e.g. by [`crate::App::refine_text`].
    pub fn set_variants(&mut self, variants: RefinedVariants) {
        self.refined = Some(variants);
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    /// The refined text in the selected format, once refinement has run.
    pub fn display(&self) -> Option<&str> {
        self.refined.as_ref().map(|r| r.select(self.format))
    }

    pub fn recognized_download(&self) -> Download {
        Download::recognized(self.recognized.as_str())
    }

    pub fn refined_download(&self) -> Option<Download> {
        self.display().map(Download::refined)
    }
}
