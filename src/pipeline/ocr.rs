//! OCR invoker: send an image to a document-text-detection service.
//!
//! A service-reported failure is an `Err`, and an image without text is
//! `Ok` with an empty [`RecognizedText`]. Callers can always tell the two
//! apart.

use crate::error::HwOcrError;
use crate::pipeline::image::ImagePayload;
use async_trait::async_trait;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Text recognised on one image. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedText(String);

impl RecognizedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// `true` when the service found nothing but whitespace.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for RecognizedText {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A document-text-detection backend.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Run full-document (paragraph-aware) text detection on `image`.
    async fn detect_document_text(&self, image: &ImagePayload) -> Result<RecognizedText, HwOcrError>;
}

/// Recognise the text on `image`, bounded by `timeout_secs`.
pub async fn recognize(
    service: &dyn OcrService,
    image: &ImagePayload,
    timeout_secs: u64,
) -> Result<RecognizedText, HwOcrError> {
    let start = Instant::now();
    info!("Running OCR on {} ({} bytes)", image.name(), image.len());

    let result = timeout(
        Duration::from_secs(timeout_secs),
        service.detect_document_text(image),
    )
    .await
    .map_err(|_| HwOcrError::Timeout {
        stage: "OCR",
        secs: timeout_secs,
    })?;

    match &result {
        Ok(text) => debug!(
            "OCR returned {} chars in {:?}",
            text.as_str().chars().count(),
            start.elapsed()
        ),
        Err(e) => warn!("OCR failed after {:?}: {}", start.elapsed(), e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::image::tests::PNG_MAGIC;

    struct Fixed(Result<&'static str, &'static str>);

    #[async_trait]
    impl OcrService for Fixed {
        async fn detect_document_text(&self, _: &ImagePayload) -> Result<RecognizedText, HwOcrError> {
            self.0
                .map(RecognizedText::new)
                .map_err(|m| HwOcrError::OcrService { message: m.into() })
        }
    }

    struct Hangs;

    #[async_trait]
    impl OcrService for Hangs {
        async fn detect_document_text(&self, _: &ImagePayload) -> Result<RecognizedText, HwOcrError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(RecognizedText::default())
        }
    }

    fn image() -> ImagePayload {
        ImagePayload::from_upload("a.png", PNG_MAGIC.to_vec()).unwrap()
    }

    #[test]
    fn whitespace_only_counts_as_empty() {
        assert!(RecognizedText::new(" \n\t").is_empty());
        assert!(!RecognizedText::new("a").is_empty());
    }

    #[tokio::test]
    async fn empty_result_is_ok() {
        let text = recognize(&Fixed(Ok("")), &image(), 5).await.unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn service_error_is_distinct_from_empty() {
        let err = recognize(&Fixed(Err("Bad image data.")), &image(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, HwOcrError::OcrService { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_service_times_out() {
        let err = recognize(&Hangs, &image(), 2).await.unwrap_err();
        assert!(matches!(err, HwOcrError::Timeout { stage: "OCR", secs: 2 }));
    }
}
