//! Image payload: the uploaded picture, allow-listed to PNG and JPEG.
//!
//! Nothing is decoded. The file name extension and the magic bytes must both
//! say PNG or JPEG; the bytes are then forwarded to the OCR service untouched.

use crate::error::HwOcrError;
use image::ImageFormat;
use std::path::Path;
use tracing::debug;

/// Extensions accepted by the upload form and the CLI.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Image kinds the OCR step accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

/// An uploaded image, owned for the duration of one interaction.
#[derive(Clone)]
pub struct ImagePayload {
    name: String,
    kind: ImageKind,
    bytes: Vec<u8>,
}

impl ImagePayload {
    /// Validate an upload against the allow-list.
    pub fn from_upload(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, HwOcrError> {
        let name = name.into();
        let unsupported = || HwOcrError::UnsupportedImage { name: name.clone() };

        if let Some(ext) = Path::new(&name).extension().and_then(|e| e.to_str()) {
            let ext = ext.to_ascii_lowercase();
            if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                return Err(unsupported());
            }
        }

        let kind = match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => ImageKind::Png,
            Ok(ImageFormat::Jpeg) => ImageKind::Jpeg,
            _ => return Err(unsupported()),
        };

        debug!("Accepted {} ({}, {} bytes)", name, kind.mime_type(), bytes.len());
        Ok(Self { name, kind, bytes })
    }

    /// Read and validate an image file from disk.
    pub async fn from_path(path: &Path) -> Result<Self, HwOcrError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            HwOcrError::Internal(format!("cannot read image {}: {e}", path.display()))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_upload(name, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    pub(crate) const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    #[test]
    fn accepts_png() {
        let img = ImagePayload::from_upload("catatan.png", PNG_MAGIC.to_vec()).unwrap();
        assert_eq!(img.kind(), ImageKind::Png);
        assert_eq!(img.kind().mime_type(), "image/png");
    }

    #[test]
    fn accepts_uppercase_jpeg_extension() {
        let img = ImagePayload::from_upload("SCAN.JPEG", JPEG_MAGIC.to_vec()).unwrap();
        assert_eq!(img.kind(), ImageKind::Jpeg);
    }

    #[test]
    fn rejects_disallowed_extension() {
        let err = ImagePayload::from_upload("scan.gif", PNG_MAGIC.to_vec()).unwrap_err();
        assert!(matches!(err, HwOcrError::UnsupportedImage { name } if name == "scan.gif"));
    }

    #[test]
    fn rejects_mismatched_content() {
        assert!(ImagePayload::from_upload("scan.png", b"%PDF-1.7".to_vec()).is_err());
        assert!(ImagePayload::from_upload("scan.png", Vec::new()).is_err());
    }

    #[test]
    fn name_without_extension_is_sniffed() {
        let img = ImagePayload::from_upload("upload", JPEG_MAGIC.to_vec()).unwrap();
        assert_eq!(img.kind(), ImageKind::Jpeg);
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("halaman.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();
        let img = ImagePayload::from_path(&path).await.unwrap();
        assert_eq!(img.name(), "halaman.png");
        assert_eq!(img.len(), PNG_MAGIC.len());
    }
}
