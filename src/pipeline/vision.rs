//! Google Cloud Vision client for `DOCUMENT_TEXT_DETECTION`.
//!
//! Talks to the REST `images:annotate` endpoint directly with `reqwest`.
//! Authentication follows the service-account flow: an RS256-signed JWT
//! assertion is exchanged at the key's `token_uri` for a bearer token, which
//! is cached until shortly before it expires.
//!
//! Build one [`VisionClient`] at startup and share it; the HTTP connection
//! pool and the token cache both live inside it.

use crate::config::AppConfig;
use crate::credentials::ServiceAccountKey;
use crate::error::HwOcrError;
use crate::pipeline::image::ImagePayload;
use crate::pipeline::ocr::{OcrService, RecognizedText};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: u64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnnotateRequest<'a> {
    requests: [AnnotateImageRequest<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: [Feature; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext<'a>>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext<'a> {
    language_hints: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    TOKEN_LIFETIME_SECS
}

/// Build the JSON body for one `DOCUMENT_TEXT_DETECTION` request.
fn build_request_body(image: &[u8], language_hints: &[String]) -> Result<String, HwOcrError> {
    let body = AnnotateRequest {
        requests: [AnnotateImageRequest {
            image: ImageContent {
                content: STANDARD.encode(image),
            },
            features: [Feature {
                kind: "DOCUMENT_TEXT_DETECTION",
            }],
            image_context: (!language_hints.is_empty()).then_some(ImageContext { language_hints }),
        }],
    };
    serde_json::to_string(&body).map_err(|e| HwOcrError::Internal(format!("encode request: {e}")))
}

/// Extract the full-document text from an `images:annotate` response body.
fn parse_annotate_response(body: &str) -> Result<RecognizedText, HwOcrError> {
    let parsed: AnnotateResponse = serde_json::from_str(body).map_err(|e| HwOcrError::OcrRequest {
        detail: format!("unexpected response body: {e}"),
    })?;

    let Some(first) = parsed.responses.into_iter().next() else {
        return Ok(RecognizedText::default());
    };

    if let Some(status) = first.error {
        if !status.message.is_empty() {
            return Err(HwOcrError::OcrService {
                message: status.message,
            });
        }
    }

    Ok(first
        .full_text_annotation
        .map(|a| RecognizedText::new(a.text))
        .unwrap_or_default())
}

/// Best-effort message from a non-2xx Google API response.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"))
}

// ── Token source ─────────────────────────────────────────────────────────

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN
    }
}

fn unix_now() -> Result<u64, HwOcrError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| HwOcrError::Internal(format!("system clock before 1970: {e}")))
}

/// Sign the JWT assertion exchanged for an access token.
fn sign_assertion(key: &ServiceAccountKey, now: u64) -> Result<String, HwOcrError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let claims = Claims {
        iss: &key.client_email,
        scope: VISION_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
        HwOcrError::InvalidCredentials {
            detail: format!("private_key: {e}"),
        }
    })?;

    jsonwebtoken::encode(&header, &claims, &encoding_key).map_err(|e| HwOcrError::OcrAuth {
        detail: format!("signing assertion: {e}"),
    })
}

// ── Client ───────────────────────────────────────────────────────────────

/// Long-lived Vision API client.
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    language_hints: Vec<String>,
    timeout_secs: u64,
    key: ServiceAccountKey,
    token: Mutex<Option<CachedToken>>,
}

impl VisionClient {
    /// Create a client authenticating with `key`.
    pub fn new(key: ServiceAccountKey, config: &AppConfig) -> Result<Self, HwOcrError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build()
            .map_err(|e| HwOcrError::Internal(format!("HTTP client: {e}")))?;

        info!(
            "Vision client ready for {} ({} language hints)",
            key.client_email,
            config.language_hints.len()
        );

        Ok(Self {
            http,
            endpoint: config.vision_endpoint.clone(),
            language_hints: config.language_hints.clone(),
            timeout_secs: config.ocr_timeout_secs,
            key,
            token: Mutex::new(None),
        })
    }

    /// Create a client from a key file such as the one [`crate::credentials::provision`] writes.
    pub fn from_credentials_file(path: &Path, config: &AppConfig) -> Result<Self, HwOcrError> {
        Self::new(ServiceAccountKey::from_file(path)?, config)
    }

    /// Return a cached bearer token, minting a new one when it is about to expire.
    async fn access_token(&self) -> Result<String, HwOcrError> {
        let mut guard = self.token.lock().await;
        if let Some(ref cached) = *guard {
            if cached.is_fresh() {
                return Ok(cached.value.clone());
            }
        }

        let assertion = sign_assertion(&self.key, unix_now()?)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| HwOcrError::OcrAuth {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| HwOcrError::OcrAuth {
            detail: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(HwOcrError::OcrAuth {
                detail: format!("token endpoint returned HTTP {status}: {body}"),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| HwOcrError::OcrAuth {
            detail: format!("token response: {e}"),
        })?;
        debug!("Minted access token valid for {}s", token.expires_in);

        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl OcrService for VisionClient {
    async fn detect_document_text(&self, image: &ImagePayload) -> Result<RecognizedText, HwOcrError> {
        let token = self.access_token().await?;
        let body = build_request_body(image.bytes(), &self.language_hints)?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HwOcrError::Timeout {
                        stage: "OCR",
                        secs: self.timeout_secs,
                    }
                } else {
                    HwOcrError::OcrRequest {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| HwOcrError::OcrRequest {
            detail: e.to_string(),
        })?;

        match status {
            s if s.is_success() => parse_annotate_response(&text),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                // A revoked or rotated key: force a fresh token next time.
                self.token.lock().await.take();
                Err(HwOcrError::OcrAuth {
                    detail: error_message(status, &text),
                })
            }
            _ => Err(HwOcrError::OcrRequest {
                detail: error_message(status, &text),
            }),
        }
    }
}

impl std::fmt::Debug for VisionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionClient")
            .field("endpoint", &self.endpoint)
            .field("language_hints", &self.language_hints)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn request_body_shape() {
        let body = build_request_body(b"abc", &[]).unwrap();
        let v: Value = serde_json::from_str(&body).unwrap();
        let req = &v["requests"][0];
        assert_eq!(req["image"]["content"], "YWJj");
        assert_eq!(req["features"][0]["type"], "DOCUMENT_TEXT_DETECTION");
        assert!(req.get("imageContext").is_none());
    }

    #[test]
    fn request_body_carries_language_hints() {
        let hints = vec!["id".to_string(), "en".to_string()];
        let body = build_request_body(b"abc", &hints).unwrap();
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            v["requests"][0]["imageContext"]["languageHints"],
            serde_json::json!(["id", "en"])
        );
    }

    #[test]
    fn parses_full_text() {
        let body = r#"{"responses":[{"fullTextAnnotation":{"text":"Soal 1\nJawab"}}]}"#;
        assert_eq!(parse_annotate_response(body).unwrap().as_str(), "Soal 1\nJawab");
    }

    #[test]
    fn missing_annotation_is_empty_text() {
        let text = parse_annotate_response(r#"{"responses":[{}]}"#).unwrap();
        assert!(text.is_empty());
        assert!(parse_annotate_response(r#"{"responses":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn service_error_is_reported() {
        let body = r#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#;
        match parse_annotate_response(body) {
            Err(HwOcrError::OcrService { message }) => assert_eq!(message, "Bad image data."),
            other => panic!("expected OcrService, got {other:?}"),
        }
    }

    #[test]
    fn empty_error_message_is_ignored() {
        let body = r#"{"responses":[{"error":{"message":""},"fullTextAnnotation":{"text":"ok"}}]}"#;
        assert_eq!(parse_annotate_response(body).unwrap().as_str(), "ok");
    }

    #[test]
    fn error_message_prefers_google_envelope() {
        let body = r#"{"error":{"code":403,"message":"API not enabled","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(StatusCode::FORBIDDEN, body), "API not enabled");
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>"),
            "HTTP 502 Bad Gateway"
        );
    }

    #[test]
    fn truncated_pem_cannot_sign() {
        let key = ServiceAccountKey::from_json(crate::credentials::tests::SAMPLE_KEY).unwrap();
        assert!(sign_assertion(&key, 1_700_000_000).is_err());
    }
}
