//! Pipeline stages for handwriting OCR and AI clean-up.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! image ──▶ ocr/vision ──▶ refine ──▶ postprocess
//! (allow-list) (Vision API)  (LLM)     (strip markdown)
//! ```
//!
//! 1. [`image`]      : accept PNG/JPEG uploads only
//! 2. [`ocr`]        : OCR contract and timeout wrapper
//! 3. [`vision`]     : Google Cloud Vision `DOCUMENT_TEXT_DETECTION` client
//! 4. [`refine`]     : prompt the generative model; the only optional stage
//! 5. [`postprocess`]: deterministic Markdown stripping for the plain variant

pub mod image;
pub mod ocr;
pub mod postprocess;
pub mod refine;
pub mod vision;
