//! Post-processing: turn the model's Markdown answer into plain prose.
//!
//! Models like to answer with `**bold**` headings and `- ` bullet lists even
//! when asked for plain text. [`strip_markdown`] removes that markup with a
//! handful of regex passes. It is a pure function of its input.
//!
//! ## Rule Order
//!
//! The asterisk rules run from the widest wrapper to the narrowest, then
//! bullets are removed, then the result is trimmed. A bullet `*` is only
//! left alone by rule 3 when no second `*` follows on the same line.

use once_cell::sync::Lazy;
use regex::Regex;

/// Strip Markdown emphasis and list bullets from `input`.
///
/// Rules (applied in order):
/// 1. `***x***` → `x`
/// 2. `**x**` → `x`
/// 3. `*x*` → `x`
/// 4. Leading `-`, `*` or `+` bullet (plus following blanks) removed on every line
/// 5. Outer whitespace trimmed
///
/// Matching is non-greedy and line-local, so nested or unbalanced markup may
/// come out oddly. That is acceptable for OCR clean-up.
pub fn strip_markdown(input: &str) -> String {
    let s = strip_triple_emphasis(input);
    let s = strip_double_emphasis(&s);
    let s = strip_single_emphasis(&s);
    let s = strip_list_bullets(&s);
    s.trim().to_string()
}

// ── Rule 1: ***x*** ──────────────────────────────────────────────────────────

static RE_TRIPLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*\*(.*?)\*\*\*").unwrap());

fn strip_triple_emphasis(input: &str) -> String {
    RE_TRIPLE.replace_all(input, "$1").to_string()
}

// ── Rule 2: **x** ────────────────────────────────────────────────────────────

static RE_DOUBLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

fn strip_double_emphasis(input: &str) -> String {
    RE_DOUBLE.replace_all(input, "$1").to_string()
}

// ── Rule 3: *x* ──────────────────────────────────────────────────────────────

static RE_SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());

fn strip_single_emphasis(input: &str) -> String {
    RE_SINGLE.replace_all(input, "$1").to_string()
}

// ── Rule 4: list bullets ─────────────────────────────────────────────────────

// Blanks only, never `\s`: a bullet must not swallow the line break before it.
static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").unwrap());

fn strip_list_bullets(input: &str) -> String {
    RE_BULLET.replace_all(input, "").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
