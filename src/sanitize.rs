//! Filename sanitisation: normalise arbitrary user text into a safe stem.
//!
//! The user types the output name free-form in a chat message, so the input
//! is fully untrusted: path separators, control characters, emoji, or nothing
//! at all. `sanitize_name` is total — every input, however adversarial, maps
//! to a non-empty stem containing only letters, digits, space, `_` and `-`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Stem used when the user's input sanitises down to nothing.
pub const FALLBACK_STEM: &str = "converted";

static TRAILING_PDF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9 _-]+").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalise `raw` into a safe filename stem of at most `max_len` characters.
///
/// Steps, in order: trim; strip a trailing case-insensitive `.pdf` the user
/// may have typed; replace every character outside `[A-Za-z0-9 _-]` with `_`;
/// collapse whitespace runs to single spaces; fall back to
/// [`FALLBACK_STEM`] if nothing is left; truncate to `max_len`.
pub fn sanitize_name(raw: &str, max_len: usize) -> String {
    let name = raw.trim();
    if name.is_empty() {
        return FALLBACK_STEM.to_string();
    }

    let name = TRAILING_PDF.replace(name, "");
    let name = UNSAFE_CHARS.replace_all(&name, "_");
    let name = WHITESPACE_RUN.replace_all(&name, " ");
    let name = name.trim();

    if name.is_empty() {
        return FALLBACK_STEM.to_string();
    }

    name.chars().take(max_len).collect()
}
