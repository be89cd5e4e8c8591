//! Text normalisation: deterministic cleanup of raw page text.
//!
//! pdfium and the OCR fallback both produce text with artefacts that have
//! nothing to do with the booklet's content: Windows line endings, zero-width
//! characters from copy-protected fonts, form feeds between pages, and phone
//! numbers whose hyphens were typeset with surrounding spaces. The rules here
//! fix those quirks without touching anything the address grammar relies on
//! (full-width spaces, dash glyphs and digits are left as they are).
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule can work line by
//! line; blank-line collapsing runs last because earlier rules may empty a
//! line.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to raw page text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Drop control characters other than newline and tab
/// 4. Rejoin space-padded phone numbers (`03 - 1234 - 5678`)
/// 5. Trim trailing whitespace per line
/// 6. Collapse 3+ consecutive blank lines down to one
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = remove_control_chars(&s);
    let s = rejoin_phone_numbers(&s);
    let s = trim_trailing_whitespace(&s);
    collapse_blank_lines(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Drop control characters ──────────────────────────────────────────

fn remove_control_chars(input: &str) -> String {
    input
        .chars()
        .map(|c| if c == '\u{000C}' { '\n' } else { c })
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

// ── Rule 4: Rejoin space-padded phone numbers ────────────────────────────────

static RE_PADDED_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2,4})[ \t]*[-－][ \t]*(\d{2,4})[ \t]*[-－][ \t]*(\d{4})").unwrap()
});

fn rejoin_phone_numbers(input: &str) -> String {
    RE_PADDED_PHONE.replace_all(input, "$1-$2-$3").to_string()
}

// ── Rule 5: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

/// Number of non-whitespace characters, the measure used to compare text
/// candidates.
pub fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

// ── Tests ────────────────────────────────────────────────────────────────────
