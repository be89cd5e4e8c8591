//! Prompts for the vision-model OCR fallback.
//!
//! Kept in one place so prompt changes never touch retry or selection logic,
//! and so tests can inspect them without a real model.

/// System prompt for transcribing a rasterised booklet page.
///
/// The output is fed to the same layout classifier as embedded PDF text, so
/// the model is asked for plain lines, not Markdown.
pub const OCR_SYSTEM_PROMPT: &str = r#"You are a precise OCR engine. Transcribe the text in the page image exactly as printed.

Rules:
1. Output plain text only. No Markdown, no code fences, no commentary.
2. Keep the reading order. Put each table row or list entry on its own line.
3. Separate table columns with two spaces.
4. Keep prefecture headings (東京都, 大阪府, ...) on their own line.
5. Copy addresses, postal codes (〒123-4567) and phone numbers (03-1234-5678) character for character, including hyphens.
6. Do not translate, summarise, or correct the text.
7. If the page has no text, output nothing."#;

/// Human-readable language names for `+`-separated language codes
/// (`"jpn+eng"` → `"Japanese, English"`).
pub fn language_names(hint: &str) -> String {
    hint.split('+')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| match code {
            "jpn" | "ja" => "Japanese",
            "jpn_vert" => "Japanese (vertical)",
            "eng" | "en" => "English",
            "chi_sim" => "Simplified Chinese",
            "chi_tra" => "Traditional Chinese",
            "kor" | "ko" => "Korean",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// System prompt with the language hint appended.
pub fn ocr_prompt(language_hint: &str) -> String {
    let languages = language_names(language_hint);
    if languages.is_empty() {
        OCR_SYSTEM_PROMPT.to_string()
    } else {
        format!("{OCR_SYSTEM_PROMPT}\n\nThe page is written in: {languages}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_hint_is_expanded() {
        assert_eq!(language_names("jpn+eng"), "Japanese, English");
        assert_eq!(language_names("jpn"), "Japanese");
        assert_eq!(language_names("tha"), "tha");
        assert_eq!(language_names(""), "");
    }

    #[test]
    fn prompt_carries_language_line() {
        let p = ocr_prompt("jpn+eng");
        assert!(p.starts_with(OCR_SYSTEM_PROMPT));
        assert!(p.ends_with("The page is written in: Japanese, English."));
        assert_eq!(ocr_prompt(""), OCR_SYSTEM_PROMPT);
    }

    #[test]
    fn prompt_asks_for_plain_text() {
        assert!(OCR_SYSTEM_PROMPT.contains("plain text"));
        assert!(OCR_SYSTEM_PROMPT.contains("phone numbers"));
    }
}
