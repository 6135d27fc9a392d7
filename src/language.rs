//! Language identification for user messages.

/// Identifies the language of a piece of text.
pub trait LanguageDetector: Send + Sync {
    /// Best-guess language code, or `None` when the text gives no signal.
    fn detect(&self, text: &str) -> Option<String>;
}

/// Detector backed by `whatlang`, reporting ISO 639-1 codes where known.
///
/// Guesses whatlang itself marks unreliable are discarded; short phrases
/// like "How to sleep better" otherwise come back as Norwegian or Danish.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let info = whatlang::detect(text)?;
        if !info.is_reliable() {
            tracing::debug!(
                guess = info.lang().code(),
                confidence = info.confidence(),
                "Unreliable language guess"
            );
            return None;
        }
        let code = info.lang().code();
        Some(iso_639_1(code).unwrap_or(code).to_string())
    }
}

/// Detect the language of `text`, falling back to `default`.
pub fn detect_language(detector: &dyn LanguageDetector, text: &str, default: &str) -> String {
    if text.trim().is_empty() {
        return default.to_string();
    }
    match detector.detect(text) {
        Some(code) => code,
        None => {
            tracing::debug!(default, "Language detection gave no result");
            default.to_string()
        }
    }
}

fn iso_639_1(code: &str) -> Option<&'static str> {
    let mapped = match code {
        "eng" => "en",
        "spa" => "es",
        "fra" => "fr",
        "deu" => "de",
        "ita" => "it",
        "por" => "pt",
        "nld" => "nl",
        "rus" => "ru",
        "ukr" => "uk",
        "pol" => "pl",
        "tur" => "tr",
        "ara" => "ar",
        "heb" => "he",
        "hin" => "hi",
        "ben" => "bn",
        "urd" => "ur",
        "pan" => "pa",
        "tam" => "ta",
        "tel" => "te",
        "mar" => "mr",
        "guj" => "gu",
        "cmn" => "zh",
        "jpn" => "ja",
        "kor" => "ko",
        "vie" => "vi",
        "tha" => "th",
        "ind" => "id",
        "swe" => "sv",
        "dan" => "da",
        "nob" => "no",
        "fin" => "fi",
        "ell" => "el",
        "ces" => "cs",
        "ron" => "ro",
        "hun" => "hu",
        "pes" => "fa",
        _ => return None,
    };
    Some(mapped)
}
