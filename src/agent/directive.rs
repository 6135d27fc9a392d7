//! Extraction of the `[CALL_DOCTOR]` directive from model replies.
//!
//! The model is instructed to request a doctor consultation by embedding
//! `[CALL_DOCTOR]{...json...}` in otherwise free-form text, followed by the
//! message meant for the user. Nothing guarantees the JSON is valid, so the
//! result is a three-way outcome the caller must handle explicitly.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::tools::Urgency;

/// Marker the model emits in front of the directive object.
pub const CALL_DOCTOR_MARKER: &str = "[CALL_DOCTOR]";

/// A closing brace followed by stray periods or quotes at the end of a candidate.
static TRAILING_JUNK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\}[."]+\s*$"#).expect("trailing junk pattern is valid")
});

/// A structured doctor-consultation request parsed out of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDirective {
    pub action: String,
    pub reason: String,
    pub urgency: Urgency,
    pub consultation_type: String,
}

/// Why a directive marker could not be turned into a `ToolDirective`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    MissingOpeningBrace,
    MissingClosingBrace,
    InvalidJson(String),
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingOpeningBrace => write!(f, "no '{{' after the marker"),
            Self::MissingClosingBrace => write!(f, "no '}}' after the opening brace"),
            Self::InvalidJson(e) => write!(f, "invalid directive JSON: {e}"),
        }
    }
}

/// Result of scanning a reply for a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveOutcome {
    /// No marker; the text is shown as-is.
    NoDirective { text: String },
    /// A well-formed directive; `message` is the part meant for the user.
    Directive {
        directive: ToolDirective,
        message: String,
    },
    /// A marker was present but could not be parsed; the whole original
    /// text is shown unmodified.
    MalformedDirective {
        raw_text: String,
        reason: MalformedReason,
    },
}

impl DirectiveOutcome {
    /// The text to show the user.
    pub fn visible_text(&self) -> &str {
        match self {
            Self::NoDirective { text } => text,
            Self::Directive { message, .. } => message,
            Self::MalformedDirective { raw_text, .. } => raw_text,
        }
    }

    pub fn directive(&self) -> Option<&ToolDirective> {
        match self {
            Self::Directive { directive, .. } => Some(directive),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDirective {
    #[serde(default)]
    action: Option<String>,
    reason: String,
    #[serde(default)]
    urgency: Option<String>,
    #[serde(default)]
    consultation_type: Option<String>,
}

/// Scan `response_text` for a `[CALL_DOCTOR]` directive.
///
/// Only the first marker is considered. The candidate object runs from the
/// first `{` after the marker to the first `}` after that, inclusive. Stray
/// `.`/`"` right after the brace belong to the directive span: they are fed to
/// the repairs and never shown.
pub fn extract_directive(response_text: &str) -> DirectiveOutcome {
    let Some(marker_at) = response_text.find(CALL_DOCTOR_MARKER) else {
        return DirectiveOutcome::NoDirective {
            text: response_text.to_string(),
        };
    };
    let malformed = |reason| DirectiveOutcome::MalformedDirective {
        raw_text: response_text.to_string(),
        reason,
    };

    let after_marker = marker_at + CALL_DOCTOR_MARKER.len();
    let Some(open) = response_text[after_marker..]
        .find('{')
        .map(|i| after_marker + i)
    else {
        return malformed(MalformedReason::MissingOpeningBrace);
    };
    let Some(close) = response_text[open..].find('}').map(|i| open + i) else {
        return malformed(MalformedReason::MissingClosingBrace);
    };

    let rest = &response_text[close + 1..];
    let residue_end = close + 1 + (rest.len() - rest.trim_start_matches(['.', '"']).len());

    let raw = match parse_candidate(
        &response_text[open..=close],
        &response_text[open..residue_end],
    ) {
        Ok(raw) => raw,
        Err(e) => return malformed(MalformedReason::InvalidJson(e.to_string())),
    };

    let urgency = match raw.urgency.as_deref() {
        None => Urgency::Normal,
        Some(value) => value.parse::<Urgency>().unwrap_or_else(|_| {
            tracing::debug!(urgency = %value, "Unrecognized directive urgency, using normal");
            Urgency::Normal
        }),
    };
    let directive = ToolDirective {
        action: raw.action.unwrap_or_default(),
        reason: raw.reason,
        urgency,
        consultation_type: raw.consultation_type.unwrap_or_default(),
    };

    let mut message = response_text[residue_end..].trim().to_string();
    if message.is_empty() {
        message = response_text[..marker_at].trim().to_string();
    }

    DirectiveOutcome::Directive { directive, message }
}

/// Parse the candidate as-is, and only if that fails retry with the repaired
/// span (the candidate plus any trailing residue).
fn parse_candidate(candidate: &str, span: &str) -> Result<RawDirective, serde_json::Error> {
    match serde_json::from_str(candidate) {
        Ok(raw) => Ok(raw),
        Err(original) => {
            let repaired = sanitize_candidate(span);
            if repaired == candidate {
                return Err(original);
            }
            serde_json::from_str(&repaired)
        }
    }
}

/// Textual repairs for generator quirks around the directive object:
/// doubled quotes collapse to one, and stray `.`/`"` after the closing
/// brace are dropped.
pub fn sanitize_candidate(candidate: &str) -> String {
    let collapsed = candidate.replace("\"\"", "\"");
    TRAILING_JUNK.replace(&collapsed, "}").into_owned()
}
