//! Inbound callback query string parsing
//!
//! Parsing never fails: required fields that are absent or blank come out
//! as `None` and are classified by the request validators, not here.

use serde::Serialize;
use url::form_urlencoded;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackSearchParams {
    pub shortcut: Option<String>,
    pub status: Option<String>,
    pub token: Option<String>,
    pub result: Option<String>,
    pub error_message: Option<String>,
}

impl CallbackSearchParams {
    pub fn parse(query: &str) -> Self {
        let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Self {
            shortcut: get_param(&pairs, "shortcut"),
            status: get_param(&pairs, "status"),
            token: get_param(&pairs, "token"),
            result: get_param(&pairs, "result"),
            error_message: get_param(&pairs, "errorMessage"),
        }
    }

    /// All required fields present and non-blank.
    pub fn has_required(&self) -> bool {
        self.shortcut.is_some() && self.status.is_some() && self.token.is_some()
    }
}

/// First occurrence of `key`, trimmed and normalized; blank values are absent.
fn get_param(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| normalize_value(v))
}

/// Trim whitespace and rewrite the four smart-quote characters to a plain
/// apostrophe so the value stays well-formed when interpolated into a
/// shell command line. Empty-after-trim counts as absent.
fn normalize_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        trimmed
            .chars()
            .map(|c| match c {
                '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' => '\'',
                c => c,
            })
            .collect(),
    )
}
