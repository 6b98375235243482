//! Shortcut launching via the `shortcuts://` URL scheme
//!
//! Builds the URL the host opens to start a named automation, in one of
//! three forms: x-callback-url (the shortcut reports back to the local
//! callback server), text input (payload handed to the shortcut, no
//! callback), or fire-and-forget.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::exec::{exec_async, ExecError};
use crate::server::CallbackServer;

/// Outcome of a shortcut run, as reported by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortcutStatus {
    Success,
    Error,
    Cancel,
}

impl ShortcutStatus {
    pub const ALL: [ShortcutStatus; 3] = [
        ShortcutStatus::Success,
        ShortcutStatus::Error,
        ShortcutStatus::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShortcutStatus::Success => "success",
            ShortcutStatus::Error => "error",
            ShortcutStatus::Cancel => "cancel",
        }
    }

    /// Parse a reported status value. Anything else is an unknown status,
    /// handled by the dispatcher's fallback branch.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(ShortcutStatus::Success),
            "error" => Some(ShortcutStatus::Error),
            "cancel" => Some(ShortcutStatus::Cancel),
            _ => None,
        }
    }
}

impl fmt::Display for ShortcutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Shortcut<'a> {
    /// Percent-encoded shortcut name.
    name: String,
    server: Option<&'a CallbackServer>,
    input: Option<String>,
}

impl<'a> Shortcut<'a> {
    pub fn new(name: &str, server: Option<&'a CallbackServer>, input: Option<String>) -> Self {
        Self {
            name: urlencoding::encode(name).into_owned(),
            server,
            input,
        }
    }

    /// Open the shortcut in the background, without raising the Shortcuts
    /// app. Only the launch is bounded by `timeout`; the shortcut run
    /// itself proceeds independently.
    pub async fn run(&self, timeout: Duration) -> Result<(), ExecError> {
        exec_async(&format!("open -gj {}", self.url()), &[], timeout).await
    }

    /// The `shortcuts://` URL, with `?` and `&` escaped for the shell.
    ///
    /// When a live callback server is available and no text input was
    /// given, the x-callback-url form embeds one success/error/cancel
    /// sub-URL each, every branch carrying its own freshly issued token.
    pub fn url(&self) -> String {
        let callback_server = if self.input.is_none() { self.server } else { None };

        let mut url = String::from("shortcuts://");
        if callback_server.is_some() {
            url.push_str("x-callback-url/");
        }
        url.push_str("run-shortcut\\?name=");
        url.push_str(&self.name);
        if let Some(server) = callback_server {
            for status in ShortcutStatus::ALL {
                url.push_str("\\&");
                url.push_str(&self.callback_param(server, status));
            }
        }
        if let Some(input) = self.input.as_deref().filter(|i| !i.trim().is_empty()) {
            url.push_str("\\&input=text\\&text=");
            url.push_str(input);
        }
        url
    }

    /// One `x-<status>` parameter: a quoted sub-URL pointing back at the
    /// callback server, its own query params joined with `%26`.
    fn callback_param(&self, server: &CallbackServer, status: ShortcutStatus) -> String {
        format!(
            "x-{status}=\"{base}?shortcut={name}%26status={status}%26token={token}\"",
            status = status,
            base = server.base_url(),
            name = self.name,
            token = server.issue_token(),
        )
    }
}
