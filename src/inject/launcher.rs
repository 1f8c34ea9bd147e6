//! Opening web addresses and launching applications.
//!
//! [`OpenTarget::resolve`] decides what a spoken target is:
//!
//! ```text
//! "https://example.org"   → Url  (scheme must be allowed)
//! "github dot com"        → Url  "https://github.com"
//! "www.rust-lang.org"     → Url  "https://www.rust-lang.org"
//! "calculator"            → App  "calculator"
//! "rm -rf / ; reboot"     → rejected
//! ```
//!
//! Addresses may only contain characters a URL allows unescaped, so shell
//! metacharacters such as `|`, `^`, `<` and `>` never reach an opener.
//! URLs go to the platform opener (`open`, `xdg-open`, or the URL protocol
//! handler via `rundll32` on Windows, bypassing `cmd`); apps go to `open -a`
//! on macOS, `start` on Windows and are spawned by name elsewhere.

use std::process::{Command, Stdio};

use super::InjectError;

/// Suffixes that make a bare target a web address.
const WEB_SUFFIXES: &[&str] = &[".com", ".org", ".net", ".io"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    Url(String),
    App(String),
}

impl OpenTarget {
    /// Classify and validate a spoken open target.
    pub fn resolve(target: &str, allowed_schemes: &[String]) -> Result<Self, InjectError> {
        let target = target.trim().trim_end_matches(['.', '!', '?']);
        if target.is_empty() {
            return Err(InjectError::Rejected("nothing to open".into()));
        }

        if let Some((scheme, rest)) = target.split_once("://") {
            let allowed = allowed_schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme));
            if !allowed {
                return Err(InjectError::Rejected(format!("scheme '{scheme}' is not allowed")));
            }
            if rest.is_empty() || !is_url_text(rest) {
                return Err(InjectError::Rejected(format!("'{target}' is not a valid address")));
            }
            return Ok(Self::Url(target.to_string()));
        }

        let spoken = target.to_ascii_lowercase().replace(" dot ", ".");
        if looks_like_web_address(&spoken) {
            if !is_url_text(&spoken) {
                return Err(InjectError::Rejected(format!("'{target}' is not a valid address")));
            }
            return Ok(Self::Url(format!("https://{spoken}")));
        }

        let safe = target
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '+'));
        if !safe || target.starts_with(['-', '.']) {
            return Err(InjectError::Rejected(format!("'{target}' is not an application name")));
        }
        Ok(Self::App(target.to_string()))
    }
}

/// RFC 3986 unreserved and reserved characters plus `%`.
fn is_url_text(s: &str) -> bool {
    s.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '-' | '.' | '_' | '~' | ':' | '/' | '?' | '#' | '[' | ']' | '@' | '!' | '$'
                    | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=' | '%'
            )
    })
}

fn looks_like_web_address(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    s.starts_with("www.")
        || WEB_SUFFIXES
            .iter()
            .any(|suffix| s.ends_with(suffix) || s.contains(&format!("{suffix}/")))
}

/// Hand `target` to the operating system.  Returns once the opener has been
/// started.
pub fn open(target: &OpenTarget) -> Result<(), InjectError> {
    let mut command = opener_command(target);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    log::debug!("inject: spawning {command:?}");
    command
        .spawn()
        .map(drop)
        .map_err(|e| InjectError::Launch(e.to_string()))
}

#[cfg(target_os = "macos")]
fn opener_command(target: &OpenTarget) -> Command {
    let mut command = Command::new("open");
    match target {
        OpenTarget::Url(url) => command.arg(url),
        OpenTarget::App(app) => command.arg("-a").arg(app),
    };
    command
}

#[cfg(target_os = "windows")]
fn opener_command(target: &OpenTarget) -> Command {
    match target {
        OpenTarget::Url(url) => {
            let mut command = Command::new("rundll32");
            command.arg("url.dll,FileProtocolHandler").arg(url);
            command
        }
        // App names are limited to letters, digits, spaces and `-_.+`.
        OpenTarget::App(app) => {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(app);
            command
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(target: &OpenTarget) -> Command {
    match target {
        OpenTarget::Url(url) => {
            let mut command = Command::new("xdg-open");
            command.arg(url);
            command
        }
        OpenTarget::App(app) => Command::new(app.to_lowercase().replace(' ', "-")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
