//! Input sanitization and path validation
//!
//! Two independent passes:
//! - [`sanitize`] strips shell metacharacters and `..` sequences from a
//!   value and caps its length.
//! - [`validate_path`] accepts or rejects a path against a denylist of
//!   structurally dangerous patterns without rewriting it.
//!
//! A path embedded in a command goes through both: validate first, then
//! sanitize.

use std::ffi::OsStr;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Maximum length (in characters) of a sanitized value
pub const MAX_SANITIZED_LEN: usize = 500;
/// Maximum length (in characters) of a path
pub const MAX_PATH_LEN: usize = 260;

/// Characters removed by [`sanitize`]
pub const SHELL_METACHARACTERS: [char; 13] =
    [';', '&', '|', '`', '$', '(', ')', '{', '}', '[', ']', '<', '>'];

static INVALID_PATH_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>"|?*\x00-\x1f]"#).expect("static regex"));

static ADMIN_SHARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\\/]{2}[^\\/]+[\\/](?:[a-z]|admin|ipc|print)\$(?:[\\/]|$)")
        .expect("static regex")
});

static SCRIPT_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:javascript|vbscript|script|data):").expect("static regex")
});

static RESERVED_DEVICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:con|prn|aux|nul|com[1-9]|lpt[1-9])$").expect("static regex")
});

/// A value with shell metacharacters and traversal sequences removed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SanitizedString(String);

impl SanitizedString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SanitizedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A path that passed [`validate_path`], kept exactly as supplied
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedPath(String);

impl ValidatedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Run the validated path through the sanitizer before embedding it
    pub fn sanitized(&self) -> SanitizedString {
        sanitize_str(&self.0)
    }

    /// The sanitized path, failing when sanitizing would change it
    ///
    /// For paths that are read back by this process after a script writes
    /// them, where a rewritten path would point somewhere else.
    pub fn exact_argument(&self) -> Result<SanitizedString> {
        let sanitized = self.sanitized();
        if sanitized.as_str() != self.0 {
            return Err(Error::InvalidPath(format!(
                "path \"{}\" contains characters that cannot be passed to a script",
                self.0
            )));
        }
        Ok(sanitized)
    }
}

impl fmt::Display for ValidatedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidatedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sanitize a value for use as a command argument
///
/// Fails with [`Error::InvalidInput`] when the value is not valid Unicode
/// or contains NUL bytes. Otherwise removes every character in
/// [`SHELL_METACHARACTERS`], removes `..` until none remain, trims, and
/// truncates to [`MAX_SANITIZED_LEN`] characters.
pub fn sanitize<S: AsRef<OsStr>>(input: S) -> Result<SanitizedString> {
    let text = input
        .as_ref()
        .to_str()
        .ok_or_else(|| Error::InvalidInput("value is not valid text".to_string()))?;

    if text.contains('\0') {
        return Err(Error::InvalidInput("value contains NUL bytes".to_string()));
    }

    Ok(sanitize_str(text))
}

fn sanitize_str(text: &str) -> SanitizedString {
    let mut cleaned: String = text
        .chars()
        .filter(|c| !SHELL_METACHARACTERS.contains(c))
        .collect();

    // Removing one ".." can join two dots into a new one ("...." -> "")
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "");
    }

    let trimmed = cleaned.trim();
    SanitizedString(trimmed.chars().take(MAX_SANITIZED_LEN).collect())
}

/// Validate a filesystem path against the structural denylist
///
/// The path is returned unchanged on success.
pub fn validate_path(input: &str) -> Result<ValidatedPath> {
    let len = input.chars().count();
    if len == 0 {
        return Err(Error::InvalidPath("path is empty".to_string()));
    }
    if len > MAX_PATH_LEN {
        return Err(Error::InvalidPath(format!(
            "path is longer than {} characters",
            MAX_PATH_LEN
        )));
    }

    if input.contains("..") {
        return Err(Error::InvalidPath(
            "path contains a traversal sequence".to_string(),
        ));
    }

    if SCRIPT_URI.is_match(input) {
        return Err(Error::InvalidPath("path is a script URI".to_string()));
    }

    if INVALID_PATH_CHARS.is_match(input) {
        return Err(Error::InvalidPath(
            "path contains invalid characters".to_string(),
        ));
    }

    check_colons(input)?;

    if ADMIN_SHARE.is_match(input) {
        return Err(Error::InvalidPath(
            "path targets an administrative share".to_string(),
        ));
    }

    if let Some(segment) = input.split(['\\', '/']).find(|s| is_reserved_device(s)) {
        return Err(Error::InvalidPath(format!(
            "path segment \"{}\" is a reserved device name",
            segment
        )));
    }

    Ok(ValidatedPath(input.to_string()))
}

/// A colon is only allowed once, right after a leading drive letter
fn check_colons(input: &str) -> Result<()> {
    let colons = input.matches(':').count();
    if colons == 0 {
        return Ok(());
    }
    if colons > 1 {
        return Err(Error::InvalidPath("path contains multiple colons".to_string()));
    }

    let mut chars = input.chars();
    let is_drive = matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    );
    if is_drive {
        Ok(())
    } else {
        Err(Error::InvalidPath(
            "colon is only allowed after a drive letter".to_string(),
        ))
    }
}

/// Windows treats "con", "CON.txt" and "con .log" alike
fn is_reserved_device(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or(segment).trim_end();
    RESERVED_DEVICE.is_match(stem)
}
