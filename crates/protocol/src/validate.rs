//! Syntax checks for token fields.
//!
//! Tokens round-trip through the client and are untrusted, so every field is
//! checked against its expected shape before it reaches the host browser.
//! The same checks apply to caller-supplied destination paths and names.

use crate::error::{ProtocolError, Result};

/// Maximum length of a single file name in bytes.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Characters never allowed in a file name.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Check a directory path inside a file area.
///
/// Paths are absolute and slash-terminated (`/`, `/docs/`, `/docs/2024/`).
/// Empty, `.` and `..` segments are rejected, as are backslashes and control
/// characters.
pub fn validate_filepath(value: &str) -> Result<()> {
    const FIELD: &str = "filepath";

    if !value.starts_with('/') {
        return Err(ProtocolError::invalid_field(FIELD, "must start with '/'"));
    }
    if !value.ends_with('/') {
        return Err(ProtocolError::invalid_field(FIELD, "must end with '/'"));
    }
    if value.contains('\\') {
        return Err(ProtocolError::invalid_field(FIELD, "contains a backslash"));
    }
    if value.chars().any(char::is_control) {
        return Err(ProtocolError::invalid_field(
            FIELD,
            "contains a control character",
        ));
    }

    if value == "/" {
        return Ok(());
    }

    for segment in value[1..value.len() - 1].split('/') {
        match segment {
            "" => return Err(ProtocolError::invalid_field(FIELD, "contains an empty segment")),
            "." | ".." => {
                return Err(ProtocolError::invalid_field(
                    FIELD,
                    "contains a relative segment",
                ))
            }
            _ => {}
        }
    }

    Ok(())
}

/// Check a single file name.
pub fn validate_filename(value: &str) -> Result<()> {
    const FIELD: &str = "filename";

    if value.is_empty() {
        return Err(ProtocolError::invalid_field(FIELD, "is empty"));
    }
    if value == "." || value == ".." {
        return Err(ProtocolError::invalid_field(FIELD, "is a relative name"));
    }
    if value.len() > MAX_FILENAME_LENGTH {
        return Err(ProtocolError::invalid_field(
            FIELD,
            format!("exceeds {MAX_FILENAME_LENGTH} bytes"),
        ));
    }
    if let Some(c) = value.chars().find(|c| FORBIDDEN_FILENAME_CHARS.contains(c)) {
        return Err(ProtocolError::invalid_field(
            FIELD,
            format!("contains forbidden character {c:?}"),
        ));
    }
    if value.chars().any(char::is_control) {
        return Err(ProtocolError::invalid_field(
            FIELD,
            "contains a control character",
        ));
    }

    Ok(())
}

/// Check an identifier drawn from the alphabetic-with-extension set:
/// ASCII letters, `_` and `-`.
pub fn validate_alphaext(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ProtocolError::invalid_field(field, "is empty"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == '_' || c == '-')
    {
        return Err(ProtocolError::invalid_field(
            field,
            "may only contain letters, '_' and '-'",
        ));
    }
    Ok(())
}

/// Check a context id. Zero never names a context.
pub fn validate_context_id(value: u64) -> Result<()> {
    if value == 0 {
        return Err(ProtocolError::invalid_field("contextid", "must be non-zero"));
    }
    Ok(())
}
