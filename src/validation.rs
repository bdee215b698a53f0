//! Identity validation for values handed to us by the calling platform.
//!
//! User ids are opaque, but they end up as storage keys and in logs, so we
//! insist on something printable and bounded. Display names get the same
//! treatment; they are shown on leaderboards.

/// Longest accepted user id or display name, in characters.
pub const MAX_IDENTITY_CHARS: usize = 64;

/// Identity validation errors with helpful messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} is too long (maximum {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} contains control characters")]
    ControlCharacters { field: &'static str },
}

fn validate(field: &'static str, raw: &str) -> Result<String, IdentityError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::Empty { field });
    }
    if trimmed.chars().count() > MAX_IDENTITY_CHARS {
        return Err(IdentityError::TooLong {
            field,
            max: MAX_IDENTITY_CHARS,
        });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(IdentityError::ControlCharacters { field });
    }
    Ok(trimmed.to_string())
}

/// Validate and normalize (trim) a platform user id.
pub fn validate_user_id(user_id: &str) -> Result<String, IdentityError> {
    validate("user id", user_id)
}

/// Validate and normalize (trim) a display name.
pub fn validate_display_name(name: &str) -> Result<String, IdentityError> {
    validate("display name", name)
}
