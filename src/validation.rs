//! Contact message rules shared by the form and the `/api/contact` handler.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

pub const MIN_MESSAGE_LEN: usize = 5;

/// Also handed to the browser form, so it must stay valid JavaScript regex
/// syntax.
pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9]+@[a-zA-Z0-9]+\.[A-Za-z]+$";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(EMAIL_PATTERN).expect("email pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid input")]
    InvalidInput,
    #[error("Message too short")]
    MessageTooShort,
    #[error("Invalid Email")]
    InvalidEmail,
}

pub fn validate(email: &str, name: &str, message: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() || name.trim().is_empty() || message.trim().is_empty() {
        return Err(ValidationError::InvalidInput);
    }

    if message.trim().chars().count() < MIN_MESSAGE_LEN {
        return Err(ValidationError::MessageTooShort);
    }

    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}
