//! Local input validation. These checks run synchronously before any backend
//! call and carry the exact user-facing messages the board shows.

/// Validation errors raised before a backend call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The fixed registration gate: short passwords never reach the
    /// identity provider.
    #[error("Password should be at least 6 characters.")]
    PasswordTooShort,

    /// One or more of the four listing fields is empty after trimming.
    #[error("Please fill in all bus information fields (Bus Number, Route, Type, Contact)!")]
    MissingListingFields,

    /// The account email is not plausibly an address.
    #[error("Please enter a valid email address.")]
    InvalidEmail,
}

/// Minimum password length enforced locally at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Check the registration password gate.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Cheap shape check for account emails. The identity provider remains the
/// authority on uniqueness and format; this only rejects obvious typos.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let trimmed = email.trim();
    let mut parts = trimmed.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// True when a required field survives trimming.
pub fn non_empty_after_trim(value: &str) -> bool {
    !value.trim().is_empty()
}
