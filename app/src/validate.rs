use err_derive::Error;
use lazy_static::lazy_static;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    // Same shape the signup form enforces: something, an @, something,
    // a dot, something.
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(display = "{} is required", _0)]
    Required(&'static str),
    #[error(display = "invalid email address")]
    InvalidEmail,
    #[error(display = "password must be at least 6 characters")]
    PasswordTooShort,
}

pub fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

pub fn email(value: &str) -> Result<(), ValidationError> {
    required(value, "email")?;
    if !EMAIL.is_match(value) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blank_fields_are_required() {
        assert_eq!(required("", "name"), Err(ValidationError::Required("name")));
        assert_eq!(
            required("   ", "surname"),
            Err(ValidationError::Required("surname"))
        );
        assert_eq!(required("Ada", "name"), Ok(()));
    }

    #[test]
    fn plausible_emails_pass() {
        for addr in &["ada@example.com", "a@b.co", "first.last@mail.example.org"] {
            assert_eq!(email(addr), Ok(()), "addr: {}", addr);
        }
    }

    #[test]
    fn malformed_emails_fail() {
        assert_eq!(email(""), Err(ValidationError::Required("email")));
        for addr in &["plain", "a@b", "a b@c.d", "a@b.", "@b.c", "a@@b.c"] {
            assert_eq!(email(addr), Err(ValidationError::InvalidEmail), "addr: {}", addr);
        }
    }

    #[test]
    fn password_length_is_measured_in_characters() {
        assert_eq!(password("abcde"), Err(ValidationError::PasswordTooShort));
        assert_eq!(password("abcdef"), Ok(()));
        assert_eq!(password("ññññññ"), Ok(()));
    }

    #[test]
    fn errors_read_like_form_hints() {
        assert_eq!(
            ValidationError::Required("name").to_string(),
            "name is required"
        );
        assert_eq!(
            ValidationError::PasswordTooShort.to_string(),
            "password must be at least 6 characters"
        );
    }
}
