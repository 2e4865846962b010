use garde::Validate;

use crate::error::{AppError, Result};

/// Validates a request payload, reporting the first failure.
///
/// # Returns
///
/// A `Result<()>` indicating whether the payload is valid.
pub fn validate_payload<T>(payload: &T) -> Result<()>
where
    T: Validate,
    T::Context: Default,
{
    payload.validate().map_err(|report| {
        let message = report
            .iter()
            .next()
            .map(|(path, error)| format!("{}: {}", path, error))
            .unwrap_or_else(|| "Invalid request".to_string());
        AppError::Validation(message)
    })
}

/// Trims and lower-cases an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Probe {
        #[garde(email)]
        email: String,
        #[garde(length(min = 8, max = 128))]
        password: String,
    }

    #[test]
    fn accepts_valid_payload() {
        let probe = Probe { email: "mina@example.com".into(), password: "longenough".into() };
        assert!(validate_payload(&probe).is_ok());
    }

    #[test]
    fn reports_field_name() {
        let probe = Probe { email: "not-an-email".into(), password: "longenough".into() };
        match validate_payload(&probe) {
            Err(AppError::Validation(message)) => assert!(message.starts_with("email")),
            other => panic!("unexpected result: {:?}", other.err()),
        }

        let probe = Probe { email: "mina@example.com".into(), password: "short".into() };
        match validate_payload(&probe) {
            Err(AppError::Validation(message)) => assert!(message.starts_with("password")),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn normalizes_email() {
        assert_eq!(normalize_email("  Mina@Example.COM "), "mina@example.com");
    }
}
