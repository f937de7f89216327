//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from API/IO errors.

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    /// A duration was negative or not a finite number
    #[error("invalid duration: {0} minutes")]
    InvalidDuration(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::InvalidDuration(-2.5);
        assert_eq!(err.to_string(), "invalid duration: -2.5 minutes");
    }
}
