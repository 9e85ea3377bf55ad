//! Errors surfaced by token derivation and style registration.

/// Error produced while turning a theme and its seeds into a final token.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StyleError {
    /// A derivative function rejected its input.
    #[error("derivative failed for theme {theme_id}: {message}")]
    Derivation { theme_id: u64, message: String },

    /// A seed or override carried a field a derivative needs with the wrong shape.
    #[error("token field '{field}' is invalid: {message}")]
    InvalidField { field: String, message: String },
}

impl StyleError {
    /// Convenience constructor for derivatives reporting a bad field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = StyleError::Derivation {
            theme_id: 3,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "derivative failed for theme 3: boom");

        let err = StyleError::invalid_field("fontSize", "expected a number");
        assert_eq!(
            err.to_string(),
            "token field 'fontSize' is invalid: expected a number"
        );
    }
}
