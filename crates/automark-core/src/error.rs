//! Error types for the verification protocol.

/// Errors raised by grading operations.
///
/// The `Display` text of the client-facing variants is sent to learners
/// verbatim, so it is phrased as a message rather than a diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    /// User is not in the registered set.
    #[error("user '{user}' is not registered.")]
    UnknownUser { user: String },

    /// Assignment is not part of the held-out set.
    #[error("assignment '{assignment}' is not found.")]
    UnknownAssignment { assignment: String },

    /// The user's cooldown window has not elapsed yet.
    #[error("your timeout expires in {seconds_remaining} sec.")]
    CooldownActive { seconds_remaining: u64 },

    /// Challenge token does not map to a held-out case of the assignment.
    #[error("challenge {token} does not belong to assignment '{assignment}'.")]
    UnknownChallenge { assignment: String, token: u32 },

    /// Submitted answer could not be parsed or compared.
    #[error("malformed answer: {message}")]
    MalformedAnswer { message: String },

    /// Progress records could not be read or written.
    #[error("storage error: {message}")]
    Storage { message: String },

    /// Fixture bundle or held-out data is unreadable or inconsistent.
    #[error("invalid test data: {message}")]
    Bundle { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl GradeError {
    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownUser { .. }
                | Self::UnknownAssignment { .. }
                | Self::CooldownActive { .. }
                | Self::UnknownChallenge { .. }
                | Self::MalformedAnswer { .. }
        )
    }

    /// Short stable label, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownUser { .. } => "unknown_user",
            Self::UnknownAssignment { .. } => "unknown_assignment",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::UnknownChallenge { .. } => "unknown_challenge",
            Self::MalformedAnswer { .. } => "malformed_answer",
            Self::Storage { .. } => "storage",
            Self::Bundle { .. } => "bundle",
            Self::Config { .. } => "config",
        }
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub(crate) fn bundle(message: impl Into<String>) -> Self {
        Self::Bundle {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedAnswer {
            message: message.into(),
        }
    }
}

/// Result type for grading operations.
pub type GradeResult<T> = Result<T, GradeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_wire_text() {
        let err = GradeError::UnknownUser {
            user: "ghost".into(),
        };
        assert_eq!(err.to_string(), "user 'ghost' is not registered.");

        let err = GradeError::CooldownActive {
            seconds_remaining: 12,
        };
        assert_eq!(err.to_string(), "your timeout expires in 12 sec.");
    }

    #[test]
    fn client_errors_are_classified() {
        assert!(GradeError::malformed("x").is_client_error());
        assert!(!GradeError::storage("disk full").is_client_error());
        assert_eq!(GradeError::bundle("bad").kind(), "bundle");
    }
}
