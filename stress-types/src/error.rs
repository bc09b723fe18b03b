//! Error types for role parsing.

use thiserror::Error;

/// Errors that can occur when parsing a client role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    /// Role does not start with `client.`
    #[error("role {0:?} does not start with \"client.\"")]
    MissingPrefix(String),

    /// Role has the prefix but no id after it
    #[error("role {0:?} has an empty client id")]
    EmptyId(String),

    /// Client id contains characters that cannot be passed as an env assignment
    #[error("role {role:?} has an invalid client id {id:?}")]
    InvalidId {
        /// The full role string.
        role: String,
        /// The offending id.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RoleError::MissingPrefix("osd.0".into());
        assert_eq!(err.to_string(), "role \"osd.0\" does not start with \"client.\"");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RoleError>();
    }
}
