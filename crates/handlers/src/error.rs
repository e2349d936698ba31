/// Errors raised while building or resolving handler trees.
///
/// Construction errors are returned by the `new` constructors. `InvalidMatch`
/// only surfaces when a matcher is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing message handlers: at least one child handler is required")]
    MissingHandlers,

    #[error("missing match: a non-empty prefix, pattern or match function is required")]
    MissingMatch,

    #[error("invalid match pattern {pattern:?}: {reason}")]
    InvalidMatch { pattern: String, reason: String },
}

impl Error {
    #[must_use]
    pub fn invalid_match(pattern: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidMatch {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
