//! Errors returned by language model integrations
use thiserror::Error;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(BoxedError),
    #[error("Rate limited: {0}")]
    RateLimited(BoxedError),
    #[error("Permanent error: {0}")]
    PermanentError(BoxedError),
    #[error("Transient error: {0}")]
    TransientError(BoxedError),
}

impl LanguageModelError {
    pub fn permanent(e: impl Into<BoxedError>) -> Self {
        LanguageModelError::PermanentError(e.into())
    }

    pub fn transient(e: impl Into<BoxedError>) -> Self {
        LanguageModelError::TransientError(e.into())
    }

    pub fn rate_limited(e: impl Into<BoxedError>) -> Self {
        LanguageModelError::RateLimited(e.into())
    }

    /// Whether the request may succeed when reissued after a pause.
    ///
    /// True for errors classified as rate limited and for any error whose message mentions a
    /// rate limit, whatever the provider called it.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LanguageModelError::RateLimited(_))
            || self.to_string().to_lowercase().contains("rate limit")
    }
}

impl From<anyhow::Error> for LanguageModelError {
    fn from(e: anyhow::Error) -> Self {
        LanguageModelError::PermanentError(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LanguageModelError::rate_limited("slow down"), true; "classified")]
    #[test_case(LanguageModelError::transient("Rate limit exceeded"), true; "message")]
    #[test_case(LanguageModelError::permanent("RATE LIMIT reached for model"), true; "uppercase")]
    #[test_case(LanguageModelError::transient("connection reset"), false; "transient")]
    #[test_case(LanguageModelError::permanent("Model not set"), false; "permanent")]
    fn test_is_rate_limit(error: LanguageModelError, expected: bool) {
        assert_eq!(error.is_rate_limit(), expected);
    }
}
