use thiserror::Error;

/// Failures surfaced by the engine.
///
/// Zero uncertainty reaching the reporter is not represented here: it is handled by a fallback
/// precision and flagged on [`crate::significance::Rounded`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("undefined result: {0}")]
    UndefinedResult(String),

    #[error("no quantity named '{0}' in this analysis")]
    UnknownQuantity(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse experiment configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn undefined(message: impl Into<String>) -> Self {
        Self::UndefinedResult(message.into())
    }
}
