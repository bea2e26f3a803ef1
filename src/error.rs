use std::fmt;

use thiserror::Error;

/// Coarse category of an upstream failure, used to pick the hint shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Permission,
    RateLimit,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// Kind for an HTTP status returned by an upstream API.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::Auth,
            403 => ErrorKind::Permission,
            429 => ErrorKind::RateLimit,
            408 | 504 => ErrorKind::Timeout,
            _ => ErrorKind::Unknown,
        }
    }

    /// Last-resort classification from an error message when the source gave no
    /// structured signal.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["401", "unauthorized", "api key", "invalid token"]) {
            ErrorKind::Auth
        } else if has(&["403", "forbidden", "not enough rights", "not a member", "kicked"]) {
            ErrorKind::Permission
        } else if has(&["429", "too many requests", "rate limit", "retry after"]) {
            ErrorKind::RateLimit
        } else if has(&["timeout", "timed out"]) {
            ErrorKind::Timeout
        } else {
            ErrorKind::Unknown
        }
    }

    /// Operator-facing hint for this kind of failure.
    pub fn hint(self) -> &'static str {
        match self {
            ErrorKind::Auth => "🔑 Credentials were rejected. Check the bot token and the generation API key.",
            ErrorKind::Permission => {
                "🚫 Permission denied. Make sure the bot is an admin of the channel and the channel id is correct."
            }
            ErrorKind::RateLimit => "⏱ The upstream service is rate limiting us. Try again in a minute.",
            ErrorKind::Timeout => "⌛ The request timed out. Try again.",
            ErrorKind::Unknown => "❌ An unexpected error occurred.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Auth => write!(f, "auth"),
            ErrorKind::Permission => write!(f, "permission"),
            ErrorKind::RateLimit => write!(f, "rate-limit"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required settings: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend returned no content")]
    Empty,
    #[error("generation backend error ({kind}): {message}")]
    Backend { kind: ErrorKind, message: String },
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Empty => ErrorKind::Unknown,
            GenerationError::Backend { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Error)]
#[error("channel publish failed ({kind}): {message}")]
pub struct PublishError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Every failure a message handler can end in. All of them are turned into a
/// reply to the sender; none escape the handler.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("sender is not the channel operator")]
    Unauthorized,
    #[error("too many requests, retry in {wait_secs}s")]
    RateLimited { wait_secs: u64 },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("invalid quiz: {0}")]
    Parse(String),
}

impl BotError {
    /// Whether this failure counts against the `errors` stat.
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            BotError::Generation(_) | BotError::Publish(_) | BotError::Parse(_)
        )
    }

    /// Text sent back to the sender.
    pub fn reply_text(&self) -> String {
        match self {
            BotError::Unauthorized => "🔒 Sorry, this bot is for admins only.".to_string(),
            BotError::RateLimited { wait_secs } => {
                format!("⏳ Please wait {}s before sending another request.", wait_secs)
            }
            BotError::Validation(msg) => format!("⚠️ {}", msg),
            BotError::Generation(e) => {
                format!("{}\n\nDetails: {}", e.kind().hint(), e)
            }
            BotError::Publish(e) => format!("{}\n\nDetails: {}", e.kind.hint(), e.message),
            BotError::Parse(_) => "❌ Failed to generate a valid quiz. Try again.".to_string(),
        }
    }
}
