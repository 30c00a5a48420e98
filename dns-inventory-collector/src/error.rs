use thiserror::Error;

/// Classified outcome of an HTTP fetch against an upstream provider API.
///
/// # Retryable errors
///
/// [`Server`](Self::Server), [`Transport`](Self::Transport), and
/// [`RateLimited`](Self::RateLimited) are transient; the fetch client retries
/// them with exponential backoff. Everything else fails the call immediately.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider's request quota is exhausted. Unlike
    /// [`RateLimited`](Self::RateLimited) this does not clear by waiting;
    /// collectors stop enumerating and keep what they already have.
    #[error("API quota exceeded")]
    QuotaExceeded,

    /// HTTP 429 (or a `TOO_MANY_REQUESTS` body). Surfaces only once retries
    /// are exhausted while still throttled.
    #[error("rate limited")]
    RateLimited,

    /// HTTP 404.
    #[error("resource not found")]
    NotFound,

    /// Any other 4xx. Not retried. `body` is truncated.
    #[error("HTTP {status}: {body}")]
    Client { status: u16, body: String },

    /// A 5xx that survived all retries. `body` is truncated.
    #[error("HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// The caller's cancellation token fired.
    #[error("cancelled")]
    Cancelled,

    /// Connection-level failure (DNS, refused, timeout, read error).
    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Server { .. } | Self::Transport(_) | Self::RateLimited
        )
    }
}

/// Error type for collector registration and collection sweeps.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// A required credential/config field is empty. Raised by `validate()`.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// A collector with the same name is already registered.
    #[error("collector {0:?} already registered")]
    AlreadyRegistered(String),

    /// The fetch layer failed; transparent so the classification (and the
    /// exact `cancelled` message) survives into sync run records.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The upstream answered 2xx but the payload did not parse.
    #[error("invalid response from {provider}: {detail}")]
    InvalidResponse {
        provider: &'static str,
        detail: String,
    },

    /// The upstream reported an application-level error.
    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    /// The sweep observed the cancellation token between requests.
    #[error("cancelled")]
    Cancelled,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CollectorError>;
