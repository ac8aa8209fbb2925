use thiserror::Error;

/// Cross-catalog content identifier kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintKind {
    Isrc,
    Upc,
}

impl std::fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Isrc => write!(f, "ISRC"),
            Self::Upc => write!(f, "UPC"),
        }
    }
}

/// Everything that can go wrong between a raw link and a resolved Deezer
/// entity. Recoverable gateway conditions (auth loss, quota, stale token)
/// are retried inside the transport and only show up here once their
/// retry budget is exhausted.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unrecognized link: {0}")]
    Classification(String),

    #[error("{kind} code not found for {name}")]
    MissingFingerprint { kind: FingerprintKind, name: String },

    #[error("no match on deezer for {0}")]
    NotFound(String),

    #[error("deezer session authentication failed: {0}")]
    Auth(String),

    #[error("deezer quota error persisted after {0} retries")]
    RateLimit(u32),

    #[error("api token still rejected after {0} refreshes")]
    TokenExhausted(u32),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unexpected {0} response: {1}")]
    Schema(&'static str, String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
