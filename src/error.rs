use thiserror::Error;

#[derive(Debug, Error)]
pub enum FareError {
    #[error(
        "too many requests; retry in {retry_after_secs}s \
         (the limiter window has not rolled over yet)"
    )]
    RateLimited { retry_after_secs: u64 },

    #[error("offer source failed: {0}")]
    Source(String),

    #[error("snapshot store failed: {0}")]
    Store(String),

    #[error(
        "invalid airport code \"{0}\": must be exactly 3 letters (e.g. JFK, HEL, NRT)"
    )]
    InvalidAirport(String),

    #[error(
        "invalid date \"{0}\": must be YYYY-MM-DD, not in the past and \
         at most 330 days ahead (e.g. 2026-03-01)"
    )]
    InvalidDate(String),

    #[error("{0}")]
    Validation(String),

    #[error("MCP server error: {0}")]
    Mcp(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FareError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Source(_) => "source_error",
            Self::Store(_) => "store_error",
            Self::InvalidAirport(_) => "invalid_airport",
            Self::InvalidDate(_) => "invalid_date",
            Self::Validation(_) => "validation_error",
            Self::Mcp(_) => "mcp_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "parse_error",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidAirport(_) | Self::InvalidDate(_) | Self::Validation(_) => 2,
            Self::Source(_) | Self::Io(_) => 3,
            Self::RateLimited { .. } => 4,
            Self::Store(_) => 5,
            Self::Json(_) => 6,
            Self::Mcp(_) => 1,
        }
    }
}
