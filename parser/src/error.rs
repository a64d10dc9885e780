use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Payload too short to be a catalog page ({len} bytes): {snippet:?}")]
    TooShort { len: usize, snippet: String },

    #[error("Payload is not a catalog page: {0}")]
    UnexpectedPayload(String),

    #[error("Upstream API reported an error: {0}")]
    Upstream(String),

    #[error("Provider group missing from payload")]
    MissingGroup,

    #[error("No catalog data could be recovered from {len} bytes")]
    Unrecoverable { len: usize },
}
