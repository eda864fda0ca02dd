use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Configured chain ID {expected} does not match provider chain ID {got}")]
    ChainIdMismatch { expected: u64, got: u64 },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EventError {
    #[error("Malformed event: missing required field `{field}`")]
    MalformedEvent { field: &'static str },
}

#[derive(Error, Debug)]
pub enum SubgraphError {
    #[error("Subgraph query failed: {message}")]
    QueryFailed { message: String },
    #[error("Missing required field in subgraph response: {field}")]
    MissingField { field: &'static str },
}
