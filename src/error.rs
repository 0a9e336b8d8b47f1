use thiserror::Error;

/// Failures surfaced by the metadata client.
///
/// Network and parse failures are normally absorbed by a fallback; they only
/// reach the caller once every source for a request has been exhausted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Upstream unavailable: {0}")]
  UpstreamUnavailable(String),

  #[error("Parse failure: {0}")]
  ParseFailure(String),

  #[error("An API key is required to {0}")]
  MissingApiKey(String),
}

impl From<reqwest::Error> for MetadataError {
  fn from(e: reqwest::Error) -> Self {
    MetadataError::UpstreamUnavailable(e.to_string())
  }
}

impl From<serde_json::Error> for MetadataError {
  fn from(e: serde_json::Error) -> Self {
    MetadataError::ParseFailure(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
