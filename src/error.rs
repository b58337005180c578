// src/error.rs

use std::fmt;
use std::io;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
  /// A script reference (new or already in the page) failed to load.
  ResourceLoad { src: String, reason: String },
  /// The library symbol never appeared before the deadline.
  LibraryTimeout { waited: Duration },
  /// Non-success response or transport failure, including the retry.
  Fetch { path: String, tried: Option<String>, reason: String },
  InvalidStructure(String),
  Render(String),
  Url(String),
  /// Page markup that cannot be taken apart.
  Html(String),
  Io(io::Error),
  Json(serde_json::Error),
}

impl Error {
  pub fn is_timeout(&self) -> bool {
    matches!(self, Error::LibraryTimeout { .. })
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::ResourceLoad { src, reason } => write!(f, "Failed to load {}: {}", src, reason),
      Error::LibraryTimeout { waited } => {
        write!(f, "3Dmol did not load within timeout ({} ms)", waited.as_millis())
      }
      Error::Fetch { path, tried: Some(alt), reason } => {
        write!(f, "Failed to fetch {} (tried {}): {}", path, alt, reason)
      }
      Error::Fetch { path, tried: None, reason } => write!(f, "Failed to fetch {}: {}", path, reason),
      Error::InvalidStructure(msg) => write!(f, "Invalid structure: {}", msg),
      Error::Render(msg) => write!(f, "Render error: {}", msg),
      Error::Url(msg) => write!(f, "Invalid URL: {}", msg),
      Error::Html(msg) => write!(f, "HTML error: {}", msg),
      Error::Io(e) => write!(f, "I/O error: {}", e),
      Error::Json(e) => write!(f, "JSON error: {}", e),
    }
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Error::Io(e) => Some(e),
      Error::Json(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for Error {
  fn from(e: io::Error) -> Self {
    Error::Io(e)
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Error::Json(e)
  }
}
