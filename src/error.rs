use thiserror::Error;

/// Boxed error type carried by loader, codec, and remote adapter failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
  /// The key is not present locally and no loader could produce a value.
  #[error("key not found")]
  KeyNotFound,

  /// `mset` was called with key and value sequences of different lengths.
  #[error("key count does not match value count")]
  KeyValueLenMismatch,

  /// No remote adapter is configured. Internal: the router treats this as
  /// "skip the remote tier" and never surfaces it to callers.
  #[error("remote cache not configured")]
  RemoteUnconfigured,

  /// A remote payload had to be encoded or decoded but no codec is set.
  #[error("remote caching requires an encode/decode codec")]
  CodecRequired,

  /// The remote adapter failed.
  #[error("remote cache error: {0}")]
  Remote(#[source] BoxError),

  /// The user loader failed and no default value is configured.
  #[error("loader error: {0}")]
  Loader(#[source] BoxError),
}

impl CacheError {
  /// True for the internal "no remote tier" signal.
  #[inline]
  pub(crate) fn is_unconfigured(&self) -> bool {
    matches!(self, CacheError::RemoteUnconfigured)
  }
}
