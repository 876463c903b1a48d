use crate::error::BoxError;
use crate::loader::{LoaderFn, MultiLoaderFn};
use crate::remote::{DecodeFn, EncodeFn, RemoteCache, RemoteHandle};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-call overrides, overlaid onto the cache-level defaults configured at
/// build time. Every field is independently optional; unset fields inherit
/// the default.
pub struct Options<V> {
  pub(crate) ttl: Option<Duration>,
  pub(crate) loader: Option<LoaderFn<V>>,
  pub(crate) multi_loader: Option<MultiLoaderFn<V>>,
  pub(crate) default_value: Option<Arc<V>>,
  pub(crate) default_value_ttl: Option<Duration>,
  pub(crate) remote: Option<Arc<dyn RemoteCache>>,
  pub(crate) encode: Option<EncodeFn<V>>,
  pub(crate) decode: Option<DecodeFn<V>>,
  pub(crate) is_wait: Option<bool>,
}

impl<V> Default for Options<V> {
  fn default() -> Self {
    Self {
      ttl: None,
      loader: None,
      multi_loader: None,
      default_value: None,
      default_value_ttl: None,
      remote: None,
      encode: None,
      decode: None,
      is_wait: None,
    }
  }
}

impl<V> Options<V> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Overrides the expiration for this call. Zero means no expiration.
  pub fn ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  /// Overrides the single-key miss filler for this call.
  pub fn loader(
    mut self,
    f: impl Fn(&str) -> Result<V, BoxError> + Send + Sync + 'static,
  ) -> Self {
    self.loader = Some(Arc::new(f));
    self
  }

  /// Overrides the batch miss filler for this call.
  pub fn multi_loader(
    mut self,
    f: impl Fn(&[String]) -> Result<HashMap<String, V>, BoxError> + Send + Sync + 'static,
  ) -> Self {
    self.multi_loader = Some(Arc::new(f));
    self
  }

  /// Overrides the value served when the loader fails.
  pub fn default_value(mut self, value: V) -> Self {
    self.default_value = Some(Arc::new(value));
    self
  }

  /// Overrides how long a served default value stays cached.
  pub fn default_value_ttl(mut self, ttl: Duration) -> Self {
    self.default_value_ttl = Some(ttl);
    self
  }

  /// Overrides the remote tier for this call.
  pub fn remote(mut self, remote: Arc<dyn RemoteCache>) -> Self {
    self.remote = Some(remote);
    self
  }

  /// Overrides the byte codec used for remote payloads.
  pub fn codec(
    mut self,
    encode: impl Fn(&V) -> Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    decode: impl Fn(&[u8]) -> Result<V, BoxError> + Send + Sync + 'static,
  ) -> Self {
    self.encode = Some(Arc::new(encode));
    self.decode = Some(Arc::new(decode));
    self
  }

  /// Advisory flag reserved for single-flight coalescing of concurrent
  /// loads. Accepted and recorded, but not acted on.
  pub fn is_wait(mut self, wait: bool) -> Self {
    self.is_wait = Some(wait);
    self
  }

  /// Whether single-flight coalescing was requested for this call.
  pub fn wait_requested(&self) -> bool {
    self.is_wait.unwrap_or(false)
  }
}

/// The fully merged view of one call's configuration: per-call overrides
/// where given, cache defaults otherwise.
pub(crate) struct Resolved<V> {
  pub(crate) ttl: Duration,
  pub(crate) loader: Option<LoaderFn<V>>,
  pub(crate) multi_loader: Option<MultiLoaderFn<V>>,
  pub(crate) default_value: Option<Arc<V>>,
  pub(crate) default_value_ttl: Duration,
  pub(crate) remote: RemoteHandle,
  pub(crate) encode: Option<EncodeFn<V>>,
  pub(crate) decode: Option<DecodeFn<V>>,
}
