use crate::error::{BoxError, CacheError, Result};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The largest batch handed to a remote adapter in one call. Bigger
/// multi-key operations are split before they reach the adapter.
pub(crate) const MAX_REMOTE_BATCH: usize = 1000;

/// Encodes a value into the byte payload stored by the remote tier.
pub type EncodeFn<V> = Arc<dyn Fn(&V) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync>;

/// Decodes a remote byte payload back into a value.
pub type DecodeFn<V> = Arc<dyn Fn(&[u8]) -> std::result::Result<V, BoxError> + Send + Sync>;

/// A second-level cache shared by every shard.
///
/// Implementations speak bytes; the cache applies the configured codec on
/// either side. A missing key is `Ok(None)` (or simply absent from an
/// `mget` result), never an error. `ttl` is `None` when the entry should
/// not expire remotely.
pub trait RemoteCache: Send + Sync {
  fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, BoxError>;
  fn mget(&self, keys: &[String]) -> std::result::Result<HashMap<String, Vec<u8>>, BoxError>;
  fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>)
    -> std::result::Result<(), BoxError>;
  fn mset(
    &self,
    entries: &[(String, Vec<u8>)],
    ttl: Option<Duration>,
  ) -> std::result::Result<(), BoxError>;
  fn del(&self, key: &str) -> std::result::Result<(), BoxError>;
  fn mdel(&self, keys: &[String]) -> std::result::Result<(), BoxError>;
}

/// An optionally configured remote tier.
///
/// When no adapter is present every call reports `RemoteUnconfigured`, which
/// callers treat as "skip the remote tier" rather than a failure. Batch
/// operations are chunked to [`MAX_REMOTE_BATCH`].
#[derive(Clone)]
pub(crate) struct RemoteHandle {
  inner: Option<Arc<dyn RemoteCache>>,
}

impl RemoteHandle {
  pub(crate) fn new(inner: Option<Arc<dyn RemoteCache>>) -> Self {
    Self { inner }
  }

  pub(crate) fn is_configured(&self) -> bool {
    self.inner.is_some()
  }

  fn adapter(&self) -> Result<&Arc<dyn RemoteCache>> {
    self.inner.as_ref().ok_or(CacheError::RemoteUnconfigured)
  }

  pub(crate) fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    self.adapter()?.get(key).map_err(CacheError::Remote)
  }

  pub(crate) fn mget(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
    let adapter = self.adapter()?;
    let mut out = HashMap::new();
    for chunk in keys.chunks(MAX_REMOTE_BATCH) {
      let found = adapter.mget(chunk).map_err(CacheError::Remote)?;
      out.extend(found);
    }
    Ok(out)
  }

  pub(crate) fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
    self
      .adapter()?
      .set(key, value, remote_ttl(ttl))
      .map_err(CacheError::Remote)
  }

  pub(crate) fn mset(&self, entries: &[(String, Vec<u8>)], ttl: Duration) -> Result<()> {
    let adapter = self.adapter()?;
    for chunk in entries.chunks(MAX_REMOTE_BATCH) {
      adapter
        .mset(chunk, remote_ttl(ttl))
        .map_err(CacheError::Remote)?;
    }
    Ok(())
  }

  pub(crate) fn del(&self, key: &str) -> Result<()> {
    self.adapter()?.del(key).map_err(CacheError::Remote)
  }

  pub(crate) fn mdel(&self, keys: &[String]) -> Result<()> {
    let adapter = self.adapter()?;
    for chunk in keys.chunks(MAX_REMOTE_BATCH) {
      adapter.mdel(chunk).map_err(CacheError::Remote)?;
    }
    Ok(())
  }
}

/// A zero TTL means the entry does not expire remotely either.
#[inline]
fn remote_ttl(ttl: Duration) -> Option<Duration> {
  if ttl.is_zero() {
    None
  } else {
    Some(ttl)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parking_lot::Mutex;

  #[derive(Default)]
  struct CountingRemote {
    calls: Mutex<Vec<usize>>,
  }

  impl RemoteCache for CountingRemote {
    fn get(&self, _key: &str) -> std::result::Result<Option<Vec<u8>>, BoxError> {
      Ok(None)
    }
    fn mget(&self, keys: &[String]) -> std::result::Result<HashMap<String, Vec<u8>>, BoxError> {
      self.calls.lock().push(keys.len());
      Ok(HashMap::new())
    }
    fn set(
      &self,
      _key: &str,
      _value: &[u8],
      _ttl: Option<Duration>,
    ) -> std::result::Result<(), BoxError> {
      Ok(())
    }
    fn mset(
      &self,
      entries: &[(String, Vec<u8>)],
      _ttl: Option<Duration>,
    ) -> std::result::Result<(), BoxError> {
      self.calls.lock().push(entries.len());
      Ok(())
    }
    fn del(&self, _key: &str) -> std::result::Result<(), BoxError> {
      Ok(())
    }
    fn mdel(&self, keys: &[String]) -> std::result::Result<(), BoxError> {
      self.calls.lock().push(keys.len());
      Ok(())
    }
  }

  #[test]
  fn unconfigured_handle_reports_the_distinguished_signal() {
    let handle = RemoteHandle::new(None);
    assert!(!handle.is_configured());
    assert!(matches!(
      handle.get("k"),
      Err(CacheError::RemoteUnconfigured)
    ));
    assert!(matches!(
      handle.set("k", b"v", Duration::ZERO),
      Err(CacheError::RemoteUnconfigured)
    ));
    assert!(matches!(handle.mdel(&[]), Err(CacheError::RemoteUnconfigured)));
  }

  #[test]
  fn large_batches_are_chunked() {
    let remote = Arc::new(CountingRemote::default());
    let handle = RemoteHandle::new(Some(remote.clone()));

    let keys: Vec<String> = (0..2500).map(|i| format!("k{i}")).collect();
    handle.mget(&keys).unwrap();
    assert_eq!(remote.calls.lock().as_slice(), &[1000, 1000, 500]);

    remote.calls.lock().clear();
    handle.mdel(&keys).unwrap();
    assert_eq!(remote.calls.lock().as_slice(), &[1000, 1000, 500]);

    remote.calls.lock().clear();
    let entries: Vec<(String, Vec<u8>)> =
      (0..1500).map(|i| (format!("k{i}"), vec![1u8])).collect();
    handle.mset(&entries, Duration::from_secs(1)).unwrap();
    assert_eq!(remote.calls.lock().as_slice(), &[1000, 500]);
  }
}
