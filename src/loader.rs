use crate::error::{BoxError, CacheError, Result};
use crate::metrics::Metrics;
use crate::options::Resolved;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fills a single missing key from the source of truth.
pub type LoaderFn<V> =
  Arc<dyn Fn(&str) -> std::result::Result<V, BoxError> + Send + Sync>;

/// Fills a batch of missing keys from the source of truth. Keys the source
/// does not know are simply absent from the returned map.
pub type MultiLoaderFn<V> =
  Arc<dyn Fn(&[String]) -> std::result::Result<HashMap<String, V>, BoxError> + Send + Sync>;

/// What the composed loader produced for a missing key.
pub(crate) enum LoadOutcome<V> {
  /// A real value, from the remote tier or the user loader.
  Loaded(Arc<V>),
  /// The user loader failed and the configured default stood in.
  Defaulted(Arc<V>),
}

/// The composed single-key loader: remote tier first, then the user loader
/// with write-through, then the configured default.
///
/// `Ok(None)` means no loading path is configured at all; the caller reports
/// a plain miss. Remote read failures fall through to the user loader; a
/// missing codec and remote write-through failures are surfaced.
pub(crate) fn load_one<V: Send + Sync>(
  o: &Resolved<V>,
  key: &str,
  metrics: &Metrics,
) -> Result<Option<LoadOutcome<V>>> {
  if o.loader.is_none() && !o.remote.is_configured() {
    return Ok(None);
  }

  match remote_get(o, key) {
    Ok(Some(value)) => {
      Metrics::incr(&metrics.loads);
      return Ok(Some(LoadOutcome::Loaded(Arc::new(value))));
    }
    Ok(None) => {}
    Err(err) if err.is_unconfigured() => {}
    Err(CacheError::CodecRequired) => return Err(CacheError::CodecRequired),
    Err(err) => {
      debug!(key, error = %err, "remote read failed, falling through to loader");
    }
  }

  let loader = match &o.loader {
    Some(f) => f,
    // Remote-only lookup missed.
    None => return Ok(None),
  };

  match loader(key) {
    Ok(value) => {
      let value = Arc::new(value);
      write_through(o, key, &value)?;
      Metrics::incr(&metrics.loads);
      Ok(Some(LoadOutcome::Loaded(value)))
    }
    Err(err) => {
      Metrics::incr(&metrics.load_failures);
      match &o.default_value {
        Some(default) => {
          debug!(key, error = %err, "loader failed, serving the default value");
          Metrics::incr(&metrics.defaults_served);
          Ok(Some(LoadOutcome::Defaulted(default.clone())))
        }
        None => Err(CacheError::Loader(err)),
      }
    }
  }
}

/// The composed batch loader behind `mget`: remote mget fills what it can,
/// the user multi-loader covers the remainder, and its results are written
/// back to the remote tier.
///
/// `None` means no loading path is configured. This path never surfaces an
/// error; a failed user load or write-back leaves the affected keys out of
/// the result.
pub(crate) fn load_many<V: Send + Sync>(
  o: &Resolved<V>,
  keys: &[String],
  metrics: &Metrics,
) -> Option<HashMap<String, Arc<V>>> {
  if o.multi_loader.is_none() && !o.remote.is_configured() {
    return None;
  }

  let mut found: HashMap<String, Arc<V>> = HashMap::new();
  match remote_mget(o, keys) {
    Ok(values) => {
      for (key, value) in values {
        found.insert(key, Arc::new(value));
      }
    }
    Err(err) if err.is_unconfigured() => {}
    Err(err) => {
      debug!(error = %err, "remote mget failed, falling through to loader");
    }
  }
  metrics
    .loads
    .fetch_add(found.len() as u64, std::sync::atomic::Ordering::Relaxed);

  let loader = match &o.multi_loader {
    Some(f) => f,
    None => return Some(found),
  };

  let remaining: Vec<String> = keys
    .iter()
    .filter(|key| !found.contains_key(*key))
    .cloned()
    .collect();
  if remaining.is_empty() {
    return Some(found);
  }

  match loader(&remaining) {
    Ok(loaded) => {
      if let Err(err) = write_back_many(o, &loaded) {
        warn!(error = %err, "remote write-back failed, dropping loaded values");
        return None;
      }
      metrics
        .loads
        .fetch_add(loaded.len() as u64, std::sync::atomic::Ordering::Relaxed);
      for (key, value) in loaded {
        found.insert(key, Arc::new(value));
      }
    }
    Err(err) => {
      Metrics::incr(&metrics.load_failures);
      warn!(error = %err, "multi-loader failed");
    }
  }
  Some(found)
}

fn remote_get<V>(o: &Resolved<V>, key: &str) -> Result<Option<V>> {
  let bytes = match o.remote.get(key)? {
    Some(bytes) => bytes,
    None => return Ok(None),
  };
  let decode = o.decode.as_ref().ok_or(CacheError::CodecRequired)?;
  decode(&bytes).map(Some).map_err(CacheError::Remote)
}

fn remote_mget<V>(o: &Resolved<V>, keys: &[String]) -> Result<HashMap<String, V>> {
  let payloads = o.remote.mget(keys)?;
  if payloads.is_empty() {
    return Ok(HashMap::new());
  }
  let decode = o.decode.as_ref().ok_or(CacheError::CodecRequired)?;

  let mut out = HashMap::new();
  for (key, bytes) in payloads {
    // A payload this process cannot decode is treated as absent.
    match decode(&bytes) {
      Ok(value) => {
        out.insert(key, value);
      }
      Err(err) => debug!(key, error = %err, "undecodable remote payload skipped"),
    }
  }
  Ok(out)
}

/// Writes a freshly loaded value to the remote tier, ignoring only the
/// unconfigured signal.
fn write_through<V>(o: &Resolved<V>, key: &str, value: &Arc<V>) -> Result<()> {
  if !o.remote.is_configured() {
    return Ok(());
  }
  let encode = o.encode.as_ref().ok_or(CacheError::CodecRequired)?;
  let bytes = encode(value).map_err(CacheError::Remote)?;
  match o.remote.set(key, &bytes, o.ttl) {
    Err(err) if !err.is_unconfigured() => Err(err),
    _ => Ok(()),
  }
}

fn write_back_many<V>(o: &Resolved<V>, values: &HashMap<String, V>) -> Result<()> {
  if !o.remote.is_configured() || values.is_empty() {
    return Ok(());
  }
  let encode = o.encode.as_ref().ok_or(CacheError::CodecRequired)?;

  let mut entries = Vec::with_capacity(values.len());
  for (key, value) in values {
    entries.push((key.clone(), encode(value).map_err(CacheError::Remote)?));
  }
  match o.remote.mset(&entries, o.ttl) {
    Err(err) if !err.is_unconfigured() => Err(err),
    _ => Ok(()),
  }
}
