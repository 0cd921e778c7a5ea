//! Content-addressed caching of rendered math fragments.
//!
//! Provides [`FragmentKey`] for computing cache keys, the [`FragmentCache`]
//! storage trait with a no-op and a directory-backed implementation, and
//! [`CachedRenderer`], which puts a cache in front of any [`MathRenderer`].

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::RenderError;
use crate::renderer::{MathRenderer, RenderOptions};

/// Parameters that determine a rendered fragment.
#[derive(Debug, Clone, Copy)]
pub struct FragmentKey<'a> {
    /// Renderer identifier (see [`MathRenderer::name`]).
    pub renderer: &'a str,
    /// Whether display mode was requested.
    pub display_mode: bool,
    /// Math source.
    pub tex: &'a str,
}

impl FragmentKey<'_> {
    /// Compute a content hash for this key.
    ///
    /// SHA-256 of `"{renderer}:{display|inline}:{tex}"`, hex-encoded.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let mode = if self.display_mode { "display" } else { "inline" };
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{mode}:{}", self.renderer, self.tex).as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Storage for rendered fragments, keyed by [`FragmentKey::compute_hash`].
pub trait FragmentCache: Send + Sync {
    /// Retrieve a cached fragment.
    fn get(&self, hash: &str) -> Option<String>;

    /// Store a fragment. Failures are logged, never returned.
    fn set(&self, hash: &str, fragment: &str);
}

/// No-op [`FragmentCache`]: every lookup misses, every store is discarded.
pub struct NullFragmentCache;

impl FragmentCache for NullFragmentCache {
    fn get(&self, _hash: &str) -> Option<String> {
        None
    }

    fn set(&self, _hash: &str, _fragment: &str) {}
}

/// [`FragmentCache`] storing one file per fragment under a directory.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- VERSION          # cache version string
/// +-- 3f/
///     +-- 3fa9...e1    # fragment, named by its hash
/// ```
pub struct DirFragmentCache {
    root: PathBuf,
}

impl DirFragmentCache {
    /// Open a cache at `root`, wiping it if its `VERSION` differs from `version`.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        validate_version(&root, version);
        Self { root }
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        let shard = hash.get(..2).unwrap_or(hash);
        self.root.join(shard).join(hash)
    }
}

impl FragmentCache for DirFragmentCache {
    fn get(&self, hash: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(hash)).ok()
    }

    fn set(&self, hash: &str, fragment: &str) {
        let path = self.entry_path(hash);
        let Some(parent) = path.parent() else {
            return;
        };
        if let Err(e) = fs::create_dir_all(parent) {
            tracing::warn!(path = %parent.display(), "failed to create cache directory: {e}");
            return;
        }
        if let Err(e) = fs::write(&path, fragment) {
            tracing::warn!(path = %path.display(), "failed to write cache entry: {e}");
        }
    }
}

/// Validate the cache version, wiping the directory on mismatch.
fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("math cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "math cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
        }
        Err(_) => {
            tracing::info!("no math cache VERSION file found, initializing cache");
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove math cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create math cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write math cache VERSION file: {e}");
    }
}

/// [`MathRenderer`] that consults a [`FragmentCache`] before rendering.
///
/// Only successful renders are cached.
pub struct CachedRenderer<R> {
    inner: R,
    cache: Box<dyn FragmentCache>,
}

impl<R: MathRenderer> CachedRenderer<R> {
    /// Wrap `inner` with `cache`.
    #[must_use]
    pub fn new(inner: R, cache: Box<dyn FragmentCache>) -> Self {
        Self { inner, cache }
    }
}

impl<R: MathRenderer> MathRenderer for CachedRenderer<R> {
    fn render(&self, tex: &str, options: RenderOptions) -> Result<String, RenderError> {
        let hash = FragmentKey {
            renderer: self.inner.name(),
            display_mode: options.display_mode,
            tex,
        }
        .compute_hash();

        if let Some(fragment) = self.cache.get(&hash) {
            tracing::debug!(%hash, "math cache hit");
            return Ok(fragment);
        }

        let fragment = self.inner.render(tex, options)?;
        self.cache.set(&hash, &fragment);
        Ok(fragment)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
