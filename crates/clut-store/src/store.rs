//! Resource cache.
//!
//! Three LRU caches (Hald lattices, CLF process lists and scripts) keyed by
//! resolved path, all behind one mutex. A miss loads while the lock is held,
//! so concurrent requests for the same file load it once. CLF and script
//! entries remember the md5 of the file they were built from and are
//! reloaded when the file changes.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clut_ctl::{check_entry_point, extract_params, Interpreter, ParamDescriptor, ENTRY_POINT};
use clut_lut::{read_clf_bytes, HaldClut, ProcessList};
use clut_primaries::WorkingSpaceProvider;
use lru::LruCache;
use tracing::{debug, trace, warn};

use crate::{StoreError, StoreResult, StoreSettings};

/// Resource kinds held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Decoded Hald image.
    Hald,
    /// CLF process list.
    Engine,
    /// Parsed color script.
    Script,
}

/// A cached script, ready to hand out new function calls.
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    /// Shared parsed program.
    pub interpreter: Arc<Interpreter>,
    /// Parameters declared by the entry point, in argument order.
    pub params: Vec<ParamDescriptor>,
    /// Samples evaluated per call.
    pub max_samples: usize,
}

#[derive(Debug)]
struct ScriptEntry {
    interpreter: Arc<Interpreter>,
    params: Vec<ParamDescriptor>,
    digest: md5::Digest,
}

impl ScriptEntry {
    fn handle(&self) -> ScriptHandle {
        ScriptHandle {
            interpreter: Arc::clone(&self.interpreter),
            params: self.params.clone(),
            max_samples: self.interpreter.max_samples(),
        }
    }
}

struct Caches {
    hald: LruCache<PathBuf, Arc<HaldClut>>,
    engine: LruCache<PathBuf, (Arc<ProcessList>, md5::Digest)>,
    script: LruCache<PathBuf, ScriptEntry>,
    loads: usize,
}

impl Caches {
    fn new(size: usize) -> Self {
        let cap = NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN);
        Self {
            hald: LruCache::new(cap),
            engine: LruCache::new(cap),
            script: LruCache::new(cap),
            loads: 0,
        }
    }
}

/// Shared cache of CLUT resources.
///
/// Create one per application and share it through `Arc`:
///
/// ```rust
/// use std::sync::Arc;
/// use clut_primaries::WorkingSpaces;
/// use clut_store::{ClutStore, StoreSettings};
///
/// let store = Arc::new(ClutStore::new(StoreSettings::default(), Arc::new(WorkingSpaces::new())));
/// assert!(store.get_hald_clut("missing.png").is_none());
/// assert_eq!(store.len(), 0);
/// ```
pub struct ClutStore {
    settings: StoreSettings,
    provider: Arc<dyn WorkingSpaceProvider>,
    caches: Mutex<Caches>,
}

impl fmt::Debug for ClutStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClutStore")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ClutStore {
    /// Creates an empty store.
    pub fn new(settings: StoreSettings, provider: Arc<dyn WorkingSpaceProvider>) -> Self {
        let caches = Caches::new(settings.cache_size);
        Self {
            settings,
            provider,
            caches: Mutex::new(caches),
        }
    }

    /// Store configuration.
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Working-space matrices used by engines built on this store.
    pub fn provider(&self) -> &Arc<dyn WorkingSpaceProvider> {
        &self.provider
    }

    /// Joins relative paths to the CLUT directory.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.settings.clut_dir.join(path)
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Returns the decoded Hald image at `path`, loading it on a miss.
    ///
    /// Hald entries are not digest-checked; use [`ClutStore::clear`] after
    /// editing one in place.
    pub fn get_hald_clut<P: AsRef<Path>>(&self, path: P) -> Option<Arc<HaldClut>> {
        let full = self.resolve(path);
        let mut caches = self.lock();
        if let Some(clut) = caches.hald.get(&full) {
            trace!(path = %full.display(), "Hald cache hit");
            return Some(Arc::clone(clut));
        }

        match HaldClut::load(&full, &self.provider.working_profiles()) {
            Ok(clut) => {
                let clut = Arc::new(clut);
                debug!(path = %full.display(), level = clut.level(), "cached Hald CLUT");
                caches.hald.put(full, Arc::clone(&clut));
                caches.loads += 1;
                Some(clut)
            }
            Err(e) => {
                self.report(&full, ResourceKind::Hald, &StoreError::from(e));
                None
            }
        }
    }

    /// Returns the CLF process list at `path`, reloading it when the file
    /// content changed since it was cached.
    pub fn get_engine_processor<P: AsRef<Path>>(&self, path: P) -> Option<Arc<ProcessList>> {
        let full = self.resolve(path);
        let mut caches = self.lock();
        let (digest, bytes) = match file_digest(&full) {
            Ok(d) => d,
            Err(e) => {
                self.report(&full, ResourceKind::Engine, &e);
                return None;
            }
        };

        if let Some((list, cached)) = caches.engine.get(&full) {
            if *cached == digest {
                trace!(path = %full.display(), "CLF cache hit");
                return Some(Arc::clone(list));
            }
            debug!(path = %full.display(), "CLF changed on disk, reloading");
        }

        match read_clf_bytes(&full, &bytes) {
            Ok(list) => {
                let list = Arc::new(list);
                debug!(path = %full.display(), nodes = list.nodes.len(), "cached CLF");
                caches.engine.put(full, (Arc::clone(&list), digest));
                caches.loads += 1;
                Some(list)
            }
            Err(e) => {
                caches.engine.pop(&full);
                self.report(&full, ResourceKind::Engine, &StoreError::from(e));
                None
            }
        }
    }

    /// Returns the script at `path` with its parameter schema, reloading it
    /// when the file content changed since it was cached.
    ///
    /// The script must define a valid [`ENTRY_POINT`] whose parameters all
    /// carry annotations.
    pub fn get_script<P: AsRef<Path>>(&self, path: P) -> Option<ScriptHandle> {
        let full = self.resolve(path);
        let mut caches = self.lock();
        let (digest, bytes) = match file_digest(&full) {
            Ok(d) => d,
            Err(e) => {
                self.report(&full, ResourceKind::Script, &e);
                return None;
            }
        };

        if let Some(entry) = caches.script.get(&full) {
            if entry.digest == digest {
                trace!(path = %full.display(), "script cache hit");
                return Some(entry.handle());
            }
            debug!(path = %full.display(), "script changed on disk, reloading");
        }

        match load_script(&full, bytes, digest) {
            Ok(entry) => {
                debug!(path = %full.display(), params = entry.params.len(), "cached script");
                let handle = entry.handle();
                caches.script.put(full, entry);
                caches.loads += 1;
                Some(handle)
            }
            Err(e) => {
                caches.script.pop(&full);
                self.report(&full, ResourceKind::Script, &e);
                None
            }
        }
    }

    /// Cached Hald image at `path`, without loading on a miss.
    pub fn peek_hald_clut<P: AsRef<Path>>(&self, path: P) -> Option<Arc<HaldClut>> {
        let full = self.resolve(path);
        let mut caches = self.lock();
        caches.hald.get(&full).map(Arc::clone)
    }

    /// Cached CLF process list at `path`, without loading on a miss.
    ///
    /// Returns `None` when the file no longer matches the cached digest.
    pub fn peek_engine_processor<P: AsRef<Path>>(&self, path: P) -> Option<Arc<ProcessList>> {
        let full = self.resolve(path);
        let mut caches = self.lock();
        let (list, cached) = caches.engine.get(&full)?;
        let (digest, _) = file_digest(&full).ok()?;
        (*cached == digest).then(|| Arc::clone(list))
    }

    /// Cached script at `path`, without loading on a miss.
    ///
    /// Returns `None` when the file no longer matches the cached digest.
    pub fn peek_script<P: AsRef<Path>>(&self, path: P) -> Option<ScriptHandle> {
        let full = self.resolve(path);
        let mut caches = self.lock();
        let entry = caches.script.get(&full)?;
        let (digest, _) = file_digest(&full).ok()?;
        (entry.digest == digest).then(|| entry.handle())
    }

    /// Parameter schema of the script at `path`; empty when it does not
    /// load.
    pub fn script_param_descriptors<P: AsRef<Path>>(&self, path: P) -> Vec<ParamDescriptor> {
        self.get_script(path).map(|h| h.params).unwrap_or_default()
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Drops every cached resource. Handles already given out stay valid.
    pub fn clear(&self) {
        let mut caches = self.lock();
        caches.hald.clear();
        caches.engine.clear();
        caches.script.clear();
        debug!("cleared CLUT caches");
    }

    /// Successful loads since the store was created.
    pub fn load_count(&self) -> usize {
        self.lock().loads
    }

    /// Whether `path` is cached as `kind`. Does not refresh recency.
    pub fn contains<P: AsRef<Path>>(&self, kind: ResourceKind, path: P) -> bool {
        let full = self.resolve(path);
        let caches = self.lock();
        match kind {
            ResourceKind::Hald => caches.hald.contains(&full),
            ResourceKind::Engine => caches.engine.contains(&full),
            ResourceKind::Script => caches.script.contains(&full),
        }
    }

    /// Total entries across all kinds.
    pub fn len(&self) -> usize {
        let caches = self.lock();
        caches.hald.len() + caches.engine.len() + caches.script.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Caches> {
        // cache state stays consistent across a panicking loader
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, path: &Path, kind: ResourceKind, err: &StoreError) {
        if self.settings.verbose {
            warn!(path = %path.display(), ?kind, error = %err, "failed to load CLUT");
        } else {
            debug!(path = %path.display(), ?kind, error = %err, "failed to load CLUT");
        }
    }
}

fn file_digest(path: &Path) -> StoreResult<(md5::Digest, Vec<u8>)> {
    if !path.is_file() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    Ok((md5::compute(&bytes), bytes))
}

fn load_script(path: &Path, bytes: Vec<u8>, digest: md5::Digest) -> StoreResult<ScriptEntry> {
    let source = String::from_utf8(bytes).map_err(|_| StoreError::Encoding(path.to_path_buf()))?;
    let interpreter = Arc::new(Interpreter::load_source(path.display().to_string(), &source)?);
    let call = interpreter.new_function_call(ENTRY_POINT)?;
    check_entry_point(&call)?;
    let params = extract_params(interpreter.source(), &call)?;
    Ok(ScriptEntry {
        interpreter,
        params,
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clut_primaries::WorkingSpaces;

    fn store(dir: &Path) -> ClutStore {
        ClutStore::new(
            StoreSettings::default().with_clut_dir(dir),
            Arc::new(WorkingSpaces::new()),
        )
    }

    #[test]
    fn test_resolve() {
        let s = store(Path::new("/cluts"));
        assert_eq!(s.resolve("a.png"), PathBuf::from("/cluts/a.png"));
        let abs = std::env::temp_dir().join("b.png");
        assert_eq!(s.resolve(&abs), abs);
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let s = ClutStore::new(StoreSettings::default().with_cache_size(0), Arc::new(WorkingSpaces::new()));
        assert_eq!(s.lock().hald.cap().get(), 1);
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        assert!(s.get_hald_clut("none.png").is_none());
        assert!(s.get_engine_processor("none.clf").is_none());
        assert!(s.get_script("none.ctl").is_none());
        assert!(s.script_param_descriptors("none.ctl").is_empty());
        assert!(s.is_empty());
        assert_eq!(s.load_count(), 0);
    }

    #[test]
    fn test_directory_is_not_a_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub.ctl")).unwrap();
        let s = store(dir.path());
        assert!(s.get_script("sub.ctl").is_none());
    }

    #[test]
    fn test_script_without_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.ctl"), "float f(float x) { return x; }").unwrap();
        let s = store(dir.path());
        assert!(s.get_script("f.ctl").is_none());
        assert!(!s.contains(ResourceKind::Script, "f.ctl"));
    }
}
