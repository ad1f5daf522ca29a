//! Applying a cached CLUT to images.
//!
//! [`ClutApplication`] picks a backend for a CLUT file once, at
//! construction, in this order:
//!
//! 1. **Native**: a Hald image sampled with the lattice kernel in its own
//!    profile, through the sRGB curve.
//! 2. **Engine**: a CLF process list evaluated in ACES AP0 on `[0, 1]`.
//! 3. **Script**: the `ART_main` function of a color script, also in AP0,
//!    either per pixel or through a lattice baked from it.
//!
//! When nothing loads the application is disabled and every `apply` is a
//! no-op.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use clut_core::{PlanarImage, RowMut, WHITE};
use clut_ctl::{CtlResult, FunctionCall, ParamDescriptor, ENTRY_POINT};
use clut_lut::{CpuProcessor, HaldClut, Lattice};
use clut_math::simd::{transform_planes, Mat3x4};
use clut_math::{intp, Mat3};
use clut_primaries::{pcs_to_rgb_matrix, rgb_to_pcs_matrix, ACES_AP0};
use clut_transfer::{pq, srgb};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{ClutStore, StoreResult};

/// Columns processed per chunk by the native backend.
pub const TILE_SIZE: usize = 112;

/// Accuracy of script evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    /// 32 nodes per axis baked lattice.
    Low,
    /// 96 nodes per axis baked lattice.
    #[default]
    Medium,
    /// 144 nodes per axis baked lattice.
    High,
    /// Script evaluated for every pixel.
    Max,
}

impl Quality {
    /// Baked lattice side, or `None` for per-pixel evaluation.
    pub fn lattice_side(self) -> Option<usize> {
        match self {
            Self::Low => Some(32),
            Self::Medium => Some(96),
            Self::High => Some(144),
            Self::Max => None,
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "max" => Ok(Self::Max),
            _ => Err(format!("unknown quality '{}' (low, medium, high, max)", s)),
        }
    }
}

/// Lifecycle of a [`ClutApplication`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationState {
    /// Backend selection has not run.
    Uninitialized,
    /// No backend could load the file.
    Disabled,
    /// Hald lattice ready.
    NativeReady,
    /// CLF processor ready.
    EngineReady,
    /// Script contexts ready.
    ScriptReady,
}

// ============================================================================
// Backends
// ============================================================================

/// Working RGB to AP0 and back, the latter on the 16-bit scale.
#[derive(Debug, Clone, Copy)]
struct ReferenceMatrices {
    conv: Mat3,
    iconv: Mat3,
}

impl ReferenceMatrices {
    fn new(to_xyz: Mat3, from_xyz: Mat3) -> Self {
        Self {
            conv: pcs_to_rgb_matrix(&ACES_AP0) * to_xyz,
            iconv: (from_xyz * rgb_to_pcs_matrix(&ACES_AP0)) * WHITE,
        }
    }
}

/// Working profile to Hald profile and back.
#[derive(Debug, Clone, Copy)]
struct ProfileConversion {
    to_clut: Mat3,
    to_clut4: Mat3x4,
    to_work: Mat3,
    to_work4: Mat3x4,
}

#[derive(Debug)]
struct NativeBackend {
    clut: Arc<HaldClut>,
    conversion: Option<ProfileConversion>,
}

#[derive(Debug)]
struct EngineBackend {
    processor: CpuProcessor,
    m: ReferenceMatrices,
}

#[derive(Debug)]
struct ScriptBackend {
    /// One call context per worker; worker `i` only touches slot `i`.
    contexts: Vec<Mutex<FunctionCall>>,
    params: Vec<ParamDescriptor>,
    values: Vec<f64>,
    bound: bool,
    max_samples: usize,
    lattice: Option<Lattice>,
    m: ReferenceMatrices,
}

#[derive(Debug)]
enum Backend {
    Native(NativeBackend),
    Engine(EngineBackend),
    Script(ScriptBackend),
}

// ============================================================================
// Application
// ============================================================================

/// A CLUT bound to a working profile, strength and thread budget.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use clut_core::PlanarImage;
/// use clut_primaries::WorkingSpaces;
/// use clut_store::{ClutApplication, ClutStore, Quality, StoreSettings};
///
/// let store = Arc::new(ClutStore::new(StoreSettings::default(), Arc::new(WorkingSpaces::new())));
/// let app = ClutApplication::new(store, "film.png", "sRGB", 0.8, 4, Quality::Medium);
/// let mut img = PlanarImage::filled(64, 64, [20000.0, 30000.0, 40000.0]);
/// app.apply(&mut img);
/// ```
#[derive(Debug)]
pub struct ClutApplication {
    store: Arc<ClutStore>,
    path: PathBuf,
    working_profile: String,
    strength: f32,
    quality: Quality,
    num_threads: usize,
    pool: Option<rayon::ThreadPool>,
    backend: Option<Backend>,
    state: ApplicationState,
}

impl ClutApplication {
    /// Loads `path` through `store` and prepares the first backend that
    /// accepts it.
    ///
    /// `strength` is clamped to `[0, 1]`. `num_threads > 1` gives the
    /// application its own worker pool of that size.
    pub fn new<P: AsRef<Path>>(
        store: Arc<ClutStore>,
        path: P,
        working_profile: &str,
        strength: f32,
        num_threads: usize,
        quality: Quality,
    ) -> Self {
        let num_threads = num_threads.max(1);
        let pool = if num_threads > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(num_threads).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(error = %e, "failed to build worker pool, running single-threaded");
                    None
                }
            }
        } else {
            None
        };

        let mut app = Self {
            store,
            path: path.as_ref().to_path_buf(),
            working_profile: working_profile.to_string(),
            strength: if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) },
            quality,
            num_threads,
            pool,
            backend: None,
            state: ApplicationState::Uninitialized,
        };
        app.init();
        app
    }

    fn init(&mut self) {
        self.backend = self
            .init_native()
            .or_else(|| self.init_engine())
            .or_else(|| self.init_script());
        self.state = match &self.backend {
            None => ApplicationState::Disabled,
            Some(Backend::Native(_)) => ApplicationState::NativeReady,
            Some(Backend::Engine(_)) => ApplicationState::EngineReady,
            Some(Backend::Script(_)) => ApplicationState::ScriptReady,
        };

        if self.state == ApplicationState::Disabled {
            if self.store.settings().verbose {
                warn!(path = %self.path.display(), "no backend accepts CLUT, application disabled");
            } else {
                debug!(path = %self.path.display(), "no backend accepts CLUT, application disabled");
            }
        } else {
            debug!(
                path = %self.path.display(),
                state = ?self.state,
                profile = %self.working_profile,
                strength = self.strength,
                threads = self.num_threads,
                "CLUT application ready"
            );
        }
    }

    fn reference_matrices(&self) -> ReferenceMatrices {
        let provider = self.store.provider();
        ReferenceMatrices::new(
            provider.working_space_matrix(&self.working_profile),
            provider.working_space_inverse_matrix(&self.working_profile),
        )
    }

    fn init_native(&self) -> Option<Backend> {
        let clut = self.store.get_hald_clut(&self.path)?;
        let conversion = (clut.profile() != self.working_profile).then(|| {
            let provider = self.store.provider();
            let to_clut = provider.working_space_inverse_matrix(clut.profile())
                * provider.working_space_matrix(&self.working_profile);
            let to_work = provider.working_space_inverse_matrix(&self.working_profile)
                * provider.working_space_matrix(clut.profile());
            ProfileConversion {
                to_clut,
                to_clut4: Mat3x4::splat(&to_clut),
                to_work,
                to_work4: Mat3x4::splat(&to_work),
            }
        });
        Some(Backend::Native(NativeBackend { clut, conversion }))
    }

    fn init_engine(&self) -> Option<Backend> {
        let list = self.store.get_engine_processor(&self.path)?;
        Some(Backend::Engine(EngineBackend {
            processor: CpuProcessor::new(&list),
            m: self.reference_matrices(),
        }))
    }

    fn init_script(&self) -> Option<Backend> {
        let handle = self.store.get_script(&self.path)?;
        let mut contexts = Vec::with_capacity(self.num_threads);
        for _ in 0..self.num_threads {
            match handle.interpreter.new_function_call(ENTRY_POINT) {
                Ok(call) => contexts.push(Mutex::new(call)),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "cannot create script context");
                    return None;
                }
            }
        }
        let mut backend = ScriptBackend {
            contexts,
            values: handle.params.iter().map(|p| p.value_default).collect(),
            params: handle.params,
            bound: false,
            max_samples: handle.max_samples,
            lattice: None,
            m: self.reference_matrices(),
        };
        if let Err(e) = backend.bind(&[], self.quality) {
            warn!(path = %self.path.display(), error = %e, "cannot bind default script parameters");
        }
        Some(Backend::Script(backend))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// True when a backend is ready.
    pub fn is_ok(&self) -> bool {
        self.backend.is_some()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ApplicationState {
        self.state
    }

    /// True when script parameters are bound to every context. Always false
    /// for other backends.
    pub fn params_bound(&self) -> bool {
        matches!(&self.backend, Some(Backend::Script(s)) if s.bound)
    }

    /// Blend factor in `[0, 1]`.
    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Script evaluation quality.
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// The CLUT file as given at construction.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Working profile of the images this application processes.
    pub fn working_profile(&self) -> &str {
        &self.working_profile
    }

    /// Script parameter schema; empty for other backends.
    pub fn param_descriptors(&self) -> &[ParamDescriptor] {
        match &self.backend {
            Some(Backend::Script(s)) => &s.params,
            _ => &[],
        }
    }

    /// Currently bound script parameter values; empty for other backends.
    pub fn param_values(&self) -> &[f64] {
        match &self.backend {
            Some(Backend::Script(s)) => &s.values,
            _ => &[],
        }
    }

    /// Binds script parameter values, one per descriptor; an empty slice
    /// restores the defaults.
    ///
    /// Returns false, leaving the bound values unchanged, for a non-empty
    /// slice of the wrong length. Without a script backend only an empty
    /// slice is accepted.
    pub fn set_param_values(&mut self, values: &[f64]) -> bool {
        let quality = self.quality;
        let Some(Backend::Script(script)) = &mut self.backend else {
            return values.is_empty();
        };
        if !values.is_empty() && values.len() != script.params.len() {
            let msg = if values.len() < script.params.len() {
                "not enough parameter values"
            } else {
                "too many parameter values"
            };
            if self.store.settings().verbose {
                warn!(path = %self.path.display(), expected = script.params.len(), got = values.len(), "{}", msg);
            } else {
                debug!(path = %self.path.display(), expected = script.params.len(), got = values.len(), "{}", msg);
            }
            return false;
        }
        match script.bind(values, quality) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "script parameter binding failed");
                false
            }
        }
    }

    /// Empties the shared store.
    pub fn clear_cache(&self) {
        self.store.clear();
    }

    // ========================================================================
    // Processing
    // ========================================================================

    /// Applies the CLUT to `img` in place.
    ///
    /// `img` holds working-profile linear RGB on the `[0, 65535]` scale.
    /// Rows run on the application's pool when it has one. A script that
    /// fails at run time leaves `img` untouched.
    pub fn apply(&self, img: &mut PlanarImage) {
        if self.strength <= 0.0 {
            return;
        }
        let Some(backend) = &self.backend else {
            return;
        };
        let result = match backend {
            Backend::Native(native) => self.for_each_row(img, |row| {
                self.native_row(native, row.r, row.g, row.b);
                Ok(())
            }),
            Backend::Engine(engine) => self.for_each_row(img, |row| {
                self.engine_row(engine, row.r, row.g, row.b);
                Ok(())
            }),
            Backend::Script(script) => {
                let mut staged = img.clone();
                let result = self.for_each_row(&mut staged, |row| match &script.lattice {
                    Some(lattice) => {
                        self.baked_row(script, lattice, row.r, row.g, row.b);
                        Ok(())
                    }
                    None => {
                        let slot = self.worker_index() % script.contexts.len();
                        let mut call = script.contexts[slot].lock().unwrap_or_else(PoisonError::into_inner);
                        self.script_row(script, &mut call, row.r, row.g, row.b)
                    }
                });
                if result.is_ok() {
                    *img = staged;
                }
                result
            }
        };
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "script failed, image left unchanged");
        }
    }

    /// Applies the CLUT to one strip of pixels.
    ///
    /// For callers that split images themselves; `thread_id` selects the
    /// script context and must be unique among concurrent callers. Scripts
    /// are evaluated per pixel here regardless of quality.
    pub fn apply_row(&self, thread_id: usize, r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
        if self.strength <= 0.0 {
            return;
        }
        let n = r.len().min(g.len()).min(b.len());
        let (r, g, b) = (&mut r[..n], &mut g[..n], &mut b[..n]);
        match &self.backend {
            None => {}
            Some(Backend::Native(native)) => self.native_row(native, r, g, b),
            Some(Backend::Engine(engine)) => self.engine_row(engine, r, g, b),
            Some(Backend::Script(script)) => {
                let slot = thread_id % script.contexts.len();
                let mut call = script.contexts[slot].lock().unwrap_or_else(PoisonError::into_inner);
                if let Err(e) = self.script_row(script, &mut call, r, g, b) {
                    warn!(path = %self.path.display(), error = %e, "script failed, row left unchanged");
                }
            }
        }
    }

    fn for_each_row<F>(&self, img: &mut PlanarImage, f: F) -> CtlResult<()>
    where
        F: Fn(RowMut<'_>) -> CtlResult<()> + Send + Sync,
    {
        match &self.pool {
            Some(pool) => pool.install(|| img.par_rows_mut().try_for_each(&f)),
            None => img.rows_mut().try_for_each(f),
        }
    }

    fn worker_index(&self) -> usize {
        self.pool.as_ref().and_then(|p| p.current_thread_index()).unwrap_or(0)
    }

    fn native_row(&self, native: &NativeBackend, r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
        let mut cr = [0.0f32; TILE_SIZE];
        let mut cg = [0.0f32; TILE_SIZE];
        let mut cb = [0.0f32; TILE_SIZE];
        let mut out = [0.0f32; 4 * TILE_SIZE];

        for start in (0..r.len()).step_by(TILE_SIZE) {
            let end = (start + TILE_SIZE).min(r.len());
            let n = end - start;
            let (tr, tg, tb) = (&mut cr[..n], &mut cg[..n], &mut cb[..n]);
            tr.copy_from_slice(&r[start..end]);
            tg.copy_from_slice(&g[start..end]);
            tb.copy_from_slice(&b[start..end]);

            if let Some(c) = &native.conversion {
                transform_planes(&c.to_clut, &c.to_clut4, tr, tg, tb);
            }
            srgb::gamma_16bit_clipped_slice(tr);
            srgb::gamma_16bit_clipped_slice(tg);
            srgb::gamma_16bit_clipped_slice(tb);

            native.clut.get_rgb(self.strength, tr, tg, tb, &mut out[..4 * n]);

            for (j, px) in out[..4 * n].chunks_exact(4).enumerate() {
                tr[j] = srgb::igamma_16bit(px[0]);
                tg[j] = srgb::igamma_16bit(px[1]);
                tb[j] = srgb::igamma_16bit(px[2]);
            }
            if let Some(c) = &native.conversion {
                transform_planes(&c.to_work, &c.to_work4, tr, tg, tb);
            }

            r[start..end].copy_from_slice(tr);
            g[start..end].copy_from_slice(tg);
            b[start..end].copy_from_slice(tb);
        }
    }

    fn engine_row(&self, engine: &EngineBackend, r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
        let mut packed = Vec::with_capacity(r.len() * 3);
        for x in 0..r.len() {
            packed.extend_from_slice(&engine.m.conv.apply(r[x] / WHITE, g[x] / WHITE, b[x] / WHITE));
        }
        engine.processor.apply_packed(&mut packed);
        for (x, px) in packed.chunks_exact(3).enumerate() {
            let v = engine.m.iconv.apply(px[0], px[1], px[2]);
            self.store_blended(v, x, r, g, b);
        }
    }

    fn baked_row(&self, script: &ScriptBackend, lattice: &Lattice, r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
        let shape = |v: f32| pq::shaper(v).clamp(0.0, 1.0);
        for x in 0..r.len() {
            let v = script.m.conv.apply(r[x] / WHITE, g[x] / WHITE, b[x] / WHITE);
            let s = lattice.sample([shape(v[0]), shape(v[1]), shape(v[2])]);
            let v = script.m.iconv.apply(s[0], s[1], s[2]);
            self.store_blended(v, x, r, g, b);
        }
    }

    fn script_row(
        &self,
        script: &ScriptBackend,
        call: &mut FunctionCall,
        r: &mut [f32],
        g: &mut [f32],
        b: &mut [f32],
    ) -> CtlResult<()> {
        let mut rgb: [Vec<f32>; 3] = std::array::from_fn(|_| Vec::with_capacity(r.len()));
        for x in 0..r.len() {
            let v = script.m.conv.apply(r[x] / WHITE, g[x] / WHITE, b[x] / WHITE);
            for c in 0..3 {
                rgb[c].push(v[c]);
            }
        }
        evaluate(call, &mut rgb, script.max_samples)?;
        for x in 0..r.len() {
            let v = script.m.iconv.apply(rgb[0][x], rgb[1][x], rgb[2][x]);
            self.store_blended(v, x, r, g, b);
        }
        Ok(())
    }

    #[inline]
    fn store_blended(&self, v: [f32; 3], x: usize, r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
        if self.strength < 1.0 {
            r[x] = intp(self.strength, v[0], r[x]);
            g[x] = intp(self.strength, v[1], g[x]);
            b[x] = intp(self.strength, v[2], b[x]);
        } else {
            r[x] = v[0];
            g[x] = v[1];
            b[x] = v[2];
        }
    }
}

impl ScriptBackend {
    /// Binds `values` (or the defaults when empty) into every context, then
    /// rebakes the lattice for `quality`. The length was checked by the
    /// caller.
    fn bind(&mut self, values: &[f64], quality: Quality) -> StoreResult<()> {
        let values: Vec<f64> = if values.is_empty() {
            self.params.iter().map(|p| p.value_default).collect()
        } else {
            values.to_vec()
        };

        self.bound = false;
        for ctx in &self.contexts {
            let mut call = ctx.lock().unwrap_or_else(PoisonError::into_inner);
            for (i, (param, v)) in self.params.iter().zip(&values).enumerate() {
                call.set_uniform(i + 3, param.to_value(*v))?;
            }
        }
        self.values = values;

        self.lattice = None;
        if let Some(side) = quality.lattice_side() {
            self.lattice = Some(self.bake(side)?);
        }
        self.bound = true;
        Ok(())
    }

    /// Samples the script on a `side^3` grid spaced evenly on the shaper
    /// axis.
    fn bake(&self, side: usize) -> StoreResult<Lattice> {
        let axis: Vec<f32> = (0..side)
            .map(|i| pq::shaper_inverse(i as f32 / (side - 1) as f32))
            .collect();
        let total = side * side * side;
        let mut rgb: [Vec<f32>; 3] = std::array::from_fn(|_| Vec::with_capacity(total));
        for &bv in &axis {
            for &gv in &axis {
                for &rv in &axis {
                    rgb[0].push(rv);
                    rgb[1].push(gv);
                    rgb[2].push(bv);
                }
            }
        }

        let Some(ctx) = self.contexts.first() else {
            return Ok(Lattice::identity(side, 1.0)?);
        };
        let mut call = ctx.lock().unwrap_or_else(PoisonError::into_inner);
        evaluate(&mut call, &mut rgb, self.max_samples)?;
        debug!(side, "baked script lattice");

        let nodes = (0..total).map(|i| [rgb[0][i], rgb[1][i], rgb[2][i]]);
        Ok(Lattice::from_nodes(side, 1.0, nodes)?)
    }
}

/// Runs the entry point over `rgb` in batches, replacing inputs with
/// outputs.
fn evaluate(call: &mut FunctionCall, rgb: &mut [Vec<f32>; 3], batch: usize) -> CtlResult<()> {
    let len = rgb[0].len();
    let batch = batch.max(1);
    let mut start = 0;
    while start < len {
        let n = batch.min(len - start);
        for (c, plane) in rgb.iter().enumerate() {
            call.input_data_mut(c)[..n].copy_from_slice(&plane[start..start + n]);
        }
        call.call(n)?;
        for (c, plane) in rgb.iter_mut().enumerate() {
            plane[start..start + n].copy_from_slice(&call.output_data(c)[..n]);
        }
        start += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_sides() {
        assert_eq!(Quality::Low.lattice_side(), Some(32));
        assert_eq!(Quality::Medium.lattice_side(), Some(96));
        assert_eq!(Quality::High.lattice_side(), Some(144));
        assert_eq!(Quality::Max.lattice_side(), None);
        assert_eq!(Quality::default(), Quality::Medium);
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!("LOW".parse::<Quality>(), Ok(Quality::Low));
        assert_eq!("max".parse::<Quality>(), Ok(Quality::Max));
        assert!("ultra".parse::<Quality>().is_err());
    }

    #[test]
    fn test_reference_roundtrip() {
        // working -> AP0 -> working is the identity, scaled to 16 bits
        let m = ReferenceMatrices::new(Mat3::IDENTITY, Mat3::IDENTITY);
        let v = m.conv.apply(0.2, 0.4, 0.6);
        let w = m.iconv.apply(v[0], v[1], v[2]);
        assert!((w[0] - 0.2 * WHITE).abs() < 0.5);
        assert!((w[1] - 0.4 * WHITE).abs() < 0.5);
        assert!((w[2] - 0.6 * WHITE).abs() < 0.5);
    }
}
