//! End-to-end tests of ClutApplication on generated CLUT files.

use std::path::Path;
use std::sync::Arc;

use approx::assert_relative_eq;
use clut_core::PlanarImage;
use clut_primaries::WorkingSpaces;
use clut_store::{ApplicationState, ClutApplication, ClutStore, Quality, StoreSettings};

const GAIN_SCRIPT: &str = r#"
// @ART-param: ["gain", "Gain", 0.0, 4.0, 1.0]
void ART_main(varying float r, varying float g, varying float b,
              output varying float rout, output varying float gout, output varying float bout,
              float gain)
{
    rout = r * gain;
    gout = g * gain;
    bout = b * gain;
}
"#;

const LEVEL_SCRIPT: &str = r#"
// @ART-param: ["level", "Level", 0.0, 1.0, 0.25]
void ART_main(varying float r, varying float g, varying float b,
              output varying float rout, output varying float gout, output varying float bout,
              float level)
{
    rout = level;
    gout = level;
    bout = level;
}
"#;

const FAILING_SCRIPT: &str = r#"
void ART_main(varying float r, varying float g, varying float b,
              output varying float rout, output varying float gout, output varying float bout)
{
    int zero = 0;
    int k = 1 / zero;
    rout = r;
    gout = g;
    bout = b;
}
"#;

const HALF_CLF: &str = r#"<?xml version="1.0"?>
<ProcessList id="half" compCLFversion="3">
  <Matrix inBitDepth="32f" outBitDepth="32f">
    <Array dim="3 3">0.5 0 0  0 0.5 0  0 0 0.5</Array>
  </Matrix>
</ProcessList>"#;

const IDENTITY_CLF: &str = r#"<?xml version="1.0"?>
<ProcessList id="noop" compCLFversion="3">
  <Range inBitDepth="32f" outBitDepth="32f"/>
</ProcessList>"#;

fn fixtures() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path();
    clut_io::hald::write_identity_png(p.join("id.png"), 4).unwrap();
    clut_io::hald::write_identity_png(p.join("idProPhoto.png"), 4).unwrap();
    std::fs::write(p.join("gain.ctl"), GAIN_SCRIPT).unwrap();
    std::fs::write(p.join("level.ctl"), LEVEL_SCRIPT).unwrap();
    std::fs::write(p.join("fail.ctl"), FAILING_SCRIPT).unwrap();
    std::fs::write(p.join("half.clf"), HALF_CLF).unwrap();
    std::fs::write(p.join("noop.clf"), IDENTITY_CLF).unwrap();
    dir
}

fn store(dir: &Path) -> Arc<ClutStore> {
    Arc::new(ClutStore::new(
        StoreSettings::default().with_clut_dir(dir),
        Arc::new(WorkingSpaces::new()),
    ))
}

/// Smooth in-gamut gradient on the 16-bit scale, wider than one tile.
fn gradient(width: usize, height: usize) -> PlanarImage {
    let mut img = PlanarImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let t = x as f32 / (width - 1) as f32;
            let s = y as f32 / (height - 1).max(1) as f32;
            img.set_pixel(x, y, [500.0 + 60000.0 * t, 2000.0 + 50000.0 * s, 30000.0 - 20000.0 * t * s])
                .unwrap();
        }
    }
    img
}

fn assert_images_close(a: &PlanarImage, b: &PlanarImage, rel: f32, abs: f32) {
    for y in 0..a.height() {
        for x in 0..a.width() {
            let (pa, pb) = (a.pixel(x, y), b.pixel(x, y));
            for c in 0..3 {
                let tol = abs + rel * pb[c].abs();
                assert!(
                    (pa[c] - pb[c]).abs() <= tol,
                    "({}, {}) channel {}: {} vs {}",
                    x,
                    y,
                    c,
                    pa[c],
                    pb[c]
                );
            }
        }
    }
}

// ============================================================================
// Backend selection
// ============================================================================

#[test]
fn test_backend_selection() {
    let dir = fixtures();
    let store = store(dir.path());

    let app = |name: &str| ClutApplication::new(Arc::clone(&store), name, "sRGB", 1.0, 1, Quality::Max);
    assert_eq!(app("id.png").state(), ApplicationState::NativeReady);
    assert_eq!(app("half.clf").state(), ApplicationState::EngineReady);
    assert_eq!(app("gain.ctl").state(), ApplicationState::ScriptReady);
    assert_eq!(app("missing.png").state(), ApplicationState::Disabled);

    assert!(app("gain.ctl").params_bound());
    assert!(!app("id.png").params_bound());
    assert!(!app("missing.png").is_ok());
}

#[test]
fn test_disabled_is_noop() {
    let dir = fixtures();
    let app = ClutApplication::new(store(dir.path()), "nothing.ctl", "sRGB", 1.0, 2, Quality::Low);
    assert!(!app.is_ok());
    assert!(app.param_descriptors().is_empty());

    let mut img = gradient(40, 3);
    let before = img.clone();
    app.apply(&mut img);
    let mut row = before.r().to_vec();
    let (mut g, mut b) = (before.g().to_vec(), before.b().to_vec());
    app.apply_row(0, &mut row, &mut g, &mut b);
    assert_eq!(img, before);
    assert_eq!(row, before.r());
}

#[test]
fn test_strength_clamped() {
    let dir = fixtures();
    let store = store(dir.path());
    assert_eq!(ClutApplication::new(Arc::clone(&store), "id.png", "sRGB", 2.5, 1, Quality::Max).strength(), 1.0);
    assert_eq!(ClutApplication::new(store, "id.png", "sRGB", -1.0, 1, Quality::Max).strength(), 0.0);
}

#[test]
fn test_applications_share_cache() {
    let dir = fixtures();
    let store = store(dir.path());
    let _a = ClutApplication::new(Arc::clone(&store), "gain.ctl", "sRGB", 1.0, 2, Quality::Max);
    let _b = ClutApplication::new(Arc::clone(&store), "gain.ctl", "sRGB", 0.5, 4, Quality::Low);
    // one script load; the Hald and CLF attempts fail and are not counted
    assert_eq!(store.load_count(), 1);
}

#[test]
fn test_clear_cache_keeps_application_working() {
    let dir = fixtures();
    let store = store(dir.path());
    let app = ClutApplication::new(Arc::clone(&store), "half.clf", "sRGB", 1.0, 1, Quality::Max);
    assert_eq!(store.len(), 1);
    app.clear_cache();
    assert!(store.is_empty());

    let mut img = PlanarImage::filled(2, 2, [10000.0, 10000.0, 10000.0]);
    app.apply(&mut img);
    assert_relative_eq!(img.pixel(1, 1)[1], 5000.0, max_relative = 1e-3);
}

// ============================================================================
// Strength
// ============================================================================

#[test]
fn test_zero_strength_is_identity() {
    let dir = fixtures();
    let store = store(dir.path());
    for name in ["id.png", "idProPhoto.png", "half.clf", "gain.ctl", "level.ctl"] {
        let app = ClutApplication::new(Arc::clone(&store), name, "sRGB", 0.0, 2, Quality::Low);
        assert!(app.is_ok(), "{}", name);
        let mut img = gradient(130, 4);
        let before = img.clone();
        app.apply(&mut img);
        assert_eq!(img, before, "{}", name);
    }
}

#[test]
fn test_identity_hald_full_strength() {
    let dir = fixtures();
    let app = ClutApplication::new(store(dir.path()), "id.png", "sRGB", 1.0, 1, Quality::Max);
    let mut img = gradient(250, 5);
    let before = img.clone();
    app.apply(&mut img);
    assert_images_close(&img, &before, 2e-3, 4.0);
}

#[test]
fn test_identity_hald_other_profile() {
    let dir = fixtures();
    let app = ClutApplication::new(store(dir.path()), "idProPhoto.png", "sRGB", 1.0, 1, Quality::Max);
    let mut img = gradient(120, 3);
    let before = img.clone();
    app.apply(&mut img);
    assert_images_close(&img, &before, 5e-3, 8.0);
}

#[test]
fn test_partial_strength_blends() {
    let dir = fixtures();
    let store = store(dir.path());
    let full = ClutApplication::new(Arc::clone(&store), "half.clf", "sRGB", 1.0, 1, Quality::Max);
    let part = ClutApplication::new(store, "half.clf", "sRGB", 0.5, 1, Quality::Max);

    let src = PlanarImage::filled(3, 1, [40000.0, 20000.0, 10000.0]);
    let mut a = src.clone();
    let mut b = src.clone();
    full.apply(&mut a);
    part.apply(&mut b);
    // halved, then blended halfway back
    assert_relative_eq!(a.pixel(0, 0)[0], 20000.0, max_relative = 1e-3);
    assert_relative_eq!(b.pixel(0, 0)[0], 30000.0, max_relative = 1e-3);
    assert_relative_eq!(b.pixel(2, 0)[2], 7500.0, max_relative = 1e-3);
}

// ============================================================================
// CLF engine
// ============================================================================

#[test]
fn test_engine_identity() {
    let dir = fixtures();
    for profile in ["sRGB", "Rec2020"] {
        let app = ClutApplication::new(store(dir.path()), "noop.clf", profile, 1.0, 1, Quality::Max);
        let mut img = gradient(50, 2);
        let before = img.clone();
        app.apply(&mut img);
        assert_images_close(&img, &before, 1e-4, 0.5);
    }
}

#[test]
fn test_engine_apply_row_matches_apply() {
    let dir = fixtures();
    let app = ClutApplication::new(store(dir.path()), "half.clf", "sRGB", 0.7, 1, Quality::Max);
    let mut img = gradient(64, 1);
    let (mut r, mut g, mut b) = (img.r().to_vec(), img.g().to_vec(), img.b().to_vec());
    app.apply(&mut img);
    app.apply_row(0, &mut r, &mut g, &mut b);
    assert_eq!(img.r(), &r[..]);
    assert_eq!(img.g(), &g[..]);
    assert_eq!(img.b(), &b[..]);
}

// ============================================================================
// Scripts
// ============================================================================

#[test]
fn test_script_per_pixel() {
    let dir = fixtures();
    let app = ClutApplication::new(store(dir.path()), "gain.ctl", "sRGB", 1.0, 1, Quality::Max);
    assert_eq!(app.param_values(), &[1.0]);
    let mut img = gradient(40, 2);
    let before = img.clone();
    app.apply(&mut img);
    assert_images_close(&img, &before, 1e-4, 0.5);
}

#[test]
fn test_script_baked_close_to_per_pixel() {
    let dir = fixtures();
    let store = store(dir.path());
    let exact = ClutApplication::new(Arc::clone(&store), "gain.ctl", "sRGB", 1.0, 1, Quality::Max);
    let baked = ClutApplication::new(store, "gain.ctl", "sRGB", 1.0, 1, Quality::Low);

    let mut a = gradient(60, 3);
    let mut b = a.clone();
    exact.apply(&mut a);
    baked.apply(&mut b);
    assert_images_close(&b, &a, 0.05, 20.0);
}

#[test]
fn test_param_binding() {
    let dir = fixtures();
    let mut app = ClutApplication::new(store(dir.path()), "level.ctl", "sRGB", 1.0, 3, Quality::Max);
    assert_eq!(app.param_descriptors().len(), 1);
    assert_eq!(app.param_descriptors()[0].value_default, 0.25);

    let mut img = gradient(20, 6);
    app.apply(&mut img);
    assert_relative_eq!(img.pixel(7, 3)[1], 0.25 * 65535.0, max_relative = 1e-3);

    assert!(app.set_param_values(&[0.75]));
    assert!(app.params_bound());
    let mut img = gradient(20, 6);
    app.apply(&mut img);
    for c in 0..3 {
        assert_relative_eq!(img.pixel(19, 5)[c], 0.75 * 65535.0, max_relative = 1e-3);
    }

    // wrong arity is rejected and the previous binding survives
    assert!(!app.set_param_values(&[0.1, 0.2]));
    assert_eq!(app.param_values(), &[0.75]);
    let mut img = gradient(20, 6);
    app.apply(&mut img);
    assert_relative_eq!(img.pixel(0, 0)[0], 0.75 * 65535.0, max_relative = 1e-3);

    // empty restores defaults
    assert!(app.set_param_values(&[]));
    assert_eq!(app.param_values(), &[0.25]);
}

#[test]
fn test_param_values_without_script() {
    let dir = fixtures();
    let mut app = ClutApplication::new(store(dir.path()), "id.png", "sRGB", 1.0, 1, Quality::Max);
    assert!(app.set_param_values(&[]));
    assert!(!app.set_param_values(&[1.0]));
}

#[test]
fn test_script_runtime_error_leaves_image() {
    let dir = fixtures();
    let app = ClutApplication::new(store(dir.path()), "fail.ctl", "sRGB", 1.0, 2, Quality::Max);
    assert_eq!(app.state(), ApplicationState::ScriptReady);
    let mut img = gradient(30, 4);
    let before = img.clone();
    app.apply(&mut img);
    assert_eq!(img, before);
}

#[test]
fn test_failing_bake_is_unbound() {
    let dir = fixtures();
    let app = ClutApplication::new(store(dir.path()), "fail.ctl", "sRGB", 1.0, 1, Quality::Low);
    assert_eq!(app.state(), ApplicationState::ScriptReady);
    assert!(!app.params_bound());
}

// ============================================================================
// Threads
// ============================================================================

#[test]
fn test_thread_count_does_not_change_output() {
    let dir = fixtures();
    let store = store(dir.path());
    for (name, quality) in [
        ("idProPhoto.png", Quality::Max),
        ("half.clf", Quality::Max),
        ("gain.ctl", Quality::Max),
        ("gain.ctl", Quality::Low),
    ] {
        let one = ClutApplication::new(Arc::clone(&store), name, "sRGB", 0.8, 1, quality);
        let four = ClutApplication::new(Arc::clone(&store), name, "sRGB", 0.8, 4, quality);
        let mut a = gradient(300, 17);
        let mut b = a.clone();
        one.apply(&mut a);
        four.apply(&mut b);
        assert_eq!(a, b, "{}", name);
    }
}

#[test]
fn test_apply_is_idempotent_per_call() {
    let dir = fixtures();
    let app = ClutApplication::new(store(dir.path()), "gain.ctl", "Rec2020", 1.0, 4, Quality::Max);
    let mut a = gradient(90, 9);
    let mut b = a.clone();
    app.apply(&mut a);
    app.apply(&mut b);
    assert_eq!(a, b);
}
