//! Cache behaviour of ClutStore against files generated on disk.

use std::path::Path;
use std::sync::Arc;

use clut_ctl::ParamType;
use clut_primaries::WorkingSpaces;
use clut_store::{ClutStore, ResourceKind, StoreSettings};

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

const TWO_PARAM_SCRIPT: &str = r#"
// @ART-param: ["gain", "Gain", 0.0, 4.0, 1.0]
// @ART-param: ["invert", "Invert", false]
void ART_main(varying float r, varying float g, varying float b,
              output varying float rout, output varying float gout, output varying float bout,
              float gain, bool invert)
{
    rout = r * gain;
    gout = g * gain;
    bout = b * gain;
}
"#;

fn clf(scale: f32) -> String {
    format!(
        r#"<?xml version="1.0"?>
<ProcessList id="scale" compCLFversion="3">
  <Matrix inBitDepth="32f" outBitDepth="32f">
    <Array dim="3 3">{s} 0 0  0 {s} 0  0 0 {s}</Array>
  </Matrix>
</ProcessList>"#,
        s = scale
    )
}

fn store(dir: &Path, cache_size: usize) -> ClutStore {
    let settings = StoreSettings::default().with_clut_dir(dir).with_cache_size(cache_size);
    ClutStore::new(settings, Arc::new(WorkingSpaces::new()))
}

#[test]
fn test_hald_load_is_cached() {
    let dir = tempfile::tempdir().unwrap();
    clut_io::hald::write_identity_png(dir.path().join("id.png"), 2).unwrap();
    let store = store(dir.path(), 10);

    let a = store.get_hald_clut("id.png").unwrap();
    let b = store.get_hald_clut("id.png").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(store.load_count(), 1);
    assert_eq!(a.level(), 2);
    assert_eq!(a.profile(), "sRGB");
    assert!(store.contains(ResourceKind::Hald, "id.png"));

    // absolute and relative spellings share one entry
    let c = store.get_hald_clut(dir.path().join("id.png")).unwrap();
    assert!(Arc::ptr_eq(&a, &c));
    assert_eq!(store.load_count(), 1);
}

#[test]
fn test_hald_profile_from_name() {
    let dir = tempfile::tempdir().unwrap();
    clut_io::hald::write_identity_png(dir.path().join("GoldProPhoto.png"), 2).unwrap();
    let store = store(dir.path(), 10);
    assert_eq!(store.get_hald_clut("GoldProPhoto.png").unwrap().profile(), "ProPhoto");
}

#[test]
fn test_non_hald_image_rejected() {
    let dir = tempfile::tempdir().unwrap();
    clut_io::png::write_rgb16(dir.path().join("flat.png"), 5, 5, &[0u16; 75]).unwrap();
    let store = store(dir.path(), 10);
    assert!(store.get_hald_clut("flat.png").is_none());
    assert!(store.is_empty());
}

#[test]
fn test_lru_eviction() {
    let dir = tempfile::tempdir().unwrap();
    clut_io::hald::write_identity_png(dir.path().join("a.png"), 2).unwrap();
    clut_io::hald::write_identity_png(dir.path().join("b.png"), 2).unwrap();
    let store = store(dir.path(), 1);

    store.get_hald_clut("a.png").unwrap();
    store.get_hald_clut("b.png").unwrap();
    assert!(!store.contains(ResourceKind::Hald, "a.png"));
    assert!(store.contains(ResourceKind::Hald, "b.png"));

    store.get_hald_clut("a.png").unwrap();
    assert_eq!(store.load_count(), 3);
}

#[test]
fn test_clf_cached_until_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scale.clf");
    std::fs::write(&path, clf(2.0)).unwrap();
    let store = store(dir.path(), 10);

    let a = store.get_engine_processor("scale.clf").unwrap();
    let b = store.get_engine_processor("scale.clf").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(store.load_count(), 1);

    std::fs::write(&path, clf(3.0)).unwrap();
    let c = store.get_engine_processor("scale.clf").unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(store.load_count(), 2);

    let mut rgb = [1.0, 1.0, 1.0];
    c.apply(&mut rgb);
    assert!((rgb[0] - 3.0).abs() < 1e-6);
    // the old handle is still usable
    let mut rgb = [1.0, 1.0, 1.0];
    a.apply(&mut rgb);
    assert!((rgb[0] - 2.0).abs() < 1e-6);
}

#[test]
fn test_invalid_clf_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.clf"), "<ProcessList id=\"x\"><Matrix>").unwrap();
    let store = store(dir.path(), 10);
    assert!(store.get_engine_processor("bad.clf").is_none());
    assert!(!store.contains(ResourceKind::Engine, "bad.clf"));
    assert_eq!(store.load_count(), 0);
}

#[test]
fn test_script_cached_until_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gain.ctl");
    std::fs::write(&path, GAIN_SCRIPT).unwrap();
    let store = store(dir.path(), 10);

    let a = store.get_script("gain.ctl").unwrap();
    let b = store.get_script("gain.ctl").unwrap();
    assert!(Arc::ptr_eq(&a.interpreter, &b.interpreter));
    assert_eq!(store.load_count(), 1);
    assert_eq!(a.params.len(), 1);
    assert_eq!(a.max_samples, clut_ctl::MAX_SAMPLES);

    std::fs::write(&path, TWO_PARAM_SCRIPT).unwrap();
    let c = store.get_script("gain.ctl").unwrap();
    assert!(!Arc::ptr_eq(&a.interpreter, &c.interpreter));
    assert_eq!(store.load_count(), 2);
    assert_eq!(c.params.len(), 2);
    assert_eq!(c.params[1].param_type, ParamType::Bool);
}

#[test]
fn test_broken_rewrite_drops_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gain.ctl");
    std::fs::write(&path, GAIN_SCRIPT).unwrap();
    let store = store(dir.path(), 10);
    assert!(store.get_script("gain.ctl").is_some());

    std::fs::write(&path, "void ART_main(").unwrap();
    assert!(store.get_script("gain.ctl").is_none());
    assert!(!store.contains(ResourceKind::Script, "gain.ctl"));
}

#[test]
fn test_script_param_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gain.ctl"), GAIN_SCRIPT).unwrap();
    let unannotated = GAIN_SCRIPT.replace("// @ART-param: [\"gain\", \"Gain\", 0.0, 4.0, 1.0]", "");
    std::fs::write(dir.path().join("bare.ctl"), unannotated).unwrap();
    let store = store(dir.path(), 10);

    let params = store.script_param_descriptors("gain.ctl");
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "gain");
    assert_eq!(params[0].gui_name, "Gain");
    assert_eq!(params[0].value_default, 1.0);
    assert!((params[0].gui_step - 0.04).abs() < 1e-12);

    assert!(store.script_param_descriptors("bare.ctl").is_empty());
}

#[test]
fn test_clear() {
    let dir = tempfile::tempdir().unwrap();
    clut_io::hald::write_identity_png(dir.path().join("id.png"), 2).unwrap();
    std::fs::write(dir.path().join("gain.ctl"), GAIN_SCRIPT).unwrap();
    std::fs::write(dir.path().join("scale.clf"), clf(2.0)).unwrap();
    let store = store(dir.path(), 10);

    let hald = store.get_hald_clut("id.png").unwrap();
    store.get_script("gain.ctl").unwrap();
    store.get_engine_processor("scale.clf").unwrap();
    assert_eq!(store.len(), 3);

    store.clear();
    assert!(store.is_empty());
    assert_eq!(hald.side(), 4);

    let again = store.get_hald_clut("id.png").unwrap();
    assert!(!Arc::ptr_eq(&hald, &again));
    assert_eq!(store.load_count(), 4);
}

#[test]
fn test_concurrent_lookups_load_once() {
    let dir = tempfile::tempdir().unwrap();
    clut_io::hald::write_identity_png(dir.path().join("id.png"), 3).unwrap();
    let store = Arc::new(store(dir.path(), 10));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.get_hald_clut("id.png").unwrap())
        })
        .collect();
    let cluts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(cluts.iter().all(|c| Arc::ptr_eq(c, &cluts[0])));
    assert_eq!(store.load_count(), 1);
}

#[test]
fn test_deeply_nested_script_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let depth = 5000;
    let src = format!(
        "void ART_main(varying float r, varying float g, varying float b,
                       output varying float rout, output varying float gout, output varying float bout)
         {{ rout = {}r{}; gout = g; bout = b; }}",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    std::fs::write(dir.path().join("deep.ctl"), src).unwrap();
    let store = store(dir.path(), 10);

    assert!(store.get_script("deep.ctl").is_none());
    assert!(!store.contains(ResourceKind::Script, "deep.ctl"));
    assert_eq!(store.load_count(), 0);

    // the store stays usable afterwards
    std::fs::write(dir.path().join("gain.ctl"), GAIN_SCRIPT).unwrap();
    assert!(store.get_script("gain.ctl").is_some());
}

#[test]
fn test_peek_never_loads() {
    let dir = tempfile::tempdir().unwrap();
    clut_io::hald::write_identity_png(dir.path().join("id.png"), 2).unwrap();
    std::fs::write(dir.path().join("gain.ctl"), GAIN_SCRIPT).unwrap();
    std::fs::write(dir.path().join("scale.clf"), clf(2.0)).unwrap();
    let store = store(dir.path(), 10);

    assert!(store.peek_hald_clut("id.png").is_none());
    assert!(store.peek_engine_processor("scale.clf").is_none());
    assert!(store.peek_script("gain.ctl").is_none());
    assert!(store.peek_script("missing.ctl").is_none());
    assert_eq!(store.load_count(), 0);
    assert!(store.is_empty());

    let hald = store.get_hald_clut("id.png").unwrap();
    let list = store.get_engine_processor("scale.clf").unwrap();
    let script = store.get_script("gain.ctl").unwrap();

    assert!(Arc::ptr_eq(&store.peek_hald_clut("id.png").unwrap(), &hald));
    assert!(Arc::ptr_eq(&store.peek_engine_processor("scale.clf").unwrap(), &list));
    assert!(Arc::ptr_eq(&store.peek_script("gain.ctl").unwrap().interpreter, &script.interpreter));
    assert_eq!(store.load_count(), 3);
}

#[test]
fn test_peek_stale_digest() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gain.ctl"), GAIN_SCRIPT).unwrap();
    std::fs::write(dir.path().join("scale.clf"), clf(2.0)).unwrap();
    let store = store(dir.path(), 10);
    store.get_engine_processor("scale.clf").unwrap();
    store.get_script("gain.ctl").unwrap();

    std::fs::write(dir.path().join("scale.clf"), clf(3.0)).unwrap();
    std::fs::write(dir.path().join("gain.ctl"), TWO_PARAM_SCRIPT).unwrap();
    assert!(store.peek_engine_processor("scale.clf").is_none());
    assert!(store.peek_script("gain.ctl").is_none());
    assert_eq!(store.load_count(), 2);

    // a deleted file cannot be validated either
    std::fs::remove_file(dir.path().join("scale.clf")).unwrap();
    assert!(store.peek_engine_processor("scale.clf").is_none());
}

#[test]
fn test_compressed_clf() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(clf(2.0).as_bytes()).unwrap();
    std::fs::write(dir.path().join("scale.clfz"), enc.finish().unwrap()).unwrap();
    let store = store(dir.path(), 10);

    let list = store.get_engine_processor("scale.clfz").unwrap();
    let mut rgb = [0.5, 0.25, 1.0];
    list.apply(&mut rgb);
    approx::assert_abs_diff_eq!(rgb[0], 1.0, epsilon = 1e-6);
    approx::assert_abs_diff_eq!(rgb[2], 2.0, epsilon = 1e-6);
    assert!(store.peek_engine_processor("scale.clfz").is_some());
}
