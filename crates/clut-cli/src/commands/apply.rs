//! CLUT application command

use crate::ApplyArgs;
use anyhow::{bail, Result};
use clut_primaries::WorkingSpaces;
use clut_store::{ApplicationState, ClutApplication, ClutStore, StoreSettings};
use clut_transfer::srgb;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub fn run(args: ApplyArgs, settings: StoreSettings, threads: usize) -> Result<()> {
    let store = Arc::new(ClutStore::new(settings, Arc::new(WorkingSpaces::new())));
    super::ensure_file(&store.resolve(&args.clut), "CLUT")?;
    let mut image = super::load_image(&args.input)?;
    info!(
        input = %args.input.display(),
        width = image.width(),
        height = image.height(),
        "loaded image"
    );

    let mut app = ClutApplication::new(
        Arc::clone(&store),
        &args.clut,
        &args.profile,
        args.strength,
        threads,
        args.quality,
    );
    if app.state() == ApplicationState::Disabled {
        bail!("Unusable CLUT: {} (run with -v for details)", args.clut.display());
    }
    bind_params(&mut app, &args.params, &args.clut)?;

    if !args.linear {
        let (r, g, b) = image.planes_mut();
        for v in r.iter_mut().chain(g.iter_mut()).chain(b.iter_mut()) {
            *v = srgb::igamma_16bit(*v);
        }
    }

    let start = Instant::now();
    app.apply(&mut image);
    debug!(state = ?app.state(), elapsed_ms = start.elapsed().as_millis() as u64, "applied CLUT");

    if !args.linear {
        let (r, g, b) = image.planes_mut();
        for v in r.iter_mut().chain(g.iter_mut()).chain(b.iter_mut()) {
            *v = srgb::gamma_16bit_clipped(*v);
        }
    }

    super::save_image(&args.output, &image)?;
    info!(output = %args.output.display(), "done");
    Ok(())
}

/// Binds `-p` values. Construction already bound the defaults, so an empty
/// list leaves the application untouched.
fn bind_params(app: &mut ClutApplication, params: &[f64], clut: &Path) -> Result<()> {
    if params.is_empty() {
        return Ok(());
    }
    if !app.set_param_values(params) {
        bail!(
            "{} expects {} parameter value(s), got {}",
            clut.display(),
            app.param_descriptors().len(),
            params.len()
        );
    }
    if !app.params_bound() {
        bail!("Failed to bind parameters for {}", clut.display());
    }
    Ok(())
}
