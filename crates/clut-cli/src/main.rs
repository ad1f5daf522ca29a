//! clut - apply color lookup tables to images
//!
//! Front end for `clut-store`: Hald images, CLF process lists and color
//! scripts applied to PNG/TIFF files.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use clut_store::{Quality, StoreSettings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "clut")]
#[command(author, version, about = "Apply color lookup tables to images")]
#[command(long_about = "
Applies Hald CLUT images, CLF process lists and color scripts to images.

Examples:
  clut hald identity.png --level 8          # Identity Hald to grade in an editor
  clut apply in.png -o out.png -c film.png  # Apply a graded Hald
  clut apply in.png -o out.png -c look.clf --strength 0.5
  clut apply in.tif -o out.tif -c tone.ctl -p 1.2 -p 0 --quality max
  clut params tone.ctl --json               # Script parameter schema
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Store settings file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base directory for relative CLUT paths
    #[arg(long, global = true)]
    clut_dir: Option<PathBuf>,

    /// Cached entries per resource kind
    #[arg(long, global = true)]
    cache_size: Option<usize>,

    /// Worker threads (0 = all cores)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a CLUT to an image
    #[command(visible_alias = "a")]
    Apply(ApplyArgs),

    /// List the parameters of a color script
    #[command(visible_alias = "p")]
    Params(ParamsArgs),

    /// Write an identity Hald image
    Hald(HaldArgs),
}

#[derive(Args)]
struct ApplyArgs {
    /// Input image (PNG or TIFF)
    input: PathBuf,

    /// Output image (PNG or TIFF, 16-bit)
    #[arg(short, long)]
    output: PathBuf,

    /// CLUT file: Hald image, .clf/.clfz or .ctl
    #[arg(short, long)]
    clut: PathBuf,

    /// Working profile of the image
    #[arg(long, default_value = clut_primaries::DEFAULT_PROFILE)]
    profile: String,

    /// Blend with the original, 0 to 1
    #[arg(short, long, default_value = "1.0")]
    strength: f32,

    /// Script accuracy: low, medium, high, max
    #[arg(short, long, default_value = "medium")]
    quality: Quality,

    /// Script parameter values, in declaration order
    #[arg(short = 'p', long = "param", allow_negative_numbers = true)]
    params: Vec<f64>,

    /// Samples are linear rather than sRGB-encoded
    #[arg(long)]
    linear: bool,
}

#[derive(Args)]
struct ParamsArgs {
    /// Color script
    script: PathBuf,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct HaldArgs {
    /// Output image (PNG or TIFF)
    output: PathBuf,

    /// Hald level (2-16); the image is level^3 pixels square
    #[arg(short, long, default_value = "8")]
    level: u32,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// File settings first, then command-line overrides.
fn store_settings(cli: &Cli) -> Result<StoreSettings> {
    let mut settings = match &cli.config {
        Some(path) => StoreSettings::from_file(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?,
        None => StoreSettings::default(),
    };
    if let Some(dir) = &cli.clut_dir {
        settings = settings.with_clut_dir(dir);
    }
    if let Some(size) = cli.cache_size {
        settings = settings.with_cache_size(size);
    }
    if cli.verbose > 0 {
        settings = settings.with_verbose(true);
    }
    Ok(settings)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = store_settings(&cli)?;

    let threads = match cli.threads {
        0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        n => n,
    };

    match cli.command {
        Commands::Apply(args) => commands::apply::run(args, settings, threads),
        Commands::Params(args) => commands::params::run(args, settings),
        Commands::Hald(args) => commands::hald::run(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "clut", "-vv", "apply", "in.png", "-o", "out.tif", "-c", "look.ctl", "-p", "1.5", "-p", "-2", "-q", "max",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.params, vec![1.5, -2.0]);
        assert_eq!(args.quality, Quality::Max);
        assert_eq!(args.profile, "sRGB");
        assert_eq!(args.strength, 1.0);
    }

    #[test]
    fn test_bad_quality() {
        assert!(Cli::try_parse_from(["clut", "apply", "a.png", "-o", "b.png", "-c", "c.png", "-q", "ultra"]).is_err());
    }

    #[test]
    fn test_flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("clut.yaml");
        std::fs::write(&config, "clut_dir: /from/file\ncache_size: 4\n").unwrap();

        let cli = Cli::try_parse_from([
            "clut",
            "--config",
            config.to_str().unwrap(),
            "--cache-size",
            "7",
            "params",
            "x.ctl",
        ])
        .unwrap();
        let s = store_settings(&cli).unwrap();
        assert_eq!(s.clut_dir, PathBuf::from("/from/file"));
        assert_eq!(s.cache_size, 7);
        assert!(!s.verbose);
    }
}
