//! Hald CLUT images.
//!
//! A Hald image of level `L` is a square raster with an edge of `L^3`
//! pixels. Read row-major it lists the `L^6 = N^3` nodes of a lattice with
//! `N = L^2` nodes per axis, red varying fastest. Samples are kept on the
//! 16-bit scale, so the lattice domain is `[0, 65535]`.
//!
//! File names may carry the profile the CLUT was authored in as a suffix
//! of the stem: `film_lookRec2020.png` is a Rec.2020 CLUT named
//! `film_look`. Without a recognized suffix the profile is sRGB.

use crate::{Lattice, LutError, LutResult};
use std::path::{Path, PathBuf};

/// Domain of Hald lattices.
pub const HALD_DOMAIN: f32 = 65535.0;

/// Profile assumed when a file name carries none.
pub const DEFAULT_HALD_PROFILE: &str = "sRGB";

/// A decoded Hald CLUT.
#[derive(Debug, Clone)]
pub struct HaldClut {
    level: u32,
    lattice: Lattice,
    profile: String,
    path: PathBuf,
}

impl HaldClut {
    /// Decodes a Hald image.
    ///
    /// `known_profiles` are the working-profile names recognized as file
    /// name suffixes. Samples are used as stored; no color conversion
    /// happens at load time.
    ///
    /// # Errors
    ///
    /// Decoding errors, or [`LutError::InvalidHald`] when the raster is not
    /// square with an edge of `L^3` for some `L >= 2`.
    pub fn load<P: AsRef<Path>>(path: P, known_profiles: &[String]) -> LutResult<Self> {
        let path = path.as_ref();
        let img = clut_io::read(path)?;

        let level = hald_level(img.width, img.height).ok_or(LutError::InvalidHald {
            width: img.width,
            height: img.height,
        })?;
        let side = (level * level) as usize;
        let lattice = Lattice::from_nodes(side, HALD_DOMAIN, (0..img.pixel_count()).map(|i| img.rgb(i)))?;

        let profile = split_clut_filename(path, known_profiles).profile;
        tracing::debug!(
            path = %path.display(),
            level,
            side,
            profile = %profile,
            "loaded Hald CLUT"
        );

        Ok(Self {
            level,
            lattice,
            profile,
            path: path.to_path_buf(),
        })
    }

    /// Wraps an in-memory lattice.
    ///
    /// # Errors
    ///
    /// [`LutError::InvalidSize`] unless the lattice has a Hald geometry:
    /// side `L^2` and domain 65535.
    pub fn from_lattice(lattice: Lattice, profile: impl Into<String>) -> LutResult<Self> {
        let level = (lattice.side() as f64).sqrt().round() as u32;
        if (level * level) as usize != lattice.side() || lattice.domain_max() != HALD_DOMAIN {
            return Err(LutError::InvalidSize(format!(
                "side {} domain {} is not a Hald lattice",
                lattice.side(),
                lattice.domain_max()
            )));
        }
        Ok(Self {
            level,
            lattice,
            profile: profile.into(),
            path: PathBuf::new(),
        })
    }

    /// Hald level `L`.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Nodes per lattice axis, `L^2`.
    pub fn side(&self) -> usize {
        self.lattice.side()
    }

    /// The sampling lattice.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Working profile the CLUT was authored in.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Batch sampling on the 16-bit scale, see [`Lattice::get_rgb`].
    #[inline]
    pub fn get_rgb(&self, strength: f32, r: &[f32], g: &[f32], b: &[f32], out_rgbx: &mut [f32]) {
        self.lattice.get_rgb(strength, r, g, b, out_rgbx);
    }
}

/// Hald level for a raster, if it has Hald geometry.
pub fn hald_level(width: u32, height: u32) -> Option<u32> {
    if width != height {
        return None;
    }
    let level = (width as f64).cbrt().round() as u32;
    (level >= 2 && level.checked_pow(3) == Some(width)).then_some(level)
}

/// Components of a CLUT file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClutFileName {
    /// Stem with any profile suffix removed.
    pub name: String,
    /// Extension without the dot.
    pub extension: String,
    /// Profile suffix, [`DEFAULT_HALD_PROFILE`] when none matched, empty
    /// for CLF and script files.
    pub profile: String,
}

/// Splits `<name>[<profile>].<ext>`.
///
/// The first of `known_profiles` that ends the stem wins. Extensions
/// starting with `clf` or `ctl` (any case) are not searched and report an
/// empty profile.
///
/// ```rust
/// use clut_lut::split_clut_filename;
///
/// let profiles = vec!["sRGB".to_string(), "Rec2020".to_string()];
/// let parts = split_clut_filename("/luts/warmRec2020.png", &profiles);
/// assert_eq!(parts.name, "warm");
/// assert_eq!(parts.profile, "Rec2020");
/// ```
pub fn split_clut_filename<P: AsRef<Path>>(path: P, known_profiles: &[String]) -> ClutFileName {
    let base = path
        .as_ref()
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (mut name, extension) = match base.rfind('.') {
        Some(dot) => (base[..dot].to_string(), base[dot + 1..].to_string()),
        None => (base.clone(), String::new()),
    };

    let ext = extension.to_ascii_lowercase();
    if ext.starts_with("clf") || ext.starts_with("ctl") {
        return ClutFileName { name, extension, profile: String::new() };
    }

    let mut profile = DEFAULT_HALD_PROFILE.to_string();
    if let Some(p) = known_profiles.iter().find(|p| !p.is_empty() && name.ends_with(p.as_str())) {
        profile = p.clone();
        name.truncate(name.len() - p.len());
    }
    ClutFileName { name, extension, profile }
}
