//! # clut-primaries
//!
//! Color primaries, RGB-XYZ matrix generation, and the matrix provider the
//! CLUT engine consults for working-space conversions.
//!
//! # Profile Connection Space
//!
//! Every matrix handed out by a [`WorkingSpaceProvider`] converts between a
//! named RGB working space and **D50 XYZ**. Spaces defined under another
//! white are Bradford adapted, so two providers' matrices compose:
//!
//! ```text
//! working RGB --working_space_matrix--> XYZ(D50) --inverse(other)--> other RGB
//! ```
//!
//! # Included Working Spaces
//!
//! | Profile | Primaries | Native white |
//! |---------|-----------|--------------|
//! | `sRGB` | Rec.709 | D65 |
//! | `Adobe RGB` | Adobe 1998 | D65 |
//! | `ProPhoto` | ROMM | D50 |
//! | `WideGamut` | Adobe Wide Gamut | D50 |
//! | `Rec2020` | BT.2020 | D65 |
//! | `DCI-P3` | DCI-P3 | DCI |
//! | `ACESp0` | ACES AP0 | D60 |
//! | `ACESp1` | ACES AP1 | D60 |
//!
//! # Usage
//!
//! ```rust
//! use clut_primaries::{WorkingSpaceProvider, WorkingSpaces};
//! use clut_math::Vec3;
//!
//! let spaces = WorkingSpaces::new();
//! let to_xyz = spaces.working_space_matrix("Rec2020");
//! let white = to_xyz * Vec3::ONE;
//! assert!((white.y - 1.0).abs() < 1e-3);
//! ```
//!
//! # Dependencies
//!
//! - [`clut-math`] - Matrix operations and chromatic adaptation
//!
//! # Used By
//!
//! - `clut-lut` - filename profile detection
//! - `clut-store` - engine matrix precomputation

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod provider;

pub use provider::{WorkingSpaceProvider, WorkingSpaces, DEFAULT_PROFILE};

use clut_math::{adapt_matrix, xy_to_xyz, Mat3, Vec3, BRADFORD, D50};

/// RGB color space primaries definition.
///
/// Primaries and white point as CIE xy chromaticities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primaries {
    /// Red primary (x, y) chromaticity
    pub r: (f32, f32),
    /// Green primary (x, y) chromaticity
    pub g: (f32, f32),
    /// Blue primary (x, y) chromaticity
    pub b: (f32, f32),
    /// White point (x, y) chromaticity
    pub w: (f32, f32),
    /// Color space name
    pub name: &'static str,
}

impl Primaries {
    /// White point as XYZ (Y=1).
    #[inline]
    pub fn white_xyz(&self) -> Vec3 {
        xy_to_xyz(self.w.0, self.w.1)
    }
}

// ============================================================================
// Standard White Points
// ============================================================================

/// D65 white point chromaticity.
pub const D65_XY: (f32, f32) = (0.31270, 0.32900);

/// D50 white point chromaticity.
pub const D50_XY: (f32, f32) = (0.34567, 0.35850);

/// D60 white point chromaticity (ACES).
pub const D60_XY: (f32, f32) = (0.32168, 0.33767);

/// DCI white point chromaticity.
pub const DCI_XY: (f32, f32) = (0.31400, 0.35100);

// ============================================================================
// Standard Color Space Primaries
// ============================================================================

/// sRGB / Rec.709 primaries.
pub const SRGB: Primaries = Primaries {
    r: (0.6400, 0.3300),
    g: (0.3000, 0.6000),
    b: (0.1500, 0.0600),
    w: D65_XY,
    name: "sRGB",
};

/// Adobe RGB (1998) primaries.
pub const ADOBE_RGB: Primaries = Primaries {
    r: (0.6400, 0.3300),
    g: (0.2100, 0.7100),
    b: (0.1500, 0.0600),
    w: D65_XY,
    name: "Adobe RGB",
};

/// ProPhoto RGB (ROMM) primaries.
pub const PROPHOTO_RGB: Primaries = Primaries {
    r: (0.7347, 0.2653),
    g: (0.1596, 0.8404),
    b: (0.0366, 0.0001),
    w: D50_XY,
    name: "ProPhoto",
};

/// Adobe Wide Gamut RGB primaries.
pub const WIDE_GAMUT: Primaries = Primaries {
    r: (0.7347, 0.2653),
    g: (0.1152, 0.8264),
    b: (0.1566, 0.0177),
    w: D50_XY,
    name: "WideGamut",
};

/// ITU-R BT.2020 primaries.
pub const REC2020: Primaries = Primaries {
    r: (0.7080, 0.2920),
    g: (0.1700, 0.7970),
    b: (0.1310, 0.0460),
    w: D65_XY,
    name: "Rec2020",
};

/// DCI-P3 primaries with the DCI projector white.
pub const DCI_P3: Primaries = Primaries {
    r: (0.6800, 0.3200),
    g: (0.2650, 0.6900),
    b: (0.1500, 0.0600),
    w: DCI_XY,
    name: "DCI-P3",
};

/// ACES AP0 primaries (ACES2065-1).
pub const ACES_AP0: Primaries = Primaries {
    r: (0.7347, 0.2653),
    g: (0.0000, 1.0000),
    b: (0.0001, -0.0770),
    w: D60_XY,
    name: "ACESp0",
};

/// ACES AP1 primaries (ACEScg).
pub const ACES_AP1: Primaries = Primaries {
    r: (0.713, 0.293),
    g: (0.165, 0.830),
    b: (0.128, 0.044),
    w: D60_XY,
    name: "ACESp1",
};

// ============================================================================
// Matrix Generation
// ============================================================================

/// Computes the RGB to XYZ matrix under the primaries' own white.
///
/// Columns are the primaries' XYZ, scaled so RGB white maps to the white
/// point.
///
/// ```rust
/// use clut_primaries::{SRGB, rgb_to_xyz_matrix};
/// use clut_math::Vec3;
///
/// let white = rgb_to_xyz_matrix(&SRGB) * Vec3::ONE;
/// assert!((white.y - 1.0).abs() < 0.001);
/// ```
pub fn rgb_to_xyz_matrix(primaries: &Primaries) -> Mat3 {
    let r = xy_to_xyz(primaries.r.0, primaries.r.1);
    let g = xy_to_xyz(primaries.g.0, primaries.g.1);
    let b = xy_to_xyz(primaries.b.0, primaries.b.1);
    let w = primaries.white_xyz();

    let m = Mat3::from_col_vecs(r, g, b);
    let s = m.inverse().unwrap_or(Mat3::IDENTITY) * w;
    Mat3::from_col_vecs(r * s.x, g * s.y, b * s.z)
}

/// Computes the XYZ to RGB matrix, the inverse of [`rgb_to_xyz_matrix`].
pub fn xyz_to_rgb_matrix(primaries: &Primaries) -> Mat3 {
    rgb_to_xyz_matrix(primaries).inverse().unwrap_or(Mat3::IDENTITY)
}

/// RGB to D50 XYZ, Bradford adapted from the primaries' white.
pub fn rgb_to_pcs_matrix(primaries: &Primaries) -> Mat3 {
    adapt_matrix(BRADFORD, primaries.white_xyz(), D50) * rgb_to_xyz_matrix(primaries)
}

/// D50 XYZ to RGB, the inverse of [`rgb_to_pcs_matrix`].
pub fn pcs_to_rgb_matrix(primaries: &Primaries) -> Mat3 {
    rgb_to_pcs_matrix(primaries).inverse().unwrap_or(Mat3::IDENTITY)
}
