//! # clut-lut
//!
//! Lookup-table machinery for the CLUT engine.
//!
//! - [`Lattice`] - cubic RGB lattice with scalar and SIMD trilinear kernels
//! - [`HaldClut`] - a [`Lattice`] decoded from a Hald image, plus its profile
//! - [`split_clut_filename`] - `<name>[<profile>].<ext>` parsing
//! - [`clf`] - Common LUT Format process lists
//! - [`CpuProcessor`] - optimized evaluation of a process list
//!
//! # Usage
//!
//! ```rust
//! use clut_lut::Lattice;
//!
//! // Sample an identity lattice on the 16-bit scale
//! let lat = Lattice::identity(9, 65535.0).unwrap();
//! let r = [1000.0, 30000.0];
//! let g = [2000.0, 40000.0];
//! let b = [3000.0, 50000.0];
//! let mut out = [0.0; 8];
//! lat.get_rgb(1.0, &r, &g, &b, &mut out);
//! assert!((out[4] - 30000.0).abs() < 0.1);
//! ```
//!
//! # Dependencies
//!
//! - [`clut-math`] - Interpolation and SIMD helpers
//! - [`clut-io`] - Hald raster decoding
//! - [`wide`] - `f32x4` lattice kernel
//! - [`quick_xml`] - CLF parsing
//! - [`flate2`] - `.clfz` decompression
//! - [`thiserror`] - Error handling
//!
//! # Used By
//!
//! - `clut-store` - resource cache and application engine

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod hald;
mod lattice;
mod lut1d;
mod processor;
pub mod clf;

pub use clf::{read_clf, read_clf_bytes, ProcessList, ProcessNode};
pub use error::{LutError, LutResult};
pub use hald::{hald_level, split_clut_filename, ClutFileName, HaldClut, DEFAULT_HALD_PROFILE, HALD_DOMAIN};
pub use lattice::{Lattice, MIN_SIDE};
pub use lut1d::Lut1D;
pub use processor::CpuProcessor;
