//! # clut-math
//!
//! Math primitives for the CLUT pipeline:
//!
//! - [`Mat3`] - 3x3 matrices for working-space conversions
//! - [`Vec3`] - RGB / XYZ triplets
//! - [`adapt_matrix`] - Bradford chromatic adaptation between white points
//! - [`intp`] - the blend used by lattice sampling and strength mixing
//! - [`simd`] - 4-wide planar matrix conversion built on `wide`
//!
//! # Design
//!
//! Matrices are stored **row-major** and multiply **column vectors**:
//!
//! ```text
//! result = matrix * vector
//! ```
//!
//! # Usage
//!
//! ```rust
//! use clut_math::{Mat3, Vec3};
//!
//! let rgb_to_xyz = Mat3::from_rows([
//!     [0.4124564, 0.3575761, 0.1804375],
//!     [0.2126729, 0.7151522, 0.0721750],
//!     [0.0193339, 0.1191920, 0.9503041],
//! ]);
//! let xyz = rgb_to_xyz * Vec3::new(1.0, 1.0, 1.0);
//! assert!((xyz.y - 1.0).abs() < 1e-4);
//! ```
//!
//! # Dependencies
//!
//! - [`wide`] - Portable SIMD on stable Rust
//!
//! # Used By
//!
//! - `clut-primaries` - RGB/XYZ matrix generation
//! - `clut-lut` - lattice kernels
//! - `clut-store` - per-pixel space conversion in the application engine

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod adapt;
mod interp;
mod mat3;
mod vec3;
pub mod simd;

pub use adapt::*;
pub use interp::*;
pub use mat3::*;
pub use vec3::*;
