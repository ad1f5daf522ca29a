//! # clut-core
//!
//! Core types shared by every crate of the CLUT pipeline.
//!
//! - [`PlanarImage`] - float image stored as three separate R, G, B planes
//! - [`RowMut`] - mutable view of one image row, the unit of parallel work
//! - [`Error`] / [`Result`] - buffer and geometry errors
//!
//! ## Value Range
//!
//! Pixel values follow the 16-bit convention of the surrounding pipeline:
//! `0.0` is black and `65535.0` is nominal white. Values outside that range
//! are legal (scene-referred data) and are preserved wherever possible.
//!
//! ## Crate Structure
//!
//! ```text
//! clut-core (this crate)
//!    ^
//!    |
//!    +-- clut-lut (lattices, CLF processors)
//!    +-- clut-io (Hald image decoding)
//!    +-- clut-store (resource cache, application engine)
//! ```
//!
//! # Dependencies
//!
//! - [`rayon`] - Parallel row iteration
//! - [`thiserror`] - Error derive

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod image;

pub use error::*;
pub use image::*;

/// Value of nominal white in the 16-bit float convention.
pub const WHITE: f32 = 65535.0;

/// Prelude module for convenient imports.
///
/// ```
/// use clut_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::image::{PlanarImage, RowMut};
    pub use crate::WHITE;
}
