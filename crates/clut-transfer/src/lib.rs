//! # clut-transfer
//!
//! Transfer functions (OETF/EOTF) used around lattice lookups.
//!
//! | Module | Use | Range |
//! |--------|-----|-------|
//! | [`srgb`] | Encoding before a Hald lookup, decoding after | [0, 1] and [0, 65535] |
//! | [`pq`] | Shaper indexing baked script lattices | [0, 10000] cd/m2, [0, 100] relative |
//!
//! Hald images are identity permutations of a gamma-encoded cube, so linear
//! pixels are sRGB-encoded before sampling and decoded afterwards. Baked
//! script lattices cover scene-linear AP0 data, which PQ spreads evenly over
//! the unit cube.
//!
//! # Usage
//!
//! ```rust
//! use clut_transfer::{pq, srgb};
//!
//! let encoded = srgb::gamma_16bit_clipped(32768.0);
//! let linear = srgb::igamma_16bit(encoded);
//! assert!((linear - 32768.0).abs() < 0.5);
//!
//! let x = pq::shaper(0.18);
//! assert!((pq::shaper_inverse(x) - 0.18).abs() < 1e-4);
//! ```
//!
//! # Used By
//!
//! - `clut-store` - native and script backends of the application engine

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod pq;
pub mod srgb;
