//! # clut-store
//!
//! Cached CLUT resources and the engine that applies them.
//!
//! - [`ClutStore`] - LRU cache of Hald lattices, CLF process lists and
//!   color scripts, md5-checked against the files they came from
//! - [`ClutApplication`] - applies one CLUT to planar images through the
//!   native, CLF or script backend
//! - [`StoreSettings`] - YAML-loadable store configuration
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clut_core::PlanarImage;
//! use clut_primaries::WorkingSpaces;
//! use clut_store::{ClutApplication, ClutStore, Quality, StoreSettings};
//!
//! let settings = StoreSettings::from_file("clut.yaml").unwrap_or_default();
//! let store = Arc::new(ClutStore::new(settings, Arc::new(WorkingSpaces::new())));
//!
//! let mut app = ClutApplication::new(store, "look.ctl", "Rec2020", 1.0, 8, Quality::High);
//! for p in app.param_descriptors() {
//!     println!("{} = {}", p.name, p.value_default);
//! }
//! app.set_param_values(&[0.5, 1.0]);
//!
//! let mut img = PlanarImage::filled(1920, 1080, [18000.0, 18000.0, 18000.0]);
//! app.apply(&mut img);
//! ```
//!
//! # Dependencies
//!
//! - [`clut-lut`] - Lattices, Hald loading, CLF processing
//! - [`clut-ctl`] - Script interpreter and parameter schema
//! - [`clut-primaries`] - Working-space matrices
//! - [`lru`] - Bounded caches
//! - [`md5`] - Change detection for cached files
//! - [`rayon`] - Per-application worker pools
//! - [`serde_yaml`] - Settings files
//! - [`tracing`] - Cache and backend diagnostics
//!
//! # Used By
//!
//! - `clut-cli` - Command-line front end

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod application;
mod error;
mod settings;
mod store;

pub use application::{ApplicationState, ClutApplication, Quality, TILE_SIZE};
pub use error::{StoreError, StoreResult};
pub use settings::StoreSettings;
pub use store::{ClutStore, ResourceKind, ScriptHandle};
