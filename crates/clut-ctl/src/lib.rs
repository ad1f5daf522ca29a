//! # clut-ctl
//!
//! Interpreter for the C-like color transformation language used by
//! script CLUTs.
//!
//! A script is parsed once into an [`Interpreter`], shared through `Arc`,
//! and evaluated through [`FunctionCall`] contexts that own their argument
//! buffers. Color scripts define an [`ENTRY_POINT`] taking three varying
//! float inputs and three varying float outputs, followed by uniform
//! parameters described by `@ART-param` annotations ([`extract_params`]).
//!
//! # Language
//!
//! `bool`, `int` and `float` scalars (`half` and `unsigned` are accepted as
//! aliases) and fixed-size arrays of them; `const` globals; functions with
//! `input`/`output` and `varying`/`uniform` parameters and defaults;
//! `if`/`else`, `while`, `for`, `return`; C operators without bitwise ops;
//! `{...}` initializers; the math and 3x3/4x4 matrix library listed
//! below. `import` statements are accepted and ignored. Runtime faults
//! (bad index, integer division by zero, runaway loops or recursion) stop
//! the call with a [`CtlError::Runtime`] carrying the source line.
//! Sources nesting blocks or expressions deeper than [`MAX_NESTING`]
//! levels are rejected with a [`CtlError::Parse`].
//!
//! # Usage
//!
//! ```rust
//! use clut_ctl::{Interpreter, Value};
//! use std::sync::Arc;
//!
//! let src = "void ART_main(varying float r, varying float g, varying float b,
//!                          output varying float ro, output varying float go,
//!                          output varying float bo, float k = 2.0)
//!            { ro = r * k; go = g; bo = b; }";
//! let interp = Arc::new(Interpreter::load_source("demo", src).unwrap());
//! let mut call = interp.new_function_call("ART_main").unwrap();
//! call.input_data_mut(0)[0] = 0.25;
//! call.call(1).unwrap();
//! assert_eq!(call.output_data(0)[0], 0.5);
//!
//! call.set_uniform(3, Value::Float(4.0)).unwrap();
//! call.call(1).unwrap();
//! assert_eq!(call.output_data(0)[0], 1.0);
//! ```
//!
//! ## Builtins
//!
//! Scalar: `pow`, `pow10`, `exp`, `exp2`, `log`, `log2`, `log10`, `sqrt`,
//! `fabs`, `abs`, `floor`, `ceil`, trigonometry, `atan2`, `hypot`, `fmod`,
//! `min`, `max`, `clamp`, `isnan_f`, `isinf_f`, `isfinite_f`.
//! Vector/matrix: `add_f3_f3`, `sub_f3_f3`, `mult_f_f3`, `mult_f3_f`,
//! `dot_f3_f3`, `length_f3`, `mult_f3_f33`, `mult_f3_f44`, `mult_f33_f33`,
//! `mult_f44_f44`, `mult_f_f33`, `transpose_f33`, `invert_f33`.
//! Constants: `M_PI`, `M_E`, `HALF_MAX`, `FLT_MAX`, `FLT_EPSILON` and
//! friends.
//!
//! # Dependencies
//!
//! - [`serde_json`] - annotation payloads
//! - [`serde`] - serializable parameter schema
//! - [`thiserror`] - Error handling
//! - [`tracing`] - Load diagnostics
//!
//! # Used By
//!
//! - `clut-store` - script CLUT backend

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod ast;
mod builtins;
mod error;
mod interp;
mod lexer;
mod parser;
pub mod params;
pub mod value;

pub use error::{CtlError, CtlResult};
pub use interp::{FunctionArg, FunctionCall, Interpreter, MAX_SAMPLES};
pub use parser::MAX_NESTING;
pub use params::{check_entry_point, extract_params, ParamDescriptor, ParamType, ANNOTATION, ENTRY_POINT};
pub use value::{BaseType, Type, Value};
