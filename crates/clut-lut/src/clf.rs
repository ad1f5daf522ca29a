//! Common LUT Format (CLF) process lists.
//!
//! CLF is the Academy's XML format for chains of color operations. A
//! [`ProcessList`] is parsed once and shared read-only; the optimized
//! [`CpuProcessor`](crate::CpuProcessor) built from it does the per-pixel
//! work.
//!
//! # Supported Nodes
//!
//! - `Matrix` - 3x3, or 3x4 with an offset column
//! - `Range` - linear remap with optional clamping
//! - `LUT1D` - per-channel curves
//! - `LUT3D` - cubic lattice, trilinear
//! - `Exponent` - basic, mirror, pass-through and monCurve styles, forward and reverse
//! - `Log` - log2/log10, anti-logs, linToLog/logToLin and their camera variants
//! - `ASC_CDL` - slope/offset/power plus saturation, `Fwd`/`Rev` with and without clamping
//!
//! # Bit Depths
//!
//! `inBitDepth`/`outBitDepth` are folded into node parameters while
//! parsing, so every node maps normalized input to normalized output.
//!
//! # Compressed Files
//!
//! `.clfz` files are gzip-compressed CLF and are inflated on read.
//!
//! # Example
//!
//! ```rust
//! use clut_lut::clf::parse_clf;
//!
//! let xml = r#"<ProcessList id="gain">
//!   <Matrix inBitDepth="32f" outBitDepth="32f">
//!     <Array dim="3 3">2 0 0  0 2 0  0 0 2</Array>
//!   </Matrix>
//! </ProcessList>"#;
//! let list = parse_clf(xml.as_bytes()).unwrap();
//! let mut rgb = [0.1, 0.2, 0.3];
//! list.apply(&mut rgb);
//! assert!((rgb[2] - 0.6).abs() < 1e-6);
//! ```

use crate::{Lattice, Lut1D, LutError, LutResult};
use clut_math::Mat3;
use flate2::read::GzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Node names this parser recognizes but does not evaluate.
const UNSUPPORTED_NODES: &[&str] = &[
    "InvLUT1D",
    "InvLUT3D",
    "ExposureContrast",
    "FixedFunction",
    "GradingPrimary",
    "GradingTone",
    "GradingRGBCurve",
    "Reference",
];

// ============================================================================
// Bit depth
// ============================================================================

/// Bit depth of a node's input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// 8-bit unsigned integer [0, 255].
    Uint8,
    /// 10-bit unsigned integer [0, 1023].
    Uint10,
    /// 12-bit unsigned integer [0, 4095].
    Uint12,
    /// 16-bit unsigned integer [0, 65535].
    Uint16,
    /// 16-bit half float.
    Float16,
    /// 32-bit float (normalized [0, 1]).
    #[default]
    Float32,
}

impl BitDepth {
    /// Value of nominal white at this depth.
    ///
    /// ```rust
    /// use clut_lut::clf::BitDepth;
    ///
    /// assert_eq!(BitDepth::Uint10.scale(), 1023.0);
    /// assert_eq!(BitDepth::Float16.scale(), 1.0);
    /// ```
    #[inline]
    pub fn scale(&self) -> f32 {
        match self {
            BitDepth::Uint8 => 255.0,
            BitDepth::Uint10 => 1023.0,
            BitDepth::Uint12 => 4095.0,
            BitDepth::Uint16 => 65535.0,
            BitDepth::Float16 | BitDepth::Float32 => 1.0,
        }
    }

    /// Parses a CLF attribute value (`8i`, `10i`, `12i`, `16i`, `16f`, `32f`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "8i" => Some(BitDepth::Uint8),
            "10i" => Some(BitDepth::Uint10),
            "12i" => Some(BitDepth::Uint12),
            "16i" => Some(BitDepth::Uint16),
            "16f" => Some(BitDepth::Float16),
            "32f" => Some(BitDepth::Float32),
            _ => None,
        }
    }
}

// ============================================================================
// Node parameters
// ============================================================================

/// Range node: `out = (in - min_in) * scale + min_out`, clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeParams {
    /// Lower input bound, if given.
    pub min_in: Option<f32>,
    /// Upper input bound, if given.
    pub max_in: Option<f32>,
    /// Lower output bound, if given.
    pub min_out: Option<f32>,
    /// Upper output bound, if given.
    pub max_out: Option<f32>,
    /// Clamp to the output bounds.
    pub clamp: bool,
}

impl RangeParams {
    /// Applies to one value.
    pub fn eval(&self, v: f32) -> f32 {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(lo_i), Some(hi_i), Some(lo_o), Some(hi_o)) => {
                let span = hi_i - lo_i;
                let out = if span.abs() < 1e-12 {
                    lo_o
                } else {
                    (v - lo_i) * (hi_o - lo_o) / span + lo_o
                };
                if self.clamp { out.clamp(lo_o.min(hi_o), hi_o.max(lo_o)) } else { out }
            }
            (Some(lo_i), _, Some(lo_o), _) => (v - lo_i + lo_o).max(lo_o),
            (_, Some(hi_i), _, Some(hi_o)) => (v - hi_i + hi_o).min(hi_o),
            _ => v,
        }
    }
}

/// Exponent node styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExponentStyle {
    /// `max(0, x)^g`.
    BasicFwd,
    /// `max(0, x)^(1/g)`.
    BasicRev,
    /// `sign(x) * |x|^g`.
    BasicMirrorFwd,
    /// `sign(x) * |x|^(1/g)`.
    BasicMirrorRev,
    /// Negative values pass through.
    BasicPassThruFwd,
    /// Negative values pass through.
    BasicPassThruRev,
    /// Linearizing monitor curve with a linear toe.
    MonCurveFwd,
    /// Encoding monitor curve with a linear toe.
    MonCurveRev,
    /// Mirrored [`ExponentStyle::MonCurveFwd`].
    MonCurveMirrorFwd,
    /// Mirrored [`ExponentStyle::MonCurveRev`].
    MonCurveMirrorRev,
}

impl ExponentStyle {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "basicFwd" => Self::BasicFwd,
            "basicRev" => Self::BasicRev,
            "basicMirrorFwd" => Self::BasicMirrorFwd,
            "basicMirrorRev" => Self::BasicMirrorRev,
            "basicPassThruFwd" => Self::BasicPassThruFwd,
            "basicPassThruRev" => Self::BasicPassThruRev,
            "monCurveFwd" => Self::MonCurveFwd,
            "monCurveRev" => Self::MonCurveRev,
            "monCurveMirrorFwd" => Self::MonCurveMirrorFwd,
            "monCurveMirrorRev" => Self::MonCurveMirrorRev,
            _ => return None,
        })
    }
}

/// Exponent node.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentParams {
    /// Curve style.
    pub style: ExponentStyle,
    /// Exponent per channel.
    pub exponent: [f32; 3],
    /// Offset per channel (monCurve styles).
    pub offset: [f32; 3],
}

impl ExponentParams {
    /// Applies to channel `c`.
    pub fn eval(&self, c: usize, x: f32) -> f32 {
        let g = self.exponent[c];
        let o = self.offset[c];
        match self.style {
            ExponentStyle::BasicFwd => x.max(0.0).powf(g),
            ExponentStyle::BasicRev => x.max(0.0).powf(1.0 / g),
            ExponentStyle::BasicMirrorFwd => x.signum() * x.abs().powf(g),
            ExponentStyle::BasicMirrorRev => x.signum() * x.abs().powf(1.0 / g),
            ExponentStyle::BasicPassThruFwd => if x < 0.0 { x } else { x.powf(g) },
            ExponentStyle::BasicPassThruRev => if x < 0.0 { x } else { x.powf(1.0 / g) },
            ExponentStyle::MonCurveFwd => moncurve_fwd(x, g, o),
            ExponentStyle::MonCurveRev => moncurve_rev(x, g, o),
            ExponentStyle::MonCurveMirrorFwd => x.signum() * moncurve_fwd(x.abs(), g, o),
            ExponentStyle::MonCurveMirrorRev => x.signum() * moncurve_rev(x.abs(), g, o),
        }
    }
}

fn moncurve_slope(g: f32, o: f32) -> f32 {
    ((g - 1.0) / o) * ((o * g) / ((g - 1.0) * (1.0 + o))).powf(g)
}

fn moncurve_fwd(x: f32, g: f32, o: f32) -> f32 {
    let brk = o / (g - 1.0);
    if x >= brk {
        ((x + o) / (1.0 + o)).powf(g)
    } else {
        x * moncurve_slope(g, o)
    }
}

fn moncurve_rev(y: f32, g: f32, o: f32) -> f32 {
    let brk = ((o * g) / ((g - 1.0) * (1.0 + o))).powf(g);
    if y >= brk {
        (1.0 + o) * y.powf(1.0 / g) - o
    } else {
        y / moncurve_slope(g, o)
    }
}

/// Log node styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// `log10(x)`.
    Log10,
    /// `log2(x)`.
    Log2,
    /// `10^x`.
    AntiLog10,
    /// `2^x`.
    AntiLog2,
    /// Parametric linear to log.
    LinToLog,
    /// Parametric log to linear.
    LogToLin,
    /// [`LogStyle::LinToLog`] with a linear segment below `linSideBreak`.
    CameraLinToLog,
    /// Inverse of [`LogStyle::CameraLinToLog`].
    CameraLogToLin,
}

impl LogStyle {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "log10" => Self::Log10,
            "log2" => Self::Log2,
            "antiLog10" => Self::AntiLog10,
            "antiLog2" => Self::AntiLog2,
            "linToLog" => Self::LinToLog,
            "logToLin" => Self::LogToLin,
            "cameraLinToLog" => Self::CameraLinToLog,
            "cameraLogToLin" => Self::CameraLogToLin,
            _ => return None,
        })
    }
}

/// Per-channel parameters of a parametric Log node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogChannel {
    /// Logarithm base.
    pub base: f32,
    /// Scale after the logarithm.
    pub log_side_slope: f32,
    /// Offset after the logarithm.
    pub log_side_offset: f32,
    /// Scale before the logarithm.
    pub lin_side_slope: f32,
    /// Offset before the logarithm.
    pub lin_side_offset: f32,
    /// Start of the log segment for camera styles.
    pub lin_side_break: Option<f32>,
}

impl Default for LogChannel {
    fn default() -> Self {
        Self {
            base: 2.0,
            log_side_slope: 1.0,
            log_side_offset: 0.0,
            lin_side_slope: 1.0,
            lin_side_offset: 0.0,
            lin_side_break: None,
        }
    }
}

impl LogChannel {
    fn lin_to_log(&self, x: f32) -> f32 {
        let v = (self.lin_side_slope * x + self.lin_side_offset).max(f32::MIN_POSITIVE);
        self.log_side_slope * v.log(self.base) + self.log_side_offset
    }

    fn log_to_lin(&self, y: f32) -> f32 {
        let e = (y - self.log_side_offset) / self.log_side_slope;
        (self.base.powf(e) - self.lin_side_offset) / self.lin_side_slope
    }

    /// Slope and offset of the camera linear segment.
    fn camera_segment(&self, brk: f32) -> (f32, f32) {
        let v = self.lin_side_slope * brk + self.lin_side_offset;
        let slope = self.log_side_slope * self.lin_side_slope / (v * self.base.ln());
        let offset = self.lin_to_log(brk) - slope * brk;
        (slope, offset)
    }
}

/// Log node.
#[derive(Debug, Clone, PartialEq)]
pub struct LogParams {
    /// Style.
    pub style: LogStyle,
    /// Per-channel parameters.
    pub channels: [LogChannel; 3],
}

impl LogParams {
    /// Applies to channel `c`.
    pub fn eval(&self, c: usize, x: f32) -> f32 {
        let p = &self.channels[c];
        match self.style {
            LogStyle::Log10 => x.max(f32::MIN_POSITIVE).log10(),
            LogStyle::Log2 => x.max(f32::MIN_POSITIVE).log2(),
            LogStyle::AntiLog10 => 10f32.powf(x),
            LogStyle::AntiLog2 => 2f32.powf(x),
            LogStyle::LinToLog => p.lin_to_log(x),
            LogStyle::LogToLin => p.log_to_lin(x),
            LogStyle::CameraLinToLog => {
                let brk = p.lin_side_break.unwrap_or(0.0);
                if x <= brk {
                    let (slope, offset) = p.camera_segment(brk);
                    slope * x + offset
                } else {
                    p.lin_to_log(x)
                }
            }
            LogStyle::CameraLogToLin => {
                let brk = p.lin_side_break.unwrap_or(0.0);
                let (slope, offset) = p.camera_segment(brk);
                if x <= slope * brk + offset {
                    (x - offset) / slope
                } else {
                    p.log_to_lin(x)
                }
            }
        }
    }
}

/// ASC CDL styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CdlStyle {
    /// Forward, clamped to [0, 1].
    #[default]
    Fwd,
    /// Reverse, clamped to [0, 1].
    Rev,
    /// Forward without clamping.
    FwdNoClamp,
    /// Reverse without clamping.
    RevNoClamp,
}

/// ASC CDL node.
#[derive(Debug, Clone, PartialEq)]
pub struct CdlParams {
    /// Style.
    pub style: CdlStyle,
    /// Slope per channel.
    pub slope: [f32; 3],
    /// Offset per channel.
    pub offset: [f32; 3],
    /// Power per channel.
    pub power: [f32; 3],
    /// Saturation (1 = unchanged).
    pub saturation: f32,
}

impl Default for CdlParams {
    fn default() -> Self {
        Self {
            style: CdlStyle::Fwd,
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
        }
    }
}

impl CdlParams {
    /// Applies to an RGB triple in place.
    pub fn apply(&self, rgb: &mut [f32; 3]) {
        let clamp = matches!(self.style, CdlStyle::Fwd | CdlStyle::Rev);
        let clip = |v: f32| if clamp { v.clamp(0.0, 1.0) } else { v };
        let pow = |v: f32, p: f32| if v >= 0.0 { v.powf(p) } else { v };

        match self.style {
            CdlStyle::Fwd | CdlStyle::FwdNoClamp => {
                for c in 0..3 {
                    rgb[c] = pow(clip(rgb[c] * self.slope[c] + self.offset[c]), self.power[c]);
                }
                let luma = rec709_luma(rgb);
                for v in rgb.iter_mut() {
                    *v = clip(luma + self.saturation * (*v - luma));
                }
            }
            CdlStyle::Rev | CdlStyle::RevNoClamp => {
                for v in rgb.iter_mut() {
                    *v = clip(*v);
                }
                let luma = rec709_luma(rgb);
                for c in 0..3 {
                    let v = clip(luma + (rgb[c] - luma) / self.saturation);
                    rgb[c] = clip((pow(v, 1.0 / self.power[c]) - self.offset[c]) / self.slope[c]);
                }
            }
        }
    }
}

#[inline]
fn rec709_luma(rgb: &[f32; 3]) -> f32 {
    0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
}

// ============================================================================
// Process list
// ============================================================================

/// One operation of a process list, on normalized values.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessNode {
    /// `out = m * in + offset`.
    Matrix {
        /// 3x3 part.
        m: Mat3,
        /// Offset column (zero for 3x3 matrices).
        offset: [f32; 3],
    },
    /// Linear remap.
    Range(RangeParams),
    /// Per-channel curves.
    Lut1D(Lut1D),
    /// Cubic lattice over `[0, 1]`.
    Lut3D(Lattice),
    /// Power curve.
    Exponent(ExponentParams),
    /// Logarithmic curve.
    Log(LogParams),
    /// ASC CDL.
    Cdl(CdlParams),
}

impl ProcessNode {
    /// Applies this node to RGB values in place.
    pub fn apply(&self, rgb: &mut [f32; 3]) {
        match self {
            ProcessNode::Matrix { m, offset } => {
                let out = m.apply(rgb[0], rgb[1], rgb[2]);
                for c in 0..3 {
                    rgb[c] = out[c] + offset[c];
                }
            }
            ProcessNode::Range(p) => rgb.iter_mut().for_each(|v| *v = p.eval(*v)),
            ProcessNode::Lut1D(lut) => lut.apply(rgb),
            ProcessNode::Lut3D(lat) => *rgb = lat.sample(*rgb),
            ProcessNode::Exponent(p) => {
                for (c, v) in rgb.iter_mut().enumerate() {
                    *v = p.eval(c, *v);
                }
            }
            ProcessNode::Log(p) => {
                for (c, v) in rgb.iter_mut().enumerate() {
                    *v = p.eval(c, *v);
                }
            }
            ProcessNode::Cdl(p) => p.apply(rgb),
        }
    }
}

/// A parsed CLF `ProcessList`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessList {
    /// `id` attribute.
    pub id: String,
    /// `name` attribute.
    pub name: Option<String>,
    /// First top-level `Description`.
    pub description: Option<String>,
    /// `InputDescriptor` text.
    pub input_descriptor: Option<String>,
    /// `OutputDescriptor` text.
    pub output_descriptor: Option<String>,
    /// Operations in file order.
    pub nodes: Vec<ProcessNode>,
}

impl ProcessList {
    /// Creates an empty list.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    /// Applies every node in order.
    pub fn apply(&self, rgb: &mut [f32; 3]) {
        for node in &self.nodes {
            node.apply(rgb);
        }
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Reads a `.clf` file, or a gzip-compressed `.clfz` file.
///
/// # Errors
///
/// I/O errors, malformed XML, malformed arrays and unsupported nodes.
pub fn read_clf<P: AsRef<Path>>(path: P) -> LutResult<ProcessList> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let list = if is_clfz(path) {
        parse_clf(BufReader::new(GzDecoder::new(file)))?
    } else {
        parse_clf(BufReader::new(file))?
    };
    tracing::debug!(path = %path.display(), id = %list.id, nodes = list.nodes.len(), "parsed CLF");
    Ok(list)
}

/// Parses the already-read content of the CLF file at `path`.
///
/// `path` only selects gzip decoding for `.clfz` and is never opened.
///
/// # Errors
///
/// Same as [`read_clf`], minus opening the file.
pub fn read_clf_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> LutResult<ProcessList> {
    let path = path.as_ref();
    let list = if is_clfz(path) {
        parse_clf(BufReader::new(GzDecoder::new(bytes)))?
    } else {
        parse_clf(bytes)?
    };
    tracing::debug!(path = %path.display(), id = %list.id, nodes = list.nodes.len(), "parsed CLF");
    Ok(list)
}

fn is_clfz(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("clfz"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Matrix,
    Range,
    Lut1D,
    Lut3D,
    Exponent,
    Log,
    Cdl,
}

impl NodeKind {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Matrix" => Self::Matrix,
            "Range" => Self::Range,
            "LUT1D" => Self::Lut1D,
            "LUT3D" => Self::Lut3D,
            "Exponent" => Self::Exponent,
            "Log" => Self::Log,
            "ASC_CDL" => Self::Cdl,
            _ => return None,
        })
    }
}

/// A node being collected from XML events.
#[derive(Debug)]
struct PendingNode {
    kind: NodeKind,
    in_depth: BitDepth,
    out_depth: BitDepth,
    style: String,
    dim: Vec<usize>,
    array: Vec<f32>,
    texts: HashMap<String, String>,
    /// `(channel, attributes)` of ExponentParams / LogParams elements.
    params: Vec<(Option<usize>, HashMap<String, f32>)>,
}

impl PendingNode {
    fn new(kind: NodeKind, attrs: &HashMap<String, String>) -> LutResult<Self> {
        let depth = |key: &str| -> LutResult<BitDepth> {
            match attrs.get(key) {
                None => Ok(BitDepth::Float32),
                Some(v) => BitDepth::parse(v)
                    .ok_or_else(|| LutError::ParseError(format!("bad {} '{}'", key, v))),
            }
        };
        Ok(Self {
            kind,
            in_depth: depth("inBitDepth")?,
            out_depth: depth("outBitDepth")?,
            style: attrs.get("style").cloned().unwrap_or_default(),
            dim: Vec::new(),
            array: Vec::new(),
            texts: HashMap::new(),
            params: Vec::new(),
        })
    }

    /// Product of `dims`, rejecting sizes that overflow.
    fn dim_product(&self, dims: &[usize]) -> LutResult<usize> {
        dims.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| LutError::InvalidSize(format!("Array dim {:?} overflows", self.dim)))
    }

    fn triple(&self, key: &str, default: f32) -> LutResult<[f32; 3]> {
        let Some(text) = self.texts.get(key) else {
            return Ok([default; 3]);
        };
        let v = parse_floats(text)?;
        match v.len() {
            1 => Ok([v[0]; 3]),
            3 => Ok([v[0], v[1], v[2]]),
            n => Err(LutError::ParseError(format!("{} has {} values", key, n))),
        }
    }

    fn scalar(&self, key: &str) -> LutResult<Option<f32>> {
        self.texts
            .get(key)
            .map(|t| {
                t.trim()
                    .parse::<f32>()
                    .map_err(|_| LutError::ParseError(format!("bad {} '{}'", key, t)))
            })
            .transpose()
    }

    /// Per-channel attribute values: an entry without `channel` sets all
    /// three, later per-channel entries override.
    fn channel_values(&self, key: &str, default: f32) -> [f32; 3] {
        let mut out = [default; 3];
        for (channel, attrs) in &self.params {
            if let Some(v) = attrs.get(key) {
                match channel {
                    Some(c) => out[*c] = *v,
                    None => out = [*v; 3],
                }
            }
        }
        out
    }

    fn finish(self) -> LutResult<ProcessNode> {
        let in_scale = self.in_depth.scale();
        let out_scale = self.out_depth.scale();

        match self.kind {
            NodeKind::Matrix => {
                let v = &self.array;
                let (m, offset) = match v.len() {
                    9 => (
                        Mat3::from_rows([[v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7], v[8]]]),
                        [0.0; 3],
                    ),
                    12 => (
                        Mat3::from_rows([[v[0], v[1], v[2]], [v[4], v[5], v[6]], [v[8], v[9], v[10]]]),
                        [v[3], v[7], v[11]],
                    ),
                    n => return Err(LutError::ParseError(format!("Matrix with {} values", n))),
                };
                Ok(ProcessNode::Matrix {
                    m: m * (in_scale / out_scale),
                    offset: offset.map(|o| o / out_scale),
                })
            }
            NodeKind::Range => {
                let clamp = self.style != "noClamp";
                let p = RangeParams {
                    min_in: self.scalar("minInValue")?.map(|v| v / in_scale),
                    max_in: self.scalar("maxInValue")?.map(|v| v / in_scale),
                    min_out: self.scalar("minOutValue")?.map(|v| v / out_scale),
                    max_out: self.scalar("maxOutValue")?.map(|v| v / out_scale),
                    clamp,
                };
                let full = p.min_in.is_some() && p.max_in.is_some();
                let lower = p.min_in.is_some() == p.min_out.is_some();
                let upper = p.max_in.is_some() == p.max_out.is_some();
                if !(lower && upper) || (!clamp && !full) {
                    return Err(LutError::ParseError("inconsistent Range bounds".into()));
                }
                Ok(ProcessNode::Range(p))
            }
            NodeKind::Lut1D => {
                if self.dim.len() >= 2 && self.dim_product(&self.dim[..2])? != self.array.len() {
                    return Err(LutError::InvalidSize(format!(
                        "LUT1D dim {:?} with {} values",
                        self.dim,
                        self.array.len()
                    )));
                }
                let channels = self.dim.get(1).copied().unwrap_or(1);
                let mut lut = Lut1D::from_interleaved(&self.array, channels)?;
                lut.scale_values(1.0 / out_scale);
                Ok(ProcessNode::Lut1D(lut))
            }
            NodeKind::Lut3D => {
                let n = self.dim.first().copied().unwrap_or(0);
                if self.array.len() != self.dim_product(&[n, n, n, 3])? {
                    return Err(LutError::InvalidSize(format!(
                        "LUT3D dim {} with {} values",
                        n,
                        self.array.len()
                    )));
                }
                // file order is blue fastest
                let a = &self.array;
                let k = 1.0 / out_scale;
                let lat = Lattice::from_fn(n, 1.0, |r, g, b| {
                    let i = ((r * n + g) * n + b) * 3;
                    [a[i] * k, a[i + 1] * k, a[i + 2] * k]
                })?;
                Ok(ProcessNode::Lut3D(lat))
            }
            NodeKind::Exponent => {
                let style = ExponentStyle::parse(&self.style)
                    .ok_or_else(|| LutError::ParseError(format!("Exponent style '{}'", self.style)))?;
                let exponent = self.channel_values("exponent", 1.0);
                let offset = self.channel_values("offset", 0.0);
                let moncurve = matches!(
                    style,
                    ExponentStyle::MonCurveFwd
                        | ExponentStyle::MonCurveRev
                        | ExponentStyle::MonCurveMirrorFwd
                        | ExponentStyle::MonCurveMirrorRev
                );
                if moncurve && exponent.iter().any(|g| *g <= 1.0) {
                    return Err(LutError::ParseError("monCurve exponent must exceed 1".into()));
                }
                if exponent.iter().any(|g| *g == 0.0) {
                    return Err(LutError::ParseError("zero exponent".into()));
                }
                Ok(ProcessNode::Exponent(ExponentParams { style, exponent, offset }))
            }
            NodeKind::Log => {
                let style = LogStyle::parse(&self.style)
                    .ok_or_else(|| LutError::ParseError(format!("Log style '{}'", self.style)))?;
                let d = LogChannel::default();
                let base = self.channel_values("base", d.base);
                let log_slope = self.channel_values("logSideSlope", d.log_side_slope);
                let log_offset = self.channel_values("logSideOffset", d.log_side_offset);
                let lin_slope = self.channel_values("linSideSlope", d.lin_side_slope);
                let lin_offset = self.channel_values("linSideOffset", d.lin_side_offset);
                let lin_break = self.channel_values("linSideBreak", f32::NAN);
                if matches!(style, LogStyle::CameraLinToLog | LogStyle::CameraLogToLin)
                    && lin_break.iter().any(|v| v.is_nan())
                {
                    return Err(LutError::ParseError("camera Log needs linSideBreak".into()));
                }
                let channels = std::array::from_fn(|c| LogChannel {
                    base: base[c],
                    log_side_slope: log_slope[c],
                    log_side_offset: log_offset[c],
                    lin_side_slope: lin_slope[c],
                    lin_side_offset: lin_offset[c],
                    lin_side_break: (!lin_break[c].is_nan()).then_some(lin_break[c]),
                });
                Ok(ProcessNode::Log(LogParams { style, channels }))
            }
            NodeKind::Cdl => {
                let style = match self.style.as_str() {
                    "" | "Fwd" | "v1.2_Fwd" => CdlStyle::Fwd,
                    "Rev" | "v1.2_Rev" => CdlStyle::Rev,
                    "FwdNoClamp" => CdlStyle::FwdNoClamp,
                    "RevNoClamp" => CdlStyle::RevNoClamp,
                    s => return Err(LutError::ParseError(format!("ASC_CDL style '{}'", s))),
                };
                Ok(ProcessNode::Cdl(CdlParams {
                    style,
                    slope: self.triple("Slope", 1.0)?,
                    offset: self.triple("Offset", 0.0)?,
                    power: self.triple("Power", 1.0)?,
                    saturation: self.scalar("Saturation")?.unwrap_or(1.0),
                }))
            }
        }
    }
}

fn parse_floats(text: &str) -> LutResult<Vec<f32>> {
    text.split_whitespace()
        .map(|s| {
            s.parse::<f32>()
                .map_err(|_| LutError::ParseError(format!("bad number '{}'", s)))
        })
        .collect()
}

fn attributes(e: &BytesStart<'_>) -> HashMap<String, String> {
    e.attributes()
        .flatten()
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&a.value).into_owned(),
            )
        })
        .collect()
}

/// Parses CLF XML from a reader.
pub fn parse_clf<R: BufRead>(reader: R) -> LutResult<ProcessList> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut result: Option<ProcessList> = None;
    let mut pending: Option<PendingNode> = None;
    let mut in_array = false;
    let mut text = String::new();

    loop {
        let event = xml
            .read_event_into(&mut buf)
            .map_err(|e| LutError::ParseError(format!("XML error: {}", e)))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attrs = attributes(e);
                text.clear();

                if name == "ProcessList" {
                    let mut list = ProcessList::new(attrs.get("id").cloned().unwrap_or_default());
                    list.name = attrs.get("name").cloned();
                    result = Some(list);
                } else if let Some(kind) = NodeKind::from_name(&name) {
                    if pending.is_some() {
                        return Err(LutError::ParseError(format!("nested {}", name)));
                    }
                    let node = PendingNode::new(kind, &attrs)?;
                    if matches!(event, Event::Empty(_)) {
                        if let Some(list) = result.as_mut() {
                            list.nodes.push(node.finish()?);
                        }
                    } else {
                        pending = Some(node);
                    }
                } else if UNSUPPORTED_NODES.contains(&name.as_str()) {
                    return Err(LutError::Unsupported(format!("CLF node {}", name)));
                } else if let Some(node) = pending.as_mut() {
                    match name.as_str() {
                        "Array" => {
                            node.dim = attrs
                                .get("dim")
                                .map(|d| d.split_whitespace().filter_map(|s| s.parse().ok()).collect())
                                .unwrap_or_default();
                            in_array = matches!(event, Event::Start(_));
                        }
                        "ExponentParams" | "LogParams" => {
                            let channel = attrs.get("channel").and_then(|c| match c.as_str() {
                                "R" => Some(0),
                                "G" => Some(1),
                                "B" => Some(2),
                                _ => None,
                            });
                            let mut values = HashMap::new();
                            for (k, v) in &attrs {
                                if k == "channel" {
                                    continue;
                                }
                                let f = v.trim().parse::<f32>().map_err(|_| {
                                    LutError::ParseError(format!("bad {} '{}'", k, v))
                                })?;
                                values.insert(k.clone(), f);
                            }
                            node.params.push((channel, values));
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(ref e) => {
                let s = String::from_utf8_lossy(e);
                if in_array {
                    if let Some(node) = pending.as_mut() {
                        node.array.extend(parse_floats(&s)?);
                    }
                } else {
                    text.push_str(&s);
                }
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "Array" => in_array = false,
                    _ if NodeKind::from_name(&name).is_some() => {
                        if let (Some(list), Some(node)) = (result.as_mut(), pending.take()) {
                            list.nodes.push(node.finish()?);
                        }
                    }
                    _ => {
                        if let Some(node) = pending.as_mut() {
                            node.texts.insert(name, text.clone());
                        } else if let Some(list) = result.as_mut() {
                            let slot = match name.as_str() {
                                "Description" => Some(&mut list.description),
                                "InputDescriptor" => Some(&mut list.input_descriptor),
                                "OutputDescriptor" => Some(&mut list.output_descriptor),
                                _ => None,
                            };
                            if let Some(slot) = slot {
                                slot.get_or_insert_with(|| text.clone());
                            }
                        }
                    }
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    result.ok_or_else(|| LutError::ParseError("missing ProcessList element".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn parse(body: &str) -> LutResult<ProcessList> {
        let xml = format!(r#"<?xml version="1.0"?><ProcessList id="t" compCLFversion="3">{}</ProcessList>"#, body);
        parse_clf(xml.as_bytes())
    }

    fn run(list: &ProcessList, rgb: [f32; 3]) -> [f32; 3] {
        let mut v = rgb;
        list.apply(&mut v);
        v
    }

    #[test]
    fn test_bit_depth() {
        assert_eq!(BitDepth::parse("12i"), Some(BitDepth::Uint12));
        assert_eq!(BitDepth::parse("64f"), None);
        assert_eq!(BitDepth::Uint8.scale(), 255.0);
    }

    #[test]
    fn test_descriptors() {
        let list = parse(
            "<Description>top</Description><InputDescriptor>ACES</InputDescriptor>\
             <Matrix><Description>inner</Description><Array dim=\"3 3\">1 0 0 0 1 0 0 0 1</Array></Matrix>",
        )
        .unwrap();
        assert_eq!(list.id, "t");
        assert_eq!(list.description.as_deref(), Some("top"));
        assert_eq!(list.input_descriptor.as_deref(), Some("ACES"));
        assert_eq!(list.nodes.len(), 1);
    }

    #[test]
    fn test_matrix_3x4_and_bit_depth() {
        let list = parse(
            r#"<Matrix inBitDepth="10i" outBitDepth="12i">
                 <Array dim="3 4">4 0 0 40.95  0 4 0 0  0 0 4 0</Array>
               </Matrix>"#,
        )
        .unwrap();
        let out = run(&list, [0.5, 0.25, 1.0]);
        assert_abs_diff_eq!(out[0], 0.5 * 4.0 * 1023.0 / 4095.0 + 0.01, epsilon = 1e-4);
        assert_abs_diff_eq!(out[1], 0.25 * 4.0 * 1023.0 / 4095.0, epsilon = 1e-4);
    }

    #[test]
    fn test_range_bit_depth_and_clamp() {
        let list = parse(
            r#"<Range inBitDepth="10i" outBitDepth="32f">
                 <minInValue>64</minInValue><maxInValue>940</maxInValue>
                 <minOutValue>0</minOutValue><maxOutValue>1</maxOutValue>
               </Range>"#,
        )
        .unwrap();
        let out = run(&list, [64.0 / 1023.0, 940.0 / 1023.0, 1.0]);
        assert_abs_diff_eq!(out[0], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out[1], 1.0, epsilon = 1e-5);
        assert_eq!(out[2], 1.0);

        let lower = parse("<Range><minInValue>0.1</minInValue><minOutValue>0</minOutValue></Range>").unwrap();
        let out = run(&lower, [0.05, 0.6, 2.0]);
        assert_eq!(out[0], 0.0);
        assert_abs_diff_eq!(out[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 1.9, epsilon = 1e-6);

        assert!(parse("<Range><minInValue>0</minInValue></Range>").is_err());
    }

    #[test]
    fn test_lut1d_depth_normalized() {
        let list = parse(
            r#"<LUT1D inBitDepth="32f" outBitDepth="10i"><Array dim="2 1">0 1023</Array></LUT1D>"#,
        )
        .unwrap();
        let out = run(&list, [0.25, 0.5, 1.0]);
        assert_abs_diff_eq!(out[0], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lut3d_blue_fastest() {
        // swap red and blue: node (r,g,b) holds (b,g,r), written blue fastest
        let mut values = String::new();
        for r in 0..2 {
            for g in 0..2 {
                for b in 0..2 {
                    values.push_str(&format!("{} {} {} ", b, g, r));
                }
            }
        }
        let list = parse(&format!(
            r#"<LUT3D><Array dim="2 2 2 3">{}</Array></LUT3D>"#,
            values
        ))
        .unwrap();
        let out = run(&list, [0.9, 0.5, 0.1]);
        assert_abs_diff_eq!(out[0], 0.1, epsilon = 1e-5);
        assert_abs_diff_eq!(out[1], 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(out[2], 0.9, epsilon = 1e-5);
    }

    #[test]
    fn test_lut3d_size_mismatch() {
        assert!(parse(r#"<LUT3D><Array dim="2 2 2 3">0 0 0</Array></LUT3D>"#).is_err());
    }

    #[test]
    fn test_oversized_dim_rejected() {
        let err = parse(r#"<LUT3D><Array dim="3000000 3000000 3000000 3">0 0 0</Array></LUT3D>"#).unwrap_err();
        assert!(matches!(err, LutError::InvalidSize(_)), "{:?}", err);

        let err = parse(r#"<LUT1D><Array dim="18446744073709551615 3">0 0 0 1 1 1</Array></LUT1D>"#).unwrap_err();
        assert!(matches!(err, LutError::InvalidSize(_)), "{:?}", err);

        // declared dims must match the values present
        assert!(parse(r#"<LUT1D><Array dim="4 1">0 1</Array></LUT1D>"#).is_err());
    }

    #[test]
    fn test_exponent_moncurve_roundtrip() {
        let fwd = parse(
            r#"<Exponent style="monCurveFwd"><ExponentParams exponent="2.4" offset="0.055"/></Exponent>"#,
        )
        .unwrap();
        let rev = parse(
            r#"<Exponent style="monCurveRev"><ExponentParams exponent="2.4" offset="0.055"/></Exponent>"#,
        )
        .unwrap();
        // sRGB decode of 0.5
        let lin = run(&fwd, [0.5, 0.02, 1.0]);
        assert_abs_diff_eq!(lin[0], 0.21404, epsilon = 1e-4);
        assert_abs_diff_eq!(lin[1], 0.02 / 12.92, epsilon = 1e-4);
        let back = run(&rev, lin);
        for (a, b) in back.into_iter().zip([0.5, 0.02, 1.0]) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_exponent_per_channel() {
        let list = parse(
            r#"<Exponent style="basicFwd">
                 <ExponentParams channel="R" exponent="2"/>
                 <ExponentParams channel="G" exponent="1"/>
                 <ExponentParams channel="B" exponent="0.5"/>
               </Exponent>"#,
        )
        .unwrap();
        let out = run(&list, [0.5, 0.5, 0.25]);
        assert_abs_diff_eq!(out[0], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 0.5, epsilon = 1e-6);
        assert!(parse(r#"<Exponent style="bogus"/>"#).is_err());
    }

    #[test]
    fn test_log_styles() {
        let list = parse(r#"<Log style="log10"/><Log style="antiLog2"/>"#).unwrap();
        let out = run(&list, [100.0, 1.0, 0.1]);
        assert_abs_diff_eq!(out[0], 4.0, epsilon = 1e-4);
        assert_abs_diff_eq!(out[1], 1.0, epsilon = 1e-4);

        let lin_to_log = parse(
            r#"<Log style="linToLog"><LogParams base="10" logSideSlope="0.5" logSideOffset="1" linSideSlope="2" linSideOffset="0"/></Log>"#,
        )
        .unwrap();
        let out = run(&lin_to_log, [50.0, 0.5, 5.0]);
        assert_abs_diff_eq!(out[0], 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(out[1], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_camera_log_roundtrip() {
        let params = r#"<LogParams base="2" logSideSlope="0.25" logSideOffset="0.6" linSideSlope="1" linSideOffset="0.01" linSideBreak="0.02"/>"#;
        let fwd = parse(&format!(r#"<Log style="cameraLinToLog">{}</Log>"#, params)).unwrap();
        let rev = parse(&format!(r#"<Log style="cameraLogToLin">{}</Log>"#, params)).unwrap();
        let input = [0.0, 0.01, 0.5];
        let back = run(&rev, run(&fwd, input));
        for (a, b) in back.into_iter().zip(input) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-4);
        }
        assert!(parse(r#"<Log style="cameraLinToLog"><LogParams base="2"/></Log>"#).is_err());
    }

    #[test]
    fn test_cdl_fwd_rev() {
        let sop = "<SOPNode><Slope>1.2 1.0 0.8</Slope><Offset>0.01 0 -0.01</Offset><Power>1.1 1 0.9</Power></SOPNode>\
                   <SatNode><Saturation>0.9</Saturation></SatNode>";
        let fwd = parse(&format!(r#"<ASC_CDL style="Fwd">{}</ASC_CDL>"#, sop)).unwrap();
        let rev = parse(&format!(r#"<ASC_CDL style="Rev">{}</ASC_CDL>"#, sop)).unwrap();
        let input = [0.3, 0.4, 0.5];
        let graded = run(&fwd, input);
        assert!((graded[0] - input[0]).abs() > 1e-2);
        let back = run(&rev, graded);
        for (a, b) in back.into_iter().zip(input) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_unsupported_and_malformed() {
        assert!(matches!(
            parse("<ExposureContrast/>"),
            Err(LutError::Unsupported(_))
        ));
        assert!(parse(r#"<Matrix><Array dim="3 3">1 2 3</Array></Matrix>"#).is_err());
        assert!(parse(r#"<Matrix><Array dim="3 3">1 x 3</Array></Matrix>"#).is_err());
        assert!(parse_clf("<NotClf/>".as_bytes()).is_err());
    }

    #[test]
    fn test_read_clfz() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gain.clfz");
        let xml = r#"<ProcessList id="z"><Matrix><Array dim="3 3">2 0 0 0 2 0 0 0 2</Array></Matrix></ProcessList>"#;
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(xml.as_bytes()).unwrap();
        enc.finish().unwrap();

        let list = read_clf(&path).unwrap();
        assert_eq!(list.id, "z");
        assert_abs_diff_eq!(run(&list, [0.25; 3])[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_read_clf_bytes() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let xml = r#"<ProcessList id="mem"><Matrix><Array dim="3 3">2 0 0 0 2 0 0 0 2</Array></Matrix></ProcessList>"#;
        let list = read_clf_bytes("gain.clf", xml.as_bytes()).unwrap();
        assert_eq!(list.id, "mem");

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(xml.as_bytes()).unwrap();
        let packed = enc.finish().unwrap();
        let list = read_clf_bytes("missing/gain.CLFZ", &packed).unwrap();
        assert_abs_diff_eq!(run(&list, [0.25; 3])[0], 0.5, epsilon = 1e-6);

        // compressed bytes are not XML
        assert!(read_clf_bytes("gain.clf", &packed).is_err());
    }
}
