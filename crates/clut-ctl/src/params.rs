//! Entry point validation and `@ART-param` parameter extraction.
//!
//! A color script exposes extra uniform inputs of `ART_main` as tunable
//! parameters. Each one is described by a comment line holding a JSON array:
//!
//! ```text
//! // @ART-param: ["gain", "Gain", 0.0, 4.0, 1.0, 0.05, "Linear gain"]
//! // @ART-param: ["invert", "Invert"]
//! // @ART-param: ["mode", "Mode", ["Fast", "Accurate"], 1]
//! void ART_main(varying float r, varying float g, varying float b,
//!               output varying float ro, output varying float go, output varying float bo,
//!               float gain, bool invert, int mode)
//! ```
//!
//! Layouts, after the name and the GUI label:
//!
//! | Type | Elements |
//! |------|----------|
//! | `bool` | `[default], [help]` |
//! | `float` | `min, max, [default], [step], [help]` |
//! | `int`, ranged | `min, max, [default], [help]` |
//! | `int`, choice | `[options...], [default], [help]` |
//!
//! Defaults missing from the annotation come from the declaration, else 0.

use crate::interp::FunctionCall;
use crate::value::{BaseType, Type, Value};
use crate::{CtlError, CtlResult};
use serde::Serialize;
use serde_json::Value as Json;

/// Entry point every color script must define.
pub const ENTRY_POINT: &str = "ART_main";

/// Marker starting a parameter annotation.
pub const ANNOTATION: &str = "@ART-param:";

/// Kind of a script parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Checkbox; values 0 and 1.
    Bool,
    /// Integer slider.
    Int,
    /// Float slider.
    Float,
    /// Integer index into [`ParamDescriptor::choices`].
    Choice,
}

/// Schema of one script parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDescriptor {
    /// Name of the `ART_main` argument.
    pub name: String,
    /// Kind.
    pub param_type: ParamType,
    /// Lower bound.
    pub value_min: f64,
    /// Upper bound.
    pub value_max: f64,
    /// Default value.
    pub value_default: f64,
    /// Options of a [`ParamType::Choice`].
    pub choices: Vec<String>,
    /// Label.
    pub gui_name: String,
    /// Tooltip, possibly empty.
    pub gui_help: String,
    /// Slider increment.
    pub gui_step: f64,
}

impl ParamDescriptor {
    fn new(name: &str, param_type: ParamType, value_default: f64) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            value_min: 0.0,
            value_max: 1.0,
            value_default,
            choices: Vec::new(),
            gui_name: String::new(),
            gui_help: String::new(),
            gui_step: 1.0,
        }
    }

    /// Converts a numeric setting into the value bound to the script.
    pub fn to_value(&self, v: f64) -> Value {
        match self.param_type {
            ParamType::Bool => Value::Bool(v != 0.0),
            ParamType::Int | ParamType::Choice => Value::Int(v.round() as i32),
            ParamType::Float => Value::Float(v as f32),
        }
    }
}

/// Checks the fixed part of the `ART_main` signature: at least three
/// inputs, the first three `varying float`, and exactly three
/// `varying float` outputs.
///
/// # Errors
///
/// [`CtlError::Signature`] describing the first mismatch.
pub fn check_entry_point(call: &FunctionCall) -> CtlResult<()> {
    let is_varying_float = |ty: &Type, varying: bool| varying && ty.is_scalar() && ty.base == BaseType::Float;

    if call.inputs().len() < 3 {
        return Err(CtlError::Signature(format!(
            "wrong number of input arguments to {}",
            ENTRY_POINT
        )));
    }
    if let Some(a) = call.inputs()[..3].iter().find(|a| !is_varying_float(&a.ty, a.varying)) {
        return Err(CtlError::Signature(format!("bad input arg type for '{}'", a.name)));
    }
    if call.outputs().len() != 3 {
        return Err(CtlError::Signature("wrong number of output arguments".into()));
    }
    if let Some(a) = call.outputs().iter().find(|a| !is_varying_float(&a.ty, a.varying)) {
        return Err(CtlError::Signature(format!("bad output arg type for '{}'", a.name)));
    }
    Ok(())
}

/// Builds the parameter schema of `call` from the annotations in `source`.
///
/// Inputs after the first three must be uniform `bool`, `int` or `float`
/// and each needs exactly one annotation.
///
/// # Errors
///
/// [`CtlError::Param`] for unsupported parameters, malformed or duplicate
/// annotations, annotations naming no parameter, and parameters left
/// without one.
pub fn extract_params(source: &str, call: &FunctionCall) -> CtlResult<Vec<ParamDescriptor>> {
    let mut out = Vec::new();
    for a in call.inputs().iter().skip(3) {
        if a.varying {
            return Err(CtlError::Param(format!("varying parameter {}", a.name)));
        }
        let param_type = match (a.ty.is_scalar(), a.ty.base) {
            (true, BaseType::Bool) => ParamType::Bool,
            (true, BaseType::Int) => ParamType::Int,
            (true, BaseType::Float) => ParamType::Float,
            _ => {
                return Err(CtlError::Param(format!(
                    "parameter {} is of unsupported type {}",
                    a.name, a.ty
                )));
            }
        };
        let default = a.default.as_ref().and_then(Value::as_f32).map_or(0.0, f64::from);
        out.push(ParamDescriptor::new(&a.name, param_type, default));
    }

    let mut described = vec![false; out.len()];
    for (n, json) in annotations(source) {
        let err = |msg: String| CtlError::Param(format!("line {}: {}", n, msg));
        let root: Json = serde_json::from_str(json).map_err(|e| err(format!("bad parameter definition: {}", e)))?;
        let Some(items) = root.as_array() else {
            return Err(err("parameter definition is not an array".into()));
        };
        let Some(name) = items.first().and_then(Json::as_str) else {
            return Err(err("parameter definition without a name".into()));
        };
        let Some(pos) = out.iter().position(|d| d.name == name) else {
            return Err(err(format!("no parameter named '{}'", name)));
        };
        if described[pos] {
            return Err(err(format!("parameter '{}' described twice", name)));
        }
        described[pos] = true;
        fill(&mut out[pos], items).map_err(err)?;
    }

    let missing: Vec<&str> = out
        .iter()
        .zip(&described)
        .filter(|(_, d)| !**d)
        .map(|(p, _)| p.name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(CtlError::Param(format!("missing parameter definitions: {}", missing.join(", "))));
    }

    tracing::trace!(script = call.interpreter().name(), params = out.len(), "extracted parameters");
    Ok(out)
}

/// Annotation payloads with their 1-based line numbers.
///
/// A line qualifies when, after leading whitespace and an optional `//`,
/// it starts with [`ANNOTATION`].
pub fn annotations(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source.lines().enumerate().filter_map(|(i, line)| {
        let s = line.trim_start();
        let s = s.strip_prefix("//").unwrap_or(s).trim_start();
        s.strip_prefix(ANNOTATION).map(|rest| (i + 1, rest))
    })
}

// ============================================================================
// JSON layouts
// ============================================================================

fn number(items: &[Json], i: usize) -> Result<f64, String> {
    items[i]
        .as_f64()
        .ok_or_else(|| format!("element {} must be a number", i + 1))
}

fn string(items: &[Json], i: usize) -> Result<String, String> {
    items[i]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("element {} must be a string", i + 1))
}

fn arity(items: &[Json], lo: usize, hi: usize, what: &str) -> Result<(), String> {
    if (lo..=hi).contains(&items.len()) {
        Ok(())
    } else {
        Err(format!("{} definition needs {} to {} elements, got {}", what, lo, hi, items.len()))
    }
}

fn fill(desc: &mut ParamDescriptor, items: &[Json]) -> Result<(), String> {
    if items.len() < 2 {
        return Err("parameter definition needs a name and a label".into());
    }
    desc.gui_name = string(items, 1)?;

    match desc.param_type {
        ParamType::Bool => {
            arity(items, 2, 4, "bool")?;
            if items.len() >= 3 {
                let b = items[2].as_bool().ok_or("element 3 must be a bool")?;
                desc.value_default = if b { 1.0 } else { 0.0 };
            }
            if items.len() == 4 {
                desc.gui_help = string(items, 3)?;
            }
        }
        ParamType::Float => {
            arity(items, 4, 7, "float")?;
            desc.value_min = number(items, 2)?;
            desc.value_max = number(items, 3)?;
            if items.len() >= 5 {
                desc.value_default = number(items, 4)?;
            }
            desc.gui_step = if items.len() >= 6 {
                number(items, 5)?
            } else {
                (desc.value_max - desc.value_min) / 100.0
            };
            if items.len() == 7 {
                desc.gui_help = string(items, 6)?;
            }
        }
        ParamType::Int | ParamType::Choice => {
            if let Some(options) = items.get(2).and_then(Json::as_array) {
                arity(items, 3, 5, "choice")?;
                desc.param_type = ParamType::Choice;
                desc.choices = options
                    .iter()
                    .map(|o| o.as_str().map(str::to_string).ok_or("choice options must be strings"))
                    .collect::<Result<_, _>>()?;
                if desc.choices.is_empty() {
                    return Err("choice list is empty".into());
                }
                desc.value_min = 0.0;
                desc.value_max = (desc.choices.len() - 1) as f64;
                match items.get(3) {
                    Some(Json::String(help)) if items.len() == 4 => desc.gui_help = help.clone(),
                    Some(_) => desc.value_default = number(items, 3)?,
                    None => {}
                }
                if items.len() == 5 {
                    desc.gui_help = string(items, 4)?;
                }
                if !(desc.value_min..=desc.value_max).contains(&desc.value_default) {
                    return Err(format!("default {} is not a valid choice", desc.value_default));
                }
                return Ok(());
            }

            arity(items, 4, 6, "int")?;
            desc.value_min = number(items, 2)?;
            desc.value_max = number(items, 3)?;
            if items.len() >= 5 {
                desc.value_default = number(items, 4)?;
            }
            if items.len() == 6 {
                desc.gui_help = string(items, 5)?;
            }
        }
    }

    if desc.param_type != ParamType::Bool {
        if desc.value_min >= desc.value_max {
            return Err(format!("min {} is not below max {}", desc.value_min, desc.value_max));
        }
        if !(desc.value_min..=desc.value_max).contains(&desc.value_default) {
            return Err(format!(
                "default {} outside [{}, {}]",
                desc.value_default, desc.value_min, desc.value_max
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interpreter;
    use std::sync::Arc;

    const SIGNATURE: &str = "varying float r, varying float g, varying float b,
        output varying float ro, output varying float go, output varying float bo";

    /// Entry point with extra inputs; bare annotation lines become comments.
    fn script(annotations: &str, extra: &str) -> String {
        let comments: Vec<String> = annotations
            .lines()
            .map(|l| if l.trim_start().starts_with("//") { l.to_string() } else { format!("// {}", l) })
            .collect();
        format!(
            "{}\nvoid ART_main({}{}) {{ ro = r; go = g; bo = b; }}\n",
            comments.join("\n"),
            SIGNATURE,
            extra
        )
    }

    fn extract(src: &str) -> CtlResult<Vec<ParamDescriptor>> {
        let interp = Arc::new(Interpreter::load_source("test.ctl", src)?);
        let call = interp.new_function_call(ENTRY_POINT)?;
        check_entry_point(&call)?;
        extract_params(src, &call)
    }

    #[test]
    fn test_basic_schema() {
        let src = script(
            "// @ART-param: [\"b\", \"B\", true]\n\
             // @ART-param: [\"i\", \"I\", 0, 10, 5]\n\
             // @ART-param: [\"f\", \"F\", 0.0, 1.0, 0.5, 0.1]",
            ", bool b, int i, float f",
        );
        let params = extract(&src).unwrap();
        assert_eq!(params.len(), 3);

        assert_eq!(params[0].param_type, ParamType::Bool);
        assert_eq!(params[0].value_default, 1.0);
        assert_eq!(params[0].gui_name, "B");
        assert_eq!(params[0].gui_step, 1.0);

        assert_eq!(params[1].param_type, ParamType::Int);
        assert_eq!((params[1].value_min, params[1].value_max), (0.0, 10.0));
        assert_eq!(params[1].value_default, 5.0);
        assert_eq!(params[1].gui_step, 1.0);

        assert_eq!(params[2].param_type, ParamType::Float);
        assert!((params[2].value_default - 0.5).abs() < 1e-12);
        assert!((params[2].gui_step - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_float_default_step_and_declared_default() {
        let src = script("@ART-param: [\"f\", \"F\", -2.0, 2.0]", ", float f = 0.25");
        let p = &extract(&src).unwrap()[0];
        assert!((p.gui_step - 0.04).abs() < 1e-12);
        assert!((p.value_default - 0.25).abs() < 1e-12);
        assert_eq!(p.gui_help, "");
    }

    #[test]
    fn test_choice_layouts() {
        let src = script(
            "  //   @ART-param: [\"m\", \"Mode\", [\"A\", \"B\", \"C\"], 2, \"pick one\"]\n\
             // @ART-param: [\"n\", \"N\", [\"X\", \"Y\"], \"help only\"]",
            ", int m, int n",
        );
        let params = extract(&src).unwrap();
        assert_eq!(params[0].param_type, ParamType::Choice);
        assert_eq!(params[0].choices, vec!["A", "B", "C"]);
        assert_eq!((params[0].value_min, params[0].value_max), (0.0, 2.0));
        assert_eq!(params[0].value_default, 2.0);
        assert_eq!(params[0].gui_help, "pick one");
        assert_eq!(params[1].value_default, 0.0);
        assert_eq!(params[1].gui_help, "help only");
    }

    #[test]
    fn test_missing_annotation_fails() {
        let src = script(
            "// @ART-param: [\"b\", \"B\", true]\n// @ART-param: [\"f\", \"F\", 0.0, 1.0, 0.5, 0.1]",
            ", bool b, int i, float f",
        );
        let err = extract(&src).unwrap_err();
        assert!(err.to_string().contains("missing parameter definitions: i"), "{}", err);
    }

    #[test]
    fn test_invalid_annotations() {
        let bad = [
            ("@ART-param: [\"f\", \"F\", 0.0", ", float f"),
            ("@ART-param: [\"f\", \"F\", 1.0, 0.0]", ", float f"),
            ("@ART-param: [\"f\", \"F\", 0.0, 1.0, 2.0]", ", float f"),
            ("@ART-param: [\"f\", \"F\", 0.0]", ", float f"),
            ("@ART-param: [\"f\", \"F\", \"0\", 1.0]", ", float f"),
            ("@ART-param: [\"i\", \"I\", []]", ", int i"),
            ("@ART-param: [\"i\", \"I\", [\"a\"], 3]", ", int i"),
            ("@ART-param: [\"b\", \"B\", 1]", ", bool b"),
            ("@ART-param: [\"x\", \"X\", true]", ", bool b"),
            ("@ART-param: [\"b\", \"B\"]\n@ART-param: [\"b\", \"B\"]", ", bool b"),
            ("@ART-param: {\"name\": \"b\"}", ", bool b"),
        ];
        for (ann, extra) in bad {
            let src = script(ann, extra);
            assert!(matches!(extract(&src), Err(CtlError::Param(_))), "{}", ann);
        }
    }

    #[test]
    fn test_unsupported_parameters() {
        let src = script("", ", varying float v");
        assert!(matches!(extract(&src), Err(CtlError::Param(_))));
        let src = script("", ", float m[3]");
        assert!(matches!(extract(&src), Err(CtlError::Param(_))));
    }

    #[test]
    fn test_no_parameters() {
        assert!(extract(&script("", "")).unwrap().is_empty());
    }

    #[test]
    fn test_entry_point_checks() {
        let cases = [
            "void ART_main(varying float r, varying float g, output varying float a, output varying float b, output varying float c) {}",
            "void ART_main(varying float r, varying float g, float b, output varying float x, output varying float y, output varying float z) {}",
            "void ART_main(varying float r, varying float g, varying int b, output varying float x, output varying float y, output varying float z) {}",
            "void ART_main(varying float r, varying float g, varying float b, output varying float x, output varying float y) {}",
            "void ART_main(varying float r, varying float g, varying float b, output varying float x, output varying float y, output float z) {}",
        ];
        for src in cases {
            assert!(matches!(extract(src), Err(CtlError::Signature(_))), "{}", src);
        }
    }

    #[test]
    fn test_to_value() {
        let mut d = ParamDescriptor::new("x", ParamType::Choice, 0.0);
        assert_eq!(d.to_value(1.6), Value::Int(2));
        d.param_type = ParamType::Bool;
        assert_eq!(d.to_value(0.0), Value::Bool(false));
        d.param_type = ParamType::Float;
        assert_eq!(d.to_value(0.5), Value::Float(0.5));
    }
}
