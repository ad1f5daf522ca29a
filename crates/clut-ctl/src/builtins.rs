//! Built-in constants and functions.
//!
//! Scalar math follows the C library names with an `_f` suffix where the
//! color language adds one. Vector and matrix helpers operate on `float[3]`,
//! `float[3][3]` and `float[4][4]` values in row-vector convention:
//! `mult_f3_f33(v, m)` computes `v * m`.

use crate::value::Value;

/// Largest finite `half`.
const HALF_MAX: f32 = 65504.0;

/// Looks up a named constant.
pub(crate) fn constant(name: &str) -> Option<Value> {
    let v = match name {
        "M_PI" => std::f32::consts::PI,
        "M_E" => std::f32::consts::E,
        "M_LN2" => std::f32::consts::LN_2,
        "M_LN10" => std::f32::consts::LN_10,
        "M_SQRT2" => std::f32::consts::SQRT_2,
        "HALF_MAX" => HALF_MAX,
        "HALF_MIN" => 5.960_464_5e-8,
        "HALF_POS_INF" | "FLT_POS_INF" => f32::INFINITY,
        "HALF_NEG_INF" | "FLT_NEG_INF" => f32::NEG_INFINITY,
        "HALF_NAN" | "FLT_NAN" => f32::NAN,
        "FLT_MAX" => f32::MAX,
        "FLT_MIN" => f32::MIN_POSITIVE,
        "FLT_EPSILON" => f32::EPSILON,
        "INT_MAX" => return Some(Value::Int(i32::MAX)),
        "INT_MIN" => return Some(Value::Int(i32::MIN)),
        _ => return None,
    };
    Some(Value::Float(v))
}

/// Evaluates built-in `name`, or `None` if there is no such built-in.
pub(crate) fn call(name: &str, args: &[Value]) -> Option<Result<Value, String>> {
    let r = match name {
        // scalar math
        "pow" | "pow_f" => f2(args, f32::powf),
        "pow10" | "pow10_f" => f1(args, |x| 10f32.powf(x)),
        "exp" | "exp_f" => f1(args, f32::exp),
        "exp2" | "exp2_f" => f1(args, f32::exp2),
        "log" | "log_f" => f1(args, f32::ln),
        "log2" | "log2_f" => f1(args, f32::log2),
        "log10" | "log10_f" => f1(args, f32::log10),
        "sqrt" | "sqrt_f" => f1(args, f32::sqrt),
        "fabs" | "fabs_f" => f1(args, f32::abs),
        "floor" | "floor_f" => f1(args, f32::floor),
        "ceil" | "ceil_f" => f1(args, f32::ceil),
        "sin" | "sin_f" => f1(args, f32::sin),
        "cos" | "cos_f" => f1(args, f32::cos),
        "tan" | "tan_f" => f1(args, f32::tan),
        "asin" | "asin_f" => f1(args, f32::asin),
        "acos" | "acos_f" => f1(args, f32::acos),
        "atan" | "atan_f" => f1(args, f32::atan),
        "atan2" | "atan2_f" => f2(args, f32::atan2),
        "hypot" | "hypot_f" => f2(args, f32::hypot),
        "fmod" | "fmod_f" => f2(args, |a, b| a % b),
        "min" | "min_f" => f2(args, f32::min),
        "max" | "max_f" => f2(args, f32::max),
        "clamp" | "clamp_f" => f3(args, |x, lo, hi| x.max(lo).min(hi)),
        "isnan_f" => b1(args, f32::is_nan),
        "isinf_f" => b1(args, f32::is_infinite),
        "isfinite_f" => b1(args, f32::is_finite),
        "abs" => args_n(args, 1).and_then(|_| match &args[0] {
            Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
            v => num(v).map(|x| Value::Float(x.abs())),
        }),

        // vectors and matrices
        "add_f3_f3" => zip3(args, |a, b| a + b),
        "sub_f3_f3" => zip3(args, |a, b| a - b),
        "mult_f_f3" => args_n(args, 2).and_then(|_| {
            let k = num(&args[0])?;
            Ok(from_f3(f3_of(&args[1])?.map(|v| v * k)))
        }),
        "mult_f3_f" => args_n(args, 2).and_then(|_| {
            let k = num(&args[1])?;
            Ok(from_f3(f3_of(&args[0])?.map(|v| v * k)))
        }),
        "dot_f3_f3" => args_n(args, 2).and_then(|_| {
            let (a, b) = (f3_of(&args[0])?, f3_of(&args[1])?);
            Ok(Value::Float(a[0] * b[0] + a[1] * b[1] + a[2] * b[2]))
        }),
        "length_f3" => args_n(args, 1).and_then(|_| {
            let a = f3_of(&args[0])?;
            Ok(Value::Float((a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()))
        }),
        "mult_f3_f33" => args_n(args, 2).and_then(|_| {
            let (v, m) = (f3_of(&args[0])?, mat_of::<3>(&args[1])?);
            Ok(from_f3(std::array::from_fn(|j| (0..3).map(|i| v[i] * m[i][j]).sum())))
        }),
        "mult_f3_f44" => args_n(args, 2).and_then(|_| {
            let (v, m) = (f3_of(&args[0])?, mat_of::<4>(&args[1])?);
            let h = [v[0], v[1], v[2], 1.0];
            let o: [f32; 4] = std::array::from_fn(|j| (0..4).map(|i| h[i] * m[i][j]).sum());
            Ok(from_f3([o[0] / o[3], o[1] / o[3], o[2] / o[3]]))
        }),
        "mult_f33_f33" => args_n(args, 2).and_then(|_| {
            let (a, b) = (mat_of::<3>(&args[0])?, mat_of::<3>(&args[1])?);
            Ok(from_mat(mat_mul(&a, &b)))
        }),
        "mult_f44_f44" => args_n(args, 2).and_then(|_| {
            let (a, b) = (mat_of::<4>(&args[0])?, mat_of::<4>(&args[1])?);
            Ok(from_mat(mat_mul(&a, &b)))
        }),
        "mult_f_f33" => args_n(args, 2).and_then(|_| {
            let k = num(&args[0])?;
            Ok(from_mat(mat_of::<3>(&args[1])?.map(|row| row.map(|v| v * k))))
        }),
        "transpose_f33" => args_n(args, 1).and_then(|_| {
            let m = mat_of::<3>(&args[0])?;
            Ok(from_mat::<3>(std::array::from_fn(|i| std::array::from_fn(|j| m[j][i]))))
        }),
        "invert_f33" => args_n(args, 1).and_then(|_| {
            let m = mat_of::<3>(&args[0])?;
            invert3(&m).map(from_mat).ok_or_else(|| "singular matrix".to_string())
        }),

        // output, accepted and discarded
        "print" | "print_bool" | "print_int" | "print_float" | "print_half" | "print_string" => {
            Ok(Value::Void)
        }

        _ => return None,
    };
    Some(r)
}

// ============================================================================
// Argument helpers
// ============================================================================

fn args_n(args: &[Value], n: usize) -> Result<(), String> {
    if args.len() == n {
        Ok(())
    } else {
        Err(format!("expected {} arguments, got {}", n, args.len()))
    }
}

fn num(v: &Value) -> Result<f32, String> {
    v.as_f32().ok_or_else(|| format!("expected a number, got {}", v.type_name()))
}

fn f1(args: &[Value], f: fn(f32) -> f32) -> Result<Value, String> {
    args_n(args, 1)?;
    Ok(Value::Float(f(num(&args[0])?)))
}

fn f2(args: &[Value], f: fn(f32, f32) -> f32) -> Result<Value, String> {
    args_n(args, 2)?;
    Ok(Value::Float(f(num(&args[0])?, num(&args[1])?)))
}

fn f3(args: &[Value], f: fn(f32, f32, f32) -> f32) -> Result<Value, String> {
    args_n(args, 3)?;
    Ok(Value::Float(f(num(&args[0])?, num(&args[1])?, num(&args[2])?)))
}

fn b1(args: &[Value], f: fn(f32) -> bool) -> Result<Value, String> {
    args_n(args, 1)?;
    Ok(Value::Bool(f(num(&args[0])?)))
}

fn zip3(args: &[Value], f: fn(f32, f32) -> f32) -> Result<Value, String> {
    args_n(args, 2)?;
    let (a, b) = (f3_of(&args[0])?, f3_of(&args[1])?);
    Ok(from_f3(std::array::from_fn(|i| f(a[i], b[i]))))
}

fn f3_of(v: &Value) -> Result<[f32; 3], String> {
    match v {
        Value::Array(items) if items.len() == 3 => Ok([num(&items[0])?, num(&items[1])?, num(&items[2])?]),
        _ => Err("expected float[3]".to_string()),
    }
}

fn mat_of<const N: usize>(v: &Value) -> Result<[[f32; N]; N], String> {
    let bad = || format!("expected float[{}][{}]", N, N);
    let Value::Array(rows) = v else { return Err(bad()) };
    if rows.len() != N {
        return Err(bad());
    }
    let mut m = [[0.0; N]; N];
    for (i, row) in rows.iter().enumerate() {
        let Value::Array(cells) = row else { return Err(bad()) };
        if cells.len() != N {
            return Err(bad());
        }
        for (j, c) in cells.iter().enumerate() {
            m[i][j] = num(c)?;
        }
    }
    Ok(m)
}

fn from_f3(v: [f32; 3]) -> Value {
    Value::Array(v.iter().map(|x| Value::Float(*x)).collect())
}

fn from_mat<const N: usize>(m: [[f32; N]; N]) -> Value {
    Value::Array(m.iter().map(|row| Value::Array(row.iter().map(|x| Value::Float(*x)).collect())).collect())
}

fn mat_mul<const N: usize>(a: &[[f32; N]; N], b: &[[f32; N]; N]) -> [[f32; N]; N] {
    std::array::from_fn(|i| std::array::from_fn(|j| (0..N).map(|k| a[i][k] * b[k][j]).sum()))
}

fn invert3(m: &[[f32; 3]; 3]) -> Option<[[f32; 3]; 3]> {
    let c = |r0: usize, c0: usize, r1: usize, c1: usize| m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0];
    let det = m[0][0] * c(1, 1, 2, 2) - m[0][1] * c(1, 0, 2, 2) + m[0][2] * c(1, 0, 2, 1);
    if det.abs() < f32::EPSILON * 1e-3 {
        return None;
    }
    let inv = 1.0 / det;
    Some([
        [c(1, 1, 2, 2) * inv, -c(0, 1, 2, 2) * inv, c(0, 1, 1, 2) * inv],
        [-c(1, 0, 2, 2) * inv, c(0, 0, 2, 2) * inv, -c(0, 0, 1, 2) * inv],
        [c(1, 0, 2, 1) * inv, -c(0, 0, 2, 1) * inv, c(0, 0, 1, 1) * inv],
    ])
}
