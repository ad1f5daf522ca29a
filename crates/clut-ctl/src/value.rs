//! Runtime values and declared types.

use std::fmt;

/// Scalar base of a declared type.
///
/// `half` is read as `Float` and `unsigned` as `Int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    /// No value.
    Void,
    /// `bool`
    Bool,
    /// `int`, `unsigned`
    Int,
    /// `float`, `half`
    Float,
}

impl BaseType {
    /// Maps a type keyword.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "void" => BaseType::Void,
            "bool" => BaseType::Bool,
            "int" | "unsigned" => BaseType::Int,
            "float" | "half" => BaseType::Float,
            _ => return None,
        })
    }
}

/// A declared type: a base plus array dimensions, outermost first.
///
/// A dimension of `0` is unsized and takes the length of whatever is bound
/// to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    /// Element type.
    pub base: BaseType,
    /// Array dimensions, empty for scalars.
    pub dims: Vec<usize>,
}

impl Type {
    /// Scalar type.
    pub fn scalar(base: BaseType) -> Self {
        Self { base, dims: Vec::new() }
    }

    /// True for non-array types.
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Zero-initialized value of this type.
    pub fn zero(&self) -> Value {
        zero_of(self.base, &self.dims)
    }
}

fn zero_of(base: BaseType, dims: &[usize]) -> Value {
    match dims.split_first() {
        Some((n, rest)) => Value::Array((0..*n).map(|_| zero_of(base, rest)).collect()),
        None => match base {
            BaseType::Void => Value::Void,
            BaseType::Bool => Value::Bool(false),
            BaseType::Int => Value::Int(0),
            BaseType::Float => Value::Float(0.0),
        },
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.base {
            BaseType::Void => "void",
            BaseType::Bool => "bool",
            BaseType::Int => "int",
            BaseType::Float => "float",
        };
        write!(f, "{}", base)?;
        for d in &self.dims {
            write!(f, "[{}]", d)?;
        }
        Ok(())
    }
}

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of a `void` function.
    Void,
    /// Boolean.
    Bool(bool),
    /// 32-bit integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// Fixed-size array.
    Array(Vec<Value>),
}

impl Value {
    /// Numeric view, booleans as 0/1.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(i as f32),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Integer view, floats truncated toward zero.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Bool(b) => Some(b as i32),
            Value::Int(i) => Some(i),
            Value::Float(f) => Some(f as i32),
            _ => None,
        }
    }

    /// Truth value of a scalar.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            Value::Int(i) => Some(i != 0),
            Value::Float(f) => Some(f != 0.0),
            _ => None,
        }
    }

    /// Short name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Array(_) => "array",
        }
    }

    /// Converts to `ty`, applying the implicit scalar conversions and
    /// checking array shapes.
    pub fn coerce(self, ty: &Type) -> Result<Value, String> {
        coerce_to(self, ty.base, &ty.dims)
    }
}

fn coerce_to(v: Value, base: BaseType, dims: &[usize]) -> Result<Value, String> {
    match (dims.split_first(), v) {
        (Some((n, rest)), Value::Array(items)) => {
            if *n != 0 && items.len() != *n {
                return Err(format!("expected {} elements, got {}", n, items.len()));
            }
            items
                .into_iter()
                .map(|item| coerce_to(item, base, rest))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        (Some(_), v) => Err(format!("expected an array, got {}", v.type_name())),
        (None, v @ Value::Array(_)) => Err(format!("expected a scalar, got {}", v.type_name())),
        (None, v) => {
            let bad = || format!("cannot convert {} to {:?}", v.type_name(), base);
            Ok(match base {
                BaseType::Void => Value::Void,
                BaseType::Bool => Value::Bool(v.as_bool().ok_or_else(bad)?),
                BaseType::Int => Value::Int(v.as_i32().ok_or_else(bad)?),
                BaseType::Float => Value::Float(v.as_f32().ok_or_else(bad)?),
            })
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Array(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_coercion() {
        let float = Type::scalar(BaseType::Float);
        assert_eq!(Value::Int(3).coerce(&float).unwrap(), Value::Float(3.0));
        let int = Type::scalar(BaseType::Int);
        assert_eq!(Value::Float(-2.7).coerce(&int).unwrap(), Value::Int(-2));
        let b = Type::scalar(BaseType::Bool);
        assert_eq!(Value::Float(0.5).coerce(&b).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_array_shapes() {
        let f3 = Type { base: BaseType::Float, dims: vec![3] };
        let v = Value::Array(vec![Value::Int(1), Value::Float(2.0), Value::Int(3)]);
        assert_eq!(
            v.coerce(&f3).unwrap(),
            Value::Array(vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)])
        );
        assert!(Value::Array(vec![Value::Int(1)]).coerce(&f3).is_err());
        assert!(Value::Float(1.0).coerce(&f3).is_err());

        let unsized_ty = Type { base: BaseType::Int, dims: vec![0] };
        assert!(Value::Array(vec![Value::Int(1); 5]).coerce(&unsized_ty).is_ok());
    }

    #[test]
    fn test_zero() {
        let m = Type { base: BaseType::Float, dims: vec![2, 2] };
        assert_eq!(m.zero().to_string(), "{{0, 0}, {0, 0}}");
        assert_eq!(m.to_string(), "float[2][2]");
    }
}
