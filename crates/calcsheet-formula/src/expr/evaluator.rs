//! Expression evaluator

use std::cmp::Ordering;
use std::fmt;

use calcsheet_core::CellValue;
use num_complex::Complex64;

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use super::functions::FunctionRegistry;
use crate::error::{FormulaError, FormulaResult};

/// Value produced by evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Complex(Complex64),
    Text(String),
    Boolean(bool),
    /// Array literal or function result; rows of a 2-D range are nested arrays
    Array(Vec<Value>),
    /// No result (e.g. a lookup that found nothing)
    Absent,
}

impl Value {
    /// Convert to a real number, if possible
    ///
    /// Booleans count as 0/1 and numeric text is parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Force conversion to a real number for arithmetic
    pub fn to_number(&self) -> FormulaResult<f64> {
        self.as_number().ok_or_else(|| {
            FormulaError::Evaluation(format!("Cannot convert {} to number", self.describe()))
        })
    }

    /// Force conversion to a complex number for arithmetic
    pub fn to_complex(&self) -> FormulaResult<Complex64> {
        match self {
            Value::Complex(z) => Ok(*z),
            other => other.to_number().map(|n| Complex64::new(n, 0.0)),
        }
    }

    /// Truth value used by conditionals and logical functions
    pub fn is_truthy(&self) -> FormulaResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0 && !n.is_nan()),
            Value::Complex(z) => Ok(z.re != 0.0 || z.im != 0.0),
            Value::Text(s) => Ok(!s.is_empty()),
            Value::Array(_) | Value::Absent => Err(FormulaError::Evaluation(format!(
                "Cannot use {} as a condition",
                self.describe()
            ))),
        }
    }

    /// Collect the scalar leaves of nested arrays, in order
    pub fn flatten_into<'v>(&'v self, out: &mut Vec<&'v Value>) {
        match self {
            Value::Array(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
            scalar => out.push(scalar),
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Complex(_) => "complex",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Array(_) => "array",
            Value::Absent => "nothing",
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Text(s) => format!("\"{}\"", s),
            Value::Array(_) | Value::Absent => self.type_name().to_string(),
            other => other.to_string(),
        }
    }

    /// Convert into a storable cell value
    ///
    /// A one-element array is unwrapped. Larger arrays and [`Value::Absent`]
    /// have no cell representation.
    pub fn into_cell_value(self) -> Option<CellValue> {
        match self {
            Value::Number(n) => Some(CellValue::Number(n)),
            Value::Complex(z) => Some(CellValue::Complex(z)),
            Value::Text(s) => Some(CellValue::Text(s)),
            Value::Boolean(b) => Some(CellValue::Boolean(b)),
            Value::Array(mut items) if items.len() == 1 => items.pop().and_then(Value::into_cell_value),
            Value::Array(_) | Value::Absent => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Complex(z) => write!(f, "{}", z),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Absent => Ok(()),
        }
    }
}

impl From<&CellValue> for Value {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Number(n) => Value::Number(*n),
            CellValue::Text(s) => Value::Text(s.clone()),
            CellValue::Boolean(b) => Value::Boolean(*b),
            CellValue::Complex(z) => Value::Complex(*z),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Evaluate an expression
///
/// Function calls are resolved in `registry` by exact name.
pub fn evaluate(expr: &Expr, registry: &FunctionRegistry) -> FormulaResult<Value> {
    match expr {
        // === Literals ===
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::Boolean(b) => Ok(Value::Boolean(*b)),
        Expr::Identifier(name) => resolve_constant(name),
        Expr::Array(items) => items
            .iter()
            .map(|item| evaluate(item, registry))
            .collect::<FormulaResult<Vec<_>>>()
            .map(Value::Array),

        // === Operators ===
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, registry)?;
            let right = evaluate(right, registry)?;
            broadcast(&left, &right, &|l: &Value, r: &Value| {
                if op.is_comparison() {
                    compare(*op, l, r)
                } else {
                    arithmetic(*op, l, r)
                }
            })
        }

        Expr::Unary { op, operand } => {
            let value = evaluate(operand, registry)?;
            map_scalars(&value, &|v: &Value| evaluate_unary(*op, v))
        }

        // Only the chosen branch is evaluated
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if evaluate(condition, registry)?.is_truthy()? {
                evaluate(then, registry)
            } else {
                evaluate(otherwise, registry)
            }
        }

        // === Functions ===
        Expr::Call { name, args } => evaluate_call(name, args, registry),
    }
}

fn resolve_constant(name: &str) -> FormulaResult<Value> {
    match name {
        "pi" | "PI" => Ok(Value::Number(std::f64::consts::PI)),
        "e" | "E" => Ok(Value::Number(std::f64::consts::E)),
        "tau" => Ok(Value::Number(std::f64::consts::TAU)),
        "i" => Ok(Value::Complex(Complex64::new(0.0, 1.0))),
        "Infinity" => Ok(Value::Number(f64::INFINITY)),
        "NaN" => Ok(Value::Number(f64::NAN)),
        _ => Err(FormulaError::UnknownIdentifier(name.to_string())),
    }
}

/// Apply `f` element-wise when either side is an array
pub(crate) fn broadcast(
    left: &Value,
    right: &Value,
    f: &dyn Fn(&Value, &Value) -> FormulaResult<Value>,
) -> FormulaResult<Value> {
    match (left, right) {
        (Value::Array(l), Value::Array(r)) => {
            if l.len() != r.len() {
                return Err(FormulaError::Evaluation(format!(
                    "Dimension mismatch ({} != {})",
                    l.len(),
                    r.len()
                )));
            }
            l.iter()
                .zip(r)
                .map(|(a, b)| broadcast(a, b, f))
                .collect::<FormulaResult<Vec<_>>>()
                .map(Value::Array)
        }
        (Value::Array(l), scalar) => l
            .iter()
            .map(|a| broadcast(a, scalar, f))
            .collect::<FormulaResult<Vec<_>>>()
            .map(Value::Array),
        (scalar, Value::Array(r)) => r
            .iter()
            .map(|b| broadcast(scalar, b, f))
            .collect::<FormulaResult<Vec<_>>>()
            .map(Value::Array),
        (l, r) => f(l, r),
    }
}

/// Apply `f` to every scalar of a possibly nested array
pub(crate) fn map_scalars(
    value: &Value,
    f: &dyn Fn(&Value) -> FormulaResult<Value>,
) -> FormulaResult<Value> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| map_scalars(item, f))
            .collect::<FormulaResult<Vec<_>>>()
            .map(Value::Array),
        scalar => f(scalar),
    }
}

fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> FormulaResult<Value> {
    if matches!(left, Value::Complex(_)) || matches!(right, Value::Complex(_)) {
        let l = left.to_complex()?;
        let r = right.to_complex()?;
        let z = match op {
            BinaryOperator::Add => l + r,
            BinaryOperator::Subtract => l - r,
            BinaryOperator::Multiply => l * r,
            BinaryOperator::Divide => l / r,
            BinaryOperator::Power => l.powc(r),
            _ => {
                return Err(FormulaError::Evaluation(
                    "Modulo is not defined for complex numbers".into(),
                ))
            }
        };
        return Ok(Value::Complex(z));
    }

    let l = left.to_number()?;
    let r = right.to_number()?;
    Ok(match op {
        BinaryOperator::Add => Value::Number(l + r),
        BinaryOperator::Subtract => Value::Number(l - r),
        BinaryOperator::Multiply => Value::Number(l * r),
        // IEEE semantics: x/0 is a signed infinity, 0/0 is NaN
        BinaryOperator::Divide => Value::Number(l / r),
        BinaryOperator::Modulo => Value::Number(modulo(l, r)),
        _ => power(l, r),
    })
}

/// `x mod y` with the sign of the divisor; `x mod 0` is `x`
pub(crate) fn modulo(x: f64, y: f64) -> f64 {
    if y == 0.0 {
        x
    } else {
        x - y * (x / y).floor()
    }
}

/// Real power, complex when a negative base meets a fractional exponent
pub(crate) fn power(base: f64, exponent: f64) -> Value {
    if base < 0.0 && exponent.is_finite() && exponent.fract() != 0.0 {
        Value::Complex(Complex64::new(base, 0.0).powf(exponent))
    } else {
        Value::Number(base.powf(exponent))
    }
}

fn compare(op: BinaryOperator, left: &Value, right: &Value) -> FormulaResult<Value> {
    let ordering = match (left, right) {
        (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
        (Value::Complex(_), _) | (_, Value::Complex(_)) => {
            let equal = left.to_complex()? == right.to_complex()?;
            return match op {
                BinaryOperator::Equal => Ok(Value::Boolean(equal)),
                BinaryOperator::NotEqual => Ok(Value::Boolean(!equal)),
                _ => Err(FormulaError::Evaluation(
                    "Complex numbers cannot be ordered".into(),
                )),
            };
        }
        _ => left.to_number()?.partial_cmp(&right.to_number()?),
    };

    // NaN compares unequal to everything
    let result = match (op, ordering) {
        (BinaryOperator::NotEqual, None) => true,
        (_, None) => false,
        (BinaryOperator::Equal, Some(o)) => o == Ordering::Equal,
        (BinaryOperator::NotEqual, Some(o)) => o != Ordering::Equal,
        (BinaryOperator::LessThan, Some(o)) => o == Ordering::Less,
        (BinaryOperator::LessEqual, Some(o)) => o != Ordering::Greater,
        (BinaryOperator::GreaterThan, Some(o)) => o == Ordering::Greater,
        (_, Some(o)) => o != Ordering::Less,
    };
    Ok(Value::Boolean(result))
}

fn evaluate_unary(op: UnaryOperator, value: &Value) -> FormulaResult<Value> {
    match (op, value) {
        (UnaryOperator::Negate, Value::Complex(z)) => Ok(Value::Complex(-z)),
        (UnaryOperator::Percent, Value::Complex(z)) => Ok(Value::Complex(z / 100.0)),
        (UnaryOperator::Negate, v) => Ok(Value::Number(-v.to_number()?)),
        (UnaryOperator::Percent, v) => Ok(Value::Number(v.to_number()? / 100.0)),
    }
}

fn evaluate_call(name: &str, args: &[Expr], registry: &FunctionRegistry) -> FormulaResult<Value> {
    let func = registry
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    if args.len() < func.min_args {
        return Err(FormulaError::ArgumentCount {
            function: name.to_string(),
            expected: format!("at least {}", func.min_args),
            actual: args.len(),
        });
    }

    if let Some(max) = func.max_args {
        if args.len() > max {
            return Err(FormulaError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at most {}", max),
                actual: args.len(),
            });
        }
    }

    let evaluated = args
        .iter()
        .map(|arg| evaluate(arg, registry))
        .collect::<FormulaResult<Vec<_>>>()?;

    (func.implementation)(&evaluated)
}
