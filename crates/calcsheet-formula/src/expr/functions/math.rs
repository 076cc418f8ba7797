//! Math and logical functions
//!
//! Aggregates flatten array arguments. Single-argument functions apply
//! element-wise to arrays and extend into the complex plane where the real
//! result is undefined (`sqrt(-1)` is `i`).

use num_complex::Complex64;

use crate::error::{FormulaError, FormulaResult};
use crate::expr::evaluator::{map_scalars, modulo, power, Value};

fn flatten(args: &[Value]) -> Vec<&Value> {
    let mut out = Vec::new();
    for arg in args {
        arg.flatten_into(&mut out);
    }
    out
}

fn numbers(args: &[Value], function: &str) -> FormulaResult<Vec<f64>> {
    flatten(args)
        .into_iter()
        .map(|v| {
            v.as_number().ok_or_else(|| {
                FormulaError::Argument(format!("{} expects numbers, got {}", function, v.type_name()))
            })
        })
        .collect()
}

fn at_least_one(values: Vec<f64>, function: &str) -> FormulaResult<Vec<f64>> {
    if values.is_empty() {
        Err(FormulaError::Argument(format!(
            "{} requires at least one value",
            function
        )))
    } else {
        Ok(values)
    }
}

/// Element-wise real function with a complex counterpart
fn elementwise(
    args: &[Value],
    on_real: fn(f64) -> Value,
    on_complex: fn(Complex64) -> Complex64,
) -> FormulaResult<Value> {
    map_scalars(&args[0], &|v: &Value| match v {
        Value::Complex(z) => Ok(Value::Complex(on_complex(*z))),
        other => Ok(on_real(other.to_number()?)),
    })
}

fn real(x: f64) -> Value {
    Value::Number(x)
}

fn complex_of(z: Complex64) -> Value {
    Value::Complex(z)
}

fn optional_digits(args: &[Value]) -> FormulaResult<i32> {
    match args.get(1) {
        Some(v) => Ok(v.to_number()?.trunc() as i32),
        None => Ok(0),
    }
}

/// Round with `f` at `digits` decimal places
fn round_with(args: &[Value], f: fn(f64) -> f64) -> FormulaResult<Value> {
    let digits = optional_digits(args)?;
    let factor = 10f64.powi(digits);
    map_scalars(&args[0], &|v: &Value| {
        let x = v.to_number()?;
        Ok(Value::Number(f(x * factor) / factor))
    })
}

// === Aggregates ===

/// sum(a, b, ...) - complex-aware; sum() is 0
pub fn fn_sum(args: &[Value]) -> FormulaResult<Value> {
    let values = flatten(args);
    if values.iter().any(|v| matches!(v, Value::Complex(_))) {
        let mut total = Complex64::new(0.0, 0.0);
        for v in values {
            total += v.to_complex()?;
        }
        return Ok(Value::Complex(total));
    }
    Ok(Value::Number(numbers(args, "sum")?.iter().sum()))
}

/// mean(a, b, ...) - AVERAGE
pub fn fn_mean(args: &[Value]) -> FormulaResult<Value> {
    let values = at_least_one(numbers(args, "mean")?, "mean")?;
    Ok(Value::Number(values.iter().sum::<f64>() / values.len() as f64))
}

pub fn fn_min(args: &[Value]) -> FormulaResult<Value> {
    let values = at_least_one(numbers(args, "min")?, "min")?;
    Ok(Value::Number(values.into_iter().fold(f64::INFINITY, f64::min)))
}

pub fn fn_max(args: &[Value]) -> FormulaResult<Value> {
    let values = at_least_one(numbers(args, "max")?, "max")?;
    Ok(Value::Number(
        values.into_iter().fold(f64::NEG_INFINITY, f64::max),
    ))
}

/// count(a, b, ...) - number of elements after flattening
pub fn fn_count(args: &[Value]) -> FormulaResult<Value> {
    Ok(Value::Number(flatten(args).len() as f64))
}

// === Rounding ===

/// round(x, [digits]) - half away from zero
pub fn fn_round(args: &[Value]) -> FormulaResult<Value> {
    round_with(args, f64::round)
}

/// ceil(x, [digits]) - CEILING
pub fn fn_ceil(args: &[Value]) -> FormulaResult<Value> {
    round_with(args, f64::ceil)
}

/// floor(x, [digits]) - FLOOR, INT
pub fn fn_floor(args: &[Value]) -> FormulaResult<Value> {
    round_with(args, f64::floor)
}

/// fix(x, [digits]) - TRUNC, towards zero
pub fn fn_fix(args: &[Value]) -> FormulaResult<Value> {
    round_with(args, f64::trunc)
}

/// rounddown(x, [digits]) - ROUNDDOWN, towards zero
pub fn fn_rounddown(args: &[Value]) -> FormulaResult<Value> {
    round_with(args, f64::trunc)
}

/// roundup(x, [digits]) - ROUNDUP, away from zero
pub fn fn_roundup(args: &[Value]) -> FormulaResult<Value> {
    round_with(args, |x| if x < 0.0 { x.floor() } else { x.ceil() })
}

// === Arithmetic ===

pub fn fn_abs(args: &[Value]) -> FormulaResult<Value> {
    map_scalars(&args[0], &|v: &Value| match v {
        Value::Complex(z) => Ok(Value::Number(z.norm())),
        other => Ok(Value::Number(other.to_number()?.abs())),
    })
}

/// sqrt(x) - complex for negative x
pub fn fn_sqrt(args: &[Value]) -> FormulaResult<Value> {
    elementwise(
        args,
        |x| {
            if x < 0.0 {
                Value::Complex(Complex64::new(0.0, (-x).sqrt()))
            } else {
                Value::Number(x.sqrt())
            }
        },
        |z| z.sqrt(),
    )
}

pub fn fn_exp(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.exp()), |z| z.exp())
}

/// log(x, [base]) - natural log by default
pub fn fn_log(args: &[Value]) -> FormulaResult<Value> {
    if let Some(base) = args.get(1) {
        let x = args[0].to_complex()?;
        let b = base.to_complex()?;
        if x.im == 0.0 && b.im == 0.0 && x.re >= 0.0 && b.re > 0.0 {
            return Ok(Value::Number(x.re.ln() / b.re.ln()));
        }
        return Ok(Value::Complex(x.ln() / b.ln()));
    }
    elementwise(
        args,
        |x| {
            if x < 0.0 {
                complex_of(Complex64::new(x, 0.0).ln())
            } else {
                real(x.ln())
            }
        },
        |z| z.ln(),
    )
}

pub fn fn_log10(args: &[Value]) -> FormulaResult<Value> {
    elementwise(
        args,
        |x| {
            if x < 0.0 {
                complex_of(Complex64::new(x, 0.0).ln() / std::f64::consts::LN_10)
            } else {
                real(x.log10())
            }
        },
        |z| z.ln() / std::f64::consts::LN_10,
    )
}

/// mod(x, y) - sign of the divisor
pub fn fn_mod(args: &[Value]) -> FormulaResult<Value> {
    Ok(Value::Number(modulo(
        args[0].to_number()?,
        args[1].to_number()?,
    )))
}

/// pow(x, y) - POWER
pub fn fn_pow(args: &[Value]) -> FormulaResult<Value> {
    if matches!(args[0], Value::Complex(_)) || matches!(args[1], Value::Complex(_)) {
        return Ok(Value::Complex(args[0].to_complex()?.powc(args[1].to_complex()?)));
    }
    Ok(power(args[0].to_number()?, args[1].to_number()?))
}

/// complex(re, [im])
pub fn fn_complex(args: &[Value]) -> FormulaResult<Value> {
    let re = args[0].to_number()?;
    let im = match args.get(1) {
        Some(v) => v.to_number()?,
        None => 0.0,
    };
    Ok(Value::Complex(Complex64::new(re, im)))
}

// === Trigonometry ===

pub fn fn_sin(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.sin()), |z| z.sin())
}

pub fn fn_cos(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.cos()), |z| z.cos())
}

pub fn fn_tan(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.tan()), |z| z.tan())
}

pub fn fn_asin(args: &[Value]) -> FormulaResult<Value> {
    elementwise(
        args,
        |x| {
            if x.abs() > 1.0 {
                complex_of(Complex64::new(x, 0.0).asin())
            } else {
                real(x.asin())
            }
        },
        |z| z.asin(),
    )
}

pub fn fn_acos(args: &[Value]) -> FormulaResult<Value> {
    elementwise(
        args,
        |x| {
            if x.abs() > 1.0 {
                complex_of(Complex64::new(x, 0.0).acos())
            } else {
                real(x.acos())
            }
        },
        |z| z.acos(),
    )
}

pub fn fn_atan(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.atan()), |z| z.atan())
}

/// atan2(y, x)
pub fn fn_atan2(args: &[Value]) -> FormulaResult<Value> {
    Ok(Value::Number(
        args[0].to_number()?.atan2(args[1].to_number()?),
    ))
}

pub fn fn_sinh(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.sinh()), |z| z.sinh())
}

pub fn fn_cosh(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.cosh()), |z| z.cosh())
}

pub fn fn_tanh(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.tanh()), |z| z.tanh())
}

pub fn fn_asinh(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.asinh()), |z| z.asinh())
}

pub fn fn_acosh(args: &[Value]) -> FormulaResult<Value> {
    elementwise(
        args,
        |x| {
            if x < 1.0 {
                complex_of(Complex64::new(x, 0.0).acosh())
            } else {
                real(x.acosh())
            }
        },
        |z| z.acosh(),
    )
}

pub fn fn_atanh(args: &[Value]) -> FormulaResult<Value> {
    elementwise(
        args,
        |x| {
            if x.abs() > 1.0 {
                complex_of(Complex64::new(x, 0.0).atanh())
            } else {
                real(x.atanh())
            }
        },
        |z| z.atanh(),
    )
}

pub fn fn_radians(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.to_radians()), |z| z * (std::f64::consts::PI / 180.0))
}

pub fn fn_degrees(args: &[Value]) -> FormulaResult<Value> {
    elementwise(args, |x| real(x.to_degrees()), |z| z * (180.0 / std::f64::consts::PI))
}

pub fn fn_pi(_args: &[Value]) -> FormulaResult<Value> {
    Ok(Value::Number(std::f64::consts::PI))
}

/// random([max]) or random(min, max) - uniform in [min, max), default [0, 1)
pub fn fn_random(args: &[Value]) -> FormulaResult<Value> {
    let (min, max) = match args {
        [] => (0.0, 1.0),
        [max] => (0.0, max.to_number()?),
        [min, max, ..] => (min.to_number()?, max.to_number()?),
    };
    let r: f64 = rand::random();
    Ok(Value::Number(min + r * (max - min)))
}

// === Logical ===

pub fn fn_not(args: &[Value]) -> FormulaResult<Value> {
    map_scalars(&args[0], &|v: &Value| Ok(Value::Boolean(!v.is_truthy()?)))
}

/// and(a, b, ...) - every value truthy
pub fn fn_and(args: &[Value]) -> FormulaResult<Value> {
    for v in flatten(args) {
        if !v.is_truthy()? {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

/// or(a, b, ...) - any value truthy
pub fn fn_or(args: &[Value]) -> FormulaResult<Value> {
    for v in flatten(args) {
        if v.is_truthy()? {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}
