//! Lookup functions
//!
//! Ranges arrive as nested arrays, one inner array per row. A flat array is
//! read as a single row and a scalar as a 1x1 range.

use std::cmp::Ordering;

use crate::error::{FormulaError, FormulaResult};
use crate::expr::evaluator::Value;

fn rows_of(value: &Value) -> Vec<&[Value]> {
    match value {
        Value::Array(items) => {
            let nested: Vec<&[Value]> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Array(row) => Some(row.as_slice()),
                    _ => None,
                })
                .collect();
            if !items.is_empty() && nested.len() == items.len() {
                nested
            } else {
                vec![items.as_slice()]
            }
        }
        scalar => vec![std::slice::from_ref(scalar)],
    }
}

fn to_index(value: &Value, function: &str) -> FormulaResult<i64> {
    let n = value.to_number()?;
    if n.is_nan() {
        return Err(FormulaError::Argument(format!(
            "{}: index must be a number",
            function
        )));
    }
    Ok(n.trunc() as i64)
}

/// Order two lookup keys; `None` when they are not comparable
///
/// Numbers compare numerically, text case-insensitively, booleans by value,
/// and numeric text against numbers by its parsed value.
fn compare_keys(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => Some(x.to_lowercase().cmp(&y.to_lowercase())),
        (Value::Number(x), Value::Text(s)) => x.partial_cmp(&s.trim().parse::<f64>().ok()?),
        (Value::Text(s), Value::Number(y)) => s.trim().parse::<f64>().ok()?.partial_cmp(y),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Complex(x), Value::Complex(y)) => x == y,
        _ => compare_keys(a, b) == Some(Ordering::Equal),
    }
}

/// INDEX(array, row_num, [column_num])
///
/// 1-based. A zero index selects the whole row or column; both zero select
/// the whole array.
pub fn fn_index(args: &[Value]) -> FormulaResult<Value> {
    let rows = rows_of(&args[0]);
    let row_num = to_index(&args[1], "INDEX")?;
    let col_num = match args.get(2) {
        Some(v) => to_index(v, "INDEX")?,
        None => 1,
    };

    if row_num < 0 || col_num < 0 {
        return Err(FormulaError::Argument(format!(
            "INDEX: negative index ({}, {})",
            row_num, col_num
        )));
    }

    let out_of_bounds = || {
        FormulaError::Argument(format!(
            "INDEX: ({}, {}) is outside the array",
            row_num, col_num
        ))
    };

    if row_num as usize > rows.len() {
        return Err(out_of_bounds());
    }

    let row_at = |r: i64| rows[(r - 1) as usize];
    let cell_at = |row: &[Value], c: i64| row.get((c - 1) as usize).cloned();

    match (row_num, col_num) {
        (0, 0) => Ok(Value::Array(
            rows.iter().map(|row| Value::Array(row.to_vec())).collect(),
        )),
        // Whole column, as a column array
        (0, c) => rows
            .iter()
            .map(|row| cell_at(row, c).map(|v| Value::Array(vec![v])))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array)
            .ok_or_else(out_of_bounds),
        // Whole row, as a row array
        (r, 0) => Ok(Value::Array(vec![Value::Array(row_at(r).to_vec())])),
        (r, c) => cell_at(row_at(r), c).ok_or_else(out_of_bounds),
    }
}

/// MATCH(lookup_value, lookup_vector, [match_type])
///
/// - `0`: first exact match
/// - `1` (default): largest value <= lookup_value, vector ascending
/// - `-1`: smallest value >= lookup_value, vector descending
pub fn fn_match(args: &[Value]) -> FormulaResult<Value> {
    let key = &args[0];
    if matches!(key, Value::Array(_)) {
        return Err(FormulaError::Argument(
            "MATCH: lookup value must be a single value".into(),
        ));
    }

    let rows = rows_of(&args[1]);
    let vector: Vec<&Value> = if rows.len() == 1 {
        rows[0].iter().collect()
    } else if rows.iter().all(|row| row.len() == 1) {
        rows.iter().map(|row| &row[0]).collect()
    } else {
        return Err(FormulaError::Argument(
            "MATCH: lookup range must be a single row or column".into(),
        ));
    };

    let match_type = match args.get(2) {
        Some(v) => v.to_number()?,
        None => 1.0,
    };

    let position = if match_type == 0.0 {
        vector.iter().position(|v| values_equal(v, key))
    } else {
        // Stop at the first value past the key, as a sorted search would
        let (accept, stop) = if match_type > 0.0 {
            (Ordering::Greater, Ordering::Greater)
        } else {
            (Ordering::Less, Ordering::Less)
        };
        let mut found = None;
        for (i, v) in vector.iter().enumerate() {
            match compare_keys(v, key) {
                Some(o) if o == stop => break,
                Some(o) if o != accept => found = Some(i),
                _ => {}
            }
        }
        found
    };

    position
        .map(|i| Value::Number((i + 1) as f64))
        .ok_or_else(|| FormulaError::NotFound(format!("MATCH found no match for {}", key)))
}

/// VLOOKUP(lookup_value, table, col_index, [range_lookup])
///
/// Exact match on the first column. `range_lookup` is accepted and ignored.
/// A missing key or an out-of-range column yields no value.
pub fn fn_vlookup(args: &[Value]) -> FormulaResult<Value> {
    let key = &args[0];
    let col = to_index(&args[2], "VLOOKUP")?;

    let found = rows_of(&args[1])
        .into_iter()
        .find(|row| row.first().map_or(false, |first| values_equal(first, key)));

    let value = match found {
        Some(row) if col >= 1 => row.get((col - 1) as usize).cloned(),
        _ => None,
    };
    Ok(value.unwrap_or(Value::Absent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{evaluate, parse_expression, FunctionRegistry};
    use pretty_assertions::assert_eq;

    fn eval(src: &str) -> FormulaResult<Value> {
        evaluate(&parse_expression(src)?, &FunctionRegistry::new())
    }

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    const TABLE: &str = r#"[["apple", 1], ["banana", 2], ["cherry", 3]]"#;

    #[test]
    fn test_index_single_cell() {
        assert_eq!(eval("INDEX([[1, 2], [3, 4]], 2, 1)").unwrap(), n(3.0));
        assert_eq!(eval("INDEX([[1], [2], [3]], 2)").unwrap(), n(2.0));
    }

    #[test]
    fn test_index_zero_selects_dimension() {
        assert_eq!(
            eval("INDEX([[1, 2], [3, 4]], 0, 2)").unwrap(),
            Value::Array(vec![Value::Array(vec![n(2.0)]), Value::Array(vec![n(4.0)])])
        );
        assert_eq!(
            eval("INDEX([[1, 2], [3, 4]], 2, 0)").unwrap(),
            Value::Array(vec![Value::Array(vec![n(3.0), n(4.0)])])
        );
        assert_eq!(
            eval("INDEX([[1, 2], [3, 4]], 0, 0)").unwrap(),
            eval("[[1, 2], [3, 4]]").unwrap()
        );
    }

    #[test]
    fn test_index_bounds() {
        assert!(eval("INDEX([[1, 2], [3, 4]], 3, 1)").is_err());
        assert!(eval("INDEX([[1, 2], [3, 4]], 1, 3)").is_err());
        assert!(eval("INDEX([[1, 2], [3, 4]], -1, 1)").is_err());
    }

    #[test]
    fn test_match_exact() {
        assert_eq!(eval("MATCH(2, [[1], [2], [3]], 0)").unwrap(), n(2.0));
        assert_eq!(eval(r#"MATCH("B", [["a", "b", "c"]], 0)"#).unwrap(), n(2.0));
        assert_eq!(eval(r#"MATCH("3", [[1], [2], [3]], 0)"#).unwrap(), n(3.0));
        assert_eq!(
            eval("MATCH(9, [[1], [2], [3]], 0)"),
            Err(FormulaError::NotFound("MATCH found no match for 9".into()))
        );
    }

    #[test]
    fn test_match_approximate() {
        // Default type 1: largest value <= key on ascending data
        assert_eq!(eval("MATCH(25, [[10], [20], [30]])").unwrap(), n(2.0));
        assert_eq!(eval("MATCH(30, [[10], [20], [30]], 1)").unwrap(), n(3.0));
        assert!(matches!(
            eval("MATCH(5, [[10], [20], [30]], 1)"),
            Err(FormulaError::NotFound(_))
        ));

        // Type -1: smallest value >= key on descending data
        assert_eq!(eval("MATCH(25, [[30], [20], [10]], -1)").unwrap(), n(1.0));
        assert_eq!(eval("MATCH(20, [[30], [20], [10]], -1)").unwrap(), n(2.0));
        assert!(eval("MATCH(35, [[30], [20], [10]], -1)").is_err());
    }

    #[test]
    fn test_match_requires_vector() {
        assert!(matches!(
            eval("MATCH(1, [[1, 2], [3, 4]], 0)"),
            Err(FormulaError::Argument(_))
        ));
    }

    #[test]
    fn test_vlookup() {
        assert_eq!(
            eval(&format!(r#"VLOOKUP("banana", {}, 2)"#, TABLE)).unwrap(),
            n(2.0)
        );
        assert_eq!(
            eval(&format!(r#"VLOOKUP("CHERRY", {}, 2, false)"#, TABLE)).unwrap(),
            n(3.0)
        );
        assert_eq!(
            eval(&format!(r#"VLOOKUP("kiwi", {}, 2)"#, TABLE)).unwrap(),
            Value::Absent
        );
        assert_eq!(
            eval(&format!(r#"VLOOKUP("apple", {}, 3)"#, TABLE)).unwrap(),
            Value::Absent
        );
    }

    #[test]
    fn test_index_match_composition() {
        assert_eq!(
            eval("INDEX([[1], [2], [3]], MATCH(2, [[1], [2], [3]], 0), 1)").unwrap(),
            n(2.0)
        );
    }
}
