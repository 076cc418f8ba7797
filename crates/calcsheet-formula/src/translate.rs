//! Spreadsheet formula → evaluator expression
//!
//! Translation runs in two token passes over the formula text:
//!
//! 1. `IF(c, t, e)` becomes the conditional `((c) ? (t) : (e))`.
//! 2. References are replaced by literals of their current values, function
//!    names are mapped to the evaluator's, and `=` / `<>` become `==` / `!=`.
//!
//! Both passes work on lexer tokens, so nothing inside a string literal is
//! ever rewritten.

use std::ops::Range;

use ahash::AHashMap;
use calcsheet_core::{CellAddress, CellValue, Worksheet};
use once_cell::sync::Lazy;

use crate::error::{FormulaError, FormulaResult};
use crate::expr::parser::MAX_NESTING;
use crate::lexer::{next_significant, quote_string, tokenize, Token, TokenKind};
use crate::reference::{scan_references, Reference, MAX_RANGE_CELLS};

/// What an empty reference turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedReferencePolicy {
    /// Render `0`
    #[default]
    Zero,
    /// Render the text literal `"undefined"`
    UndefinedText,
    /// Fail with [`FormulaError::UnresolvedReference`]
    Fail,
}

/// Functions that take a range as a 2D array rather than a value list
const LOOKUP_FUNCTIONS: [&str; 3] = ["INDEX", "MATCH", "VLOOKUP"];

/// Spreadsheet function name (upper case) → evaluator function name
static FUNCTION_NAMES: Lazy<AHashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("ABS", "abs"),
        ("ACOS", "acos"),
        ("ACOSH", "acosh"),
        ("AND", "and"),
        ("ASIN", "asin"),
        ("ASINH", "asinh"),
        ("ATAN", "atan"),
        ("ATAN2", "atan2"),
        ("ATANH", "atanh"),
        ("AVERAGE", "mean"),
        ("CEILING", "ceil"),
        ("COS", "cos"),
        ("COSH", "cosh"),
        ("COUNT", "count"),
        ("DEGREES", "degrees"),
        ("EXP", "exp"),
        ("FLOOR", "floor"),
        ("INT", "floor"),
        ("LOG", "log"),
        ("LOG10", "log10"),
        ("MAX", "max"),
        ("MIN", "min"),
        ("MOD", "mod"),
        ("NOT", "not"),
        ("OR", "or"),
        ("PI", "pi"),
        ("POWER", "pow"),
        ("RADIANS", "radians"),
        ("RAND", "random"),
        ("ROUND", "round"),
        ("ROUNDDOWN", "rounddown"),
        ("ROUNDUP", "roundup"),
        ("SIN", "sin"),
        ("SINH", "sinh"),
        ("SQRT", "sqrt"),
        ("SUM", "sum"),
        ("TAN", "tan"),
        ("TANH", "tanh"),
        ("TRUNC", "fix"),
        ("INDEX", "INDEX"),
        ("MATCH", "MATCH"),
        ("VLOOKUP", "VLOOKUP"),
    ]
    .into_iter()
    .collect()
});

/// Evaluator name for a spreadsheet function, if it has one
pub fn map_function_name(name: &str) -> Option<&'static str> {
    FUNCTION_NAMES
        .get(name.to_ascii_uppercase().as_str())
        .copied()
}

/// Translates formulas against a worksheet's current values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormulaTranslator {
    pub unresolved: UnresolvedReferencePolicy,
}

impl FormulaTranslator {
    pub fn new(unresolved: UnresolvedReferencePolicy) -> Self {
        Self { unresolved }
    }

    /// Translate `formula` into text the expression parser accepts
    ///
    /// ```rust
    /// use calcsheet_core::{Cell, Worksheet};
    /// use calcsheet_formula::FormulaTranslator;
    ///
    /// let sheet = Worksheet::from_entries([("A1", Cell::with_value(4.0))]).unwrap();
    /// let text = FormulaTranslator::default()
    ///     .translate("=IF(A1<>4, \"no\", \"yes\")", &sheet)
    ///     .unwrap();
    /// assert_eq!(text, "((4!=4) ? (\"no\") : (\"yes\"))");
    /// ```
    pub fn translate(&self, formula: &str, sheet: &Worksheet) -> FormulaResult<String> {
        let trimmed = formula.trim_start();
        let body = trimmed.strip_prefix('=').unwrap_or(trimmed);
        check_nesting(body)?;
        let conditional = rewrite_conditionals(body);
        self.substitute(&conditional, sheet)
    }

    fn substitute(&self, text: &str, sheet: &Worksheet) -> FormulaResult<String> {
        let tokens = tokenize(text);
        let mut refs = scan_references(text).into_iter().peekable();
        // Name of each open call, `None` for plain grouping parentheses
        let mut calls: Vec<Option<&str>> = Vec::new();
        let mut previous: Option<&Token<'_>> = None;
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];

            if let Some(found) = refs.next_if(|r| r.span.start == token.span.start) {
                let in_lookup = calls
                    .iter()
                    .rev()
                    .flatten()
                    .next()
                    .map_or(false, |name| {
                        LOOKUP_FUNCTIONS.iter().any(|f| name.eq_ignore_ascii_case(f))
                    });
                out.push_str(&self.render_reference(&found.reference, in_lookup, sheet)?);
                while i < tokens.len() && tokens[i].span.start < found.span.end {
                    i += 1;
                }
                previous = tokens.get(i - 1);
                continue;
            }

            match token.kind {
                TokenKind::LeftParen => {
                    let name = previous
                        .filter(|t| t.kind == TokenKind::Ident)
                        .map(|t| t.text);
                    calls.push(name);
                    out.push_str(token.text);
                }
                TokenKind::RightParen => {
                    calls.pop();
                    out.push_str(token.text);
                }
                TokenKind::Ident => {
                    let called = next_significant(&tokens, i + 1)
                        .map_or(false, |j| tokens[j].kind == TokenKind::LeftParen);
                    if called {
                        out.push_str(map_function_name(token.text).unwrap_or(token.text));
                    } else if token.is_ident("TRUE") {
                        out.push_str("true");
                    } else if token.is_ident("FALSE") {
                        out.push_str("false");
                    } else {
                        out.push_str(token.text);
                    }
                }
                TokenKind::Operator => out.push_str(match token.text {
                    "=" => "==",
                    "<>" => "!=",
                    other => other,
                }),
                _ => out.push_str(token.text),
            }

            if token.kind != TokenKind::Whitespace {
                previous = Some(token);
            }
            i += 1;
        }

        Ok(out)
    }

    fn render_reference(
        &self,
        reference: &Reference,
        in_lookup: bool,
        sheet: &Worksheet,
    ) -> FormulaResult<String> {
        match reference {
            Reference::Cell(addr) => self.render_cell(*addr, sheet),
            Reference::Range(range) if range.cell_count() > MAX_RANGE_CELLS => {
                Err(FormulaError::Argument(format!(
                    "range {} covers {} cells, more than {}",
                    range,
                    range.cell_count(),
                    MAX_RANGE_CELLS
                )))
            }
            Reference::Range(range) if in_lookup => {
                let rows = range
                    .rows()
                    .map(|row| {
                        row.map(|addr| self.render_cell(addr, sheet))
                            .collect::<FormulaResult<Vec<_>>>()
                            .map(|cells| format!("[{}]", cells.join(", ")))
                    })
                    .collect::<FormulaResult<Vec<_>>>()?;
                Ok(format!("[{}]", rows.join(", ")))
            }
            Reference::Range(range) => Ok(range
                .cells()
                .map(|addr| self.render_cell(addr, sheet))
                .collect::<FormulaResult<Vec<_>>>()?
                .join(", ")),
        }
    }

    fn render_cell(&self, addr: CellAddress, sheet: &Worksheet) -> FormulaResult<String> {
        match sheet.value_at(addr) {
            Some(value) => Ok(render_value(value)),
            None => match self.unresolved {
                UnresolvedReferencePolicy::Zero => Ok("0".to_string()),
                UnresolvedReferencePolicy::UndefinedText => Ok(quote_string("undefined")),
                UnresolvedReferencePolicy::Fail => {
                    Err(FormulaError::UnresolvedReference(addr.to_string()))
                }
            },
        }
    }
}

/// Render a cell value as an expression literal
pub fn render_value(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) => render_number(*n),
        CellValue::Text(s) => quote_string(s),
        CellValue::Boolean(b) => b.to_string(),
        CellValue::Complex(z) => {
            format!("complex({}, {})", render_number(z.re), render_number(z.im))
        }
    }
}

fn render_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "(-Infinity)".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n < 0.0 {
        format!("({})", n)
    } else {
        n.to_string()
    }
}

/// Reject text with more than [`MAX_NESTING`] open parentheses or brackets
fn check_nesting(text: &str) -> FormulaResult<()> {
    let mut depth = 0usize;
    for token in tokenize(text) {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(FormulaError::Parse(format!(
                        "Formula nested more than {} levels deep",
                        MAX_NESTING
                    )));
                }
            }
            TokenKind::RightParen | TokenKind::RightBracket => {
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Rewrite every three-argument `IF(c, t, e)` as `((c) ? (t) : (e))`
///
/// Arguments are rewritten recursively, one level per nested `IF`; the
/// translator rejects deeply nested text before calling this. Calls with
/// another argument count, or without a closing parenthesis, are left as
/// written.
pub fn rewrite_conditionals(text: &str) -> String {
    let tokens = tokenize(text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < tokens.len() {
        if tokens[i].is_ident("IF") {
            let open = next_significant(&tokens, i + 1)
                .filter(|&j| tokens[j].kind == TokenKind::LeftParen);
            if let Some((close, args)) = open.and_then(|j| split_arguments(&tokens, j)) {
                if let [condition, then, otherwise] = args.as_slice() {
                    let arg = |span: &Range<usize>| rewrite_conditionals(text[span.clone()].trim());
                    out.push_str(&text[copied..tokens[i].span.start]);
                    out.push_str(&format!(
                        "(({}) ? ({}) : ({}))",
                        arg(condition),
                        arg(then),
                        arg(otherwise)
                    ));
                    copied = tokens[close].span.end;
                    i = close + 1;
                    continue;
                }
            }
        }
        i += 1;
    }

    out.push_str(&text[copied..]);
    out
}

/// Byte spans of the depth-0 arguments of the call opened at token `open`,
/// with the index of its closing parenthesis
fn split_arguments(tokens: &[Token<'_>], open: usize) -> Option<(usize, Vec<Range<usize>>)> {
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut start = tokens[open].span.end;

    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    args.push(start..token.span.start);
                    return Some((i, args));
                }
            }
            TokenKind::Comma if depth == 1 => {
                args.push(start..token.span.start);
                start = token.span.end;
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcsheet_core::Cell;
    use pretty_assertions::assert_eq;

    fn sheet(entries: &[(&str, CellValue)]) -> Worksheet {
        Worksheet::from_entries(
            entries
                .iter()
                .map(|(addr, value)| (*addr, Cell::with_value(value.clone()))),
        )
        .unwrap()
    }

    fn translate(formula: &str, sheet: &Worksheet) -> String {
        FormulaTranslator::default().translate(formula, sheet).unwrap()
    }

    #[test]
    fn test_single_references() {
        let s = sheet(&[("A1", 2.0.into()), ("B1", 3.0.into())]);
        assert_eq!(translate("=A1+B1", &s), "2+3");
        assert_eq!(translate("$A$1*b1", &s), "2*3");
    }

    #[test]
    fn test_rendered_literals() {
        let s = sheet(&[
            ("A1", (-3.0).into()),
            ("A2", "say \"hi\"".into()),
            ("A3", true.into()),
            ("A4", f64::INFINITY.into()),
            ("A5", f64::NEG_INFINITY.into()),
            ("A6", CellValue::complex(0.0, 1.0)),
            ("A7", 1.5.into()),
        ]);
        assert_eq!(translate("A1*2", &s), "(-3)*2");
        assert_eq!(translate("A2", &s), r#""say \"hi\"""#);
        assert_eq!(translate("A3", &s), "true");
        assert_eq!(translate("A4+A5", &s), "Infinity+(-Infinity)");
        assert_eq!(translate("A6", &s), "complex(0, 1)");
        assert_eq!(translate("A7", &s), "1.5");
    }

    #[test]
    fn test_quoted_text_untouched() {
        let s = sheet(&[("A1", 1.0.into())]);
        assert_eq!(translate(r#""A1, IF(x)" & A1"#, &s), r#""A1, IF(x)" & 1"#);
    }

    #[test]
    fn test_conditionals() {
        let s = sheet(&[("A1", 2.0.into())]);
        assert_eq!(
            translate(r#"=IF(A1>1, "yes", "no")"#, &s),
            r#"((2>1) ? ("yes") : ("no"))"#
        );
        assert_eq!(
            translate(r#"if(A1=1, "a,b", IF(A1=2, "c", "d"))"#, &s),
            r#"((2==1) ? ("a,b") : (((2==2) ? ("c") : ("d"))))"#
        );
        assert_eq!(
            rewrite_conditionals("IF(MAX(1, 2) > 1, SUM(1, 2), 0)"),
            "((MAX(1, 2) > 1) ? (SUM(1, 2)) : (0))"
        );
    }

    #[test]
    fn test_conditionals_left_alone() {
        assert_eq!(rewrite_conditionals("IF(1, 2)"), "IF(1, 2)");
        assert_eq!(rewrite_conditionals("IF(1, 2, 3"), "IF(1, 2, 3");
        assert_eq!(rewrite_conditionals("IFS(1, 2, 3)"), "IFS(1, 2, 3)");
        assert_eq!(
            rewrite_conditionals("IF(1, IF(1, 2, 3))"),
            "IF(1, ((1) ? (2) : (3)))"
        );
    }

    #[test]
    fn test_ranges() {
        let s = sheet(&[
            ("A1", "apple".into()),
            ("B1", 1.0.into()),
            ("A2", "banana".into()),
            ("B2", 2.0.into()),
        ]);
        assert_eq!(translate("SUM(B1:B2)", &s), "sum(1, 2)");
        assert_eq!(translate("B1:B2", &s), "1, 2");
        assert_eq!(
            translate(r#"vlookup("banana", A1:B2, 2)"#, &s),
            r#"VLOOKUP("banana", [["apple", 1], ["banana", 2]], 2)"#
        );
        assert_eq!(
            translate("INDEX(B1:B2, MATCH(2, B1:B2, 0))", &s),
            "INDEX([[1], [2]], MATCH(2, [[1], [2]], 0))"
        );
        // Innermost named call decides
        assert_eq!(
            translate("INDEX(B1:B2, SUM(B1:B2))", &s),
            "INDEX([[1], [2]], sum(1, 2))"
        );
    }

    #[test]
    fn test_large_ranges_rejected() {
        let s = sheet(&[("A1", 1.0.into())]);
        assert!(matches!(
            FormulaTranslator::default().translate("SUM(A1:XFD1048576)", &s),
            Err(FormulaError::Argument(_))
        ));
        // 100 000 cells exactly is still spelled out
        let text = translate("SUM(A1:A100000)", &s);
        assert!(text.starts_with("sum(1, 0, 0"));
    }

    #[test]
    fn test_nesting_limit() {
        let s = Worksheet::new();
        let nested = |levels: usize| format!("{}1{}", "(".repeat(levels), ")".repeat(levels));
        assert_eq!(translate(&nested(MAX_NESTING), &s), nested(MAX_NESTING));
        for text in [nested(MAX_NESTING + 1), "IF(1, 2, ".repeat(10_000), "(".repeat(10_000)] {
            assert!(matches!(
                FormulaTranslator::default().translate(&text, &s),
                Err(FormulaError::Parse(_))
            ));
        }
    }

    #[test]
    fn test_function_names() {
        let s = Worksheet::new();
        assert_eq!(translate("AVERAGE(1, 2)", &s), "mean(1, 2)");
        assert_eq!(translate("Trunc(1.5)+INT(2.5)", &s), "fix(1.5)+floor(2.5)");
        assert_eq!(translate("POWER(2, 3)", &s), "pow(2, 3)");
        assert_eq!(translate("NOT(TRUE)", &s), "not(true)");
        assert_eq!(translate("NOPE(1)", &s), "NOPE(1)");
        assert_eq!(map_function_name("rand"), Some("random"));
        assert_eq!(map_function_name("nope"), None);
    }

    #[test]
    fn test_operators() {
        let s = sheet(&[("A1", 2.0.into())]);
        assert_eq!(translate("A1<>1", &s), "2!=1");
        assert_eq!(translate("A1<=1", &s), "2<=1");
        assert_eq!(translate("A1>=1", &s), "2>=1");
        assert_eq!(translate("A1==1", &s), "2==1");
        assert_eq!(translate("A1=1", &s), "2==1");
    }

    #[test]
    fn test_unresolved_policies() {
        let s = Worksheet::new();
        assert_eq!(translate("B1+10", &s), "0+10");
        assert_eq!(
            FormulaTranslator::new(UnresolvedReferencePolicy::UndefinedText)
                .translate("B1+10", &s)
                .unwrap(),
            r#""undefined"+10"#
        );
        assert_eq!(
            FormulaTranslator::new(UnresolvedReferencePolicy::Fail).translate("B1+10", &s),
            Err(FormulaError::UnresolvedReference("B1".into()))
        );
    }
}
