//! Expression parser
//!
//! A recursive descent parser over the shared formula tokens.
//!
//! Precedence (lowest to highest):
//! 1. Conditional: `c ? a : b` (right associative)
//! 2. Comparison: `==`, `!=`, `<`, `<=`, `>`, `>=`
//! 3. Addition/Subtraction: `+`, `-`
//! 4. Multiplication/Division/Modulo: `*`, `/`, `%` (binary)
//! 5. Unary: `-`, `+`
//! 6. Exponentiation: `^` (right associative)
//! 7. Postfix percent: `%`
//! 8. Primary: literals, names, calls, parentheses, arrays
//!
//! Input size is bounded so that parsing, evaluating and dropping a tree
//! never runs out of stack: at most [`MAX_NESTING`] levels of parentheses,
//! calls, arrays, prefix operators and conditional branches, and at most
//! [`MAX_OPERATORS`] operator nodes in one expression. Anything larger is a
//! parse error.

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{tokenize, unescape_string, Token, TokenKind};

/// Deepest nesting of parentheses, calls, arrays and prefix operators
pub const MAX_NESTING: usize = 128;

/// Most operator nodes (binary, prefix, postfix, conditional) in one expression
pub const MAX_OPERATORS: usize = 1024;

/// Parse an expression string into an AST
///
/// # Example
/// ```rust
/// use calcsheet_formula::expr::parse_expression;
///
/// let ast = parse_expression("1 + 2").unwrap();
/// let ast = parse_expression("sum(1, 2, 3)").unwrap();
/// let ast = parse_expression("((5 > 10) ? (\"Yes\") : (\"No\"))").unwrap();
/// ```
pub fn parse_expression(input: &str) -> FormulaResult<Expr> {
    let tokens: Vec<Token<'_>> = tokenize(input)
        .into_iter()
        .filter(|t| t.kind != TokenKind::Whitespace)
        .collect();

    if tokens.is_empty() {
        return Err(FormulaError::Parse("Empty expression".into()));
    }

    let mut parser = ExprParser {
        tokens,
        pos: 0,
        nesting: 0,
        operators: 0,
    };
    let expr = parser.parse_conditional()?;

    if let Some(token) = parser.peek() {
        return Err(FormulaError::Parse(format!(
            "Unexpected '{}' at position {}",
            token.text, token.span.start
        )));
    }

    Ok(expr)
}

struct ExprParser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    nesting: usize,
    operators: usize,
}

impl<'a> ExprParser<'a> {
    // === Token helpers ===

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_operator(&self) -> Option<&'a str> {
        self.peek()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text)
    }

    fn consume(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> FormulaResult<()> {
        match self.consume() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(FormulaError::Parse(format!(
                "Expected {}, got '{}' at position {}",
                what, token.text, token.span.start
            ))),
            None => Err(FormulaError::Parse(format!(
                "Expected {}, got end of input",
                what
            ))),
        }
    }

    // === Nesting limits ===

    /// Run `parse` one nesting level down
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> FormulaResult<T>) -> FormulaResult<T> {
        if self.nesting == MAX_NESTING {
            return Err(FormulaError::Parse(format!(
                "Expression nested more than {} levels deep",
                MAX_NESTING
            )));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    /// Count one operator node
    fn operator(&mut self) -> FormulaResult<()> {
        if self.operators == MAX_OPERATORS {
            return Err(FormulaError::Parse(format!(
                "Expression has more than {} operators",
                MAX_OPERATORS
            )));
        }
        self.operators += 1;
        Ok(())
    }

    /// Whether `token` can begin an operand (decides binary vs postfix `%`)
    fn starts_operand(token: Option<&Token<'_>>) -> bool {
        matches!(
            token.map(|t| t.kind),
            Some(TokenKind::Number)
                | Some(TokenKind::Str)
                | Some(TokenKind::Ident)
                | Some(TokenKind::LeftParen)
                | Some(TokenKind::LeftBracket)
        )
    }

    // === Expression parsing with precedence ===

    fn parse_conditional(&mut self) -> FormulaResult<Expr> {
        let condition = self.parse_comparison()?;

        if self.peek_operator() == Some("?") {
            self.consume();
            self.operator()?;
            let then = self.nested(Self::parse_conditional)?;
            self.expect(TokenKind::Colon, "':' in conditional")?;
            let otherwise = self.nested(Self::parse_conditional)?;
            return Ok(Expr::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }

        Ok(condition)
    }

    fn parse_comparison(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.peek_operator() {
                Some("==") => BinaryOperator::Equal,
                Some("!=") => BinaryOperator::NotEqual,
                Some("<") => BinaryOperator::LessThan,
                Some("<=") => BinaryOperator::LessEqual,
                Some(">") => BinaryOperator::GreaterThan,
                Some(">=") => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            self.operator()?;
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek_operator() {
                Some("+") => BinaryOperator::Add,
                Some("-") => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            self.operator()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek_operator() {
                Some("*") => BinaryOperator::Multiply,
                Some("/") => BinaryOperator::Divide,
                Some("%") if Self::starts_operand(self.peek_at(1)) => BinaryOperator::Modulo,
                _ => break,
            };

            self.consume();
            self.operator()?;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        match self.peek_operator() {
            Some("-") => {
                self.consume();
                self.operator()?;
                let operand = self.nested(Self::parse_unary)?;
                Ok(Expr::Unary {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            // Prefix plus (no-op)
            Some("+") => {
                self.consume();
                self.nested(Self::parse_unary)
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> FormulaResult<Expr> {
        let base = self.parse_postfix()?;

        if self.peek_operator() == Some("^") {
            self.consume();
            self.operator()?;
            let exponent = self.nested(Self::parse_unary)?; // Right associative, allows 2^-1
            return Ok(Expr::Binary {
                op: BinaryOperator::Power,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }

        Ok(base)
    }

    fn parse_postfix(&mut self) -> FormulaResult<Expr> {
        let mut expr = self.parse_primary()?;

        while self.peek_operator() == Some("%") && !Self::starts_operand(self.peek_at(1)) {
            self.consume();
            self.operator()?;
            expr = Expr::Unary {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        let token = self
            .consume()
            .ok_or_else(|| FormulaError::Parse("Unexpected end of input".into()))?;

        match token.kind {
            TokenKind::Number => token
                .text
                .parse::<f64>()
                .map(Expr::Number)
                .map_err(|_| FormulaError::Parse(format!("Invalid number '{}'", token.text))),

            TokenKind::Str => Ok(Expr::Text(unescape_string(token.text))),

            TokenKind::Ident => {
                if self.peek_kind() == Some(TokenKind::LeftParen) {
                    let name = token.text.to_string();
                    return self.nested(|p| p.parse_call(name));
                }
                match token.text {
                    "true" => Ok(Expr::Boolean(true)),
                    "false" => Ok(Expr::Boolean(false)),
                    name => Ok(Expr::Identifier(name.to_string())),
                }
            }

            TokenKind::LeftParen => {
                let expr = self.nested(Self::parse_conditional)?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(expr)
            }

            TokenKind::LeftBracket => self.nested(Self::parse_array),

            _ => Err(FormulaError::Parse(format!(
                "Unexpected '{}' at position {}",
                token.text, token.span.start
            ))),
        }
    }

    /// Parse an array after its `[`; `;` separates rows
    fn parse_array(&mut self) -> FormulaResult<Expr> {
        let mut rows: Vec<Vec<Expr>> = Vec::new();
        let mut current = Vec::new();
        let mut row_separated = false;

        if self.peek_kind() != Some(TokenKind::RightBracket) {
            current.push(self.parse_conditional()?);

            loop {
                match self.peek_kind() {
                    Some(TokenKind::Comma) => {
                        self.consume();
                        current.push(self.parse_conditional()?);
                    }
                    Some(TokenKind::Semicolon) => {
                        self.consume();
                        row_separated = true;
                        rows.push(std::mem::take(&mut current));
                        current.push(self.parse_conditional()?);
                    }
                    _ => break,
                }
            }
        }

        self.expect(TokenKind::RightBracket, "',' ';' or ']' in array")?;

        if row_separated {
            rows.push(current);
            Ok(Expr::Array(rows.into_iter().map(Expr::Array).collect()))
        } else {
            Ok(Expr::Array(current))
        }
    }

    /// Parse call arguments; the current token is `(`
    fn parse_call(&mut self, name: String) -> FormulaResult<Expr> {
        self.expect(TokenKind::LeftParen, "'('")?;

        let mut args = Vec::new();
        if self.peek_kind() != Some(TokenKind::RightParen) {
            args.push(self.parse_conditional()?);

            while self.peek_kind() == Some(TokenKind::Comma) {
                self.consume();
                args.push(self.parse_conditional()?);
            }
        }

        self.expect(TokenKind::RightParen, "')'")?;

        Ok(Expr::Call { name, args })
    }
}
