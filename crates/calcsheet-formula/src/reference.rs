//! Cell reference scanning
//!
//! An identifier token is a cell reference when it parses as an A1 address
//! and is not a function name (followed by `(`). Two references joined by
//! `:` form a range. References never come from inside string literals.

use std::ops::Range;

use ahash::AHashSet;
use calcsheet_core::{CellAddress, CellRange};

use crate::lexer::{next_significant, tokenize, Token, TokenKind};

/// Largest range a formula may spell out cell by cell
pub const MAX_RANGE_CELLS: u64 = 100_000;

/// A reference found in formula text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// Single cell (`A1`, `$B$2`)
    Cell(CellAddress),
    /// Rectangular range (`A1:B3`), normalized
    Range(CellRange),
}

impl Reference {
    /// Addresses covered by the reference, row-major
    pub fn addresses(&self) -> Vec<CellAddress> {
        match self {
            Reference::Cell(addr) => vec![*addr],
            Reference::Range(range) => range.cells().collect(),
        }
    }
}

/// A reference together with the bytes it occupies in the formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceToken {
    pub reference: Reference,
    pub span: Range<usize>,
}

/// Find every cell and range reference in `text`, in source order
///
/// ```rust
/// use calcsheet_core::{CellAddress, CellRange};
/// use calcsheet_formula::{scan_references, Reference};
///
/// let refs = scan_references("SUM(A1:A3) + $B$1 + \"C1\"");
/// let a1 = CellAddress::parse("A1").unwrap();
/// let a3 = CellAddress::parse("A3").unwrap();
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[0].reference, Reference::Range(CellRange::new(a1, a3)));
/// assert_eq!(refs[1].reference, Reference::Cell(CellAddress::parse("B1").unwrap()));
/// ```
pub fn scan_references(text: &str) -> Vec<ReferenceToken> {
    let tokens = tokenize(text);
    let mut refs = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let Some(start) = cell_at(&tokens, i) else {
            i += 1;
            continue;
        };

        // `start : end` forms a range when the right side is a reference too
        if let Some(colon) = next_significant(&tokens, i + 1) {
            if tokens[colon].kind == TokenKind::Colon {
                if let Some(j) = next_significant(&tokens, colon + 1) {
                    if let Some(end) = cell_at(&tokens, j) {
                        refs.push(ReferenceToken {
                            reference: Reference::Range(CellRange::new(start, end)),
                            span: tokens[i].span.start..tokens[j].span.end,
                        });
                        i = j + 1;
                        continue;
                    }
                }
            }
        }

        refs.push(ReferenceToken {
            reference: Reference::Cell(start),
            span: tokens[i].span.clone(),
        });
        i += 1;
    }

    refs
}

/// Addresses a formula reads, ranges expanded row-major
///
/// First-occurrence order, without duplicates. Ranges are expanded in full;
/// [`build_dependency_graph`](crate::build_dependency_graph) bounds large
/// ranges by the cells a worksheet actually holds.
pub fn extract_dependencies(text: &str) -> Vec<CellAddress> {
    let mut seen = AHashSet::new();
    let mut deps = Vec::new();
    for token in scan_references(text) {
        for addr in token.reference.addresses() {
            if seen.insert(addr) {
                deps.push(addr);
            }
        }
    }
    deps
}

/// The address token `i` names, unless it is not an identifier, is called
/// like a function, or does not parse as an address
fn cell_at(tokens: &[Token<'_>], i: usize) -> Option<CellAddress> {
    let token = &tokens[i];
    if token.kind != TokenKind::Ident {
        return None;
    }
    if let Some(next) = next_significant(tokens, i + 1) {
        if tokens[next].kind == TokenKind::LeftParen {
            return None;
        }
    }
    CellAddress::parse(token.text).ok()
}
