//! FILENAME: parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for formula expressions.
//! CONTEXT: After the lexer tokenizes a formula string, the parser builds
//! this tree; the evaluator then traverses it to compute a result.
//! Addresses are resolved to `(row, col)` pairs at parse time — there is no
//! unresolved cell-reference variant.

use crate::address::Address;

/// A parsed formula expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Number(f64),
    String(String),
    /// A single resolved cell reference.
    CellRef(Address),
    /// A resolved range, expanded to its member addresses in row-major order.
    Range(Vec<Address>),
    Unary(UnaryOperator, Box<Expr>),
    Binary(BinaryOperator, Box<Expr>, Box<Expr>),
    /// A function call. `name` is kept unresolved (uppercased) so dispatch
    /// happens by name at evaluation time — an unknown name still parses
    /// and becomes `#NAME?` at eval rather than a parse failure.
    Function(String, Vec<Expr>),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Plus,
    Negate,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}
