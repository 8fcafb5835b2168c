//! FILENAME: parser/src/lib.rs
//! PURPOSE: Formula lexer, parser, and address codec.
//! CONTEXT: The crate's public surface is a single free function, [`parse`],
//! that turns a formula string into an [`Expr`] tree.
//!
//! PIPELINE: formula string --> [`Lexer`] --> tokens --> [`parse`] --> [`Expr`]
//!
//! Supported grammar: arithmetic (`+ - * / ^`), comparison
//! (`= <> != < <= > >=`), cell references (`A1`), ranges (`A1:B10`),
//! function calls (`SUM(A1:A10)`), parentheses, and unary `+`/`-`.

pub mod address;
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

#[cfg(test)]
mod tests;

pub use address::{col_to_letters, format_address, letters_to_col, parse_address, parse_range, Address, AddressError};
pub use ast::{BinaryOperator, Expr, UnaryOperator};
pub use lexer::Lexer;
pub use parser::{parse, ParseError, ParseResult};
pub use token::Token;
