//! FILENAME: parser/src/parser.rs
//! PURPOSE: Precedence-climbing recursive-descent parser that converts a
//! token stream into an [`Expr`] tree.
//! CONTEXT: Each precedence level is its own function, calling down to the
//! next-tighter level before consuming an operator at its own level.
//!
//! GRAMMAR:
//!   expression     --> comparison
//!   comparison     --> additive ( ("=" | "<>" | "<" | ">" | "<=" | ">=") additive )*
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> ("+" | "-") unary | power
//!   power          --> primary ( "^" unary )?
//!   primary        --> NUMBER | STRING | CELL_REF | RANGE | FUNCTION "(" args? ")" | "(" expression ")"
//!   args           --> expression ("," expression)*

use crate::address::parse_range;
use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::lexer::Lexer;
use crate::token::Token;

/// Parser errors with descriptive messages. The caller (the evaluator)
/// turns any `ParseError` into the `#ERROR!` sentinel rather than
/// propagating it further.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a formula body (with any leading `=` already stripped by the
/// caller) into an [`Expr`].
pub fn parse(input: &str) -> ParseResult<Expr> {
    Parser::new(input).parse()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    fn parse(&mut self) -> ParseResult<Expr> {
        if self.current_token == Token::EOF {
            return Err(ParseError::new("empty expression"));
        }

        let expr = self.parse_expression()?;

        if self.current_token != Token::EOF {
            return Err(ParseError::new(format!(
                "unexpected token after expression: {}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(format!(
                "expected {}, found {}",
                expected, self.current_token
            )))
        }
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match &self.current_token {
                Token::Equals => BinaryOperator::Eq,
                Token::NotEqual => BinaryOperator::NotEq,
                Token::LessThan => BinaryOperator::Less,
                Token::GreaterThan => BinaryOperator::Greater,
                Token::LessEqual => BinaryOperator::LessEq,
                Token::GreaterEqual => BinaryOperator::GreaterEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current_token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current_token {
                Token::Asterisk => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// Unary `+`/`-` bind tighter than the binary arithmetic levels above
    /// but looser than `^`, so `-A1^2` parses as `-(A1^2)`.
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        match &self.current_token {
            Token::Plus => {
                self.advance();
                Ok(Expr::Unary(UnaryOperator::Plus, Box::new(self.parse_unary()?)))
            }
            Token::Minus => {
                self.advance();
                Ok(Expr::Unary(UnaryOperator::Negate, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_power(),
        }
    }

    /// Right-associative: `parse_unary` on the exponent lets `2^-2` and
    /// `2^3^2` (== `2^(3^2)`) both parse.
    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;

        if self.current_token == Token::Caret {
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(BinaryOperator::Power, Box::new(base), Box::new(exponent)));
        }

        Ok(base)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.current_token.clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            Token::CellRef(label) => {
                self.advance();
                let addr = crate::address::parse_address(&label)
                    .map_err(|e| ParseError::new(format!("bad cell reference: {}", e)))?;
                Ok(Expr::CellRef(addr))
            }
            Token::Range(start, end) => {
                self.advance();
                let range = format!("{}:{}", start, end);
                let addresses = parse_range(&range)
                    .map_err(|e| ParseError::new(format!("bad range: {}", e)))?;
                Ok(Expr::Range(addresses))
            }
            Token::Function(name) => {
                self.advance();
                self.expect(Token::LParen)?;
                let args = self.parse_arguments()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Function(name, args))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            other => Err(ParseError::new(format!("unexpected token: {}", other))),
        }
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();

        if self.current_token == Token::RParen {
            return Ok(args);
        }

        args.push(self.parse_expression()?);
        while self.current_token == Token::Comma {
            self.advance();
            args.push(self.parse_expression()?);
        }

        Ok(args)
    }
}
