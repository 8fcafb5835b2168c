//! FILENAME: parser/src/tests.rs
//! PURPOSE: Consolidated parser-level tests (lexer has its own inline test module).

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::parser::parse;

#[test]
fn parses_arithmetic_precedence() {
    // 1 + 2 * 3 -> 1 + (2 * 3)
    let expr = parse("1+2*3").unwrap();
    assert_eq!(
        expr,
        Expr::Binary(
            BinaryOperator::Add,
            Box::new(Expr::Number(1.0)),
            Box::new(Expr::Binary(
                BinaryOperator::Multiply,
                Box::new(Expr::Number(2.0)),
                Box::new(Expr::Number(3.0)),
            )),
        )
    );
}

#[test]
fn power_is_right_associative() {
    // 2^3^2 -> 2^(3^2)
    let expr = parse("2^3^2").unwrap();
    assert_eq!(
        expr,
        Expr::Binary(
            BinaryOperator::Power,
            Box::new(Expr::Number(2.0)),
            Box::new(Expr::Binary(
                BinaryOperator::Power,
                Box::new(Expr::Number(3.0)),
                Box::new(Expr::Number(2.0)),
            )),
        )
    );
}

#[test]
fn unary_minus_binds_looser_than_power() {
    // -A1^2 -> -(A1^2)
    let expr = parse("-A1^2").unwrap();
    assert_eq!(
        expr,
        Expr::Unary(
            UnaryOperator::Negate,
            Box::new(Expr::Binary(
                BinaryOperator::Power,
                Box::new(Expr::CellRef((0, 0))),
                Box::new(Expr::Number(2.0)),
            )),
        )
    );
}

#[test]
fn parses_cell_ref_and_range() {
    assert_eq!(parse("A1").unwrap(), Expr::CellRef((0, 0)));
    assert_eq!(
        parse("A1:B2").unwrap(),
        Expr::Range(vec![(0, 0), (0, 1), (1, 0), (1, 1)])
    );
}

#[test]
fn parses_function_call_with_mixed_arguments() {
    let expr = parse("SUM(A1:A3, 10, B1)").unwrap();
    assert_eq!(
        expr,
        Expr::Function(
            "SUM".to_string(),
            vec![
                Expr::Range(vec![(0, 0), (1, 0), (2, 0)]),
                Expr::Number(10.0),
                Expr::CellRef((0, 1)),
            ],
        )
    );
}

#[test]
fn function_name_is_case_normalized_by_the_lexer() {
    let expr = parse("sum(1)").unwrap();
    assert_eq!(expr, Expr::Function("SUM".to_string(), vec![Expr::Number(1.0)]));
}

#[test]
fn comparison_binds_looser_than_arithmetic() {
    let expr = parse("1+1=2").unwrap();
    assert_eq!(
        expr,
        Expr::Binary(
            BinaryOperator::Eq,
            Box::new(Expr::Binary(
                BinaryOperator::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Number(1.0)),
            )),
            Box::new(Expr::Number(2.0)),
        )
    );
}

#[test]
fn not_equal_accepts_both_spellings() {
    assert_eq!(parse("1<>2").unwrap(), parse("1!=2").unwrap());
}

#[test]
fn parentheses_override_precedence() {
    let expr = parse("(1+2)*3").unwrap();
    assert_eq!(
        expr,
        Expr::Binary(
            BinaryOperator::Multiply,
            Box::new(Expr::Binary(
                BinaryOperator::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Number(2.0)),
            )),
            Box::new(Expr::Number(3.0)),
        )
    );
}

#[test]
fn empty_formula_is_a_parse_error() {
    assert!(parse("").is_err());
}

#[test]
fn trailing_garbage_is_a_parse_error() {
    assert!(parse("1 2").is_err());
}

#[test]
fn unclosed_paren_is_a_parse_error() {
    assert!(parse("(1+2").is_err());
}

#[test]
fn function_with_zero_arguments_parses() {
    assert_eq!(parse("NOW()").unwrap(), Expr::Function("NOW".to_string(), vec![]));
}

#[test]
fn string_literal_round_trips() {
    assert_eq!(parse("\"hello\"").unwrap(), Expr::String("hello".to_string()));
}
