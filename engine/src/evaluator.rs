//! FILENAME: engine/src/evaluator.rs
//! PURPOSE: Evaluates a parsed formula expression against the sheet.
//! CONTEXT: Pure evaluation of an [`Expr`] against a [`Sheet`] snapshot,
//! producing a result or an error sentinel. Never panics and never returns
//! a Rust `Err` — all failure modes surface as `EvalResult::Error`.

use crate::cell::{CellError, CellValue};
use crate::sheet::Sheet;
use parser::ast::{BinaryOperator, UnaryOperator};
use parser::Expr;

/// The result of evaluating an expression. Maps onto [`CellValue`] but adds
/// `Array`, an intermediate-only state produced by ranges and consumed by
/// aggregate functions — a bare range is never installed into a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
    Array(Vec<EvalResult>),
}

impl EvalResult {
    /// Converts to the value a cell stores. Arrays collapse to their first
    /// element — a bare range used outside a function argument position
    /// displays as that element would.
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            EvalResult::Empty => CellValue::Empty,
            EvalResult::Number(n) => CellValue::Number(*n),
            EvalResult::Text(s) => CellValue::Text(s.clone()),
            EvalResult::Boolean(b) => CellValue::Boolean(*b),
            EvalResult::Error(e) => CellValue::Error(*e),
            EvalResult::Array(items) => items.first().map(EvalResult::to_cell_value).unwrap_or(CellValue::Empty),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EvalResult::Error(_))
    }

    /// Numeric coercion: number as itself; boolean 1/0; empty is 0; a
    /// string parses as a float only if it matches `^-?[0-9]+(\.[0-9]+)?$`;
    /// anything else (including an array) is `#VALUE!`.
    pub fn as_number(&self) -> Result<f64, CellError> {
        match self {
            EvalResult::Number(n) => Ok(*n),
            EvalResult::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            EvalResult::Empty => Ok(0.0),
            EvalResult::Text(s) => {
                if is_numeric_string(s) {
                    s.parse::<f64>().map_err(|_| CellError::Value)
                } else {
                    Err(CellError::Value)
                }
            }
            EvalResult::Error(e) => Err(*e),
            EvalResult::Array(_) => Err(CellError::Value),
        }
    }

    /// Boolean coercion used by `IF`'s condition when it isn't already a
    /// `Boolean`: any nonzero numeric coercion is true.
    pub fn as_boolean(&self) -> Result<bool, CellError> {
        match self {
            EvalResult::Boolean(b) => Ok(*b),
            EvalResult::Error(e) => Err(*e),
            other => other.as_number().map(|n| n != 0.0),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            EvalResult::Empty => String::new(),
            EvalResult::Number(n) => CellValue::Number(*n).display(),
            EvalResult::Text(s) => s.clone(),
            EvalResult::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            EvalResult::Error(e) => e.sentinel().to_string(),
            EvalResult::Array(items) => items.first().map(EvalResult::as_text).unwrap_or_default(),
        }
    }

    /// Flattens nested arrays and drops `Empty` entries — the representation
    /// aggregate functions (`SUM`, `COUNT`, …) iterate over.
    fn flatten_non_empty(&self) -> Vec<EvalResult> {
        match self {
            EvalResult::Array(items) => items.iter().flat_map(EvalResult::flatten_non_empty).collect(),
            EvalResult::Empty => Vec::new(),
            other => vec![other.clone()],
        }
    }
}

/// Matches `^-?[0-9]+(\.[0-9]+)?$` by hand rather than via a `regex`
/// dependency, mirroring the address codec's own hand-rolled validation.
pub(crate) fn is_numeric_string(s: &str) -> bool {
    let s = s.trim();
    let s = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac_part {
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

/// Evaluates `expr` against `sheet`'s current cell values.
pub fn evaluate(expr: &Expr, sheet: &Sheet) -> EvalResult {
    match expr {
        Expr::Number(n) => EvalResult::Number(*n),
        Expr::String(s) => EvalResult::Text(s.clone()),
        Expr::CellRef((row, col)) => cell_value_to_eval(sheet.get(*row, *col).value),
        Expr::Range(addresses) => {
            let items = addresses
                .iter()
                .filter_map(|&(row, col)| {
                    let v = cell_value_to_eval(sheet.get(row, col).value);
                    if matches!(v, EvalResult::Empty) {
                        None
                    } else {
                        Some(v)
                    }
                })
                .collect();
            EvalResult::Array(items)
        }
        Expr::Unary(op, inner) => eval_unary(*op, evaluate(inner, sheet)),
        Expr::Binary(op, left, right) => eval_binary(*op, evaluate(left, sheet), evaluate(right, sheet)),
        Expr::Function(name, args) => eval_function(name, args, sheet),
    }
}

fn cell_value_to_eval(value: CellValue) -> EvalResult {
    match value {
        CellValue::Empty => EvalResult::Empty,
        CellValue::Number(n) => EvalResult::Number(n),
        CellValue::Text(s) => EvalResult::Text(s),
        CellValue::Boolean(b) => EvalResult::Boolean(b),
        CellValue::Error(e) => EvalResult::Error(e),
    }
}

fn eval_unary(op: UnaryOperator, value: EvalResult) -> EvalResult {
    if let EvalResult::Error(e) = value {
        return EvalResult::Error(e);
    }
    match op {
        UnaryOperator::Plus => match value.as_number() {
            Ok(n) => EvalResult::Number(n),
            Err(e) => EvalResult::Error(e),
        },
        UnaryOperator::Negate => match value.as_number() {
            Ok(n) => EvalResult::Number(-n),
            Err(e) => EvalResult::Error(e),
        },
    }
}

fn eval_binary(op: BinaryOperator, left: EvalResult, right: EvalResult) -> EvalResult {
    // Argument-order error propagation: the left operand's error wins.
    if let EvalResult::Error(e) = left {
        return EvalResult::Error(e);
    }
    if let EvalResult::Error(e) = right {
        return EvalResult::Error(e);
    }

    match op {
        BinaryOperator::Add => numeric_binary(left, right, |a, b| Ok(a + b)),
        BinaryOperator::Subtract => numeric_binary(left, right, |a, b| Ok(a - b)),
        BinaryOperator::Multiply => numeric_binary(left, right, |a, b| Ok(a * b)),
        BinaryOperator::Divide => numeric_binary(left, right, |a, b| {
            if b == 0.0 {
                Err(CellError::Div0)
            } else {
                Ok(a / b)
            }
        }),
        BinaryOperator::Power => numeric_binary(left, right, |a, b| Ok(a.powf(b))),
        BinaryOperator::Eq => EvalResult::Boolean(left == right),
        BinaryOperator::NotEq => EvalResult::Boolean(left != right),
        BinaryOperator::Less => ordering_binary(left, right, |a, b| a < b),
        BinaryOperator::LessEq => ordering_binary(left, right, |a, b| a <= b),
        BinaryOperator::Greater => ordering_binary(left, right, |a, b| a > b),
        BinaryOperator::GreaterEq => ordering_binary(left, right, |a, b| a >= b),
    }
}

fn numeric_binary(
    left: EvalResult,
    right: EvalResult,
    op: impl FnOnce(f64, f64) -> Result<f64, CellError>,
) -> EvalResult {
    let a = match left.as_number() {
        Ok(n) => n,
        Err(e) => return EvalResult::Error(e),
    };
    let b = match right.as_number() {
        Ok(n) => n,
        Err(e) => return EvalResult::Error(e),
    };
    match op(a, b) {
        Ok(n) => EvalResult::Number(n),
        Err(e) => EvalResult::Error(e),
    }
}

fn ordering_binary(left: EvalResult, right: EvalResult, op: impl FnOnce(f64, f64) -> bool) -> EvalResult {
    let a = match left.as_number() {
        Ok(n) => n,
        Err(e) => return EvalResult::Error(e),
    };
    let b = match right.as_number() {
        Ok(n) => n,
        Err(e) => return EvalResult::Error(e),
    };
    EvalResult::Boolean(op(a, b))
}

fn eval_function(name: &str, args: &[Expr], sheet: &Sheet) -> EvalResult {
    match name.to_ascii_uppercase().as_str() {
        "IF" => eval_if(args, sheet),
        "SUM" => match eval_flattened_args(args, sheet) {
            Ok(values) => {
                let mut total = 0.0;
                for v in &values {
                    match v.as_number() {
                        Ok(n) => total += n,
                        Err(e) => return EvalResult::Error(e),
                    }
                }
                EvalResult::Number(total)
            }
            Err(e) => e,
        },
        "AVERAGE" => match eval_flattened_args(args, sheet) {
            Ok(values) => {
                if values.is_empty() {
                    return EvalResult::Error(CellError::Div0);
                }
                let mut total = 0.0;
                for v in &values {
                    match v.as_number() {
                        Ok(n) => total += n,
                        Err(e) => return EvalResult::Error(e),
                    }
                }
                EvalResult::Number(total / values.len() as f64)
            }
            Err(e) => e,
        },
        "MIN" => eval_min_max(args, sheet, f64::min, f64::INFINITY),
        "MAX" => eval_min_max(args, sheet, f64::max, f64::NEG_INFINITY),
        "COUNT" => match eval_flattened_args(args, sheet) {
            Ok(values) => EvalResult::Number(values.len() as f64),
            Err(e) => e,
        },
        "ABS" => {
            if args.len() != 1 {
                return EvalResult::Error(CellError::Value);
            }
            let v = evaluate(&args[0], sheet);
            match v.as_number() {
                Ok(n) => EvalResult::Number(n.abs()),
                Err(e) => EvalResult::Error(e),
            }
        }
        "ROUND" => eval_round(args, sheet),
        "CONCAT" => match eval_flattened_args(args, sheet) {
            Ok(values) => EvalResult::Text(values.iter().map(EvalResult::as_text).collect()),
            Err(e) => e,
        },
        _ => EvalResult::Error(CellError::Name),
    }
}

/// Evaluates every argument in order, flattening ranges and dropping empty
/// slots. Returns the first error encountered (argument order).
fn eval_flattened_args(args: &[Expr], sheet: &Sheet) -> Result<Vec<EvalResult>, EvalResult> {
    let mut out = Vec::new();
    for arg in args {
        let v = evaluate(arg, sheet);
        if let EvalResult::Error(e) = v {
            return Err(EvalResult::Error(e));
        }
        out.extend(v.flatten_non_empty());
    }
    Ok(out)
}

fn eval_min_max(args: &[Expr], sheet: &Sheet, fold: impl Fn(f64, f64) -> f64, seed: f64) -> EvalResult {
    match eval_flattened_args(args, sheet) {
        Ok(values) => {
            if values.is_empty() {
                return EvalResult::Error(CellError::Value);
            }
            let mut acc = seed;
            for v in &values {
                match v.as_number() {
                    Ok(n) => acc = fold(acc, n),
                    Err(e) => return EvalResult::Error(e),
                }
            }
            EvalResult::Number(acc)
        }
        Err(e) => e,
    }
}

fn eval_round(args: &[Expr], sheet: &Sheet) -> EvalResult {
    if args.is_empty() || args.len() > 2 {
        return EvalResult::Error(CellError::Value);
    }
    let value = match evaluate(&args[0], sheet).as_number() {
        Ok(n) => n,
        Err(e) => return EvalResult::Error(e),
    };
    let digits = if args.len() == 2 {
        match evaluate(&args[1], sheet).as_number() {
            Ok(n) => n as i32,
            Err(e) => return EvalResult::Error(e),
        }
    } else {
        0
    };
    let scale = 10f64.powi(digits);
    // f64::round() already rounds ties away from zero, matching the
    // required half-away-from-zero semantics without a banker's-rounding
    // dependency.
    EvalResult::Number((value * scale).round() / scale)
}

/// `IF` only inspects its condition argument for an error before branching
/// — the untaken branch's value (error or not) is never evaluated.
fn eval_if(args: &[Expr], sheet: &Sheet) -> EvalResult {
    if args.len() < 2 {
        return EvalResult::Error(CellError::Value);
    }

    let condition = evaluate(&args[0], sheet);
    let truthy = match condition.as_boolean() {
        Ok(b) => b,
        Err(e) => return EvalResult::Error(e),
    };

    if truthy {
        evaluate(&args[1], sheet)
    } else if let Some(false_branch) = args.get(2) {
        evaluate(false_branch, sheet)
    } else {
        EvalResult::Text(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::parse;

    fn eval_str(formula: &str, sheet: &Sheet) -> EvalResult {
        evaluate(&parse(formula).unwrap(), sheet)
    }

    #[test]
    fn arithmetic_chain() {
        let mut sheet = Sheet::new();
        sheet.put(0, 0, {
            let mut c = crate::cell::Cell::new("10");
            c.set_value(CellValue::Number(10.0));
            c
        });
        assert_eq!(eval_str("A1*2", &sheet), EvalResult::Number(20.0));
    }

    #[test]
    fn division_by_zero_is_div0() {
        let sheet = Sheet::new();
        assert_eq!(eval_str("10/0", &sheet), EvalResult::Error(CellError::Div0));
    }

    #[test]
    fn string_equality_has_no_type_coercion() {
        let sheet = Sheet::new();
        assert_eq!(eval_str("\"1\"=1", &sheet), EvalResult::Boolean(false));
    }

    #[test]
    fn if_never_observes_untaken_branch_error() {
        let sheet = Sheet::new();
        assert_eq!(eval_str("IF(1=1, 5, 10/0)", &sheet), EvalResult::Number(5.0));
    }

    #[test]
    fn sum_skips_empty_cells() {
        let mut sheet = Sheet::new();
        sheet.set_raw(0, 0, "1");
        sheet.put(0, 0, {
            let mut c = crate::cell::Cell::new("1");
            c.set_value(CellValue::Number(1.0));
            c
        });
        sheet.put(2, 0, {
            let mut c = crate::cell::Cell::new("3");
            c.set_value(CellValue::Number(3.0));
            c
        });
        assert_eq!(eval_str("SUM(A1:A3)", &sheet), EvalResult::Number(4.0));
    }

    #[test]
    fn round_half_away_from_zero() {
        let sheet = Sheet::new();
        assert_eq!(eval_str("ROUND(2.5, 0)", &sheet), EvalResult::Number(3.0));
        assert_eq!(eval_str("ROUND(-2.5, 0)", &sheet), EvalResult::Number(-3.0));
    }

    #[test]
    fn unknown_function_is_name_error() {
        let sheet = Sheet::new();
        assert_eq!(eval_str("NOPE(1)", &sheet), EvalResult::Error(CellError::Name));
    }
}
