use crate::{
    compile::{line::is_identifier, Operator},
    log::{expected_operator, Error, ErrorKind},
    store::Shadow,
    value::Value,
};
use std::cmp::Ordering;

/// Evaluate a guard expression against the given scope.
///
/// An absent left-hand variable makes the guard false rather than failing;
/// a guard over a value that cannot be compared to the literal fails.
pub fn evaluate(expression: &str, shadow: &Shadow) -> Result<bool, Error> {
    let (name, operator, raw) = split(expression)?;
    let Some(value) = shadow.get(name) else {
        return Ok(false);
    };

    compare_values(value, operator, &type_literal(raw))
}

/// Check that a guard expression will split at render time.
///
/// Used during compilation so a malformed guard fails startup instead of
/// the first render.
pub fn validate(expression: &str) -> Result<(), Error> {
    let (name, operator, _) = split(expression)?;
    if !is_identifier(name) {
        return Err(Error::build(ErrorKind::InvalidSyntax).with_help(format!(
            "left of `{operator}` must be a variable name, found `{name}`"
        )));
    }

    Ok(())
}

/// Split a guard expression into variable name, operator and raw literal.
///
/// Operators are searched two-character forms first, so `<=` is never
/// read as `<`.
fn split(expression: &str) -> Result<(&str, Operator, &str), Error> {
    for (pattern, operator) in Operator::SEARCH {
        let Some(at) = expression.find(pattern) else {
            continue;
        };
        let left = expression[..at].trim();
        let right = expression[at + pattern.len()..].trim();
        if left.is_empty() || right.is_empty() {
            return Err(Error::build(ErrorKind::InvalidSyntax).with_help(format!(
                "expected `variable {operator} literal`, found `{expression}`"
            )));
        }
        return Ok((left, operator, right));
    }

    Err(Error::build(ErrorKind::InvalidSyntax).with_help(expected_operator(expression)))
}

/// Give the raw right-hand literal a type.
///
/// Priority: quoted string, float, integer, bool, bare string.
fn type_literal(raw: &str) -> Value {
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Value::String(raw[1..raw.len() - 1].to_owned());
    }
    if is_float(raw) {
        return Value::Float(raw.parse().expect("digit literal should parse as f64"));
    }
    if is_int(raw) {
        if let Ok(parsed) = raw.parse::<i64>() {
            return Value::Int(parsed);
        }
        if let Ok(parsed) = raw.parse::<u64>() {
            return Value::Uint(parsed);
        }
        return Value::Float(raw.parse().expect("digit literal should parse as f64"));
    }
    if let Some(parsed) = as_bool(raw) {
        return Value::Bool(parsed);
    }

    Value::String(raw.to_owned())
}

/// digits `.` digits
fn is_float(raw: &str) -> bool {
    raw.split_once('.').is_some_and(|(whole, fraction)| {
        !whole.is_empty()
            && !fraction.is_empty()
            && whole.bytes().all(|b| b.is_ascii_digit())
            && fraction.bytes().all(|b| b.is_ascii_digit())
    })
}

/// digits
fn is_int(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}

/// The fixed bool-literal set.
fn as_bool(raw: &str) -> Option<bool> {
    match raw {
        "True" | "true" | "TRUE" | "T" => Some(true),
        "False" | "false" | "FALSE" | "F" => Some(false),
        _ => None,
    }
}

/// Compare the two [`Value`] instances with the given [`Operator`].
///
/// Integer families widen through 64 bits, floats compare as `f64`,
/// strings compare lexicographically. Bools support equality only.
///
/// # Errors
///
/// Returns an [`Error`] if the two types cannot be compared, or the
/// `Operator` cannot be applied to the types.
pub fn compare_values(left: &Value, operator: Operator, right: &Value) -> Result<bool, Error> {
    let result = match (left, right) {
        (Value::Int(left), Value::Int(right)) => apply(left.cmp(right), operator),
        (Value::Uint(left), Value::Uint(right)) => apply(left.cmp(right), operator),
        (Value::Int(left), Value::Uint(right)) => {
            let ordering = if *left < 0 {
                Ordering::Less
            } else {
                (*left as u64).cmp(right)
            };
            apply(ordering, operator)
        }
        (Value::Uint(left), Value::Int(right)) => {
            let ordering = if *right < 0 {
                Ordering::Greater
            } else {
                left.cmp(&(*right as u64))
            };
            apply(ordering, operator)
        }
        (Value::Float(left), Value::Float(right)) => match operator {
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            Operator::Lesser => left < right,
            Operator::LesserOrEqual => left <= right,
            Operator::Greater => left > right,
            Operator::GreaterOrEqual => left >= right,
        },
        (Value::String(left), Value::String(right)) => apply(left.cmp(right), operator),
        (Value::Bool(left), Value::Bool(right)) => match operator {
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            unsupported => {
                return Err(Error::build(ErrorKind::IncompatibleTypes).with_help(format!(
                    "operator `{unsupported}` is invalid on boolean values"
                )))
            }
        },
        (left, right) => {
            return Err(Error::build(ErrorKind::IncompatibleTypes).with_help(format!(
                "values `{left}` and `{right}` cannot be compared"
            )))
        }
    };

    Ok(result)
}

/// Apply an [`Operator`] to an [`Ordering`].
fn apply(ordering: Ordering, operator: Operator) -> bool {
    match operator {
        Operator::Equal => ordering == Ordering::Equal,
        Operator::NotEqual => ordering != Ordering::Equal,
        Operator::Lesser => ordering == Ordering::Less,
        Operator::LesserOrEqual => ordering != Ordering::Greater,
        Operator::Greater => ordering == Ordering::Greater,
        Operator::GreaterOrEqual => ordering != Ordering::Less,
    }
}
