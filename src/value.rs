use crate::log::{Error, ErrorKind};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// A parameter or bind value.
///
/// Every value supplied to a render, and every value bound to a `?`
/// placeholder in the generated SQL, is one of these variants. Keeping the
/// numeric families apart lets guard evaluation widen integers through
/// `i64`/`u64` and floats through `f64` without guessing.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Time(DateTime<Utc>),
    /// An ordered sequence, the only thing `range` will iterate.
    Seq(Vec<Value>),
    /// A named-member value, addressed by `#name.member#` placeholders.
    Composite(HashMap<String, Value>),
}

impl Value {
    /// Convert any serializable value into a [`Value`].
    ///
    /// Structs become [`Value::Composite`] keyed by field name, which is
    /// what makes `#name.field#` placeholders work.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde::Serialize;
    /// use stencil::Value;
    ///
    /// #[derive(Serialize)]
    /// struct User {
    ///     id: i64,
    /// }
    ///
    /// let value = Value::serialize(User { id: 7 }).unwrap();
    /// ```
    pub fn serialize<T>(value: T) -> Result<Self, Error>
    where
        T: Serialize,
    {
        match serde_json::to_value(value) {
            Ok(value) => Ok(value.into()),
            Err(err) => Err(Error::build(ErrorKind::Unserializable)
                .with_help(format!("serialization failed: {err}"))),
        }
    }

    /// Return a short name for the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "a bool",
            Value::Int(_) => "an integer",
            Value::Uint(_) => "an unsigned integer",
            Value::Float(_) => "a float",
            Value::String(_) => "a string",
            Value::Time(_) => "a time",
            Value::Seq(_) => "a sequence",
            Value::Composite(_) => "a composite",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Uint(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "\"{value}\""),
            Value::Time(value) => write!(f, "{}", value.to_rfc3339()),
            Value::Seq(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Composite(fields) => write!(f, "{{{} members}}", fields.len()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(value) => {
                if let Some(value) = value.as_i64() {
                    Value::Int(value)
                } else if let Some(value) = value.as_u64() {
                    Value::Uint(value)
                } else {
                    // Numbers that fit neither family always report as f64.
                    Value::Float(value.as_f64().expect("number should convert to f64"))
                }
            }
            serde_json::Value::String(value) => Value::String(value),
            serde_json::Value::Array(values) => {
                Value::Seq(values.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(fields) => Value::Composite(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Uint(value as u64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Time(value)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(values: Vec<T>) -> Self {
        Value::Seq(values.into_iter().map(Into::into).collect())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use serde::Serialize;
    use serde_json::json;

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(Value::from(json!(7)), Value::Int(7));
        assert_eq!(Value::from(json!(u64::MAX)), Value::Uint(u64::MAX));
        assert_eq!(Value::from(json!(1.5)), Value::Float(1.5));
    }

    #[test]
    fn test_from_json_nested() {
        let value = Value::from(json!({"id": 1, "tags": ["a", "b"]}));

        let Value::Composite(fields) = value else {
            panic!("object should convert to composite");
        };
        assert_eq!(fields.get("id"), Some(&Value::Int(1)));
        assert_eq!(
            fields.get("tags"),
            Some(&Value::Seq(vec![
                Value::String("a".into()),
                Value::String("b".into())
            ]))
        );
    }

    #[test]
    fn test_serialize_struct() {
        #[derive(Serialize)]
        struct Row {
            id: i64,
            name: String,
        }

        let value = Value::serialize(Row {
            id: 3,
            name: "taylor".into(),
        })
        .unwrap();

        let Value::Composite(fields) = value else {
            panic!("struct should convert to composite");
        };
        assert_eq!(fields.get("id"), Some(&Value::Int(3)));
        assert_eq!(fields.get("name"), Some(&Value::String("taylor".into())));
    }

    #[test]
    fn test_from_vec() {
        assert_eq!(
            Value::from(vec![1, 2, 3]),
            Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }
}
