pub mod builtins;
pub mod chunk;
pub mod disassemble;

use std::fmt;

/// A compile time constant.
#[derive(Clone, PartialEq, PartialOrd)]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    /// Returns `true` if the value is a numeric zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(val) => *val == 0,
            Self::Double(val) => *val == 0.0,
            _ => false,
        }
    }

    /// Name of the value's type as spelled in source (`integer`, `double`, ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Double(_) => "double",
            Self::Bool(_) => "boolean",
            Self::Str(_) => "string",
        }
    }

    /// Default value of a variable declared with type `ty`. Untyped and user types default to
    /// `Int(0)`.
    pub fn default_for(ty: Option<&str>) -> Value {
        match ty {
            Some("double") => Value::Double(0.0),
            Some("string") => Value::Str(String::new()),
            Some("boolean") => Value::Bool(false),
            _ => Value::Int(0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(val) => write!(f, "{}", val),
            Value::Double(val) => write!(f, "{:?}", val),
            Value::Bool(val) => write!(f, "{}", val),
            Value::Str(val) => write!(f, "{:?}", val),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

pub type ValueArray = Vec<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str("a\"b".to_string()).to_string(), r#""a\"b""#);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Value::default_for(Some("integer")), Value::Int(0));
        assert_eq!(Value::default_for(Some("double")), Value::Double(0.0));
        assert_eq!(Value::default_for(Some("string")), Value::Str(String::new()));
        assert_eq!(Value::default_for(None), Value::Int(0));
        assert!(Value::Double(0.0).is_zero());
        assert!(!Value::Str(String::new()).is_zero());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Int(1).type_name(), "integer");
        assert_eq!(Value::Double(1.0).type_name(), "double");
        assert_eq!(Value::Str("x".to_string()).type_name(), "string");
    }
}
