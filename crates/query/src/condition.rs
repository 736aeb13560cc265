//! Condition evaluation.
//!
//! A where-clause is a list of `Condition`s that must all hold. Each condition
//! carries a `Connective` recording whether it was added with `or_where`, but
//! the list is always combined with AND.

use core::fmt;
use core::str::FromStr;
use tabula_core::pattern_match::{contains_ignore_case, like};
use tabula_core::{Error, Record, Value};

/// Comparison operator of a condition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Operator {
    #[default]
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    In,
    Like,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::In => "IN",
            Operator::Like => "LIKE",
        }
    }

    /// Returns true for `>`, `<`, `>=` and `<=`.
    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le)
    }

    /// Applies the operator to a field value and a condition operand.
    pub fn eval(&self, field: &Value, operand: &Value) -> bool {
        match self {
            Operator::Eq => field == operand,
            Operator::Ne => field != operand,
            Operator::Gt => field.compare(operand).is_some_and(|o| o.is_gt()),
            Operator::Lt => field.compare(operand).is_some_and(|o| o.is_lt()),
            Operator::Ge => field.compare(operand).is_some_and(|o| o.is_ge()),
            Operator::Le => field.compare(operand).is_some_and(|o| o.is_le()),
            Operator::In => operand
                .as_array()
                .is_some_and(|items| items.contains(field)),
            Operator::Like => match operand {
                Value::String(pattern) => like(&field.to_text(), pattern),
                other => like(&field.to_text(), &other.to_text()),
            },
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::Ne,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Ge,
            "<=" => Operator::Le,
            "IN" => Operator::In,
            "LIKE" => Operator::Like,
            _ => return Err(Error::invalid_input(format!("unknown operator {s:?}"))),
        };
        Ok(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a condition was attached to the clause.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connective {
    #[default]
    And,
    /// Added with `or_where`. Evaluated as AND.
    Or,
}

/// A single `field <op> value` test.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    pub connective: Connective,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            connective: Connective::And,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// Marks the condition as added by `or_where`.
    pub fn or(mut self) -> Self {
        self.connective = Connective::Or;
        self
    }

    #[inline]
    pub fn eval(&self, record: &Record) -> bool {
        self.operator.eval(record.value(&self.field), &self.value)
    }
}

/// Returns true if the record satisfies every condition.
pub fn matches(record: &Record, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| c.eval(record))
}

/// A search term matched against one column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchTerm {
    pub column: String,
    pub term: String,
}

/// Returns true if any term occurs (case-insensitively) in its column's text
/// form. An empty term list matches everything.
pub fn matches_search(record: &Record, terms: &[SearchTerm]) -> bool {
    terms.is_empty()
        || terms.iter().any(|t| {
            let value = record.value(&t.column);
            !value.is_null() && contains_ignore_case(&value.to_text(), &t.term)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Record {
        Record::new()
            .with("id", 1)
            .with("name", "Blue Widget")
            .with("price", 25.5)
            .with("stock", 3)
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Ge);
        assert_eq!("in".parse::<Operator>().unwrap(), Operator::In);
        assert_eq!(" Like ".parse::<Operator>().unwrap(), Operator::Like);
        assert!("~".parse::<Operator>().is_err());
    }

    #[test]
    fn test_comparisons() {
        let r = product();
        assert!(Condition::new("price", Operator::Gt, 20).eval(&r));
        assert!(Condition::new("price", Operator::Le, 25.5).eval(&r));
        assert!(!Condition::new("price", Operator::Lt, 25.5).eval(&r));
        assert!(Condition::new("stock", Operator::Eq, 3.0).eval(&r));
        assert!(Condition::new("stock", Operator::Ne, 4).eval(&r));
        assert!(Condition::new("name", Operator::Gt, "Alpha").eval(&r));
    }

    #[test]
    fn test_mixed_types_never_compare() {
        let r = product();
        assert!(!Condition::new("name", Operator::Gt, 1).eval(&r));
        assert!(!Condition::new("name", Operator::Lt, 1).eval(&r));
        assert!(!Condition::new("missing", Operator::Lt, 1).eval(&r));
        assert!(Condition::new("missing", Operator::Eq, Value::Null).eval(&r));
    }

    #[test]
    fn test_in_and_like() {
        let r = product();
        let ids = Value::Array(vec![Value::from(1), Value::from(7)]);
        assert!(Condition::new("id", Operator::In, ids).eval(&r));
        assert!(!Condition::new("id", Operator::In, 1).eval(&r));
        assert!(Condition::new("name", Operator::Like, "%Widget").eval(&r));
        assert!(Condition::new("name", Operator::Like, "e W").eval(&r));
        assert!(!Condition::new("name", Operator::Like, "widget").eval(&r));
    }

    #[test]
    fn test_or_tag_is_conjunctive() {
        let r = product();
        let conditions = vec![
            Condition::eq("id", 1),
            Condition::eq("id", 2).or(),
        ];
        assert!(!matches(&r, &conditions));
        assert!(matches(&r, &conditions[..1]));
        assert!(matches(&r, &[]));
    }

    #[test]
    fn test_search_terms() {
        let r = product();
        let term = |column: &str, term: &str| SearchTerm {
            column: column.into(),
            term: term.into(),
        };
        assert!(matches_search(&r, &[]));
        assert!(matches_search(&r, &[term("name", "blue")]));
        assert!(matches_search(&r, &[term("id", "zzz"), term("price", "25.5")]));
        assert!(!matches_search(&r, &[term("name", "red"), term("missing", "")]));
    }
}
