use crate::error::{EduHubError, Result};
use crate::index::SortOrder;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn op_name(&self) -> &'static str {
        match self {
            Comparison::Eq => "$eq",
            Comparison::Ne => "$ne",
            Comparison::Gt => "$gt",
            Comparison::Gte => "$gte",
            Comparison::Lt => "$lt",
            Comparison::Lte => "$lte",
        }
    }

    pub fn is_range(&self) -> bool {
        !matches!(self, Comparison::Eq | Comparison::Ne)
    }
}

/// One equality or range predicate over a declared field path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub field: String,
    pub op: Comparison,
    pub value: Value,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.op_name(), self.value)
    }
}

/// A conjunction of predicates with an optional sort field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Filter {
    predicates: Vec<Predicate>,
    sort: Option<(String, SortOrder)>,
}

impl Filter {
    /// Matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Comparison::Eq, value.into())
    }

    pub fn ne(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Comparison::Ne, value.into())
    }

    pub fn gt(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Comparison::Gt, value.into())
    }

    pub fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Comparison::Gte, value.into())
    }

    pub fn lt(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Comparison::Lt, value.into())
    }

    pub fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Comparison::Lte, value.into())
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some((field.to_string(), order));
        self
    }

    fn with(mut self, field: &str, op: Comparison, value: Value) -> Self {
        self.predicates.push(Predicate {
            field: field.to_string(),
            op,
            value,
        });
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn sort(&self) -> Option<(&str, SortOrder)> {
        self.sort.as_ref().map(|(field, order)| (field.as_str(), *order))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Reject predicates a store cannot evaluate: malformed field paths,
    /// structured comparison values, and range comparisons against null.
    pub fn check(&self) -> Result<()> {
        for predicate in &self.predicates {
            check_field_path(&predicate.field)?;
            match &predicate.value {
                Value::Array(_) | Value::Object(_) => {
                    return Err(EduHubError::InvalidFilter(format!(
                        "cannot compare field '{}' against a structured value",
                        predicate.field
                    )));
                }
                Value::Null if predicate.op.is_range() => {
                    return Err(EduHubError::InvalidFilter(format!(
                        "range comparison {} against null on field '{}'",
                        predicate.op.op_name(),
                        predicate.field
                    )));
                }
                _ => {}
            }
        }
        if let Some((field, _)) = &self.sort {
            check_field_path(field)?;
        }
        Ok(())
    }
}

/// Field paths are dot-separated identifiers; nothing else reaches a query.
pub fn check_field_path(path: &str) -> Result<()> {
    static FIELD_PATH: OnceLock<Regex> = OnceLock::new();
    let re = FIELD_PATH.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
    });
    if re.is_match(path) {
        Ok(())
    } else {
        Err(EduHubError::InvalidFilter(format!("invalid field path '{path}'")))
    }
}
