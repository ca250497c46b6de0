//! Property values and variables
//!
//! Values are kept as small expression trees so variables declared anywhere in
//! a project can be resolved after every stylesheet has been read.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{CartoError, Result, SourceLocation};

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u64);

/// A value term.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Keyword(String),
    Number { value: f64, unit: Option<String> },
    Percentage(f64),
    /// Hex color literal including the leading `#`.
    Color(String),
    Quoted(String),
    /// Feature attribute reference, `[name]`.
    Field(String),
    Variable(String),
    Url(String),
    Function { name: String, args: Vec<Value> },
    Operator(char),
    /// Space separated terms.
    Sequence(Vec<Value>),
    /// Comma separated values.
    List(Vec<Value>),
}

impl Value {
    pub fn number(value: f64) -> Self {
        Value::Number { value, unit: None }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Value::Variable(_))
    }
}

/// A value as written in a stylesheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    id: ExprId,
    pub value: Value,
    pub location: SourceLocation,
}

impl Expression {
    pub fn new(value: Value, location: SourceLocation) -> Self {
        Self {
            id: ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed)),
            value,
            location,
        }
    }

    pub fn id(&self) -> ExprId {
        self.id
    }
}

const MAX_VARIABLE_DEPTH: usize = 32;

/// Variable scope used when evaluating values.
#[derive(Debug, Clone, Default)]
pub struct Env {
    variables: HashMap<String, Arc<Expression>>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) `@name`.
    pub fn define(&mut self, name: impl Into<String>, value: Arc<Expression>) {
        self.variables.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Expression>> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Render an expression to its textual form with variables substituted.
    pub fn evaluate(&self, expr: &Expression) -> Result<String> {
        let mut out = String::new();
        self.render(&expr.value, &expr.location, 0, &mut out)?;
        Ok(out)
    }

    pub fn evaluate_value(&self, value: &Value, location: &SourceLocation) -> Result<String> {
        let mut out = String::new();
        self.render(value, location, 0, &mut out)?;
        Ok(out)
    }

    fn render(
        &self,
        value: &Value,
        location: &SourceLocation,
        depth: usize,
        out: &mut String,
    ) -> Result<()> {
        match value {
            Value::Keyword(word) => out.push_str(word),
            Value::Number { value, unit } => {
                let _ = write!(out, "{value}");
                if let Some(unit) = unit {
                    out.push_str(unit);
                }
            }
            Value::Percentage(value) => {
                let _ = write!(out, "{value}%");
            }
            Value::Color(color) => out.push_str(color),
            Value::Quoted(text) => {
                out.push('"');
                out.push_str(text);
                out.push('"');
            }
            Value::Field(name) => {
                out.push('[');
                out.push_str(name);
                out.push(']');
            }
            Value::Url(path) => out.push_str(path),
            Value::Operator(op) => out.push(*op),
            Value::Variable(name) => {
                let Some(expr) = self.variables.get(name) else {
                    return Err(CartoError::UndefinedVariable {
                        name: name.clone(),
                        location: location.clone(),
                    });
                };
                if depth >= MAX_VARIABLE_DEPTH {
                    return Err(CartoError::parse(
                        format!("variable '@{name}' is defined recursively"),
                        location.clone(),
                    ));
                }
                self.render(&expr.value, location, depth + 1, out)?;
            }
            Value::Function { name, args } => {
                out.push_str(name);
                out.push('(');
                self.render_joined(args, ", ", location, depth, out)?;
                out.push(')');
            }
            Value::Sequence(items) => self.render_joined(items, " ", location, depth, out)?,
            Value::List(items) => self.render_joined(items, ", ", location, depth, out)?,
        }
        Ok(())
    }

    fn render_joined(
        &self,
        items: &[Value],
        separator: &str,
        location: &SourceLocation,
        depth: usize,
        out: &mut String,
    ) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            self.render(item, location, depth, out)?;
        }
        Ok(())
    }
}
