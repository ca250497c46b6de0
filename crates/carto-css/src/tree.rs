//! Parsed stylesheet tree

use std::sync::Arc;

use crate::error::SourceLocation;
use crate::filter::FilterOp;
use crate::rule::PropertyRule;
use crate::selector::Element;
use crate::value::{Env, Expression};

/// One stylesheet file.
#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub file: Arc<str>,
    pub variables: Vec<Variable>,
    pub rulesets: Vec<Ruleset>,
}

impl Stylesheet {
    pub fn new(file: impl Into<Arc<str>>) -> Self {
        Self {
            file: file.into(),
            variables: Vec::new(),
            rulesets: Vec::new(),
        }
    }

    /// Register this stylesheet's variables, overriding earlier definitions.
    pub fn define_variables(&self, env: &mut Env) {
        for variable in &self.variables {
            env.define(variable.name.clone(), variable.value.clone());
        }
    }

    /// Number of indexes (selectors and declarations) used by this sheet.
    pub fn index_span(&self) -> u32 {
        fn walk(ruleset: &Ruleset) -> u32 {
            ruleset.selectors.len() as u32
                + ruleset.rules.len() as u32
                + ruleset.children.iter().map(walk).sum::<u32>()
        }
        self.rulesets.iter().map(walk).sum()
    }
}

/// `@name: value;`
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub value: Arc<Expression>,
}

/// A selector list with its declarations and nested rulesets.
#[derive(Debug, Clone)]
pub struct Ruleset {
    pub selectors: Vec<SelectorSpec>,
    pub rules: Vec<PropertyRule>,
    pub children: Vec<Ruleset>,
    pub location: SourceLocation,
}

/// A selector as written, before variables are resolved.
#[derive(Debug, Clone)]
pub struct SelectorSpec {
    pub parts: Vec<SelectorPart>,
    pub index: u32,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum SelectorPart {
    Element(Element),
    Filter {
        key: String,
        op: FilterOp,
        value: Arc<Expression>,
    },
    Zoom {
        op: FilterOp,
        value: Arc<Expression>,
    },
    Attachment(String),
}
