//! Resolution context
//!
//! Everything a layer worker needs to turn property rules into symbolizers:
//! the variable environment, the translator, the shared value cache and the
//! optional font-set cache.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use carto_css::{Env, ExprId, Expression, PropertyRule, Result};

use crate::fontset::FontSetCache;
use crate::translator::Translator;

/// Memoized expression values keyed by expression identity.
///
/// Reads take the shared lock; only a miss takes the write lock.
#[derive(Debug, Default)]
pub struct ValueCache {
    values: RwLock<HashMap<ExprId, String>>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, expr: &Expression, env: &Env) -> Result<String> {
        let id = expr.id();
        if let Some(value) = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(value.clone());
        }

        let value = env.evaluate(expr)?;
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_insert_with(|| value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowed view over the shared state of one compilation.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub env: &'a Env,
    pub translator: &'a dyn Translator,
    pub values: &'a ValueCache,
    pub font_sets: Option<&'a FontSetCache>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(env: &'a Env, translator: &'a dyn Translator, values: &'a ValueCache) -> Self {
        Self {
            env,
            translator,
            values,
            font_sets: None,
        }
    }

    pub fn with_font_sets(mut self, font_sets: &'a FontSetCache) -> Self {
        self.font_sets = Some(font_sets);
        self
    }

    /// Rendered value of a property rule.
    pub fn value(&self, rule: &PropertyRule) -> Result<String> {
        self.values.evaluate(&rule.value, self.env)
    }
}
