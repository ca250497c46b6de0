//! Attribute filters
//!
//! A [`FilterSet`] is the canonical conjunction of `[key op value]`
//! comparisons attached to a selector. Adding a comparison either narrows the
//! set, is already implied by it, or contradicts it; the set never stores a
//! contradictory combination.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SourceLocation};
use crate::value::{Env, Expression};

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterOp {
    Eq,
    Ne,
    /// Regular expression match, `=~`.
    Match,
    /// Modulo, `%`.
    Mod,
    Gt,
    Ge,
    Lt,
    Le,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Match => "=~",
            FilterOp::Mod => "%",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => FilterOp::Eq,
            "!=" => FilterOp::Ne,
            "=~" => FilterOp::Match,
            "%" => FilterOp::Mod,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Ge,
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Le,
            _ => return None,
        })
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `[key op value]` comparison with its value resolved to text.
#[derive(Debug, Clone)]
pub struct FilterElement {
    pub key: String,
    pub op: FilterOp,
    value: String,
    numeric: Option<f64>,
    source: Option<Arc<Expression>>,
}

impl FilterElement {
    /// Build from an already rendered value.
    pub fn new(key: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        let value = value.into();
        let numeric = value.trim().parse::<f64>().ok();
        Self {
            key: key.into(),
            op,
            value,
            numeric,
            source: None,
        }
    }

    /// Build from a stylesheet expression, rendering it against `env`.
    pub fn resolve(
        key: impl Into<String>,
        op: FilterOp,
        source: Arc<Expression>,
        env: &Env,
    ) -> Result<Self> {
        let mut element = Self::new(key, op, env.evaluate(&source)?);
        element.source = Some(source);
        Ok(element)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Numeric form of the value, `None` for strings.
    pub fn numeric(&self) -> Option<f64> {
        self.numeric
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.source.as_ref().map(|expr| &expr.location)
    }

    /// Canonical identity, `[key]op value`.
    pub fn id(&self) -> String {
        format!("[{}]{}{}", self.key, self.op, self.value)
    }

    /// Slot this element occupies in a set. Bounds and equality are unique
    /// per key; the other operators are unique per value.
    fn slot(&self) -> String {
        match self.op {
            FilterOp::Eq | FilterOp::Gt | FilterOp::Ge | FilterOp::Lt | FilterOp::Le => {
                format!("{}{}", self.key, self.op)
            }
            FilterOp::Ne | FilterOp::Match | FilterOp::Mod => {
                format!("{}{}{}", self.key, self.op, self.value)
            }
        }
    }

    fn with_op(&self, op: FilterOp) -> Self {
        Self { op, ..self.clone() }
    }
}

impl PartialEq for FilterElement {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.op == other.op && self.value == other.value
    }
}

impl fmt::Display for FilterElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}{}", self.key, self.op, self.value)
    }
}

/// Outcome of testing a filter against a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addable {
    /// The filter narrows the set.
    Add,
    /// The set already implies the filter.
    Redundant,
    /// The filter contradicts the set.
    Conflict,
}

/// Outcome of [`FilterSet::clone_with`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterMerge {
    /// Combination of both sets, strictly narrower than the receiver.
    Merged(FilterSet),
    /// The other set adds nothing.
    Unchanged,
    /// The sets can never hold at the same time.
    Conflict,
}

/// Canonical conjunction of filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: BTreeMap<String, FilterElement>,
}

/// Numeric comparison that is false whenever either side is not a number.
fn holds(existing: Option<&FilterElement>, value: Option<f64>, cmp: fn(f64, f64) -> bool) -> bool {
    match (existing.and_then(FilterElement::numeric), value) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterElement> {
        self.filters.values()
    }

    fn bound(&self, key: &str, op: FilterOp) -> Option<&FilterElement> {
        self.filters.get(&format!("{key}{op}"))
    }

    fn not_equal(&self, key: &str, value: &str) -> Option<&FilterElement> {
        self.filters.get(&format!("{key}!={value}"))
    }

    /// Whether `filter` narrows, is implied by, or contradicts this set.
    pub fn addable(&self, filter: &FilterElement) -> Addable {
        use Addable::{Add, Conflict, Redundant};

        let key = filter.key.as_str();
        let v = filter.numeric;
        let eq = self.bound(key, FilterOp::Eq);
        let gt = self.bound(key, FilterOp::Gt);
        let ge = self.bound(key, FilterOp::Ge);
        let lt = self.bound(key, FilterOp::Lt);
        let le = self.bound(key, FilterOp::Le);

        match filter.op {
            FilterOp::Eq => {
                if let Some(eq) = eq {
                    return if eq.value != filter.value { Conflict } else { Redundant };
                }
                if self.not_equal(key, &filter.value).is_some()
                    || holds(gt, v, |a, b| a >= b)
                    || holds(lt, v, |a, b| a <= b)
                    || holds(ge, v, |a, b| a > b)
                    || holds(le, v, |a, b| a < b)
                {
                    return Conflict;
                }
                Add
            }
            FilterOp::Match | FilterOp::Mod => {
                if self.filters.contains_key(&filter.slot()) {
                    Redundant
                } else {
                    Add
                }
            }
            FilterOp::Ne => {
                if let Some(eq) = eq {
                    return if eq.value == filter.value { Conflict } else { Redundant };
                }
                if self.not_equal(key, &filter.value).is_some()
                    || holds(gt, v, |a, b| a >= b)
                    || holds(lt, v, |a, b| a <= b)
                    || holds(ge, v, |a, b| a > b)
                    || holds(le, v, |a, b| a < b)
                {
                    return Redundant;
                }
                Add
            }
            FilterOp::Gt => {
                if let Some(eq) = eq {
                    return if holds(Some(eq), v, |a, b| a <= b) { Conflict } else { Redundant };
                }
                if holds(lt, v, |a, b| a <= b) || holds(le, v, |a, b| a <= b) {
                    return Conflict;
                }
                if holds(gt, v, |a, b| a >= b) || holds(ge, v, |a, b| a > b) {
                    return Redundant;
                }
                Add
            }
            FilterOp::Ge => {
                if let Some(eq) = eq {
                    return if holds(Some(eq), v, |a, b| a < b) { Conflict } else { Redundant };
                }
                if holds(lt, v, |a, b| a <= b) || holds(le, v, |a, b| a < b) {
                    return Conflict;
                }
                if holds(gt, v, |a, b| a >= b) || holds(ge, v, |a, b| a >= b) {
                    return Redundant;
                }
                Add
            }
            FilterOp::Lt => {
                if let Some(eq) = eq {
                    return if holds(Some(eq), v, |a, b| a >= b) { Conflict } else { Redundant };
                }
                if holds(gt, v, |a, b| a >= b) || holds(ge, v, |a, b| a >= b) {
                    return Conflict;
                }
                if holds(lt, v, |a, b| a <= b) || holds(le, v, |a, b| a < b) {
                    return Redundant;
                }
                Add
            }
            FilterOp::Le => {
                if let Some(eq) = eq {
                    return if holds(Some(eq), v, |a, b| a > b) { Conflict } else { Redundant };
                }
                if holds(gt, v, |a, b| a >= b) || holds(ge, v, |a, b| a > b) {
                    return Conflict;
                }
                if holds(lt, v, |a, b| a <= b) || holds(le, v, |a, b| a <= b) {
                    return Redundant;
                }
                Add
            }
        }
    }

    /// Insert a filter previously accepted by [`FilterSet::addable`].
    ///
    /// Equality replaces every filter on its key. A bound drops the
    /// comparisons on its key it makes redundant, leaving `=~` and `%` alone,
    /// and `>=`/`<=` tighten to `>`/`<` when a `!=` on the bound value exists.
    pub fn add(&mut self, filter: FilterElement) {
        let key = filter.key.clone();
        let v = filter.numeric;
        let prune = |set: &mut Self, cmp: fn(f64, f64) -> bool| {
            set.filters.retain(|_, existing| {
                existing.key != key
                    || matches!(existing.op, FilterOp::Match | FilterOp::Mod)
                    || !holds(Some(existing), v, cmp)
            });
        };
        match filter.op {
            FilterOp::Eq => {
                self.filters.retain(|_, existing| existing.key != key);
                self.filters.insert(filter.slot(), filter);
            }
            FilterOp::Ne | FilterOp::Match | FilterOp::Mod => {
                self.filters.insert(filter.slot(), filter);
            }
            FilterOp::Gt => {
                prune(self, |a, b| a <= b);
                self.filters.insert(filter.slot(), filter);
            }
            FilterOp::Lt => {
                prune(self, |a, b| a >= b);
                self.filters.insert(filter.slot(), filter);
            }
            FilterOp::Ge => {
                prune(self, |a, b| a < b);
                self.insert_bound(filter, FilterOp::Gt);
            }
            FilterOp::Le => {
                prune(self, |a, b| a > b);
                self.insert_bound(filter, FilterOp::Lt);
            }
        }
    }

    fn insert_bound(&mut self, filter: FilterElement, strict: FilterOp) {
        let ne_slot = format!("{}!={}", filter.key, filter.value);
        let filter = if self.filters.remove(&ne_slot).is_some() {
            filter.with_op(strict)
        } else {
            filter
        };
        self.filters.insert(filter.slot(), filter);
    }

    /// Build a set from a sequence of filters, failing on the first conflict.
    pub fn from_filters(filters: impl IntoIterator<Item = FilterElement>) -> Option<Self> {
        let mut set = Self::new();
        for filter in filters {
            match set.addable(&filter) {
                Addable::Add => set.add(filter),
                Addable::Redundant => {}
                Addable::Conflict => return None,
            }
        }
        Some(set)
    }

    /// Combine with `other` without modifying `self`.
    pub fn clone_with(&self, other: &FilterSet) -> FilterMerge {
        let mut additions = Vec::new();
        for filter in other.filters.values() {
            match self.addable(filter) {
                Addable::Conflict => return FilterMerge::Conflict,
                Addable::Add => additions.push(filter),
                Addable::Redundant => {}
            }
        }
        if additions.is_empty() {
            return FilterMerge::Unchanged;
        }
        let mut merged = self.clone();
        for filter in additions {
            merged.add(filter.clone());
        }
        FilterMerge::Merged(merged)
    }

    /// True when every filter of `other` already holds under `self`.
    pub fn implies(&self, other: &FilterSet) -> bool {
        matches!(self.clone_with(other), FilterMerge::Unchanged)
    }

    /// Re-render every filter value from its source expression.
    pub fn evaluate(&self, env: &Env) -> Result<FilterSet> {
        let mut set = FilterSet::new();
        for filter in self.filters.values() {
            let filter = match &filter.source {
                Some(source) => {
                    FilterElement::resolve(filter.key.clone(), filter.op, source.clone(), env)?
                }
                None => filter.clone(),
            };
            if set.addable(&filter) == Addable::Add {
                set.add(filter);
            }
        }
        Ok(set)
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, filter) in self.filters.values().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(key: &str, op: &str, value: &str) -> FilterElement {
        FilterElement::new(key, FilterOp::from_symbol(op).unwrap(), value)
    }

    fn set(filters: &[(&str, &str, &str)]) -> FilterSet {
        FilterSet::from_filters(filters.iter().map(|(k, op, v)| f(k, op, v))).unwrap()
    }

    // ========================================================================
    // Addable
    // ========================================================================

    #[test]
    fn test_equality_conflicts() {
        let s = set(&[("a", "=", "1")]);
        assert_eq!(s.addable(&f("a", "=", "2")), Addable::Conflict);
        assert_eq!(s.addable(&f("a", "=", "1")), Addable::Redundant);
        assert_eq!(s.addable(&f("b", "=", "1")), Addable::Add);
    }

    #[test]
    fn test_equality_against_bounds() {
        let s = set(&[("a", ">", "5")]);
        assert_eq!(s.addable(&f("a", "=", "5")), Addable::Conflict);
        assert_eq!(s.addable(&f("a", "=", "6")), Addable::Add);
        let s = set(&[("a", "<=", "5")]);
        assert_eq!(s.addable(&f("a", "=", "5")), Addable::Add);
        assert_eq!(s.addable(&f("a", "=", "6")), Addable::Conflict);
        let s = set(&[("a", "!=", "3")]);
        assert_eq!(s.addable(&f("a", "=", "3")), Addable::Conflict);
    }

    #[test]
    fn test_not_equal() {
        let s = set(&[("a", "=", "1")]);
        assert_eq!(s.addable(&f("a", "!=", "1")), Addable::Conflict);
        assert_eq!(s.addable(&f("a", "!=", "2")), Addable::Redundant);
        let s = set(&[("a", ">", "5")]);
        assert_eq!(s.addable(&f("a", "!=", "3")), Addable::Redundant);
        assert_eq!(s.addable(&f("a", "!=", "7")), Addable::Add);
        let s = set(&[("a", "!=", "7")]);
        assert_eq!(s.addable(&f("a", "!=", "7")), Addable::Redundant);
    }

    #[test]
    fn test_lower_bounds() {
        let s = set(&[("a", "<=", "5")]);
        assert_eq!(s.addable(&f("a", ">", "5")), Addable::Conflict);
        assert_eq!(s.addable(&f("a", ">=", "5")), Addable::Add);
        assert_eq!(s.addable(&f("a", ">=", "6")), Addable::Conflict);
        let s = set(&[("a", ">", "5")]);
        assert_eq!(s.addable(&f("a", ">", "4")), Addable::Redundant);
        assert_eq!(s.addable(&f("a", ">=", "5")), Addable::Redundant);
        assert_eq!(s.addable(&f("a", ">", "6")), Addable::Add);
        let s = set(&[("a", "=", "4")]);
        assert_eq!(s.addable(&f("a", ">", "4")), Addable::Conflict);
        assert_eq!(s.addable(&f("a", ">=", "4")), Addable::Redundant);
    }

    #[test]
    fn test_upper_bounds() {
        let s = set(&[("a", ">=", "5")]);
        assert_eq!(s.addable(&f("a", "<", "5")), Addable::Conflict);
        assert_eq!(s.addable(&f("a", "<=", "5")), Addable::Add);
        assert_eq!(s.addable(&f("a", "<=", "4")), Addable::Conflict);
        let s = set(&[("a", "<", "5")]);
        assert_eq!(s.addable(&f("a", "<", "6")), Addable::Redundant);
        assert_eq!(s.addable(&f("a", "<=", "5")), Addable::Redundant);
        assert_eq!(s.addable(&f("a", "<", "4")), Addable::Add);
    }

    #[test]
    fn test_string_values_do_not_order() {
        let s = set(&[("name", "=", "\"main\"")]);
        assert_eq!(s.addable(&f("name", ">", "3")), Addable::Redundant);
        assert_eq!(s.addable(&f("name", "=", "\"side\"")), Addable::Conflict);
    }

    #[test]
    fn test_regex_and_modulo() {
        let s = set(&[("name", "=~", "'^A.*'")]);
        assert_eq!(s.addable(&f("name", "=~", "'^A.*'")), Addable::Redundant);
        assert_eq!(s.addable(&f("name", "=~", "'^B.*'")), Addable::Add);
        assert_eq!(s.addable(&f("pop", "%", "2")), Addable::Add);
        let s = set(&[("pop", "%", "2")]);
        assert_eq!(s.addable(&f("pop", "%", "2")), Addable::Redundant);
        assert_eq!(s.addable(&f("pop", "%", "3")), Addable::Add);
    }

    // ========================================================================
    // Add
    // ========================================================================

    #[test]
    fn test_equality_replaces_key() {
        let mut s = set(&[("a", "!=", "2"), ("a", ">", "0"), ("b", "=", "1")]);
        s.add(f("a", "=", "5"));
        assert_eq!(s.to_string(), "[a]=5 [b]=1");
    }

    #[test]
    fn test_tighter_bound_wins() {
        let s = set(&[("a", ">", "3"), ("a", ">", "5")]);
        assert_eq!(s.to_string(), "[a]>5");
        let s = set(&[("a", "<=", "9"), ("a", "<", "4")]);
        assert_eq!(s.to_string(), "[a]<4");
        let s = set(&[("a", "!=", "2"), ("a", ">", "3")]);
        assert_eq!(s.to_string(), "[a]>3");
    }

    #[test]
    fn test_bounds_keep_regex_and_modulo() {
        let s = set(&[("a", "=~", "1"), ("a", "%", "2"), ("a", ">", "5")]);
        assert_eq!(s.len(), 3);
        let s = set(&[("a", "=~", "9"), ("a", "%", "7"), ("a", "<", "5")]);
        assert_eq!(s.len(), 3);
        let s = set(&[("a", "%", "3"), ("a", ">=", "4")]);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_inclusive_bound_tightens_on_not_equal() {
        let s = set(&[("a", "!=", "5"), ("a", ">=", "5")]);
        assert_eq!(s.to_string(), "[a]>5");
        let s = set(&[("a", "!=", "5"), ("a", "<=", "5")]);
        assert_eq!(s.to_string(), "[a]<5");
    }

    // ========================================================================
    // CloneWith
    // ========================================================================

    #[test]
    fn test_clone_with() {
        let a1 = set(&[("a", "=", "1")]);
        let a2 = set(&[("a", "=", "2")]);
        assert_eq!(a1.clone_with(&a2), FilterMerge::Conflict);
        assert_eq!(a1.clone_with(&a1.clone()), FilterMerge::Unchanged);

        let b2 = set(&[("b", "=", "2")]);
        match a1.clone_with(&b2) {
            FilterMerge::Merged(merged) => assert_eq!(merged.to_string(), "[a]=1 [b]=2"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(a1.to_string(), "[a]=1");
    }

    #[test]
    fn test_empty_set_is_implied_by_everything() {
        let narrow = set(&[("a", "=", "1")]);
        assert!(narrow.implies(&FilterSet::new()));
        assert!(!FilterSet::new().implies(&narrow));
    }

    #[test]
    fn test_canonical_string_is_order_independent() {
        let a = set(&[("b", "=", "2"), ("a", "=", "1")]);
        let b = set(&[("a", "=", "1"), ("b", "=", "2")]);
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn test_conflicting_sequence_is_rejected() {
        assert!(FilterSet::from_filters([f("a", "=", "1"), f("a", "=", "2")]).is_none());
    }
}
