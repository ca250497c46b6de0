//! Flattened definitions

use std::collections::HashSet;

use crate::error::SourceLocation;
use crate::filter::FilterSet;
use crate::rule::PropertyRule;
use crate::selector::{DEFAULT_ATTACHMENT, Element, ElementKind, Selector, Specificity};
use crate::zoom::Zoom;

/// A selector bound to its declarations.
#[derive(Debug, Clone)]
pub struct Definition {
    pub elements: Vec<Element>,
    pub filters: FilterSet,
    pub zoom: Zoom,
    pub attachment: String,
    pub specificity: Specificity,
    pub location: SourceLocation,
    rules: Vec<PropertyRule>,
    rule_ids: HashSet<String>,
}

impl Definition {
    pub fn new(selector: &Selector, rules: Vec<PropertyRule>) -> Self {
        let mut definition = Self {
            elements: selector.elements.clone(),
            filters: selector.filters.clone(),
            zoom: selector.zoom,
            attachment: selector
                .attachment
                .clone()
                .unwrap_or_else(|| DEFAULT_ATTACHMENT.to_string()),
            specificity: selector.specificity(),
            location: selector.location.clone(),
            rules: Vec::with_capacity(rules.len()),
            rule_ids: HashSet::with_capacity(rules.len()),
        };
        for mut rule in rules {
            rule.set_zoom(rule.zoom() & selector.zoom);
            definition.rule_ids.insert(rule.id().to_string());
            definition.rules.push(rule);
        }
        definition
    }

    pub fn rules(&self) -> &[PropertyRule] {
        &self.rules
    }

    /// Append the rules whose id is not present yet; returns how many were added.
    pub fn add_rules(&mut self, rules: &[PropertyRule]) -> usize {
        let mut added = 0;
        for rule in rules {
            if self.rule_ids.insert(rule.id().to_string()) {
                self.rules.push(rule.clone());
                added += 1;
            }
        }
        added
    }

    /// Copy of this definition with its filters replaced.
    pub fn with_filters(&self, filters: FilterSet) -> Definition {
        Definition {
            filters,
            ..self.clone()
        }
    }

    /// Whether every element matches a layer with the given id and classes.
    pub fn applies_to(&self, layer: &str, classes: &HashSet<&str>) -> bool {
        self.elements.iter().all(|element| match element.kind {
            ElementKind::Wildcard => true,
            ElementKind::Class => classes.contains(element.value.as_str()),
            ElementKind::Id => element.value == layer,
            ElementKind::Name => false,
        })
    }

    /// True for definitions whose only element is the bare name `name`.
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self.elements.as_slice(), [element] if element.kind == ElementKind::Name && element.value == name)
    }

    /// Smallest source index among the rules.
    pub fn min_rule_index(&self) -> Option<u32> {
        self.rules.iter().map(|rule| rule.index).min()
    }
}

/// Select the definitions that apply to a layer, keeping their order.
pub fn applicable_to<'a>(
    definitions: &'a [Definition],
    layer: &str,
    classes: &HashSet<&str>,
) -> Vec<&'a Definition> {
    definitions
        .iter()
        .filter(|definition| definition.applies_to(layer, classes))
        .collect()
}

/// Sort definitions into cascade order, most specific first.
pub fn sort_by_specificity(definitions: &mut [Definition]) {
    definitions.sort_by(|a, b| Specificity::cascade_order(&a.specificity, &b.specificity));
}
