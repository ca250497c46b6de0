//! Selectors and specificity

use std::cmp::Ordering;
use std::fmt;

use crate::error::{CartoError, Result, SourceLocation};
use crate::filter::{Addable, FilterElement, FilterSet};
use crate::tree::{SelectorPart, SelectorSpec};
use crate::value::Env;
use crate::zoom::Zoom;

/// Attachment name used when a selector has no `::attachment`.
pub const DEFAULT_ATTACHMENT: &str = "__default__";

/// Kind of a selector element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// `#layer`
    Id,
    /// `.class`
    Class,
    /// `*`
    Wildcard,
    /// Bare name such as `Map`.
    Name,
}

/// A single selector element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element {
    pub kind: ElementKind,
    /// Name without its sigil.
    pub value: String,
}

impl Element {
    pub fn new(kind: ElementKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Classify a raw element as written (`#a`, `.b`, `*`, `Map`).
    pub fn parse(raw: &str) -> Self {
        if let Some(id) = raw.strip_prefix('#') {
            Self::new(ElementKind::Id, id)
        } else if let Some(class) = raw.strip_prefix('.') {
            Self::new(ElementKind::Class, class)
        } else if raw.contains('*') {
            Self::new(ElementKind::Wildcard, "*")
        } else {
            Self::new(ElementKind::Name, raw)
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ElementKind::Id => write!(f, "#{}", self.value),
            ElementKind::Class => write!(f, ".{}", self.value),
            ElementKind::Wildcard => f.write_str("*"),
            ElementKind::Name => f.write_str(&self.value),
        }
    }
}

/// Cascade weight of a selector.
///
/// Ordered field by field; a larger value is more specific. Between equal
/// selectors the later declaration (larger index) is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub conditions: u32,
    pub index: u32,
}

impl Specificity {
    /// Ordering that puts the most specific first.
    pub fn cascade_order(a: &Specificity, b: &Specificity) -> Ordering {
        b.cmp(a)
    }
}

/// A resolved selector.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub elements: Vec<Element>,
    pub filters: FilterSet,
    pub zoom: Zoom,
    pub attachment: Option<String>,
    /// Number of filter and zoom predicates.
    pub conditions: u32,
    /// Source position used to break specificity ties.
    pub index: u32,
    pub location: SourceLocation,
}

impl Selector {
    pub fn new(elements: Vec<Element>, location: SourceLocation) -> Self {
        Self {
            elements,
            filters: FilterSet::new(),
            zoom: Zoom::ALL,
            attachment: None,
            conditions: 0,
            index: 0,
            location,
        }
    }

    /// Resolve a parsed selector against the variable scope.
    ///
    /// Returns `None` when its filters contradict each other, since such a
    /// selector can never match a feature.
    pub fn resolve(spec: &SelectorSpec, env: &Env) -> Result<Option<Selector>> {
        let mut selector = Selector::new(Vec::new(), spec.location.clone());
        selector.index = spec.index;

        for part in &spec.parts {
            match part {
                SelectorPart::Element(element) => selector.elements.push(element.clone()),
                SelectorPart::Attachment(name) => {
                    selector.attachment = Some(match selector.attachment.take() {
                        Some(outer) => format!("{outer}/{name}"),
                        None => name.clone(),
                    });
                }
                SelectorPart::Filter { key, op, value } => {
                    selector.conditions += 1;
                    let filter = FilterElement::resolve(key.clone(), *op, value.clone(), env)?;
                    match selector.filters.addable(&filter) {
                        Addable::Add => selector.filters.add(filter),
                        Addable::Redundant => {}
                        Addable::Conflict => {
                            tracing::warn!(
                                "{}: selector filters contradict each other, skipping",
                                spec.location
                            );
                            return Ok(None);
                        }
                    }
                }
                SelectorPart::Zoom { op, value } => {
                    selector.conditions += 1;
                    let text = env.evaluate(value)?;
                    let level = parse_zoom_level(&text).ok_or_else(|| {
                        CartoError::parse(
                            format!("zoom level '{text}' is not a number"),
                            value.location.clone(),
                        )
                    })?;
                    selector.zoom &= Zoom::from_comparison(*op, level, &value.location)?;
                }
            }
        }
        Ok(Some(selector))
    }

    pub fn specificity(&self) -> Specificity {
        let mut specificity = Specificity {
            conditions: self.conditions,
            index: self.index,
            ..Specificity::default()
        };
        for element in &self.elements {
            match element.kind {
                ElementKind::Id => specificity.ids += 1,
                ElementKind::Class => specificity.classes += 1,
                ElementKind::Wildcard | ElementKind::Name => {}
            }
        }
        specificity
    }

    pub fn elements_equal(&self, other: &Selector) -> bool {
        self.elements == other.elements
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            write!(f, "{element}")?;
        }
        if !self.filters.is_empty() {
            write!(f, " {}", self.filters)?;
        }
        if let Some(attachment) = &self.attachment {
            write!(f, "::{attachment}")?;
        }
        Ok(())
    }
}

fn parse_zoom_level(text: &str) -> Option<i64> {
    let value = text.trim().parse::<f64>().ok()?;
    (value.fract() == 0.0).then_some(value as i64)
}
