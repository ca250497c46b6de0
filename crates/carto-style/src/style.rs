//! Per-attachment styles
//!
//! A style is the cascade-ordered chain of definitions that share one
//! attachment on one layer.

use std::fmt;

use carto_css::{CartoError, DEFAULT_ATTACHMENT, Definition, FilterMerge, Result};

use crate::context::ResolveContext;

/// How a renderer walks the rules of a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Only the first matching rule draws a feature.
    #[default]
    First,
    /// Every matching rule draws.
    All,
}

impl FilterMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "first" => Some(FilterMode::First),
            "all" => Some(FilterMode::All),
            _ => None,
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterMode::First => "first",
            FilterMode::All => "all",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Style {
    pub attachment: String,
    /// Smallest rule index across all definitions, used to order styles.
    pub index: u32,
    pub definitions: Vec<Definition>,
}

impl Style {
    pub fn new(attachment: impl Into<String>) -> Self {
        Self {
            attachment: attachment.into(),
            index: u32::MAX,
            definitions: Vec::new(),
        }
    }

    pub fn push(&mut self, definition: Definition) {
        self.definitions.push(definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn is_default(&self) -> bool {
        self.attachment == DEFAULT_ATTACHMENT
    }

    /// Recompute `index` from the member rules.
    pub fn update_index(&mut self) {
        self.index = self
            .definitions
            .iter()
            .filter_map(Definition::min_rule_index)
            .min()
            .unwrap_or(u32::MAX);
    }

    /// The `filter-mode` of the most specific definition declaring one.
    pub fn filter_mode(&self, ctx: &ResolveContext<'_>) -> Result<FilterMode> {
        let declared = self
            .definitions
            .iter()
            .flat_map(|definition| definition.rules())
            .find(|rule| rule.name == "filter-mode");
        let Some(rule) = declared else {
            return Ok(FilterMode::default());
        };
        let value = ctx.value(rule)?;
        FilterMode::from_name(value.trim_matches(|c| c == '"' || c == '\'')).ok_or_else(|| {
            CartoError::InvalidValue {
                property: rule.name.clone(),
                value,
                message: "expected 'first' or 'all'".to_string(),
                location: rule.location.clone(),
            }
        })
    }

    /// Drop definitions that an earlier definition already covers. Only
    /// meaningful when the renderer stops at the first matching rule, so
    /// nothing happens in [`FilterMode::All`]. Returns how many were removed.
    pub fn fold(&mut self, mode: FilterMode) -> usize {
        if mode == FilterMode::All {
            return 0;
        }
        let before = self.definitions.len();
        let mut i = 0;
        while i < self.definitions.len() {
            let mut j = self.definitions.len() - 1;
            while j > i {
                let covered = matches!(
                    self.definitions[j]
                        .filters
                        .clone_with(&self.definitions[i].filters),
                    FilterMerge::Unchanged
                );
                if covered {
                    self.definitions.remove(j);
                }
                j -= 1;
            }
            i += 1;
        }
        let removed = before - self.definitions.len();
        if removed > 0 {
            tracing::debug!(
                "Folded {} unreachable definitions from style '{}'",
                removed,
                self.attachment
            );
        }
        removed
    }
}

/// Order styles by the first rule they contain.
pub fn sort_styles(styles: &mut [Style]) {
    for style in styles.iter_mut() {
        style.update_index();
    }
    styles.sort_by_key(|style| style.index);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use carto_css::{
        Element, ElementKind, Env, Expression, FilterElement, FilterOp, FilterSet, PropertyRule,
        Selector, SourceLocation, Value,
    };

    use super::*;
    use crate::context::ValueCache;
    use crate::translator::MapnikTranslator;

    fn definition(filters: &[(&str, &str)], rules: &[(&str, Value)], index: u32) -> Definition {
        let location = SourceLocation::new("t.mss", index);
        let mut selector = Selector::new(
            vec![Element::new(ElementKind::Id, "roads")],
            location.clone(),
        );
        selector.filters = FilterSet::from_filters(
            filters
                .iter()
                .map(|(key, value)| FilterElement::new(*key, FilterOp::Eq, *value)),
        )
        .unwrap();
        let rules = rules
            .iter()
            .enumerate()
            .map(|(n, (name, value))| {
                PropertyRule::new(
                    name,
                    Arc::new(Expression::new(value.clone(), location.clone())),
                    index + n as u32,
                    location.clone(),
                )
            })
            .collect();
        Definition::new(&selector, rules)
    }

    fn style(definitions: Vec<Definition>) -> Style {
        let mut style = Style::new(DEFAULT_ATTACHMENT);
        for definition in definitions {
            style.push(definition);
        }
        style
    }

    #[test]
    fn test_fold_first_removes_subsumed() {
        let mut s = style(vec![
            definition(&[("a", "1")], &[], 1),
            definition(&[("a", "2")], &[], 2),
            definition(&[("a", "1"), ("b", "2")], &[], 3),
        ]);
        assert_eq!(s.fold(FilterMode::First), 1);
        let left: Vec<String> = s.definitions.iter().map(|d| d.filters.to_string()).collect();
        assert_eq!(left, vec!["[a]=1", "[a]=2"]);
    }

    #[test]
    fn test_fold_all_keeps_everything() {
        let mut s = style(vec![
            definition(&[], &[], 1),
            definition(&[("a", "1")], &[], 2),
            definition(&[("a", "1"), ("b", "2")], &[], 3),
        ]);
        assert_eq!(s.fold(FilterMode::All), 0);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_filter_mode_first_declaration_wins() {
        let env = Env::new();
        let values = ValueCache::new();
        let translator = MapnikTranslator::new();
        let ctx = ResolveContext::new(&env, &translator, &values);

        let s = style(vec![
            definition(&[], &[("filter-mode", Value::Keyword("all".into()))], 1),
            definition(&[], &[("filter-mode", Value::Keyword("first".into()))], 5),
        ]);
        assert_eq!(s.filter_mode(&ctx).unwrap(), FilterMode::All);
        assert_eq!(style(vec![]).filter_mode(&ctx).unwrap(), FilterMode::First);

        let bad = style(vec![definition(
            &[],
            &[("filter-mode", Value::Keyword("some".into()))],
            1,
        )]);
        assert!(matches!(
            bad.filter_mode(&ctx),
            Err(CartoError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_sort_styles_by_first_rule() {
        let mut outline = Style::new("outline");
        outline.push(definition(&[], &[("line-width", Value::number(1.0))], 2));
        let mut fill = style(vec![definition(
            &[],
            &[("polygon-fill", Value::Color("#fff".into()))],
            7,
        )]);
        fill.push(definition(&[], &[("line-width", Value::number(3.0))], 9));
        let mut styles = vec![fill, outline];
        sort_styles(&mut styles);
        assert_eq!(styles[0].attachment, "outline");
        assert_eq!(styles[0].index, 2);
        assert_eq!(styles[1].index, 7);
    }
}
