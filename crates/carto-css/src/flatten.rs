//! Selector flattening
//!
//! Nested rulesets are expanded into flat [`Definition`]s. A nested selector
//! inherits the filters, zoom, elements and attachment of every parent
//! selector it can be combined with.

use crate::definition::Definition;
use crate::error::Result;
use crate::filter::FilterMerge;
use crate::selector::Selector;
use crate::tree::{Ruleset, Stylesheet};
use crate::value::Env;

/// Flatten every top-level ruleset of a stylesheet.
pub fn flatten_stylesheet(stylesheet: &Stylesheet, env: &Env) -> Result<Vec<Definition>> {
    let mut definitions = Vec::new();
    for ruleset in &stylesheet.rulesets {
        flatten(ruleset, None, env, &mut definitions)?;
    }
    tracing::debug!(
        "Flattened {} into {} definitions",
        stylesheet.file,
        definitions.len()
    );
    Ok(definitions)
}

/// Flatten `ruleset` under `parents` (`None` at the top level), appending the
/// resulting definitions to `out`. Nested rulesets are emitted before the
/// definitions of this level.
pub fn flatten(
    ruleset: &Ruleset,
    parents: Option<&[Selector]>,
    env: &Env,
    out: &mut Vec<Definition>,
) -> Result<()> {
    let mut selectors = Vec::new();
    for spec in &ruleset.selectors {
        let Some(child) = Selector::resolve(spec, env)? else {
            continue;
        };
        match parents {
            None => selectors.push(child),
            Some(parents) => {
                selectors.extend(parents.iter().filter_map(|parent| combine(parent, &child)));
            }
        }
    }

    for nested in &ruleset.children {
        flatten(nested, Some(&selectors), env, out)?;
    }

    let first_index = ruleset.rules.first().map(|rule| rule.index);
    for mut selector in selectors {
        if let Some(index) = first_index {
            selector.index = index;
        }
        out.push(Definition::new(&selector, ruleset.rules.clone()));
    }
    Ok(())
}

/// Combine a parent selector with a nested one; `None` if their filters
/// contradict each other.
pub fn combine(parent: &Selector, child: &Selector) -> Option<Selector> {
    let filters = match parent.filters.clone_with(&child.filters) {
        FilterMerge::Conflict => return None,
        FilterMerge::Merged(filters) => filters,
        FilterMerge::Unchanged => {
            if parent.zoom == (parent.zoom & child.zoom)
                && parent.attachment == child.attachment
                && parent.elements_equal(child)
            {
                return Some(parent.clone());
            }
            parent.filters.clone()
        }
    };

    let attachment = match (&parent.attachment, &child.attachment) {
        (Some(outer), Some(inner)) => Some(format!("{outer}/{inner}")),
        (outer, inner) => inner.clone().or_else(|| outer.clone()),
    };

    Some(Selector {
        elements: parent
            .elements
            .iter()
            .chain(child.elements.iter())
            .cloned()
            .collect(),
        filters,
        zoom: parent.zoom & child.zoom,
        attachment,
        conditions: parent.conditions + child.conditions,
        index: child.index,
        location: child.location.clone(),
    })
}
