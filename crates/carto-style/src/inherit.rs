//! Inheritance resolution
//!
//! Folds the declarations of less specific definitions into the more specific
//! ones that can see the same features, producing one [`Style`] per
//! attachment.
//!
//! Definitions live in an arena for the duration of the resolution. A
//! definition that was already placed in a style is only ever extended
//! through its arena index; members still private to the current pass are
//! extended in place.

use std::collections::HashMap;

use carto_css::{Definition, Env, FilterMerge, Result};

use crate::style::Style;

/// Definitions that share an attachment, keyed by filter string.
type FilterIndex = HashMap<String, usize>;

/// Resolve inheritance for the definitions matching one layer.
///
/// `definitions` must already be in cascade order, most specific first.
pub fn inherit_definitions(definitions: &[&Definition], env: &Env) -> Result<Vec<Style>> {
    let originals = definitions
        .iter()
        .map(|definition| Ok(definition.with_filters(definition.filters.evaluate(env)?)))
        .collect::<Result<Vec<_>>>()?;

    let (arena, styles) = resolve_arena(&originals);
    let styles: Vec<Style> = styles
        .into_iter()
        .map(|(attachment, members)| {
            let mut style = Style::new(attachment);
            for k in members {
                style.push(arena[k].clone());
            }
            style
        })
        .collect();
    tracing::debug!(
        "Resolved {} definitions into {} styles",
        definitions.len(),
        styles.len()
    );
    Ok(styles)
}

/// Run inheritance over evaluated definitions, returning the arena and the
/// arena members of each attachment's style.
fn resolve_arena(originals: &[Definition]) -> (Vec<Definition>, Vec<(String, Vec<usize>)>) {
    let mut arena: Vec<Definition> = Vec::with_capacity(originals.len());
    let mut styles: Vec<(String, Vec<usize>)> = Vec::new();
    let mut by_attachment: HashMap<String, usize> = HashMap::new();
    let mut by_filter: HashMap<String, FilterIndex> = HashMap::new();

    for (i, definition) in originals.iter().enumerate() {
        let attachment = definition.attachment.as_str();
        let style = *by_attachment
            .entry(attachment.to_string())
            .or_insert_with(|| {
                styles.push((attachment.to_string(), Vec::new()));
                styles.len() - 1
            });
        let index = by_filter.entry(attachment.to_string()).or_default();

        arena.push(definition.clone());
        let mut current = vec![arena.len() - 1];

        for incoming in originals[i + 1..]
            .iter()
            .filter(|later| later.attachment == attachment)
        {
            current = add_rules(&mut arena, current, incoming, index);
        }

        for k in current {
            index.insert(arena[k].filters.to_string(), k);
            styles[style].1.push(k);
        }
    }
    (arena, styles)
}

/// Fold `incoming` into every member of `current`.
///
/// A member whose filters grow when combined with `incoming` is split: the
/// narrower copy takes the incoming rules and is placed in front of the
/// member it came from. A member whose filters already imply `incoming`
/// takes the rules directly; it is copied first only when the filter index
/// already refers to it. Contradicting members are left alone.
fn add_rules(
    arena: &mut Vec<Definition>,
    current: Vec<usize>,
    incoming: &Definition,
    index: &mut FilterIndex,
) -> Vec<usize> {
    let mut next = Vec::with_capacity(current.len() + 1);
    for k in current {
        match arena[k].filters.clone_with(&incoming.filters) {
            FilterMerge::Merged(filters) => {
                let key = filters.to_string();
                if let Some(&previous) = index.get(&key) {
                    arena[previous].add_rules(incoming.rules());
                } else {
                    let mut clone = arena[k].with_filters(filters);
                    if clone.add_rules(incoming.rules()) > 0 {
                        arena.push(clone);
                        let split = arena.len() - 1;
                        index.insert(key, split);
                        next.push(split);
                    }
                }
                next.push(k);
            }
            FilterMerge::Unchanged => {
                let published = index.get(&arena[k].filters.to_string()) == Some(&k);
                if published {
                    let mut clone = arena[k].clone();
                    clone.add_rules(incoming.rules());
                    arena.push(clone);
                    next.push(arena.len() - 1);
                } else {
                    arena[k].add_rules(incoming.rules());
                    next.push(k);
                }
            }
            FilterMerge::Conflict => next.push(k),
        }
    }
    next
}
