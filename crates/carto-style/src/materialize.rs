//! Rule materialization
//!
//! Turns folded styles into renderer rules: each definition's zoom masks are
//! sliced into spans that share one coherent set of symbolizer properties,
//! and every slice becomes a [`Rule`] with scale bounds and typed
//! symbolizers.

use std::collections::HashMap;

use carto_css::{
    CartoError, DEFAULT_ATTACHMENT, Definition, FilterSet, PropertyRule, Result, SourceLocation,
    Zoom, ZoomSpan,
};

use crate::context::ResolveContext;
use crate::inherit::inherit_definitions;
use crate::style::{FilterMode, Style, sort_styles};
use crate::symbolizer::{CompositingMode, Symbolizer, merge_polygon_outlines};
use crate::translator::{PropertyTarget, PropertyValue, SymbolizerKind, TranslateError};

/// A renderer rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Symbolizer instance the rule was started from.
    pub name: String,
    /// Renderer filter expression, `None` when the rule matches everything.
    pub filter: Option<String>,
    pub min_scale: Option<f64>,
    pub max_scale: Option<f64>,
    pub zoom: ZoomSpan,
    pub symbolizers: Vec<Symbolizer>,
}

/// A named renderer style holding ordered rules.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStyle {
    pub name: String,
    pub filter_mode: FilterMode,
    pub opacity: Option<f64>,
    pub comp_op: Option<CompositingMode>,
    pub image_filters: Vec<String>,
    pub direct_image_filters: Vec<String>,
    pub image_filters_inflate: bool,
    pub rules: Vec<Rule>,
}

impl FeatureStyle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter_mode: FilterMode::First,
            opacity: None,
            comp_op: None,
            image_filters: Vec::new(),
            direct_image_filters: Vec::new(),
            image_filters_inflate: false,
            rules: Vec::new(),
        }
    }
}

/// `roads` for the default attachment, `roads-casing` otherwise.
pub fn style_name(layer: &str, attachment: &str) -> String {
    if attachment == DEFAULT_ATTACHMENT {
        layer.to_string()
    } else {
        format!("{layer}-{attachment}")
    }
}

/// Attach a source location to a translator failure.
pub fn located(error: TranslateError, location: &SourceLocation) -> CartoError {
    match error {
        TranslateError::InvalidValue {
            property,
            value,
            reason,
        } => CartoError::InvalidValue {
            property,
            value,
            message: reason,
            location: location.clone(),
        },
        TranslateError::UnknownDatasource(kind) => CartoError::InvalidValue {
            property: "type".to_string(),
            value: kind,
            message: "unknown datasource type".to_string(),
            location: location.clone(),
        },
        TranslateError::NotImplemented(operation) => CartoError::NotImplemented {
            operation: operation.to_string(),
        },
    }
}

/// Run the whole cascade for one layer: inheritance, style ordering,
/// folding and rule creation. Styles without rules are dropped.
pub fn build_layer_styles(
    layer: &str,
    definitions: &[&Definition],
    ctx: &ResolveContext<'_>,
) -> Result<Vec<FeatureStyle>> {
    let mut styles = inherit_definitions(definitions, ctx.env)?;
    sort_styles(&mut styles);

    let mut out = Vec::with_capacity(styles.len());
    for mut style in styles {
        let mode = style.filter_mode(ctx)?;
        style.fold(mode);
        let feature = create_style(&style_name(layer, &style.attachment), &style, ctx)?;
        if feature.rules.is_empty() {
            tracing::debug!("Style '{}' has no rules, skipping", feature.name);
            continue;
        }
        out.push(feature);
    }
    Ok(out)
}

fn is_style_property(rule: &PropertyRule, ctx: &ResolveContext<'_>) -> bool {
    ctx.translator.property_target(&rule.name) == Some(PropertyTarget::Style)
}

/// Build a feature style from a folded style.
pub fn create_style(name: &str, style: &Style, ctx: &ResolveContext<'_>) -> Result<FeatureStyle> {
    let mut feature = FeatureStyle::new(name);
    feature.filter_mode = style.filter_mode(ctx)?;

    let mut seen_filters: Vec<String> = Vec::new();
    let mut seen_direct: Vec<String> = Vec::new();
    let mut inflate = None;
    for rule in style.definitions.iter().flat_map(|d| d.rules()) {
        if !is_style_property(rule, ctx) {
            continue;
        }
        let value = ctx.value(rule)?;
        match rule.name.as_str() {
            "opacity" if feature.opacity.is_none() => {
                let opacity = value.trim().parse::<f64>().map_err(|_| CartoError::InvalidValue {
                    property: rule.name.clone(),
                    value: value.clone(),
                    message: "expected a number".to_string(),
                    location: rule.location.clone(),
                })?;
                feature.opacity = Some(opacity);
            }
            "comp-op" if feature.comp_op.is_none() => {
                feature.comp_op = Some(
                    ctx.translator
                        .to_compositing_mode(&value)
                        .map_err(|e| located(e, &rule.location))?,
                );
            }
            "image-filters" if !seen_filters.contains(&value) => {
                feature.image_filters.extend(
                    ctx.translator
                        .to_image_filters(&value)
                        .map_err(|e| located(e, &rule.location))?,
                );
                seen_filters.push(value);
            }
            "direct-image-filters" if !seen_direct.contains(&value) => {
                feature.direct_image_filters.extend(
                    ctx.translator
                        .to_image_filters(&value)
                        .map_err(|e| located(e, &rule.location))?,
                );
                seen_direct.push(value);
            }
            "image-filters-inflate" if inflate.is_none() => {
                inflate = Some(value.trim() == "true");
            }
            _ => {}
        }
    }
    feature.image_filters_inflate = inflate.unwrap_or(false);

    let mut existing: HashMap<String, Zoom> = HashMap::new();
    for definition in &style.definitions {
        if definition.rules().iter().any(|rule| !is_style_property(rule, ctx)) {
            create_rules(&mut feature.rules, definition, &mut existing, ctx)?;
        }
    }
    Ok(feature)
}

/// Properties of one symbolizer instance collected for a zoom slice.
struct Group<'r> {
    instance: &'r str,
    kind: SymbolizerKind,
    properties: Vec<&'r PropertyRule>,
}

/// Emit the rules of one definition into `out`.
///
/// `existing` tracks, per filter string, the zoom levels no earlier rule of
/// the same style has drawn yet.
pub fn create_rules(
    out: &mut Vec<Rule>,
    definition: &Definition,
    existing: &mut HashMap<String, Zoom>,
    ctx: &ResolveContext<'_>,
) -> Result<()> {
    let rules = definition.rules();
    if let Some(unknown) = rules
        .iter()
        .find(|rule| ctx.translator.property_target(&rule.name).is_none())
    {
        return Err(CartoError::UnknownProperty {
            property: unknown.name.clone(),
            location: unknown.location.clone(),
        });
    }

    let key = definition.filters.to_string();
    let filter = filter_expression(&definition.filters, &definition.location, ctx)?;
    let mut remaining = *existing.entry(key.clone()).or_insert(Zoom::ALL);
    let mut available = Zoom::ALL;

    for (i, rule) in rules.iter().enumerate() {
        if is_style_property(rule, ctx) {
            continue;
        }
        let mut rule_zoom = rule.zoom();
        if (remaining & rule_zoom).is_empty() {
            continue;
        }

        loop {
            let mut current = rule_zoom & available;
            if current.is_empty() {
                break;
            }
            let groups = collect_symbolizers(&rules[i..], &mut current, ctx);
            if groups.is_empty() {
                break;
            }
            available = available.difference(current);
            rule_zoom &= available;

            let visible = remaining & current;
            if visible.is_empty() {
                continue;
            }
            let symbolizers = create_symbolizers(groups, ctx)?;
            remaining = remaining.difference(current);

            if !symbolizers.iter().any(Symbolizer::is_enabled) {
                continue;
            }
            for span in visible.spans() {
                out.push(Rule {
                    name: rule.instance.clone(),
                    filter: filter.clone(),
                    min_scale: span.min_scale(),
                    max_scale: span.max_scale(),
                    zoom: span,
                    symbolizers: symbolizers.clone(),
                });
            }
        }
    }

    existing.insert(key, remaining);
    Ok(())
}

/// Group the rules starting at `rules[0]` by symbolizer instance, narrowing
/// `current` to the zoom levels every accepted property shares.
fn collect_symbolizers<'r>(
    rules: &'r [PropertyRule],
    current: &mut Zoom,
    ctx: &ResolveContext<'_>,
) -> Vec<Group<'r>> {
    let mut groups: Vec<Group<'r>> = Vec::new();
    for rule in rules {
        let Some(PropertyTarget::Symbolizer(kind)) = ctx.translator.property_target(&rule.name)
        else {
            continue;
        };
        if !current.intersects(rule.zoom()) {
            continue;
        }
        let slot = groups
            .iter()
            .position(|group| group.instance == rule.instance && group.kind == kind);
        match slot {
            Some(g) if groups[g].properties.iter().any(|p| p.name == rule.name) => continue,
            Some(g) => groups[g].properties.push(rule),
            None => groups.push(Group {
                instance: &rule.instance,
                kind,
                properties: vec![rule],
            }),
        }
        *current &= rule.zoom();
    }
    groups
}

/// Validate and construct the symbolizers of one slice, ordered by the
/// first declaration of each group.
fn create_symbolizers(mut groups: Vec<Group<'_>>, ctx: &ResolveContext<'_>) -> Result<Vec<Symbolizer>> {
    groups.sort_by_key(|group| group.properties.iter().map(|p| p.index).min().unwrap_or(u32::MAX));

    let mut symbolizers = Vec::with_capacity(groups.len());
    for group in groups {
        let Some(first) = group.properties.first() else {
            continue;
        };
        let mut values = Vec::with_capacity(group.properties.len());
        for rule in &group.properties {
            if !ctx.translator.is_property_valid(group.kind, &rule.name) {
                return Err(CartoError::UnknownProperty {
                    property: rule.name.clone(),
                    location: rule.location.clone(),
                });
            }
            values.push(PropertyValue {
                name: rule.name.clone(),
                value: ctx.value(rule)?,
                location: rule.location.clone(),
            });
        }

        if let Some(missing) = ctx.translator.missing_required(group.kind, &values) {
            return Err(CartoError::MissingProperty {
                property: missing.to_string(),
                symbolizer: group.kind.name().to_string(),
                location: first.location.clone(),
            });
        }

        let mut symbolizer = ctx
            .translator
            .to_symbolizer(group.kind, &values)
            .map_err(|e| located(e, &first.location))?;

        if let (Some(font_sets), Some(text)) = (ctx.font_sets, symbolizer.text_style_mut()) {
            if let Some(faces) = values
                .iter()
                .find(|value| ctx.translator.is_font_set_property(&value.name))
            {
                text.font_set = Some(font_sets.get_or_create(&faces.value).name);
            }
        }

        if symbolizer.is_enabled() {
            symbolizers.push(symbolizer);
        }
    }
    merge_polygon_outlines(&mut symbolizers);
    Ok(symbolizers)
}

/// Render a filter set with the translator; `None` for an empty set.
pub fn filter_expression(
    filters: &FilterSet,
    location: &SourceLocation,
    ctx: &ResolveContext<'_>,
) -> Result<Option<String>> {
    if filters.is_empty() {
        return Ok(None);
    }
    let parts = filters
        .iter()
        .map(|filter| {
            ctx.translator
                .to_filter(filter)
                .map(|expr| format!("({expr})"))
                .map_err(|e| located(e, filter.location().unwrap_or(location)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(parts.join(" and ")))
}
