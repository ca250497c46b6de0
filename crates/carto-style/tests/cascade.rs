//! End-to-end cascade tests for carto-style

use std::collections::HashSet;

use carto_css::{
    DEFAULT_ATTACHMENT, Definition, Env, applicable_to, compile_stylesheet, scale_denominator,
};
use carto_style::{
    FeatureStyle, FilterMode, MapnikTranslator, ResolveContext, Style, Symbolizer, ValueCache,
    build_layer_styles, inherit_definitions,
};

fn styles_for(css: &str, layer: &str, classes: &[&str]) -> Vec<FeatureStyle> {
    let (env, definitions) = compile_stylesheet("project.mss", css).unwrap();
    let translator = MapnikTranslator::new();
    let values = ValueCache::new();
    let ctx = ResolveContext::new(&env, &translator, &values);
    let classes: HashSet<&str> = classes.iter().copied().collect();
    let matching = applicable_to(&definitions, layer, &classes);
    build_layer_styles(layer, &matching, &ctx).unwrap()
}

fn definitions(css: &str) -> (Env, Vec<Definition>) {
    compile_stylesheet("project.mss", css).unwrap()
}

// ============================================================================
// INHERITANCE
// ============================================================================

#[test]
fn test_inheritance_keeps_declarations_unique() {
    let (env, defs) = definitions(".a { x: 1; } .a.b { x: 1; y: 2; }");
    let refs: Vec<&Definition> = defs.iter().collect();
    let styles = inherit_definitions(&refs, &env).unwrap();

    let specific = &styles[0].definitions[0];
    let names: Vec<&str> = specific.rules().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y"]);
}

#[test]
fn test_contradicting_filters_produce_no_combination() {
    let (env, defs) = definitions("#r[a=1] { x: 1; } #r[a=2] { y: 2; }");
    let refs: Vec<&Definition> = defs.iter().collect();
    let styles = inherit_definitions(&refs, &env).unwrap();
    let filters: Vec<String> = styles[0]
        .definitions
        .iter()
        .map(|d| d.filters.to_string())
        .collect();
    assert_eq!(filters.len(), 2);
    assert!(!filters.iter().any(|f| f.contains("[a]=1") && f.contains("[a]=2")));
}

// ============================================================================
// FOLDING
// ============================================================================

fn style_of(css: &str) -> Style {
    let (_, defs) = definitions(css);
    let mut style = Style::new(DEFAULT_ATTACHMENT);
    // keep declaration order
    let mut defs = defs;
    defs.sort_by_key(|d| d.specificity.index);
    for definition in defs {
        style.push(definition);
    }
    style
}

#[test]
fn test_fold_under_first_match() {
    let css = "#p { x: 1; } #p[a=1] { x: 2; } #p[a=1][b=2] { x: 3; }";

    // the unfiltered definition leads, and every later filter set implies it
    let mut first = style_of(css);
    assert_eq!(first.fold(FilterMode::First), 2);
    let filters: Vec<String> = first.definitions.iter().map(|d| d.filters.to_string()).collect();
    assert_eq!(filters, vec![""]);

    let mut all = style_of(css);
    assert_eq!(all.fold(FilterMode::All), 0);
    let filters: Vec<String> = all.definitions.iter().map(|d| d.filters.to_string()).collect();
    assert_eq!(filters, vec!["", "[a]=1", "[a]=1 [b]=2"]);
}

#[test]
fn test_fold_keeps_disjoint_branches() {
    let mut style = style_of("#p[a=1] { x: 1; } #p[a=2] { x: 2; } #p[a=1][b=2] { x: 3; }");
    assert_eq!(style.fold(FilterMode::First), 1);
    let filters: Vec<String> = style.definitions.iter().map(|d| d.filters.to_string()).collect();
    assert_eq!(filters, vec!["[a]=1", "[a]=2"]);
}

// ============================================================================
// END TO END
// ============================================================================

#[test]
fn test_roads_zoom_split() {
    let styles = styles_for(
        "Map { background-color: #fff; }
         #roads { line-color: #000; line-width: 1; }
         #roads[zoom>=10] { line-width: 2; }",
        "roads",
        &[],
    );
    assert_eq!(styles.len(), 1);
    let rules = &styles[0].rules;
    assert_eq!(rules.len(), 2);

    let spans: Vec<(u8, u8)> = rules.iter().map(|r| (r.zoom.start, r.zoom.end)).collect();
    assert_eq!(spans, vec![(10, 22), (0, 9)]);
    assert_eq!(rules[1].min_scale, Some(scale_denominator(10)));

    for (rule, width) in rules.iter().zip([2.0, 1.0]) {
        assert!(rule.filter.is_none());
        assert_eq!(rule.symbolizers.len(), 1);
        match &rule.symbolizers[0] {
            Symbolizer::Line(line) => assert_eq!(line.stroke.width, width),
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
fn test_class_and_wildcard_matching() {
    let css = ".highway { line-width: 2; } * { marker-width: 4; }";
    let with_class = styles_for(css, "roads", &["highway", "major"]);
    let without = styles_for(css, "roads", &["rail"]);

    let kinds = |styles: &[FeatureStyle]| -> usize {
        styles
            .iter()
            .flat_map(|s| &s.rules)
            .map(|r| r.symbolizers.len())
            .sum()
    };
    assert_eq!(kinds(&with_class[..]), 2);
    assert_eq!(kinds(&without[..]), 1);
}

#[test]
fn test_variables_resolve_in_filters_and_values() {
    let styles = styles_for(
        "@kind: 'primary'; @w: 3;
         #roads[type=@kind] { line-width: @w; }",
        "roads",
        &[],
    );
    let rule = &styles[0].rules[0];
    assert_eq!(rule.filter.as_deref(), Some("([type] = 'primary')"));
    match &rule.symbolizers[0] {
        Symbolizer::Line(line) => assert_eq!(line.stroke.width, 3.0),
        other => panic!("unexpected {other:?}"),
    }
}
