//! Parser tests for carto-css
//!
//! Covers the stylesheet grammar: variables, nesting, selector parts,
//! declarations and located syntax errors.

use carto_css::{
    CartoError, CartoParser, ElementKind, Env, FilterOp, SelectorPart, Value, parse_stylesheet,
};

// ============================================================================
// STRUCTURE
// ============================================================================

#[test]
fn test_parse_empty() {
    let sheet = parse_stylesheet("empty.mss", "  \n /* nothing */ \n").unwrap();
    assert!(sheet.rulesets.is_empty());
    assert!(sheet.variables.is_empty());
}

#[test]
fn test_parse_variables() {
    let css = "@water: #b5d0d0;\n@width: 2;\n#lakes { polygon-fill: @water; }";
    let sheet = parse_stylesheet("vars.mss", css).unwrap();
    assert_eq!(sheet.variables.len(), 2);
    assert_eq!(sheet.variables[0].name, "water");

    let mut env = Env::new();
    sheet.define_variables(&mut env);
    let rule = &sheet.rulesets[0].rules[0];
    assert_eq!(rule.value.value, Value::Variable("water".into()));
    assert_eq!(env.evaluate(&rule.value).unwrap(), "#b5d0d0");
}

#[test]
fn test_parse_nested_rulesets() {
    let css = r#"
#roads {
  line-color: #000;
  [type='major'] { line-width: 3; }
  ::casing { line-width: 5; }
}
"#;
    let sheet = parse_stylesheet("nested.mss", css).unwrap();
    let roads = &sheet.rulesets[0];
    assert_eq!(roads.rules.len(), 1);
    assert_eq!(roads.children.len(), 2);
    assert!(matches!(
        roads.children[1].selectors[0].parts[0],
        SelectorPart::Attachment(ref name) if name == "casing"
    ));
}

#[test]
fn test_nested_variables_are_hoisted() {
    let css = "#a { @w: 4; line-width: @w; }";
    let sheet = parse_stylesheet("hoist.mss", css).unwrap();
    assert_eq!(sheet.variables.len(), 1);
    assert_eq!(sheet.rulesets[0].rules.len(), 1);
}

// ============================================================================
// SELECTORS
// ============================================================================

#[test]
fn test_parse_selector_elements() {
    let css = "#roads.major.bridge, *, Map { line-width: 1; }";
    let sheet = parse_stylesheet("sel.mss", css).unwrap();
    let selectors = &sheet.rulesets[0].selectors;
    assert_eq!(selectors.len(), 3);

    let kinds: Vec<ElementKind> = selectors[0]
        .parts
        .iter()
        .filter_map(|part| match part {
            SelectorPart::Element(element) => Some(element.kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![ElementKind::Id, ElementKind::Class, ElementKind::Class]);
    assert!(matches!(&selectors[1].parts[0], SelectorPart::Element(e) if e.kind == ElementKind::Wildcard));
    assert!(matches!(&selectors[2].parts[0], SelectorPart::Element(e) if e.value == "Map"));
}

#[test]
fn test_parse_filters() {
    let css = "#a[type='primary'][lanes>=2][name=~'^A'][pop % 2][x != 3] { line-width: 1; }";
    let sheet = parse_stylesheet("filters.mss", css).unwrap();
    let ops: Vec<(String, FilterOp)> = sheet.rulesets[0].selectors[0]
        .parts
        .iter()
        .filter_map(|part| match part {
            SelectorPart::Filter { key, op, .. } => Some((key.clone(), *op)),
            _ => None,
        })
        .collect();
    assert_eq!(
        ops,
        vec![
            ("type".to_string(), FilterOp::Eq),
            ("lanes".to_string(), FilterOp::Ge),
            ("name".to_string(), FilterOp::Match),
            ("pop".to_string(), FilterOp::Mod),
            ("x".to_string(), FilterOp::Ne),
        ]
    );
}

#[test]
fn test_parse_quoted_and_namespaced_keys() {
    let css = "#a['mapnik::geometry_type'=2], #b[mapnik::geometry_type=3] { line-width: 1; }";
    let sheet = parse_stylesheet("keys.mss", css).unwrap();
    for selector in &sheet.rulesets[0].selectors {
        let key = selector.parts.iter().find_map(|part| match part {
            SelectorPart::Filter { key, .. } => Some(key.clone()),
            _ => None,
        });
        assert_eq!(key.as_deref(), Some("mapnik::geometry_type"));
    }
}

#[test]
fn test_parse_zoom_filter() {
    let css = "#a[zoom >= 10][zoom<=@maxz] { line-width: 1; }";
    let sheet = parse_stylesheet("zoom.mss", css).unwrap();
    let zooms = sheet.rulesets[0].selectors[0]
        .parts
        .iter()
        .filter(|part| matches!(part, SelectorPart::Zoom { .. }))
        .count();
    assert_eq!(zooms, 2);
}

// ============================================================================
// DECLARATIONS AND VALUES
// ============================================================================

#[test]
fn test_parse_instance_prefix() {
    let css = "#a { casing/line-width: 5; line-width: 3 }";
    let sheet = parse_stylesheet("inst.mss", css).unwrap();
    let rules = &sheet.rulesets[0].rules;
    assert_eq!(rules[0].instance, "casing");
    assert_eq!(rules[0].name, "line-width");
    assert_eq!(rules[1].instance, "__default__");
}

#[test]
fn test_parse_values() {
    let css = r#"#a {
  text-face-name: "DejaVu Sans Book", "Unifont Medium";
  text-name: [name] + " " + [ref];
  line-dasharray: 4, 2;
  point-file: url('icons/shop.png');
  image-filters: agg-stack-blur(2, 2);
  text-size: 12px;
  opacity: 50%;
}"#;
    let sheet = parse_stylesheet("values.mss", css).unwrap();
    let env = Env::new();
    let rendered: Vec<String> = sheet.rulesets[0]
        .rules
        .iter()
        .map(|rule| env.evaluate(&rule.value).unwrap())
        .collect();
    assert_eq!(
        rendered,
        vec![
            "\"DejaVu Sans Book\", \"Unifont Medium\"",
            "[name] + \" \" + [ref]",
            "4, 2",
            "icons/shop.png",
            "agg-stack-blur(2, 2)",
            "12px",
            "50%",
        ]
    );
}

#[test]
fn test_indexes_follow_source_order() {
    let css = "#a { b: 1; c: 2; } #d { e: 3; }";
    let mut parser = CartoParser::new("idx.mss").with_index_base(100);
    let sheet = parser.parse(css).unwrap();
    assert_eq!(sheet.rulesets[0].selectors[0].index, 100);
    assert_eq!(sheet.rulesets[0].rules[0].index, 101);
    assert_eq!(sheet.rulesets[0].rules[1].index, 102);
    assert_eq!(sheet.rulesets[1].selectors[0].index, 103);
    assert_eq!(parser.next_index(), 105);
    assert_eq!(sheet.index_span(), 5);
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn test_missing_colon_is_located() {
    let css = "#a {\n  line-width: 1;\n  line-color #fff;\n}";
    let err = parse_stylesheet("bad.mss", css).unwrap_err();
    assert!(matches!(err, CartoError::Parse { .. }));
    let location = err.location().unwrap();
    assert_eq!(&*location.file, "bad.mss");
    assert_eq!(location.line, 3);
}

#[test]
fn test_declaration_outside_ruleset() {
    let err = parse_stylesheet("top.mss", "line-width: 2;").unwrap_err();
    assert!(err.to_string().contains("outside of a ruleset"));
}

#[test]
fn test_filter_without_operator() {
    let err = parse_stylesheet("f.mss", "#a[type] { line-width: 1; }").unwrap_err();
    assert!(err.to_string().contains("operator"));
}
