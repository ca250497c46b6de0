//! Project compilation tests for carto-engine

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use carto_engine::{CompiledMap, EngineConfig, MapLayer, MapProcessor, Project};
use carto_style::Symbolizer;

const GOOD: &str = r#"
@road: #333;

Map { background-color: #b8dee6; buffer-size: 256; }

#roads { line-width: 2; line-color: @road; }
#broken { frobnicate: 1; }
.label { text-name: [name]; text-face-name: 'DejaVu Sans Book'; }
"#;

const BAD: &str = "#roads {\n  line-color #fff;\n}";

const PROJECT: &str = r#"{
    "name": "test map",
    "srs": "+init=epsg:3857",
    "interactivity": {"layer": "places", "fields": "name"},
    "Stylesheet": ["good.mss", "bad.mss", "missing.mss"],
    "Layer": [
        {"id": "roads", "Datasource": {"file": "roads.shp"}},
        {"id": "broken", "Datasource": {"type": "weird", "file": "x"}},
        {"id": "group", "layers": [
            {"id": "places", "class": "label", "properties": {"minzoom": 10}}
        ]}
    ]
}"#;

const YAML_PROJECT: &str = r#"
name: test map
srs: "+init=epsg:3857"
interactivity:
  layer: places
  fields: name
Stylesheet:
  - good.mss
  - bad.mss
  - missing.mss
Layer:
  - id: roads
    Datasource:
      file: roads.shp
  - id: broken
    Datasource:
      type: weird
      file: x
  - id: group
    layers:
      - id: places
        class: label
        properties:
          minzoom: 10
"#;

struct TempProject {
    dir: PathBuf,
}

impl TempProject {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("carto-engine-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("project.mml"), PROJECT).unwrap();
        fs::write(dir.join("project.yml"), YAML_PROJECT).unwrap();
        fs::write(dir.join("good.mss"), GOOD).unwrap();
        fs::write(dir.join("bad.mss"), BAD).unwrap();
        Self { dir }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("project.mml")
    }

    fn yaml_path(&self) -> PathBuf {
        self.dir.join("project.yml")
    }
}

impl Drop for TempProject {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn processor() -> MapProcessor {
    MapProcessor::new(EngineConfig::new().with_threads(2))
}

type LayerSummary = (String, usize, usize, bool, Option<String>);

fn summary(map: &CompiledMap) -> Vec<LayerSummary> {
    fn walk(layers: &[MapLayer], out: &mut Vec<LayerSummary>) {
        for layer in layers {
            let rules = layer.styles.iter().map(|s| s.rules.len()).sum();
            out.push((
                layer.name.clone(),
                layer.styles.len(),
                rules,
                layer.enabled,
                layer.error.clone(),
            ));
            walk(&layer.children, out);
        }
    }
    let mut out = Vec::new();
    walk(&map.layers, &mut out);
    out
}

// ============================================================================
// FAILURE ISOLATION
// ============================================================================

#[test]
fn test_bad_stylesheets_are_skipped() {
    let project = TempProject::new("skip");
    let map = processor().compile_file(&project.path()).unwrap();

    let roads = map.layer("roads").unwrap();
    assert!(roads.error.is_none());
    assert_eq!(roads.styles.len(), 1);
    let rules = &roads.styles[0].rules;
    assert_eq!(rules.len(), 1);
    assert!(matches!(rules[0].symbolizers[0], Symbolizer::Line(_)));
}

#[test]
fn test_failing_layer_does_not_stop_others() {
    let project = TempProject::new("isolate");
    let map = processor().compile_file(&project.path()).unwrap();

    let broken = map.layer("broken").unwrap();
    assert!(broken.styles.is_empty());
    let error = broken.error.as_deref().unwrap();
    assert!(error.contains("broken"));
    assert!(error.contains("frobnicate"));

    assert!(map.layer("roads").unwrap().error.is_none());
    assert!(map.layer("places").unwrap().error.is_none());
}

#[test]
fn test_missing_project_file() {
    let err = processor()
        .compile_file(Path::new("/nonexistent/project.mml"))
        .unwrap_err();
    assert!(err.to_string().contains("project.mml"));
}

// ============================================================================
// LAYERS
// ============================================================================

#[test]
fn test_groups_keep_their_members() {
    let project = TempProject::new("groups");
    let map = processor().compile_file(&project.path()).unwrap();

    let names: Vec<&str> = map.layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["roads", "broken", "group"]);

    let group = &map.layers[2];
    assert!(group.styles.is_empty());
    assert_eq!(group.children.len(), 1);

    let places = &group.children[0];
    assert_eq!(places.min_zoom, Some(10));
    assert_eq!(places.styles.len(), 1);
    assert!(matches!(places.styles[0].rules[0].symbolizers[0], Symbolizer::Text(_)));
}

#[test]
fn test_datasources_and_srs() {
    let project = TempProject::new("datasource");
    let map = processor().compile_file(&project.path()).unwrap();

    assert_eq!(map.srs.as_deref(), Some("EPSG:3857"));

    let roads = map.layer("roads").unwrap();
    assert_eq!(roads.datasource.get("encoding").map(String::as_str), Some("utf-8"));

    // unknown datasource types are kept as written
    let broken = map.layer("broken").unwrap();
    assert_eq!(broken.datasource.get("type").map(String::as_str), Some("weird"));
}

#[test]
fn test_interactivity_layer_is_disabled() {
    let project = TempProject::new("interactivity");
    let map = processor().compile_file(&project.path()).unwrap();

    let places = map.layer("places").unwrap();
    assert!(!places.enabled);
    assert_eq!(places.styles.len(), 1);
    assert!(map.layer("roads").unwrap().enabled);
    assert!(map.layer("group").unwrap().enabled);
}

#[test]
fn test_yaml_project_compiles_like_json() {
    let project = TempProject::new("yaml");
    let json = processor().compile_file(&project.path()).unwrap();
    let yaml = processor().compile_file(&project.yaml_path()).unwrap();

    assert_eq!(yaml.name, json.name);
    assert_eq!(yaml.srs, json.srs);
    assert_eq!(summary(&yaml), summary(&json));
    assert_eq!(
        yaml.layer("roads").unwrap().datasource,
        json.layer("roads").unwrap().datasource
    );
    assert!(!yaml.layer("places").unwrap().enabled);
}

// ============================================================================
// MAP
// ============================================================================

#[test]
fn test_map_properties_and_font_sets() {
    let project = TempProject::new("map");
    let map = processor().compile_file(&project.path()).unwrap();

    assert_eq!(map.name, "test map");
    assert!(map.properties.background_color().is_some());
    assert_eq!(map.properties.buffer_size(), Some(256));
    assert_eq!(map.font_sets.len(), 1);
    assert_eq!(map.font_sets[0].faces, vec!["DejaVu Sans Book".to_string()]);
}

#[test]
fn test_inline_stylesheets() {
    let project = Project::from_json(
        r##"{
            "Stylesheet": [{"id": "style.mss", "data": "#water { polygon-fill: #0af; }"}],
            "Layer": [{"id": "water"}]
        }"##,
    )
    .unwrap();
    let map = processor().compile(&project, Path::new("."));
    let water = map.layer("water").unwrap();
    assert_eq!(water.styles.len(), 1);
    assert!(matches!(water.styles[0].rules[0].symbolizers[0], Symbolizer::Polygon(_)));
}

#[test]
fn test_progress_reports_every_layer() {
    let project = TempProject::new("progress");
    let parsed = Project::load(&project.path()).unwrap();
    let calls = Mutex::new(Vec::new());

    processor().compile_with_progress(&parsed, &project.dir, |done, total| {
        calls.lock().unwrap().push((done, total));
    });

    let calls = calls.into_inner().unwrap();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls.last(), Some(&(4, 4)));
}

#[test]
fn test_single_thread_matches_parallel() {
    let project = TempProject::new("threads");
    let parsed = Project::load(&project.path()).unwrap();

    let serial = MapProcessor::new(EngineConfig::new().with_threads(1)).compile(&parsed, &project.dir);
    let parallel = MapProcessor::new(EngineConfig::new().with_threads(4)).compile(&parsed, &project.dir);

    assert_eq!(summary(&serial), summary(&parallel));
}
