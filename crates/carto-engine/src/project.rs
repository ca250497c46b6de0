//! Project descriptor
//!
//! The project format used by TileMill (`project.mml`, JSON) and Kosmtik
//! (`project.yml`, YAML): map metadata, the stylesheets to load, and the
//! layer list.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attribution: Option<String>,
    #[serde(default)]
    pub bounds: Option<Vec<f64>>,
    #[serde(default)]
    pub center: Option<Vec<f64>>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub minzoom: Option<u8>,
    #[serde(default)]
    pub maxzoom: Option<u8>,
    #[serde(default)]
    pub srs: Option<String>,
    /// TileMill interactivity settings, or `false`.
    #[serde(default)]
    pub interactivity: Option<JsonValue>,
    #[serde(rename = "Stylesheet", default)]
    pub stylesheets: Vec<StylesheetSource>,
    #[serde(rename = "Layer", default)]
    pub layers: Vec<LayerSpec>,
}

impl Project {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a project file; `.yml` and `.yaml` files are YAML, anything else
    /// is JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
        if yaml {
            Self::from_yaml(&text)
        } else {
            Self::from_json(&text)
        }
    }

    /// Layer that serves interactivity; it is compiled but not drawn.
    pub fn interactivity_layer(&self) -> Option<&str> {
        self.interactivity
            .as_ref()
            .and_then(|settings| settings.get("layer"))
            .and_then(JsonValue::as_str)
            .filter(|layer| !layer.is_empty())
    }

    /// Number of layers including the members of groups.
    pub fn layer_count(&self) -> usize {
        fn count(layers: &[LayerSpec]) -> usize {
            layers.iter().map(|l| 1 + count(&l.layers)).sum()
        }
        count(&self.layers)
    }
}

/// A stylesheet reference: a path, or inline source as TileMill stores it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StylesheetSource {
    Path(String),
    Inline { id: String, data: String },
}

impl StylesheetSource {
    /// File name used in diagnostics.
    pub fn name(&self) -> &str {
        match self {
            StylesheetSource::Path(path) => path,
            StylesheetSource::Inline { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerProperties {
    #[serde(default)]
    pub minzoom: Option<u8>,
    #[serde(default)]
    pub maxzoom: Option<u8>,
    #[serde(rename = "group-by", default)]
    pub group_by: Option<String>,
    #[serde(rename = "buffer-size", default)]
    pub buffer_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Space separated class names.
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub srs: Option<String>,
    #[serde(default)]
    pub geometry: Option<String>,
    /// `off` disables the layer.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub properties: LayerProperties,
    #[serde(rename = "Datasource", default)]
    pub datasource: BTreeMap<String, JsonValue>,
    /// Members of a group layer.
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

impl LayerSpec {
    /// Name selectors match against: `name` when present, else `id`.
    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.id)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class.split_whitespace()
    }

    pub fn is_group(&self) -> bool {
        !self.layers.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        !self
            .status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("off"))
    }

    /// Datasource parameters as strings.
    pub fn datasource_parameters(&self) -> BTreeMap<String, String> {
        self.datasource
            .iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    JsonValue::String(s) => s.clone(),
                    JsonValue::Number(n) => n.to_string(),
                    JsonValue::Bool(b) => b.to_string(),
                    JsonValue::Null => return None,
                    other => other.to_string(),
                };
                Some((key.clone(), value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r##"{
        "name": "osm",
        "minzoom": 0,
        "maxzoom": 18,
        "srs": "+init=epsg:3857",
        "Stylesheet": ["style.mss", {"id": "inline.mss", "data": "#a { line-width: 1; }"}],
        "Layer": [
            {
                "id": "roads",
                "class": "highway  major",
                "geometry": "linestring",
                "properties": {"minzoom": 5, "group-by": "layer"},
                "Datasource": {"file": "roads.shp", "id": 7, "extent": null}
            },
            {
                "id": "labels",
                "name": "labels",
                "status": "off",
                "layers": [{"id": "city-labels"}, {"id": "town-labels"}]
            }
        ]
    }"##;

    #[test]
    fn test_parse_project() {
        let project = Project::from_json(PROJECT).unwrap();
        assert_eq!(project.name, "osm");
        assert_eq!(project.maxzoom, Some(18));
        assert_eq!(project.stylesheets.len(), 2);
        assert_eq!(project.stylesheets[0], StylesheetSource::Path("style.mss".into()));
        assert_eq!(project.stylesheets[1].name(), "inline.mss");
        assert_eq!(project.layer_count(), 4);

        let roads = &project.layers[0];
        assert_eq!(roads.name(), "roads");
        assert_eq!(roads.classes().collect::<Vec<_>>(), vec!["highway", "major"]);
        assert_eq!(roads.properties.minzoom, Some(5));
        assert_eq!(roads.properties.group_by.as_deref(), Some("layer"));
        let params = roads.datasource_parameters();
        assert_eq!(params["file"], "roads.shp");
        assert_eq!(params["id"], "7");
        assert!(!params.contains_key("extent"));

        let labels = &project.layers[1];
        assert!(labels.is_group());
        assert!(!labels.is_enabled());
    }

    const YAML_PROJECT: &str = r##"
name: osm
minzoom: 0
maxzoom: 18
srs: "+init=epsg:3857"
Stylesheet:
  - style.mss
  - id: inline.mss
    data: "#a { line-width: 1; }"
Layer:
  - id: roads
    class: highway  major
    geometry: linestring
    properties:
      minzoom: 5
      group-by: layer
    Datasource:
      file: roads.shp
      id: 7
      extent: null
  - id: labels
    name: labels
    status: "off"
    layers:
      - id: city-labels
      - id: town-labels
"##;

    #[test]
    fn test_yaml_matches_json() {
        let json = Project::from_json(PROJECT).unwrap();
        let yaml = Project::from_yaml(YAML_PROJECT).unwrap();
        assert_eq!(yaml.name, json.name);
        assert_eq!(yaml.srs, json.srs);
        assert_eq!(yaml.stylesheets, json.stylesheets);
        assert_eq!(yaml.layer_count(), json.layer_count());
        assert_eq!(
            yaml.layers[0].datasource_parameters(),
            json.layers[0].datasource_parameters()
        );
        assert_eq!(yaml.layers[0].properties.minzoom, Some(5));
        assert!(!yaml.layers[1].is_enabled());
    }

    #[test]
    fn test_interactivity_layer() {
        let project = Project::from_json(r#"{"interactivity": {"layer": "countries", "fields": "name"}}"#).unwrap();
        assert_eq!(project.interactivity_layer(), Some("countries"));
        let project = Project::from_json(r#"{"interactivity": false}"#).unwrap();
        assert_eq!(project.interactivity_layer(), None);
        let project = Project::from_json("{}").unwrap();
        assert_eq!(project.interactivity_layer(), None);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Project::from_yaml("Layer: [unclosed"),
            Err(EngineError::Yaml(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Project::from_json("{ not json"),
            Err(EngineError::Project(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Project::load(Path::new("/nonexistent/project.mml")).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
