//! Renderer translators
//!
//! A translator knows which properties a target renderer supports and turns
//! validated property groups, filters and layer settings into that renderer's
//! vocabulary.

pub mod geoserver;
pub mod mapnik;
mod table;

use std::collections::BTreeMap;

use carto_css::{FilterElement, SourceLocation};
use thiserror::Error;

use crate::symbolizer::{CompositingMode, Symbolizer};

pub use geoserver::GeoServerTranslator;
pub use mapnik::MapnikTranslator;
pub use table::{PropertyInfo, PropertyTable, optional, required};

/// Closed set of symbolizer kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolizerKind {
    Line,
    LinePattern,
    Polygon,
    PolygonPattern,
    Point,
    Marker,
    Text,
    Shield,
    Raster,
    Building,
}

impl SymbolizerKind {
    pub fn name(self) -> &'static str {
        match self {
            SymbolizerKind::Line => "line",
            SymbolizerKind::LinePattern => "line-pattern",
            SymbolizerKind::Polygon => "polygon",
            SymbolizerKind::PolygonPattern => "polygon-pattern",
            SymbolizerKind::Point => "point",
            SymbolizerKind::Marker => "marker",
            SymbolizerKind::Text => "text",
            SymbolizerKind::Shield => "shield",
            SymbolizerKind::Raster => "raster",
            SymbolizerKind::Building => "building",
        }
    }
}

/// What a property configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyTarget {
    /// The feature style itself (`opacity`, `comp-op`, `filter-mode`...).
    Style,
    Symbolizer(SymbolizerKind),
}

/// An evaluated property handed to a translator.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub name: String,
    pub value: String,
    pub location: SourceLocation,
}

/// Translator failure, located by the caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslateError {
    #[error("invalid value '{value}' for '{property}': {reason}")]
    InvalidValue {
        property: String,
        value: String,
        reason: String,
    },

    #[error("unknown datasource type '{0}'")]
    UnknownDatasource(String),

    #[error("operation '{0}' is not implemented")]
    NotImplemented(&'static str),
}

impl TranslateError {
    pub fn invalid(property: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            property: property.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Contract between the compiler and a target renderer.
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    fn properties(&self) -> &PropertyTable;

    /// Symbolizer (or style) a property belongs to, `None` when unknown.
    fn property_target(&self, property: &str) -> Option<PropertyTarget> {
        self.properties().target(property)
    }

    fn is_property_valid(&self, kind: SymbolizerKind, property: &str) -> bool {
        self.properties().is_valid(kind, property)
    }

    fn missing_required(
        &self,
        kind: SymbolizerKind,
        properties: &[PropertyValue],
    ) -> Option<&'static str> {
        self.properties().missing_required(kind, properties)
    }

    /// Properties whose values name fonts.
    fn is_font_set_property(&self, property: &str) -> bool {
        matches!(property, "text-face-name" | "shield-face-name")
    }

    fn to_symbolizer(
        &self,
        kind: SymbolizerKind,
        properties: &[PropertyValue],
    ) -> Result<Symbolizer, TranslateError>;

    /// Render one filter as a renderer expression.
    fn to_filter(&self, filter: &FilterElement) -> Result<String, TranslateError>;

    /// Map an `image-filters` value to renderer filter names.
    fn to_image_filters(&self, value: &str) -> Result<Vec<String>, TranslateError>;

    fn to_compositing_mode(&self, value: &str) -> Result<CompositingMode, TranslateError> {
        CompositingMode::from_name(unquote(value))
            .ok_or_else(|| TranslateError::invalid("comp-op", value, "unknown compositing operation"))
    }

    fn to_datasource_parameters(
        &self,
        datasource: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, TranslateError>;

    fn to_coordinate_system(&self, srs: &str) -> Result<String, TranslateError>;
}

/// Pick the translator for a renderer name; unknown names get Mapnik.
pub fn create_translator(renderer: &str) -> Box<dyn Translator> {
    match renderer.to_ascii_lowercase().as_str() {
        "geoserver" => Box::new(GeoServerTranslator::new()),
        "mapnik" | "tilemill" | "kosmtik" => Box::new(MapnikTranslator::new()),
        other => {
            tracing::debug!("Unknown renderer '{}', using mapnik", other);
            Box::new(MapnikTranslator::new())
        }
    }
}

/// Datasource type implied by a file name.
pub fn infer_datasource_type(file: &str) -> &'static str {
    let extension = file
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "json" | "geojson" | "topojson" => "geojson",
        "shp" => "shape",
        "csv" | "kml" => "ogr",
        "tif" | "tiff" | "vrt" => "gdal",
        _ => "shape",
    }
}

/// Strip one level of surrounding quotes.
pub fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Split a comma separated value, ignoring commas inside parentheses.
pub fn split_top_level(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = value[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}
