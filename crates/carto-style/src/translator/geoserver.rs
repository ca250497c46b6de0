//! GeoServer translator
//!
//! Knows the GeoServer property vocabulary so stylesheets can be validated
//! against it, but cannot build SLD output yet.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use carto_css::FilterElement;

use super::table::{PropertyInfo, PropertyTable, optional, required};
use super::{PropertyValue, SymbolizerKind, TranslateError, Translator};
use crate::symbolizer::Symbolizer;

const STYLE_PROPERTIES: &[&str] = &["opacity", "comp-op", "filter-mode"];

const LINE: &[PropertyInfo] = &[
    optional("line-color"),
    optional("line-width"),
    optional("line-opacity"),
    optional("line-join"),
    optional("line-cap"),
    optional("line-dasharray"),
    optional("line-dash-offset"),
    optional("line-offset"),
];

const POLYGON: &[PropertyInfo] = &[
    optional("polygon-fill"),
    optional("polygon-opacity"),
];

const POINT: &[PropertyInfo] = &[
    optional("point-file"),
    optional("point-opacity"),
    optional("point-allow-overlap"),
];

const MARKER: &[PropertyInfo] = &[
    optional("marker-file"),
    optional("marker-fill"),
    optional("marker-width"),
    optional("marker-opacity"),
    optional("marker-line-color"),
    optional("marker-line-width"),
    optional("marker-type"),
];

const TEXT: &[PropertyInfo] = &[
    required("text-name"),
    required("text-face-name"),
    optional("text-size"),
    optional("text-fill"),
    optional("text-halo-fill"),
    optional("text-halo-radius"),
    optional("text-placement"),
    optional("text-dx"),
    optional("text-dy"),
];

const RASTER: &[PropertyInfo] = &[optional("raster-opacity")];

const SYMBOLIZERS: &[(SymbolizerKind, &[PropertyInfo])] = &[
    (SymbolizerKind::Line, LINE),
    (SymbolizerKind::Polygon, POLYGON),
    (SymbolizerKind::Point, POINT),
    (SymbolizerKind::Marker, MARKER),
    (SymbolizerKind::Text, TEXT),
    (SymbolizerKind::Raster, RASTER),
];

static PROPERTIES: OnceLock<PropertyTable> = OnceLock::new();

#[derive(Debug, Clone, Copy)]
pub struct GeoServerTranslator;

impl GeoServerTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GeoServerTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for GeoServerTranslator {
    fn name(&self) -> &'static str {
        "geoserver"
    }

    fn properties(&self) -> &PropertyTable {
        PROPERTIES.get_or_init(|| PropertyTable::build(STYLE_PROPERTIES, SYMBOLIZERS))
    }

    fn to_symbolizer(
        &self,
        _kind: SymbolizerKind,
        _properties: &[PropertyValue],
    ) -> Result<Symbolizer, TranslateError> {
        Err(TranslateError::NotImplemented("GeoServer symbolizers"))
    }

    fn to_filter(&self, _filter: &FilterElement) -> Result<String, TranslateError> {
        Err(TranslateError::NotImplemented("GeoServer filters"))
    }

    fn to_image_filters(&self, _value: &str) -> Result<Vec<String>, TranslateError> {
        Err(TranslateError::NotImplemented("GeoServer image filters"))
    }

    fn to_datasource_parameters(
        &self,
        _datasource: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, TranslateError> {
        Err(TranslateError::NotImplemented("GeoServer datasources"))
    }

    fn to_coordinate_system(&self, _srs: &str) -> Result<String, TranslateError> {
        Err(TranslateError::NotImplemented("GeoServer coordinate systems"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::PropertyTarget;

    #[test]
    fn test_vocabulary() {
        let t = GeoServerTranslator::new();
        assert_eq!(
            t.property_target("line-width"),
            Some(PropertyTarget::Symbolizer(SymbolizerKind::Line))
        );
        assert_eq!(t.property_target("building-height"), None);
        assert!(!t.properties().is_empty());
    }

    #[test]
    fn test_symbolizers_not_implemented() {
        let t = GeoServerTranslator::new();
        assert_eq!(
            t.to_symbolizer(SymbolizerKind::Line, &[]),
            Err(TranslateError::NotImplemented("GeoServer symbolizers"))
        );
    }
}
