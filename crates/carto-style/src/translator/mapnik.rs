//! Mapnik translator
//!
//! Complete translator for Mapnik-style renderers (also used for TileMill
//! and Kosmtik projects).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use carto_css::{FilterElement, FilterOp};

use super::table::{PropertyInfo, PropertyTable, optional, required};
use super::{
    PropertyValue, SymbolizerKind, TranslateError, Translator, infer_datasource_type,
    split_top_level, unquote,
};
use crate::symbolizer::{
    BuildingSymbolizer, Color, Common, LabelPlacement, LineCap, LineJoin, LinePatternSymbolizer,
    LineSymbolizer, MarkerPlacement, MarkerShape, MarkerSymbolizer, PatternAlignment,
    PointPlacement, PointSymbolizer, PolygonPatternSymbolizer, PolygonSymbolizer,
    RasterSymbolizer, ShieldSymbolizer, Stroke, Symbolizer, TextStyle, TextSymbolizer,
    TextTransform,
};

const STYLE_PROPERTIES: &[&str] = &[
    "image-filters",
    "image-filters-inflate",
    "direct-image-filters",
    "comp-op",
    "opacity",
    "filter-mode",
];

const LINE: &[PropertyInfo] = &[
    optional("line-color"),
    optional("line-width"),
    optional("line-opacity"),
    optional("line-join"),
    optional("line-cap"),
    optional("line-gamma"),
    optional("line-gamma-method"),
    optional("line-dasharray"),
    optional("line-dash-offset"),
    optional("line-miterlimit"),
    optional("line-clip"),
    optional("line-simplify"),
    optional("line-simplify-algorithm"),
    optional("line-smooth"),
    optional("line-offset"),
    optional("line-rasterizer"),
    optional("line-geometry-transform"),
    optional("line-comp-op"),
];

const LINE_PATTERN: &[PropertyInfo] = &[
    required("line-pattern-file"),
    optional("line-pattern-opacity"),
    optional("line-pattern-clip"),
    optional("line-pattern-simplify"),
    optional("line-pattern-simplify-algorithm"),
    optional("line-pattern-smooth"),
    optional("line-pattern-offset"),
    optional("line-pattern-geometry-transform"),
    optional("line-pattern-comp-op"),
];

const POLYGON: &[PropertyInfo] = &[
    optional("polygon-fill"),
    optional("polygon-opacity"),
    optional("polygon-gamma"),
    optional("polygon-gamma-method"),
    optional("polygon-clip"),
    optional("polygon-simplify"),
    optional("polygon-simplify-algorithm"),
    optional("polygon-smooth"),
    optional("polygon-offset"),
    optional("polygon-geometry-transform"),
    optional("polygon-comp-op"),
];

const POLYGON_PATTERN: &[PropertyInfo] = &[
    required("polygon-pattern-file"),
    optional("polygon-pattern-alignment"),
    optional("polygon-pattern-gamma"),
    optional("polygon-pattern-opacity"),
    optional("polygon-pattern-clip"),
    optional("polygon-pattern-simplify"),
    optional("polygon-pattern-simplify-algorithm"),
    optional("polygon-pattern-smooth"),
    optional("polygon-pattern-offset"),
    optional("polygon-pattern-geometry-transform"),
    optional("polygon-pattern-comp-op"),
];

const POINT: &[PropertyInfo] = &[
    optional("point-file"),
    optional("point-allow-overlap"),
    optional("point-ignore-placement"),
    optional("point-opacity"),
    optional("point-placement"),
    optional("point-transform"),
    optional("point-comp-op"),
];

const MARKER: &[PropertyInfo] = &[
    optional("marker-file"),
    optional("marker-opacity"),
    optional("marker-fill-opacity"),
    optional("marker-line-color"),
    optional("marker-line-width"),
    optional("marker-line-opacity"),
    optional("marker-placement"),
    optional("marker-multi-policy"),
    optional("marker-type"),
    optional("marker-width"),
    optional("marker-height"),
    optional("marker-fill"),
    optional("marker-allow-overlap"),
    optional("marker-avoid-edges"),
    optional("marker-ignore-placement"),
    optional("marker-spacing"),
    optional("marker-max-error"),
    optional("marker-transform"),
    optional("marker-clip"),
    optional("marker-simplify"),
    optional("marker-simplify-algorithm"),
    optional("marker-smooth"),
    optional("marker-geometry-transform"),
    optional("marker-offset"),
    optional("marker-comp-op"),
    optional("marker-direction"),
];

const TEXT: &[PropertyInfo] = &[
    required("text-name"),
    required("text-face-name"),
    optional("text-size"),
    optional("text-ratio"),
    optional("text-wrap-width"),
    optional("text-wrap-before"),
    optional("text-wrap-character"),
    optional("text-spacing"),
    optional("text-character-spacing"),
    optional("text-line-spacing"),
    optional("text-label-position-tolerance"),
    optional("text-max-char-angle-delta"),
    optional("text-fill"),
    optional("text-opacity"),
    optional("text-halo-opacity"),
    optional("text-halo-fill"),
    optional("text-halo-radius"),
    optional("text-halo-rasterizer"),
    optional("text-dx"),
    optional("text-dy"),
    optional("text-vertical-alignment"),
    optional("text-avoid-edges"),
    optional("text-min-distance"),
    optional("text-min-padding"),
    optional("text-min-path-length"),
    optional("text-allow-overlap"),
    optional("text-orientation"),
    optional("text-placement"),
    optional("text-placement-type"),
    optional("text-placements"),
    optional("text-transform"),
    optional("text-horizontal-alignment"),
    optional("text-align"),
    optional("text-clip"),
    optional("text-comp-op"),
    optional("text-repeat-distance"),
    optional("text-margin"),
    optional("text-upright"),
    optional("text-largest-bbox-only"),
];

const SHIELD: &[PropertyInfo] = &[
    optional("shield-name"),
    required("shield-face-name"),
    required("shield-file"),
    optional("shield-size"),
    optional("shield-fill"),
    optional("shield-placement"),
    optional("shield-avoid-edges"),
    optional("shield-allow-overlap"),
    optional("shield-min-distance"),
    optional("shield-spacing"),
    optional("shield-min-padding"),
    optional("shield-wrap-width"),
    optional("shield-wrap-before"),
    optional("shield-wrap-character"),
    optional("shield-halo-fill"),
    optional("shield-halo-radius"),
    optional("shield-character-spacing"),
    optional("shield-line-spacing"),
    optional("shield-text-dx"),
    optional("shield-text-dy"),
    optional("shield-dx"),
    optional("shield-dy"),
    optional("shield-opacity"),
    optional("shield-text-opacity"),
    optional("shield-horizontal-alignment"),
    optional("shield-vertical-alignment"),
    optional("shield-placement-type"),
    optional("shield-placements"),
    optional("shield-text-transform"),
    optional("shield-justify-alignment"),
    optional("shield-transform"),
    optional("shield-clip"),
    optional("shield-comp-op"),
    optional("shield-unlock-image"),
];

const RASTER: &[PropertyInfo] = &[
    optional("raster-opacity"),
    optional("raster-filter-factor"),
    optional("raster-scaling"),
    optional("raster-mesh-size"),
    optional("raster-comp-op"),
    optional("raster-colorizer-default-mode"),
    optional("raster-colorizer-default-color"),
    optional("raster-colorizer-epsilon"),
    optional("raster-colorizer-stops"),
];

const BUILDING: &[PropertyInfo] = &[
    optional("building-fill"),
    optional("building-fill-opacity"),
    optional("building-height"),
];

const SYMBOLIZERS: &[(SymbolizerKind, &[PropertyInfo])] = &[
    (SymbolizerKind::Line, LINE),
    (SymbolizerKind::LinePattern, LINE_PATTERN),
    (SymbolizerKind::Polygon, POLYGON),
    (SymbolizerKind::PolygonPattern, POLYGON_PATTERN),
    (SymbolizerKind::Point, POINT),
    (SymbolizerKind::Marker, MARKER),
    (SymbolizerKind::Text, TEXT),
    (SymbolizerKind::Shield, SHIELD),
    (SymbolizerKind::Raster, RASTER),
    (SymbolizerKind::Building, BUILDING),
];

static PROPERTIES: OnceLock<PropertyTable> = OnceLock::new();

/// Translator for Mapnik.
#[derive(Debug, Clone, Copy)]
pub struct MapnikTranslator;

impl MapnikTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MapnikTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for MapnikTranslator {
    fn name(&self) -> &'static str {
        "mapnik"
    }

    fn properties(&self) -> &PropertyTable {
        PROPERTIES.get_or_init(|| PropertyTable::build(STYLE_PROPERTIES, SYMBOLIZERS))
    }

    fn to_symbolizer(
        &self,
        kind: SymbolizerKind,
        properties: &[PropertyValue],
    ) -> Result<Symbolizer, TranslateError> {
        match kind {
            SymbolizerKind::Line => line(properties).map(Symbolizer::Line),
            SymbolizerKind::LinePattern => line_pattern(properties).map(Symbolizer::LinePattern),
            SymbolizerKind::Polygon => polygon(properties).map(Symbolizer::Polygon),
            SymbolizerKind::PolygonPattern => {
                polygon_pattern(properties).map(Symbolizer::PolygonPattern)
            }
            SymbolizerKind::Point => point(properties).map(Symbolizer::Point),
            SymbolizerKind::Marker => marker(properties).map(Symbolizer::Marker),
            SymbolizerKind::Text => text(properties).map(Symbolizer::Text),
            SymbolizerKind::Shield => shield(properties).map(Symbolizer::Shield),
            SymbolizerKind::Raster => raster(properties).map(Symbolizer::Raster),
            SymbolizerKind::Building => building(properties).map(Symbolizer::Building),
        }
    }

    fn to_filter(&self, filter: &FilterElement) -> Result<String, TranslateError> {
        let key = format!("[{}]", filter.key);
        let value = if filter.key == "mapnik::geometry_type" {
            geometry_type(filter.value())
        } else {
            filter_value(filter)
        };
        Ok(match filter.op {
            FilterOp::Match => format!("{key}.match({value})"),
            FilterOp::Mod => format!("{key} % {value}"),
            op => format!("{key} {op} {value}"),
        })
    }

    fn to_image_filters(&self, value: &str) -> Result<Vec<String>, TranslateError> {
        Ok(split_top_level(value)
            .into_iter()
            .map(image_filter)
            .collect())
    }

    fn to_datasource_parameters(
        &self,
        datasource: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, TranslateError> {
        let mut params: BTreeMap<String, String> = datasource
            .iter()
            .map(|(key, value)| (key.clone(), unquote(value).to_string()))
            .collect();
        let kind = match params.get("type") {
            Some(kind) => kind.to_ascii_lowercase(),
            None => infer_datasource_type(params.get("file").map_or("", String::as_str)).to_string(),
        };

        match kind.as_str() {
            "shape" => {
                params.entry("encoding".into()).or_insert_with(|| "utf-8".into());
            }
            "postgis" => {
                let connection = ["host", "port", "dbname", "user", "password"]
                    .iter()
                    .filter_map(|key| params.get(*key).map(|value| format!("{key}={value}")))
                    .collect::<Vec<_>>()
                    .join(" ");
                params.insert("connection".into(), connection);
                if let Some(table) = params.get_mut("table") {
                    *table = table.replace("!bbox!", "T_BBOX");
                }
            }
            "geojson" | "ogr" | "gdal" | "csv" => {}
            other => return Err(TranslateError::UnknownDatasource(other.to_string())),
        }
        params.insert("type".into(), kind);
        Ok(params)
    }

    fn to_coordinate_system(&self, srs: &str) -> Result<String, TranslateError> {
        let srs = unquote(srs);
        if srs.is_empty() {
            return Ok(String::new());
        }
        if srs.starts_with("+proj=merc +a=6378137 +b=6378137") {
            return Ok("EPSG:3857".to_string());
        }
        let lower = srs.to_ascii_lowercase();
        if let Some(code) = lower
            .strip_prefix("+init=epsg:")
            .or_else(|| lower.strip_prefix("epsg:"))
        {
            let code = code.split_whitespace().next().unwrap_or(code);
            return match code.parse::<u32>() {
                Ok(code) => Ok(format!("EPSG:{code}")),
                Err(_) => Err(TranslateError::invalid("srs", srs, "invalid EPSG code")),
            };
        }
        if let Ok(code) = srs.parse::<u32>() {
            return Ok(format!("EPSG:{code}"));
        }
        Ok(srs.to_string())
    }
}

fn filter_value(filter: &FilterElement) -> String {
    if filter.numeric().is_some() {
        return filter.value().to_string();
    }
    format!("'{}'", unquote(filter.value()).replace('\'', "\\'"))
}

fn geometry_type(value: &str) -> String {
    match unquote(value) {
        "1" => "point".to_string(),
        "2" => "linestring".to_string(),
        "3" => "polygon".to_string(),
        "4" => "collection".to_string(),
        other => other.to_string(),
    }
}

fn image_filter(filter: &str) -> String {
    let (name, args) = match filter.split_once('(') {
        Some((name, rest)) => (name.trim(), rest.trim_end_matches(')').trim()),
        None => (filter.trim(), ""),
    };
    let mapped = match name {
        "agg-stack-blur" => return format!("StackBlur({args})"),
        "blur" => "Blur",
        "gaussian_blur" | "gaussian-blur" => "GaussianBlur",
        "invert" => "Invert",
        "emboss" => "Emboss",
        "sharpen" => "Sharpen",
        "edge_detect" | "edge-detect" => "EdgeDetect",
        "x_gradient" | "x-gradient" => "XGradient",
        "y_gradient" | "y-gradient" => "YGradient",
        "normalize" => "Normalize",
        "equalize" => "Equalize",
        "sepia" => "Sepia",
        "gray" | "grayscale" => "Grayscale",
        _ => return "unknownfilter()".to_string(),
    };
    mapped.to_string()
}

// ============================================================================
// Value parsing
// ============================================================================

fn number(p: &PropertyValue) -> Result<f64, TranslateError> {
    let raw = unquote(&p.value);
    let digits = raw.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    digits
        .parse::<f64>()
        .map_err(|_| TranslateError::invalid(&p.name, &p.value, "expected a number"))
}

fn numbers(p: &PropertyValue) -> Result<Vec<f64>, TranslateError> {
    p.value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .map_err(|_| TranslateError::invalid(&p.name, &p.value, "expected a list of numbers"))
        })
        .collect()
}

fn boolean(p: &PropertyValue) -> Result<bool, TranslateError> {
    match unquote(&p.value) {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(TranslateError::invalid(&p.name, &p.value, "expected true or false")),
    }
}

fn color(p: &PropertyValue) -> Result<Color, TranslateError> {
    Color::parse(&p.value).ok_or_else(|| TranslateError::invalid(&p.name, &p.value, "expected a color"))
}

fn text_value(p: &PropertyValue) -> String {
    unquote(&p.value).to_string()
}

fn path(p: &PropertyValue) -> String {
    let raw = unquote(&p.value);
    let raw = raw
        .strip_prefix("url(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(raw);
    unquote(raw).to_string()
}

fn keyword<T: Copy>(p: &PropertyValue, choices: &[(&str, T)]) -> Result<T, TranslateError> {
    let value = unquote(&p.value);
    choices
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, choice)| *choice)
        .ok_or_else(|| {
            let names: Vec<&str> = choices.iter().map(|(name, _)| *name).collect();
            TranslateError::invalid(&p.name, &p.value, format!("expected one of {}", names.join(", ")))
        })
}

/// Apply `{prefix}-clip`, `-comp-op` and geometry properties; false when
/// `p` is none of those.
fn common(common: &mut Common, prefix: &str, p: &PropertyValue) -> Result<bool, TranslateError> {
    let Some(suffix) = p
        .name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return Ok(false);
    };
    match suffix {
        "clip" => common.clip = boolean(p)?,
        "comp-op" => {
            common.comp_op = Some(
                crate::symbolizer::CompositingMode::from_name(unquote(&p.value)).ok_or_else(
                    || TranslateError::invalid(&p.name, &p.value, "unknown compositing operation"),
                )?,
            )
        }
        "simplify" => common.geometry.simplify = Some(number(p)?),
        "simplify-algorithm" => common.geometry.simplify_algorithm = Some(text_value(p)),
        "smooth" => common.geometry.smooth = Some(number(p)?),
        "offset" => common.geometry.offset = Some(number(p)?),
        "geometry-transform" => common.geometry.transform = Some(text_value(p)),
        _ => return Ok(false),
    }
    Ok(true)
}

const CAPS: &[(&str, LineCap)] = &[
    ("butt", LineCap::Butt),
    ("round", LineCap::Round),
    ("square", LineCap::Square),
];

const JOINS: &[(&str, LineJoin)] = &[
    ("miter", LineJoin::Miter),
    ("miter-revert", LineJoin::MiterRevert),
    ("round", LineJoin::Round),
    ("bevel", LineJoin::Bevel),
];

// ============================================================================
// Symbolizers
// ============================================================================

fn line(properties: &[PropertyValue]) -> Result<LineSymbolizer, TranslateError> {
    let mut sym = LineSymbolizer::default();
    for p in properties {
        if common(&mut sym.common, "line", p)? {
            continue;
        }
        match p.name.as_str() {
            "line-color" => sym.stroke.color = color(p)?,
            "line-width" => sym.stroke.width = number(p)?,
            "line-opacity" => sym.stroke.opacity = number(p)?,
            "line-join" => sym.stroke.join = keyword(p, JOINS)?,
            "line-cap" => sym.stroke.cap = keyword(p, CAPS)?,
            "line-gamma" => sym.stroke.gamma = number(p)?,
            "line-dasharray" => sym.stroke.dash_array = numbers(p)?,
            "line-dash-offset" => sym.stroke.dash_offset = number(p)?,
            "line-miterlimit" => sym.stroke.miter_limit = number(p)?,
            _ => {}
        }
    }
    Ok(sym)
}

fn line_pattern(properties: &[PropertyValue]) -> Result<LinePatternSymbolizer, TranslateError> {
    let mut sym = LinePatternSymbolizer {
        opacity: 1.0,
        ..Default::default()
    };
    for p in properties {
        if common(&mut sym.common, "line-pattern", p)? {
            continue;
        }
        match p.name.as_str() {
            "line-pattern-file" => sym.file = path(p),
            "line-pattern-opacity" => sym.opacity = number(p)?,
            _ => {}
        }
    }
    Ok(sym)
}

fn polygon(properties: &[PropertyValue]) -> Result<PolygonSymbolizer, TranslateError> {
    let mut sym = PolygonSymbolizer::default();
    for p in properties {
        if common(&mut sym.common, "polygon", p)? {
            continue;
        }
        match p.name.as_str() {
            "polygon-fill" => sym.fill = color(p)?,
            "polygon-opacity" => sym.opacity = number(p)?,
            "polygon-gamma" => sym.gamma = number(p)?,
            _ => {}
        }
    }
    Ok(sym)
}

fn polygon_pattern(properties: &[PropertyValue]) -> Result<PolygonPatternSymbolizer, TranslateError> {
    let mut sym = PolygonPatternSymbolizer {
        opacity: 1.0,
        ..Default::default()
    };
    for p in properties {
        if common(&mut sym.common, "polygon-pattern", p)? {
            continue;
        }
        match p.name.as_str() {
            "polygon-pattern-file" => sym.file = path(p),
            "polygon-pattern-opacity" => sym.opacity = number(p)?,
            "polygon-pattern-alignment" => {
                sym.alignment = keyword(
                    p,
                    &[("global", PatternAlignment::Global), ("local", PatternAlignment::Local)],
                )?
            }
            _ => {}
        }
    }
    Ok(sym)
}

fn point(properties: &[PropertyValue]) -> Result<PointSymbolizer, TranslateError> {
    let mut sym = PointSymbolizer {
        opacity: 1.0,
        ..Default::default()
    };
    for p in properties {
        if common(&mut sym.common, "point", p)? {
            continue;
        }
        match p.name.as_str() {
            "point-file" => sym.file = Some(path(p)),
            "point-opacity" => sym.opacity = number(p)?,
            "point-allow-overlap" => sym.allow_overlap = boolean(p)?,
            "point-ignore-placement" => sym.ignore_placement = boolean(p)?,
            "point-placement" => {
                sym.placement = keyword(
                    p,
                    &[("centroid", PointPlacement::Centroid), ("interior", PointPlacement::Interior)],
                )?
            }
            "point-transform" => sym.transform = Some(text_value(p)),
            _ => {}
        }
    }
    Ok(sym)
}

fn marker(properties: &[PropertyValue]) -> Result<MarkerSymbolizer, TranslateError> {
    let mut sym = MarkerSymbolizer::default();
    let mut stroke = Stroke::default();
    let mut has_stroke = false;
    for p in properties {
        if common(&mut sym.common, "marker", p)? {
            continue;
        }
        match p.name.as_str() {
            "marker-file" => sym.file = Some(path(p)),
            "marker-opacity" => sym.opacity = number(p)?,
            "marker-fill-opacity" => sym.fill_opacity = number(p)?,
            "marker-fill" => sym.fill = color(p)?,
            "marker-width" => sym.width = Some(number(p)?),
            "marker-height" => sym.height = Some(number(p)?),
            "marker-spacing" => sym.spacing = number(p)?,
            "marker-allow-overlap" => sym.allow_overlap = boolean(p)?,
            "marker-ignore-placement" => sym.ignore_placement = boolean(p)?,
            "marker-transform" => sym.transform = Some(text_value(p)),
            "marker-type" => {
                sym.shape = keyword(p, &[("ellipse", MarkerShape::Ellipse), ("arrow", MarkerShape::Arrow)])?
            }
            "marker-placement" => {
                sym.placement = keyword(
                    p,
                    &[
                        ("point", MarkerPlacement::Point),
                        ("line", MarkerPlacement::Line),
                        ("interior", MarkerPlacement::Interior),
                        ("vertex-first", MarkerPlacement::VertexFirst),
                        ("vertex-last", MarkerPlacement::VertexLast),
                    ],
                )?
            }
            "marker-line-color" => {
                stroke.color = color(p)?;
                has_stroke = true;
            }
            "marker-line-width" => {
                stroke.width = number(p)?;
                has_stroke = true;
            }
            "marker-line-opacity" => {
                stroke.opacity = number(p)?;
                has_stroke = true;
            }
            _ => {}
        }
    }
    if has_stroke {
        sym.stroke = Some(stroke);
    }
    Ok(sym)
}

/// Apply a label property; `prefix` is `text` or `shield`.
fn label(style: &mut TextStyle, prefix: &str, p: &PropertyValue) -> Result<(), TranslateError> {
    let Some(suffix) = p
        .name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return Ok(());
    };
    match suffix {
        "name" => style.expression = text_value(p),
        "face-name" => style.face_name = p.value.replace(['"', '\''], ""),
        "size" => style.size = number(p)?,
        "fill" => style.fill = color(p)?,
        "opacity" | "text-opacity" => style.opacity = number(p)?,
        "halo-fill" => style.halo_fill = color(p)?,
        "halo-radius" => style.halo_radius = number(p)?,
        "wrap-width" => style.wrap_width = number(p)?,
        "wrap-before" => style.wrap_before = boolean(p)?,
        "wrap-character" => style.wrap_character = text_value(p).chars().next(),
        "character-spacing" => style.character_spacing = number(p)?,
        "line-spacing" => style.line_spacing = number(p)?,
        "dx" | "text-dx" => style.dx = number(p)?,
        "dy" | "text-dy" => style.dy = number(p)?,
        "allow-overlap" => style.allow_overlap = boolean(p)?,
        "avoid-edges" => style.avoid_edges = boolean(p)?,
        "min-distance" => style.min_distance = number(p)?,
        "spacing" => style.spacing = number(p)?,
        "max-char-angle-delta" => style.max_char_angle_delta = Some(number(p)?),
        "horizontal-alignment" => style.horizontal_alignment = Some(text_value(p)),
        "vertical-alignment" => style.vertical_alignment = Some(text_value(p)),
        "transform" | "text-transform" => {
            style.transform = keyword(
                p,
                &[
                    ("none", TextTransform::None),
                    ("uppercase", TextTransform::Uppercase),
                    ("lowercase", TextTransform::Lowercase),
                    ("capitalize", TextTransform::Capitalize),
                ],
            )?
        }
        "placement" => {
            style.placement = keyword(
                p,
                &[
                    ("point", LabelPlacement::Point),
                    ("line", LabelPlacement::Line),
                    ("interior", LabelPlacement::Interior),
                    ("vertex", LabelPlacement::Vertex),
                ],
            )?
        }
        _ => {}
    }
    Ok(())
}

fn text(properties: &[PropertyValue]) -> Result<TextSymbolizer, TranslateError> {
    let mut sym = TextSymbolizer::default();
    for p in properties {
        if common(&mut sym.common, "text", p)? {
            continue;
        }
        label(&mut sym.text, "text", p)?;
    }
    Ok(sym)
}

fn shield(properties: &[PropertyValue]) -> Result<ShieldSymbolizer, TranslateError> {
    let mut sym = ShieldSymbolizer {
        opacity: 1.0,
        text_opacity: 1.0,
        ..Default::default()
    };
    for p in properties {
        if common(&mut sym.common, "shield", p)? {
            continue;
        }
        match p.name.as_str() {
            "shield-file" => sym.file = path(p),
            "shield-opacity" => sym.opacity = number(p)?,
            "shield-text-opacity" => sym.text_opacity = number(p)?,
            "shield-dx" => sym.shield_dx = number(p)?,
            "shield-dy" => sym.shield_dy = number(p)?,
            "shield-unlock-image" => sym.unlock_image = boolean(p)?,
            _ => label(&mut sym.text, "shield", p)?,
        }
    }
    Ok(sym)
}

fn raster(properties: &[PropertyValue]) -> Result<RasterSymbolizer, TranslateError> {
    let mut sym = RasterSymbolizer::default();
    for p in properties {
        if common(&mut sym.common, "raster", p)? {
            continue;
        }
        match p.name.as_str() {
            "raster-opacity" => sym.opacity = number(p)?,
            "raster-scaling" => sym.scaling = text_value(p),
            "raster-filter-factor" => sym.filter_factor = Some(number(p)?),
            "raster-mesh-size" => {
                let size = number(p)?;
                if size < 0.0 || size.fract() != 0.0 {
                    return Err(TranslateError::invalid(&p.name, &p.value, "expected a positive integer"));
                }
                sym.mesh_size = Some(size as u32);
            }
            _ => {}
        }
    }
    Ok(sym)
}

fn building(properties: &[PropertyValue]) -> Result<BuildingSymbolizer, TranslateError> {
    let mut sym = BuildingSymbolizer::default();
    for p in properties {
        match p.name.as_str() {
            "building-fill" => sym.fill = color(p)?,
            "building-fill-opacity" => sym.fill_opacity = number(p)?,
            "building-height" => sym.height = text_value(p),
            _ => {}
        }
    }
    Ok(sym)
}
