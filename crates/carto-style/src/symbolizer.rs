//! Symbolizer model
//!
//! Typed drawing instructions produced by a translator from a group of
//! properties sharing the same instance and symbolizer kind.

use std::fmt;

use crate::translator::SymbolizerKind;

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse any CSS color notation (`#rgb`, `rgba()`, named colors...).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        let color: csscolorparser::Color = value.parse().ok()?;
        let [r, g, b, a] = color.to_rgba8();
        Some(Self { r, g, b, a })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Porter-Duff and blend compositing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositingMode {
    Clear,
    Src,
    Dst,
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcAtop,
    DstAtop,
    Xor,
    Plus,
    Minus,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Contrast,
    Invert,
    InvertRgb,
    GrainMerge,
    GrainExtract,
    Hue,
    Saturation,
    Color,
    Value,
}

impl CompositingMode {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "clear" => Self::Clear,
            "src" => Self::Src,
            "dst" => Self::Dst,
            "src-over" => Self::SrcOver,
            "dst-over" => Self::DstOver,
            "src-in" => Self::SrcIn,
            "dst-in" => Self::DstIn,
            "src-out" => Self::SrcOut,
            "dst-out" => Self::DstOut,
            "src-atop" => Self::SrcAtop,
            "dst-atop" => Self::DstAtop,
            "xor" => Self::Xor,
            "plus" => Self::Plus,
            "minus" => Self::Minus,
            "multiply" => Self::Multiply,
            "screen" => Self::Screen,
            "overlay" => Self::Overlay,
            "darken" => Self::Darken,
            "lighten" => Self::Lighten,
            "color-dodge" => Self::ColorDodge,
            "color-burn" => Self::ColorBurn,
            "hard-light" => Self::HardLight,
            "soft-light" => Self::SoftLight,
            "difference" => Self::Difference,
            "exclusion" => Self::Exclusion,
            "contrast" => Self::Contrast,
            "invert" => Self::Invert,
            "invert-rgb" => Self::InvertRgb,
            "grain-merge" => Self::GrainMerge,
            "grain-extract" => Self::GrainExtract,
            "hue" => Self::Hue,
            "saturation" => Self::Saturation,
            "color" => Self::Color,
            "value" => Self::Value,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    MiterRevert,
    Round,
    Bevel,
}

/// Outline of a line or polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub opacity: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    pub dash_array: Vec<f64>,
    pub dash_offset: f64,
    pub miter_limit: f64,
    pub gamma: f64,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            opacity: 1.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            dash_array: Vec::new(),
            dash_offset: 0.0,
            miter_limit: 4.0,
            gamma: 1.0,
        }
    }
}

/// Geometry preprocessing applied before drawing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryTransform {
    pub simplify: Option<f64>,
    pub simplify_algorithm: Option<String>,
    pub smooth: Option<f64>,
    pub offset: Option<f64>,
    pub transform: Option<String>,
}

impl GeometryTransform {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Settings shared by every symbolizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Common {
    pub clip: bool,
    pub comp_op: Option<CompositingMode>,
    pub geometry: GeometryTransform,
}

impl Default for Common {
    fn default() -> Self {
        Self {
            clip: true,
            comp_op: None,
            geometry: GeometryTransform::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineSymbolizer {
    pub stroke: Stroke,
    pub common: Common,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinePatternSymbolizer {
    pub file: String,
    pub opacity: f64,
    pub common: Common,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSymbolizer {
    pub fill: Color,
    pub opacity: f64,
    pub gamma: f64,
    /// Outline merged from a following line symbolizer.
    pub stroke: Option<Stroke>,
    pub common: Common,
}

impl Default for PolygonSymbolizer {
    fn default() -> Self {
        Self {
            fill: Color::GRAY,
            opacity: 1.0,
            gamma: 1.0,
            stroke: None,
            common: Common::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternAlignment {
    #[default]
    Global,
    Local,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonPatternSymbolizer {
    pub file: String,
    pub alignment: PatternAlignment,
    pub opacity: f64,
    pub common: Common,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointPlacement {
    #[default]
    Centroid,
    Interior,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSymbolizer {
    pub file: Option<String>,
    pub opacity: f64,
    pub allow_overlap: bool,
    pub ignore_placement: bool,
    pub placement: PointPlacement,
    pub transform: Option<String>,
    pub common: Common,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerShape {
    #[default]
    Ellipse,
    Arrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerPlacement {
    #[default]
    Point,
    Line,
    Interior,
    VertexFirst,
    VertexLast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSymbolizer {
    pub file: Option<String>,
    pub shape: MarkerShape,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub fill: Color,
    pub fill_opacity: f64,
    pub stroke: Option<Stroke>,
    pub opacity: f64,
    pub placement: MarkerPlacement,
    pub spacing: f64,
    pub allow_overlap: bool,
    pub ignore_placement: bool,
    pub transform: Option<String>,
    pub common: Common,
}

impl Default for MarkerSymbolizer {
    fn default() -> Self {
        Self {
            file: None,
            shape: MarkerShape::Ellipse,
            width: None,
            height: None,
            fill: Color::rgb(0, 0, 255),
            fill_opacity: 1.0,
            stroke: None,
            opacity: 1.0,
            placement: MarkerPlacement::Point,
            spacing: 100.0,
            allow_overlap: false,
            ignore_placement: false,
            transform: None,
            common: Common::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPlacement {
    #[default]
    Point,
    Line,
    Interior,
    Vertex,
}

/// Label settings shared by text and shield symbolizers.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Label expression such as `[name] + ' ' + [ref]`.
    pub expression: String,
    /// Face names as written, without quotes.
    pub face_name: String,
    /// Font set registered for `face_name`.
    pub font_set: Option<String>,
    pub size: f64,
    pub fill: Color,
    pub opacity: f64,
    pub halo_fill: Color,
    pub halo_radius: f64,
    pub transform: TextTransform,
    pub wrap_width: f64,
    pub wrap_before: bool,
    pub wrap_character: Option<char>,
    pub character_spacing: f64,
    pub line_spacing: f64,
    pub dx: f64,
    pub dy: f64,
    pub placement: LabelPlacement,
    pub allow_overlap: bool,
    pub avoid_edges: bool,
    pub min_distance: f64,
    pub spacing: f64,
    pub max_char_angle_delta: Option<f64>,
    pub horizontal_alignment: Option<String>,
    pub vertical_alignment: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            expression: String::new(),
            face_name: String::new(),
            font_set: None,
            size: 10.0,
            fill: Color::BLACK,
            opacity: 1.0,
            halo_fill: Color::WHITE,
            halo_radius: 0.0,
            transform: TextTransform::None,
            wrap_width: 0.0,
            wrap_before: false,
            wrap_character: None,
            character_spacing: 0.0,
            line_spacing: 0.0,
            dx: 0.0,
            dy: 0.0,
            placement: LabelPlacement::Point,
            allow_overlap: false,
            avoid_edges: false,
            min_distance: 0.0,
            spacing: 0.0,
            max_char_angle_delta: None,
            horizontal_alignment: None,
            vertical_alignment: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSymbolizer {
    pub text: TextStyle,
    pub common: Common,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShieldSymbolizer {
    pub text: TextStyle,
    pub file: String,
    pub opacity: f64,
    pub text_opacity: f64,
    pub shield_dx: f64,
    pub shield_dy: f64,
    pub unlock_image: bool,
    pub common: Common,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterSymbolizer {
    pub opacity: f64,
    pub scaling: String,
    pub filter_factor: Option<f64>,
    pub mesh_size: Option<u32>,
    pub common: Common,
}

impl Default for RasterSymbolizer {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            scaling: "near".to_string(),
            filter_factor: None,
            mesh_size: None,
            common: Common::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingSymbolizer {
    pub fill: Color,
    pub fill_opacity: f64,
    pub height: String,
    pub common: Common,
}

impl Default for BuildingSymbolizer {
    fn default() -> Self {
        Self {
            fill: Color::rgb(0xff, 0xff, 0xff),
            fill_opacity: 1.0,
            height: "0".to_string(),
            common: Common::default(),
        }
    }
}

/// A constructed symbolizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbolizer {
    Line(LineSymbolizer),
    LinePattern(LinePatternSymbolizer),
    Polygon(PolygonSymbolizer),
    PolygonPattern(PolygonPatternSymbolizer),
    Point(PointSymbolizer),
    Marker(MarkerSymbolizer),
    Text(TextSymbolizer),
    Shield(ShieldSymbolizer),
    Raster(RasterSymbolizer),
    Building(BuildingSymbolizer),
}

impl Symbolizer {
    pub fn kind(&self) -> SymbolizerKind {
        match self {
            Symbolizer::Line(_) => SymbolizerKind::Line,
            Symbolizer::LinePattern(_) => SymbolizerKind::LinePattern,
            Symbolizer::Polygon(_) => SymbolizerKind::Polygon,
            Symbolizer::PolygonPattern(_) => SymbolizerKind::PolygonPattern,
            Symbolizer::Point(_) => SymbolizerKind::Point,
            Symbolizer::Marker(_) => SymbolizerKind::Marker,
            Symbolizer::Text(_) => SymbolizerKind::Text,
            Symbolizer::Shield(_) => SymbolizerKind::Shield,
            Symbolizer::Raster(_) => SymbolizerKind::Raster,
            Symbolizer::Building(_) => SymbolizerKind::Building,
        }
    }

    /// False for symbolizers that can never draw anything.
    pub fn is_enabled(&self) -> bool {
        match self {
            Symbolizer::Line(line) => line.stroke.width > 0.0 && line.stroke.opacity > 0.0,
            Symbolizer::Polygon(polygon) => polygon.opacity > 0.0 || polygon.stroke.is_some(),
            Symbolizer::Text(text) => !text.text.expression.is_empty(),
            Symbolizer::Shield(shield) => !shield.file.is_empty(),
            _ => true,
        }
    }

    pub fn text_style_mut(&mut self) -> Option<&mut TextStyle> {
        match self {
            Symbolizer::Text(text) => Some(&mut text.text),
            Symbolizer::Shield(shield) => Some(&mut shield.text),
            _ => None,
        }
    }
}

/// Fold a line that directly follows a stroke-less polygon into the
/// polygon's outline.
pub fn merge_polygon_outlines(symbolizers: &mut Vec<Symbolizer>) {
    let mut i = 0;
    while i + 1 < symbolizers.len() {
        let mergeable = match (&symbolizers[i], &symbolizers[i + 1]) {
            (Symbolizer::Polygon(polygon), Symbolizer::Line(line)) => {
                polygon.stroke.is_none()
                    && polygon.common.comp_op == line.common.comp_op
                    && line.common.geometry.is_empty()
                    && polygon.common.geometry.is_empty()
            }
            _ => false,
        };
        if mergeable {
            if let Symbolizer::Line(line) = symbolizers.remove(i + 1) {
                if let Symbolizer::Polygon(polygon) = &mut symbolizers[i] {
                    polygon.stroke = Some(line.stroke);
                }
            }
        }
        i += 1;
    }
}
