//! carto-style
//!
//! Cascade resolution for compiled CartoCSS definitions: property
//! inheritance, per-attachment styles, first-match folding, and the
//! materialization of renderer rules through a pluggable [`Translator`].

pub mod context;
pub mod fontset;
pub mod inherit;
pub mod materialize;
pub mod style;
pub mod symbolizer;
pub mod translator;

pub use context::{ResolveContext, ValueCache};
pub use fontset::{FontSet, FontSetCache, parse_face_names};
pub use inherit::inherit_definitions;
pub use materialize::{
    FeatureStyle, Rule, build_layer_styles, create_rules, create_style, filter_expression,
    located, style_name,
};
pub use style::{FilterMode, Style, sort_styles};
pub use symbolizer::{Color, CompositingMode, Symbolizer};
pub use translator::{
    GeoServerTranslator, MapnikTranslator, PropertyTarget, PropertyValue, SymbolizerKind,
    TranslateError, Translator, create_translator,
};
