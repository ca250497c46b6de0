//! carto-css
//!
//! CartoCSS stylesheet model for the Carto compiler: parsing, values and
//! variables, attribute filters, zoom masks, selectors, and flattening of
//! nested rulesets into specificity-ordered definitions.

pub mod definition;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod parser;
pub mod rule;
pub mod selector;
pub mod tree;
pub mod value;
pub mod zoom;

pub use definition::{Definition, applicable_to, sort_by_specificity};
pub use error::{CartoError, Result, SourceLocation};
pub use filter::{Addable, FilterElement, FilterMerge, FilterOp, FilterSet};
pub use flatten::{flatten, flatten_stylesheet};
pub use parser::{CartoParser, parse_stylesheet};
pub use rule::{DEFAULT_INSTANCE, PropertyRule};
pub use selector::{DEFAULT_ATTACHMENT, Element, ElementKind, Selector, Specificity};
pub use tree::{Ruleset, SelectorPart, SelectorSpec, Stylesheet, Variable};
pub use value::{Env, ExprId, Expression, Value};
pub use zoom::{MAX_ZOOM, Zoom, ZoomSpan, scale_denominator};

/// Parse, flatten and sort a single stylesheet with its own variables.
pub fn compile_stylesheet(file: &str, css: &str) -> Result<(Env, Vec<Definition>)> {
    let stylesheet = parse_stylesheet(file, css)?;
    let mut env = Env::new();
    stylesheet.define_variables(&mut env);
    let mut definitions = flatten_stylesheet(&stylesheet, &env)?;
    sort_by_specificity(&mut definitions);
    Ok((env, definitions))
}
