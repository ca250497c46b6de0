//! Property declarations

use std::sync::Arc;

use crate::error::SourceLocation;
use crate::value::Expression;
use crate::zoom::Zoom;

/// Instance name used when a property has no `instance/` prefix.
pub const DEFAULT_INSTANCE: &str = "__default__";

/// A single `name: value;` declaration.
#[derive(Debug, Clone)]
pub struct PropertyRule {
    pub name: String,
    /// Symbolizer instance, `a` in `a/line-width`.
    pub instance: String,
    pub value: Arc<Expression>,
    pub index: u32,
    pub location: SourceLocation,
    zoom: Zoom,
    id: String,
}

impl PropertyRule {
    /// Create a rule from a possibly instance-prefixed property name.
    pub fn new(
        full_name: &str,
        value: Arc<Expression>,
        index: u32,
        location: SourceLocation,
    ) -> Self {
        let mut parts = full_name.rsplit('/');
        let name = parts.next().unwrap_or(full_name).to_string();
        let instance = parts.next().unwrap_or(DEFAULT_INSTANCE).to_string();
        let zoom = Zoom::ALL;
        let id = Self::make_id(zoom, &instance, &name);
        Self {
            name,
            instance,
            value,
            index,
            location,
            zoom,
            id,
        }
    }

    fn make_id(zoom: Zoom, instance: &str, name: &str) -> String {
        format!("{zoom}#{instance}#{name}")
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: Zoom) {
        self.zoom = zoom;
        self.id = Self::make_id(zoom, &self.instance, &self.name);
    }

    /// Identity used to avoid inheriting the same declaration twice.
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn rule(name: &str) -> PropertyRule {
        let value = Arc::new(Expression::new(
            Value::number(1.0),
            SourceLocation::new("a.mss", 1),
        ));
        PropertyRule::new(name, value, 0, SourceLocation::new("a.mss", 1))
    }

    #[test]
    fn test_instance_prefix() {
        let plain = rule("line-width");
        assert_eq!(plain.name, "line-width");
        assert_eq!(plain.instance, DEFAULT_INSTANCE);

        let casing = rule("casing/line-width");
        assert_eq!(casing.name, "line-width");
        assert_eq!(casing.instance, "casing");
    }

    #[test]
    fn test_id_follows_zoom() {
        let mut r = rule("a/line-color");
        assert_eq!(r.id(), format!("{}#a#line-color", Zoom::ALL.bits()));
        r.set_zoom(Zoom::range(0, 1));
        assert_eq!(r.id(), "3#a#line-color");
    }
}
