//! Property registration tables

use std::collections::HashMap;

use super::{PropertyTarget, PropertyValue, SymbolizerKind};

/// A property a symbolizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: &'static str,
    pub required: bool,
}

pub const fn optional(name: &'static str) -> PropertyInfo {
    PropertyInfo {
        name,
        required: false,
    }
}

pub const fn required(name: &'static str) -> PropertyInfo {
    PropertyInfo {
        name,
        required: true,
    }
}

/// Lookup tables built once from a translator's static property lists.
#[derive(Debug, Default)]
pub struct PropertyTable {
    targets: HashMap<&'static str, PropertyTarget>,
    by_kind: HashMap<SymbolizerKind, &'static [PropertyInfo]>,
}

impl PropertyTable {
    pub fn build(
        style_properties: &'static [&'static str],
        symbolizers: &'static [(SymbolizerKind, &'static [PropertyInfo])],
    ) -> Self {
        let mut table = Self::default();
        for name in style_properties {
            table.targets.insert(*name, PropertyTarget::Style);
        }
        for (kind, properties) in symbolizers {
            table.by_kind.insert(*kind, *properties);
            for property in *properties {
                table
                    .targets
                    .entry(property.name)
                    .or_insert(PropertyTarget::Symbolizer(*kind));
            }
        }
        table
    }

    pub fn target(&self, property: &str) -> Option<PropertyTarget> {
        self.targets.get(property).copied()
    }

    pub fn is_valid(&self, kind: SymbolizerKind, property: &str) -> bool {
        self.by_kind
            .get(&kind)
            .is_some_and(|properties| properties.iter().any(|p| p.name == property))
    }

    /// First required property of `kind` absent from `properties`.
    pub fn missing_required(
        &self,
        kind: SymbolizerKind,
        properties: &[PropertyValue],
    ) -> Option<&'static str> {
        self.by_kind.get(&kind).and_then(|known| {
            known
                .iter()
                .filter(|p| p.required)
                .find(|p| !properties.iter().any(|value| value.name == p.name))
                .map(|p| p.name)
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
