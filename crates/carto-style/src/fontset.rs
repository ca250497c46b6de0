//! Font sets
//!
//! Every distinct `text-face-name`/`shield-face-name` list becomes one named
//! font set. The cache is shared by all layer workers and lives as long as
//! the compilation that owns it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use fontdb::Database;

/// Ordered list of font faces registered under a generated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSet {
    pub name: String,
    pub faces: Vec<String>,
}

/// Split a face-name value into trimmed, unquoted face names.
pub fn parse_face_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|face| face.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|face| !face.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cache key for a face-name value: the face list with quotes removed.
fn cache_key(value: &str) -> String {
    parse_face_names(value).join(", ")
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Concurrent map from face-name lists to font sets.
pub struct FontSetCache {
    sets: RwLock<HashMap<String, FontSet>>,
    fonts: Option<Database>,
}

impl FontSetCache {
    /// Cache that does not check faces against installed fonts.
    pub fn new() -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            fonts: None,
        }
    }

    /// Cache that warns about faces missing from `fonts`.
    pub fn with_database(fonts: Database) -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            fonts: Some(fonts),
        }
    }

    /// Cache checking against system fonts plus an optional font directory.
    pub fn with_system_fonts(font_directory: Option<&Path>) -> Self {
        let mut fonts = Database::new();
        fonts.load_system_fonts();
        if let Some(dir) = font_directory {
            fonts.load_fonts_dir(dir);
        }
        tracing::debug!("Loaded {} font faces", fonts.len());
        Self::with_database(fonts)
    }

    pub fn get(&self, value: &str) -> Option<FontSet> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        sets.get(&cache_key(value)).cloned()
    }

    /// Font set for `value`, registering a new one on first use.
    pub fn get_or_create(&self, value: &str) -> FontSet {
        let key = cache_key(value);
        {
            let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(set) = sets.get(&key) {
                return set.clone();
            }
        }

        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        let next = sets.len() + 1;
        sets.entry(key)
            .or_insert_with_key(|key| {
                let faces = parse_face_names(key);
                self.check_faces(&faces);
                FontSet {
                    name: format!("fontset-{next}"),
                    faces,
                }
            })
            .clone()
    }

    /// All registered font sets in creation order.
    pub fn font_sets(&self) -> Vec<FontSet> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<FontSet> = sets.values().cloned().collect();
        all.sort_by_key(|set| {
            set.name
                .rsplit('-')
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(usize::MAX)
        });
        all
    }

    pub fn len(&self) -> usize {
        self.sets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_faces(&self, faces: &[String]) {
        let Some(fonts) = &self.fonts else {
            return;
        };
        for face in faces {
            if !has_face(fonts, face) {
                tracing::warn!("Font face '{}' is not installed", face);
            }
        }
    }
}

impl Default for FontSetCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Match a Mapnik-style face name ("DejaVu Sans Bold") against the family
/// and PostScript names in `fonts`.
fn has_face(fonts: &Database, face: &str) -> bool {
    let wanted = normalize(face);
    fonts.faces().any(|info| {
        normalize(&info.post_script_name) == wanted
            || info.families.iter().any(|(family, _)| {
                let family = normalize(family);
                !family.is_empty() && wanted.starts_with(&family)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_face_names() {
        assert_eq!(
            parse_face_names("\"DejaVu Sans Book\", 'Unifont Medium'"),
            vec!["DejaVu Sans Book", "Unifont Medium"]
        );
        assert!(parse_face_names("\"\"").is_empty());
    }

    #[test]
    fn test_font_sets_are_shared_by_literal_list() {
        let cache = FontSetCache::new();
        let a = cache.get_or_create("\"Open Sans Regular\", \"Arial Unicode MS Regular\"");
        let b = cache.get_or_create("'Open Sans Regular', 'Arial Unicode MS Regular'");
        let c = cache.get_or_create("\"Open Sans Bold\"");
        assert_eq!(a, b);
        assert_eq!(a.name, "fontset-1");
        assert_eq!(c.name, "fontset-2");
        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.font_sets().iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["fontset-1", "fontset-2"]
        );
    }

    #[test]
    fn test_missing_faces_are_kept() {
        let cache = FontSetCache::with_database(Database::new());
        let set = cache.get_or_create("\"No Such Font\"");
        assert_eq!(set.faces, vec!["No Such Font"]);
        assert!(cache.get("\"No Such Font\"").is_some());
    }
}
