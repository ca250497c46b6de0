//! Engine Configuration

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

/// Options for compiling a project.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker threads used for per-layer compilation, by default one per
    /// core available to the process
    pub threads: usize,

    /// Target renderer name
    pub translator: String,

    /// Warn about font faces missing from the system font database
    pub check_fonts: bool,

    /// Directory stylesheet paths are resolved against; defaults to the
    /// project file's directory
    pub base_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            threads: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            translator: "mapnik".to_string(),
            check_fonts: false,
            base_dir: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_translator(mut self, translator: impl Into<String>) -> Self {
        self.translator = translator.into();
        self
    }

    pub fn with_check_fonts(mut self, check_fonts: bool) -> Self {
        self.check_fonts = check_fonts;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        let cores = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        assert_eq!(config.threads, cores);
        assert_eq!(config.translator, "mapnik");
        assert!(!config.check_fonts);
        assert!(config.base_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_threads(0)
            .with_translator("geoserver")
            .with_base_dir("/tmp/project");
        assert_eq!(config.threads, 1);
        assert_eq!(config.translator, "geoserver");
        assert_eq!(config.base_dir, Some(PathBuf::from("/tmp/project")));
    }
}
