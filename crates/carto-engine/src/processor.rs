//! Map processor
//!
//! Runs the whole compilation for a project: stylesheets are parsed and
//! flattened once, then every layer is matched, resolved and materialized on
//! the worker pool. A failing stylesheet or layer is logged and skipped
//! without stopping the rest of the map.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use carto_css::{
    CartoParser, Definition, Env, Stylesheet, applicable_to, flatten_stylesheet,
    sort_by_specificity,
};
use carto_style::{
    Color, FeatureStyle, FontSet, FontSetCache, ResolveContext, Translator, ValueCache,
    build_layer_styles, create_translator,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::parallel::WorkerPool;
use crate::project::{LayerSpec, Project, StylesheetSource};

/// Properties declared on `Map { ... }`, first declaration wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapProperties {
    values: BTreeMap<String, String>,
}

impl MapProperties {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn background_color(&self) -> Option<Color> {
        self.get("background-color").and_then(Color::parse)
    }

    pub fn buffer_size(&self) -> Option<u32> {
        self.get("buffer-size").and_then(|v| v.trim().parse().ok())
    }

    pub fn font_directory(&self) -> Option<&str> {
        self.get("font-directory")
            .map(|dir| dir.trim_matches(|c| c == '"' || c == '\''))
    }

    fn insert_first(&mut self, name: &str, value: String) {
        self.values.entry(name.to_string()).or_insert(value);
    }
}

/// A compiled layer.
#[derive(Debug, Clone, Default)]
pub struct MapLayer {
    pub name: String,
    pub class: String,
    pub srs: Option<String>,
    pub datasource: BTreeMap<String, String>,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
    /// `false` for layers switched off in the project and for the
    /// interactivity layer.
    pub enabled: bool,
    pub styles: Vec<FeatureStyle>,
    /// Members of a group layer.
    pub children: Vec<MapLayer>,
    /// Why the layer has no styles, when compiling it failed.
    pub error: Option<String>,
}

impl MapLayer {
    fn from_spec(spec: &LayerSpec) -> Self {
        Self {
            name: spec.name().to_string(),
            class: spec.class.clone(),
            srs: spec.srs.clone(),
            datasource: spec.datasource_parameters(),
            min_zoom: spec.properties.minzoom,
            max_zoom: spec.properties.maxzoom,
            enabled: spec.is_enabled(),
            ..Default::default()
        }
    }
}

/// Result of compiling a project.
#[derive(Debug, Clone, Default)]
pub struct CompiledMap {
    pub name: String,
    pub srs: Option<String>,
    pub properties: MapProperties,
    pub font_sets: Vec<FontSet>,
    pub layers: Vec<MapLayer>,
}

impl CompiledMap {
    /// Find a layer by name, looking inside groups.
    pub fn layer(&self, name: &str) -> Option<&MapLayer> {
        fn find<'a>(layers: &'a [MapLayer], name: &str) -> Option<&'a MapLayer> {
            layers.iter().find_map(|layer| {
                if layer.name == name {
                    Some(layer)
                } else {
                    find(&layer.children, name)
                }
            })
        }
        find(&self.layers, name)
    }
}

/// Stylesheets parsed and flattened for one project.
struct Definitions {
    env: Env,
    definitions: Vec<Definition>,
}

pub struct MapProcessor {
    config: EngineConfig,
    translator: Box<dyn Translator>,
}

impl MapProcessor {
    pub fn new(config: EngineConfig) -> Self {
        let translator = create_translator(&config.translator);
        Self { config, translator }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// Load and compile a project file.
    pub fn compile_file(&self, path: &Path) -> Result<CompiledMap> {
        let project = Project::load(path)?;
        let base_dir = match &self.config.base_dir {
            Some(dir) => dir.clone(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        Ok(self.compile(&project, &base_dir))
    }

    pub fn compile(&self, project: &Project, base_dir: &Path) -> CompiledMap {
        self.compile_with_progress(project, base_dir, |_, _| {})
    }

    /// Compile a project, calling `progress(done, total)` after each layer.
    pub fn compile_with_progress<P>(&self, project: &Project, base_dir: &Path, progress: P) -> CompiledMap
    where
        P: Fn(usize, usize) + Sync,
    {
        let sources: Vec<(String, String)> = project
            .stylesheets
            .iter()
            .filter_map(|source| match read_stylesheet(source, base_dir) {
                Ok(css) => Some((source.name().to_string(), css)),
                Err(err) => {
                    tracing::error!("Skipping stylesheet: {}", err);
                    None
                }
            })
            .collect();
        self.compile_sources(project, &sources, base_dir, progress)
    }

    /// Compile a project whose stylesheets are already in memory as
    /// `(name, source)` pairs.
    pub fn compile_sources<P>(
        &self,
        project: &Project,
        sources: &[(String, String)],
        base_dir: &Path,
        progress: P,
    ) -> CompiledMap
    where
        P: Fn(usize, usize) + Sync,
    {
        let Definitions { env, definitions } = load_definitions(sources);
        tracing::info!(
            "Flattened {} definitions from {} stylesheets",
            definitions.len(),
            sources.len()
        );

        let properties = map_properties(&definitions, &env);
        let font_sets = if self.config.check_fonts {
            let dir = properties.font_directory().map(|dir| base_dir.join(dir));
            FontSetCache::with_system_fonts(dir.as_deref())
        } else {
            FontSetCache::new()
        };
        self.register_font_sets(&definitions, &env, &font_sets);

        let values = ValueCache::new();
        let ctx = ResolveContext::new(&env, self.translator.as_ref(), &values)
            .with_font_sets(&font_sets);

        let mut work: Vec<&LayerSpec> = Vec::with_capacity(project.layer_count());
        collect_layers(&project.layers, &mut work);
        let total = work.len();
        let done = Mutex::new(0usize);

        let interactive = project.interactivity_layer();
        let pool = WorkerPool::new(self.config.threads);
        let compiled = pool.map(&work, |_, spec| {
            let mut layer = self.compile_layer(spec, &definitions, &ctx);
            if interactive == Some(layer.name.as_str()) {
                tracing::debug!("Layer '{}' serves interactivity, disabling", layer.name);
                layer.enabled = false;
            }
            let mut done = done.lock().unwrap_or_else(PoisonError::into_inner);
            *done += 1;
            progress(*done, total);
            layer
        });

        let mut compiled = compiled.into_iter();
        let layers = assemble(&project.layers, &mut compiled);

        let srs = properties
            .get("srs")
            .map(str::to_string)
            .or_else(|| project.srs.clone())
            .map(|srs| match self.translator.to_coordinate_system(&srs) {
                Ok(resolved) => resolved,
                Err(err) => {
                    tracing::warn!("Keeping map srs '{}': {}", srs, err);
                    srs
                }
            });

        tracing::info!("Compiled {} layers", total);
        CompiledMap {
            name: project.name.clone(),
            srs,
            properties,
            font_sets: font_sets.font_sets(),
            layers,
        }
    }

    /// Register font sets in stylesheet order so their names do not depend
    /// on worker scheduling.
    fn register_font_sets(&self, definitions: &[Definition], env: &Env, font_sets: &FontSetCache) {
        for rule in definitions.iter().flat_map(|d| d.rules()) {
            if !self.translator.is_font_set_property(&rule.name) {
                continue;
            }
            match env.evaluate(&rule.value) {
                Ok(value) => {
                    font_sets.get_or_create(&value);
                }
                Err(err) => tracing::warn!("Cannot evaluate font list: {}", err),
            }
        }
    }

    fn compile_layer(
        &self,
        spec: &LayerSpec,
        definitions: &[Definition],
        ctx: &ResolveContext<'_>,
    ) -> MapLayer {
        let mut layer = MapLayer::from_spec(spec);
        if let Err(err) = self.style_layer(spec, definitions, ctx, &mut layer) {
            tracing::error!("{:#}", err);
            layer.styles.clear();
            layer.error = Some(format!("{err:#}"));
        }
        layer
    }

    fn style_layer(
        &self,
        spec: &LayerSpec,
        definitions: &[Definition],
        ctx: &ResolveContext<'_>,
        layer: &mut MapLayer,
    ) -> anyhow::Result<()> {
        let name = spec.name();

        if !layer.datasource.is_empty() {
            match self.translator.to_datasource_parameters(&layer.datasource) {
                Ok(params) => layer.datasource = params,
                Err(err) => tracing::warn!("Layer '{}': keeping datasource as written: {}", name, err),
            }
        }
        if let Some(srs) = &spec.srs {
            match self.translator.to_coordinate_system(srs) {
                Ok(resolved) => layer.srs = Some(resolved),
                Err(err) => tracing::warn!("Layer '{}': keeping srs as written: {}", name, err),
            }
        }
        if spec.is_group() {
            return Ok(());
        }

        let classes: HashSet<&str> = spec.classes().collect();
        let matching = applicable_to(definitions, name, &classes);
        if matching.is_empty() {
            tracing::debug!("No definitions match layer '{}'", name);
            return Ok(());
        }
        layer.styles = build_layer_styles(name, &matching, ctx)
            .with_context(|| format!("layer '{name}'"))?;
        tracing::debug!("Layer '{}': {} styles", name, layer.styles.len());
        Ok(())
    }
}

fn read_stylesheet(source: &StylesheetSource, base_dir: &Path) -> Result<String> {
    match source {
        StylesheetSource::Inline { data, .. } => Ok(data.clone()),
        StylesheetSource::Path(path) => {
            let path: PathBuf = base_dir.join(path);
            fs::read_to_string(&path).map_err(|source| EngineError::Io { path, source })
        }
    }
}

/// Parse every stylesheet with unique source indexes, merge their variables,
/// flatten and sort. Stylesheets that fail are logged and left out.
fn load_definitions(sources: &[(String, String)]) -> Definitions {
    let mut index_base = 0;
    let mut sheets: Vec<Stylesheet> = Vec::with_capacity(sources.len());
    for (name, css) in sources {
        let mut parser = CartoParser::new(name.as_str()).with_index_base(index_base);
        match parser.parse(css) {
            Ok(sheet) => {
                index_base = parser.next_index();
                sheets.push(sheet);
            }
            Err(err) => tracing::error!("Failed to parse stylesheet '{}': {}", name, err),
        }
    }

    let mut env = Env::new();
    for sheet in &sheets {
        sheet.define_variables(&mut env);
    }

    let mut definitions = Vec::new();
    for sheet in &sheets {
        match flatten_stylesheet(sheet, &env) {
            Ok(flat) => definitions.extend(flat),
            Err(err) => tracing::error!("Failed to load stylesheet '{}': {}", sheet.file, err),
        }
    }
    sort_by_specificity(&mut definitions);
    Definitions { env, definitions }
}

fn map_properties(definitions: &[Definition], env: &Env) -> MapProperties {
    let mut properties = MapProperties::default();
    for definition in definitions.iter().filter(|d| d.is_named("Map")) {
        for rule in definition.rules() {
            match env.evaluate(&rule.value) {
                Ok(value) => properties.insert_first(&rule.name, value),
                Err(err) => tracing::warn!("Ignoring Map property '{}': {}", rule.name, err),
            }
        }
    }
    properties
}

/// Pre-order walk; [`assemble`] consumes results in the same order.
fn collect_layers<'a>(layers: &'a [LayerSpec], out: &mut Vec<&'a LayerSpec>) {
    for layer in layers {
        out.push(layer);
        collect_layers(&layer.layers, out);
    }
}

fn assemble(specs: &[LayerSpec], compiled: &mut impl Iterator<Item = MapLayer>) -> Vec<MapLayer> {
    let mut layers = Vec::with_capacity(specs.len());
    for spec in specs {
        let Some(mut layer) = compiled.next() else {
            break;
        };
        layer.children = assemble(&spec.layers, compiled);
        layers.push(layer);
    }
    layers
}
