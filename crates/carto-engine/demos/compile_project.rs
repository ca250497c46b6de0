//! Compile a project file and print a summary of its layers.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p carto-engine --example compile_project -- project.mml
//! ```

use std::path::PathBuf;

use anyhow::Context;
use carto_engine::{EngineConfig, MapLayer, MapProcessor};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: compile_project <project.mml> [renderer]")?;
    let renderer = std::env::args().nth(2).unwrap_or_else(|| "mapnik".to_string());

    let processor = MapProcessor::new(EngineConfig::new().with_translator(renderer));
    let map = processor
        .compile_file(&path)
        .with_context(|| format!("compiling {}", path.display()))?;

    println!("Map: {}", map.name);
    if let Some(srs) = &map.srs {
        println!("  srs: {srs}");
    }
    for (name, value) in map.properties.iter() {
        println!("  {name}: {value}");
    }
    for set in &map.font_sets {
        println!("  font set {}: {}", set.name, set.faces.join(", "));
    }
    for layer in &map.layers {
        print_layer(layer, 0);
    }
    Ok(())
}

fn print_layer(layer: &MapLayer, depth: usize) {
    let indent = "  ".repeat(depth);
    match &layer.error {
        Some(err) => println!("{indent}{} (failed: {err})", layer.name),
        None => println!("{indent}{} ({} styles)", layer.name, layer.styles.len()),
    }
    for style in &layer.styles {
        println!("{indent}  style {}: {} rules", style.name, style.rules.len());
        for rule in &style.rules {
            println!(
                "{indent}    z{}-{} {} symbolizers {}",
                rule.zoom.start,
                rule.zoom.end,
                rule.symbolizers.len(),
                rule.filter.as_deref().unwrap_or("")
            );
        }
    }
    for child in &layer.children {
        print_layer(child, depth + 1);
    }
}
