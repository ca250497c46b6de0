//! carto-engine
//!
//! Compiles TileMill/Kosmtik style projects: loads the project descriptor and
//! its stylesheets, then builds the styles of every layer in parallel.

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod config;
pub mod error;
pub mod parallel;
pub mod processor;
pub mod project;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use parallel::WorkerPool;
pub use processor::{CompiledMap, MapLayer, MapProcessor, MapProperties};
pub use project::{LayerProperties, LayerSpec, Project, StylesheetSource};
