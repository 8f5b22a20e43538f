//! Static AMD/CommonJS module tracer.
//!
//! Given an entry module id and a loader config, `strata` discovers
//! the complete, dependency-ordered set of modules a runtime loader
//! would load, without executing any module code, and can rewrite
//! each module's contents so the resulting bundle is self-consistent.
//!
//! The main entry point is [`trace`]; dependency extraction is also
//! usable standalone through the [`analysis`] module.

pub mod analysis;
pub mod config;
pub mod context;
pub mod convert;
mod engine;
pub mod error;
pub mod loader;
pub mod plugin;
pub mod resolver;
pub mod swc_utils;
pub mod trace;
pub mod transform;

pub use config::{find_config, LoaderConfig};
pub use context::{Context, ModuleRecord, ModuleState, TraceCache, TracedModule};
pub use error::TraceError;
pub use loader::{ContentLoader, DiskLoader, TraceLogger};
pub use plugin::{BuildPlugin, ModuleWriter, PluginCapabilities};
pub use resolver::ModuleMap;
pub use trace::{trace, TraceOptions, TraceResult};
pub use transform::{all_write_transforms, WriteTransformOptions};
