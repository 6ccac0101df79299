mod action_resolver;
mod detection_engine;
mod script_catalog;

pub use action_resolver::ActionResolver;
pub use detection_engine::{DetectionEngine, EngineCatalog};
pub use script_catalog::{ScriptCatalog, ScriptVars};
