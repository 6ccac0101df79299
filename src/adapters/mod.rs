pub mod action_pins;
pub mod embedded_assets;
pub mod engines;
pub mod script_assets;

pub use action_pins::{ActionPinCache, EMBEDDED};
pub use engines::BuiltinEngines;
pub use script_assets::EmbeddedScriptCatalog;
