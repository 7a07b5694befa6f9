pub mod envelope;
pub mod errors;
pub mod host;
pub mod images;

pub use errors::{PluginError, PluginResult};
