//! Things 3 specific bridge layer.
//!
//! Everything that knows about Things 3 lives here:
//! - `reference` - canonical object reference tokens
//! - `properties` - host property-name mapping and value normalization
//! - `commands` - todo/project/area/tag command generation
//! - `orchestrator` - execution facade over the generic AppleScript layer
//! - `api` - typed entity operations

pub mod api;
pub mod commands;
pub mod orchestrator;
pub mod properties;
pub mod reference;

pub use api::ThingsApi;
pub use orchestrator::Orchestrator;
pub use reference::{ObjectRef, RefKind};
