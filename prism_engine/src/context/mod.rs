/// Context module - graphics contexts, pool-shared state and the disposal registry

pub mod config;
pub mod disposal_registry;
pub mod graphics_context;
pub mod shared_context_data;

pub use config::*;
pub use disposal_registry::*;
pub use graphics_context::*;
pub use shared_context_data::*;
