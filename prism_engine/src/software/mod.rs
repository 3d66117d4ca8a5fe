/// Software backend - CPU emulation of a GL-style buffer API (no GPU required)

pub mod software_buffer_object_provider;
pub mod software_device;
pub mod software_graphics_context;

pub use software_buffer_object_provider::*;
pub use software_device::*;
pub use software_graphics_context::*;
