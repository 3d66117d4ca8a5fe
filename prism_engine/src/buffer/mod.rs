/// Buffer module - GPU buffer objects and their backend providers

pub mod binding_guard;
pub mod buffer_object_provider;
pub mod buffer_usage;
pub mod copy_range;
pub mod storage_buffer;
pub mod transfer_buffer;

pub use binding_guard::*;
pub use buffer_object_provider::*;
pub use buffer_usage::*;
pub use copy_range::*;
pub use storage_buffer::*;
pub use transfer_buffer::*;
