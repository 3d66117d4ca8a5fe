/*!
# Prism Engine - Vulkan Backend

Vulkan implementation of the Prism buffer-object traits.

Uses Ash for the Vulkan bindings and gpu-allocator for memory management.
Contexts are headless: a device and a graphics queue, no surface. All
transfers are one-shot command buffers waited on before returning.
*/

mod debug;
mod vulkan_buffer;
mod vulkan_context;
mod vulkan_format;
mod vulkan_graphics_context;

pub mod prism {
    pub use crate::vulkan_graphics_context::VulkanGraphicsContext;
    pub use crate::vulkan_buffer::{NativeBuffer, VulkanBufferObjectProvider};
    pub use crate::vulkan_context::GpuContext;
    pub use crate::vulkan_format::{
        memory_location_for_transfer, memory_location_for_usage, usage_flags_for_target,
    };

    // Validation layer statistics
    pub use crate::debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
}
