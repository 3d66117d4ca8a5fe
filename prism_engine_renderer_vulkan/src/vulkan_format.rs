/// Translation of engine buffer enumerations to Vulkan / gpu-allocator terms

use ash::vk;
use gpu_allocator::MemoryLocation;
use prism_engine::prism::{BindingTarget, BufferUsageHint, TransferDirection, UsageFrequency, UsageNature};

/// Buffer usage flags for a binding target
///
/// Every buffer additionally gets `TRANSFER_SRC | TRANSFER_DST` so it can take
/// part in copies and staged uploads.
pub fn usage_flags_for_target(target: BindingTarget) -> vk::BufferUsageFlags {
    let role = match target {
        BindingTarget::Array => vk::BufferUsageFlags::VERTEX_BUFFER,
        BindingTarget::ElementArray => vk::BufferUsageFlags::INDEX_BUFFER,
        BindingTarget::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BindingTarget::ShaderStorage => vk::BufferUsageFlags::STORAGE_BUFFER,
        // Written by shaders, consumed as vertices
        BindingTarget::TransformFeedback => {
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::VERTEX_BUFFER
        }
        BindingTarget::PixelPack
        | BindingTarget::PixelUnpack
        | BindingTarget::CopyRead
        | BindingTarget::CopyWrite => vk::BufferUsageFlags::empty(),
    };
    role | vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST
}

/// Memory placement for a usage hint
///
/// - `*Read`: GPU writes, host reads back -> `GpuToCpu`
/// - `*Copy` and `StaticDraw`: GPU only, host writes go through staging
/// - `StreamDraw` / `DynamicDraw`: host-visible, written in place
pub fn memory_location_for_usage(usage: BufferUsageHint) -> MemoryLocation {
    match (usage.nature(), usage.frequency()) {
        (UsageNature::Read, _) => MemoryLocation::GpuToCpu,
        (UsageNature::Copy, _) => MemoryLocation::GpuOnly,
        (UsageNature::Draw, UsageFrequency::Static) => MemoryLocation::GpuOnly,
        (UsageNature::Draw, UsageFrequency::Stream | UsageFrequency::Dynamic) => MemoryLocation::CpuToGpu,
    }
}

/// Transfer buffers are always host-visible, whatever their usage hint
pub fn memory_location_for_transfer(direction: TransferDirection) -> MemoryLocation {
    match direction {
        TransferDirection::Upload => MemoryLocation::CpuToGpu,
        TransferDirection::Download => MemoryLocation::GpuToCpu,
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
