//! Unit tests for Vulkan translation functions
//!
//! Pure mappings, no GPU required.

use super::*;

// ============================================================================
// BINDING TARGET CONVERSION TESTS
// ============================================================================

#[test]
fn test_usage_flags_for_draw_targets() {
    assert!(usage_flags_for_target(BindingTarget::Array).contains(vk::BufferUsageFlags::VERTEX_BUFFER));
    assert!(usage_flags_for_target(BindingTarget::ElementArray).contains(vk::BufferUsageFlags::INDEX_BUFFER));
    assert!(usage_flags_for_target(BindingTarget::Uniform).contains(vk::BufferUsageFlags::UNIFORM_BUFFER));
    assert!(usage_flags_for_target(BindingTarget::ShaderStorage).contains(vk::BufferUsageFlags::STORAGE_BUFFER));
}

#[test]
fn test_every_target_can_be_copied() {
    let transfer = vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST;
    for target in BindingTarget::ALL {
        assert!(usage_flags_for_target(target).contains(transfer), "{:?}", target);
    }
}

#[test]
fn test_copy_targets_have_no_shader_role() {
    let transfer = vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST;
    for target in [
        BindingTarget::PixelPack,
        BindingTarget::PixelUnpack,
        BindingTarget::CopyRead,
        BindingTarget::CopyWrite,
    ] {
        assert_eq!(usage_flags_for_target(target), transfer);
    }
}

// ============================================================================
// MEMORY LOCATION TESTS
// ============================================================================

#[test]
fn test_read_hints_are_host_readable() {
    for usage in [BufferUsageHint::StreamRead, BufferUsageHint::StaticRead, BufferUsageHint::DynamicRead] {
        assert_eq!(memory_location_for_usage(usage), MemoryLocation::GpuToCpu);
    }
}

#[test]
fn test_copy_hints_stay_on_gpu() {
    for usage in [BufferUsageHint::StreamCopy, BufferUsageHint::StaticCopy, BufferUsageHint::DynamicCopy] {
        assert_eq!(memory_location_for_usage(usage), MemoryLocation::GpuOnly);
    }
}

#[test]
fn test_draw_hints() {
    assert_eq!(memory_location_for_usage(BufferUsageHint::StaticDraw), MemoryLocation::GpuOnly);
    assert_eq!(memory_location_for_usage(BufferUsageHint::StreamDraw), MemoryLocation::CpuToGpu);
    assert_eq!(memory_location_for_usage(BufferUsageHint::DynamicDraw), MemoryLocation::CpuToGpu);
}

#[test]
fn test_transfer_locations() {
    assert_eq!(memory_location_for_transfer(TransferDirection::Upload), MemoryLocation::CpuToGpu);
    assert_eq!(memory_location_for_transfer(TransferDirection::Download), MemoryLocation::GpuToCpu);
}
