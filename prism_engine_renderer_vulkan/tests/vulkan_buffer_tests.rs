//! Integration tests for the Vulkan buffer backend
//!
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_buffer_tests -- --ignored

use prism_engine::prism::{
    BufferAccessMode, BufferState, BufferUsageHint, Config, Error,
    GraphicsContext, StorageBuffer, TransferBuffer, TransferDirection,
};
use prism_engine_renderer_vulkan::prism::{VulkanBufferObjectProvider, VulkanGraphicsContext};

fn create_test_context() -> GraphicsContext {
    let config = Config {
        enable_validation: false,
        app_name: "Vulkan Buffer Test".to_string(),
        ..Config::default()
    };
    VulkanGraphicsContext::new(config).unwrap()
}

fn read_all(gc: &GraphicsContext, buffer: &StorageBuffer) -> Vec<u8> {
    let readback = TransferBuffer::for_direction(gc, buffer.size(), TransferDirection::Download).unwrap();
    buffer.copy_to(gc, &readback, 0, 0, None).unwrap();
    readback.read_back(gc, 0, buffer.size()).unwrap()
}

// ============================================================================
// CREATION TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_create_storage_buffer() {
    let gc = create_test_context();
    let buffer = StorageBuffer::new(&gc, 256, 16, BufferUsageHint::DynamicDraw).unwrap();

    assert_eq!(buffer.size(), 256);
    assert_eq!(buffer.element_count(), 16);
    let provider = buffer.provider_as::<VulkanBufferObjectProvider>().unwrap();
    assert!(provider.vk_buffer().is_some());
    assert!(provider.is_registered());
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_zero_sized_buffer() {
    let gc = create_test_context();
    let buffer = StorageBuffer::new(&gc, 0, 4, BufferUsageHint::DynamicDraw).unwrap();

    let provider = buffer.provider_as::<VulkanBufferObjectProvider>().unwrap();
    assert!(provider.vk_buffer().is_none());
    assert_eq!(buffer.get_provider().unwrap().state(), BufferState::Allocated);
    assert!(matches!(buffer.lock(&gc, BufferAccessMode::ReadOnly), Err(Error::NotLockable(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_oversized_buffer_fails() {
    let config = Config {
        enable_validation: false,
        max_buffer_size: 1024,
        ..Config::default()
    };
    let gc = VulkanGraphicsContext::new(config).unwrap();

    let result = StorageBuffer::new(&gc, 2048, 4, BufferUsageHint::DynamicDraw);
    assert!(matches!(result, Err(Error::OutOfMemory)));
}

// ============================================================================
// LOCK TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_lock_write_and_read_back() {
    let gc = create_test_context();
    let buffer = StorageBuffer::new(&gc, 8, 1, BufferUsageHint::DynamicDraw).unwrap();

    buffer.lock(&gc, BufferAccessMode::WriteOnly).unwrap();
    let mapped = buffer.get_data().unwrap();
    unsafe { mapped.as_mut_slice() }.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    buffer.unlock().unwrap();

    assert_eq!(read_all(&gc, &buffer), vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_device_local_lock_reads_contents() {
    let gc = create_test_context();
    let data: Vec<u8> = (0..16).collect();
    let buffer = StorageBuffer::with_data(&gc, &data, 4, BufferUsageHint::StaticDraw).unwrap();
    let provider = buffer.provider_as::<VulkanBufferObjectProvider>().unwrap();

    buffer.lock(&gc, BufferAccessMode::ReadOnly).unwrap();
    assert!(provider.has_shadow());
    assert_eq!(buffer.get_provider().unwrap().state(), BufferState::Mapped);
    assert_eq!(unsafe { buffer.get_data().unwrap().as_slice() }, &data[..]);
    buffer.unlock().unwrap();

    assert!(!provider.has_shadow());
    assert_eq!(buffer.get_provider().unwrap().state(), BufferState::Allocated);
    assert_eq!(read_all(&gc, &buffer), data);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_device_local_lock_writes_back() {
    let gc = create_test_context();
    let buffer = StorageBuffer::with_data(&gc, &[1; 8], 1, BufferUsageHint::StaticCopy).unwrap();

    buffer.lock(&gc, BufferAccessMode::ReadWrite).unwrap();
    let mapped = buffer.get_data().unwrap();
    let bytes = unsafe { mapped.as_mut_slice() };
    assert_eq!(bytes, &[1; 8]);
    bytes[4..].copy_from_slice(&[5, 6, 7, 8]);
    buffer.unlock().unwrap();

    assert_eq!(read_all(&gc, &buffer), vec![1, 1, 1, 1, 5, 6, 7, 8]);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_device_local_write_discard_zeroes() {
    let gc = create_test_context();
    let buffer = StorageBuffer::with_data(&gc, &[7; 8], 1, BufferUsageHint::StaticDraw).unwrap();

    buffer.lock(&gc, BufferAccessMode::WriteDiscard).unwrap();
    let mapped = buffer.get_data().unwrap();
    assert_eq!(unsafe { mapped.as_slice() }, &[0; 8]);
    (unsafe { mapped.as_mut_slice() })[0] = 42;
    buffer.unlock().unwrap();

    assert_eq!(read_all(&gc, &buffer), vec![42, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_dispose_while_locked_releases_shadow() {
    let gc = create_test_context();
    let buffer = StorageBuffer::with_data(&gc, &[2; 32], 4, BufferUsageHint::StaticDraw).unwrap();
    let provider = buffer.provider_as::<VulkanBufferObjectProvider>().unwrap();

    buffer.lock(&gc, BufferAccessMode::ReadWrite).unwrap();
    assert!(provider.has_shadow());
    buffer.get_provider().unwrap().dispose();

    assert!(!provider.has_shadow());
    assert_eq!(buffer.get_provider().unwrap().state(), BufferState::Disposed);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_double_lock_rejected() {
    let gc = create_test_context();
    let buffer = StorageBuffer::new(&gc, 4, 4, BufferUsageHint::StreamDraw).unwrap();

    buffer.lock(&gc, BufferAccessMode::WriteDiscard).unwrap();
    assert!(matches!(buffer.lock(&gc, BufferAccessMode::ReadWrite), Err(Error::AlreadyLocked(_))));
    buffer.unlock().unwrap();
    assert!(matches!(buffer.unlock(), Err(Error::NotLocked(_))));
}

// ============================================================================
// UPLOAD AND COPY TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_upload_sub_data_staged() {
    let gc = create_test_context();
    let buffer = StorageBuffer::with_data(&gc, &[0; 8], 1, BufferUsageHint::StaticDraw).unwrap();

    buffer.upload_sub_data(&gc, 4, &[5, 6, 7, 8]).unwrap();
    assert!(matches!(buffer.upload_sub_data(&gc, 6, &[1, 2, 3]), Err(Error::OutOfRange(_))));
    assert_eq!(read_all(&gc, &buffer), vec![0, 0, 0, 0, 5, 6, 7, 8]);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_copy_from_and_to_offsets() {
    let gc = create_test_context();
    let staging = TransferBuffer::with_data(&gc, &[1, 2, 3, 4], TransferDirection::Upload, BufferUsageHint::StreamDraw).unwrap();
    let buffer = StorageBuffer::with_data(&gc, &[0; 8], 1, BufferUsageHint::StaticCopy).unwrap();

    buffer.copy_from(&gc, &staging, 2, 1, Some(3)).unwrap();

    let readback = TransferBuffer::new(&gc, 4, TransferDirection::Download, BufferUsageHint::StreamRead).unwrap();
    buffer.copy_to(&gc, &readback, 1, 2, None).unwrap();
    assert_eq!(readback.read_back(&gc, 1, 3).unwrap(), vec![2, 3, 4]);

    assert!(matches!(
        buffer.copy_from(&gc, &staging, 6, 0, Some(4)),
        Err(Error::OutOfRange(_))
    ));
}

// ============================================================================
// DISPOSAL TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_dispose_is_idempotent() {
    let gc = create_test_context();
    let buffer = StorageBuffer::new(&gc, 64, 4, BufferUsageHint::StreamDraw).unwrap();
    let provider = buffer.get_provider().unwrap();

    provider.dispose();
    provider.dispose();
    assert_eq!(provider.state(), BufferState::Disposed);
    assert!(matches!(buffer.lock(&gc, BufferAccessMode::ReadOnly), Err(Error::Disposed(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_last_context_disposes_buffers() {
    let gc = create_test_context();
    let shared_gc = VulkanGraphicsContext::create_shared(&gc).unwrap();
    let buffer = StorageBuffer::new(&shared_gc, 32, 4, BufferUsageHint::DynamicDraw).unwrap();

    drop(shared_gc);
    assert!(!buffer.get_provider().unwrap().is_disposed());

    drop(gc);
    assert!(buffer.get_provider().unwrap().is_disposed());
}
