/// GpuContext - Vulkan objects shared by a context pool and all of its buffers
///
/// Holds the device, the allocator and the queue used for one-shot transfer
/// submissions. `teardown` destroys everything in dependency order; the
/// context is unusable (lost) afterwards.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use prism_engine::prism::{Error, Result};
use prism_engine::{engine_err, engine_error, engine_warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Shared GPU context for all Vulkan buffers of a pool
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// Graphics queue used for transfer submissions
    pub graphics_queue: vk::Queue,

    pub graphics_queue_family: u32,

    /// Reusable command pool for one-shot transfers
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    upload_command_pool: Mutex<vk::CommandPool>,

    /// GPU memory allocator, taken at teardown before the device goes away
    allocator: Mutex<Option<Allocator>>,

    /// Largest single allocation accepted
    pub max_buffer_size: usize,

    lost: AtomicBool,

    instance: ash::Instance,
    _entry: ash::Entry,

    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
        max_buffer_size: usize,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        Self {
            device,
            graphics_queue,
            graphics_queue_family,
            upload_command_pool: Mutex::new(upload_command_pool),
            allocator: Mutex::new(Some(allocator)),
            max_buffer_size,
            lost: AtomicBool::new(false),
            instance,
            _entry: entry,
            debug_utils_loader,
            debug_messenger,
        }
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// `ContextActivationFailed` once the device is gone
    pub fn throw_if_lost(&self) -> Result<()> {
        if self.is_lost() {
            return Err(Error::ContextActivationFailed("Vulkan device destroyed".to_string()));
        }
        Ok(())
    }

    fn with_allocator<R>(&self, f: impl FnOnce(&mut Allocator) -> Result<R>) -> Result<R> {
        let mut guard = self.allocator.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_mut() {
            Some(allocator) => f(allocator),
            None => Err(Error::ContextActivationFailed("Vulkan allocator destroyed".to_string())),
        }
    }

    /// Create a buffer and bind freshly allocated memory to it
    pub fn allocate_buffer(
        &self,
        name: &str,
        size: usize,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Result<(vk::Buffer, Allocation)> {
        self.throw_if_lost()?;
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size as vk::DeviceSize)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create buffer of size {} bytes: {:?}", size, e))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);

            let allocation = self.with_allocator(|allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name,
                        requirements,
                        location,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!("prism::vulkan", "Out of GPU memory for buffer (required: {:.2} MB)", size_mb);
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(error) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(error);
                }
            };

            if let Err(e) = self.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.free_buffer(buffer, allocation);
                return Err(engine_err!("prism::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            Ok((buffer, allocation))
        }
    }

    /// Release a buffer created by `allocate_buffer`
    pub fn free_buffer(&self, buffer: vk::Buffer, allocation: Allocation) {
        if self.is_lost() {
            engine_warn!("prism::vulkan", "Skipping buffer release: device destroyed");
            return;
        }
        let freed = self.with_allocator(|allocator| {
            allocator
                .free(allocation)
                .map_err(|e| Error::BackendError(format!("{:?}", e)))
        });
        if let Err(error) = freed {
            engine_warn!("prism::vulkan", "Failed to free buffer allocation: {}", error);
        }
        unsafe {
            self.device.destroy_buffer(buffer, None);
        }
    }

    /// Record commands into a one-shot command buffer, submit and wait
    pub fn one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        self.throw_if_lost()?;
        let pool = self.upload_command_pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to allocate one-shot command buffer: {:?}", e))?;
            let command_buffer = command_buffers[0];

            let result = self.submit_and_wait(command_buffer, record);
            self.device.free_command_buffers(*pool, &command_buffers);
            result
        }
    }

    unsafe fn submit_and_wait<F>(&self, command_buffer: vk::CommandBuffer, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        self.device.begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| engine_err!("prism::vulkan", "Failed to begin one-shot command buffer: {:?}", e))?;

        record(&self.device, command_buffer);

        self.device.end_command_buffer(command_buffer)
            .map_err(|e| engine_err!("prism::vulkan", "Failed to end one-shot command buffer: {:?}", e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        self.device.queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
            .map_err(|e| engine_err!("prism::vulkan", "Failed to submit one-shot commands: {:?}", e))?;

        self.device.queue_wait_idle(self.graphics_queue)
            .map_err(|e| engine_err!("prism::vulkan", "Failed to wait for one-shot commands: {:?}", e))?;

        Ok(())
    }

    /// Destroy every Vulkan object. Buffers must have been released first.
    ///
    /// Idempotent; the context reports lost afterwards.
    pub(crate) fn teardown(&self) {
        if self.lost.swap(true, Ordering::AcqRel) {
            return;
        }
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Upload command pool
            {
                let mut pool = self.upload_command_pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 2. Allocator: free VkDeviceMemory pages BEFORE destroying the device
            drop(
                self.allocator
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .take(),
            );

            // 3. Stop routing validation messages, then destroy the messenger
            crate::debug::cleanup_debug_tracking();
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, &self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            // 4. Device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
