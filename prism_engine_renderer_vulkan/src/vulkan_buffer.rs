/// VulkanBufferObjectProvider - buffer object of the Vulkan backend
///
/// Host-visible buffers are persistently mapped by gpu-allocator, so `lock`
/// hands out the allocator's pointer. Device-local buffers (`StaticDraw`,
/// `*Copy`) are locked through a host-visible shadow copy that `unlock`
/// writes back; plain writes to them go through a staging buffer.
/// Zero-sized buffers own no Vulkan buffer at all.

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use prism_engine::prism::{
    resolve_copy_size, BindingTarget, BufferAccessMode, BufferObjectProvider, BufferObjectState,
    BufferState, BufferUsageHint, Disposable, Error, GraphicsContext, MapFlags, MappedPtr, Registration,
    Result, SharedContextData, TransferBuffer, TransferBufferProvider, TransferDirection,
};
use prism_engine::{engine_debug, engine_error};
use std::any::Any;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{memory_location_for_transfer, memory_location_for_usage, usage_flags_for_target};
use crate::vulkan_graphics_context::VulkanGraphicsContext;

/// Vulkan buffer plus its memory
pub struct NativeBuffer {
    pub buffer: vk::Buffer,
    pub(crate) allocation: Allocation,
    pub location: MemoryLocation,
}

impl NativeBuffer {
    fn host_ptr(&self) -> Option<NonNull<u8>> {
        self.allocation.mapped_ptr().map(|ptr| ptr.cast::<u8>())
    }
}

/// Host-visible copy of a device-local buffer, alive between lock and unlock
struct Shadow {
    buffer: NativeBuffer,
    flags: MapFlags,
}

pub struct VulkanBufferObjectProvider {
    gpu: Arc<GpuContext>,
    direction: Option<TransferDirection>,
    state: Mutex<BufferObjectState<NativeBuffer>>,
    /// Locked after `state`, never before
    shadow: Mutex<Option<Shadow>>,
    registration: Registration,
}

impl VulkanBufferObjectProvider {
    /// Allocate an uninitialized provider and register it with `shared`
    pub fn new(
        gpu: Arc<GpuContext>,
        shared: &Arc<SharedContextData>,
        direction: Option<TransferDirection>,
    ) -> Arc<Self> {
        let target = direction.map_or(BindingTarget::Array, |direction| direction.binding_target());
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let disposable: Weak<dyn Disposable> = weak.clone();
            Self {
                gpu,
                direction,
                state: Mutex::new(BufferObjectState::new(None, target)),
                shadow: Mutex::new(None),
                registration: Registration::new(shared, disposable),
            }
        })
    }

    fn inner(&self) -> MutexGuard<'_, BufferObjectState<NativeBuffer>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn shadow_slot(&self) -> MutexGuard<'_, Option<Shadow>> {
        self.shadow.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True while a device-local buffer is locked through a shadow copy
    pub fn has_shadow(&self) -> bool {
        self.shadow_slot().is_some()
    }

    /// Vulkan buffer handle, once created with a non-zero size
    pub fn vk_buffer(&self) -> Option<vk::Buffer> {
        self.inner().handle().map(|native| native.buffer)
    }

    /// Memory location of the current allocation
    pub fn memory_location(&self) -> Option<MemoryLocation> {
        self.inner().handle().map(|native| native.location)
    }

    pub fn gpu(&self) -> &Arc<GpuContext> {
        &self.gpu
    }

    pub fn is_registered(&self) -> bool {
        self.registration.key().is_some()
    }

    fn location_for(&self, usage: BufferUsageHint) -> MemoryLocation {
        match self.direction {
            Some(direction) => memory_location_for_transfer(direction),
            None => memory_location_for_usage(usage),
        }
    }

    /// Activate `gc`, which must share this provider's device
    fn activate(&self, gc: &GraphicsContext) -> Result<()> {
        let context = VulkanGraphicsContext::from_context(gc)?;
        if !Arc::ptr_eq(context.gpu(), &self.gpu) {
            return Err(Error::InvalidResource(format!(
                "{:?} does not share this buffer's context pool",
                gc
            )));
        }
        gc.make_current()
    }

    /// Write `data` at `offset`, in place when host-visible, staged otherwise
    fn write_bytes(&self, native: &NativeBuffer, offset: usize, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        match native.host_ptr() {
            Some(ptr) => {
                // SAFETY: the caller checked `offset + data.len()` against the allocation size
                unsafe {
                    std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr().add(offset), data.len());
                }
                Ok(())
            }
            None => self.staged_write(native.buffer, offset, data),
        }
    }

    fn staged_write(&self, destination: vk::Buffer, offset: usize, data: &[u8]) -> Result<()> {
        let (staging, allocation) = self.gpu.allocate_buffer(
            "prism staging buffer",
            data.len(),
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        )?;

        let result = match allocation.mapped_ptr() {
            Some(ptr) => {
                unsafe {
                    std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>().as_ptr(), data.len());
                }
                let region = vk::BufferCopy::default()
                    .src_offset(0)
                    .dst_offset(offset as vk::DeviceSize)
                    .size(data.len() as vk::DeviceSize);
                self.gpu.one_shot(|device, command_buffer| unsafe {
                    device.cmd_copy_buffer(command_buffer, staging, destination, &[region]);
                })
            }
            None => {
                engine_error!("prism::vulkan", "Staging buffer is not host-visible");
                Err(Error::BackendError("Staging buffer is not host-visible".to_string()))
            }
        };

        self.gpu.free_buffer(staging, allocation);
        result
    }

    /// Vulkan buffer and size of a buffer taking part in a copy
    ///
    /// The handle is `None` for zero-sized buffers.
    fn copy_operand(&self, operation: &str) -> Result<(Option<vk::Buffer>, usize)> {
        let state = self.inner();
        state.throw_if_disposed(operation)?;
        state.throw_if_mapped(operation)?;
        if state.state() == BufferState::Uninitialized {
            return Err(Error::InvalidResource(format!("{}: buffer was never created", operation)));
        }
        Ok((state.handle().map(|native| native.buffer), state.size()))
    }

    fn peer<'a>(&self, buffer: &'a TransferBuffer) -> Result<&'a VulkanBufferObjectProvider> {
        let peer = buffer.provider_as::<VulkanBufferObjectProvider>()?;
        if std::ptr::eq(peer, self) {
            return Err(Error::InvalidResource("copy between a buffer and itself".to_string()));
        }
        if !Arc::ptr_eq(&peer.gpu, &self.gpu) {
            return Err(Error::InvalidResource("copy across context pools".to_string()));
        }
        Ok(peer)
    }

    /// Record and wait for a `vkCmdCopyBuffer` of the resolved range
    fn copy_between(
        &self,
        gc: &GraphicsContext,
        (source, source_size): (Option<vk::Buffer>, usize),
        (destination, destination_size): (Option<vk::Buffer>, usize),
        dest_pos: usize,
        src_pos: usize,
        size: Option<usize>,
    ) -> Result<usize> {
        let count = resolve_copy_size(destination_size, dest_pos, source_size, src_pos, size)?;
        self.activate(gc)?;
        if count == 0 {
            return Ok(0);
        }
        let (Some(source), Some(destination)) = (source, destination) else {
            return Err(Error::InvalidResource("copy: buffer has no storage".to_string()));
        };

        self.copy_native(source, destination, src_pos, dest_pos, count)?;
        Ok(count)
    }

    /// One-shot `vkCmdCopyBuffer`, made visible to host reads and later transfers
    fn copy_native(
        &self,
        source: vk::Buffer,
        destination: vk::Buffer,
        src_offset: usize,
        dst_offset: usize,
        count: usize,
    ) -> Result<()> {
        let region = vk::BufferCopy::default()
            .src_offset(src_offset as vk::DeviceSize)
            .dst_offset(dst_offset as vk::DeviceSize)
            .size(count as vk::DeviceSize);
        self.gpu.one_shot(|device, command_buffer| unsafe {
            device.cmd_copy_buffer(command_buffer, source, destination, &[region]);

            let barrier = vk::MemoryBarrier::default()
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::HOST_READ | vk::AccessFlags::TRANSFER_READ);
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::HOST | vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[barrier],
                &[],
                &[],
            );
        })
    }

    /// Create the shadow of a device-local buffer and return its host pointer
    ///
    /// The current contents are copied in unless `flags` invalidate them.
    fn begin_shadow(&self, native: &NativeBuffer, size: usize, flags: MapFlags) -> Result<NonNull<u8>> {
        let (buffer, allocation) = self.gpu.allocate_buffer(
            "prism lock shadow",
            size,
            vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuToCpu,
        )?;
        let shadow = NativeBuffer {
            buffer,
            allocation,
            location: MemoryLocation::GpuToCpu,
        };

        let Some(ptr) = shadow.host_ptr() else {
            self.gpu.free_buffer(shadow.buffer, shadow.allocation);
            return Err(Error::NotLockable("shadow memory is not host-visible".to_string()));
        };
        if !flags.contains(MapFlags::INVALIDATE_BUFFER) {
            if let Err(error) = self.copy_native(native.buffer, shadow.buffer, 0, 0, size) {
                self.gpu.free_buffer(shadow.buffer, shadow.allocation);
                return Err(error);
            }
        }

        *self.shadow_slot() = Some(Shadow { buffer: shadow, flags });
        Ok(ptr)
    }

    /// Write a writable shadow back into `native`, then free it
    ///
    /// A failed write-back keeps the shadow for a later `unlock` or `dispose`.
    fn end_shadow(&self, native: Option<&NativeBuffer>, size: usize) -> Result<()> {
        let mut slot = self.shadow_slot();
        let Some(shadow) = slot.as_ref() else {
            return Ok(());
        };
        if let (Some(native), true) = (native, shadow.flags.contains(MapFlags::WRITE)) {
            self.copy_native(shadow.buffer.buffer, native.buffer, 0, 0, size)?;
        }
        if let Some(shadow) = slot.take() {
            self.gpu.free_buffer(shadow.buffer.buffer, shadow.buffer.allocation);
        }
        Ok(())
    }
}

impl BufferObjectProvider for VulkanBufferObjectProvider {
    fn create(
        &self,
        data: Option<&[u8]>,
        size: usize,
        usage: BufferUsageHint,
        target: BindingTarget,
    ) -> Result<()> {
        let mut state = self.inner();
        state.check_create(data, size)?;
        self.gpu.throw_if_lost()?;
        if size > self.gpu.max_buffer_size {
            engine_error!(
                "prism::vulkan",
                "Buffer of {} bytes exceeds the {} byte limit",
                size,
                self.gpu.max_buffer_size
            );
            return Err(Error::OutOfMemory);
        }

        let native = if size == 0 {
            None
        } else {
            let location = self.location_for(usage);
            let (buffer, allocation) =
                self.gpu.allocate_buffer("prism buffer", size, usage_flags_for_target(target), location)?;
            let native = NativeBuffer { buffer, allocation, location };
            if let Some(data) = data {
                if let Err(error) = self.write_bytes(&native, 0, data) {
                    self.gpu.free_buffer(native.buffer, native.allocation);
                    return Err(error);
                }
            }
            Some(native)
        };

        let previous = match native {
            Some(native) => state.set_handle(native),
            None => state.take_handle(),
        };
        if let Some(previous) = previous {
            self.gpu.free_buffer(previous.buffer, previous.allocation);
        }
        state.mark_allocated(size, usage, target);
        engine_debug!("prism::vulkan", "Buffer created ({} bytes, {:?})", size, usage);
        Ok(())
    }

    fn lock(&self, gc: &GraphicsContext, access: BufferAccessMode) -> Result<()> {
        let mut state = self.inner();
        state.check_lock()?;
        let native = match state.handle() {
            Some(native) => native,
            None => return Err(Error::NotLockable("buffer has no storage".to_string())),
        };
        self.activate(gc)?;

        let flags = access.map_flags();
        let size = state.size();
        let ptr = match native.host_ptr() {
            Some(ptr) => ptr,
            None => self.begin_shadow(native, size, flags)?,
        };
        let mapped = MappedPtr::new(ptr, size, access);
        if flags.contains(MapFlags::INVALIDATE_BUFFER) {
            // SAFETY: the mapping covers the whole allocation and nothing else views it yet
            unsafe { mapped.as_mut_slice().fill(0) };
        }
        state.begin_mapping(gc.clone(), mapped);
        Ok(())
    }

    fn unlock(&self) -> Result<()> {
        let mut state = self.inner();
        let gc = state.lock_context()?;

        let size = state.size();
        let result = gc
            .make_current()
            .and_then(|()| self.end_shadow(state.handle(), size));
        // A failed unlock keeps the mapping; dispose still releases it
        let mapping = if result.is_ok() { state.end_mapping() } else { None };
        drop(state);
        drop(mapping);
        drop(gc);
        result
    }

    fn get_data(&self) -> Result<MappedPtr> {
        let state = self.inner();
        state.throw_if_disposed("get_data")?;
        state.mapped()
    }

    fn upload_data(&self, gc: &GraphicsContext, offset: usize, data: &[u8]) -> Result<()> {
        let state = self.inner();
        state.throw_if_disposed("upload_data")?;
        state.throw_if_mapped("upload_data")?;
        if state.state() == BufferState::Uninitialized {
            return Err(Error::InvalidResource("upload_data: buffer was never created".to_string()));
        }
        state.check_range(offset, data.len(), "upload_data")?;
        self.activate(gc)?;

        match state.handle() {
            Some(native) => self.write_bytes(native, offset, data),
            None => Ok(()),
        }
    }

    fn copy_from(
        &self,
        gc: &GraphicsContext,
        buffer: &TransferBuffer,
        dest_pos: usize,
        src_pos: usize,
        size: Option<usize>,
    ) -> Result<()> {
        let source = self.peer(buffer)?.copy_operand("copy_from")?;
        let destination = self.copy_operand("copy_from")?;
        self.copy_between(gc, source, destination, dest_pos, src_pos, size)?;
        Ok(())
    }

    fn copy_to(
        &self,
        gc: &GraphicsContext,
        buffer: &TransferBuffer,
        dest_pos: usize,
        src_pos: usize,
        size: Option<usize>,
    ) -> Result<()> {
        let destination = self.peer(buffer)?.copy_operand("copy_to")?;
        let source = self.copy_operand("copy_to")?;
        self.copy_between(gc, source, destination, dest_pos, src_pos, size)?;
        Ok(())
    }

    fn dispose(&self) {
        let (native, mapping) = {
            let mut state = self.inner();
            let mapping = state.end_mapping();
            (state.take_for_dispose(), mapping)
        };

        if let Some(shadow) = self.shadow_slot().take() {
            self.gpu.free_buffer(shadow.buffer.buffer, shadow.buffer.allocation);
        }
        if let Some(native) = native {
            self.gpu.free_buffer(native.buffer, native.allocation);
        }
        self.registration.release();
        drop(mapping);
    }

    fn is_disposed(&self) -> bool {
        self.inner().is_disposed()
    }

    fn state(&self) -> BufferState {
        self.inner().state()
    }

    fn size(&self) -> usize {
        self.inner().size()
    }

    fn usage(&self) -> BufferUsageHint {
        self.inner().usage()
    }

    fn target(&self) -> BindingTarget {
        self.inner().target()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl TransferBufferProvider for VulkanBufferObjectProvider {
    fn direction(&self) -> TransferDirection {
        self.direction.unwrap_or(TransferDirection::Upload)
    }
}

impl Disposable for VulkanBufferObjectProvider {
    fn dispose(&self) {
        BufferObjectProvider::dispose(self);
    }
}

impl Drop for VulkanBufferObjectProvider {
    fn drop(&mut self) {
        BufferObjectProvider::dispose(self);
    }
}
