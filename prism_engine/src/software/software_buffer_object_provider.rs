/// SoftwareBufferObjectProvider - buffer object of the software backend
///
/// Every bind goes through a [`BindingGuard`], so the buffer bound at a target
/// before a call is bound there again afterwards. Providers register with the
/// pool's disposal registry when constructed.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::{Error, Result};
use crate::context::{Disposable, GraphicsContext, Registration, SharedContextData};
use crate::buffer::{
    resolve_copy_size, BindingGuard, BindingTarget, BufferAccessMode, BufferObjectProvider,
    BufferObjectState, BufferState, BufferUsageHint, MappedPtr, TransferBuffer,
    TransferBufferProvider, TransferDirection,
};
use crate::software::{BufferName, SoftwareDevice, SoftwareGraphicsContext};
use crate::{engine_debug, engine_warn};

pub struct SoftwareBufferObjectProvider {
    device: Arc<SoftwareDevice>,
    direction: Option<TransferDirection>,
    state: Mutex<BufferObjectState<BufferName>>,
    registration: Registration,
}

impl SoftwareBufferObjectProvider {
    /// Allocate an uninitialized provider and register it with `shared`
    ///
    /// `direction` is `Some` for transfer buffers.
    pub fn new(
        device: Arc<SoftwareDevice>,
        shared: &Arc<SharedContextData>,
        direction: Option<TransferDirection>,
    ) -> Arc<Self> {
        let target = direction.map_or(BindingTarget::Array, |direction| direction.binding_target());
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let disposable: Weak<dyn Disposable> = weak.clone();
            Self {
                device,
                direction,
                state: Mutex::new(BufferObjectState::new(None, target)),
                registration: Registration::new(shared, disposable),
            }
        })
    }

    fn inner(&self) -> MutexGuard<'_, BufferObjectState<BufferName>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Native name, once created
    pub fn name(&self) -> Option<BufferName> {
        self.inner().handle().copied()
    }

    pub fn device(&self) -> &Arc<SoftwareDevice> {
        &self.device
    }

    pub fn is_registered(&self) -> bool {
        self.registration.key().is_some()
    }

    /// Activate `gc`, which must belong to this provider's pool
    fn activate(&self, gc: &GraphicsContext) -> Result<()> {
        let context = SoftwareGraphicsContext::from_context(gc)?;
        if !Arc::ptr_eq(context.device(), &self.device) {
            return Err(Error::InvalidResource(format!(
                "{:?} does not share this buffer's context pool",
                gc
            )));
        }
        gc.make_current()
    }

    /// Name and size of a buffer taking part in a copy
    fn copy_operand(&self, operation: &str) -> Result<(BufferName, usize)> {
        let state = self.inner();
        state.throw_if_disposed(operation)?;
        state.throw_if_mapped(operation)?;
        match state.handle() {
            Some(name) => Ok((*name, state.size())),
            None => Err(Error::InvalidResource(format!("{}: buffer was never created", operation))),
        }
    }

    fn peer<'a>(&self, buffer: &'a TransferBuffer) -> Result<&'a SoftwareBufferObjectProvider> {
        let peer = buffer.provider_as::<SoftwareBufferObjectProvider>()?;
        if std::ptr::eq(peer, self) {
            return Err(Error::InvalidResource("copy between a buffer and itself".to_string()));
        }
        if !Arc::ptr_eq(&peer.device, &self.device) {
            return Err(Error::InvalidResource("copy across context pools".to_string()));
        }
        Ok(peer)
    }

    /// Dual-bind and copy `size` bytes from `source` to `destination`
    fn copy_between(
        &self,
        gc: &GraphicsContext,
        (source, source_size): (BufferName, usize),
        (destination, destination_size): (BufferName, usize),
        dest_pos: usize,
        src_pos: usize,
        size: Option<usize>,
    ) -> Result<usize> {
        let count = resolve_copy_size(destination_size, dest_pos, source_size, src_pos, size)?;
        self.activate(gc)?;

        let _read = BindingGuard::bind(self.device.as_ref(), BindingTarget::CopyRead, source);
        let _write = BindingGuard::bind(self.device.as_ref(), BindingTarget::CopyWrite, destination);
        self.device.copy_buffer_sub_data(
            BindingTarget::CopyRead,
            BindingTarget::CopyWrite,
            src_pos,
            dest_pos,
            count,
        )?;
        Ok(count)
    }
}

impl BufferObjectProvider for SoftwareBufferObjectProvider {
    fn create(
        &self,
        data: Option<&[u8]>,
        size: usize,
        usage: BufferUsageHint,
        target: BindingTarget,
    ) -> Result<()> {
        let mut state = self.inner();
        state.check_create(data, size)?;
        self.device.set_active()?;

        let name = match state.handle() {
            Some(name) => *name,
            None => {
                let name = self.device.gen_buffer()?;
                state.set_handle(name);
                name
            }
        };

        let _binding = BindingGuard::bind(self.device.as_ref(), target, name);
        self.device.buffer_data(target, data, size, usage)?;
        state.mark_allocated(size, usage, target);
        engine_debug!("prism::software", "Buffer {} created ({} bytes, {:?})", name.raw(), size, usage);
        Ok(())
    }

    fn lock(&self, gc: &GraphicsContext, access: BufferAccessMode) -> Result<()> {
        let mut state = self.inner();
        state.check_lock()?;
        let name = match state.handle() {
            Some(name) => *name,
            None => return Err(Error::NotLockable("buffer was never created".to_string())),
        };
        self.activate(gc)?;

        let target = state.target();
        let (ptr, len) = {
            let _binding = BindingGuard::bind(self.device.as_ref(), target, name);
            self.device.map_buffer(target, access.map_flags())?
        };
        state.begin_mapping(gc.clone(), MappedPtr::new(ptr, len, access));
        Ok(())
    }

    fn unlock(&self) -> Result<()> {
        let mut state = self.inner();
        let gc = state.lock_context()?;
        let name = match state.handle() {
            Some(name) => *name,
            None => return Err(Error::NotLocked("buffer was never created".to_string())),
        };
        let target = state.target();

        let result = gc.make_current().and_then(|()| {
            let _binding = BindingGuard::bind(self.device.as_ref(), target, name);
            self.device.unmap_buffer(target)
        });
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
        state.check_range(offset, data.len(), "upload_data")?;
        let name = match state.handle() {
            Some(name) => *name,
            None => return Err(Error::InvalidResource("upload_data: buffer was never created".to_string())),
        };
        self.activate(gc)?;

        let target = state.target();
        let _binding = BindingGuard::bind(self.device.as_ref(), target, name);
        self.device.buffer_sub_data(target, offset, data)
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
        let (name, mapping) = {
            let mut state = self.inner();
            let mapping = state.end_mapping();
            (state.take_for_dispose(), mapping)
        };

        if let Some(name) = name {
            match self.device.set_active() {
                Ok(_) => {
                    if let Err(error) = self.device.delete_buffer(name) {
                        engine_warn!("prism::software", "Failed to delete buffer {}: {}", name.raw(), error);
                    }
                }
                Err(error) => {
                    engine_warn!(
                        "prism::software",
                        "Skipping native cleanup of buffer {}: {}",
                        name.raw(),
                        error
                    );
                }
            }
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

impl TransferBufferProvider for SoftwareBufferObjectProvider {
    /// Plain buffer objects report `Upload`
    fn direction(&self) -> TransferDirection {
        self.direction.unwrap_or(TransferDirection::Upload)
    }
}

impl Disposable for SoftwareBufferObjectProvider {
    fn dispose(&self) {
        BufferObjectProvider::dispose(self);
    }
}

impl Drop for SoftwareBufferObjectProvider {
    fn drop(&mut self) {
        BufferObjectProvider::dispose(self);
    }
}

#[cfg(test)]
#[path = "software_buffer_object_provider_tests.rs"]
mod tests;
