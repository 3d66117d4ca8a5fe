/// TransferBuffer - host-visible staging buffer handle
///
/// Source of `StorageBuffer::copy_from` and destination of
/// `StorageBuffer::copy_to`. Cloning shares the same provider.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::context::GraphicsContext;
use crate::buffer::{BufferAccessMode, BufferUsageHint, MappedPtr, TransferBufferProvider, TransferDirection};

/// Reference-counted handle to a transfer buffer provider
#[derive(Clone, Default)]
pub struct TransferBuffer {
    provider: Option<Arc<dyn TransferBufferProvider>>,
}

impl TransferBuffer {
    /// Null handle
    pub fn null() -> Self {
        Self::default()
    }

    /// Allocate an uninitialized transfer buffer of `size` bytes
    pub fn new(
        gc: &GraphicsContext,
        size: usize,
        direction: TransferDirection,
        usage: BufferUsageHint,
    ) -> Result<Self> {
        let provider = gc.provider()?.alloc_transfer_buffer(direction)?;
        provider.create(None, size, usage, direction.binding_target())?;
        crate::engine_trace!("prism::buffer", "TransferBuffer {:?} created ({} bytes)", direction, size);
        Ok(Self::from_provider(provider))
    }

    /// Allocate a transfer buffer with the usage hint typical for `direction`
    pub fn for_direction(gc: &GraphicsContext, size: usize, direction: TransferDirection) -> Result<Self> {
        Self::new(gc, size, direction, direction.default_usage())
    }

    /// Allocate a transfer buffer initialized from `data`
    pub fn with_data(
        gc: &GraphicsContext,
        data: &[u8],
        direction: TransferDirection,
        usage: BufferUsageHint,
    ) -> Result<Self> {
        let provider = gc.provider()?.alloc_transfer_buffer(direction)?;
        provider.create(Some(data), data.len(), usage, direction.binding_target())?;
        Ok(Self::from_provider(provider))
    }

    /// Wrap an already created provider
    pub fn from_provider(provider: Arc<dyn TransferBufferProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn is_null(&self) -> bool {
        self.provider.is_none()
    }

    pub fn throw_if_null(&self) -> Result<()> {
        self.get_provider().map(|_| ())
    }

    /// Backend provider, for backend-specific operations
    pub fn get_provider(&self) -> Result<&Arc<dyn TransferBufferProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| Error::NullHandle("TransferBuffer is null".to_string()))
    }

    /// Concrete provider of backend `T`
    ///
    /// # Errors
    ///
    /// `InvalidResource` if the buffer belongs to another backend.
    pub fn provider_as<T: 'static>(&self) -> Result<&T> {
        self.get_provider()?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| {
                Error::InvalidResource("TransferBuffer belongs to a different backend".to_string())
            })
    }

    /// Size in bytes (0 for the null handle)
    pub fn size(&self) -> usize {
        self.provider.as_ref().map_or(0, |provider| provider.size())
    }

    pub fn direction(&self) -> Result<TransferDirection> {
        Ok(self.get_provider()?.direction())
    }

    pub fn lock(&self, gc: &GraphicsContext, access: BufferAccessMode) -> Result<()> {
        self.get_provider()?.lock(gc, access)
    }

    pub fn unlock(&self) -> Result<()> {
        self.get_provider()?.unlock()
    }

    pub fn get_data(&self) -> Result<MappedPtr> {
        self.get_provider()?.get_data()
    }

    pub fn upload_data(&self, gc: &GraphicsContext, offset: usize, data: &[u8]) -> Result<()> {
        self.get_provider()?.upload_data(gc, offset, data)
    }

    /// Copy `len` bytes starting at `offset` out to host memory
    ///
    /// Locks read-only for the duration of the copy. The buffer is unlocked
    /// again even if the copy-out fails.
    pub fn read_back(&self, gc: &GraphicsContext, offset: usize, len: usize) -> Result<Vec<u8>> {
        let provider = self.get_provider()?;
        provider.lock(gc, BufferAccessMode::ReadOnly)?;

        let copied = provider.get_data().and_then(|mapped| {
            match offset.checked_add(len) {
                Some(end) if end <= mapped.len() => {
                    // SAFETY: the buffer stays locked until the unlock below
                    let bytes = unsafe { mapped.as_slice() };
                    Ok(bytes[offset..end].to_vec())
                }
                _ => Err(Error::OutOfRange(format!(
                    "read_back: range {}..{} exceeds buffer size {}",
                    offset,
                    offset.saturating_add(len),
                    mapped.len()
                ))),
            }
        });
        let unlocked = provider.unlock();

        let bytes = copied?;
        unlocked?;
        Ok(bytes)
    }
}

impl PartialEq for TransferBuffer {
    fn eq(&self, other: &Self) -> bool {
        match (&self.provider, &other.provider) {
            (Some(a), Some(b)) => Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const (),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for TransferBuffer {}

impl std::fmt::Debug for TransferBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.provider {
            Some(provider) => f
                .debug_struct("TransferBuffer")
                .field("direction", &provider.direction())
                .field("size", &provider.size())
                .field("state", &provider.state())
                .finish(),
            None => write!(f, "TransferBuffer(null)"),
        }
    }
}

#[cfg(test)]
#[path = "transfer_buffer_tests.rs"]
mod tests;
