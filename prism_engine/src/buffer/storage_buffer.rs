//! Resource-level storage buffer (SSBO).
//!
//! A `StorageBuffer` is a value-semantic handle over a shared
//! [`BufferObjectProvider`]. Clones refer to the same GPU buffer; two handles
//! are equal when they share the provider. The default handle is null and
//! every real operation on it fails with `NullHandle`.
//!
//! The buffer is an array of `size / stride` fixed-size elements. Whole-buffer
//! uploads must match the allocated size exactly.

use std::sync::Arc;

use bytemuck::Pod;

use crate::error::{Error, Result};
use crate::context::GraphicsContext;
use crate::buffer::{
    BindingTarget, BufferAccessMode, BufferObjectProvider, BufferUsageHint, MappedPtr,
    TransferBuffer,
};

// ===== STORAGE BUFFER =====

#[derive(Clone, Default)]
pub struct StorageBuffer {
    provider: Option<Arc<dyn BufferObjectProvider>>,
    stride: usize,
}

impl StorageBuffer {
    /// Null handle
    pub fn null() -> Self {
        Self::default()
    }

    /// Allocate `size` bytes of uninitialized storage
    ///
    /// # Errors
    ///
    /// `InvalidResource` if `stride` is zero or does not divide `size`.
    pub fn new(gc: &GraphicsContext, size: usize, stride: usize, usage: BufferUsageHint) -> Result<Self> {
        check_stride(size, stride)?;
        let provider = gc.provider()?.alloc_buffer_object()?;
        provider.create(None, size, usage, BindingTarget::ShaderStorage)?;
        crate::engine_trace!(
            "prism::buffer",
            "StorageBuffer created ({} elements of {} bytes)",
            size / stride,
            stride
        );
        Ok(Self {
            provider: Some(provider),
            stride,
        })
    }

    /// Allocate storage initialized from `data`
    pub fn with_data(gc: &GraphicsContext, data: &[u8], stride: usize, usage: BufferUsageHint) -> Result<Self> {
        check_stride(data.len(), stride)?;
        let provider = gc.provider()?.alloc_buffer_object()?;
        provider.create(Some(data), data.len(), usage, BindingTarget::ShaderStorage)?;
        Ok(Self {
            provider: Some(provider),
            stride,
        })
    }

    /// Allocate storage holding `elements`, one element per stride
    pub fn from_slice<T: Pod>(gc: &GraphicsContext, elements: &[T], usage: BufferUsageHint) -> Result<Self> {
        Self::with_data(gc, bytemuck::cast_slice(elements), std::mem::size_of::<T>(), usage)
    }

    /// Wrap an already created provider
    pub fn from_provider(provider: Arc<dyn BufferObjectProvider>, stride: usize) -> Result<Self> {
        check_stride(provider.size(), stride)?;
        Ok(Self {
            provider: Some(provider),
            stride,
        })
    }

    pub fn is_null(&self) -> bool {
        self.provider.is_none()
    }

    pub fn throw_if_null(&self) -> Result<()> {
        self.get_provider().map(|_| ())
    }

    /// Backend provider, for backend-specific operations
    pub fn get_provider(&self) -> Result<&Arc<dyn BufferObjectProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| Error::NullHandle("StorageBuffer is null".to_string()))
    }

    /// Concrete provider of backend `T`
    pub fn provider_as<T: 'static>(&self) -> Result<&T> {
        self.get_provider()?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| {
                Error::InvalidResource("StorageBuffer belongs to a different backend".to_string())
            })
    }

    /// Size in bytes (0 for the null handle)
    pub fn size(&self) -> usize {
        self.provider.as_ref().map_or(0, |provider| provider.size())
    }

    /// Element size in bytes
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn element_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.size() / self.stride
        }
    }

    pub fn usage(&self) -> Result<BufferUsageHint> {
        Ok(self.get_provider()?.usage())
    }

    // ===== DATA ACCESS =====

    /// Replace the whole contents of the buffer
    ///
    /// # Errors
    ///
    /// `OutOfRange` unless `data.len()` equals `size()`.
    pub fn upload_data(&self, gc: &GraphicsContext, data: &[u8]) -> Result<()> {
        let provider = self.get_provider()?;
        if data.len() != provider.size() {
            return Err(Error::OutOfRange(format!(
                "upload_data: {} bytes for a {} byte storage buffer",
                data.len(),
                provider.size()
            )));
        }
        provider.upload_data(gc, 0, data)
    }

    /// Write `data` starting at byte `offset`
    pub fn upload_sub_data(&self, gc: &GraphicsContext, offset: usize, data: &[u8]) -> Result<()> {
        self.get_provider()?.upload_data(gc, offset, data)
    }

    /// Replace the whole contents with `elements`
    pub fn upload_slice<T: Pod>(&self, gc: &GraphicsContext, elements: &[T]) -> Result<()> {
        self.upload_data(gc, bytemuck::cast_slice(elements))
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

    // ===== COPIES =====

    /// Copy `buffer[src_pos..]` into `self[dest_pos..]` on the GPU
    ///
    /// `size == None` copies the smaller of both remaining ranges.
    pub fn copy_from(
        &self,
        gc: &GraphicsContext,
        buffer: &TransferBuffer,
        dest_pos: usize,
        src_pos: usize,
        size: Option<usize>,
    ) -> Result<()> {
        buffer.throw_if_null()?;
        self.get_provider()?.copy_from(gc, buffer, dest_pos, src_pos, size)
    }

    /// Copy `self[src_pos..]` into `buffer[dest_pos..]` on the GPU
    ///
    /// `size == None` copies the smaller of both remaining ranges.
    pub fn copy_to(
        &self,
        gc: &GraphicsContext,
        buffer: &TransferBuffer,
        dest_pos: usize,
        src_pos: usize,
        size: Option<usize>,
    ) -> Result<()> {
        buffer.throw_if_null()?;
        self.get_provider()?.copy_to(gc, buffer, dest_pos, src_pos, size)
    }
}

fn check_stride(size: usize, stride: usize) -> Result<()> {
    if stride == 0 {
        return Err(Error::InvalidResource("StorageBuffer stride must be non-zero".to_string()));
    }
    if size % stride != 0 {
        return Err(Error::InvalidResource(format!(
            "StorageBuffer size {} is not a multiple of stride {}",
            size, stride
        )));
    }
    Ok(())
}

impl PartialEq for StorageBuffer {
    fn eq(&self, other: &Self) -> bool {
        match (&self.provider, &other.provider) {
            (Some(a), Some(b)) => Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const (),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for StorageBuffer {}

impl std::fmt::Debug for StorageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.provider {
            Some(provider) => f
                .debug_struct("StorageBuffer")
                .field("size", &provider.size())
                .field("stride", &self.stride)
                .field("state", &provider.state())
                .finish(),
            None => write!(f, "StorageBuffer(null)"),
        }
    }
}

#[cfg(test)]
#[path = "storage_buffer_tests.rs"]
mod tests;
