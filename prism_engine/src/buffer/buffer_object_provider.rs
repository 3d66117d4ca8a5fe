/// BufferObjectProvider - backend interface of one GPU buffer
///
/// Backends (software, Vulkan) implement [`BufferObjectProvider`] and
/// [`TransferBufferProvider`]. The lock/dispose state machine both of them
/// follow lives in [`BufferObjectState`].

use std::any::Any;
use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::context::GraphicsContext;
use crate::buffer::{
    BindingTarget, BufferAccessMode, BufferState, BufferUsageHint, TransferBuffer,
    TransferDirection,
};

/// Host view of a locked buffer
///
/// Valid only between the `lock` that produced it and the matching `unlock`.
#[derive(Debug, Clone, Copy)]
pub struct MappedPtr {
    ptr: NonNull<u8>,
    len: usize,
    access: BufferAccessMode,
}

// The pointer is only dereferenced through the unsafe accessors below, whose
// callers must respect the lock window.
unsafe impl Send for MappedPtr {}
unsafe impl Sync for MappedPtr {}

impl MappedPtr {
    pub fn new(ptr: NonNull<u8>, len: usize, access: BufferAccessMode) -> Self {
        Self { ptr, len, access }
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Mapped length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn access(&self) -> BufferAccessMode {
        self.access
    }

    /// View the mapping as bytes
    ///
    /// # Safety
    ///
    /// The buffer must still be locked for the whole lifetime `'a`.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        std::slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }

    /// View the mapping as mutable bytes
    ///
    /// # Safety
    ///
    /// The buffer must still be locked for `'a`, the access mode must allow
    /// writing and no other view of the mapping may be alive.
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
    }
}

/// Backend interface of a GPU buffer object
///
/// All methods take `&self`; implementations keep their state behind a mutex.
pub trait BufferObjectProvider: Send + Sync {
    /// Allocate `size` bytes of storage, optionally initialized from `data`
    ///
    /// The binding previously attached to `target` is restored afterwards.
    ///
    /// # Errors
    ///
    /// - `ContextActivationFailed` if no context of the pool can be made current
    /// - `OutOfRange` if `data` is given and its length differs from `size`
    /// - `AlreadyLocked` while a mapping is outstanding
    fn create(
        &self,
        data: Option<&[u8]>,
        size: usize,
        usage: BufferUsageHint,
        target: BindingTarget,
    ) -> Result<()>;

    /// Map the buffer for host access
    ///
    /// `gc` is captured and reactivated by the matching `unlock`.
    fn lock(&self, gc: &GraphicsContext, access: BufferAccessMode) -> Result<()>;

    /// Release the mapping obtained by `lock`
    fn unlock(&self) -> Result<()>;

    /// Current mapping; `NotMapped` outside of a lock window
    fn get_data(&self) -> Result<MappedPtr>;

    /// Write `data` at `offset` without an explicit lock
    fn upload_data(&self, gc: &GraphicsContext, offset: usize, data: &[u8]) -> Result<()>;

    /// GPU-side copy from `buffer[src_pos..]` into `self[dest_pos..]`
    ///
    /// `size == None` copies the smaller of both remaining ranges.
    fn copy_from(
        &self,
        gc: &GraphicsContext,
        buffer: &TransferBuffer,
        dest_pos: usize,
        src_pos: usize,
        size: Option<usize>,
    ) -> Result<()>;

    /// GPU-side copy from `self[src_pos..]` into `buffer[dest_pos..]`
    ///
    /// `size == None` copies the smaller of both remaining ranges.
    fn copy_to(
        &self,
        gc: &GraphicsContext,
        buffer: &TransferBuffer,
        dest_pos: usize,
        src_pos: usize,
        size: Option<usize>,
    ) -> Result<()>;

    /// Release the native buffer and leave the registry. Idempotent, never fails.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;

    fn state(&self) -> BufferState;

    /// Allocated size in bytes (0 before `create`)
    fn size(&self) -> usize;

    fn usage(&self) -> BufferUsageHint;

    fn target(&self) -> BindingTarget;

    /// Downcast support for backend-specific access
    fn as_any(&self) -> &dyn Any;
}

/// A buffer object used as a staging area for copies
pub trait TransferBufferProvider: BufferObjectProvider {
    fn direction(&self) -> TransferDirection;
}

/// Active host mapping plus the context it was created under
#[derive(Debug, Clone)]
pub struct Mapping {
    pub gc: GraphicsContext,
    pub ptr: MappedPtr,
}

/// Lock/dispose state machine shared by every backend
///
/// `H` is the backend's native handle type.
#[derive(Debug)]
pub struct BufferObjectState<H> {
    handle: Option<H>,
    target: BindingTarget,
    usage: BufferUsageHint,
    size: usize,
    allocated: bool,
    disposed: bool,
    mapping: Option<Mapping>,
}

impl<H> BufferObjectState<H> {
    pub fn new(handle: Option<H>, target: BindingTarget) -> Self {
        Self {
            handle,
            target,
            usage: BufferUsageHint::default(),
            size: 0,
            allocated: false,
            disposed: false,
            mapping: None,
        }
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn set_handle(&mut self, handle: H) -> Option<H> {
        self.handle.replace(handle)
    }

    pub fn take_handle(&mut self) -> Option<H> {
        self.handle.take()
    }

    pub fn target(&self) -> BindingTarget {
        self.target
    }

    pub fn usage(&self) -> BufferUsageHint {
        self.usage
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn state(&self) -> BufferState {
        if self.disposed {
            BufferState::Disposed
        } else if self.mapping.is_some() {
            BufferState::Mapped
        } else if self.allocated {
            BufferState::Allocated
        } else {
            BufferState::Uninitialized
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn throw_if_disposed(&self, operation: &str) -> Result<()> {
        if self.disposed {
            return Err(Error::Disposed(format!("{} on a disposed buffer", operation)));
        }
        Ok(())
    }

    /// Reject operations that would invalidate an outstanding mapping
    pub fn throw_if_mapped(&self, operation: &str) -> Result<()> {
        if self.mapping.is_some() {
            return Err(Error::AlreadyLocked(format!("{} while the buffer is locked", operation)));
        }
        Ok(())
    }

    /// Validate parameters of `create`
    pub fn check_create(&self, data: Option<&[u8]>, size: usize) -> Result<()> {
        self.throw_if_disposed("create")?;
        self.throw_if_mapped("create")?;
        if let Some(data) = data {
            if data.len() != size {
                return Err(Error::OutOfRange(format!(
                    "create: {} bytes of data for a {} byte buffer",
                    data.len(),
                    size
                )));
            }
        }
        Ok(())
    }

    /// Record a successful `create`
    pub fn mark_allocated(&mut self, size: usize, usage: BufferUsageHint, target: BindingTarget) {
        self.size = size;
        self.usage = usage;
        self.target = target;
        self.allocated = true;
    }

    /// `[offset, offset + len)` must lie inside the buffer
    pub fn check_range(&self, offset: usize, len: usize, operation: &str) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::OutOfRange(format!(
                "{}: range {}..{} exceeds buffer size {}",
                operation,
                offset,
                offset.saturating_add(len),
                self.size
            ))),
        }
    }

    /// Validate a `lock` request before talking to the backend
    pub fn check_lock(&self) -> Result<()> {
        self.throw_if_disposed("lock")?;
        if self.mapping.is_some() {
            return Err(Error::AlreadyLocked("lock called twice without unlock".to_string()));
        }
        Ok(())
    }

    pub fn begin_mapping(&mut self, gc: GraphicsContext, ptr: MappedPtr) {
        self.mapping = Some(Mapping { gc, ptr });
    }

    pub fn mapping(&self) -> Option<&Mapping> {
        self.mapping.as_ref()
    }

    /// Current mapped pointer
    pub fn mapped(&self) -> Result<MappedPtr> {
        self.mapping
            .as_ref()
            .map(|mapping| mapping.ptr)
            .ok_or_else(|| Error::NotMapped("get_data called outside of lock/unlock".to_string()))
    }

    /// Context captured by `lock`, validating an `unlock` request
    pub fn lock_context(&self) -> Result<GraphicsContext> {
        self.throw_if_disposed("unlock")?;
        self.mapping
            .as_ref()
            .map(|mapping| mapping.gc.clone())
            .ok_or_else(|| Error::NotLocked("unlock called without lock".to_string()))
    }

    /// Clear the mapping and the captured context
    pub fn end_mapping(&mut self) -> Option<Mapping> {
        self.mapping.take()
    }

    /// Enter the terminal state, handing back the native handle (once)
    pub fn take_for_dispose(&mut self) -> Option<H> {
        if self.disposed {
            return None;
        }
        self.disposed = true;
        self.mapping = None;
        self.handle.take()
    }
}

#[cfg(test)]
#[path = "buffer_object_provider_tests.rs"]
mod tests;
