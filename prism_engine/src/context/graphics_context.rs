/// GraphicsContext - backend-agnostic handle to a rendering context
///
/// A context must be made current before any GPU operation is issued against
/// it. Backends implement [`GraphicsContextProvider`]; client code passes the
/// cloneable [`GraphicsContext`] handle around.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::context::SharedContextData;
use crate::buffer::{BufferObjectProvider, TransferBufferProvider, TransferDirection};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique context identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Backend implementation of a graphics context
///
/// Implemented by backend-specific contexts (e.g., SoftwareGraphicsContext,
/// VulkanGraphicsContext).
pub trait GraphicsContextProvider: Send + Sync {
    /// Identity of this context
    fn id(&self) -> ContextId;

    /// Make this context the active one
    ///
    /// # Errors
    ///
    /// `ContextActivationFailed` when the context has been lost.
    fn make_current(&self) -> Result<()>;

    /// State shared with the other contexts of the pool
    fn shared_data(&self) -> Arc<SharedContextData>;

    /// Allocate an (uninitialized) buffer object provider
    fn alloc_buffer_object(&self) -> Result<Arc<dyn BufferObjectProvider>>;

    /// Allocate an (uninitialized) transfer buffer provider
    fn alloc_transfer_buffer(&self, direction: TransferDirection) -> Result<Arc<dyn TransferBufferProvider>>;

    /// Downcast support for backend-specific access
    fn as_any(&self) -> &dyn Any;
}

/// Cloneable graphics context handle
///
/// `GraphicsContext::default()` is the null context; every operation other
/// than `is_null` fails with `NullHandle` on it.
#[derive(Clone, Default)]
pub struct GraphicsContext {
    provider: Option<Arc<dyn GraphicsContextProvider>>,
}

impl GraphicsContext {
    pub fn new(provider: Arc<dyn GraphicsContextProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// The null context
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.provider.is_none()
    }

    pub fn throw_if_null(&self) -> Result<()> {
        match self.provider {
            Some(_) => Ok(()),
            None => Err(Error::NullHandle("GraphicsContext is null".to_string())),
        }
    }

    /// Backend provider
    pub fn provider(&self) -> Result<&Arc<dyn GraphicsContextProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| Error::NullHandle("GraphicsContext is null".to_string()))
    }

    pub fn id(&self) -> Result<ContextId> {
        Ok(self.provider()?.id())
    }

    /// Activate this context
    pub fn make_current(&self) -> Result<()> {
        self.provider()?.make_current()
    }

    pub fn shared_data(&self) -> Result<Arc<SharedContextData>> {
        Ok(self.provider()?.shared_data())
    }
}

impl PartialEq for GraphicsContext {
    fn eq(&self, other: &Self) -> bool {
        match (&self.provider, &other.provider) {
            (Some(a), Some(b)) => a.id() == b.id(),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for GraphicsContext {}

impl fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "GraphicsContext({})", provider.id()),
            None => write!(f, "GraphicsContext(null)"),
        }
    }
}
