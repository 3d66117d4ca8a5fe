/// SoftwareGraphicsContext - context of the CPU software backend
///
/// Contexts created with `create_shared` join an existing pool: they see the
/// same buffers but keep their own binding table. Dropping the last context
/// of a pool disposes every buffer still registered with it.

use std::any::Any;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::context::{Config, ContextId, GraphicsContext, GraphicsContextProvider, SharedContextData};
use crate::buffer::{BufferObjectProvider, TransferBufferProvider, TransferDirection};
use crate::software::{SoftwareBufferObjectProvider, SoftwareDevice};
use crate::{engine_info, engine_warn};

pub struct SoftwareGraphicsContext {
    id: ContextId,
    device: Arc<SoftwareDevice>,
    shared: Arc<SharedContextData>,
}

impl SoftwareGraphicsContext {
    /// Create the first context of a new pool
    pub fn create(config: Config) -> Result<GraphicsContext> {
        let shared = Arc::new(SharedContextData::new());
        let device = Arc::new(SoftwareDevice::new(config, Arc::clone(&shared)));
        let context = Self::attach(device, shared);
        engine_info!(
            "prism::software",
            "Created software context {} for '{}'",
            context.id,
            context.device.config().app_name
        );
        Ok(GraphicsContext::new(Arc::new(context)))
    }

    /// Create a context sharing the pool of `gc`
    ///
    /// # Errors
    ///
    /// - `NullHandle` if `gc` is null
    /// - `InvalidResource` if `gc` belongs to another backend
    /// - `ContextActivationFailed` if the pool is lost
    pub fn create_shared(gc: &GraphicsContext) -> Result<GraphicsContext> {
        let parent = Self::from_context(gc)?;
        if parent.shared.is_lost() {
            return Err(Error::ContextActivationFailed(format!(
                "cannot share {}: context lost",
                parent.id
            )));
        }
        let context = Self::attach(Arc::clone(&parent.device), Arc::clone(&parent.shared));
        engine_info!("prism::software", "Created shared context {} (pool of {})", context.id, parent.id);
        Ok(GraphicsContext::new(Arc::new(context)))
    }

    fn attach(device: Arc<SoftwareDevice>, shared: Arc<SharedContextData>) -> Self {
        let id = ContextId::next();
        device.attach_context(id);
        Self { id, device, shared }
    }

    /// Software context behind `gc`
    pub fn from_context(gc: &GraphicsContext) -> Result<&SoftwareGraphicsContext> {
        gc.provider()?
            .as_any()
            .downcast_ref::<SoftwareGraphicsContext>()
            .ok_or_else(|| Error::InvalidResource(format!("{:?} is not a software context", gc)))
    }

    pub fn device(&self) -> &Arc<SoftwareDevice> {
        &self.device
    }

    /// Simulate context loss. Every context of the pool becomes unusable.
    pub fn lose(&self) {
        engine_warn!("prism::software", "Context {} lost", self.id);
        self.shared.mark_lost();
    }

    pub fn is_lost(&self) -> bool {
        self.shared.is_lost()
    }
}

impl GraphicsContextProvider for SoftwareGraphicsContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn make_current(&self) -> Result<()> {
        self.device.make_current(self.id)
    }

    fn shared_data(&self) -> Arc<SharedContextData> {
        Arc::clone(&self.shared)
    }

    fn alloc_buffer_object(&self) -> Result<Arc<dyn BufferObjectProvider>> {
        let provider = SoftwareBufferObjectProvider::new(Arc::clone(&self.device), &self.shared, None);
        Ok(provider)
    }

    fn alloc_transfer_buffer(&self, direction: TransferDirection) -> Result<Arc<dyn TransferBufferProvider>> {
        let provider = SoftwareBufferObjectProvider::new(Arc::clone(&self.device), &self.shared, Some(direction));
        Ok(provider)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for SoftwareGraphicsContext {
    fn drop(&mut self) {
        if self.device.context_count() <= 1 {
            // Last context of the pool: native objects go while it is still attached
            self.shared.dispose_objects();
            self.shared.mark_lost();
        }
        self.device.detach_context(self.id);
        crate::engine_debug!("prism::software", "Destroyed software context {}", self.id);
    }
}
