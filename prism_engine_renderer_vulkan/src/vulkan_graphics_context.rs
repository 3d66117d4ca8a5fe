/// VulkanGraphicsContext - headless Vulkan implementation of GraphicsContextProvider
///
/// Contexts of one pool share a `GpuContext` (device, allocator, queue) and the
/// pool's disposal registry. When the last context of a pool is dropped, every
/// registered buffer is disposed before the device is destroyed.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use prism_engine::prism::{
    BufferObjectProvider, Config, ContextId, Error, GraphicsContext, GraphicsContextProvider,
    Result, SharedContextData, TransferBufferProvider, TransferDirection,
};
use prism_engine::{engine_debug, engine_error, engine_info, engine_warn};
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBufferObjectProvider;
use crate::vulkan_context::GpuContext;

const VALIDATION_LAYER: &std::ffi::CStr = c"VK_LAYER_KHRONOS_validation";

/// Owner of the pool-wide state; dropped with the last context
struct ContextPool {
    gpu: Arc<GpuContext>,
    shared: Arc<SharedContextData>,
}

impl Drop for ContextPool {
    fn drop(&mut self) {
        // Buffers first: they free their memory through the still-alive allocator
        self.shared.dispose_objects();
        self.shared.mark_lost();
        self.gpu.teardown();
        engine_debug!("prism::vulkan", "Vulkan device destroyed");
    }
}

pub struct VulkanGraphicsContext {
    id: ContextId,
    pool: Arc<ContextPool>,
}

impl VulkanGraphicsContext {
    /// Create a headless Vulkan device and the first context of its pool
    pub fn new(config: Config) -> Result<GraphicsContext> {
        let gpu = Arc::new(Self::create_gpu_context(&config)?);
        let pool = Arc::new(ContextPool {
            gpu,
            shared: Arc::new(SharedContextData::new()),
        });
        let context = Self {
            id: ContextId::next(),
            pool,
        };
        engine_info!("prism::vulkan", "Created Vulkan context {} for '{}'", context.id, config.app_name);
        Ok(GraphicsContext::new(Arc::new(context)))
    }

    /// Create a context sharing the device of `gc`
    pub fn create_shared(gc: &GraphicsContext) -> Result<GraphicsContext> {
        let parent = Self::from_context(gc)?;
        parent.pool.gpu.throw_if_lost()?;
        let context = Self {
            id: ContextId::next(),
            pool: Arc::clone(&parent.pool),
        };
        Ok(GraphicsContext::new(Arc::new(context)))
    }

    /// Vulkan context behind `gc`
    pub fn from_context(gc: &GraphicsContext) -> Result<&VulkanGraphicsContext> {
        gc.provider()?
            .as_any()
            .downcast_ref::<VulkanGraphicsContext>()
            .ok_or_else(|| Error::InvalidResource(format!("{:?} is not a Vulkan context", gc)))
    }

    pub fn gpu(&self) -> &Arc<GpuContext> {
        &self.pool.gpu
    }

    fn create_gpu_context(config: &Config) -> Result<GpuContext> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("prism::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|_| Error::InitializationFailed("Application name contains NUL".to_string()))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Prism")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            let validation = config.enable_validation && Self::validation_layer_available(&entry);
            if config.enable_validation && !validation {
                engine_warn!("prism::vulkan", "Validation requested but {:?} is not installed", VALIDATION_LAYER);
            }

            let extension_names = if validation {
                vec![ash::ext::debug_utils::NAME.as_ptr()]
            } else {
                vec![]
            };
            let layer_names = if validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!("prism::vulkan", "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            let (debug_utils_loader, debug_messenger) = if validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::debug::init_debug_tracking();

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::debug::messenger_severity_flags())
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        instance.destroy_instance(None);
                        engine_error!("prism::vulkan", "Failed to create debug messenger: {:?}", e);
                        return Err(Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e)));
                    }
                }
            } else {
                (None, None)
            };

            let destroy_instance = |instance: &ash::Instance| {
                if let (Some(debug_utils), Some(messenger)) = (&debug_utils_loader, &debug_messenger) {
                    debug_utils.destroy_debug_utils_messenger(*messenger, None);
                }
                instance.destroy_instance(None);
            };

            // Pick physical device and a graphics-capable queue family
            let selected = Self::select_physical_device(&instance);
            let (physical_device, graphics_family_index) = match selected {
                Ok(selected) => selected,
                Err(error) => {
                    destroy_instance(&instance);
                    return Err(error);
                }
            };

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .queue_priorities(&queue_priorities)];

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos);

            let device = match instance.create_device(physical_device, &device_create_info, None) {
                Ok(device) => device,
                Err(e) => {
                    destroy_instance(&instance);
                    engine_error!("prism::vulkan", "Failed to create logical device: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create device: {:?}", e)));
                }
            };

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);

            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_device(None);
                    destroy_instance(&instance);
                    engine_error!("prism::vulkan", "Failed to create GPU allocator: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create allocator: {:?}", e)));
                }
            };

            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = match device.create_command_pool(&upload_pool_create_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    drop(allocator);
                    device.destroy_device(None);
                    destroy_instance(&instance);
                    engine_error!("prism::vulkan", "Failed to create upload command pool: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e)));
                }
            };

            Ok(GpuContext::new(
                entry,
                instance,
                device,
                allocator,
                graphics_queue,
                graphics_family_index,
                upload_command_pool,
                config.max_buffer_size,
                debug_utils_loader,
                debug_messenger,
            ))
        }
    }

    fn validation_layer_available(entry: &ash::Entry) -> bool {
        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        layers
            .iter()
            .any(|layer| layer.layer_name_as_c_str().map_or(false, |name| name == VALIDATION_LAYER))
    }

    unsafe fn select_physical_device(instance: &ash::Instance) -> Result<(vk::PhysicalDevice, u32)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| {
                engine_error!("prism::vulkan", "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })?;

        physical_devices
            .into_iter()
            .find_map(|physical_device| {
                instance
                    .get_physical_device_queue_family_properties(physical_device)
                    .iter()
                    .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                    .map(|index| (physical_device, index as u32))
            })
            .ok_or_else(|| {
                engine_error!("prism::vulkan", "No Vulkan-capable GPU with a graphics queue found");
                Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
            })
    }
}

impl GraphicsContextProvider for VulkanGraphicsContext {
    fn id(&self) -> ContextId {
        self.id
    }

    /// Vulkan has no thread-current context; activation only checks the device
    fn make_current(&self) -> Result<()> {
        self.pool.gpu.throw_if_lost()
    }

    fn shared_data(&self) -> Arc<SharedContextData> {
        Arc::clone(&self.pool.shared)
    }

    fn alloc_buffer_object(&self) -> Result<Arc<dyn BufferObjectProvider>> {
        self.pool.gpu.throw_if_lost()?;
        let provider = VulkanBufferObjectProvider::new(Arc::clone(&self.pool.gpu), &self.pool.shared, None);
        Ok(provider)
    }

    fn alloc_transfer_buffer(&self, direction: TransferDirection) -> Result<Arc<dyn TransferBufferProvider>> {
        self.pool.gpu.throw_if_lost()?;
        let provider = VulkanBufferObjectProvider::new(Arc::clone(&self.pool.gpu), &self.pool.shared, Some(direction));
        Ok(provider)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
