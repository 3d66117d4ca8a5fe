//! Graphics context configuration

/// Context creation options, read by every backend
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Largest single buffer allocation in bytes; bigger requests fail with `OutOfMemory`
    pub max_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Prism Application".to_string(),
            app_version: (1, 0, 0),
            max_buffer_size: 256 * 1024 * 1024,
        }
    }
}
