/// Buffer enumerations - usage hints, access modes, binding targets
///
/// These are backend-neutral. Each backend translates them to its own flags
/// (see `usage_flags_for_target` / `memory_location_for_usage` in the Vulkan backend).

use bitflags::bitflags;

/// Intended update frequency and data flow of a buffer
///
/// Fixed at creation; informs memory placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsageHint {
    /// Written once, used a few times
    StreamDraw,
    /// Written by the GPU once, read back a few times
    StreamRead,
    /// Written by the GPU once, used by the GPU a few times
    StreamCopy,
    /// Written once, used many times
    StaticDraw,
    StaticRead,
    StaticCopy,
    /// Rewritten repeatedly, used many times
    #[default]
    DynamicDraw,
    DynamicRead,
    DynamicCopy,
}

/// Update frequency part of a usage hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageFrequency {
    Stream,
    Static,
    Dynamic,
}

/// Data flow part of a usage hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageNature {
    /// Host writes, GPU reads
    Draw,
    /// GPU writes, host reads
    Read,
    /// GPU writes, GPU reads
    Copy,
}

impl BufferUsageHint {
    pub fn frequency(&self) -> UsageFrequency {
        match self {
            BufferUsageHint::StreamDraw | BufferUsageHint::StreamRead | BufferUsageHint::StreamCopy => {
                UsageFrequency::Stream
            }
            BufferUsageHint::StaticDraw | BufferUsageHint::StaticRead | BufferUsageHint::StaticCopy => {
                UsageFrequency::Static
            }
            BufferUsageHint::DynamicDraw | BufferUsageHint::DynamicRead | BufferUsageHint::DynamicCopy => {
                UsageFrequency::Dynamic
            }
        }
    }

    pub fn nature(&self) -> UsageNature {
        match self {
            BufferUsageHint::StreamDraw | BufferUsageHint::StaticDraw | BufferUsageHint::DynamicDraw => {
                UsageNature::Draw
            }
            BufferUsageHint::StreamRead | BufferUsageHint::StaticRead | BufferUsageHint::DynamicRead => {
                UsageNature::Read
            }
            BufferUsageHint::StreamCopy | BufferUsageHint::StaticCopy | BufferUsageHint::DynamicCopy => {
                UsageNature::Copy
            }
        }
    }
}

bitflags! {
    /// Mapping flags requested from a backend
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapFlags: u32 {
        const READ = 0b001;
        const WRITE = 0b010;
        /// Previous contents may be discarded
        const INVALIDATE_BUFFER = 0b100;
    }
}

/// Access requested for one lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferAccessMode {
    ReadOnly,
    WriteOnly,
    /// Write-only; the previous contents need not be preserved
    WriteDiscard,
    ReadWrite,
}

impl BufferAccessMode {
    /// Mapping flags for this access mode
    pub fn map_flags(&self) -> MapFlags {
        match self {
            BufferAccessMode::ReadOnly => MapFlags::READ,
            BufferAccessMode::WriteOnly => MapFlags::WRITE,
            BufferAccessMode::WriteDiscard => MapFlags::WRITE | MapFlags::INVALIDATE_BUFFER,
            BufferAccessMode::ReadWrite => MapFlags::READ | MapFlags::WRITE,
        }
    }
}

/// Bind point a buffer is attached to before the backend acts on it
///
/// Fixed at creation and reused for every bind/unbind pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingTarget {
    /// Vertex attributes
    Array,
    /// Indices
    ElementArray,
    Uniform,
    ShaderStorage,
    /// Read-back staging (GPU -> host)
    PixelPack,
    /// Upload staging (host -> GPU)
    PixelUnpack,
    /// Source side of a buffer-to-buffer copy
    CopyRead,
    /// Destination side of a buffer-to-buffer copy
    CopyWrite,
    TransformFeedback,
}

impl BindingTarget {
    /// All targets, in declaration order
    pub const ALL: [BindingTarget; 9] = [
        BindingTarget::Array,
        BindingTarget::ElementArray,
        BindingTarget::Uniform,
        BindingTarget::ShaderStorage,
        BindingTarget::PixelPack,
        BindingTarget::PixelUnpack,
        BindingTarget::CopyRead,
        BindingTarget::CopyWrite,
        BindingTarget::TransformFeedback,
    ];
}

/// Direction of a transfer (staging) buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    /// Host -> GPU staging
    Upload,
    /// GPU -> host read-back
    Download,
}

impl TransferDirection {
    /// Bind point used for the transfer buffer itself
    pub fn binding_target(&self) -> BindingTarget {
        match self {
            TransferDirection::Upload => BindingTarget::PixelUnpack,
            TransferDirection::Download => BindingTarget::PixelPack,
        }
    }

    /// Usage hint used when the caller does not pick one
    pub fn default_usage(&self) -> BufferUsageHint {
        match self {
            TransferDirection::Upload => BufferUsageHint::StreamDraw,
            TransferDirection::Download => BufferUsageHint::StreamRead,
        }
    }
}

/// Lifecycle state of a buffer object provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferState {
    /// Native handle may exist, no storage yet
    Uninitialized,
    /// Storage allocated, not mapped
    Allocated,
    /// Between `lock` and `unlock`
    Mapped,
    /// Terminal
    Disposed,
}

#[cfg(test)]
#[path = "buffer_usage_tests.rs"]
mod tests;
