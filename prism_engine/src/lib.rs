/*!
# Prism Engine

Backend-agnostic GPU buffer objects for the Prism rendering engine.

Client code obtains a [`GraphicsContext`](prism::GraphicsContext), creates
[`StorageBuffer`](prism::StorageBuffer)s and [`TransferBuffer`](prism::TransferBuffer)s
through it, and moves data between them. Each handle shares one backend
provider implementing [`BufferObjectProvider`](prism::BufferObjectProvider).

## Architecture

- **GraphicsContextProvider**: backend context, activation and buffer allocation
- **BufferObjectProvider**: create/lock/unlock/upload/copy/dispose of one buffer
- **TransferBufferProvider**: staging buffer used as copy source or destination
- **DisposalRegistry**: live buffers of a context pool, disposed at teardown
- **software**: CPU backend emulating a bind-point API, used by the test-suite

Backend crates (e.g. `prism_engine_renderer_vulkan`) implement the same traits.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod context;
pub mod buffer;
pub mod software;

// Main prism namespace module
pub mod prism {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logging)
    pub use crate::engine::Engine;

    // Logging
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Contexts
    pub use crate::context::{
        Config, ContextId, Disposable, DisposableKey, DisposalRegistry, GraphicsContext,
        GraphicsContextProvider, Registration, SharedContextData,
    };

    // Buffers
    pub use crate::buffer::{
        resolve_copy_size, BindingGuard, BindingState, BindingTarget, BufferAccessMode,
        BufferObjectProvider, BufferObjectState, BufferState, BufferUsageHint, MapFlags,
        MappedPtr, Mapping, StorageBuffer, TransferBuffer, TransferBufferProvider,
        TransferDirection, UsageFrequency, UsageNature,
    };

    // Software backend
    pub mod software {
        pub use crate::software::{
            BufferName, SoftwareBufferObjectProvider, SoftwareDevice, SoftwareGraphicsContext,
        };
    }
}
