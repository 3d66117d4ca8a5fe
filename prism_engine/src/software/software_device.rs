/// SoftwareDevice - CPU emulation of a bind-point based graphics API
///
/// One device backs a whole context pool. Buffer names are shared by every
/// context of the pool; buffer bindings are per context. Commands act on the
/// buffer bound at a target in the current context, the way a GL driver does.

use std::num::NonZeroU32;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::context::{Config, ContextId, SharedContextData};
use crate::buffer::{BindingState, BindingTarget, BufferUsageHint, MapFlags};
use crate::{engine_bail, engine_error};

/// Native buffer name. Zero is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferName(NonZeroU32);

impl BufferName {
    pub fn raw(&self) -> u32 {
        self.0.get()
    }
}

struct BufferStorage {
    data: Vec<u8>,
    usage: BufferUsageHint,
    mapped: Option<MapFlags>,
}

#[derive(Default)]
struct DeviceState {
    last_name: u32,
    buffers: FxHashMap<BufferName, BufferStorage>,
    bindings: FxHashMap<ContextId, FxHashMap<BindingTarget, BufferName>>,
    current: Option<ContextId>,
}

impl DeviceState {
    fn current(&self) -> Result<ContextId> {
        self.current
            .ok_or_else(|| Error::ContextActivationFailed("no current context".to_string()))
    }

    fn bound(&self, target: BindingTarget) -> Result<BufferName> {
        let context = self.current()?;
        match self.bindings.get(&context).and_then(|table| table.get(&target)) {
            Some(name) => Ok(*name),
            None => Err(Error::InvalidResource(format!("no buffer bound at {:?}", target))),
        }
    }

    fn storage_mut(&mut self, target: BindingTarget) -> Result<(BufferName, &mut BufferStorage)> {
        let name = self.bound(target)?;
        match self.buffers.get_mut(&name) {
            Some(storage) => Ok((name, storage)),
            None => Err(Error::InvalidResource(format!("buffer {} was deleted", name.raw()))),
        }
    }
}

/// Emulated device shared by the contexts of one pool
pub struct SoftwareDevice {
    state: Mutex<DeviceState>,
    shared: Arc<SharedContextData>,
    config: Config,
}

impl SoftwareDevice {
    pub fn new(config: Config, shared: Arc<SharedContextData>) -> Self {
        Self {
            state: Mutex::new(DeviceState::default()),
            shared,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shared_data(&self) -> &Arc<SharedContextData> {
        &self.shared
    }

    // ===== CONTEXTS =====

    /// Add a context with an empty binding table
    pub fn attach_context(&self, context: ContextId) {
        self.lock().bindings.insert(context, FxHashMap::default());
    }

    /// Remove a context and its binding table. Returns the number left.
    pub fn detach_context(&self, context: ContextId) -> usize {
        let mut state = self.lock();
        state.bindings.remove(&context);
        if state.current == Some(context) {
            state.current = None;
        }
        state.bindings.len()
    }

    pub fn context_count(&self) -> usize {
        self.lock().bindings.len()
    }

    pub fn current_context(&self) -> Option<ContextId> {
        self.lock().current
    }

    /// Make `context` current
    ///
    /// # Errors
    ///
    /// `ContextActivationFailed` if the pool is lost or the context is gone.
    pub fn make_current(&self, context: ContextId) -> Result<()> {
        if self.shared.is_lost() {
            return Err(Error::ContextActivationFailed(format!("{}: context lost", context)));
        }
        let mut state = self.lock();
        if !state.bindings.contains_key(&context) {
            return Err(Error::ContextActivationFailed(format!("{}: context destroyed", context)));
        }
        state.current = Some(context);
        Ok(())
    }

    /// Make any live context of the pool current, keeping the current one if possible
    pub fn set_active(&self) -> Result<ContextId> {
        if self.shared.is_lost() {
            return Err(Error::ContextActivationFailed("context pool lost".to_string()));
        }
        let mut state = self.lock();
        if let Some(current) = state.current {
            if state.bindings.contains_key(&current) {
                return Ok(current);
            }
        }
        let any = state.bindings.keys().min().copied();
        match any {
            Some(context) => {
                state.current = Some(context);
                Ok(context)
            }
            None => Err(Error::ContextActivationFailed("no live context in pool".to_string())),
        }
    }

    // ===== BUFFER NAMES =====

    pub fn gen_buffer(&self) -> Result<BufferName> {
        let mut state = self.lock();
        state.current()?;
        state.last_name = state.last_name.wrapping_add(1);
        let name = match NonZeroU32::new(state.last_name) {
            Some(raw) => BufferName(raw),
            None => engine_bail!("prism::software", "Buffer name space exhausted"),
        };
        state.buffers.insert(
            name,
            BufferStorage {
                data: Vec::new(),
                usage: BufferUsageHint::default(),
                mapped: None,
            },
        );
        Ok(name)
    }

    /// Delete a buffer, implicitly unmapping it and unbinding it everywhere
    pub fn delete_buffer(&self, name: BufferName) -> Result<()> {
        let mut state = self.lock();
        state.current()?;
        if state.buffers.remove(&name).is_none() {
            return Err(Error::InvalidResource(format!("buffer {} does not exist", name.raw())));
        }
        for table in state.bindings.values_mut() {
            table.retain(|_, bound| *bound != name);
        }
        Ok(())
    }

    pub fn is_buffer(&self, name: BufferName) -> bool {
        self.lock().buffers.contains_key(&name)
    }

    pub fn buffer_count(&self) -> usize {
        self.lock().buffers.len()
    }

    pub fn buffer_size(&self, name: BufferName) -> Option<usize> {
        self.lock().buffers.get(&name).map(|storage| storage.data.len())
    }

    pub fn buffer_usage(&self, name: BufferName) -> Option<BufferUsageHint> {
        self.lock().buffers.get(&name).map(|storage| storage.usage)
    }

    /// Copy of a buffer's contents, bypassing bindings
    pub fn buffer_contents(&self, name: BufferName) -> Option<Vec<u8>> {
        self.lock().buffers.get(&name).map(|storage| storage.data.clone())
    }

    // ===== BUFFER COMMANDS =====

    /// (Re)specify the storage of the buffer bound at `target`
    pub fn buffer_data(
        &self,
        target: BindingTarget,
        data: Option<&[u8]>,
        size: usize,
        usage: BufferUsageHint,
    ) -> Result<()> {
        if size > self.config.max_buffer_size {
            engine_error!(
                "prism::software",
                "Out of memory for buffer ({} bytes, limit {})",
                size,
                self.config.max_buffer_size
            );
            return Err(Error::OutOfMemory);
        }
        let mut state = self.lock();
        let (name, storage) = state.storage_mut(target)?;
        if storage.mapped.is_some() {
            return Err(Error::AlreadyLocked(format!("buffer_data on mapped buffer {}", name.raw())));
        }
        storage.data = match data {
            Some(data) => data.to_vec(),
            None => vec![0; size],
        };
        storage.data.resize(size, 0);
        storage.usage = usage;
        Ok(())
    }

    /// Overwrite `[offset, offset + data.len())` of the buffer bound at `target`
    pub fn buffer_sub_data(&self, target: BindingTarget, offset: usize, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        let (name, storage) = state.storage_mut(target)?;
        if storage.mapped.is_some() {
            return Err(Error::AlreadyLocked(format!("buffer_sub_data on mapped buffer {}", name.raw())));
        }
        let end = checked_end(offset, data.len(), storage.data.len())?;
        storage.data[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Map the buffer bound at `target` into host memory
    ///
    /// `flags` need `READ` or `WRITE`; `INVALIDATE_BUFFER` is only valid for
    /// write mappings and zero-fills the buffer before handing it out.
    /// Returns the mapped pointer and length.
    pub fn map_buffer(&self, target: BindingTarget, flags: MapFlags) -> Result<(NonNull<u8>, usize)> {
        if !flags.intersects(MapFlags::READ | MapFlags::WRITE) {
            return Err(Error::InvalidResource(format!("map_buffer: {:?} requests no access", flags)));
        }
        if flags.contains(MapFlags::READ | MapFlags::INVALIDATE_BUFFER) {
            return Err(Error::InvalidResource(format!("map_buffer: {:?} invalidates a read mapping", flags)));
        }

        let mut state = self.lock();
        let (name, storage) = state.storage_mut(target)?;
        if storage.mapped.is_some() {
            return Err(Error::AlreadyLocked(format!("buffer {} is already mapped", name.raw())));
        }
        if storage.data.is_empty() {
            return Err(Error::NotLockable(format!("buffer {} has no storage to map", name.raw())));
        }
        if flags.contains(MapFlags::INVALIDATE_BUFFER) {
            storage.data.fill(0);
        }
        let ptr = match NonNull::new(storage.data.as_mut_ptr()) {
            Some(ptr) => ptr,
            None => engine_bail!("prism::software", "buffer {} storage pointer is null", name.raw()),
        };
        storage.mapped = Some(flags);
        Ok((ptr, storage.data.len()))
    }

    pub fn unmap_buffer(&self, target: BindingTarget) -> Result<()> {
        let mut state = self.lock();
        let (name, storage) = state.storage_mut(target)?;
        if storage.mapped.take().is_none() {
            return Err(Error::NotLocked(format!("buffer {} is not mapped", name.raw())));
        }
        Ok(())
    }

    /// Copy between the buffers bound at `read_target` and `write_target`
    pub fn copy_buffer_sub_data(
        &self,
        read_target: BindingTarget,
        write_target: BindingTarget,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    ) -> Result<()> {
        let mut state = self.lock();
        let read_name = state.bound(read_target)?;
        let write_name = state.bound(write_target)?;

        let read_len = match state.buffers.get(&read_name) {
            Some(storage) if storage.mapped.is_none() => storage.data.len(),
            Some(_) => return Err(Error::AlreadyLocked(format!("copy source {} is mapped", read_name.raw()))),
            None => return Err(Error::InvalidResource(format!("buffer {} was deleted", read_name.raw()))),
        };
        let read_end = checked_end(read_offset, size, read_len)?;

        if read_name == write_name {
            let storage = state.storage_mut(write_target)?.1;
            let write_end = checked_end(write_offset, size, storage.data.len())?;
            if read_offset < write_end && write_offset < read_end {
                return Err(Error::OutOfRange(format!("overlapping copy within buffer {}", read_name.raw())));
            }
            storage.data.copy_within(read_offset..read_end, write_offset);
            return Ok(());
        }

        let source = match state.buffers.get(&read_name) {
            Some(storage) => storage.data[read_offset..read_end].to_vec(),
            None => return Err(Error::InvalidResource(format!("buffer {} was deleted", read_name.raw()))),
        };
        let (_, destination) = state.storage_mut(write_target)?;
        if destination.mapped.is_some() {
            return Err(Error::AlreadyLocked(format!("copy destination {} is mapped", write_name.raw())));
        }
        let write_end = checked_end(write_offset, size, destination.data.len())?;
        destination.data[write_offset..write_end].copy_from_slice(&source);
        Ok(())
    }
}

impl BindingState for SoftwareDevice {
    type Handle = BufferName;

    fn bound_buffer(&self, target: BindingTarget) -> Option<BufferName> {
        let state = self.lock();
        let context = state.current?;
        state.bindings.get(&context).and_then(|table| table.get(&target)).copied()
    }

    fn bind_buffer(&self, target: BindingTarget, handle: Option<BufferName>) {
        let mut state = self.lock();
        let Some(context) = state.current else {
            return;
        };
        let live = handle.filter(|name| state.buffers.contains_key(name));
        if let Some(table) = state.bindings.get_mut(&context) {
            match live {
                Some(name) => {
                    table.insert(target, name);
                }
                None => {
                    table.remove(&target);
                }
            }
        }
    }
}

fn checked_end(offset: usize, len: usize, size: usize) -> Result<usize> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(end),
        _ => Err(Error::OutOfRange(format!(
            "range {}..{} exceeds buffer size {}",
            offset,
            offset.saturating_add(len),
            size
        ))),
    }
}

#[cfg(test)]
#[path = "software_device_tests.rs"]
mod tests;
