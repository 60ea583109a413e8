/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! The Virtual Memory Unit (spec §4.2): owns every context, gates accessor
//! and context-lifecycle requests by the current protection mode.
//!
//! Contexts are kept in a `HashMap<ContextId, MemoryContext>` rather than a
//! `Vec` indexed by id, because `destroy_context` must be able to free a
//! context without disturbing the ids of its siblings.

use std::collections::HashMap;

use crate::error::{RuntimeError, RuntimeResult};
use crate::memory::accessor::{AccessMode, PagedAccessor, StackMemoryAccessor};
use crate::memory::context::{ContextId, MemoryContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionMode {
    Unprotected,
    Protected,
}

pub struct VirtualMemoryUnit {
    mode: ProtectionMode,
    contexts: HashMap<ContextId, MemoryContext>,
    next_id: ContextId,
    next_vaddr: u64,
}

impl VirtualMemoryUnit {
    pub fn new() -> Self {
        VirtualMemoryUnit {
            mode: ProtectionMode::Unprotected,
            contexts: HashMap::new(),
            next_id: 0,
            next_vaddr: 0,
        }
    }

    pub fn set_mode(&mut self, mode: ProtectionMode) {
        log::debug!("VMU mode transition: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }

    pub fn is_protected(&self) -> bool {
        self.mode == ProtectionMode::Protected
    }

    pub fn create_context(&mut self, capacity: usize) -> RuntimeResult<ContextId> {
        if self.is_protected() {
            return Err(RuntimeError::ContextMutationRequiresUnprotectedMode);
        }
        let id = self.next_id;
        self.next_id += 1;
        let start_vaddr = self.next_vaddr;
        self.next_vaddr += capacity as u64;
        let context = MemoryContext::new(id, start_vaddr, capacity);
        log::debug!("created context {} at vaddr 0x{:X}, capacity {}", id, start_vaddr, capacity);
        self.contexts.insert(id, context);
        Ok(id)
    }

    pub fn destroy_context(&mut self, id: ContextId) -> RuntimeResult<()> {
        if self.is_protected() {
            return Err(RuntimeError::ContextMutationRequiresUnprotectedMode);
        }
        self.contexts.remove(&id).ok_or(RuntimeError::UnknownContext(id))?;
        log::debug!("destroyed context {}", id);
        Ok(())
    }

    pub fn get_context(&self, id: ContextId) -> RuntimeResult<&MemoryContext> {
        self.contexts.get(&id).ok_or(RuntimeError::UnknownContext(id))
    }

    pub fn find_context_for_address(&self, vaddr: u64) -> RuntimeResult<&MemoryContext> {
        self.contexts
            .values()
            .find(|c| c.contains(vaddr))
            .ok_or(RuntimeError::AddressNotMapped { address: vaddr })
    }

    pub fn create_paged_accessor(&self, id: ContextId, mode: AccessMode) -> RuntimeResult<PagedAccessor> {
        if !self.is_protected() {
            return Err(RuntimeError::AccessorRequiresProtectedMode);
        }
        let context = self.get_context(id)?;
        Ok(PagedAccessor::new(id, context.bytes_handle(), context.capacity, mode))
    }

    pub fn create_stack_accessor(&self, id: ContextId, mode: AccessMode) -> RuntimeResult<StackMemoryAccessor> {
        if !self.is_protected() {
            return Err(RuntimeError::AccessorRequiresProtectedMode);
        }
        let context = self.get_context(id)?;
        Ok(StackMemoryAccessor::new(id, context.bytes_handle(), context.capacity, mode))
    }
}

impl Default for VirtualMemoryUnit {
    fn default() -> Self {
        Self::new()
    }
}
