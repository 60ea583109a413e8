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

//! A single isolated memory context (spec §3): an identifier, a start
//! vaddr, a fixed zero-initialized capacity. The backing bytes live behind
//! `Rc<RefCell<_>>` so that accessors can hold a handle into the arena by
//! index/clone instead of borrowing the VMU directly (see DESIGN.md for
//! why this sidesteps the VMU/context/accessor reference cycle).

use std::cell::RefCell;
use std::rc::Rc;

pub type ContextId = u32;

#[derive(Clone)]
pub struct MemoryContext {
    pub id: ContextId,
    pub start_vaddr: u64,
    pub capacity: usize,
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl MemoryContext {
    pub fn new(id: ContextId, start_vaddr: u64, capacity: usize) -> Self {
        MemoryContext { id, start_vaddr, capacity, bytes: Rc::new(RefCell::new(vec![0u8; capacity])) }
    }

    pub fn end_vaddr(&self) -> u64 {
        self.start_vaddr + self.capacity as u64
    }

    pub fn contains(&self, vaddr: u64) -> bool {
        vaddr >= self.start_vaddr && vaddr < self.end_vaddr()
    }

    pub(crate) fn bytes_handle(&self) -> Rc<RefCell<Vec<u8>>> {
        self.bytes.clone()
    }
}
