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

//! Memory accessors: the only capability that can touch a context's bytes
//! (spec §4.3). Both kinds bind one context and one [`AccessMode`] at
//! creation time; a `READ_ONLY` accessor rejects every write.
//!
//! Word access on the paged accessor never straddles a page boundary: an
//! `offset` of 255 is out of range for a word op. The spec leaves the
//! straddling case implementer-defined (open question #2); DESIGN.md
//! records this as a deliberate "reject" rather than "auto-advance".

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeResult};
use crate::memory::context::ContextId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    fn require_writable(self, context: ContextId) -> RuntimeResult<()> {
        match self {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::ReadOnly => Err(RuntimeError::WriteThroughReadOnlyAccessor { context }),
        }
    }
}

/// Addresses a 256-byte page plus a byte offset within one context.
pub struct PagedAccessor {
    context: ContextId,
    bytes: Rc<RefCell<Vec<u8>>>,
    capacity: usize,
    mode: AccessMode,
    page: u8,
}

impl PagedAccessor {
    pub(crate) fn new(context: ContextId, bytes: Rc<RefCell<Vec<u8>>>, capacity: usize, mode: AccessMode) -> Self {
        PagedAccessor { context, bytes, capacity, mode, page: 0 }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn current_page(&self) -> u8 {
        self.page
    }

    pub fn set_page(&mut self, page: u8) {
        self.page = page;
    }

    fn address(&self, offset: u8) -> RuntimeResult<usize> {
        let addr = (self.page as usize) * 256 + (offset as usize);
        if addr >= self.capacity {
            return Err(RuntimeError::PageOutOfRange { context: self.context, page: self.page, offset: offset as u16 });
        }
        Ok(addr)
    }

    pub fn read_byte(&self, offset: u8) -> RuntimeResult<u8> {
        let addr = self.address(offset)?;
        Ok(self.bytes.borrow()[addr])
    }

    pub fn write_byte(&mut self, offset: u8, value: u8) -> RuntimeResult<()> {
        self.mode.require_writable(self.context)?;
        let addr = self.address(offset)?;
        self.bytes.borrow_mut()[addr] = value;
        Ok(())
    }

    /// Reads two consecutive bytes within the same page, little-endian.
    /// `offset == 255` is rejected rather than silently reading into the
    /// next page (see module docs).
    pub fn read_word(&self, offset: u8) -> RuntimeResult<u16> {
        if offset == 255 {
            return Err(RuntimeError::PageOutOfRange { context: self.context, page: self.page, offset: offset as u16 });
        }
        let low = self.read_byte(offset)?;
        let high = self.read_byte(offset + 1)?;
        Ok(u16::from_le_bytes([low, high]))
    }

    pub fn write_word(&mut self, offset: u8, value: u16) -> RuntimeResult<()> {
        if offset == 255 {
            return Err(RuntimeError::PageOutOfRange { context: self.context, page: self.page, offset: offset as u16 });
        }
        let [low, high] = value.to_le_bytes();
        self.write_byte(offset, low)?;
        self.write_byte(offset + 1, high)?;
        Ok(())
    }
}

/// Addresses bytes directly by `addr32` within one context, with no paging.
pub struct StackMemoryAccessor {
    context: ContextId,
    bytes: Rc<RefCell<Vec<u8>>>,
    capacity: usize,
    mode: AccessMode,
}

impl StackMemoryAccessor {
    pub(crate) fn new(context: ContextId, bytes: Rc<RefCell<Vec<u8>>>, capacity: usize, mode: AccessMode) -> Self {
        StackMemoryAccessor { context, bytes, capacity, mode }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    fn check_bounds(&self, addr: u32, width: u32) -> RuntimeResult<()> {
        if (addr as u64) + (width as u64) > self.capacity as u64 {
            return Err(RuntimeError::AddressNotMapped { address: addr as u64 });
        }
        Ok(())
    }

    pub fn read_byte(&self, addr: u32) -> RuntimeResult<u8> {
        self.check_bounds(addr, 1)?;
        Ok(self.bytes.borrow()[addr as usize])
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) -> RuntimeResult<()> {
        self.mode.require_writable(self.context)?;
        self.check_bounds(addr, 1)?;
        self.bytes.borrow_mut()[addr as usize] = value;
        Ok(())
    }

    pub fn read_word(&self, addr: u32) -> RuntimeResult<u16> {
        self.check_bounds(addr, 2)?;
        let b = self.bytes.borrow();
        Ok(u16::from_le_bytes([b[addr as usize], b[addr as usize + 1]]))
    }

    pub fn write_word(&mut self, addr: u32, value: u16) -> RuntimeResult<()> {
        self.mode.require_writable(self.context)?;
        self.check_bounds(addr, 2)?;
        let [low, high] = value.to_le_bytes();
        let mut b = self.bytes.borrow_mut();
        b[addr as usize] = low;
        b[addr as usize + 1] = high;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn paged(mode: AccessMode) -> PagedAccessor {
        PagedAccessor::new(1, Rc::new(RefCell::new(vec![0u8; 512])), 512, mode)
    }

    #[test]
    fn write_through_read_only_fails() {
        let mut acc = paged(AccessMode::ReadOnly);
        assert!(matches!(acc.write_byte(0, 1), Err(RuntimeError::WriteThroughReadOnlyAccessor { .. })));
    }

    #[test]
    fn word_read_write_round_trips_within_a_page() {
        let mut acc = paged(AccessMode::ReadWrite);
        acc.set_page(1);
        acc.write_word(10, 0xBEEF).unwrap();
        assert_eq!(acc.read_word(10).unwrap(), 0xBEEF);
    }

    #[test]
    fn word_access_at_offset_255_is_rejected() {
        let acc = paged(AccessMode::ReadWrite);
        assert!(acc.read_word(255).is_err());
    }

    #[test]
    fn out_of_capacity_page_is_rejected() {
        let acc = paged(AccessMode::ReadWrite); // capacity 512 = 2 pages
        let mut acc2 = acc;
        acc2.set_page(5);
        assert!(acc2.read_byte(0).is_err());
    }

    #[test]
    fn stack_accessor_bounds_check() {
        let mut acc = StackMemoryAccessor::new(2, Rc::new(RefCell::new(vec![0u8; 4])), 4, AccessMode::ReadWrite);
        acc.write_byte(3, 9).unwrap();
        assert_eq!(acc.read_byte(3).unwrap(), 9);
        assert!(acc.write_byte(4, 1).is_err());
    }
}
