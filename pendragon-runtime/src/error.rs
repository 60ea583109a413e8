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

//! Runtime error taxonomy (spec §7, items 1-6). Every fault the core can
//! hit is one variant here; there is no recovery path, only propagation
//! up to whatever drives the CPU loop.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    // -- Capability / mode errors --
    #[error("cannot create an accessor while the VMU is UNPROTECTED")]
    AccessorRequiresProtectedMode,
    #[error("cannot create or destroy a context while the VMU is PROTECTED")]
    ContextMutationRequiresUnprotectedMode,
    #[error("write through a READ_ONLY accessor to context {context}")]
    WriteThroughReadOnlyAccessor { context: u32 },

    // -- Memory-range errors --
    #[error("context {context} has no page {page}, or offset {offset} is out of range")]
    PageOutOfRange { context: u32, page: u8, offset: u16 },
    #[error("address 0x{address:X} is not mapped by any context")]
    AddressNotMapped { address: u64 },
    #[error("unknown memory context {0}")]
    UnknownContext(u32),

    // -- Stack-discipline errors --
    #[error("stack overflow: sp {sp} + {requested} exceeds capacity {capacity}")]
    StackOverflow { sp: u32, requested: u32, capacity: u32 },
    #[error("stack underflow: cannot pop below frame base {frame_base}")]
    StackUnderflow { frame_base: i64 },
    #[error("invalid frame pointer {0}, must be in [-1, capacity)")]
    InvalidFramePointer(i64),

    // -- Return-linkage errors --
    #[error("return_from_subroutine called with an empty return stack")]
    ReturnStackEmpty,

    // -- Arithmetic errors --
    #[error("division by zero")]
    DivisionByZero,
    #[error("ALU constructed with an accumulator that has no bound flags")]
    AccumulatorNotFlagBound,

    // -- Decode errors --
    #[error("unknown opcode 0x{opcode:02X} at IR=0x{ir:04X}")]
    UnknownOpcode { opcode: u8, ir: u16 },
    #[error("unknown system call number 0x{0:04X}")]
    UnknownSyscall(u16),

    // -- Register-indirect / decode support --
    #[error("byte 0x{0:02X} does not name a general-purpose register")]
    InvalidRegisterCode(u8),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
