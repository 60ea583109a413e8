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

//! The Pendragon core execution engine: register file, virtual memory
//! unit, call stack, instruction unit, ALU, and the CPU that drives them.

pub mod alu;
pub mod basic_io;
pub mod cpu;
pub mod error;
pub mod flags;
pub mod instruction_unit;
pub mod memory;
pub mod register;
pub mod stack;

pub use alu::Alu;
pub use basic_io::{BasicIo, BufferedIo};
pub use cpu::Cpu;
pub use error::{RuntimeError, RuntimeResult};
pub use flags::{Flag, Flags, FlagsHandle};
pub use instruction_unit::InstructionUnit;
pub use memory::{AccessMode, ContextId, MemoryContext, PagedAccessor, ProtectionMode, StackMemoryAccessor, VirtualMemoryUnit};
pub use register::{Register, RegisterFile};
pub use stack::Stack;
