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

//! Wire-level contract shared between `pendragon-asm` and `pendragon-runtime`:
//! register codes, the opcode table, system-call numbers, and the binary
//! loader format. Neither the assembler nor the runtime is allowed to
//! invent its own copy of any of this — both depend on this crate so that
//! an assembled image and the CPU that fetches it agree on every byte.

pub mod format;
pub mod opcodes;
pub mod registers;
pub mod syscalls;

pub use format::{Header, LoaderError, MachineVersion};
pub use opcodes::{OpKind, OperandForm, Opcode};
pub use registers::RegisterCode;
