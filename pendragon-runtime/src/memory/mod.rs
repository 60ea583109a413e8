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

//! Memory subsystem (spec §4.2-§4.3): contexts, accessors, and the unit
//! that owns both.

pub mod accessor;
pub mod context;
pub mod vmu;

pub use accessor::{AccessMode, PagedAccessor, StackMemoryAccessor};
pub use context::{ContextId, MemoryContext};
pub use vmu::{ProtectionMode, VirtualMemoryUnit};
