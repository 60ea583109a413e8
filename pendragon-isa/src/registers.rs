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

//! Register code byte used inside encoded instructions (spec §4.7).
//!
//! `AX..EX` are the five general-purpose registers instructions may name.
//! `Ir`/`Sp`/`Si` exist only so that diagnostic tooling can print a byte
//! that doesn't decode to a GPR; normal instructions never accept them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterCode {
    Ax,
    Bx,
    Cx,
    Dx,
    Ex,
    /// Diagnostic-only: the instruction pointer.
    Ir,
    /// Diagnostic-only: the stack pointer.
    Sp,
    /// Diagnostic-only: the stack-accessor "index" register used by tooling.
    Si,
}

impl RegisterCode {
    /// True for the five registers an ordinary instruction may reference.
    pub fn is_general_purpose(self) -> bool {
        matches!(self, RegisterCode::Ax | RegisterCode::Bx | RegisterCode::Cx
            | RegisterCode::Dx | RegisterCode::Ex)
    }

    pub fn encode(self) -> u8 {
        match self {
            RegisterCode::Ax => 0x01,
            RegisterCode::Bx => 0x02,
            RegisterCode::Cx => 0x03,
            RegisterCode::Dx => 0x04,
            RegisterCode::Ex => 0x05,
            RegisterCode::Ir => 0xF0,
            RegisterCode::Sp => 0xF1,
            RegisterCode::Si => 0xF2,
        }
    }

    pub fn decode(byte: u8) -> Option<RegisterCode> {
        match byte {
            0x01 => Some(RegisterCode::Ax),
            0x02 => Some(RegisterCode::Bx),
            0x03 => Some(RegisterCode::Cx),
            0x04 => Some(RegisterCode::Dx),
            0x05 => Some(RegisterCode::Ex),
            0xF0 => Some(RegisterCode::Ir),
            0xF1 => Some(RegisterCode::Sp),
            0xF2 => Some(RegisterCode::Si),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RegisterCode::Ax => "AX",
            RegisterCode::Bx => "BX",
            RegisterCode::Cx => "CX",
            RegisterCode::Dx => "DX",
            RegisterCode::Ex => "EX",
            RegisterCode::Ir => "IR",
            RegisterCode::Sp => "SP",
            RegisterCode::Si => "SI",
        }
    }

    pub fn from_name(name: &str) -> Option<RegisterCode> {
        match name.to_ascii_uppercase().as_str() {
            "AX" => Some(RegisterCode::Ax),
            "BX" => Some(RegisterCode::Bx),
            "CX" => Some(RegisterCode::Cx),
            "DX" => Some(RegisterCode::Dx),
            "EX" => Some(RegisterCode::Ex),
            "IR" => Some(RegisterCode::Ir),
            "SP" => Some(RegisterCode::Sp),
            "SI" => Some(RegisterCode::Si),
            _ => None,
        }
    }
}
