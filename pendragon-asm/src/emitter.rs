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

//! Final pass: flatten the page-sparse data layout into one contiguous
//! buffer (page `p` lives at byte offset `p * 256`, matching
//! [`pendragon_runtime`]'s paged accessor) and encode every instruction in
//! source order into the code segment, now that every symbol has an
//! address.

use crate::ast::{CodeItem, Program, Section};
use crate::encoder;
use crate::errors::AssemblyError;
use crate::layout::DataLayout;
use crate::symbol_table::SymbolTable;

const PAGE_SIZE: usize = 256;

pub fn emit_data(layout: &DataLayout) -> Vec<u8> {
    let highest_page = layout.pages.iter().map(|(p, _)| *p).max().unwrap_or(0);
    let mut out = vec![0u8; (highest_page as usize + 1) * PAGE_SIZE];
    for (page, bytes) in &layout.pages {
        let start = *page as usize * PAGE_SIZE;
        out[start..start + bytes.len()].copy_from_slice(bytes);
    }
    out
}

pub fn emit_code(program: &Program, symbols: &SymbolTable) -> Result<Vec<u8>, AssemblyError> {
    let mut out = Vec::new();
    for section in &program.sections {
        let Section::Code(code) = section else { continue };
        for item in &code.items {
            if let CodeItem::Instruction(instr) = item {
                let opcode = encoder::select_opcode(instr)?;
                out.extend(encoder::encode_instruction(instr, opcode, symbols)?);
            }
        }
    }
    Ok(out)
}
