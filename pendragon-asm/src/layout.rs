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

//! Layout (spec §4.11/§4.12): walk the program twice more, now assigning
//! every symbol a concrete address. Data is laid out onto 256-byte pages -
//! a word is never allowed to straddle a page boundary, matching the
//! runtime's own paged-accessor rule, so the cursor skips the last byte of
//! a page rather than split a word across it. Code is laid out as a flat
//! byte offset into the single code segment; the instruction unit has no
//! notion of pages.

use pendragon_isa::opcodes;

use crate::ast::{CodeItem, DataType, Program, Section};
use crate::encoder;
use crate::errors::AssemblyError;
use crate::symbol_table::SymbolTable;

const PAGE_SIZE: u32 = 256;

pub struct DataLayout {
    /// Page number -> bytes written so far into that page (sparse: only
    /// pages actually used appear here, in ascending order).
    pub pages: Vec<(u16, Vec<u8>)>,
}

pub fn layout_data(program: &Program, symbols: &mut SymbolTable) -> Result<DataLayout, AssemblyError> {
    let mut pages: Vec<(u16, Vec<u8>)> = Vec::new();
    let mut next_free_page: u16 = 0;
    let mut current_page: Option<u16> = None;
    let mut offset: u32 = 0;

    for section in &program.sections {
        let Section::Data(data) = section else { continue };
        for def in &data.definitions {
            let page_number = def.page_number.unwrap_or_else(|| current_page.unwrap_or(next_free_page));
            if current_page != Some(page_number) {
                current_page = Some(page_number);
                offset = pages.iter().find(|(p, _)| *p == page_number).map(|(_, b)| b.len() as u32).unwrap_or(0);
                if page_number >= next_free_page {
                    next_free_page = page_number + 1;
                }
            }

            let unit_size = match def.data_type {
                DataType::Word | DataType::Address => 2u32,
                DataType::Byte => 1u32,
            };

            if unit_size == 2 && offset % PAGE_SIZE == PAGE_SIZE - 1 {
                offset += 1; // never let a word straddle a page boundary
            }
            if offset >= PAGE_SIZE {
                return Err(AssemblyError::SemanticError {
                    line: def.line,
                    reason: format!("data page {page_number} overflowed its 256-byte capacity"),
                });
            }

            symbols.set_address(&def.label, page_number as u32 * PAGE_SIZE + offset, Some(page_number));

            let page_bytes = match pages.iter_mut().find(|(p, _)| *p == page_number) {
                Some((_, bytes)) => bytes,
                None => {
                    pages.push((page_number, Vec::new()));
                    &mut pages.last_mut().unwrap().1
                }
            };
            while (page_bytes.len() as u32) < offset {
                page_bytes.push(0);
            }
            for value in &def.values {
                match def.data_type {
                    DataType::Word | DataType::Address => {
                        let n = encoder::eval_constant(value, symbols, def.line)?;
                        page_bytes.extend_from_slice(&(n as u16).to_le_bytes());
                        offset += 2;
                    }
                    DataType::Byte => {
                        let n = encoder::eval_constant(value, symbols, def.line)?;
                        page_bytes.push(n as u8);
                        offset += 1;
                    }
                }
            }
            pages.sort_by_key(|(p, _)| *p);
        }
    }

    Ok(DataLayout { pages })
}

pub fn layout_code(program: &Program, symbols: &mut SymbolTable) -> Result<u32, AssemblyError> {
    let mut cursor: u32 = 0;
    for section in &program.sections {
        let Section::Code(code) = section else { continue };
        for item in &code.items {
            match item {
                CodeItem::Label(label) => symbols.set_address(&label.name, cursor, None),
                CodeItem::Instruction(instr) => {
                    let opcode = encoder::select_opcode(instr)?;
                    cursor += opcodes::OperandForm::total_bytes(opcode.form) as u32;
                }
            }
        }
    }
    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::semantic::analyze;

    fn layout_source(source: &str) -> (DataLayout, u32, SymbolTable) {
        let (tokens, _) = tokenize(source);
        let (program, parse_errors) = parse(tokens);
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        let mut symbols = analyze(&program).unwrap();
        let data = layout_data(&program, &mut symbols).unwrap();
        let code_len = layout_code(&program, &mut symbols).unwrap();
        (data, code_len, symbols)
    }

    #[test]
    fn words_never_straddle_a_page_boundary() {
        // Fill page 0 to the last byte with bytes, then request a word -
        // it must start fresh on page 1 rather than split across pages.
        let mut source = String::from("DATA\n");
        for i in 0..255 {
            source.push_str(&format!("b{i}: DB 1\n"));
        }
        source.push_str("w: DW 0x1234\nCODE\nHALT\n");
        let (data, _, symbols) = layout_source(&source);
        let w = symbols.get("w").unwrap();
        assert_eq!(w.page_number, Some(1));
        assert_eq!(data.pages.iter().find(|(p, _)| *p == 0).unwrap().1.len(), 256);
    }

    #[test]
    fn labels_get_sequential_code_addresses() {
        let (_, code_len, symbols) = layout_source("CODE\nstart:\nNOP\nmid:\nHALT\n");
        assert_eq!(symbols.get("start").unwrap().address, Some(0));
        assert_eq!(symbols.get("mid").unwrap().address, Some(1));
        assert_eq!(code_len, 2);
    }
}
