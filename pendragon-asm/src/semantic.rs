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

//! Semantic analysis (spec §4.10): build the symbol table from every label
//! and data definition, then confirm every symbol an instruction or data
//! value references actually exists. Addresses are not assigned here -
//! that is [`crate::layout`]'s job, which runs only once every symbol is
//! known to exist.

use pendragon_isa::registers::RegisterCode;

use crate::ast::{CodeItem, DataType, Expression, Operand, Program, Section};
use crate::errors::AssemblyError;
use crate::symbol_table::{SymbolKind, SymbolTable};

pub fn analyze(program: &Program) -> Result<SymbolTable, Vec<AssemblyError>> {
    let mut table = SymbolTable::new();
    let mut errors = Vec::new();

    for section in &program.sections {
        match section {
            Section::Data(data) => {
                for def in &data.definitions {
                    let size = size_of_definition(def.data_type, def.values.len());
                    match table.define(&def.label, SymbolKind::Data, def.line, size) {
                        Ok(()) => table.set_data_type(&def.label, def.data_type),
                        Err(e) => errors.push(e),
                    }
                }
            }
            Section::Code(code) => {
                for item in &code.items {
                    if let CodeItem::Label(label) = item {
                        if let Err(e) = table.define(&label.name, SymbolKind::Label, label.line, 0) {
                            errors.push(e);
                        }
                    }
                }
            }
        }
    }

    for section in &program.sections {
        match section {
            Section::Data(data) => {
                for def in &data.definitions {
                    for value in &def.values {
                        check_expression(value, def.line, &mut table, &mut errors);
                    }
                }
            }
            Section::Code(code) => {
                for item in &code.items {
                    if let CodeItem::Instruction(instr) = item {
                        for operand in &instr.operands {
                            match operand {
                                Operand::Immediate(expr) | Operand::MemoryAccess(expr, _) => {
                                    check_expression(expr, instr.line, &mut table, &mut errors);
                                }
                                Operand::Identifier(name) => {
                                    check_symbol_reference(name, instr.line, &mut table, &mut errors);
                                }
                                Operand::Register(_) | Operand::InlineData(_) => {}
                            }
                        }
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(table)
    } else {
        Err(errors)
    }
}

fn size_of_definition(data_type: DataType, value_count: usize) -> u32 {
    match data_type {
        DataType::Word | DataType::Address => value_count as u32 * 2,
        DataType::Byte => value_count as u32,
    }
}

/// Rewrites the `Identifier '[' Expr ']'` sugar (spec §4.10.4): an `LD`
/// targeting a sugared memory operand becomes `LDA` or `LDAB` depending on
/// the referenced data symbol's declared width, so the assembled bytes
/// match what writing `LDA`/`LDAB` directly would have produced. Must run
/// after [`analyze`] has populated `symbols` and before layout/encoding see
/// the mnemonic.
pub fn rewrite_load_sugar(program: &mut Program, symbols: &SymbolTable) {
    for section in &mut program.sections {
        let Section::Code(code) = section else { continue };
        for item in &mut code.items {
            let CodeItem::Instruction(instr) = item else { continue };
            if instr.mnemonic != "LD" {
                continue;
            }
            let Some(Operand::MemoryAccess(expr, true)) = instr.operands.get(1) else { continue };
            let Expression::BinaryOp { lhs, .. } = expr else { continue };
            let Expression::Identifier(name) = lhs.as_ref() else { continue };
            let is_byte = matches!(symbols.get(name).and_then(|s| s.data_type), Some(DataType::Byte));
            instr.mnemonic = if is_byte { "LDAB".to_string() } else { "LDA".to_string() };
        }
    }
}

fn check_expression(expr: &Expression, line: usize, table: &mut SymbolTable, errors: &mut Vec<AssemblyError>) {
    match expr {
        Expression::Number(_) | Expression::Register(_) => {}
        Expression::Identifier(name) => check_symbol_reference(name, line, table, errors),
        Expression::BinaryOp { lhs, rhs, .. } => {
            check_expression(lhs, line, table, errors);
            check_expression(rhs, line, table, errors);
        }
    }
}

fn check_symbol_reference(name: &str, line: usize, table: &mut SymbolTable, errors: &mut Vec<AssemblyError>) {
    if RegisterCode::from_name(name).is_some() {
        return;
    }
    if table.get(name).is_some() {
        table.record_reference(name, line);
    } else {
        errors.push(AssemblyError::UndefinedSymbol { name: name.to_string(), line });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn analyze_source(source: &str) -> Result<SymbolTable, Vec<AssemblyError>> {
        let (tokens, lex_errors) = tokenize(source);
        assert!(lex_errors.is_empty());
        let (program, parse_errors) = parse(tokens);
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        analyze(&program)
    }

    #[test]
    fn forward_reference_to_a_label_is_allowed() {
        let table = analyze_source("CODE\nJMP later\nlater:\nHALT\n").unwrap();
        assert!(table.get("later").is_some());
    }

    #[test]
    fn reference_to_an_undefined_symbol_is_rejected() {
        let errors = analyze_source("CODE\nJMP nowhere\n").unwrap_err();
        assert!(matches!(&errors[0], AssemblyError::UndefinedSymbol { name, .. } if name == "nowhere"));
    }

    #[test]
    fn duplicate_label_is_rejected_but_analysis_continues() {
        let errors = analyze_source("CODE\nfoo:\nHALT\nfoo:\nHALT\n").unwrap_err();
        assert!(matches!(&errors[0], AssemblyError::DuplicateSymbol { name, .. } if name == "foo"));
    }

    #[test]
    fn data_definition_size_is_recorded_in_bytes() {
        let table = analyze_source("DATA\nbuf: DW 1, 2, 3\nCODE\nHALT\n").unwrap();
        assert_eq!(table.get("buf").unwrap().size_bytes, 6);
    }

    #[test]
    fn load_sugar_is_rewritten_to_the_byte_or_word_load() {
        let source = "DATA\nbytes: DB 1, 2, 3\nwords: DW 1, 2, 3\nCODE\nLD AX, bytes[BX]\nLD AX, words[BX]\nHALT\n";
        let (tokens, _) = tokenize(source);
        let (mut program, parse_errors) = parse(tokens);
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        let table = analyze(&program).unwrap();
        rewrite_load_sugar(&mut program, &table);
        let Section::Code(code) = &program.sections[1] else { panic!("expected code section") };
        let CodeItem::Instruction(first) = &code.items[0] else { panic!("expected instruction") };
        let CodeItem::Instruction(second) = &code.items[1] else { panic!("expected instruction") };
        assert_eq!(first.mnemonic, "LDAB");
        assert_eq!(second.mnemonic, "LDA");
    }
}
