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

//! Picks an opcode row for an instruction's operand shapes and encodes the
//! instruction to bytes (spec §4.12/§4.13), resolving symbol references
//! through the now fully-addressed symbol table.

use pendragon_isa::opcodes::{self, Opcode, OperandForm};
use pendragon_isa::registers::RegisterCode;

use crate::ast::{BinaryOperator, Expression, Instruction, Operand};
use crate::errors::AssemblyError;
use crate::symbol_table::SymbolTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Register,
    Address,
    Other,
}

fn shape_of(operand: &Operand) -> Shape {
    match operand {
        Operand::Register(_) => Shape::Register,
        Operand::MemoryAccess(_, _) => Shape::Address,
        Operand::Immediate(_) | Operand::Identifier(_) | Operand::InlineData(_) => Shape::Other,
    }
}

fn form_matches(form: OperandForm, operands: &[Operand]) -> bool {
    let shapes: Vec<Shape> = operands.iter().map(shape_of).collect();
    match form {
        OperandForm::NoOperand => shapes.is_empty(),
        OperandForm::RegOnly => shapes == [Shape::Register],
        OperandForm::RegReg => shapes == [Shape::Register, Shape::Register],
        OperandForm::RegImmByte | OperandForm::RegImmWord => shapes == [Shape::Register, Shape::Other],
        OperandForm::RegAddr => shapes == [Shape::Register, Shape::Address],
        OperandForm::ImmByte | OperandForm::ImmWord => shapes == [Shape::Other],
        OperandForm::PageImm => shapes == [Shape::Other, Shape::Other],
        OperandForm::PageReg => shapes == [Shape::Register, Shape::Other],
    }
}

pub fn select_opcode(instr: &Instruction) -> Result<&'static Opcode, AssemblyError> {
    let rows = opcodes::rows_for_mnemonic(&instr.mnemonic);
    if rows.is_empty() {
        return Err(AssemblyError::UnknownMnemonic { line: instr.line, mnemonic: instr.mnemonic.clone() });
    }
    rows.into_iter()
        .find(|row| form_matches(row.form, &instr.operands))
        .ok_or_else(|| AssemblyError::NoMatchingEncoding { line: instr.line, mnemonic: instr.mnemonic.clone() })
}

/// Evaluate a constant-folded expression (no registers permitted) for use
/// in a data definition.
pub fn eval_constant(expr: &Expression, symbols: &SymbolTable, line: usize) -> Result<i64, AssemblyError> {
    match expr {
        Expression::Number(n) => Ok(*n),
        Expression::Identifier(name) => Ok(symbols.resolved_address(name, line)? as i64),
        Expression::Register(name) => {
            Err(AssemblyError::SemanticError { line, reason: format!("register '{name}' cannot appear in a constant expression") })
        }
        Expression::BinaryOp { op, lhs, rhs } => {
            let l = eval_constant(lhs, symbols, line)?;
            let r = eval_constant(rhs, symbols, line)?;
            Ok(match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Sub => l - r,
            })
        }
    }
}

fn register_byte(operand: &Operand, line: usize) -> Result<u8, AssemblyError> {
    match operand {
        Operand::Register(name) => RegisterCode::from_name(name)
            .map(RegisterCode::encode)
            .ok_or_else(|| AssemblyError::ExpectedRegister { line, found: name.clone() }),
        other => Err(AssemblyError::ExpectedRegister { line, found: format!("{other:?}") }),
    }
}

fn value_of(operand: &Operand, symbols: &SymbolTable, line: usize) -> Result<i64, AssemblyError> {
    match operand {
        Operand::Immediate(expr) | Operand::MemoryAccess(expr, _) => eval_constant(expr, symbols, line),
        Operand::Identifier(name) => Ok(symbols.resolved_address(name, line)? as i64),
        Operand::InlineData(bytes) if bytes.len() == 1 => Ok(bytes[0] as i64),
        Operand::InlineData(_) => Err(AssemblyError::SemanticError {
            line,
            reason: "a string operand must be exactly one byte wide here".to_string(),
        }),
        Operand::Register(name) => Err(AssemblyError::ExpectedRegister { line, found: name.clone() }),
    }
}

fn check_range(value: i64, bits: u32, line: usize) -> Result<(), AssemblyError> {
    let max = 1i64 << bits;
    if !(0..max).contains(&value) && !((-(max / 2))..(max / 2)).contains(&value) {
        return Err(AssemblyError::ValueOutOfRange { line, value, bits });
    }
    Ok(())
}

/// Encode one instruction given its chosen opcode row and the now fully
/// laid-out symbol table.
pub fn encode_instruction(instr: &Instruction, opcode: &Opcode, symbols: &SymbolTable) -> Result<Vec<u8>, AssemblyError> {
    let line = instr.line;
    let mut out = vec![opcode.byte];
    match opcode.form {
        OperandForm::NoOperand => {}
        OperandForm::RegOnly => out.push(register_byte(&instr.operands[0], line)?),
        OperandForm::RegReg => {
            out.push(register_byte(&instr.operands[0], line)?);
            out.push(register_byte(&instr.operands[1], line)?);
        }
        OperandForm::RegImmByte => {
            out.push(register_byte(&instr.operands[0], line)?);
            let v = value_of(&instr.operands[1], symbols, line)?;
            check_range(v, 8, line)?;
            out.push(v as u8);
        }
        OperandForm::RegImmWord => {
            out.push(register_byte(&instr.operands[0], line)?);
            let v = value_of(&instr.operands[1], symbols, line)?;
            check_range(v, 16, line)?;
            out.extend_from_slice(&(v as u16).to_le_bytes());
        }
        OperandForm::RegAddr => {
            out.push(register_byte(&instr.operands[0], line)?);
            let v = value_of(&instr.operands[1], symbols, line)?;
            check_range(v, 16, line)?;
            out.extend_from_slice(&(v as u16).to_le_bytes());
        }
        OperandForm::ImmByte => {
            let v = value_of(&instr.operands[0], symbols, line)?;
            check_range(v, 8, line)?;
            out.push(v as u8);
        }
        OperandForm::ImmWord => {
            let v = value_of(&instr.operands[0], symbols, line)?;
            check_range(v, 16, line)?;
            out.extend_from_slice(&(v as u16).to_le_bytes());
        }
        OperandForm::PageImm => {
            let page = value_of(&instr.operands[0], symbols, line)?;
            let context = value_of(&instr.operands[1], symbols, line)?;
            check_range(page, 16, line)?;
            check_range(context, 16, line)?;
            out.extend_from_slice(&(page as u16).to_le_bytes());
            out.extend_from_slice(&(context as u16).to_le_bytes());
        }
        OperandForm::PageReg => {
            out.push(register_byte(&instr.operands[0], line)?);
            let context = value_of(&instr.operands[1], symbols, line)?;
            check_range(context, 16, line)?;
            out.extend_from_slice(&(context as u16).to_le_bytes());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::semantic::analyze;
    use crate::ast::{CodeItem, Section};

    fn first_instruction(source: &str) -> (Instruction, SymbolTable) {
        let (tokens, _) = tokenize(source);
        let (program, errors) = parse(tokens);
        assert!(errors.is_empty(), "{errors:?}");
        let symbols = analyze(&program).unwrap();
        for section in &program.sections {
            if let Section::Code(code) = section {
                for item in &code.items {
                    if let CodeItem::Instruction(instr) = item {
                        return (instr.clone(), symbols);
                    }
                }
            }
        }
        panic!("no instruction found");
    }

    #[test]
    fn ld_with_immediate_picks_reg_imm_word_row() {
        let (instr, symbols) = first_instruction("CODE\nLD AX, 1000\n");
        let opcode = select_opcode(&instr).unwrap();
        assert_eq!(opcode.byte, 0x02);
        let bytes = encode_instruction(&instr, opcode, &symbols).unwrap();
        assert_eq!(bytes, vec![0x02, 0x01, 0xE8, 0x03]);
    }

    #[test]
    fn ld_with_register_picks_reg_reg_row() {
        let (instr, symbols) = first_instruction("CODE\nLD AX, BX\n");
        let opcode = select_opcode(&instr).unwrap();
        assert_eq!(opcode.byte, 0x03);
        let bytes = encode_instruction(&instr, opcode, &symbols).unwrap();
        assert_eq!(bytes, vec![0x03, 0x01, 0x02]);
    }

    #[test]
    fn unknown_mnemonic_is_reported() {
        let (instr, _) = first_instruction("CODE\nFROB AX\n");
        assert!(matches!(select_opcode(&instr), Err(AssemblyError::UnknownMnemonic { .. })));
    }

    #[test]
    fn value_too_large_for_a_byte_field_is_rejected() {
        let (instr, symbols) = first_instruction("CODE\nADB 999\n");
        let opcode = select_opcode(&instr).unwrap();
        assert!(matches!(
            encode_instruction(&instr, opcode, &symbols),
            Err(AssemblyError::ValueOutOfRange { bits: 8, .. })
        ));
    }
}
