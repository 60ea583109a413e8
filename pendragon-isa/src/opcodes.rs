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

//! The fixed opcode table. One row per mnemonic form; the assembler's IR
//! builder looks mnemonics up here to pick an opcode and an operand
//! pattern, and the CPU's dispatch loop looks opcodes up here to know how
//! many operand bytes follow before it can hand the instruction to a
//! handler.
//!
//! Byte layouts (spec §4.13) by `OperandForm`:
//!
//! | form | bytes after opcode | layout |
//! |---|---|---|
//! | `NoOperand` | 0 | - |
//! | `RegOnly` | 1 | reg |
//! | `RegReg` | 2 | reg, reg |
//! | `RegImmByte` | 2 | reg, imm8 |
//! | `RegImmWord` | 3 | reg, imm16 (LE) |
//! | `RegAddr` | 3 | reg, addr16 (LE) |
//! | `ImmByte` | 1 | imm8 |
//! | `ImmWord` | 2 | imm16 (LE) |
//! | `PageImm` | 4 | page16 (LE), context16 (LE) |
//! | `PageReg` | 3 | reg, context16 (LE) |

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandForm {
    NoOperand,
    RegOnly,
    RegReg,
    RegImmByte,
    RegImmWord,
    RegAddr,
    ImmByte,
    ImmWord,
    PageImm,
    PageReg,
}

impl OperandForm {
    /// Number of bytes that follow the opcode byte for this form.
    pub fn operand_bytes(self) -> usize {
        match self {
            OperandForm::NoOperand => 0,
            OperandForm::RegOnly => 1,
            OperandForm::RegReg => 2,
            OperandForm::RegImmByte => 2,
            OperandForm::RegImmWord => 3,
            OperandForm::RegAddr => 3,
            OperandForm::ImmByte => 1,
            OperandForm::ImmWord => 2,
            OperandForm::PageImm => 4,
            OperandForm::PageReg => 3,
        }
    }

    /// Total instruction size including the opcode byte.
    pub fn total_bytes(self) -> usize {
        1 + self.operand_bytes()
    }
}

/// What family of behavior an opcode belongs to; used by the runtime to
/// route to the right handler bank without re-deriving it from the
/// mnemonic string at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Misc,
    Data,
    Stack,
    Paging,
    ControlFlow,
    Arithmetic,
    Logical,
    ShiftRotate,
    Compare,
    Syscall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: &'static str,
    pub byte: u8,
    pub form: OperandForm,
    pub kind: OpKind,
}

macro_rules! op {
    ($mnemonic:literal, $byte:literal, $form:ident, $kind:ident) => {
        Opcode { mnemonic: $mnemonic, byte: $byte, form: OperandForm::$form, kind: OpKind::$kind }
    };
}

/// The complete, fixed opcode table (spec §6). Mnemonics that accept more
/// than one operand shape (e.g. `LD` with a register source vs. an
/// immediate word) occupy more than one row; the assembler's IR builder
/// disambiguates by the operand it parsed.
pub const OPCODE_TABLE: &[Opcode] = &[
    op!("NOP", 0x00, NoOperand, Misc),
    op!("HALT", 0x01, NoOperand, Misc),
    op!("LD", 0x02, RegImmWord, Data),
    op!("LD", 0x03, RegReg, Data),
    op!("SWP", 0x04, RegReg, Data),
    op!("LDH", 0x05, RegImmByte, Data),
    op!("LDH", 0x06, RegReg, Data),
    op!("LDL", 0x07, RegImmByte, Data),
    op!("LDL", 0x08, RegReg, Data),
    op!("LDA", 0x09, RegAddr, Data),
    op!("LDAB", 0x0A, RegAddr, Data),
    op!("LDAH", 0x0B, RegAddr, Data),
    op!("LDAL", 0x0C, RegAddr, Data),
    op!("STA", 0x0D, RegAddr, Data),
    op!("STAB", 0x0E, RegAddr, Data),
    op!("STAH", 0x0F, RegAddr, Data),
    op!("PUSH", 0x10, RegOnly, Stack),
    op!("PUSHH", 0x11, RegOnly, Stack),
    op!("PUSHL", 0x12, RegOnly, Stack),
    op!("POP", 0x13, RegOnly, Stack),
    op!("POPH", 0x14, RegOnly, Stack),
    op!("POPL", 0x15, RegOnly, Stack),
    op!("PEEK", 0x16, RegOnly, Stack),
    op!("PEEKF", 0x17, RegImmByte, Stack),
    op!("PEEKB", 0x18, RegOnly, Stack),
    op!("PEEKFB", 0x19, RegImmByte, Stack),
    op!("FLSH", 0x1A, NoOperand, Stack),
    op!("PAGE", 0x1B, PageImm, Paging),
    op!("PAGE", 0x1C, PageReg, Paging),
    op!("SETF", 0x1D, NoOperand, Stack),
    op!("JMP", 0x1E, ImmWord, ControlFlow),
    op!("JPZ", 0x1F, ImmWord, ControlFlow),
    op!("JPNZ", 0x20, ImmWord, ControlFlow),
    op!("JPC", 0x21, ImmWord, ControlFlow),
    op!("JPNC", 0x22, ImmWord, ControlFlow),
    op!("JPS", 0x23, ImmWord, ControlFlow),
    op!("JPNS", 0x24, ImmWord, ControlFlow),
    op!("JPO", 0x25, ImmWord, ControlFlow),
    op!("JPNO", 0x26, ImmWord, ControlFlow),
    op!("CALL", 0x27, ImmWord, ControlFlow),
    op!("RET", 0x28, NoOperand, ControlFlow),
    // ADD family: reg-form, imm-form, byte-imm (ADB), high-byte-of-reg (ADH), low-byte-of-reg (ADL)
    op!("ADD", 0x29, RegOnly, Arithmetic),
    op!("ADD", 0x2A, ImmWord, Arithmetic),
    op!("ADB", 0x2B, ImmByte, Arithmetic),
    op!("ADH", 0x2C, RegOnly, Arithmetic),
    op!("ADL", 0x2D, RegOnly, Arithmetic),
    // SUB family
    op!("SUB", 0x2E, RegOnly, Arithmetic),
    op!("SUB", 0x2F, ImmWord, Arithmetic),
    op!("SBB", 0x30, ImmByte, Arithmetic),
    op!("SBH", 0x31, RegOnly, Arithmetic),
    op!("SBL", 0x32, RegOnly, Arithmetic),
    // MUL family
    op!("MUL", 0x33, RegOnly, Arithmetic),
    op!("MUL", 0x34, ImmWord, Arithmetic),
    op!("MLB", 0x35, ImmByte, Arithmetic),
    op!("MLH", 0x36, RegOnly, Arithmetic),
    op!("MLL", 0x37, RegOnly, Arithmetic),
    // DIV family
    op!("DIV", 0x38, RegOnly, Arithmetic),
    op!("DIV", 0x39, ImmWord, Arithmetic),
    op!("DVB", 0x3A, ImmByte, Arithmetic),
    op!("DVH", 0x3B, RegOnly, Arithmetic),
    op!("DVL", 0x3C, RegOnly, Arithmetic),
    // REM family
    op!("REM", 0x3D, RegOnly, Arithmetic),
    op!("REM", 0x3E, ImmWord, Arithmetic),
    op!("RMB", 0x3F, ImmByte, Arithmetic),
    op!("RMH", 0x40, RegOnly, Arithmetic),
    op!("RML", 0x41, RegOnly, Arithmetic),
    // AND family
    op!("AND", 0x42, RegOnly, Logical),
    op!("AND", 0x43, ImmWord, Logical),
    op!("ANB", 0x44, ImmByte, Logical),
    op!("ANH", 0x45, RegOnly, Logical),
    op!("ANL", 0x46, RegOnly, Logical),
    // OR family
    op!("OR", 0x47, RegOnly, Logical),
    op!("OR", 0x48, ImmWord, Logical),
    op!("ORB", 0x49, ImmByte, Logical),
    op!("ORH", 0x4A, RegOnly, Logical),
    op!("ORL", 0x4B, RegOnly, Logical),
    // XOR family
    op!("XOR", 0x4C, RegOnly, Logical),
    op!("XOR", 0x4D, ImmWord, Logical),
    op!("XOB", 0x4E, ImmByte, Logical),
    op!("XOH", 0x4F, RegOnly, Logical),
    op!("XOL", 0x50, RegOnly, Logical),
    // NOT family: word form (no operand), byte form (no operand), explicit high/low register forms
    op!("NOT", 0x51, NoOperand, Logical),
    op!("NOTB", 0x52, NoOperand, Logical),
    op!("NOTH", 0x53, RegOnly, Logical),
    op!("NOTL", 0x54, RegOnly, Logical),
    // SHL family: reg-count, imm8-count, byte-width imm8, byte-width via reg.high/reg.low count
    op!("SHL", 0x56, RegOnly, ShiftRotate),
    op!("SHL", 0x57, ImmByte, ShiftRotate),
    op!("SLB", 0x58, ImmByte, ShiftRotate),
    op!("SLH", 0x59, RegOnly, ShiftRotate),
    op!("SLL", 0x5A, RegOnly, ShiftRotate),
    // SHR family
    op!("SHR", 0x5B, RegOnly, ShiftRotate),
    op!("SHR", 0x5C, ImmByte, ShiftRotate),
    op!("SHRB", 0x5D, ImmByte, ShiftRotate),
    op!("SHRH", 0x5E, RegOnly, ShiftRotate),
    op!("SHRL", 0x5F, RegOnly, ShiftRotate),
    // ROL family
    op!("ROL", 0x60, RegOnly, ShiftRotate),
    op!("ROL", 0x61, ImmByte, ShiftRotate),
    op!("ROLB", 0x62, ImmByte, ShiftRotate),
    op!("ROLH", 0x63, RegOnly, ShiftRotate),
    op!("ROLL", 0x64, RegOnly, ShiftRotate),
    // ROR family
    op!("ROR", 0x65, RegOnly, ShiftRotate),
    op!("ROR", 0x66, ImmByte, ShiftRotate),
    op!("RORB", 0x67, ImmByte, ShiftRotate),
    op!("RORH", 0x68, RegOnly, ShiftRotate),
    op!("RORL", 0x69, RegOnly, ShiftRotate),
    op!("INC", 0x6A, RegOnly, Compare),
    op!("DEC", 0x6B, RegOnly, Compare),
    op!("CMP", 0x6C, RegReg, Compare),
    op!("CMP", 0x6D, RegImmWord, Compare),
    op!("CPH", 0x6E, RegReg, Compare),
    op!("CPH", 0x6F, RegImmByte, Compare),
    op!("CPL", 0x70, RegReg, Compare),
    op!("CPL", 0x71, RegImmByte, Compare),
    op!("LDA_IND", 0x72, RegReg, Data),
    op!("LDAB_IND", 0x73, RegReg, Data),
    op!("LDAH_IND", 0x74, RegReg, Data),
    op!("PUSHW", 0x75, ImmWord, Stack),
    op!("PUSHB", 0x76, ImmByte, Stack),
    op!("SYS", 0x7F, ImmWord, Syscall),
];

/// Decode-time view of the table: opcode byte -> operand form, used by the
/// CPU's fetch stage (it never needs the mnemonic).
pub fn operand_form_for(byte: u8) -> Option<OperandForm> {
    OPCODE_TABLE.iter().find(|o| o.byte == byte).map(|o| o.form)
}

pub fn kind_for(byte: u8) -> Option<OpKind> {
    OPCODE_TABLE.iter().find(|o| o.byte == byte).map(|o| o.kind)
}

/// Assemble-time view: every opcode row registered under a mnemonic, so the
/// IR builder can pick the row whose `OperandForm` matches the operand it
/// parsed.
pub fn rows_for_mnemonic(mnemonic: &str) -> Vec<&'static Opcode> {
    let upper = mnemonic.to_ascii_uppercase();
    OPCODE_TABLE.iter().filter(|o| o.mnemonic == upper).collect()
}

pub fn mnemonics() -> HashMap<&'static str, Vec<&'static Opcode>> {
    let mut map: HashMap<&'static str, Vec<&'static Opcode>> = HashMap::new();
    for op in OPCODE_TABLE {
        map.entry(op.mnemonic).or_default().push(op);
    }
    map
}

pub const HALT_OPCODE: u8 = 0x01;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_byte_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in OPCODE_TABLE {
            assert!(seen.insert(op.byte), "duplicate opcode byte 0x{:02X} ({})", op.byte, op.mnemonic);
        }
    }

    #[test]
    fn anchors_from_spec_match() {
        assert_eq!(operand_form_for(0x00), Some(OperandForm::NoOperand));
        assert_eq!(operand_form_for(0x01), Some(OperandForm::NoOperand));
        assert_eq!(operand_form_for(0x1E).unwrap().total_bytes(), 3);
        assert_eq!(operand_form_for(0x27).unwrap().total_bytes(), 3); // CALL
        assert_eq!(operand_form_for(0x28), Some(OperandForm::NoOperand)); // RET
        assert_eq!(operand_form_for(0x7F).unwrap().total_bytes(), 3); // SYS
    }

    #[test]
    fn add_family_has_five_rows() {
        assert_eq!(rows_for_mnemonic("add").len(), 2); // ADD reg-form + imm-form
        assert_eq!(rows_for_mnemonic("ADB").len(), 1);
        assert_eq!(rows_for_mnemonic("ADH").len(), 1);
        assert_eq!(rows_for_mnemonic("ADL").len(), 1);
    }
}
