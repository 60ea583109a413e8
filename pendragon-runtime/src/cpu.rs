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

//! The CPU (spec §4.9): fetch/decode/dispatch loop over the static
//! [`pendragon_isa::OPCODE_TABLE`], wiring together the register file, the
//! VMU, the call stack, the instruction unit, and the ALU.
//!
//! Two addressing conventions feed off the same active-context/active-page
//! state set by `PAGE`:
//! - `LDA`/`STA` (explicit `addr16`) split the address as `page = addr >> 8`,
//!   `offset = addr & 0xFF`, independent of whatever page `PAGE` last set.
//! - `LDA_IND`/`LDAB_IND`/`LDAH_IND` (register-indirect) use the page `PAGE`
//!   last set and take only an 8-bit offset from the address register's low
//!   byte.
//! Both still require `PAGE` to have set an active context first; this is
//! an implementer's-choice extrapolation from the opcode table's `PageImm`/
//! `PageReg` rows (see DESIGN.md).

use pendragon_isa::{OpKind, OperandForm, Opcode, RegisterCode, OPCODE_TABLE};

use crate::alu::Alu;
use crate::basic_io::BasicIo;
use crate::error::{RuntimeError, RuntimeResult};
use crate::flags::Flag;
use crate::instruction_unit::InstructionUnit;
use crate::memory::accessor::AccessMode;
use crate::memory::context::ContextId;
use crate::memory::vmu::{ProtectionMode, VirtualMemoryUnit};
use crate::register::RegisterFile;
use crate::stack::Stack;

pub struct Cpu<IO: BasicIo> {
    pub registers: RegisterFile,
    pub vmu: VirtualMemoryUnit,
    pub stack: Stack,
    pub iu: InstructionUnit,
    alu: Alu,
    pub io: IO,
    active_context: Option<ContextId>,
    active_page: u8,
    halted: bool,
}

impl<IO: BasicIo> Cpu<IO> {
    pub fn new(stack_capacity: u32, io: IO) -> Self {
        let registers = RegisterFile::new();
        let alu = Alu::new(registers.flags.clone());
        Cpu {
            registers,
            vmu: VirtualMemoryUnit::new(),
            stack: Stack::new(stack_capacity),
            iu: InstructionUnit::new(),
            alu,
            io,
            active_context: None,
            active_page: 0,
            halted: false,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn load_program(&mut self, program: &[u8]) -> RuntimeResult<()> {
        self.iu.load_program(program)
    }

    /// Setup (context creation, program loading) happens in UNPROTECTED
    /// mode; call this once setup is complete and before `run`/`step`.
    pub fn enter_protected_mode(&mut self) {
        self.vmu.set_mode(ProtectionMode::Protected);
    }

    pub fn run(&mut self) -> RuntimeResult<()> {
        while !self.halted {
            self.step()?;
        }
        Ok(())
    }

    pub fn step(&mut self) -> RuntimeResult<()> {
        if self.halted {
            return Ok(());
        }
        let fetch_ir = self.iu.get_ir();
        let byte = self.iu.read_byte_at_ir()?;
        let opcode = OPCODE_TABLE
            .iter()
            .find(|o| o.byte == byte)
            .ok_or(RuntimeError::UnknownOpcode { opcode: byte, ir: fetch_ir })?;
        self.execute(opcode)
    }

    fn fetch_reg(&mut self) -> RuntimeResult<RegisterCode> {
        let byte = self.iu.read_byte_at_ir()?;
        RegisterCode::decode(byte).ok_or(RuntimeError::InvalidRegisterCode(byte))
    }

    fn fetch_byte(&mut self) -> RuntimeResult<u8> {
        self.iu.read_byte_at_ir()
    }

    fn fetch_word(&mut self) -> RuntimeResult<u16> {
        self.iu.read_word_at_ir()
    }

    fn active_accessor(&self, mode: AccessMode) -> RuntimeResult<crate::memory::accessor::PagedAccessor> {
        let ctx = self.active_context.ok_or(RuntimeError::AddressNotMapped { address: 0 })?;
        self.vmu.create_paged_accessor(ctx, mode)
    }

    fn read_byte_active(&self, page: u8, offset: u8) -> RuntimeResult<u8> {
        let mut acc = self.active_accessor(AccessMode::ReadOnly)?;
        acc.set_page(page);
        acc.read_byte(offset)
    }

    fn read_word_active(&self, page: u8, offset: u8) -> RuntimeResult<u16> {
        let mut acc = self.active_accessor(AccessMode::ReadOnly)?;
        acc.set_page(page);
        acc.read_word(offset)
    }

    fn write_byte_active(&mut self, page: u8, offset: u8, value: u8) -> RuntimeResult<()> {
        let mut acc = self.active_accessor(AccessMode::ReadWrite)?;
        acc.set_page(page);
        acc.write_byte(offset, value)
    }

    fn write_word_active(&mut self, page: u8, offset: u8, value: u16) -> RuntimeResult<()> {
        let mut acc = self.active_accessor(AccessMode::ReadWrite)?;
        acc.set_page(page);
        acc.write_word(offset, value)
    }

    fn apply_word_op(&mut self, operand: u16, f: impl FnOnce(&Alu, u16, u16) -> u16) {
        let a = self.registers.ax.get_value();
        let r = f(&self.alu, a, operand);
        self.registers.ax.set_value(r);
    }

    fn apply_byte_op(&mut self, operand: u8, f: impl FnOnce(&Alu, u8, u8) -> u8) {
        let a = self.registers.ax.get_low_byte();
        let r = f(&self.alu, a, operand);
        self.registers.ax.set_low_byte(r);
    }

    fn apply_word_op_fallible(
        &mut self,
        operand: u16,
        f: impl FnOnce(&Alu, u16, u16) -> RuntimeResult<u16>,
    ) -> RuntimeResult<()> {
        let a = self.registers.ax.get_value();
        let r = f(&self.alu, a, operand)?;
        self.registers.ax.set_value(r);
        Ok(())
    }

    fn apply_byte_op_fallible(
        &mut self,
        operand: u8,
        f: impl FnOnce(&Alu, u8, u8) -> RuntimeResult<u8>,
    ) -> RuntimeResult<()> {
        let a = self.registers.ax.get_low_byte();
        let r = f(&self.alu, a, operand)?;
        self.registers.ax.set_low_byte(r);
        Ok(())
    }

    /// Pops a stack-resident string pushed as `[chars in order][0]` (top of
    /// stack is the null terminator), per the convention this crate defines
    /// for the two string syscalls (see module docs / DESIGN.md).
    fn pop_c_string(&mut self) -> RuntimeResult<String> {
        let mut bytes = Vec::new();
        loop {
            let b = self.stack.pop_byte()?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        bytes.reverse();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn dispatch_syscall(&mut self, number: u16) -> RuntimeResult<()> {
        self.iu.system_call(number)?;
        match number {
            pendragon_isa::syscalls::PRINT_STRING_FROM_STACK => {
                let s = self.pop_c_string()?;
                self.io.print_string(&s)?;
            }
            pendragon_isa::syscalls::PRINT_LINE_FROM_STACK => {
                let s = self.pop_c_string()?;
                self.io.print_line(&s)?;
            }
            pendragon_isa::syscalls::READ_LINE_ONTO_STACK => {
                let line = self.io.read_line()?;
                self.stack.push_byte(0)?;
                for b in line.bytes() {
                    self.stack.push_byte(b)?;
                }
            }
            other => return Err(RuntimeError::UnknownSyscall(other)),
        }
        Ok(())
    }

    fn execute(&mut self, opcode: &Opcode) -> RuntimeResult<()> {
        match opcode.byte {
            0x00 => Ok(()),
            0x01 => {
                self.halted = true;
                Ok(())
            }

            // -- Data movement --
            0x02 => {
                let reg = self.fetch_reg()?;
                let imm = self.fetch_word()?;
                self.registers.get_mut(reg).set_value(imm);
                Ok(())
            }
            0x03 => {
                let dest = self.fetch_reg()?;
                let src = self.fetch_reg()?;
                let value = self.registers.get(src).get_value();
                self.registers.get_mut(dest).set_value(value);
                Ok(())
            }
            0x04 => {
                let a = self.fetch_reg()?;
                let b = self.fetch_reg()?;
                let av = self.registers.get(a).get_value();
                let bv = self.registers.get(b).get_value();
                self.registers.get_mut(a).set_value(bv);
                self.registers.get_mut(b).set_value(av);
                Ok(())
            }
            0x05 => {
                let reg = self.fetch_reg()?;
                let imm = self.fetch_byte()?;
                self.registers.get_mut(reg).set_high_byte(imm);
                Ok(())
            }
            0x06 => {
                let dest = self.fetch_reg()?;
                let src = self.fetch_reg()?;
                let value = self.registers.get(src).get_low_byte();
                self.registers.get_mut(dest).set_high_byte(value);
                Ok(())
            }
            0x07 => {
                let reg = self.fetch_reg()?;
                let imm = self.fetch_byte()?;
                self.registers.get_mut(reg).set_low_byte(imm);
                Ok(())
            }
            0x08 => {
                let dest = self.fetch_reg()?;
                let src = self.fetch_reg()?;
                let value = self.registers.get(src).get_low_byte();
                self.registers.get_mut(dest).set_low_byte(value);
                Ok(())
            }

            // -- Addressed loads --
            0x09 => {
                let reg = self.fetch_reg()?;
                let addr = self.fetch_word()?;
                let value = self.read_word_active((addr >> 8) as u8, (addr & 0xFF) as u8)?;
                self.registers.get_mut(reg).set_value(value);
                Ok(())
            }
            0x0A => {
                let reg = self.fetch_reg()?;
                let addr = self.fetch_word()?;
                let byte = self.read_byte_active((addr >> 8) as u8, (addr & 0xFF) as u8)?;
                self.registers.get_mut(reg).set_value(byte as u16);
                Ok(())
            }
            0x0B => {
                let reg = self.fetch_reg()?;
                let addr = self.fetch_word()?;
                let byte = self.read_byte_active((addr >> 8) as u8, (addr & 0xFF) as u8)?;
                self.registers.get_mut(reg).set_high_byte(byte);
                Ok(())
            }
            0x0C => {
                let reg = self.fetch_reg()?;
                let addr = self.fetch_word()?;
                let byte = self.read_byte_active((addr >> 8) as u8, (addr & 0xFF) as u8)?;
                self.registers.get_mut(reg).set_low_byte(byte);
                Ok(())
            }

            // -- Addressed stores --
            0x0D => {
                let reg = self.fetch_reg()?;
                let addr = self.fetch_word()?;
                let value = self.registers.get(reg).get_value();
                self.write_word_active((addr >> 8) as u8, (addr & 0xFF) as u8, value)
            }
            0x0E => {
                let reg = self.fetch_reg()?;
                let addr = self.fetch_word()?;
                let value = self.registers.get(reg).get_low_byte();
                self.write_byte_active((addr >> 8) as u8, (addr & 0xFF) as u8, value)
            }
            0x0F => {
                let reg = self.fetch_reg()?;
                let addr = self.fetch_word()?;
                let value = self.registers.get(reg).get_high_byte();
                self.write_byte_active((addr >> 8) as u8, (addr & 0xFF) as u8, value)
            }

            // -- Stack --
            0x10 => {
                let reg = self.fetch_reg()?;
                let value = self.registers.get(reg).get_value();
                self.stack.push_word(value)
            }
            0x11 => {
                let reg = self.fetch_reg()?;
                let value = self.registers.get(reg).get_high_byte();
                self.stack.push_byte(value)
            }
            0x12 => {
                let reg = self.fetch_reg()?;
                let value = self.registers.get(reg).get_low_byte();
                self.stack.push_byte(value)
            }
            0x13 => {
                let reg = self.fetch_reg()?;
                let value = self.stack.pop_word()?;
                self.registers.get_mut(reg).set_value(value);
                Ok(())
            }
            0x14 => {
                let reg = self.fetch_reg()?;
                let value = self.stack.pop_byte()?;
                self.registers.get_mut(reg).set_high_byte(value);
                Ok(())
            }
            0x15 => {
                let reg = self.fetch_reg()?;
                let value = self.stack.pop_byte()?;
                self.registers.get_mut(reg).set_low_byte(value);
                Ok(())
            }
            0x16 => {
                let reg = self.fetch_reg()?;
                let value = self.stack.peek_word()?;
                self.registers.get_mut(reg).set_value(value);
                Ok(())
            }
            0x17 => {
                let reg = self.fetch_reg()?;
                let offset = self.fetch_byte()? as i64;
                let value = self.stack.peek_word_from_frame(offset)?;
                self.registers.get_mut(reg).set_value(value);
                Ok(())
            }
            0x18 => {
                let reg = self.fetch_reg()?;
                let value = self.stack.peek_byte()?;
                self.registers.get_mut(reg).set_value(value as u16);
                Ok(())
            }
            0x19 => {
                let reg = self.fetch_reg()?;
                let offset = self.fetch_byte()? as i64;
                let value = self.stack.peek_byte_from_frame(offset)?;
                self.registers.get_mut(reg).set_value(value as u16);
                Ok(())
            }
            0x1A => {
                self.stack.flush();
                Ok(())
            }
            0x1B => {
                let page = self.fetch_word()?;
                let context = self.fetch_word()?;
                self.active_page = page as u8;
                self.active_context = Some(context as ContextId);
                Ok(())
            }
            0x1C => {
                let reg = self.fetch_reg()?;
                let context = self.fetch_word()?;
                self.active_page = self.registers.get(reg).get_low_byte();
                self.active_context = Some(context as ContextId);
                Ok(())
            }
            0x1D => {
                let value = self.registers.ax.get_value();
                self.registers.flags.borrow_mut().set_to(Flag::Zero, value == 0);
                self.registers.flags.borrow_mut().set_to(Flag::Sign, value & 0x8000 != 0);
                Ok(())
            }

            // -- Control flow --
            0x1E => {
                let addr = self.fetch_word()?;
                self.iu.jump_to(addr);
                Ok(())
            }
            0x1F => self.jump_if(Flag::Zero, true),
            0x20 => self.jump_if(Flag::Zero, false),
            0x21 => self.jump_if(Flag::Carry, true),
            0x22 => self.jump_if(Flag::Carry, false),
            0x23 => self.jump_if(Flag::Sign, true),
            0x24 => self.jump_if(Flag::Sign, false),
            0x25 => self.jump_if(Flag::Overflow, true),
            0x26 => self.jump_if(Flag::Overflow, false),
            0x27 => {
                let addr = self.fetch_word()?;
                // The opcode table has no bit to distinguish a value-returning
                // CALL from a void one, so every CALL is treated as expecting
                // a return value (see DESIGN.md).
                self.iu.call_subroutine(addr, true, &mut self.stack)
            }
            0x28 => {
                self.iu.return_from_subroutine(&mut self.stack)?;
                Ok(())
            }

            // -- Arithmetic families (reg / imm / imm-byte / reg.high / reg.low) --
            0x29 => self.word_reg_op(Alu::add),
            0x2A => self.word_imm_op(Alu::add),
            0x2B => self.byte_imm_op(Alu::add_byte),
            0x2C => self.byte_reg_high_op(Alu::add_byte),
            0x2D => self.byte_reg_low_op(Alu::add_byte),
            0x2E => self.word_reg_op(Alu::sub),
            0x2F => self.word_imm_op(Alu::sub),
            0x30 => self.byte_imm_op(Alu::sub_byte),
            0x31 => self.byte_reg_high_op(Alu::sub_byte),
            0x32 => self.byte_reg_low_op(Alu::sub_byte),
            0x33 => self.word_reg_op(Alu::mul),
            0x34 => self.word_imm_op(Alu::mul),
            0x35 => self.byte_imm_op(Alu::mul_byte),
            0x36 => self.byte_reg_high_op(Alu::mul_byte),
            0x37 => self.byte_reg_low_op(Alu::mul_byte),
            0x38 => self.word_reg_op_fallible(Alu::div),
            0x39 => self.word_imm_op_fallible(Alu::div),
            0x3A => self.byte_imm_op_fallible(Alu::div_byte),
            0x3B => self.byte_reg_high_op_fallible(Alu::div_byte),
            0x3C => self.byte_reg_low_op_fallible(Alu::div_byte),
            0x3D => self.word_reg_op_fallible(Alu::rem),
            0x3E => self.word_imm_op_fallible(Alu::rem),
            0x3F => self.byte_imm_op_fallible(Alu::rem_byte),
            0x40 => self.byte_reg_high_op_fallible(Alu::rem_byte),
            0x41 => self.byte_reg_low_op_fallible(Alu::rem_byte),
            0x42 => self.word_reg_op(Alu::bit_and),
            0x43 => self.word_imm_op(Alu::bit_and),
            0x44 => self.byte_imm_op(Alu::bit_and_byte),
            0x45 => self.byte_reg_high_op(Alu::bit_and_byte),
            0x46 => self.byte_reg_low_op(Alu::bit_and_byte),
            0x47 => self.word_reg_op(Alu::bit_or),
            0x48 => self.word_imm_op(Alu::bit_or),
            0x49 => self.byte_imm_op(Alu::bit_or_byte),
            0x4A => self.byte_reg_high_op(Alu::bit_or_byte),
            0x4B => self.byte_reg_low_op(Alu::bit_or_byte),
            0x4C => self.word_reg_op(Alu::bit_xor),
            0x4D => self.word_imm_op(Alu::bit_xor),
            0x4E => self.byte_imm_op(Alu::bit_xor_byte),
            0x4F => self.byte_reg_high_op(Alu::bit_xor_byte),
            0x50 => self.byte_reg_low_op(Alu::bit_xor_byte),

            // -- NOT family --
            0x51 => {
                let a = self.registers.ax.get_value();
                let r = self.alu.bit_not(a);
                self.registers.ax.set_value(r);
                Ok(())
            }
            0x52 => {
                let a = self.registers.ax.get_low_byte();
                let r = self.alu.bit_not_byte(a);
                self.registers.ax.set_low_byte(r);
                Ok(())
            }
            0x53 => {
                let reg = self.fetch_reg()?;
                let a = self.registers.get(reg).get_high_byte();
                let r = self.alu.bit_not_byte(a);
                self.registers.get_mut(reg).set_high_byte(r);
                Ok(())
            }
            0x54 => {
                let reg = self.fetch_reg()?;
                let a = self.registers.get(reg).get_low_byte();
                let r = self.alu.bit_not_byte(a);
                self.registers.get_mut(reg).set_low_byte(r);
                Ok(())
            }

            // -- Shift/rotate families (reg-count / imm8-count / imm8-byte / reg.high-count / reg.low-count) --
            0x56 => self.shift_word_reg_count(Alu::shl),
            0x57 => self.shift_word_imm_count(Alu::shl),
            0x58 => self.shift_byte_imm_count(Alu::shl_byte),
            0x59 => self.shift_byte_reg_high_count(Alu::shl_byte),
            0x5A => self.shift_byte_reg_low_count(Alu::shl_byte),
            0x5B => self.shift_word_reg_count(Alu::shr),
            0x5C => self.shift_word_imm_count(Alu::shr),
            0x5D => self.shift_byte_imm_count(Alu::shr_byte),
            0x5E => self.shift_byte_reg_high_count(Alu::shr_byte),
            0x5F => self.shift_byte_reg_low_count(Alu::shr_byte),
            0x60 => self.shift_word_reg_count(Alu::rol),
            0x61 => self.shift_word_imm_count(Alu::rol),
            0x62 => self.shift_byte_imm_count(Alu::rol_byte),
            0x63 => self.shift_byte_reg_high_count(Alu::rol_byte),
            0x64 => self.shift_byte_reg_low_count(Alu::rol_byte),
            0x65 => self.shift_word_reg_count(Alu::ror),
            0x66 => self.shift_word_imm_count(Alu::ror),
            0x67 => self.shift_byte_imm_count(Alu::ror_byte),
            0x68 => self.shift_byte_reg_high_count(Alu::ror_byte),
            0x69 => self.shift_byte_reg_low_count(Alu::ror_byte),

            // -- INC/DEC/CMP --
            0x6A => {
                let reg = self.fetch_reg()?;
                self.registers.get_mut(reg).inc();
                Ok(())
            }
            0x6B => {
                let reg = self.fetch_reg()?;
                self.registers.get_mut(reg).dec();
                Ok(())
            }
            0x6C => {
                let a = self.fetch_reg()?;
                let b = self.fetch_reg()?;
                let av = self.registers.get(a).get_value();
                let bv = self.registers.get(b).get_value();
                let disc = self.alu.cmp(av, bv);
                self.registers.ax.set_value(disc as i16 as u16);
                Ok(())
            }
            0x6D => {
                let a = self.fetch_reg()?;
                let imm = self.fetch_word()?;
                let av = self.registers.get(a).get_value();
                let disc = self.alu.cmp(av, imm);
                self.registers.ax.set_value(disc as i16 as u16);
                Ok(())
            }
            0x6E => {
                let a = self.fetch_reg()?;
                let b = self.fetch_reg()?;
                let av = self.registers.get(a).get_high_byte();
                let bv = self.registers.get(b).get_high_byte();
                let disc = self.alu.cmp_byte(av, bv);
                self.registers.ax.set_low_byte(disc as i8 as u8);
                Ok(())
            }
            0x6F => {
                let a = self.fetch_reg()?;
                let imm = self.fetch_byte()?;
                let av = self.registers.get(a).get_high_byte();
                let disc = self.alu.cmp_byte(av, imm);
                self.registers.ax.set_low_byte(disc as i8 as u8);
                Ok(())
            }
            0x70 => {
                let a = self.fetch_reg()?;
                let b = self.fetch_reg()?;
                let av = self.registers.get(a).get_low_byte();
                let bv = self.registers.get(b).get_low_byte();
                let disc = self.alu.cmp_byte(av, bv);
                self.registers.ax.set_low_byte(disc as i8 as u8);
                Ok(())
            }
            0x71 => {
                let a = self.fetch_reg()?;
                let imm = self.fetch_byte()?;
                let av = self.registers.get(a).get_low_byte();
                let disc = self.alu.cmp_byte(av, imm);
                self.registers.ax.set_low_byte(disc as i8 as u8);
                Ok(())
            }

            // -- Register-indirect addressed loads --
            0x72 => {
                let dest = self.fetch_reg()?;
                let addr_reg = self.fetch_reg()?;
                let offset = self.registers.get(addr_reg).get_low_byte();
                let page = self.active_page;
                let value = self.read_word_active(page, offset)?;
                self.registers.get_mut(dest).set_value(value);
                Ok(())
            }
            0x73 => {
                let dest = self.fetch_reg()?;
                let addr_reg = self.fetch_reg()?;
                let offset = self.registers.get(addr_reg).get_low_byte();
                let page = self.active_page;
                let byte = self.read_byte_active(page, offset)?;
                self.registers.get_mut(dest).set_value(byte as u16);
                Ok(())
            }
            0x74 => {
                let dest = self.fetch_reg()?;
                let addr_reg = self.fetch_reg()?;
                let offset = self.registers.get(addr_reg).get_low_byte();
                let page = self.active_page;
                let byte = self.read_byte_active(page, offset)?;
                self.registers.get_mut(dest).set_high_byte(byte);
                Ok(())
            }

            0x75 => {
                let imm = self.fetch_word()?;
                self.stack.push_word(imm)
            }
            0x76 => {
                let imm = self.fetch_byte()?;
                self.stack.push_byte(imm)
            }

            0x7F => {
                let number = self.fetch_word()?;
                self.dispatch_syscall(number)
            }

            other => Err(RuntimeError::UnknownOpcode { opcode: other, ir: self.iu.get_ir() }),
        }
    }

    fn jump_if(&mut self, flag: Flag, expected: bool) -> RuntimeResult<()> {
        let addr = self.fetch_word()?;
        let set = self.registers.flags.borrow().is_set(flag);
        self.iu.jump_to_if(addr, set == expected);
        Ok(())
    }

    fn word_reg_op(&mut self, f: impl FnOnce(&Alu, u16, u16) -> u16) -> RuntimeResult<()> {
        let reg = self.fetch_reg()?;
        let operand = self.registers.get(reg).get_value();
        self.apply_word_op(operand, f);
        Ok(())
    }

    fn word_imm_op(&mut self, f: impl FnOnce(&Alu, u16, u16) -> u16) -> RuntimeResult<()> {
        let imm = self.fetch_word()?;
        self.apply_word_op(imm, f);
        Ok(())
    }

    fn byte_imm_op(&mut self, f: impl FnOnce(&Alu, u8, u8) -> u8) -> RuntimeResult<()> {
        let imm = self.fetch_byte()?;
        self.apply_byte_op(imm, f);
        Ok(())
    }

    fn byte_reg_high_op(&mut self, f: impl FnOnce(&Alu, u8, u8) -> u8) -> RuntimeResult<()> {
        let reg = self.fetch_reg()?;
        let operand = self.registers.get(reg).get_high_byte();
        self.apply_byte_op(operand, f);
        Ok(())
    }

    fn byte_reg_low_op(&mut self, f: impl FnOnce(&Alu, u8, u8) -> u8) -> RuntimeResult<()> {
        let reg = self.fetch_reg()?;
        let operand = self.registers.get(reg).get_low_byte();
        self.apply_byte_op(operand, f);
        Ok(())
    }

    fn word_reg_op_fallible(&mut self, f: impl FnOnce(&Alu, u16, u16) -> RuntimeResult<u16>) -> RuntimeResult<()> {
        let reg = self.fetch_reg()?;
        let operand = self.registers.get(reg).get_value();
        self.apply_word_op_fallible(operand, f)
    }

    fn word_imm_op_fallible(&mut self, f: impl FnOnce(&Alu, u16, u16) -> RuntimeResult<u16>) -> RuntimeResult<()> {
        let imm = self.fetch_word()?;
        self.apply_word_op_fallible(imm, f)
    }

    fn byte_imm_op_fallible(&mut self, f: impl FnOnce(&Alu, u8, u8) -> RuntimeResult<u8>) -> RuntimeResult<()> {
        let imm = self.fetch_byte()?;
        self.apply_byte_op_fallible(imm, f)
    }

    fn byte_reg_high_op_fallible(&mut self, f: impl FnOnce(&Alu, u8, u8) -> RuntimeResult<u8>) -> RuntimeResult<()> {
        let reg = self.fetch_reg()?;
        let operand = self.registers.get(reg).get_high_byte();
        self.apply_byte_op_fallible(operand, f)
    }

    fn byte_reg_low_op_fallible(&mut self, f: impl FnOnce(&Alu, u8, u8) -> RuntimeResult<u8>) -> RuntimeResult<()> {
        let reg = self.fetch_reg()?;
        let operand = self.registers.get(reg).get_low_byte();
        self.apply_byte_op_fallible(operand, f)
    }

    fn shift_word_reg_count(&mut self, f: impl FnOnce(&Alu, u16, u8) -> u16) -> RuntimeResult<()> {
        let reg = self.fetch_reg()?;
        let count = self.registers.get(reg).get_low_byte();
        let a = self.registers.ax.get_value();
        let r = f(&self.alu, a, count);
        self.registers.ax.set_value(r);
        Ok(())
    }

    fn shift_word_imm_count(&mut self, f: impl FnOnce(&Alu, u16, u8) -> u16) -> RuntimeResult<()> {
        let count = self.fetch_byte()?;
        let a = self.registers.ax.get_value();
        let r = f(&self.alu, a, count);
        self.registers.ax.set_value(r);
        Ok(())
    }

    fn shift_byte_imm_count(&mut self, f: impl FnOnce(&Alu, u8, u8) -> u8) -> RuntimeResult<()> {
        let count = self.fetch_byte()?;
        let a = self.registers.ax.get_low_byte();
        let r = f(&self.alu, a, count);
        self.registers.ax.set_low_byte(r);
        Ok(())
    }

    fn shift_byte_reg_high_count(&mut self, f: impl FnOnce(&Alu, u8, u8) -> u8) -> RuntimeResult<()> {
        let reg = self.fetch_reg()?;
        let count = self.registers.get(reg).get_high_byte();
        let a = self.registers.ax.get_low_byte();
        let r = f(&self.alu, a, count);
        self.registers.ax.set_low_byte(r);
        Ok(())
    }

    fn shift_byte_reg_low_count(&mut self, f: impl FnOnce(&Alu, u8, u8) -> u8) -> RuntimeResult<()> {
        let reg = self.fetch_reg()?;
        let count = self.registers.get(reg).get_low_byte();
        let a = self.registers.ax.get_low_byte();
        let r = f(&self.alu, a, count);
        self.registers.ax.set_low_byte(r);
        Ok(())
    }
}

/// `OpKind` is attached to every row so an embedder can, e.g., log which
/// family an instruction belongs to without re-deriving it from the byte;
/// the dispatch loop above doesn't need it since it matches on the byte
/// directly.
#[allow(dead_code)]
fn _kind_of(byte: u8) -> Option<OpKind> {
    pendragon_isa::kind_for(byte)
}

#[allow(dead_code)]
fn _form_of(byte: u8) -> Option<OperandForm> {
    pendragon_isa::operand_form_for(byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_io::BufferedIo;
    use pendragon_isa::RegisterCode;

    fn new_cpu() -> Cpu<BufferedIo> {
        Cpu::new(256, BufferedIo::new())
    }

    #[test]
    fn ld_reg_imm_then_add_reg() {
        let mut cpu = new_cpu();
        // LD AX, 5; LD BX, 3; ADD BX
        let program = [0x02, RegisterCode::Ax.encode(), 0x05, 0x00, 0x02, RegisterCode::Bx.encode(), 0x03, 0x00, 0x29, RegisterCode::Bx.encode(), 0x01];
        cpu.load_program(&program).unwrap();
        cpu.enter_protected_mode();
        cpu.step().unwrap();
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.registers.ax.get_value(), 8);
    }

    #[test]
    fn add_sets_carry_on_wraparound() {
        let mut cpu = new_cpu();
        let program = [0x02, RegisterCode::Ax.encode(), 0xFF, 0xFF, 0x2A, 0x01, 0x00, 0x01];
        cpu.load_program(&program).unwrap();
        cpu.enter_protected_mode();
        cpu.run().unwrap();
        assert_eq!(cpu.registers.ax.get_value(), 0);
        assert!(cpu.registers.flags.borrow().is_set(Flag::Carry));
        assert!(cpu.registers.flags.borrow().is_set(Flag::Zero));
    }

    #[test]
    fn push_and_pop_round_trip_through_the_stack() {
        let mut cpu = new_cpu();
        let program = [
            0x02, RegisterCode::Ax.encode(), 0xEF, 0xBE, // LD AX, 0xBEEF
            0x10, RegisterCode::Ax.encode(), // PUSH AX
            0x02, RegisterCode::Ax.encode(), 0x00, 0x00, // LD AX, 0
            0x13, RegisterCode::Bx.encode(), // POP BX
            0x01,
        ];
        cpu.load_program(&program).unwrap();
        cpu.enter_protected_mode();
        cpu.run().unwrap();
        assert_eq!(cpu.registers.get(RegisterCode::Bx).get_value(), 0xBEEF);
    }

    #[test]
    fn call_and_ret_restore_ir_and_frame() {
        let mut cpu = new_cpu();
        // CALL 0x0006; HALT; (at 6:) RET
        let program = [0x27, 0x06, 0x00, 0x01, 0x00, 0x00, 0x28];
        cpu.load_program(&program).unwrap();
        cpu.enter_protected_mode();
        cpu.step().unwrap(); // CALL
        assert_eq!(cpu.iu.get_ir(), 6);
        cpu.step().unwrap(); // RET
        assert_eq!(cpu.iu.get_ir(), 3);
        assert_eq!(cpu.stack.get_fp(), -1);
    }

    #[test]
    fn print_line_syscall_writes_through_io() {
        let mut cpu = new_cpu();
        cpu.enter_protected_mode();
        cpu.stack.push_byte(0).unwrap();
        for b in b"Hi" {
            cpu.stack.push_byte(*b).unwrap();
        }
        cpu.dispatch_syscall(pendragon_isa::syscalls::PRINT_LINE_FROM_STACK).unwrap();
        assert_eq!(cpu.io.output, "Hi\n");
    }

    #[test]
    fn unknown_opcode_is_reported_with_ir() {
        let mut cpu = new_cpu();
        cpu.load_program(&[0xEE]).unwrap();
        cpu.enter_protected_mode();
        assert!(matches!(cpu.step(), Err(RuntimeError::UnknownOpcode { opcode: 0xEE, .. })));
    }

    #[test]
    fn ld_addressed_requires_protected_mode_and_active_context() {
        let mut cpu = new_cpu();
        let context = cpu.vmu.create_context(512).unwrap();
        cpu.enter_protected_mode();
        // PAGE 0, context; STA AX, 0x0010; LDA BX, 0x0010
        let mut program = vec![0x1B];
        program.extend_from_slice(&0u16.to_le_bytes());
        program.extend_from_slice(&(context as u16).to_le_bytes());
        program.push(0x02);
        program.push(RegisterCode::Ax.encode());
        program.extend_from_slice(&0x1234u16.to_le_bytes());
        program.push(0x0D);
        program.push(RegisterCode::Ax.encode());
        program.extend_from_slice(&0x0010u16.to_le_bytes());
        program.push(0x09);
        program.push(RegisterCode::Bx.encode());
        program.extend_from_slice(&0x0010u16.to_le_bytes());
        program.push(0x01);
        cpu.load_program(&program).unwrap();
        cpu.run().unwrap();
        assert_eq!(cpu.registers.get(RegisterCode::Bx).get_value(), 0x1234);
    }
}
