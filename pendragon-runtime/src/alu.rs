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

//! The Arithmetic Logic Unit (spec §4.6): word- and byte-width
//! arithmetic/logic/shift/rotate/compare, sharing its `Flags` cell with
//! whichever register the caller treats as the accumulator (`AX` by
//! convention).
//!
//! Every operation takes its operand(s) by value and returns the result by
//! value; the caller (the CPU's dispatch loop) is responsible for writing
//! the result back into the accumulator register. This keeps the ALU free
//! of any dependency on `RegisterFile`.

use crate::error::{RuntimeError, RuntimeResult};
use crate::flags::{Flag, FlagsHandle};

pub struct Alu {
    flags: FlagsHandle,
}

impl Alu {
    pub fn new(flags: FlagsHandle) -> Self {
        Alu { flags }
    }

    fn set(&self, flag: Flag, value: bool) {
        self.flags.borrow_mut().set_to(flag, value);
    }

    fn apply_word_flags(&self, result: u16, carry: bool, overflow: bool) {
        self.set(Flag::Zero, result == 0);
        self.set(Flag::Sign, result & 0x8000 != 0);
        self.set(Flag::Carry, carry);
        self.set(Flag::Overflow, overflow);
    }

    fn apply_byte_flags(&self, result: u8, carry: bool, overflow: bool) {
        self.set(Flag::Zero, result == 0);
        self.set(Flag::Sign, result & 0x80 != 0);
        self.set(Flag::Carry, carry);
        self.set(Flag::Overflow, overflow);
    }

    pub fn add(&self, a: u16, b: u16) -> u16 {
        let result = a.wrapping_add(b);
        let carry = (a as u32 + b as u32) > 0xFFFF;
        let sign_a = a & 0x8000 != 0;
        let sign_b = b & 0x8000 != 0;
        let sign_r = result & 0x8000 != 0;
        let overflow = sign_a == sign_b && sign_r != sign_a;
        self.apply_word_flags(result, carry, overflow);
        result
    }

    pub fn add_byte(&self, a: u8, b: u8) -> u8 {
        let result = a.wrapping_add(b);
        let carry = (a as u16 + b as u16) > 0xFF;
        let sign_a = a & 0x80 != 0;
        let sign_b = b & 0x80 != 0;
        let sign_r = result & 0x80 != 0;
        let overflow = sign_a == sign_b && sign_r != sign_a;
        self.apply_byte_flags(result, carry, overflow);
        result
    }

    pub fn sub(&self, a: u16, b: u16) -> u16 {
        let result = a.wrapping_sub(b);
        let carry = a < b;
        let sign_a = a & 0x8000 != 0;
        let sign_b = b & 0x8000 != 0;
        let sign_r = result & 0x8000 != 0;
        let overflow = sign_a != sign_b && sign_r != sign_a;
        self.apply_word_flags(result, carry, overflow);
        result
    }

    pub fn sub_byte(&self, a: u8, b: u8) -> u8 {
        let result = a.wrapping_sub(b);
        let carry = a < b;
        let sign_a = a & 0x80 != 0;
        let sign_b = b & 0x80 != 0;
        let sign_r = result & 0x80 != 0;
        let overflow = sign_a != sign_b && sign_r != sign_a;
        self.apply_byte_flags(result, carry, overflow);
        result
    }

    pub fn mul(&self, a: u16, b: u16) -> u16 {
        let wide = a as u32 * b as u32;
        let result = wide as u16;
        let overflowed = wide > 0xFFFF;
        self.apply_word_flags(result, overflowed, overflowed);
        result
    }

    pub fn mul_byte(&self, a: u8, b: u8) -> u8 {
        let wide = a as u16 * b as u16;
        let result = wide as u8;
        let overflowed = wide > 0xFF;
        self.apply_byte_flags(result, overflowed, overflowed);
        result
    }

    pub fn div(&self, a: u16, b: u16) -> RuntimeResult<u16> {
        if b == 0 {
            return Err(RuntimeError::DivisionByZero);
        }
        let result = a / b;
        self.apply_word_flags(result, false, false);
        Ok(result)
    }

    pub fn div_byte(&self, a: u8, b: u8) -> RuntimeResult<u8> {
        if b == 0 {
            return Err(RuntimeError::DivisionByZero);
        }
        let result = a / b;
        self.apply_byte_flags(result, false, false);
        Ok(result)
    }

    pub fn rem(&self, a: u16, b: u16) -> RuntimeResult<u16> {
        if b == 0 {
            return Err(RuntimeError::DivisionByZero);
        }
        let result = a % b;
        self.apply_word_flags(result, false, false);
        Ok(result)
    }

    pub fn rem_byte(&self, a: u8, b: u8) -> RuntimeResult<u8> {
        if b == 0 {
            return Err(RuntimeError::DivisionByZero);
        }
        let result = a % b;
        self.apply_byte_flags(result, false, false);
        Ok(result)
    }

    pub fn bit_and(&self, a: u16, b: u16) -> u16 {
        let result = a & b;
        self.apply_word_flags(result, false, false);
        result
    }

    pub fn bit_and_byte(&self, a: u8, b: u8) -> u8 {
        let result = a & b;
        self.apply_byte_flags(result, false, false);
        result
    }

    pub fn bit_or(&self, a: u16, b: u16) -> u16 {
        let result = a | b;
        self.apply_word_flags(result, false, false);
        result
    }

    pub fn bit_or_byte(&self, a: u8, b: u8) -> u8 {
        let result = a | b;
        self.apply_byte_flags(result, false, false);
        result
    }

    pub fn bit_xor(&self, a: u16, b: u16) -> u16 {
        let result = a ^ b;
        self.apply_word_flags(result, false, false);
        result
    }

    pub fn bit_xor_byte(&self, a: u8, b: u8) -> u8 {
        let result = a ^ b;
        self.apply_byte_flags(result, false, false);
        result
    }

    pub fn bit_not(&self, a: u16) -> u16 {
        let result = !a;
        self.apply_word_flags(result, false, false);
        result
    }

    pub fn bit_not_byte(&self, a: u8) -> u8 {
        let result = !a;
        self.apply_byte_flags(result, false, false);
        result
    }

    /// Shifts `a` left by `count` bits. `CARRY` takes the last bit shifted
    /// out of the top; `count == 0` is a no-op that still refreshes
    /// `ZERO`/`SIGN` from `a` itself. Counts of 16 or more saturate: the
    /// result is zero, with `CARRY` taken from the last bit that would have
    /// shifted out (bit 0 of `a`), rather than wrapping around.
    pub fn shl(&self, a: u16, count: u8) -> u16 {
        let effective = count.min(16);
        let carry = effective > 0 && (a >> (16 - effective)) & 1 != 0;
        let result = if effective == 16 { 0 } else { a << effective };
        self.apply_word_flags(result, carry, false);
        result
    }

    pub fn shl_byte(&self, a: u8, count: u8) -> u8 {
        let effective = count.min(8);
        let carry = effective > 0 && (a >> (8 - effective)) & 1 != 0;
        let result = if effective == 8 { 0 } else { a << effective };
        self.apply_byte_flags(result, carry, false);
        result
    }

    /// Shifts `a` right by `count` bits; saturates the same way `shl` does
    /// for counts of 16 or more.
    pub fn shr(&self, a: u16, count: u8) -> u16 {
        let effective = count.min(16);
        let carry = effective > 0 && (a >> (effective - 1)) & 1 != 0;
        let result = if effective == 16 { 0 } else { a >> effective };
        self.apply_word_flags(result, carry, false);
        result
    }

    pub fn shr_byte(&self, a: u8, count: u8) -> u8 {
        let effective = count.min(8);
        let carry = effective > 0 && (a >> (effective - 1)) & 1 != 0;
        let result = if effective == 8 { 0 } else { a >> effective };
        self.apply_byte_flags(result, carry, false);
        result
    }

    pub fn rol(&self, a: u16, count: u8) -> u16 {
        let count = count % 16;
        let result = a.rotate_left(count as u32);
        let carry = count > 0 && result & 0x0001 != 0;
        self.apply_word_flags(result, carry, false);
        result
    }

    pub fn rol_byte(&self, a: u8, count: u8) -> u8 {
        let count = count % 8;
        let result = a.rotate_left(count as u32);
        let carry = count > 0 && result & 0x01 != 0;
        self.apply_byte_flags(result, carry, false);
        result
    }

    pub fn ror(&self, a: u16, count: u8) -> u16 {
        let count = count % 16;
        let result = a.rotate_right(count as u32);
        let carry = count > 0 && result & 0x8000 != 0;
        self.apply_word_flags(result, carry, false);
        result
    }

    pub fn ror_byte(&self, a: u8, count: u8) -> u8 {
        let count = count % 8;
        let result = a.rotate_right(count as u32);
        let carry = count > 0 && result & 0x80 != 0;
        self.apply_byte_flags(result, carry, false);
        result
    }

    /// Compares `a` against `b`, sets flags, and returns the -1/0/1
    /// discriminator written back into the accumulator by the caller
    /// (spec's CMP contract holds regardless of which two registers were
    /// actually named by the instruction).
    pub fn cmp(&self, a: u16, b: u16) -> i8 {
        let carry = a < b;
        let zero = a == b;
        self.set(Flag::Zero, zero);
        self.set(Flag::Carry, carry);
        self.set(Flag::Sign, (a as i16) < (b as i16));
        self.set(Flag::Overflow, false);
        if a < b {
            -1
        } else if a > b {
            1
        } else {
            0
        }
    }

    pub fn cmp_byte(&self, a: u8, b: u8) -> i8 {
        let carry = a < b;
        let zero = a == b;
        self.set(Flag::Zero, zero);
        self.set(Flag::Carry, carry);
        self.set(Flag::Sign, (a as i8) < (b as i8));
        self.set(Flag::Overflow, false);
        if a < b {
            -1
        } else if a > b {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;

    fn alu() -> (Alu, FlagsHandle) {
        let flags = Flags::new_handle();
        (Alu::new(flags.clone()), flags)
    }

    #[test]
    fn add_sets_carry_on_unsigned_overflow() {
        let (alu, flags) = alu();
        let result = alu.add(0xFFFF, 1);
        assert_eq!(result, 0);
        assert!(flags.borrow().is_set(Flag::Carry));
        assert!(flags.borrow().is_set(Flag::Zero));
    }

    #[test]
    fn add_sets_overflow_on_signed_boundary() {
        let (alu, flags) = alu();
        let result = alu.add(0x7FFF, 1);
        assert_eq!(result, 0x8000);
        assert!(flags.borrow().is_set(Flag::Overflow));
        assert!(!flags.borrow().is_set(Flag::Carry));
    }

    #[test]
    fn sub_sets_carry_on_borrow() {
        let (alu, flags) = alu();
        let result = alu.sub(0, 1);
        assert_eq!(result, 0xFFFF);
        assert!(flags.borrow().is_set(Flag::Carry));
    }

    #[test]
    fn div_by_zero_errors() {
        let (alu, _) = alu();
        assert!(matches!(alu.div(1, 0), Err(RuntimeError::DivisionByZero)));
    }

    #[test]
    fn shl_carries_out_the_high_bit() {
        let (alu, flags) = alu();
        let result = alu.shl(0x8001, 1);
        assert_eq!(result, 0x0002);
        assert!(flags.borrow().is_set(Flag::Carry));
    }

    #[test]
    fn shl_by_zero_is_a_no_op() {
        let (alu, flags) = alu();
        let result = alu.shl(0x1234, 0);
        assert_eq!(result, 0x1234);
        assert!(!flags.borrow().is_set(Flag::Carry));
    }

    #[test]
    fn shl_by_16_or_more_saturates_to_zero() {
        let (alu, flags) = alu();
        assert_eq!(alu.shl(0x8001, 16), 0);
        assert!(flags.borrow().is_set(Flag::Carry)); // bit 0 of 0x8001 was set
        assert_eq!(alu.shl(0x8001, 17), 0);
        assert!(flags.borrow().is_set(Flag::Carry));
    }

    #[test]
    fn shr_by_16_or_more_saturates_to_zero() {
        let (alu, flags) = alu();
        assert_eq!(alu.shr(0x8001, 16), 0);
        assert!(flags.borrow().is_set(Flag::Carry)); // bit 15 of 0x8001 was set
        assert_eq!(alu.shr(0x0001, 20), 0);
        assert!(!flags.borrow().is_set(Flag::Carry));
    }

    #[test]
    fn cmp_returns_discriminator_and_sets_flags() {
        let (alu, flags) = alu();
        assert_eq!(alu.cmp(3, 5), -1);
        assert!(flags.borrow().is_set(Flag::Carry));
        assert_eq!(alu.cmp(5, 5), 0);
        assert!(flags.borrow().is_set(Flag::Zero));
        assert_eq!(alu.cmp(9, 5), 1);
    }
}
