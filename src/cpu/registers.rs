//! DCPU-16 registers.
//!
//! The DCPU-16 has:
//! - 8 general purpose registers: A, B, C, X, Y, Z, I, J
//! - SP: stack pointer
//! - PC: program counter
//! - O: overflow register
//!
//! Every register is a single 16-bit word. SP and PC wrap around on
//! increment and decrement.

use serde::{Serialize, Deserialize};
use std::fmt;

/// A general purpose register name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    A,
    B,
    C,
    X,
    Y,
    Z,
    I,
    J,
}

impl Reg {
    /// All registers in encoding order.
    pub const ALL: [Reg; 8] = [Reg::A, Reg::B, Reg::C, Reg::X, Reg::Y, Reg::Z, Reg::I, Reg::J];

    /// Register selected by the low 3 bits of an operand code.
    pub fn from_code(code: u16) -> Self {
        Self::ALL[(code & 0x7) as usize]
    }

    /// Index into the register file (0-7).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::A => "A",
            Reg::B => "B",
            Reg::C => "C",
            Reg::X => "X",
            Reg::Y => "Y",
            Reg::Z => "Z",
            Reg::I => "I",
            Reg::J => "J",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column header matching the [`Registers`] display line.
pub const STATE_HEADER: &str = "PC   SP   O    A    B    C    X    Y    Z    I    J";

/// The DCPU-16 register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A, B, C, X, Y, Z, I, J in encoding order.
    pub gp: [u16; 8],

    /// SP: stack pointer. The stack grows downward; the first push lands at 0xFFFF.
    pub sp: u16,

    /// PC: program counter
    pub pc: u16,

    /// O: overflow, written by ADD/SUB/MUL/DIV/SHL/SHR
    pub o: u16,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a general purpose register.
    #[inline]
    pub fn get(&self, reg: Reg) -> u16 {
        self.gp[reg.index()]
    }

    /// Write a general purpose register.
    #[inline]
    pub fn set(&mut self, reg: Reg, value: u16) {
        self.gp[reg.index()] = value;
    }

    /// Increment the program counter by 1.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Move the program counter forward by `words`.
    pub fn skip_words(&mut self, words: u16) {
        self.pc = self.pc.wrapping_add(words);
    }

    /// Post-increment SP. Returns the old value (the popped slot).
    pub fn pop_slot(&mut self) -> u16 {
        let old = self.sp;
        self.sp = self.sp.wrapping_add(1);
        old
    }

    /// Pre-decrement SP. Returns the new value (the pushed slot).
    pub fn push_slot(&mut self) -> u16 {
        self.sp = self.sp.wrapping_sub(1);
        self.sp
    }

    /// Render the state line, optionally preceded by [`STATE_HEADER`].
    pub fn state_line(&self, header: bool) -> String {
        if header {
            format!("{}\n{}", STATE_HEADER, self)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x} {:04x} {:04x}", self.pc, self.sp, self.o)?;
        for value in &self.gp {
            write!(f, " {:04x}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reg_from_code() {
        assert_eq!(Reg::from_code(0x00), Reg::A);
        assert_eq!(Reg::from_code(0x0B), Reg::X);
        assert_eq!(Reg::from_code(0x17), Reg::J);
    }

    #[test]
    fn test_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc = 0xFFFF;

        let old = regs.advance_pc();
        assert_eq!(old, 0xFFFF);
        assert_eq!(regs.pc, 0);

        regs.skip_words(3);
        assert_eq!(regs.pc, 3);
    }

    #[test]
    fn test_stack_slots_wrap() {
        let mut regs = Registers::new();

        assert_eq!(regs.push_slot(), 0xFFFF);
        assert_eq!(regs.sp, 0xFFFF);

        assert_eq!(regs.pop_slot(), 0xFFFF);
        assert_eq!(regs.sp, 0);
    }

    #[test]
    fn test_state_line() {
        let mut regs = Registers::new();
        regs.pc = 0x10;
        regs.sp = 0xFFFE;
        regs.set(Reg::A, 0x30);
        regs.set(Reg::J, 0xBEEF);

        assert_eq!(
            regs.to_string(),
            "0010 fffe 0000 0030 0000 0000 0000 0000 0000 0000 beef"
        );
        assert!(regs.state_line(true).starts_with(STATE_HEADER));
    }
}
