//! Operand resolution.
//!
//! A 6-bit operand code names where a value lives:
//!
//! | code        | location                                  |
//! |-------------|-------------------------------------------|
//! | 0x00-0x07   | register                                  |
//! | 0x08-0x0F   | `[register]`                              |
//! | 0x10-0x17   | `[next word + register]`                  |
//! | 0x18        | `POP`  / `[SP++]`                         |
//! | 0x19        | `PEEK` / `[SP]`                           |
//! | 0x1A        | `PUSH` / `[--SP]`                         |
//! | 0x1B        | SP                                        |
//! | 0x1C        | PC                                        |
//! | 0x1D        | O                                         |
//! | 0x1E        | `[next word]`                             |
//! | 0x1F        | next word, literal                        |
//! | 0x20-0x3F   | literal 0x00-0x1F                         |
//!
//! Literals are not writable; writing to one is silently ignored.

use crate::cpu::decode::consumes_next_word;
use crate::cpu::registers::Reg;
use crate::cpu::Cpu;
use serde::{Serialize, Deserialize};

/// One of the scalar registers that has its own operand code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scalar {
    StackPointer,
    ProgramCounter,
    Overflow,
}

/// A resolved operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Register(Reg),
    Memory(u16),
    Scalar(Scalar),
    /// A literal. Writes are discarded.
    ReadOnly(u16),
}

impl Location {
    pub fn read(self, cpu: &Cpu) -> u16 {
        match self {
            Location::Register(reg) => cpu.regs.get(reg),
            Location::Memory(addr) => cpu.mem.read(addr),
            Location::Scalar(Scalar::StackPointer) => cpu.regs.sp,
            Location::Scalar(Scalar::ProgramCounter) => cpu.regs.pc,
            Location::Scalar(Scalar::Overflow) => cpu.regs.o,
            Location::ReadOnly(value) => value,
        }
    }

    pub fn write(self, cpu: &mut Cpu, value: u16) {
        match self {
            Location::Register(reg) => cpu.regs.set(reg, value),
            Location::Memory(addr) => cpu.mem.write(addr, value),
            Location::Scalar(Scalar::StackPointer) => cpu.regs.sp = value,
            Location::Scalar(Scalar::ProgramCounter) => cpu.regs.pc = value,
            Location::Scalar(Scalar::Overflow) => cpu.regs.o = value,
            Location::ReadOnly(_) => {}
        }
    }
}

/// Read the word at PC and advance past it.
fn next_word(cpu: &mut Cpu) -> u16 {
    let addr = cpu.regs.advance_pc();
    cpu.mem.read(addr)
}

/// Resolve an operand code against the current state.
///
/// Side effects happen here: trailing words advance PC, and POP/PUSH move
/// SP. Each trailing word read adds one to `cycles`.
pub fn resolve(cpu: &mut Cpu, code: u16, cycles: &mut u32) -> Location {
    let code = code & 0x3F;
    if consumes_next_word(code) {
        *cycles += 1;
    }

    match code {
        0x00..=0x07 => Location::Register(Reg::from_code(code)),
        0x08..=0x0F => Location::Memory(cpu.regs.get(Reg::from_code(code))),
        0x10..=0x17 => {
            let offset = next_word(cpu);
            Location::Memory(cpu.regs.get(Reg::from_code(code)).wrapping_add(offset))
        }
        0x18 => Location::Memory(cpu.regs.pop_slot()),
        0x19 => Location::Memory(cpu.regs.sp),
        0x1A => Location::Memory(cpu.regs.push_slot()),
        0x1B => Location::Scalar(Scalar::StackPointer),
        0x1C => Location::Scalar(Scalar::ProgramCounter),
        0x1D => Location::Scalar(Scalar::Overflow),
        0x1E => Location::Memory(next_word(cpu)),
        0x1F => Location::ReadOnly(next_word(cpu)),
        _ => Location::ReadOnly(code - 0x20),
    }
}
