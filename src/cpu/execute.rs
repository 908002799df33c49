//! CPU execution engine for the DCPU-16.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::{alu, Memory, Registers};
use crate::cpu::decode::{self, BasicOpcode, DecodeError, ExtendedOpcode, Instruction};
use crate::cpu::memory::MemoryError;
use crate::cpu::operand;
use log::trace;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Operand code of PC.
const PC_CODE: u16 = 0x1C;

/// First operand code that is a literal (next-word or inline).
const FIRST_LITERAL_CODE: u16 = 0x1F;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// The CPU jumped to its own address with `SET PC, literal`.
    Halted,
}

/// The DCPU-16 processor state.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Total cycles spent (for profiling).
    pub cycles: u64,
}

impl Cpu {
    /// Create a new CPU with zeroed state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
        }
    }

    /// Create a CPU with `program` copied to address 0.
    pub fn with_program(program: &[u16]) -> Result<Self, MemoryError> {
        let mut cpu = Self::new();
        cpu.load_program(program)?;
        Ok(cpu)
    }

    /// Load a program into memory at address 0.
    pub fn load_program(&mut self, program: &[u16]) -> Result<(), MemoryError> {
        self.mem.load_program(program)
    }

    /// Execute a single instruction.
    ///
    /// Returns the number of cycles it took. A decode error leaves the
    /// state as it was at the point of failure, with PC past the bad word.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        // Fetch
        let start = self.regs.advance_pc();
        let word = self.mem.read(start);

        // Decode
        let instr = decode::decode(word)?;

        // Execute
        let mut cycles = 0;
        match instr {
            Instruction::Basic { op, a, b } => self.execute_basic(op, a, b, start, &mut cycles),
            Instruction::Extended { op, a } => self.execute_extended(op, a, &mut cycles),
        }

        trace!("{:04x}: {:?} -> {} cycles, {}", start, instr, cycles, self.regs);

        // Update state
        self.cycles += cycles as u64;

        Ok(cycles)
    }

    fn execute_extended(&mut self, op: ExtendedOpcode, a: u16, cycles: &mut u32) {
        let target = operand::resolve(self, a, cycles).read(self);

        match op {
            ExtendedOpcode::Jsr => {
                *cycles += 2;
                let slot = self.regs.push_slot();
                self.mem.write(slot, self.regs.pc);
                self.regs.pc = target;
            }
        }
    }

    fn execute_basic(&mut self, op: BasicOpcode, a: u16, b: u16, start: u16, cycles: &mut u32) {
        // a first: both may read trailing words, in wire order.
        let dest = operand::resolve(self, a, cycles);
        let src = operand::resolve(self, b, cycles);
        let va = dest.read(self);
        let vb = src.read(self);

        let result = match op {
            BasicOpcode::Set => {
                *cycles += 1;
                vb
            }
            BasicOpcode::Add => {
                *cycles += 1;
                self.with_overflow(alu::add(va, vb))
            }
            BasicOpcode::Sub => {
                *cycles += 1;
                self.with_overflow(alu::sub(va, vb))
            }
            BasicOpcode::Mul => {
                *cycles += 2;
                self.with_overflow(alu::mul(va, vb))
            }
            BasicOpcode::Div => {
                *cycles += 3;
                self.with_overflow(alu::div(va, vb))
            }
            BasicOpcode::Mod => {
                *cycles += 3;
                alu::rem(va, vb)
            }
            BasicOpcode::Shl => {
                *cycles += 2;
                self.with_overflow(alu::shl(va, vb))
            }
            BasicOpcode::Shr => {
                *cycles += 2;
                self.with_overflow(alu::shr(va, vb))
            }
            BasicOpcode::And => {
                *cycles += 1;
                va & vb
            }
            BasicOpcode::Bor => {
                *cycles += 1;
                va | vb
            }
            BasicOpcode::Xor => {
                *cycles += 1;
                va ^ vb
            }
            BasicOpcode::Ife => return self.conditional(va == vb, cycles),
            BasicOpcode::Ifn => return self.conditional(va != vb, cycles),
            BasicOpcode::Ifg => return self.conditional(va > vb, cycles),
            BasicOpcode::Ifb => return self.conditional((va & vb) != 0, cycles),
        };

        // Destination last: a result aimed at O replaces the overflow value.
        dest.write(self, result);

        // Heuristic only: catches `SET PC, <own address>` but not longer spin loops.
        if op == BasicOpcode::Set && a == PC_CODE && b >= FIRST_LITERAL_CODE && vb == start {
            self.state = CpuState::Halted;
        }
    }

    fn with_overflow(&mut self, (value, overflow): (u16, u16)) -> u16 {
        self.regs.o = overflow;
        value
    }

    /// IFx: 2 cycles, plus 1 and a skip of the next instruction when false.
    fn conditional(&mut self, condition: bool, cycles: &mut u32) {
        *cycles += 2;
        if !condition {
            *cycles += self.skip_next();
        }
    }

    /// Move PC past the next instruction without executing it.
    ///
    /// The length comes from the operand codes alone, so none of the
    /// skipped instruction's side effects (SP changes, writes) happen.
    fn skip_next(&mut self) -> u32 {
        let word = self.mem.read(self.regs.pc);
        self.regs.skip_words(decode::instruction_length(word));
        1
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}
