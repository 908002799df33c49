//! CPU emulation for the DCPU-16.
//!
//! This module implements the DCPU-16 architecture:
//! - 0x10000 sixteen-bit memory words shared by code and data
//! - 8 general registers plus SP, PC and O
//! - 15 basic two-operand instructions and the JSR extended instruction
//! - 64 operand codes covering registers, memory, stack and literals

pub mod memory;
pub mod registers;
pub mod decode;
pub mod operand;
pub mod alu;
pub mod execute;

pub use memory::{Memory, MemoryError, MAX_PROGRAM_WORDS};
pub use registers::{Reg, Registers};
pub use decode::{BasicOpcode, DecodeError, ExtendedOpcode, Instruction};
pub use operand::{Location, Scalar};
pub use execute::{Cpu, CpuError, CpuState};
