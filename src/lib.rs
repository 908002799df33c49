//! # DCPU-16 Virtual Machine
//!
//! An emulator of the DCPU-16, a 16-bit word-addressed processor with
//! eight general registers, a downward-growing stack and an overflow
//! register.
//!
//! The [`cpu`] module decodes and executes instructions one at a time.
//! The [`vm`] module runs them in real time on a background thread, paced
//! to a configured cycle frequency, and reports when the program halts.

pub mod cpu;
pub mod vm;
pub mod program;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, CpuState, Memory, Registers, Reg, Instruction};
pub use vm::{VirtualMachine, VmConfig, VmError};
pub use program::{parse_hex, load_hex_file, ProgramError};
