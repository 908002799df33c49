//! DCPU-16 memory subsystem.
//!
//! 0x10000 words of 16 bits. Program and data share the same address
//! space, and every 16-bit value is a valid address.

use serde::{Serialize, Deserialize};

/// The number of memory words.
pub const MEMORY_SIZE: usize = 0x10000;

/// The largest program `load_program` accepts, in words.
pub const MAX_PROGRAM_WORDS: usize = 0x1000;

/// DCPU-16 memory: 65536 sixteen-bit words.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Copy a program to the start of memory.
    pub fn load_program(&mut self, program: &[u16]) -> Result<(), MemoryError> {
        if program.len() > MAX_PROGRAM_WORDS {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: MAX_PROGRAM_WORDS,
            });
        }

        self.cells[..program.len()].copy_from_slice(program);
        Ok(())
    }

    /// The whole address space as a slice.
    pub fn as_slice(&self) -> &[u16] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// Program is too large to fit in the program area.
    ProgramTooLarge { size: usize, available: usize },
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::ProgramTooLarge { size, available } => {
                write!(f, "program size {} exceeds available space {}", size, available)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();

        mem.write(0xFFFF, 0x1234);
        assert_eq!(mem.read(0xFFFF), 0x1234);
        assert_eq!(mem.read(0), 0);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(&[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0), 1);
        assert_eq!(mem.read(1), 2);
        assert_eq!(mem.read(2), 3);
        assert_eq!(mem.read(3), 0);
    }

    #[test]
    fn test_load_program_limit() {
        let mut mem = Memory::new();

        assert!(mem.load_program(&vec![0xAAAA; MAX_PROGRAM_WORDS]).is_ok());
        assert_eq!(
            mem.load_program(&vec![0; MAX_PROGRAM_WORDS + 1]),
            Err(MemoryError::ProgramTooLarge {
                size: MAX_PROGRAM_WORDS + 1,
                available: MAX_PROGRAM_WORDS,
            })
        );
    }
}
