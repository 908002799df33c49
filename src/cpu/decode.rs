//! Instruction decoder for the DCPU-16.
//!
//! Every instruction starts with one word:
//!
//! ```text
//! basic:    bbbbbbaaaaaaoooo   o = opcode (1-15), a = operand a, b = operand b
//! extended: aaaaaaoooooo0000   o = extended opcode, a = operand a
//! ```
//!
//! Operand codes in 0x10-0x17, 0x1E and 0x1F read one trailing word, so an
//! instruction occupies 1 to 3 words.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Two-operand opcodes, selected by the low 4 bits of the first word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicOpcode {
    /// a := b
    Set = 0x1,
    /// a := a + b, O := 1 on carry
    Add = 0x2,
    /// a := a - b, O := 0xFFFF on borrow
    Sub = 0x3,
    /// a := a * b, O := high word
    Mul = 0x4,
    /// a := a / b, O := fractional word
    Div = 0x5,
    /// a := a % b
    Mod = 0x6,
    /// a := a << b, O := bits shifted out
    Shl = 0x7,
    /// a := a >> b, O := bits shifted out
    Shr = 0x8,
    And = 0x9,
    Bor = 0xA,
    Xor = 0xB,
    /// Run the next instruction only if a == b
    Ife = 0xC,
    /// Run the next instruction only if a != b
    Ifn = 0xD,
    /// Run the next instruction only if a > b
    Ifg = 0xE,
    /// Run the next instruction only if (a & b) != 0
    Ifb = 0xF,
}

impl BasicOpcode {
    pub fn from_bits(bits: u16) -> Option<Self> {
        let op = match bits {
            0x1 => BasicOpcode::Set,
            0x2 => BasicOpcode::Add,
            0x3 => BasicOpcode::Sub,
            0x4 => BasicOpcode::Mul,
            0x5 => BasicOpcode::Div,
            0x6 => BasicOpcode::Mod,
            0x7 => BasicOpcode::Shl,
            0x8 => BasicOpcode::Shr,
            0x9 => BasicOpcode::And,
            0xA => BasicOpcode::Bor,
            0xB => BasicOpcode::Xor,
            0xC => BasicOpcode::Ife,
            0xD => BasicOpcode::Ifn,
            0xE => BasicOpcode::Ifg,
            0xF => BasicOpcode::Ifb,
            _ => return None,
        };
        Some(op)
    }

    /// True for IFE/IFN/IFG/IFB, which never write operand a.
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            BasicOpcode::Ife | BasicOpcode::Ifn | BasicOpcode::Ifg | BasicOpcode::Ifb
        )
    }
}

/// One-operand opcodes, used when the basic opcode field is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtendedOpcode {
    /// Push PC, then PC := a
    Jsr = 0x01,
}

impl ExtendedOpcode {
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0x01 => Some(ExtendedOpcode::Jsr),
            _ => None,
        }
    }
}

/// A decoded first word. Operand codes are kept raw; they are resolved
/// against the processor state at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Basic { op: BasicOpcode, a: u16, b: u16 },
    Extended { op: ExtendedOpcode, a: u16 },
}

#[inline]
fn opcode_bits(word: u16) -> u16 {
    word & 0xF
}

#[inline]
fn a_bits(word: u16) -> u16 {
    (word >> 4) & 0x3F
}

#[inline]
fn b_bits(word: u16) -> u16 {
    word >> 10
}

/// Decode the first word of an instruction.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let op = opcode_bits(word);

    if op == 0 {
        let ext = a_bits(word);
        let op = ExtendedOpcode::from_bits(ext)
            .ok_or(DecodeError::InvalidExtendedOpcode(ext))?;
        return Ok(Instruction::Extended { op, a: b_bits(word) });
    }

    let op = BasicOpcode::from_bits(op).ok_or(DecodeError::InvalidBasicOpcode(op))?;
    Ok(Instruction::Basic {
        op,
        a: a_bits(word),
        b: b_bits(word),
    })
}

/// Encode an instruction back to its first word.
pub fn encode(instr: &Instruction) -> u16 {
    match *instr {
        Instruction::Basic { op, a, b } => (op as u16) | ((a & 0x3F) << 4) | ((b & 0x3F) << 10),
        Instruction::Extended { op, a } => ((op as u16) << 4) | ((a & 0x3F) << 10),
    }
}

/// Whether an operand code reads a trailing word.
#[inline]
pub fn consumes_next_word(code: u16) -> bool {
    matches!(code, 0x10..=0x17 | 0x1E | 0x1F)
}

/// Length in words (1-3) of the instruction whose first word is `word`.
///
/// Only the operand codes are inspected, so this also works for words
/// that would fail to decode.
pub fn instruction_length(word: u16) -> u16 {
    let mut length = 1;
    if opcode_bits(word) != 0 && consumes_next_word(a_bits(word)) {
        length += 1;
    }
    // For extended instructions the b field holds operand a.
    if consumes_next_word(b_bits(word)) {
        length += 1;
    }
    length
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized basic opcode 0x{0:x}")]
    InvalidBasicOpcode(u16),

    #[error("unrecognized extended opcode 0x{0:02x}")]
    InvalidExtendedOpcode(u16),
}
