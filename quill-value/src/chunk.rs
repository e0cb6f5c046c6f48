//! Definitions for [`Chunk`], [`Instruction`] and [`OpCode`].
//!
//! An instruction is one 32 bit word:
//!
//! ```text
//!   8    8   8   8            8    8     16
//! +----------------+        +----------------+
//! | op | a | b | c |        | op | a |  sBx  |
//! +----------------+        +----------------+
//! ```
//!
//! Operands `b` and `c` of most instructions are *RK* operands: values below
//! [`MAX_REGISTERS`] name a register, larger values name the constant at
//! `operand - MAX_REGISTERS`.

use crate::{Value, ValueArray};
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use std::collections::HashMap;

/// Number of registers. Also the bias of constant operands.
pub const MAX_REGISTERS: usize = 32;
/// Number of constants addressable by an RK operand.
pub const MAX_CONSTANTS: usize = 256 - MAX_REGISTERS;

/// Represents an opcode. Internally represented using 1 byte (`u8`).
///
/// Comparison instructions skip the next instruction when the comparison holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum OpCode {
    /// Stops execution. The result is in `R0`.
    Halt = 0,
    /// Relative jump by `sBx`.
    Jmp = 1,
    /// `R(a) = RK(b)`
    LoadK = 2,
    /// `R(a) = RK(b)`, then skips the next instruction if `c` is not zero.
    LoadB = 3,
    /// `R(a) = R(b)`
    Move = 4,
    /// Skips the next instruction if `RK(b) == RK(c)`.
    Eq = 5,
    /// Skips the next instruction if `RK(b) < RK(c)`.
    Lt = 6,
    /// Skips the next instruction if `RK(b) <= RK(c)`.
    Lte = 7,
    Add = 8,
    Sub = 9,
    Div = 10,
    Mul = 11,
    Mod = 12,
    Pow = 13,
    /// `R(a) = -R(b)`
    Negate = 14,
    BitShl = 15,
    BitShr = 16,
    BitAnd = 17,
    BitOr = 18,
    BitXor = 19,
}

impl OpCode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Halt => "halt",
            OpCode::Jmp => "jmp",
            OpCode::LoadK => "loadk",
            OpCode::LoadB => "loadb",
            OpCode::Move => "move",
            OpCode::Eq => "eq",
            OpCode::Lt => "lt",
            OpCode::Lte => "lte",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Div => "div",
            OpCode::Mul => "mul",
            OpCode::Mod => "mod",
            OpCode::Pow => "pow",
            OpCode::Negate => "negate",
            OpCode::BitShl => "bshl",
            OpCode::BitShr => "bshr",
            OpCode::BitAnd => "band",
            OpCode::BitOr => "bor",
            OpCode::BitXor => "bxor",
        }
    }
}

/// A decoded RK operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rk {
    Register(u8),
    /// Index into the constant table.
    Constant(u8),
}

impl Rk {
    pub fn decode(operand: u8) -> Self {
        if (operand as usize) < MAX_REGISTERS {
            Rk::Register(operand)
        } else {
            Rk::Constant(operand - MAX_REGISTERS as u8)
        }
    }

    pub fn encode(self) -> u8 {
        match self {
            Rk::Register(reg) => reg,
            Rk::Constant(index) => index + MAX_REGISTERS as u8,
        }
    }
}

/// A single encoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(pub u32);

impl Instruction {
    /// Encodes an `op a b c` instruction.
    ///
    /// # Example
    /// ```
    /// use quill_value::chunk::{Instruction, OpCode};
    /// let instr = Instruction::abc(OpCode::Add, 0, 1, 33);
    /// assert_eq!(instr.0, 8 << 24 | 1 << 8 | 33);
    /// assert_eq!(instr.op(), Some(OpCode::Add));
    /// ```
    pub fn abc(op: OpCode, a: u8, b: u8, c: u8) -> Self {
        Self((op as u32) << 24 | (a as u32) << 16 | (b as u32) << 8 | c as u32)
    }

    /// Encodes an `op a sBx` instruction.
    ///
    /// # Example
    /// ```
    /// use quill_value::chunk::{Instruction, OpCode};
    /// let instr = Instruction::asbx(OpCode::Jmp, 0, -3);
    /// assert_eq!(instr.sbx(), -3);
    /// ```
    pub fn asbx(op: OpCode, a: u8, sbx: i16) -> Self {
        Self((op as u32) << 24 | (a as u32) << 16 | sbx as u16 as u32)
    }

    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_u8((self.0 >> 24 & 0xff) as u8)
    }

    pub fn a(&self) -> u8 {
        (self.0 >> 16 & 0xff) as u8
    }

    pub fn b(&self) -> u8 {
        (self.0 >> 8 & 0xff) as u8
    }

    pub fn c(&self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub fn sbx(&self) -> i16 {
        (self.0 & 0xffff) as u16 as i16
    }
}

/// Represents a chunk of bytecode.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub code: Vec<Instruction>,
    /// Source line of each instruction in `code`.
    pub lines: Vec<usize>,
    /// Constant table for this [`Chunk`].
    pub constants: ValueArray,
    /// The name of the chunk. `<global>` for the program.
    pub name: String,
    /// Comments attached to instruction offsets, shown by the disassembler.
    pub debug_annotations: HashMap<usize, String>,
}

impl Chunk {
    /// Create an empty chunk with the specified `name`.
    ///
    /// # Example
    /// ```
    /// use quill_value::chunk::Chunk;
    /// let chunk = Chunk::new("my_chunk".to_string());
    /// assert_eq!(chunk.name, "my_chunk");
    /// ```
    pub fn new(name: String) -> Self {
        Self {
            code: Vec::new(),
            lines: Vec::new(),
            constants: ValueArray::new(),
            name,
            debug_annotations: HashMap::new(),
        }
    }

    /// Appends an instruction and returns its offset.
    ///
    /// # Params
    /// * `instr` - The instruction to write to the chunk.
    /// * `line` - The original source line. This is used for debugging.
    pub fn write_chunk(&mut self, instr: Instruction, line: usize) -> usize {
        debug_assert_eq!(self.code.len(), self.lines.len());
        self.code.push(instr);
        self.lines.push(line);
        self.code.len() - 1
    }

    /// Replaces the instruction at `offset`. Used to patch jumps.
    pub fn patch(&mut self, offset: usize, instr: Instruction) {
        self.code[offset] = instr;
    }

    /// Add a constant to the constant table, reusing an equal constant if present.
    /// Returns the index of the constant.
    ///
    /// # Example
    /// ```
    /// use quill_value::chunk::Chunk;
    /// use quill_value::Value;
    /// let mut chunk = Chunk::new("my_chunk".to_string());
    /// assert_eq!(chunk.add_constant(Value::Bool(true)), 0);
    /// assert_eq!(chunk.add_constant(Value::Int(2)), 1);
    /// assert_eq!(chunk.add_constant(Value::Bool(true)), 0);
    /// assert_eq!(chunk.constants, vec![Value::Bool(true), Value::Int(2)]);
    /// ```
    pub fn add_constant(&mut self, value: Value) -> usize {
        if let Some(index) = self.constants.iter().position(|constant| *constant == value) {
            return index;
        }
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Attaches a comment to the instruction at `offset`.
    pub fn annotate(&mut self, offset: usize, note: impl Into<String>) {
        self.debug_annotations.insert(offset, note.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rk_bias() {
        assert_eq!(Rk::decode(0), Rk::Register(0));
        assert_eq!(Rk::decode(31), Rk::Register(31));
        assert_eq!(Rk::decode(32), Rk::Constant(0));
        assert_eq!(Rk::decode(40), Rk::Constant(8));
        assert_eq!(Rk::Constant(3).encode(), 35);
    }

    #[test]
    fn test_fields() {
        let instr = Instruction::abc(OpCode::LoadB, 2, 33, 1);
        assert_eq!(instr.op(), Some(OpCode::LoadB));
        assert_eq!((instr.a(), instr.b(), instr.c()), (2, 33, 1));

        let jmp = Instruction::asbx(OpCode::Jmp, 0, 1);
        assert_eq!(jmp.op(), Some(OpCode::Jmp));
        assert_eq!(jmp.sbx(), 1);
        assert_eq!(Instruction(0xff00_0000).op(), None);
    }
}
