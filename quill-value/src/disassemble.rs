//! [`Chunk`] disassembling support.

use crate::chunk::{Chunk, Instruction, OpCode, Rk};
use console::style;
use std::fmt;

impl Chunk {
    /// Renders an RK operand: `R3` for a register, `K0=1` for a constant.
    fn rk(&self, operand: u8) -> String {
        match Rk::decode(operand) {
            Rk::Register(reg) => format!("R{}", reg),
            Rk::Constant(index) => match self.constants.get(index as usize) {
                Some(value) => format!("K{}={}", index, value),
                None => format!("K{}=?", index),
            },
        }
    }

    /// Disassembles the instruction at the given `offset`.
    fn disassemble_instr(&self, f: &mut fmt::Formatter<'_>, offset: usize) -> fmt::Result {
        write!(f, "{:04} ", style(offset).black().bright())?;

        // Print source line number.
        if offset > 0 && self.lines[offset] == self.lines[offset - 1] {
            write!(f, "{:>4} ", "|")?;
        } else {
            write!(f, "{:>4} ", self.lines[offset])?;
        }

        let instr: Instruction = self.code[offset];
        let op = match instr.op() {
            Some(op) => op,
            None => {
                // skip bad instruction
                write!(f, "{:<8} {:#010x}", "invalid", instr.0)?;
                return self.annotation(f, offset);
            }
        };

        write!(f, "{:<8}", op.mnemonic())?;
        match op {
            OpCode::Halt => {}
            OpCode::Jmp => {
                let target = offset as i64 + 1 + instr.sbx() as i64;
                write!(f, " {} (to {:04})", instr.sbx(), target)?;
            }
            OpCode::LoadK => write!(f, " R{} {}", instr.a(), self.rk(instr.b()))?,
            OpCode::LoadB => write!(
                f,
                " R{} {} {}",
                instr.a(),
                self.rk(instr.b()),
                instr.c()
            )?,
            OpCode::Move | OpCode::Negate => write!(f, " R{} R{}", instr.a(), instr.b())?,
            OpCode::Eq | OpCode::Lt | OpCode::Lte => {
                write!(f, " {} {}", self.rk(instr.b()), self.rk(instr.c()))?
            }
            OpCode::Add
            | OpCode::Sub
            | OpCode::Div
            | OpCode::Mul
            | OpCode::Mod
            | OpCode::Pow
            | OpCode::BitShl
            | OpCode::BitShr
            | OpCode::BitAnd
            | OpCode::BitOr
            | OpCode::BitXor => write!(
                f,
                " R{} {} {}",
                instr.a(),
                self.rk(instr.b()),
                self.rk(instr.c())
            )?,
        }

        self.annotation(f, offset)
    }

    fn annotation(&self, f: &mut fmt::Formatter<'_>, offset: usize) -> fmt::Result {
        if let Some(note) = self.debug_annotations.get(&offset) {
            write!(
                f,
                " {}",
                style(format!("// {}", note)).color256(29) // dark green
            )?;
        }
        writeln!(f)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.name)?;

        for offset in 0..self.code.len() {
            self.disassemble_instr(f, offset)?;
        }

        Ok(())
    }
}
