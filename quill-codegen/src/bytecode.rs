//! Lowers AST into a register bytecode [`Chunk`].
//!
//! `R0` holds the program result and [`OpCode::Halt`] ends the program. Variables get the
//! registers after it in declaration order; temporaries are allocated above the live variables
//! and released as soon as the instruction consuming them has been written.

use crate::{describe, is_assignment, GenError};
use quill_parser::ast::{Block, If, Node, NodeKind};
use quill_parser::lexer::TokenKind;
use quill_value::chunk::{Chunk, Instruction, OpCode, Rk, MAX_CONSTANTS, MAX_REGISTERS};
use quill_value::Value;
use std::convert::TryFrom;

type Result<T> = std::result::Result<T, GenError>;

const RESULT_REG: u8 = 0;

/// Generate bytecode from an abstract syntax tree.
pub struct Codegen {
    chunk: Chunk,
    /// Variables in scope and their registers, innermost last.
    vars: Vec<(String, u8)>,
    /// Every time a new scope is created, the variable count and the next free register are
    /// pushed onto the stack. Both are restored when the scope ends.
    scopes: Vec<(usize, u8)>,
    next_reg: u8,
    /// Source line of the node being lowered.
    line: usize,
}

impl Codegen {
    pub fn new(name: String) -> Self {
        Self {
            chunk: Chunk::new(name),
            vars: Vec::new(),
            scopes: Vec::new(),
            next_reg: RESULT_REG + 1,
            line: 1,
        }
    }

    /// Consumes `self` and returns the generated [`Chunk`].
    #[must_use]
    pub fn into_inner_chunk(self) -> Chunk {
        self.chunk
    }

    /// Lowers a whole program and terminates it with [`OpCode::Halt`].
    pub fn codegen_program(&mut self, program: &Block) -> Result<()> {
        for stmt in &program.stmts {
            self.stmt(stmt)?;
        }
        let halt = self.write(Instruction::abc(OpCode::Halt, 0, 0, 0));
        self.chunk.annotate(halt, "end of program");
        Ok(())
    }

    fn write(&mut self, instr: Instruction) -> usize {
        self.chunk.write_chunk(instr, self.line)
    }

    fn enter_scope(&mut self) {
        self.scopes.push((self.vars.len(), self.next_reg));
    }

    fn exit_scope(&mut self) {
        if let Some((var_count, next_reg)) = self.scopes.pop() {
            self.vars.truncate(var_count);
            self.next_reg = next_reg;
        }
    }

    fn scoped_block(&mut self, block: &Block) -> Result<()> {
        self.enter_scope();
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        self.exit_scope();
        Ok(())
    }

    fn alloc_reg(&mut self) -> Result<u8> {
        if self.next_reg as usize >= MAX_REGISTERS {
            return Err(GenError::RegisterOverflow { line: self.line });
        }
        let reg = self.next_reg;
        self.next_reg += 1;
        Ok(reg)
    }

    fn lookup(&self, name: &str, line: usize) -> Result<u8> {
        self.vars
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, reg)| *reg)
            .ok_or_else(|| GenError::UndeclaredVariable {
                name: name.to_string(),
                line,
            })
    }

    fn is_var(&self, reg: u8) -> bool {
        self.vars.iter().any(|(_, var)| *var == reg)
    }

    /// Adds `value` to the constant table and returns it as an RK operand.
    fn constant(&mut self, value: Value) -> Result<u8> {
        let index = self.chunk.add_constant(value);
        if index >= MAX_CONSTANTS {
            return Err(GenError::ConstantOverflow { line: self.line });
        }
        Ok(Rk::Constant(index as u8).encode())
    }

    /// Emits a jump to be patched later and returns its offset.
    fn emit_jump(&mut self) -> usize {
        self.write(Instruction::asbx(OpCode::Jmp, 0, 0))
    }

    fn patch_jump(&mut self, jump: usize, target: usize) -> Result<()> {
        let offset = i16::try_from(target as i64 - jump as i64 - 1)
            .map_err(|_| GenError::JumpOutOfRange { line: self.line })?;
        self.chunk
            .patch(jump, Instruction::asbx(OpCode::Jmp, 0, offset));
        Ok(())
    }

    fn patch_here(&mut self, jump: usize) -> Result<()> {
        let here = self.chunk.code.len();
        self.patch_jump(jump, here)
    }

    fn stmt(&mut self, node: &Node) -> Result<()> {
        self.line = node.line;
        match &node.kind {
            NodeKind::Dim(bindings) => {
                for binding in bindings {
                    for name in &binding.decl.names {
                        let reg = self.alloc_reg()?;
                        let start = self.chunk.code.len();
                        match &binding.init {
                            Some(init) => self.expr_into(init, reg)?,
                            None => {
                                let default =
                                    self.constant(Value::default_for(binding.decl.ty.as_deref()))?;
                                self.write(Instruction::abc(OpCode::LoadK, reg, default, 0));
                            }
                        }
                        self.chunk.annotate(start, format!("dim {}", name));
                        // declared after the initializer so `dim x = x` reads an outer `x`
                        self.vars.push((name.clone(), reg));
                    }
                }
            }
            NodeKind::Scope(body) => self.scoped_block(body)?,
            NodeKind::If(stmt) => self.if_stmt(stmt)?,
            NodeKind::While { cond, body } => {
                // the condition is tested after the body
                let top = self.chunk.code.len();
                self.scoped_block(body)?;
                let back = self.branch_if_true(cond)?;
                self.patch_jump(back, top)?;
            }
            NodeKind::Return(expr) => {
                if let Some(expr) = expr {
                    self.expr_into(expr, RESULT_REG)?;
                }
                self.write(Instruction::abc(OpCode::Halt, 0, 0, 0));
            }
            NodeKind::Type { .. } => {}
            NodeKind::Function(_) | NodeKind::Declare(_) => {
                return Err(GenError::unsupported("function definition", node.line))
            }
            NodeKind::BinaryOp { op, lhs, rhs } if is_assignment(*op) => {
                self.assign(*op, lhs, rhs)?;
            }
            NodeKind::UnaryOp {
                op,
                operand,
                postfix,
            } if matches!(op, TokenKind::Incr | TokenKind::Decr) => {
                self.step(*op, operand, *postfix, None)?;
            }
            _ => self.expr_into(node, RESULT_REG)?,
        }
        Ok(())
    }

    fn if_stmt(&mut self, stmt: &If) -> Result<()> {
        let branches: Vec<(&Node, &Block)> = std::iter::once((&*stmt.cond, &stmt.block))
            .chain(
                stmt.else_ifs
                    .iter()
                    .map(|else_if| (&*else_if.cond, &else_if.block)),
            )
            .collect();

        let mut jumps = Vec::with_capacity(branches.len());
        for (cond, _) in &branches {
            jumps.push(self.branch_if_true(cond)?);
        }
        let otherwise = self.emit_jump();

        let mut exits = Vec::with_capacity(branches.len());
        for ((_, block), jump) in branches.iter().zip(jumps) {
            self.patch_here(jump)?;
            self.scoped_block(block)?;
            exits.push(self.emit_jump());
        }

        self.patch_here(otherwise)?;
        if let Some(else_block) = &stmt.else_block {
            self.scoped_block(else_block)?;
        }
        for exit in exits {
            self.patch_here(exit)?;
        }
        Ok(())
    }

    /// Emits a jump that is taken when `cond` holds and returns its offset for patching.
    fn branch_if_true(&mut self, cond: &Node) -> Result<usize> {
        self.line = cond.line;
        let save = self.next_reg;
        match &cond.kind {
            NodeKind::BinaryOp { op, lhs, rhs } if is_comparison(*op) => {
                let l = self.operand(lhs)?;
                let r = self.operand(rhs)?;
                self.compare(*op, l, r);
                // `EQ` skips the jump when the operands are equal, which is what `!=` wants
                if *op != TokenKind::NotEq {
                    self.write(Instruction::asbx(OpCode::Jmp, 0, 1));
                }
            }
            _ => {
                let value = self.operand(cond)?;
                let falsy = self.constant(Value::Bool(false))?;
                self.write(Instruction::abc(OpCode::Eq, 0, value, falsy));
            }
        }
        self.next_reg = save;
        Ok(self.emit_jump())
    }

    /// Returns an RK operand for `node`. Anything other than a literal or a variable is
    /// evaluated into a new temporary.
    fn operand(&mut self, node: &Node) -> Result<u8> {
        match &node.kind {
            NodeKind::Int(val) => self.constant(Value::Int(*val)),
            NodeKind::Double(val) => self.constant(Value::Double(*val)),
            NodeKind::Str(val) => self.constant(Value::Str(val.clone())),
            NodeKind::Id(name) => self.lookup(name, node.line),
            _ => {
                let reg = self.alloc_reg()?;
                self.expr_into(node, reg)?;
                Ok(reg)
            }
        }
    }

    fn expr_into(&mut self, node: &Node, dest: u8) -> Result<()> {
        self.line = node.line;
        match &node.kind {
            NodeKind::Int(_) | NodeKind::Double(_) | NodeKind::Str(_) => {
                let constant = self.operand(node)?;
                self.write(Instruction::abc(OpCode::LoadK, dest, constant, 0));
            }
            NodeKind::Id(name) => {
                let var = self.lookup(name, node.line)?;
                if var != dest {
                    self.write(Instruction::abc(OpCode::Move, dest, var, 0));
                }
            }
            NodeKind::BinaryOp { op, lhs, rhs } => self.binary(*op, lhs, rhs, dest)?,
            NodeKind::UnaryOp {
                op,
                operand,
                postfix,
            } => self.unary(*op, operand, *postfix, dest)?,
            kind => return Err(GenError::unsupported(describe(kind), node.line)),
        }
        Ok(())
    }

    fn binary(&mut self, op: TokenKind, lhs: &Node, rhs: &Node, dest: u8) -> Result<()> {
        if is_assignment(op) {
            let var = self.assign(op, lhs, rhs)?;
            if var != dest {
                self.write(Instruction::abc(OpCode::Move, dest, var, 0));
            }
            return Ok(());
        }

        match op {
            TokenKind::And | TokenKind::Or => self.logical(op, lhs, rhs, dest),
            op if is_comparison(op) => {
                let save = self.next_reg;
                let l = self.operand(lhs)?;
                let r = self.operand(rhs)?;
                self.compare(op, l, r);
                self.next_reg = save;
                self.materialize(op == TokenKind::NotEq, dest)
            }
            op => {
                let opcode = arith_opcode(op).ok_or_else(|| {
                    GenError::unsupported(format!("operator `{}`", op), self.line)
                })?;
                let save = self.next_reg;
                let l = self.operand(lhs)?;
                let r = self.operand(rhs)?;
                self.write(Instruction::abc(opcode, dest, l, r));
                self.next_reg = save;
                Ok(())
            }
        }
    }

    /// Emits the comparison instruction for `op`. `>` and `>=` swap their operands;
    /// `!=` is emitted as `EQ` and its outcome inverted by the caller.
    fn compare(&mut self, op: TokenKind, l: u8, r: u8) {
        let (opcode, b, c) = match op {
            TokenKind::Lt => (OpCode::Lt, l, r),
            TokenKind::LtEq => (OpCode::Lte, l, r),
            TokenKind::Gt => (OpCode::Lt, r, l),
            TokenKind::GtEq => (OpCode::Lte, r, l),
            _ => (OpCode::Eq, l, r),
        };
        self.write(Instruction::abc(opcode, 0, b, c));
    }

    /// Loads the outcome of the comparison just written into `dest`.
    fn materialize(&mut self, negate: bool, dest: u8) -> Result<()> {
        let hold = self.constant(Value::Bool(!negate))?;
        let miss = self.constant(Value::Bool(negate))?;
        self.write(Instruction::asbx(OpCode::Jmp, 0, 1));
        self.write(Instruction::abc(OpCode::LoadB, dest, hold, 1));
        self.write(Instruction::abc(OpCode::LoadB, dest, miss, 0));
        Ok(())
    }

    /// `&&` and `||` only evaluate `rhs` when `lhs` does not decide the result.
    fn logical(&mut self, op: TokenKind, lhs: &Node, rhs: &Node, dest: u8) -> Result<()> {
        let save = self.next_reg;
        // `rhs` may still read the variable being assigned
        let target = if self.is_var(dest) {
            self.alloc_reg()?
        } else {
            dest
        };

        self.expr_into(lhs, target)?;
        let falsy = self.constant(Value::Bool(false))?;
        self.write(Instruction::abc(OpCode::Eq, 0, target, falsy));
        if op == TokenKind::And {
            self.write(Instruction::asbx(OpCode::Jmp, 0, 1));
        }
        let skip = self.emit_jump();
        self.expr_into(rhs, target)?;
        self.patch_here(skip)?;

        if target != dest {
            self.write(Instruction::abc(OpCode::Move, dest, target, 0));
        }
        self.next_reg = save;
        Ok(())
    }

    fn unary(&mut self, op: TokenKind, operand: &Node, postfix: bool, dest: u8) -> Result<()> {
        let save = self.next_reg;
        match op {
            TokenKind::Minus => {
                let src = self.operand(operand)?;
                let src = match Rk::decode(src) {
                    Rk::Register(reg) => reg,
                    Rk::Constant(_) => {
                        self.write(Instruction::abc(OpCode::LoadK, dest, src, 0));
                        dest
                    }
                };
                self.write(Instruction::abc(OpCode::Negate, dest, src, 0));
            }
            TokenKind::Bang | TokenKind::Not => {
                let src = self.operand(operand)?;
                let falsy = self.constant(Value::Bool(false))?;
                self.write(Instruction::abc(OpCode::Eq, 0, src, falsy));
                self.materialize(false, dest)?;
            }
            TokenKind::Tilde => {
                let src = self.operand(operand)?;
                let all_ones = self.constant(Value::Int(-1))?;
                self.write(Instruction::abc(OpCode::BitXor, dest, src, all_ones));
            }
            TokenKind::Incr | TokenKind::Decr => self.step(op, operand, postfix, Some(dest))?,
            op => {
                return Err(GenError::unsupported(
                    format!("operator `{}`", op),
                    self.line,
                ))
            }
        }
        self.next_reg = save;
        Ok(())
    }

    /// Lowers `=` and the compound assignments. Returns the register of the assigned variable.
    fn assign(&mut self, op: TokenKind, lhs: &Node, rhs: &Node) -> Result<u8> {
        let name = lhs
            .as_id()
            .ok_or(GenError::InvalidAssignTarget { line: lhs.line })?;
        let var = self.lookup(name, lhs.line)?;

        match op {
            TokenKind::Assign => self.expr_into(rhs, var)?,
            TokenKind::AndAssign => self.logical(TokenKind::And, lhs, rhs, var)?,
            TokenKind::OrAssign => self.logical(TokenKind::Or, lhs, rhs, var)?,
            op => {
                let opcode = arith_opcode(op).ok_or_else(|| {
                    GenError::unsupported(format!("operator `{}`", op), lhs.line)
                })?;
                let save = self.next_reg;
                let r = self.operand(rhs)?;
                self.write(Instruction::abc(opcode, var, var, r));
                self.next_reg = save;
            }
        }
        Ok(var)
    }

    /// `++` and `--`. A postfix step leaves the old value in `dest`.
    fn step(&mut self, op: TokenKind, operand: &Node, postfix: bool, dest: Option<u8>) -> Result<()> {
        let name = operand
            .as_id()
            .ok_or(GenError::InvalidAssignTarget { line: operand.line })?;
        let var = self.lookup(name, operand.line)?;
        let one = self.constant(Value::Int(1))?;
        let opcode = if op == TokenKind::Incr {
            OpCode::Add
        } else {
            OpCode::Sub
        };
        let dest = dest.filter(|dest| *dest != var);

        if let (Some(dest), true) = (dest, postfix) {
            self.write(Instruction::abc(OpCode::Move, dest, var, 0));
        }
        self.write(Instruction::abc(opcode, var, var, one));
        if let (Some(dest), false) = (dest, postfix) {
            self.write(Instruction::abc(OpCode::Move, dest, var, 0));
        }
        Ok(())
    }
}

fn is_comparison(op: TokenKind) -> bool {
    matches!(
        op,
        TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::LtEq
            | TokenKind::Gt
            | TokenKind::GtEq
    )
}

/// Opcode of an arithmetic or bitwise operator, including the arithmetic part of a compound
/// assignment.
fn arith_opcode(op: TokenKind) -> Option<OpCode> {
    let opcode = match op {
        TokenKind::Plus | TokenKind::PlusAssign => OpCode::Add,
        TokenKind::Minus | TokenKind::MinusAssign => OpCode::Sub,
        TokenKind::Star | TokenKind::StarAssign => OpCode::Mul,
        TokenKind::Slash | TokenKind::SlashAssign => OpCode::Div,
        TokenKind::Percent => OpCode::Mod,
        TokenKind::Pow => OpCode::Pow,
        TokenKind::Shl => OpCode::BitShl,
        TokenKind::Shr => OpCode::BitShr,
        TokenKind::BitAnd => OpCode::BitAnd,
        TokenKind::BitOr => OpCode::BitOr,
        TokenKind::BitXor => OpCode::BitXor,
        _ => return None,
    };
    Some(opcode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use quill_parser::parser::parse;
    use quill_source::Source;

    fn codegen(source: &str) -> Result<Chunk> {
        let ast = parse(&Source::new(source)).expect("program should parse");
        let mut codegen = Codegen::new("<global>".to_string());
        codegen.codegen_program(&ast)?;
        Ok(codegen.into_inner_chunk())
    }

    fn listing(source: &str) -> String {
        console::set_colors_enabled(false);
        codegen(source).unwrap().to_string()
    }

    #[test]
    fn test_arithmetic() {
        assert_snapshot!(listing("dim a as integer = 1\na = a + 2"), @r###"
        == <global> ==
        0000    1 loadk    R1 K0=1 // dim a
        0001    2 add      R1 R1 K1=2
        0002    | halt     // end of program
        "###);
    }

    #[test]
    fn test_boolean_materialization() {
        assert_snapshot!(listing("dim b = 1 != 2"), @r###"
        == <global> ==
        0000    1 eq       K0=1 K1=2 // dim b
        0001    | jmp      1 (to 0003)
        0002    | loadb    R1 K2=false 1
        0003    | loadb    R1 K3=true 0
        0004    | halt     // end of program
        "###);
    }

    #[test]
    fn test_if() {
        assert_snapshot!(listing("dim a = 3\nif a > 1 then\na = 0\nend"), @r###"
        == <global> ==
        0000    1 loadk    R1 K0=3 // dim a
        0001    2 lt       K1=1 R1
        0002    | jmp      1 (to 0004)
        0003    | jmp      1 (to 0005)
        0004    | jmp      2 (to 0007)
        0005    3 loadk    R1 K2=0
        0006    | jmp      0 (to 0007)
        0007    | halt     // end of program
        "###);
    }

    #[test]
    fn test_while_tests_at_bottom() {
        assert_snapshot!(listing("dim i = 0\nwhile i < 3\ni += 1\nloop"), @r###"
        == <global> ==
        0000    1 loadk    R1 K0=0 // dim i
        0001    3 add      R1 R1 K1=1
        0002    2 lt       R1 K2=3
        0003    | jmp      1 (to 0005)
        0004    | jmp      -4 (to 0001)
        0005    | halt     // end of program
        "###);
    }

    #[test]
    fn test_temporaries() {
        let chunk = codegen("dim a = 1\na = (a + 2) * (a - 3)").unwrap();
        // both sub-expressions get their own temporary above `a`
        let mul = chunk.code[chunk.code.len() - 2];
        assert_eq!(mul.op(), Some(OpCode::Mul));
        assert_eq!((mul.a(), mul.b(), mul.c()), (1, 2, 3));
    }

    #[test]
    fn test_scope_releases_registers() {
        let chunk = codegen("scope\ndim a = 1\nend\ndim b = 2").unwrap();
        assert_eq!(chunk.code[0].a(), 1);
        assert_eq!(chunk.code[1].a(), 1);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            codegen("f(1)").unwrap_err(),
            GenError::Unsupported {
                construct: "function call".to_string(),
                line: 1
            }
        );
        assert_eq!(
            codegen("\nx = 1").unwrap_err(),
            GenError::UndeclaredVariable {
                name: "x".to_string(),
                line: 2
            }
        );
        assert_eq!(
            codegen("dim a\n1 = a").unwrap_err(),
            GenError::InvalidAssignTarget { line: 2 }
        );

        let many_vars: String = (0..MAX_REGISTERS)
            .map(|i| format!("dim v{}\n", i))
            .collect();
        assert_eq!(
            codegen(&many_vars).unwrap_err(),
            GenError::RegisterOverflow {
                line: MAX_REGISTERS
            }
        );

        let many_constants: String = std::iter::once("dim a\n".to_string())
            .chain((0..=MAX_CONSTANTS).map(|i| format!("a = {}\n", i + 1)))
            .collect();
        assert!(matches!(
            codegen(&many_constants).unwrap_err(),
            GenError::ConstantOverflow { .. }
        ));
    }
}
