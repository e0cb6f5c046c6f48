//! IFJcode17 three-address assembly.
//!
//! Operand types are not known at compile time, so every arithmetic or comparison instruction is
//! preceded by a type guard that jumps to `TYPE_MISMATCH` when the operands' runtime types
//! differ. Compound sub-expressions travel over the evaluation stack (`PUSHS` / `POPS`); the
//! `GF@$...` scratch variables only live between two consecutive instructions.

use crate::{describe, is_assignment, GenError};
use quill_parser::ast::{param_names, Args, Binding, Block, Function, If, Node, NodeKind};
use quill_parser::lexer::TokenKind;
use quill_parser::visitor::{walk_node, Visitor};
use quill_value::builtins;
use quill_value::Value;
use std::collections::HashMap;
use std::fmt::Write;

type Result<T> = std::result::Result<T, GenError>;

const LHS: &str = "GF@$lhs";
const RHS: &str = "GF@$rhs";
const LTYPE: &str = "GF@$ltype";
const RTYPE: &str = "GF@$rtype";
const RESULT: &str = "GF@$result";

/// Receives generated lines.
pub trait Sink {
    /// Called once per line. `line` carries no trailing newline.
    fn emit(&mut self, line: &str);
}

impl Sink for String {
    fn emit(&mut self, line: &str) {
        self.push_str(line);
        self.push('\n');
    }
}

impl Sink for Vec<String> {
    fn emit(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn emit(&mut self, line: &str) {
        (**self).emit(line);
    }
}

/// A parameter as seen by a call site.
#[derive(Debug, Clone)]
struct Param {
    name: String,
    default: Option<Node>,
}

fn params(bindings: &[Binding]) -> Vec<Param> {
    param_names(bindings)
        .into_iter()
        .map(|(name, _, default)| Param {
            name: name.to_string(),
            default: default.cloned(),
        })
        .collect()
}

/// Hands out the storage name of the next declaration of `name` in a frame. The first
/// declaration keeps the source name; a shadowing one gets a `$n` suffix, which no source
/// identifier can carry.
fn next_slot(counts: &mut HashMap<String, usize>, name: &str) -> String {
    let count = counts.entry(name.to_string()).or_insert(0);
    let slot = match *count {
        0 => name.to_string(),
        n => format!("{}${}", name, n),
    };
    *count += 1;
    slot
}

/// Storage names of the `dim`s in a body, in declaration order. Nested function bodies have
/// their own frame and are skipped.
#[derive(Default)]
struct Locals {
    counts: HashMap<String, usize>,
    slots: Vec<String>,
}

impl<'ast> Visitor<'ast> for Locals {
    fn visit_node(&mut self, node: &'ast Node) {
        match &node.kind {
            NodeKind::Dim(bindings) => {
                for binding in bindings {
                    for name in &binding.decl.names {
                        let slot = next_slot(&mut self.counts, name);
                        self.slots.push(slot);
                    }
                    if let Some(init) = &binding.init {
                        self.visit_node(init);
                    }
                }
            }
            NodeKind::Function(_) => {}
            _ => walk_node(self, node),
        }
    }
}

/// Generator state for one compilation.
pub struct AsmGen<S: Sink> {
    sink: S,
    if_counter: usize,
    end_if_counter: usize,
    else_counter: usize,
    /// Number of the innermost loop being generated.
    loop_current: usize,
    /// Highest loop number handed out so far.
    loop_high_water: usize,
    /// Variables live in `TF` inside a function body and in `GF` outside.
    in_function: bool,
    /// Set while rendering a call target, which is a label rather than a variable.
    in_call: bool,
    /// Set while declaring parameters, which are popped off the evaluation stack.
    in_params: bool,
    /// Numbers the `CONT_n` labels of int to float conversions.
    float_cont: usize,
    /// Signatures of the functions defined or declared so far.
    functions: HashMap<String, Vec<Param>>,
    /// Return type of the function being generated.
    ret_ty: Option<String>,
    /// Declarations visible in each open block of the current frame, as
    /// `(source name, storage name)`, innermost last.
    scopes: Vec<Vec<(String, String)>>,
    /// Declarations per name seen so far in the current frame.
    slots: HashMap<String, usize>,
    line: usize,
}

impl<S: Sink> AsmGen<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            if_counter: 0,
            end_if_counter: 0,
            else_counter: 0,
            loop_current: 0,
            loop_high_water: 0,
            in_function: false,
            in_call: false,
            in_params: false,
            float_cont: 0,
            functions: HashMap::new(),
            ret_ty: None,
            scopes: vec![Vec::new()],
            slots: HashMap::new(),
            line: 1,
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn emit(&mut self, line: impl AsRef<str>) {
        self.sink.emit(line.as_ref());
    }

    /// Generates a whole program: prologue, global variables, statements and epilogue.
    pub fn generate_program(&mut self, program: &Block) -> Result<()> {
        self.emit(".IFJcode17");
        for scratch in &[LHS, RHS, LTYPE, RTYPE, RESULT] {
            self.emit(format!("DEFVAR {}", scratch));
        }
        self.define_locals(program, &[]);

        self.block(program)?;

        self.emit("JUMP END_PROGRAM");
        self.emit("LABEL TYPE_MISMATCH");
        self.emit("EXIT int@53");
        self.emit("LABEL END_PROGRAM");
        Ok(())
    }

    /// Renders the innermost visible variable called `name`.
    fn var(&self, name: &str) -> String {
        if self.in_call {
            return name.to_string();
        }
        let slot = self
            .scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(source, _)| source == name)
            .map_or(name, |(_, slot)| slot.as_str());
        self.frame_var(slot)
    }

    /// Renders a storage name in the current frame.
    fn frame_var(&self, slot: &str) -> String {
        if self.in_function {
            format!("TF@{}", slot)
        } else {
            format!("GF@{}", slot)
        }
    }

    /// Makes `name` refer to `slot` from here to the end of the block.
    fn bind(&mut self, name: &str, slot: String) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((name.to_string(), slot));
        }
    }

    fn declare_var(&mut self, slot: &str) {
        let var = self.frame_var(slot);
        self.emit(format!("DEFVAR {}", var));
        if self.in_params {
            self.emit(format!("POPS {}", var));
        }
    }

    /// Every `dim` of a body is defined up front, so that a `dim` inside a loop does not
    /// redefine its variable on every iteration. `params` are already defined.
    fn define_locals(&mut self, body: &Block, params: &[&str]) {
        let mut locals = Locals::default();
        for param in params {
            next_slot(&mut locals.counts, param);
        }
        locals.visit_block(body);
        for slot in &locals.slots {
            self.declare_var(slot);
        }
    }

    /// Literals and variables render directly. `None` for anything that must be evaluated.
    fn simple(&self, node: &Node) -> Option<String> {
        match &node.kind {
            NodeKind::Int(val) => Some(constant(&Value::Int(*val))),
            NodeKind::Double(val) => Some(constant(&Value::Double(*val))),
            NodeKind::Str(val) => Some(format!("string@{}", escape(val))),
            NodeKind::Id(name) => Some(self.var(name)),
            _ => None,
        }
    }

    /// Renders `node` as an operand, evaluating it into `GF@$result` if needed.
    fn value(&mut self, node: &Node) -> Result<String> {
        match self.simple(node) {
            Some(operand) => Ok(operand),
            None => {
                self.expr_into(node, RESULT)?;
                Ok(RESULT.to_string())
            }
        }
    }

    /// Pushes the value of `node` onto the evaluation stack.
    fn push(&mut self, node: &Node) -> Result<()> {
        if let Some(operand) = self.simple(node) {
            self.emit(format!("PUSHS {}", operand));
            return Ok(());
        }
        match &node.kind {
            NodeKind::Call { callee, args } if self.builtin(callee).is_none() => {
                self.call(callee, args)
            }
            _ => {
                self.expr_into(node, RESULT)?;
                self.emit(format!("PUSHS {}", RESULT));
                Ok(())
            }
        }
    }

    /// Evaluates both operands of a binary operation. Compound operands are pushed in order and
    /// popped into the scratch variables afterwards, so neither can clobber the other.
    fn operands(&mut self, lhs: &Node, rhs: &Node) -> Result<(String, String)> {
        let l = self.simple(lhs);
        let r = self.simple(rhs);
        if l.is_none() {
            self.push(lhs)?;
        }
        if r.is_none() {
            self.push(rhs)?;
        }

        let r = match r {
            Some(r) => r,
            None => {
                self.emit(format!("POPS {}", RHS));
                RHS.to_string()
            }
        };
        let l = match l {
            Some(l) => l,
            None => {
                self.emit(format!("POPS {}", LHS));
                LHS.to_string()
            }
        };
        Ok((l, r))
    }

    fn type_guard(&mut self, l: &str, r: &str) {
        self.emit(format!("TYPE {} {}", LTYPE, l));
        self.emit(format!("TYPE {} {}", RTYPE, r));
        self.emit(format!("JUMPIFNEQ TYPE_MISMATCH {} {}", LTYPE, RTYPE));
    }

    /// Converts `var` to a float unless it already is one.
    fn int_to_float(&mut self, var: &str, ty: &str) {
        self.float_cont += 1;
        let cont = format!("CONT_{}", self.float_cont);
        self.emit(format!("TYPE {} {}", ty, var));
        self.emit(format!("JUMPIFEQ {} {} string@float", cont, ty));
        self.emit(format!("INT2FLOAT {} {}", var, var));
        self.emit(format!("LABEL {}", cont));
    }

    fn block(&mut self, block: &Block) -> Result<()> {
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    /// Generates `block` with its own declarations.
    fn scoped_block(&mut self, block: &Block) -> Result<()> {
        self.scopes.push(Vec::new());
        let result = self.block(block);
        self.scopes.pop();
        result
    }

    fn stmt(&mut self, node: &Node) -> Result<()> {
        self.line = node.line;
        match &node.kind {
            NodeKind::Dim(bindings) => {
                for binding in bindings {
                    for name in &binding.decl.names {
                        let slot = next_slot(&mut self.slots, name);
                        let var = self.frame_var(&slot);
                        match &binding.init {
                            Some(init) => self.expr_into(init, &var)?,
                            None => {
                                let default =
                                    constant(&Value::default_for(binding.decl.ty.as_deref()));
                                self.emit(format!("MOVE {} {}", var, default));
                            }
                        }
                        // bound after the initializer, which still sees a shadowed variable
                        self.bind(name, slot);
                    }
                }
            }
            NodeKind::Scope(body) => self.scoped_block(body)?,
            NodeKind::If(stmt) => self.if_stmt(stmt)?,
            NodeKind::While { cond, body } => self.while_stmt(cond, body)?,
            NodeKind::Return(expr) => self.return_stmt(expr.as_deref())?,
            NodeKind::Function(function) => self.function(function, node.line)?,
            NodeKind::Declare(declare) => {
                self.functions
                    .insert(declare.name.clone(), params(&declare.params));
            }
            NodeKind::Type { .. } => {}
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
            NodeKind::Call { callee, args } => match self.builtin(callee) {
                Some(builtin) => self.builtin_call(builtin, args, None)?,
                None => {
                    self.call(callee, args)?;
                    // discard the result
                    self.emit(format!("POPS {}", RESULT));
                }
            },
            _ => self.expr_into(node, RESULT)?,
        }
        Ok(())
    }

    fn if_stmt(&mut self, stmt: &If) -> Result<()> {
        self.end_if_counter += 1;
        let end_label = format!("END_IF_{}", self.end_if_counter);

        let branches: Vec<(&Node, &Block)> = std::iter::once((&*stmt.cond, &stmt.block))
            .chain(
                stmt.else_ifs
                    .iter()
                    .map(|else_if| (&*else_if.cond, &else_if.block)),
            )
            .collect();

        let mut labels = Vec::with_capacity(branches.len());
        for (cond, _) in &branches {
            self.if_counter += 1;
            let label = format!("RES_IF_{}", self.if_counter);
            self.branch_if_true(cond, &label)?;
            labels.push(label);
        }

        let else_label = match stmt.else_block {
            Some(_) => {
                self.else_counter += 1;
                Some(format!("RES_ELSE_{}", self.else_counter))
            }
            None => None,
        };
        self.emit(format!(
            "JUMP {}",
            else_label.as_deref().unwrap_or(&end_label)
        ));

        for ((_, block), label) in branches.iter().zip(&labels) {
            self.emit(format!("LABEL {}", label));
            self.scoped_block(block)?;
            self.emit(format!("JUMP {}", end_label));
        }

        if let (Some(label), Some(else_block)) = (&else_label, &stmt.else_block) {
            self.emit(format!("LABEL {}", label));
            self.scoped_block(else_block)?;
        }

        self.emit(format!("LABEL {}", end_label));
        Ok(())
    }

    /// Runs the body, then jumps back to its label while `cond` holds.
    fn while_stmt(&mut self, cond: &Node, body: &Block) -> Result<()> {
        self.loop_high_water += 1;
        let outer = std::mem::replace(&mut self.loop_current, self.loop_high_water);
        let label = format!("LOOP_{}", self.loop_current);

        self.emit(format!("LABEL {}", label));
        self.scoped_block(body)?;
        self.branch_if_true(cond, &label)?;

        self.loop_current = outer;
        Ok(())
    }

    /// Jumps to `label` when `cond` holds and falls through otherwise.
    fn branch_if_true(&mut self, cond: &Node, label: &str) -> Result<()> {
        self.line = cond.line;
        match &cond.kind {
            NodeKind::BinaryOp { op, lhs, rhs }
                if matches!(op, TokenKind::EqEq | TokenKind::NotEq) =>
            {
                let (l, r) = self.operands(lhs, rhs)?;
                self.type_guard(&l, &r);
                let jump = if *op == TokenKind::EqEq {
                    "JUMPIFEQ"
                } else {
                    "JUMPIFNEQ"
                };
                self.emit(format!("{} {} {} {}", jump, label, l, r));
            }
            _ => {
                self.expr_into(cond, RESULT)?;
                self.emit(format!("JUMPIFEQ {} {} bool@true", label, RESULT));
            }
        }
        Ok(())
    }

    fn return_stmt(&mut self, expr: Option<&Node>) -> Result<()> {
        if self.in_function {
            match expr {
                Some(expr) => self.push(expr)?,
                None => {
                    let default = constant(&Value::default_for(self.ret_ty.as_deref()));
                    self.emit(format!("PUSHS {}", default));
                }
            }
            self.emit("RETURN");
        } else {
            if let Some(expr) = expr {
                self.expr_into(expr, RESULT)?;
            }
            self.emit("JUMP END_PROGRAM");
        }
        Ok(())
    }

    fn function(&mut self, function: &Function, line: usize) -> Result<()> {
        if self.in_function {
            return Err(GenError::unsupported("nested function", line));
        }
        // registered before the body so that it can call itself
        self.functions
            .insert(function.name.clone(), params(&function.params));

        let end_label = format!("FUNCTION_END_{}", function.name);
        self.emit(format!("JUMP {}", end_label));
        self.emit(format!("LABEL {}", function.name));
        self.emit("CREATEFRAME");

        self.in_function = true;
        self.ret_ty = function.ret_ty.clone();
        // a function body sees its parameters and locals only
        let globals = std::mem::replace(&mut self.scopes, vec![Vec::new()]);
        let global_slots = std::mem::take(&mut self.slots);

        // the caller pushed the arguments in order, so they are popped in reverse
        let names: Vec<&str> = param_names(&function.params)
            .into_iter()
            .map(|(name, _, _)| name)
            .collect();
        self.in_params = true;
        for name in names.iter().rev() {
            self.declare_var(name);
        }
        self.in_params = false;
        for name in &names {
            let slot = next_slot(&mut self.slots, name);
            self.bind(name, slot);
        }
        self.define_locals(&function.body, &names);

        let result = self.block(&function.body);
        self.scopes = globals;
        self.slots = global_slots;
        self.in_function = false;
        self.ret_ty = None;
        result?;

        let default = constant(&Value::default_for(function.ret_ty.as_deref()));
        self.emit(format!("PUSHS {}", default));
        self.emit("RETURN");
        self.emit(format!("LABEL {}", end_label));
        Ok(())
    }

    /// Returns the builtin called by `callee`, unless a user function shadows it.
    fn builtin(&self, callee: &Node) -> Option<&'static str> {
        let name = callee.as_id()?;
        if self.functions.contains_key(name) {
            return None;
        }
        builtins::lookup(name).map(|builtin| builtin.name)
    }

    /// Orders the arguments of a call by parameter: positional, then keyword, then the
    /// parameter's default.
    fn arguments(&self, function: &str, args: &Args) -> Result<Vec<Node>> {
        let params = match self.functions.get(function) {
            Some(params) => params,
            None => {
                if let Some((keyword, _)) = args.keyword.first() {
                    return Err(GenError::UnknownKeyword {
                        function: function.to_string(),
                        keyword: keyword.clone(),
                        line: args.line,
                    });
                }
                return Ok(args.positional.clone());
            }
        };

        if args.positional.len() > params.len() {
            return Err(GenError::unsupported(
                format!("extra arguments in call to `{}`", function),
                args.line,
            ));
        }
        if let Some((keyword, _)) = args
            .keyword
            .iter()
            .find(|(keyword, _)| !params.iter().any(|param| &param.name == keyword))
        {
            return Err(GenError::UnknownKeyword {
                function: function.to_string(),
                keyword: keyword.clone(),
                line: args.line,
            });
        }

        params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                args.positional
                    .get(index)
                    .or_else(|| args.get_keyword(&param.name))
                    .or_else(|| param.default.as_ref())
                    .cloned()
                    .ok_or_else(|| GenError::MissingArgument {
                        function: function.to_string(),
                        param: param.name.clone(),
                        line: args.line,
                    })
            })
            .collect()
    }

    /// Calls a user function. The result is left on the evaluation stack.
    fn call(&mut self, callee: &Node, args: &Args) -> Result<()> {
        let name = callee
            .as_id()
            .ok_or_else(|| GenError::unsupported("call of a computed function", callee.line))?;

        for arg in self.arguments(name, args)? {
            self.push(&arg)?;
        }

        // inside a function `TF` holds the caller's locals and must survive the call
        if !self.in_function {
            self.emit("CREATEFRAME");
        }
        self.emit("PUSHFRAME");
        self.in_call = true;
        let target = self.var(name);
        self.in_call = false;
        self.emit(format!("CALL {}", target));
        self.emit("POPFRAME");
        Ok(())
    }

    fn builtin_call(
        &mut self,
        name: &'static str,
        args: &Args,
        target: Option<&str>,
    ) -> Result<()> {
        if let Some((keyword, _)) = args.keyword.first() {
            return Err(GenError::UnknownKeyword {
                function: name.to_string(),
                keyword: keyword.clone(),
                line: args.line,
            });
        }
        let accepted = builtins::lookup(name)
            .map_or(false, |builtin| builtin.arity.accepts(args.positional.len()));
        if !accepted {
            return Err(GenError::unsupported(
                format!("`{}` with {} argument(s)", name, args.positional.len()),
                args.line,
            ));
        }

        match (name, args.positional.as_slice()) {
            ("print", values) => {
                if target.is_some() {
                    return Err(GenError::unsupported("`print` in an expression", args.line));
                }
                for value in values {
                    let operand = self.value(value)?;
                    self.emit(format!("WRITE {}", operand));
                }
            }
            ("length", [value]) | ("chr", [value]) => {
                let operand = self.value(value)?;
                let instr = if name == "length" { "STRLEN" } else { "INT2CHAR" };
                self.emit(format!("{} {} {}", instr, target.unwrap_or(RESULT), operand));
            }
            ("asc", [string, index]) => {
                let (l, r) = self.operands(string, index)?;
                self.emit(format!("STRI2INT {} {} {}", target.unwrap_or(RESULT), l, r));
            }
            _ => {
                return Err(GenError::unsupported(
                    format!("builtin `{}`", name),
                    args.line,
                ))
            }
        }
        Ok(())
    }

    fn expr_into(&mut self, node: &Node, target: &str) -> Result<()> {
        self.line = node.line;
        if let Some(operand) = self.simple(node) {
            self.emit(format!("MOVE {} {}", target, operand));
            return Ok(());
        }

        match &node.kind {
            NodeKind::BinaryOp { op, lhs, rhs } => self.binary(*op, lhs, rhs, target),
            NodeKind::UnaryOp {
                op,
                operand,
                postfix,
            } => self.unary(*op, operand, *postfix, target),
            NodeKind::Call { callee, args } => match self.builtin(callee) {
                Some(builtin) => self.builtin_call(builtin, args, Some(target)),
                None => {
                    self.call(callee, args)?;
                    self.emit(format!("POPS {}", target));
                    Ok(())
                }
            },
            kind => Err(GenError::unsupported(describe(kind), node.line)),
        }
    }

    fn binary(&mut self, op: TokenKind, lhs: &Node, rhs: &Node, target: &str) -> Result<()> {
        if is_assignment(op) {
            let var = self.assign(op, lhs, rhs)?;
            if var != target {
                self.emit(format!("MOVE {} {}", target, var));
            }
            return Ok(());
        }
        if op == TokenKind::Slash {
            return self.divide(lhs, rhs, target);
        }

        let concat = is_string(lhs) || is_string(rhs);
        let (instr, negate) = match op {
            TokenKind::Plus if concat => ("CONCAT", false),
            TokenKind::Plus => ("ADD", false),
            TokenKind::Minus => ("SUB", false),
            TokenKind::Star => ("MUL", false),
            TokenKind::Lt => ("LT", false),
            TokenKind::Gt => ("GT", false),
            TokenKind::EqEq => ("EQ", false),
            TokenKind::NotEq => ("EQ", true),
            TokenKind::LtEq => ("GT", true),
            TokenKind::GtEq => ("LT", true),
            TokenKind::And => ("AND", false),
            TokenKind::Or => ("OR", false),
            op => {
                return Err(GenError::unsupported(
                    format!("operator `{}`", op),
                    self.line,
                ))
            }
        };

        let (l, r) = self.operands(lhs, rhs)?;
        self.type_guard(&l, &r);
        self.emit(format!("{} {} {} {}", instr, target, l, r));
        if negate {
            self.emit(format!("NOT {} {}", target, target));
        }
        Ok(())
    }

    /// Division always produces a float. Integer operands are converted after the type guard.
    fn divide(&mut self, lhs: &Node, rhs: &Node, target: &str) -> Result<()> {
        let (l, r) = self.operands(lhs, rhs)?;
        self.type_guard(&l, &r);
        if l != LHS {
            self.emit(format!("MOVE {} {}", LHS, l));
        }
        if r != RHS {
            self.emit(format!("MOVE {} {}", RHS, r));
        }
        self.int_to_float(LHS, LTYPE);
        self.int_to_float(RHS, RTYPE);
        self.emit(format!("DIV {} {} {}", target, LHS, RHS));
        Ok(())
    }

    fn unary(&mut self, op: TokenKind, operand: &Node, postfix: bool, target: &str) -> Result<()> {
        match (op, &operand.kind) {
            (TokenKind::Minus, NodeKind::Int(val)) => {
                self.emit(format!("MOVE {} {}", target, constant(&Value::Int(-val))));
            }
            (TokenKind::Minus, NodeKind::Double(val)) => {
                self.emit(format!("MOVE {} {}", target, constant(&Value::Double(-val))));
            }
            (TokenKind::Minus, _) => {
                // 0 - x, with a zero of the operand's type
                let value = self.value(operand)?;
                if value != RHS {
                    self.emit(format!("MOVE {} {}", RHS, value));
                }
                self.float_cont += 1;
                let cont = format!("CONT_{}", self.float_cont);
                self.emit(format!("MOVE {} int@0", LHS));
                self.emit(format!("TYPE {} {}", RTYPE, RHS));
                self.emit(format!("JUMPIFNEQ {} {} string@float", cont, RTYPE));
                self.emit(format!("MOVE {} {}", LHS, constant(&Value::Double(0.0))));
                self.emit(format!("LABEL {}", cont));
                self.emit(format!("SUB {} {} {}", target, LHS, RHS));
            }
            (TokenKind::Bang, _) | (TokenKind::Not, _) => {
                let value = self.value(operand)?;
                self.emit(format!("NOT {} {}", target, value));
            }
            (TokenKind::Incr, _) | (TokenKind::Decr, _) => {
                self.step(op, operand, postfix, Some(target))?;
            }
            (op, _) => {
                return Err(GenError::unsupported(
                    format!("operator `{}`", op),
                    operand.line,
                ))
            }
        }
        Ok(())
    }

    /// Lowers `=` and the compound assignments. Returns the assigned variable.
    fn assign(&mut self, op: TokenKind, lhs: &Node, rhs: &Node) -> Result<String> {
        let name = lhs
            .as_id()
            .ok_or(GenError::InvalidAssignTarget { line: lhs.line })?;
        let var = self.var(name);

        let base = match op {
            TokenKind::Assign => {
                self.expr_into(rhs, &var)?;
                return Ok(var);
            }
            TokenKind::PlusAssign => TokenKind::Plus,
            TokenKind::MinusAssign => TokenKind::Minus,
            TokenKind::StarAssign => TokenKind::Star,
            TokenKind::SlashAssign => TokenKind::Slash,
            TokenKind::AndAssign => TokenKind::And,
            _ => TokenKind::Or,
        };
        self.binary(base, lhs, rhs, &var)?;
        Ok(var)
    }

    /// `++` and `--`. A postfix step leaves the old value in `target`.
    fn step(
        &mut self,
        op: TokenKind,
        operand: &Node,
        postfix: bool,
        target: Option<&str>,
    ) -> Result<()> {
        let name = operand
            .as_id()
            .ok_or(GenError::InvalidAssignTarget { line: operand.line })?;
        let var = self.var(name);
        let instr = if op == TokenKind::Incr { "ADD" } else { "SUB" };

        if let (Some(target), true) = (target, postfix) {
            self.emit(format!("MOVE {} {}", target, var));
        }
        self.emit(format!("{} {} {} int@1", instr, var, var));
        if let (Some(target), false) = (target, postfix) {
            self.emit(format!("MOVE {} {}", target, var));
        }
        Ok(())
    }
}

fn is_string(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Str(_))
}

/// Renders a constant operand.
fn constant(value: &Value) -> String {
    match value {
        Value::Int(val) => format!("int@{}", val),
        Value::Double(val) => format!("float@{:?}", val),
        Value::Bool(val) => format!("bool@{}", val),
        Value::Str(val) => format!("string@{}", escape(val)),
    }
}

/// Whitespace, control characters, `#` and `\` are written as a `\` followed by their three
/// digit decimal code.
fn escape(string: &str) -> String {
    let mut escaped = String::with_capacity(string.len());
    for ch in string.chars() {
        if ch as u32 <= 32 || ch == '#' || ch == '\\' {
            // writing into a String cannot fail
            let _ = write!(escaped, "\\{:03}", ch as u32);
        } else {
            escaped.push(ch);
        }
    }
    escaped
}
