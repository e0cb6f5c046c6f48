//! S-expression rendering of the AST.
//!
//! The output is deterministic and ignores line numbers, so two trees that only differ in
//! their source positions render identically.

use crate::ast::{Args, Binding, Block, Decl, Node, NodeKind};
use crate::visitor::Visitor;
use std::fmt::Write;

#[derive(Default)]
pub struct PrettyPrinter {
    out: String,
    depth: usize,
}

impl PrettyPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the printer and returns the rendered text.
    pub fn finish(self) -> String {
        self.out
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    /// Renders `block` one level deeper than the current node.
    fn nested(&mut self, block: &Block) {
        self.depth += 1;
        self.visit_block(block);
        self.depth -= 1;
    }

    fn params(&mut self, params: &[Binding]) {
        self.out.push('(');
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            self.visit_binding(param);
        }
        self.out.push(')');
    }

    fn ret_ty(&mut self, ty: &Option<String>) {
        if let Some(ty) = ty {
            self.out.push_str(" as ");
            self.out.push_str(ty);
        }
    }

    fn names(&mut self, decl: &Decl) {
        self.out.push_str(&decl.names.join(" "));
        self.ret_ty(&decl.ty);
    }
}

impl<'ast> Visitor<'ast> for PrettyPrinter {
    fn visit_block(&mut self, block: &'ast Block) {
        for stmt in &block.stmts {
            self.newline();
            self.visit_node(stmt);
        }
    }

    fn visit_binding(&mut self, binding: &'ast Binding) {
        self.out.push('(');
        self.names(&binding.decl);
        if let Some(init) = &binding.init {
            self.out.push_str(" = ");
            self.visit_node(init);
        }
        self.out.push(')');
    }

    fn visit_decl(&mut self, decl: &'ast Decl) {
        self.out.push('(');
        self.names(decl);
        self.out.push(')');
    }

    fn visit_args(&mut self, args: &'ast Args) {
        for arg in &args.positional {
            self.out.push(' ');
            self.visit_node(arg);
        }
        for (key, arg) in &args.keyword {
            let _ = write!(self.out, " ({} as ", key);
            self.visit_node(arg);
            self.out.push(')');
        }
    }

    fn visit_node(&mut self, node: &'ast Node) {
        match &node.kind {
            NodeKind::Id(name) => self.out.push_str(name),
            NodeKind::Int(val) => {
                let _ = write!(self.out, "{}", val);
            }
            NodeKind::Double(val) => {
                let _ = write!(self.out, "{:?}", val);
            }
            NodeKind::Str(val) => {
                let _ = write!(self.out, "{:?}", val);
            }
            NodeKind::UnaryOp {
                op,
                operand,
                postfix: true,
            } => {
                self.out.push('(');
                self.visit_node(operand);
                let _ = write!(self.out, " {})", op);
            }
            NodeKind::UnaryOp { op, operand, .. } => {
                let _ = write!(self.out, "({} ", op);
                self.visit_node(operand);
                self.out.push(')');
            }
            NodeKind::BinaryOp { op, lhs, rhs } => {
                let _ = write!(self.out, "({} ", op);
                self.visit_node(lhs);
                self.out.push(' ');
                self.visit_node(rhs);
                self.out.push(')');
            }
            NodeKind::Dim(bindings) => {
                self.out.push_str("(dim");
                for binding in bindings {
                    self.out.push(' ');
                    self.visit_binding(binding);
                }
                self.out.push(')');
            }
            NodeKind::Call { callee, args } => {
                self.out.push_str("(call ");
                self.visit_node(callee);
                self.visit_args(args);
                self.out.push(')');
            }
            NodeKind::Subscript { base, index } => {
                self.out.push_str("(index ");
                self.visit_node(base);
                self.out.push(' ');
                self.visit_node(index);
                self.out.push(')');
            }
            NodeKind::Slot { base, member } => {
                self.out.push_str("(slot ");
                self.visit_node(base);
                let _ = write!(self.out, " {})", member);
            }
            NodeKind::Array(elements) => {
                self.out.push_str("(array");
                for element in elements {
                    self.out.push(' ');
                    self.visit_node(element);
                }
                self.out.push(')');
            }
            NodeKind::Hash(pairs) => {
                self.out.push_str("(hash");
                for (key, value) in pairs {
                    self.out.push_str(" (");
                    self.visit_node(key);
                    self.out.push(' ');
                    self.visit_node(value);
                    self.out.push(')');
                }
                self.out.push(')');
            }
            NodeKind::Function(function) => {
                let _ = write!(self.out, "(function {} ", function.name);
                self.params(&function.params);
                self.ret_ty(&function.ret_ty);
                self.nested(&function.body);
                self.out.push(')');
            }
            NodeKind::Declare(declare) => {
                let _ = write!(self.out, "(declare {} ", declare.name);
                self.params(&declare.params);
                self.ret_ty(&declare.ret_ty);
                self.out.push(')');
            }
            NodeKind::Scope(body) => {
                self.out.push_str("(scope");
                self.nested(body);
                self.out.push(')');
            }
            NodeKind::Type { name, fields } => {
                let _ = write!(self.out, "(type {}", name);
                for field in fields {
                    self.out.push(' ');
                    self.visit_decl(field);
                }
                self.out.push(')');
            }
            NodeKind::If(stmt) => {
                self.out.push_str("(if ");
                self.visit_node(&stmt.cond);
                self.nested(&stmt.block);

                self.depth += 1;
                for else_if in &stmt.else_ifs {
                    self.newline();
                    self.out.push_str("(elseif ");
                    self.visit_node(&else_if.cond);
                    self.nested(&else_if.block);
                    self.out.push(')');
                }
                if let Some(else_block) = &stmt.else_block {
                    self.newline();
                    self.out.push_str("(else");
                    self.nested(else_block);
                    self.out.push(')');
                }
                self.depth -= 1;

                self.out.push(')');
            }
            NodeKind::While { cond, body } => {
                self.out.push_str("(while ");
                self.visit_node(cond);
                self.nested(body);
                self.out.push(')');
            }
            NodeKind::Return(None) => self.out.push_str("(return)"),
            NodeKind::Return(Some(expr)) => {
                self.out.push_str("(return ");
                self.visit_node(expr);
                self.out.push(')');
            }
        }
    }
}

/// Renders a program, one top level statement per line.
pub fn pretty_print(program: &Block) -> String {
    let mut printer = PrettyPrinter::new();
    for (i, stmt) in program.stmts.iter().enumerate() {
        if i > 0 {
            printer.out.push('\n');
        }
        printer.visit_node(stmt);
    }
    printer.finish()
}
