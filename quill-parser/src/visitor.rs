//! Visitor pattern for AST nodes.
//!
//! Every method has a default implementation that walks the children, so a consumer only
//! overrides the node kinds it cares about.

use crate::ast::{Args, Binding, Block, Decl, Node, NodeKind};

pub trait Visitor<'ast>: Sized {
    fn visit_node(&mut self, node: &'ast Node) {
        walk_node(self, node);
    }
    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block);
    }
    fn visit_binding(&mut self, binding: &'ast Binding) {
        walk_binding(self, binding);
    }
    fn visit_decl(&mut self, _decl: &'ast Decl) {}
    fn visit_args(&mut self, args: &'ast Args) {
        walk_args(self, args);
    }
}

pub fn walk_block<'ast>(visitor: &mut impl Visitor<'ast>, block: &'ast Block) {
    for stmt in &block.stmts {
        visitor.visit_node(stmt);
    }
}

pub fn walk_binding<'ast>(visitor: &mut impl Visitor<'ast>, binding: &'ast Binding) {
    visitor.visit_decl(&binding.decl);
    if let Some(init) = &binding.init {
        visitor.visit_node(init);
    }
}

/// Positional arguments are visited before keyword arguments.
pub fn walk_args<'ast>(visitor: &mut impl Visitor<'ast>, args: &'ast Args) {
    for arg in &args.positional {
        visitor.visit_node(arg);
    }
    for (_, arg) in &args.keyword {
        visitor.visit_node(arg);
    }
}

pub fn walk_node<'ast>(visitor: &mut impl Visitor<'ast>, node: &'ast Node) {
    match &node.kind {
        NodeKind::Id(_) | NodeKind::Int(_) | NodeKind::Double(_) | NodeKind::Str(_) => {}
        NodeKind::UnaryOp { operand, .. } => visitor.visit_node(operand),
        NodeKind::BinaryOp { lhs, rhs, .. } => {
            visitor.visit_node(lhs);
            visitor.visit_node(rhs);
        }
        NodeKind::Dim(bindings) => {
            for binding in bindings {
                visitor.visit_binding(binding);
            }
        }
        NodeKind::Call { callee, args } => {
            visitor.visit_node(callee);
            visitor.visit_args(args);
        }
        NodeKind::Subscript { base, index } => {
            visitor.visit_node(base);
            visitor.visit_node(index);
        }
        NodeKind::Slot { base, .. } => visitor.visit_node(base),
        NodeKind::Array(elements) => {
            for element in elements {
                visitor.visit_node(element);
            }
        }
        NodeKind::Hash(pairs) => {
            for (key, value) in pairs {
                visitor.visit_node(key);
                visitor.visit_node(value);
            }
        }
        NodeKind::Function(function) => {
            for param in &function.params {
                visitor.visit_binding(param);
            }
            visitor.visit_block(&function.body);
        }
        NodeKind::Declare(declare) => {
            for param in &declare.params {
                visitor.visit_binding(param);
            }
        }
        NodeKind::Scope(body) => visitor.visit_block(body),
        NodeKind::Type { fields, .. } => {
            for field in fields {
                visitor.visit_decl(field);
            }
        }
        NodeKind::If(stmt) => {
            visitor.visit_node(&stmt.cond);
            visitor.visit_block(&stmt.block);
            for else_if in &stmt.else_ifs {
                visitor.visit_node(&else_if.cond);
                visitor.visit_block(&else_if.block);
            }
            if let Some(else_block) = &stmt.else_block {
                visitor.visit_block(else_block);
            }
        }
        NodeKind::While { cond, body } => {
            visitor.visit_node(cond);
            visitor.visit_block(body);
        }
        NodeKind::Return(expr) => {
            if let Some(expr) = expr {
                visitor.visit_node(expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use quill_source::Source;

    /// Records the names of every visited identifier.
    struct IdCollector<'ast> {
        ids: Vec<&'ast str>,
    }

    impl<'ast> Visitor<'ast> for IdCollector<'ast> {
        fn visit_node(&mut self, node: &'ast Node) {
            if let NodeKind::Id(name) = &node.kind {
                self.ids.push(name);
            }
            walk_node(self, node);
        }
    }

    fn ids(source: &str) -> Vec<String> {
        let source = Source::new(source);
        let ast = parse(&source).expect("program should parse");
        let mut collector = IdCollector { ids: Vec::new() };
        collector.visit_block(&ast);
        collector.ids.into_iter().map(String::from).collect()
    }

    #[test]
    fn test_traversal_order() {
        assert_eq!(ids("a + b * c"), vec!["a", "b", "c"]);
        assert_eq!(ids("f(a, b as c, d)"), vec!["f", "a", "d", "c"]);
        assert_eq!(
            ids("if a then b elseif c then d else e end"),
            vec!["a", "b", "c", "d", "e"]
        );
        assert_eq!(ids("x\ny\nz"), vec!["x", "y", "z"]);
    }
}
