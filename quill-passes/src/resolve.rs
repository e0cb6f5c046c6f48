//! Name resolution and semantic checks.
//!
//! The resolver walks the whole program and reports every semantic error it finds to
//! [`Source::errors`] instead of stopping at the first one.

use std::collections::HashSet;

use quill_parser::ast::{param_names, Args, Binding, Block, Decl, Node, NodeKind};
use quill_parser::lexer::TokenKind;
use quill_parser::visitor::{walk_node, Visitor};
use quill_source::{SemanticError, SemanticErrorKind, Source};
use quill_value::builtins::{self, Arity, Builtin};
use quill_value::Value;

/// Types every program knows about.
const PRIMITIVE_TYPES: &[&str] = &["integer", "double", "string", "boolean"];

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Option<String>,
    pub has_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<Param>,
    pub ret_ty: Option<String>,
}

impl Signature {
    pub fn new(params: &[Binding], ret_ty: &Option<String>) -> Self {
        Self {
            params: param_names(params)
                .into_iter()
                .map(|(name, ty, init)| Param {
                    name: name.to_string(),
                    ty: ty.map(String::from),
                    has_default: init.is_some(),
                })
                .collect(),
            ret_ty: ret_ty.clone(),
        }
    }

    /// Two signatures match if they have the same return type and parameter types.
    /// Parameter names may differ.
    pub fn matches(&self, other: &Signature) -> bool {
        self.ret_ty == other.ret_ty
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Variable { ty: Option<String> },
    Function { signature: Signature, defined: bool },
    Type,
}

/// Represents a symbol (created using `dim`, a parameter, `function`, `declare` or `type`).
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    ident: String,
    scope_depth: u32,
    pub kind: SymbolKind,
    /// Line of the declaration.
    pub line: usize,
}

/// Semantic analysis pass.
pub struct Resolver<'a> {
    /// A [`Vec`] of symbols that are currently in (lexical) scope.
    accessible_symbols: Vec<Symbol>,
    /// The current scope depth. `0` is global scope.
    current_scope_depth: u32,
    /// Index of the first symbol of the innermost function. Variables below it are not
    /// visible; functions and types are.
    current_func_offset: usize,
    source: &'a Source<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a Source<'a>) -> Self {
        Self {
            accessible_symbols: Vec::new(),
            current_scope_depth: 0,
            current_func_offset: 0,
            source,
        }
    }

    pub fn accessible_symbols(&self) -> &[Symbol] {
        &self.accessible_symbols
    }

    /// Resolves a whole program. Errors are added to the source's error reporter.
    pub fn resolve_program(&mut self, program: &Block) {
        self.visit_block(program);
        self.check_definitions(0);
    }

    fn enter_scope(&mut self) {
        self.current_scope_depth += 1;
    }

    fn exit_scope(&mut self) {
        self.check_definitions(self.current_scope_depth);
        self.current_scope_depth -= 1;

        // Remove all symbols in current scope.
        let depth = self.current_scope_depth;
        self.accessible_symbols
            .retain(|symbol| symbol.scope_depth <= depth);
    }

    fn scoped_block(&mut self, block: &Block) {
        self.enter_scope();
        self.visit_block(block);
        self.exit_scope();
    }

    /// Reports the functions declared at `depth` or deeper that never got a definition.
    fn check_definitions(&self, depth: u32) {
        for symbol in &self.accessible_symbols {
            if symbol.scope_depth < depth {
                continue;
            }
            if let SymbolKind::Function { defined: false, .. } = symbol.kind {
                self.error(
                    SemanticErrorKind::Semantic,
                    format!("function `{}` is declared but never defined", symbol.ident),
                    symbol.line,
                );
            }
        }
    }

    fn error(&self, kind: SemanticErrorKind, message: String, line: usize) {
        self.source
            .errors
            .add_error(SemanticError::new(kind, message, line));
    }

    fn add_symbol(&mut self, ident: &str, kind: SymbolKind, line: usize) {
        self.accessible_symbols.push(Symbol {
            ident: ident.to_string(),
            scope_depth: self.current_scope_depth,
            kind,
            line,
        });
    }

    /// Returns the innermost visible symbol named `ident`.
    fn lookup(&self, ident: &str) -> Option<(usize, &Symbol)> {
        self.accessible_symbols
            .iter()
            .enumerate()
            .rev()
            .filter(|(i, symbol)| {
                *i >= self.current_func_offset
                    || !matches!(symbol.kind, SymbolKind::Variable { .. })
            })
            .find(|(_, symbol)| symbol.ident == ident)
    }

    /// Returns `true` if `ident` is already declared in the current scope.
    fn declared_in_current_scope(&self, ident: &str) -> bool {
        self.accessible_symbols[self.current_func_offset..]
            .iter()
            .any(|symbol| symbol.scope_depth == self.current_scope_depth && symbol.ident == ident)
    }

    /// Declares a new name in the current scope, reporting redeclarations.
    fn declare(&mut self, ident: &str, kind: SymbolKind, line: usize) {
        if builtins::lookup(ident).is_some() {
            self.error(
                SemanticErrorKind::Semantic,
                format!("cannot redefine builtin `{}`", ident),
                line,
            );
        } else if self.declared_in_current_scope(ident) {
            self.error(
                SemanticErrorKind::Semantic,
                format!("`{}` is already declared in this scope", ident),
                line,
            );
        }
        self.add_symbol(ident, kind, line);
    }

    fn check_type(&self, ty: Option<&str>, line: usize) {
        if let Some(ty) = ty {
            let known = PRIMITIVE_TYPES.contains(&ty)
                || matches!(self.lookup(ty), Some((_, Symbol { kind: SymbolKind::Type, .. })));
            if !known {
                self.error(
                    SemanticErrorKind::Semantic,
                    format!("unknown type `{}`", ty),
                    line,
                );
            }
        }
    }

    fn resolve_variable(&self, ident: &str, line: usize) {
        match self.lookup(ident) {
            Some((_, Symbol { kind: SymbolKind::Variable { .. }, .. })) => {}
            Some(_) => self.error(
                SemanticErrorKind::Semantic,
                format!("`{}` is not a variable", ident),
                line,
            ),
            None if builtins::lookup(ident).is_some() => self.error(
                SemanticErrorKind::Semantic,
                format!("`{}` is not a variable", ident),
                line,
            ),
            None => self.error(
                SemanticErrorKind::UndeclaredVariable,
                format!("undeclared variable `{}`", ident),
                line,
            ),
        }
    }

    /// Statically known type of an operand: literals and variables declared with a
    /// primitive type.
    fn operand_type(&self, node: &Node) -> Option<&'static str> {
        if let Some(value) = literal(node) {
            return Some(value.type_name());
        }
        match &node.kind {
            NodeKind::Id(ident) => match self.lookup(ident) {
                Some((_, Symbol { kind: SymbolKind::Variable { ty: Some(ty) }, .. })) => {
                    PRIMITIVE_TYPES.iter().copied().find(|primitive| *primitive == ty.as_str())
                }
                _ => None,
            },
            NodeKind::Call { callee, .. } => callee
                .as_id()
                .and_then(|ident| builtins::lookup(ident))
                .and_then(|builtin| builtin.ret_ty),
            _ => None,
        }
    }

    fn declare_binding(&mut self, binding: &Binding) {
        if let Some(init) = &binding.init {
            self.visit_node(init);
            self.check_initializer(&binding.decl, init);
        }
        self.declare_decl(&binding.decl);
    }

    fn declare_decl(&mut self, decl: &Decl) {
        self.check_type(decl.ty.as_deref(), decl.line);
        for name in &decl.names {
            let kind = SymbolKind::Variable {
                ty: decl.ty.clone(),
            };
            self.declare(name, kind, decl.line);
        }
    }

    fn check_initializer(&self, decl: &Decl, init: &Node) {
        let declared = decl.ty.as_deref();
        let actual = self.operand_type(init);
        if let (Some(declared), Some(actual)) = (declared, actual) {
            if is_string(declared) != is_string(actual) && PRIMITIVE_TYPES.contains(&declared) {
                self.error(
                    SemanticErrorKind::OperandTypes,
                    format!("cannot initialize `{}` with a value of type `{}`", declared, actual),
                    init.line,
                );
            }
        }
    }

    fn check_unary(&self, op: TokenKind, operand: &Node, line: usize) {
        let arithmetic = matches!(
            op,
            TokenKind::Minus | TokenKind::Incr | TokenKind::Decr | TokenKind::Tilde
        );
        if arithmetic && self.operand_type(operand) == Some("string") {
            self.error(
                SemanticErrorKind::OperandTypes,
                format!("operator `{}` cannot be applied to a string", op),
                line,
            );
        }
    }

    fn check_binary(&self, op: TokenKind, lhs: &Node, rhs: &Node, line: usize) {
        let divides = matches!(
            op,
            TokenKind::Slash | TokenKind::Percent | TokenKind::SlashAssign
        );
        if divides && literal(rhs).map_or(false, |value| value.is_zero()) {
            self.error(
                SemanticErrorKind::DivisionByZero,
                "division by zero".to_string(),
                line,
            );
        }

        if matches!(
            op,
            TokenKind::And | TokenKind::Or | TokenKind::AndAssign | TokenKind::OrAssign
        ) {
            return;
        }

        let (l, r) = (self.operand_type(lhs), self.operand_type(rhs));
        let any_string = l == Some("string") || r == Some("string");

        let numeric_only = matches!(
            op,
            TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Pow
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::Shl
                | TokenKind::Shr
                | TokenKind::BitAnd
                | TokenKind::BitOr
                | TokenKind::BitXor
        );

        if any_string && numeric_only {
            self.error(
                SemanticErrorKind::OperandTypes,
                format!("operator `{}` cannot be applied to a string", op),
                line,
            );
        } else if let (Some(l), Some(r)) = (l, r) {
            if is_string(l) != is_string(r) {
                self.error(
                    SemanticErrorKind::OperandTypes,
                    format!("incompatible operand types `{}` and `{}` for `{}`", l, r, op),
                    line,
                );
            }
        }
    }

    fn check_call(&mut self, callee: &Node, args: &Args, line: usize) {
        let ident = match callee.as_id() {
            Some(ident) => ident,
            None => {
                self.visit_node(callee);
                return;
            }
        };

        let mut seen = HashSet::new();
        for (key, _) in &args.keyword {
            if !seen.insert(key.as_str()) {
                self.error(
                    SemanticErrorKind::Arguments,
                    format!("duplicate keyword argument `{}`", key),
                    line,
                );
            }
        }

        let signature = match self.lookup(ident) {
            Some((_, Symbol { kind: SymbolKind::Function { signature, .. }, .. })) => {
                signature.clone()
            }
            Some(_) => {
                return self.error(
                    SemanticErrorKind::Semantic,
                    format!("`{}` is not a function", ident),
                    line,
                )
            }
            None => match builtins::lookup(ident) {
                Some(builtin) => return self.check_builtin_call(builtin, args, line),
                None => {
                    return self.error(
                        SemanticErrorKind::UndeclaredVariable,
                        format!("undeclared function `{}`", ident),
                        line,
                    )
                }
            },
        };

        let positional = args.positional.len();
        if positional > signature.params.len() {
            return self.error(
                SemanticErrorKind::Arguments,
                format!(
                    "function `{}` expects at most {} argument(s), got {}",
                    ident,
                    signature.params.len(),
                    positional
                ),
                line,
            );
        }

        for (key, _) in &args.keyword {
            match signature.params.iter().position(|param| &param.name == key) {
                None => self.error(
                    SemanticErrorKind::Arguments,
                    format!("function `{}` has no parameter named `{}`", ident, key),
                    line,
                ),
                Some(index) if index < positional => self.error(
                    SemanticErrorKind::Arguments,
                    format!("parameter `{}` of `{}` is given more than once", key, ident),
                    line,
                ),
                Some(_) => {}
            }
        }

        for param in &signature.params[positional..] {
            if !param.has_default && args.get_keyword(&param.name).is_none() {
                self.error(
                    SemanticErrorKind::Arguments,
                    format!("missing argument `{}` in call to `{}`", param.name, ident),
                    line,
                );
            }
        }
    }

    fn check_builtin_call(&self, builtin: &Builtin, args: &Args, line: usize) {
        if !args.keyword.is_empty() {
            self.error(
                SemanticErrorKind::Arguments,
                format!("builtin `{}` does not take keyword arguments", builtin.name),
                line,
            );
        }
        if let Arity::Exact(arity) = builtin.arity {
            if !builtin.arity.accepts(args.positional.len()) {
                self.error(
                    SemanticErrorKind::Arguments,
                    format!(
                        "builtin `{}` expects {} argument(s), got {}",
                        builtin.name,
                        arity,
                        args.positional.len()
                    ),
                    line,
                );
            }
        }
    }

    fn resolve_function(&mut self, name: &str, signature: Signature, line: usize) {
        self.check_type(signature.ret_ty.as_deref(), line);

        // A definition may complete an earlier `declare` with the same signature.
        let existing = self
            .lookup(name)
            .filter(|(_, symbol)| symbol.scope_depth == self.current_scope_depth)
            .map(|(index, symbol)| (index, symbol.kind.clone()));

        match existing {
            Some((index, SymbolKind::Function { signature: declared, defined: false })) => {
                if !declared.matches(&signature) {
                    self.error(
                        SemanticErrorKind::Semantic,
                        format!("definition of `{}` does not match its declaration", name),
                        line,
                    );
                }
                self.accessible_symbols[index].kind = SymbolKind::Function {
                    signature,
                    defined: true,
                };
            }
            Some((_, SymbolKind::Function { defined: true, .. })) => {
                self.error(
                    SemanticErrorKind::Semantic,
                    format!("function `{}` is already defined", name),
                    line,
                );
            }
            // Add symbol first to allow for recursion.
            _ => self.declare(
                name,
                SymbolKind::Function {
                    signature,
                    defined: true,
                },
                line,
            ),
        }
    }

    fn resolve_params(&mut self, params: &[Binding]) {
        let mut seen = HashSet::new();
        for param in params {
            self.check_type(param.decl.ty.as_deref(), param.line);
            for name in &param.decl.names {
                if !seen.insert(name.as_str()) {
                    self.error(
                        SemanticErrorKind::Semantic,
                        format!("duplicate parameter `{}`", name),
                        param.line,
                    );
                }
            }
        }
    }
}

/// The constant a literal node denotes.
fn literal(node: &Node) -> Option<Value> {
    match &node.kind {
        NodeKind::Int(val) => Some(Value::Int(*val)),
        NodeKind::Double(val) => Some(Value::Double(*val)),
        NodeKind::Str(val) => Some(Value::Str(val.clone())),
        _ => None,
    }
}

fn is_string(ty: &str) -> bool {
    ty == "string"
}

impl<'a, 'ast> Visitor<'ast> for Resolver<'a> {
    fn visit_node(&mut self, node: &'ast Node) {
        match &node.kind {
            NodeKind::Id(ident) => self.resolve_variable(ident, node.line),
            NodeKind::UnaryOp { op, operand, .. } => {
                self.visit_node(operand);
                self.check_unary(*op, operand, node.line);
            }
            NodeKind::BinaryOp { op, lhs, rhs } => {
                self.visit_node(lhs);
                self.visit_node(rhs);
                self.check_binary(*op, lhs, rhs, node.line);
            }
            NodeKind::Dim(bindings) => {
                for binding in bindings {
                    self.declare_binding(binding);
                }
            }
            NodeKind::Call { callee, args } => {
                self.check_call(callee, args, node.line);
                self.visit_args(args);
            }
            NodeKind::Hash(pairs) => {
                for (key, value) in pairs {
                    // bare identifiers are field names
                    if key.as_id().is_none() {
                        self.visit_node(key);
                    }
                    self.visit_node(value);
                }
            }
            NodeKind::Function(function) => {
                for param in &function.params {
                    if let Some(init) = &param.init {
                        self.visit_node(init);
                    }
                }
                let signature = Signature::new(&function.params, &function.ret_ty);
                self.resolve_function(&function.name, signature, node.line);

                let old_func_offset = self.current_func_offset;
                self.current_func_offset = self.accessible_symbols.len();

                self.enter_scope();
                self.resolve_params(&function.params);
                for param in &function.params {
                    for name in &param.decl.names {
                        self.add_symbol(
                            name,
                            SymbolKind::Variable {
                                ty: param.decl.ty.clone(),
                            },
                            param.line,
                        );
                    }
                }
                self.visit_block(&function.body);
                self.exit_scope();

                self.current_func_offset = old_func_offset;
            }
            NodeKind::Declare(declare) => {
                self.check_type(declare.ret_ty.as_deref(), node.line);
                self.resolve_params(&declare.params);
                let existing = self
                    .lookup(&declare.name)
                    .map_or(false, |(_, symbol)| symbol.scope_depth == self.current_scope_depth);
                if existing {
                    self.error(
                        SemanticErrorKind::Semantic,
                        format!("function `{}` is already declared", declare.name),
                        node.line,
                    );
                } else {
                    let signature = Signature::new(&declare.params, &declare.ret_ty);
                    self.declare(
                        &declare.name,
                        SymbolKind::Function {
                            signature,
                            defined: false,
                        },
                        node.line,
                    );
                }
            }
            NodeKind::Scope(body) => self.scoped_block(body),
            NodeKind::Type { name, fields } => {
                self.declare(name, SymbolKind::Type, node.line);
                let mut seen = HashSet::new();
                for field in fields {
                    self.check_type(field.ty.as_deref(), field.line);
                    for field_name in &field.names {
                        if !seen.insert(field_name.as_str()) {
                            self.error(
                                SemanticErrorKind::Semantic,
                                format!("duplicate field `{}` in type `{}`", field_name, name),
                                field.line,
                            );
                        }
                    }
                }
            }
            NodeKind::If(stmt) => {
                self.visit_node(&stmt.cond);
                self.scoped_block(&stmt.block);
                for else_if in &stmt.else_ifs {
                    self.visit_node(&else_if.cond);
                    self.scoped_block(&else_if.block);
                }
                if let Some(else_block) = &stmt.else_block {
                    self.scoped_block(else_block);
                }
            }
            NodeKind::While { cond, body } => {
                self.visit_node(cond);
                self.scoped_block(body);
            }
            _ => walk_node(self, node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_parser::parser::parse;

    /// Returns `(kind, message)` for every semantic error in `source`.
    fn errors(source: &str) -> Vec<(SemanticErrorKind, String)> {
        let source = Source::new(source);
        let ast = parse(&source).expect("program should parse");
        Resolver::new(&source).resolve_program(&ast);
        source
            .errors
            .errors()
            .into_iter()
            .map(|err| (err.kind, err.message))
            .collect()
    }

    fn kinds(source: &str) -> Vec<SemanticErrorKind> {
        errors(source).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn test_valid_program() {
        assert_eq!(
            errors(
                "
                declare function square(n as integer) as integer
                type point
                    x, y as double
                end type
                dim p as point
                dim a as integer = 2, s as string = !\"x\"
                function square(n as integer) as integer
                    return n * n
                end function
                function greet(name as string, times = 1)
                    print(name, times)
                end function
                scope
                    dim a as double = 1.5
                    a = a / 2
                end scope
                greet(s)
                greet(s, times as 3)
                a = square(a) + length(s) + asc(s, 1)
                if a > 1 then
                    print(chr(a))
                end if
                "
            ),
            vec![]
        );
    }

    #[test]
    fn test_undeclared() {
        assert_eq!(
            errors("x = 1\nprint(y)\nfoo(1)"),
            vec![
                (
                    SemanticErrorKind::UndeclaredVariable,
                    "undeclared variable `x`".to_string()
                ),
                (
                    SemanticErrorKind::UndeclaredVariable,
                    "undeclared variable `y`".to_string()
                ),
                (
                    SemanticErrorKind::UndeclaredVariable,
                    "undeclared function `foo`".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_scopes() {
        // block locals end with their block
        assert_eq!(
            kinds("scope\ndim x as integer\nend\nx = 1"),
            vec![SemanticErrorKind::UndeclaredVariable]
        );
        // function bodies do not see global variables
        assert_eq!(
            kinds("dim g as integer\nfunction f() as integer\nreturn g\nend"),
            vec![SemanticErrorKind::UndeclaredVariable]
        );
        // but they can call themselves
        assert_eq!(
            kinds("function f(n as integer) as integer\nreturn f(n - 1)\nend"),
            vec![]
        );
        // shadowing in an inner scope is fine
        assert_eq!(kinds("dim x as integer\nscope\ndim x as string\nend"), vec![]);
    }

    #[test]
    fn test_redeclarations() {
        assert_eq!(
            errors("dim x as integer\ndim x as string"),
            vec![(
                SemanticErrorKind::Semantic,
                "`x` is already declared in this scope".to_string()
            )]
        );
        assert_eq!(
            kinds("function f(a as integer, a as integer)\nend"),
            vec![SemanticErrorKind::Semantic]
        );
        assert_eq!(
            kinds("function f()\nend\nfunction f()\nend"),
            vec![SemanticErrorKind::Semantic]
        );
        assert_eq!(
            kinds("declare function f(a as integer)\nfunction f(a as string)\nend"),
            vec![SemanticErrorKind::Semantic]
        );
        assert_eq!(kinds("dim print as integer"), vec![SemanticErrorKind::Semantic]);
    }

    #[test]
    fn test_declared_functions_need_a_definition() {
        assert_eq!(
            errors("declare function f() as integer
dim a as integer = f()"),
            vec![(
                SemanticErrorKind::Semantic,
                "function `f` is declared but never defined".to_string()
            )]
        );
        // reported when the declaring scope closes
        assert_eq!(
            errors("scope
declare function g()
end scope
function g()
end function"),
            vec![(
                SemanticErrorKind::Semantic,
                "function `g` is declared but never defined".to_string()
            )]
        );
        assert_eq!(
            kinds("declare function f()
f()
function f()
end function"),
            vec![]
        );
    }

    #[test]
    fn test_unknown_types() {
        assert_eq!(
            errors("dim x as whatever"),
            vec![(
                SemanticErrorKind::Semantic,
                "unknown type `whatever`".to_string()
            )]
        );
    }

    #[test]
    fn test_arguments() {
        let prelude = "function f(a as integer, b as integer = 2)\nend\n";
        let check = |call: &str| kinds(&format!("{}{}", prelude, call));

        assert_eq!(check("f(1)"), vec![]);
        assert_eq!(check("f(1, b as 3)"), vec![]);
        assert_eq!(check("f(a as 1)"), vec![]);
        assert_eq!(check("f()"), vec![SemanticErrorKind::Arguments]);
        assert_eq!(check("f(1, 2, 3)"), vec![SemanticErrorKind::Arguments]);
        assert_eq!(check("f(1, c as 3)"), vec![SemanticErrorKind::Arguments]);
        assert_eq!(check("f(1, a as 3)"), vec![SemanticErrorKind::Arguments]);
        assert_eq!(
            check("f(1, b as 2, b as 3)"),
            vec![SemanticErrorKind::Arguments]
        );
        assert_eq!(kinds("print(asc(!\"a\"))"), vec![SemanticErrorKind::Arguments]);
        assert_eq!(kinds("print(1, 2, 3)"), vec![]);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            errors("dim x as integer\nx = x / 0\nx = x % 0.0\nx /= 0"),
            vec![
                (SemanticErrorKind::DivisionByZero, "division by zero".to_string()),
                (SemanticErrorKind::DivisionByZero, "division by zero".to_string()),
                (SemanticErrorKind::DivisionByZero, "division by zero".to_string()),
            ]
        );
    }

    #[test]
    fn test_operand_types() {
        assert_eq!(
            errors("dim x as integer = 1 + !\"a\""),
            vec![(
                SemanticErrorKind::OperandTypes,
                "incompatible operand types `integer` and `string` for `+`".to_string()
            )]
        );
        assert_eq!(
            kinds("dim s as string\ns = s - !\"a\""),
            vec![SemanticErrorKind::OperandTypes]
        );
        assert_eq!(
            kinds("dim s as string = 1"),
            vec![SemanticErrorKind::OperandTypes]
        );
        assert_eq!(kinds("dim s as string\ns = s + !\"a\""), vec![]);
        assert_eq!(kinds("dim d as double = 1 + 2.5"), vec![]);
        assert_eq!(
            errors("dim n as integer = 1 + chr(65)"),
            vec![(
                SemanticErrorKind::OperandTypes,
                "incompatible operand types `integer` and `string` for `+`".to_string()
            )]
        );
        assert_eq!(kinds("dim s as string = chr(65) + !\"b\""), vec![]);
    }
}
