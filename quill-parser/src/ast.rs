//! Abstract syntax tree.
//!
//! The tree is strictly owned: every child is boxed or stored in a `Vec` of its parent and the
//! whole tree is dropped as a unit. Identifier and type names are stored case-folded.

use crate::lexer::TokenKind;

/// A syntax node together with the line of its leftmost token.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub line: usize,
}

impl Node {
    pub fn new(kind: NodeKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// Returns the identifier name if this node is an [`NodeKind::Id`].
    pub fn as_id(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Id(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// An identifier (e.g. `foo`).
    Id(String),
    Int(i64),
    Double(f64),
    Str(String),
    /// A prefix or postfix unary operation (e.g. `-a`, `a++`).
    UnaryOp {
        op: TokenKind,
        operand: Box<Node>,
        postfix: bool,
    },
    /// A binary operation, including plain and compound assignments (e.g. `a = 1`, `a += 1`).
    BinaryOp {
        op: TokenKind,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    /// `dim a, b as integer = 1, c as string`.
    Dim(Vec<Binding>),
    Call {
        callee: Box<Node>,
        args: Args,
    },
    /// `base[index]`
    Subscript {
        base: Box<Node>,
        index: Box<Node>,
    },
    /// Member access `base.member`.
    Slot {
        base: Box<Node>,
        member: String,
    },
    Array(Vec<Node>),
    /// Key / value pairs in source order.
    Hash(Vec<(Node, Node)>),
    Function(Function),
    /// Forward declaration of a function.
    Declare(Declare),
    Scope(Block),
    Type {
        name: String,
        fields: Vec<Decl>,
    },
    If(If),
    While {
        cond: Box<Node>,
        body: Block,
    },
    Return(Option<Box<Node>>),
}

/// An ordered list of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Node>,
    pub line: usize,
}

impl Block {
    pub fn new(stmts: Vec<Node>, line: usize) -> Self {
        Self { stmts, line }
    }
}

/// Call arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub positional: Vec<Node>,
    /// Keyword arguments (`name as expr`) in source order. Duplicate names are kept so they can
    /// be diagnosed.
    pub keyword: Vec<(String, Node)>,
    pub line: usize,
}

impl Args {
    pub fn new(line: usize) -> Self {
        Self {
            positional: Vec::new(),
            keyword: Vec::new(),
            line,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Looks up a keyword argument. The first occurrence wins.
    pub fn get_keyword(&self, name: &str) -> Option<&Node> {
        self.keyword
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// One or more names sharing an optional type (`a, b as integer`).
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub names: Vec<String>,
    pub ty: Option<String>,
    pub line: usize,
}

/// A declaration with an optional initializer. Used by `dim` and by parameter lists, where the
/// initializer is the default value.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub decl: Decl,
    pub init: Option<Box<Node>>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub ret_ty: Option<String>,
    pub params: Vec<Binding>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declare {
    pub name: String,
    pub ret_ty: Option<String>,
    pub params: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Box<Node>,
    pub block: Block,
    pub else_ifs: Vec<ElseIf>,
    pub else_block: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub cond: Box<Node>,
    pub block: Block,
    pub line: usize,
}

/// Flattens parameter bindings into `(name, type, default)` triples in declaration order.
pub fn param_names(params: &[Binding]) -> Vec<(&str, Option<&str>, Option<&Node>)> {
    params
        .iter()
        .flat_map(|binding| {
            let ty = binding.decl.ty.as_deref();
            let init = binding.init.as_deref();
            binding
                .decl
                .names
                .iter()
                .map(move |name| (name.as_str(), ty, init))
        })
        .collect()
}
