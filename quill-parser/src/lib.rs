//! Front end: lexer, AST, visitor, parser and AST pretty-printer.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod visitor;
