//! Passes that run on the AST after parsing.

pub mod resolve;
