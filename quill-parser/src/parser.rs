//! Recursive-descent parser.
//!
//! Every parse function returns `Some(node)` or `None`. The first function to fail records a
//! sticky error message together with the name of the production being parsed, callers then
//! propagate `None` without touching the message. There is no error recovery: one syntax error
//! aborts the whole parse and [`Parser::syntax_error`] describes it.

use crate::ast::{Block, Node, NodeKind};
use crate::lexer::{Lexer, Token, TokenKind};
use quill_source::{Source, SyntaxError, SyntaxErrorKind};

mod expr;
mod stmt;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Source code
    source: &'a Source<'a>,
    /// Production active when the error was recorded.
    context: &'static str,
    /// First error message. Never overwritten.
    err: Option<String>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a Source<'a>) -> Self {
        Self {
            lexer: Lexer::new(source.content, source.filename),
            source,
            context: "program",
            err: None,
        }
    }

    /// Parses the whole input into a single root [`Block`].
    pub fn parse_program(&mut self) -> Option<Block> {
        self.next();
        let line = self.token().line;

        let mut stmts = Vec::new();
        while !self.is(TokenKind::Eos) {
            let stmt = self.parse_stmt()?;
            // a terminator might have been inserted here
            self.eat(TokenKind::Semicolon);
            stmts.push(stmt);
        }

        Some(Block::new(stmts, line))
    }

    /// Describes why parsing failed.
    ///
    /// The message is the parser's own error if one was recorded, otherwise the lexer's error,
    /// otherwise a generic complaint about the current token.
    pub fn syntax_error(&self) -> SyntaxError {
        let (kind, message) = if let Some(err) = &self.err {
            (SyntaxErrorKind::Parse, err.clone())
        } else if let Some(err) = self.lexer.error() {
            (SyntaxErrorKind::Lexical, err.to_string())
        } else {
            (
                SyntaxErrorKind::Parse,
                format!("unexpected token '{}'", self.token().kind),
            )
        };

        SyntaxError::new(
            kind,
            self.source.filename,
            self.lexer.line(),
            self.context,
            message,
        )
    }
}

/// Parse utilities
impl<'a> Parser<'a> {
    fn token(&self) -> &Token {
        self.lexer.token()
    }

    fn next(&mut self) {
        self.lexer.scan();
    }

    fn is(&self, kind: TokenKind) -> bool {
        self.token().kind == kind
    }

    /// Predicate that tests whether the current token is of kind `kind` and eats it if yes as a side effect.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.is(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    /// Eats an identifier and returns its name.
    fn eat_id(&mut self) -> Option<String> {
        if self.is(TokenKind::Id) {
            let name = self.token().as_str().unwrap_or_default().to_string();
            self.next();
            Some(name)
        } else {
            None
        }
    }

    /// Sets the error context.
    fn context(&mut self, context: &'static str) {
        self.context = context;
    }

    /// Records `message` unless an error was recorded before. Always returns `None`.
    fn error<T>(&mut self, message: &str) -> Option<T> {
        if self.err.is_none() {
            self.err = Some(message.to_string());
        }
        None
    }
}

/// Parses `source` into its root block.
pub fn parse(source: &Source) -> Result<Block, SyntaxError> {
    let mut parser = Parser::new(source);
    parser.parse_program().ok_or_else(|| parser.syntax_error())
}

/// Convenience constructor for nodes.
fn node(kind: NodeKind, line: usize) -> Node {
    Node::new(kind, line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Args, Binding, Decl, Function, If};
    use crate::pretty::pretty_print;

    fn program(source: &str) -> Block {
        let source = Source::new(source);
        match parse(&source) {
            Ok(block) => block,
            Err(err) => panic!("{}", err),
        }
    }

    fn error(source: &str) -> String {
        let source = Source::new(source);
        parse(&source).expect_err("parse should fail").to_string()
    }

    fn id(name: &str, line: usize) -> Box<Node> {
        Box::new(node(NodeKind::Id(name.to_string()), line))
    }

    #[test]
    fn test_dim() {
        let ast = program("dim x as integer");
        assert_eq!(
            ast.stmts,
            vec![node(
                NodeKind::Dim(vec![Binding {
                    decl: Decl {
                        names: vec!["x".to_string()],
                        ty: Some("integer".to_string()),
                        line: 1,
                    },
                    init: None,
                    line: 1,
                }]),
                1
            )]
        );
    }

    #[test]
    fn test_if_else() {
        let ast = program("if a > b then return a else return b end");
        assert_eq!(
            ast.stmts,
            vec![node(
                NodeKind::If(If {
                    cond: Box::new(node(
                        NodeKind::BinaryOp {
                            op: TokenKind::Gt,
                            lhs: id("a", 1),
                            rhs: id("b", 1),
                        },
                        1
                    )),
                    block: Block::new(vec![node(NodeKind::Return(Some(id("a", 1))), 1)], 1),
                    else_ifs: vec![],
                    else_block: Some(Block::new(
                        vec![node(NodeKind::Return(Some(id("b", 1))), 1)],
                        1
                    )),
                }),
                1
            )]
        );
    }

    #[test]
    fn test_function() {
        let ast = program("function f(n as integer) as integer return n * n end");
        assert_eq!(
            ast.stmts,
            vec![node(
                NodeKind::Function(Function {
                    name: "f".to_string(),
                    ret_ty: Some("integer".to_string()),
                    params: vec![Binding {
                        decl: Decl {
                            names: vec!["n".to_string()],
                            ty: Some("integer".to_string()),
                            line: 1,
                        },
                        init: None,
                        line: 1,
                    }],
                    body: Block::new(
                        vec![node(
                            NodeKind::Return(Some(Box::new(node(
                                NodeKind::BinaryOp {
                                    op: TokenKind::Star,
                                    lhs: id("n", 1),
                                    rhs: id("n", 1),
                                },
                                1
                            )))),
                            1
                        )],
                        1
                    ),
                }),
                1
            )]
        );
    }

    #[test]
    fn test_method_call_sugar() {
        assert_eq!(
            pretty_print(&program("x.f(a, b)")),
            pretty_print(&program("f(x, a, b)"))
        );
        assert_eq!(pretty_print(&program("x.f()")), pretty_print(&program("f(x)")));

        let ast = program("x.f(a, b)");
        match &ast.stmts[0].kind {
            NodeKind::Call { callee, args } => {
                assert_eq!(callee.as_id(), Some("f"));
                let names: Vec<_> = args.positional.iter().filter_map(Node::as_id).collect();
                assert_eq!(names, vec!["x", "a", "b"]);
            }
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn test_keyword_args() {
        let ast = program("f(1, b as 2, !\"c\" as 3)");
        match &ast.stmts[0].kind {
            NodeKind::Call { args, .. } => {
                assert_eq!(args.positional.len(), 1);
                let keys: Vec<_> = args.keyword.iter().map(|(key, _)| key.as_str()).collect();
                assert_eq!(keys, vec!["b", "c"]);
                assert_eq!(
                    args.get_keyword("b").map(|node| &node.kind),
                    Some(&NodeKind::Int(2))
                );
            }
            other => panic!("expected a call, got {:?}", other),
        }
        assert!(Args::new(1).is_empty());
    }

    #[test]
    fn test_terminators_separate_statements() {
        let ast = program("a = 1\nb = 2\n\nc = a + b\n");
        assert_eq!(ast.stmts.len(), 3);
        let lines: Vec<_> = ast.stmts.iter().map(|stmt| stmt.line).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn test_unterminated_string() {
        let source = Source::new("!\"abc");
        let mut parser = Parser::new(&source);
        assert!(parser.parse_program().is_none());
        let err = parser.syntax_error();
        assert_eq!(err.kind, SyntaxErrorKind::Lexical);
        assert_eq!(
            err.to_string(),
            "quill(stdin:1). syntax error in statement, unterminated string literal."
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            error("if a b end"),
            "quill(stdin:1). parse error in if statement condition, missing 'then'."
        );
        assert_eq!(
            error("x = (1 + 2"),
            "quill(stdin:1). parse error in additive operation, expression missing closing ')'."
        );
        assert_eq!(
            error("function f(a) end"),
            "quill(stdin:1). parse error in function param, expecting type."
        );
        assert_eq!(
            error("dim as integer"),
            "quill(stdin:1). parse error in dim expression, expecting declaration."
        );
        assert_eq!(
            error("type point end"),
            "quill(stdin:1). parse error in declaration, expecting field."
        );
        assert_eq!(
            error("x = 1 +"),
            "quill(stdin:1). parse error in additive operation, missing right-hand expression."
        );
        assert_eq!(
            error(")"),
            "quill(stdin:1). parse error in statement, unexpected token ')'."
        );
    }

    #[test]
    fn test_error_line() {
        assert_eq!(
            error("a = 1\nb = 2\nc = )"),
            "quill(stdin:3). parse error in assignment, unexpected token ')'."
        );
    }
}
