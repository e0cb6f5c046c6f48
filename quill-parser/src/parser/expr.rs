use super::*;
use crate::ast::{Args, Binding, Decl};
use crate::lexer::Literal;

/// Parse function of one precedence level.
type Level<'a> = fn(&mut Parser<'a>) -> Option<Node>;

impl<'a> Parser<'a> {
    /* Expressions */
    /// Parses any expression.
    pub fn parse_expr(&mut self) -> Option<Node> {
        self.parse_not_expr()
    }

    /// Parses a condition of `if`, `elseif` or `while`.
    /// A top level `=` compares rather than assigns.
    pub(super) fn parse_condition(&mut self) -> Option<Node> {
        let mut cond = self.parse_expr()?;
        if let NodeKind::BinaryOp { op, .. } = &mut cond.kind {
            if *op == TokenKind::Assign {
                *op = TokenKind::EqEq;
            }
        }
        Some(cond)
    }

    /// `'not' not_expr | assignment_expr`
    fn parse_not_expr(&mut self) -> Option<Node> {
        let line = self.token().line;
        if self.eat(TokenKind::Not) {
            let operand = self.parse_not_expr()?;
            return Some(node(
                NodeKind::UnaryOp {
                    op: TokenKind::Not,
                    operand: Box::new(operand),
                    postfix: false,
                },
                line,
            ));
        }
        self.parse_assignment_expr()
    }

    /// `dim_expr | logical_or_expr (assign_op not_expr)?`
    fn parse_assignment_expr(&mut self) -> Option<Node> {
        let line = self.token().line;
        if self.eat(TokenKind::Dim) {
            return self.parse_dim_expr(line);
        }

        let lhs = self.parse_logical_or_expr()?;

        let op = self.token().kind;
        match op {
            TokenKind::Assign => self.context("assignment"),
            TokenKind::PlusAssign
            | TokenKind::MinusAssign
            | TokenKind::StarAssign
            | TokenKind::SlashAssign
            | TokenKind::OrAssign
            | TokenKind::AndAssign => self.context("compound assignment"),
            _ => return Some(lhs),
        }
        self.next();

        let rhs = self.parse_not_expr()?;
        Some(node(
            NodeKind::BinaryOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            line,
        ))
    }

    /// `decl ('=' expr)? (',' decl ('=' expr)?)*`, after `dim`.
    fn parse_dim_expr(&mut self, line: usize) -> Option<Node> {
        let mut bindings = Vec::new();
        loop {
            let binding_line = self.token().line;
            let decl = self.parse_decl(false);
            self.context("dim expression");
            let decl = match decl {
                Some(decl) => decl,
                None => return self.error("expecting declaration"),
            };

            let init = if self.eat(TokenKind::Assign) {
                match self.parse_expr() {
                    Some(init) => Some(Box::new(init)),
                    None => return self.error("expecting declaration initializer"),
                }
            } else {
                None
            };

            bindings.push(Binding {
                decl,
                init,
                line: binding_line,
            });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        Some(node(NodeKind::Dim(bindings), line))
    }

    /// `logical_and_expr ('||' logical_and_expr)* '&'?`
    ///
    /// A trailing `&` is sugar for `fork(expr)`.
    fn parse_logical_or_expr(&mut self) -> Option<Node> {
        let line = self.token().line;
        let mut node = self.parse_binary(
            &[TokenKind::Or],
            "|| operation",
            Parser::parse_logical_and_expr,
        )?;

        if self.eat(TokenKind::Fork) {
            let mut args = Args::new(line);
            args.positional.push(node);
            node = Node::new(
                NodeKind::Call {
                    callee: Box::new(Node::new(NodeKind::Id("fork".to_string()), line)),
                    args,
                },
                line,
            );
        }

        Some(node)
    }

    fn parse_logical_and_expr(&mut self) -> Option<Node> {
        self.parse_binary(&[TokenKind::And], "&& operation", Parser::parse_bit_or_expr)
    }

    fn parse_bit_or_expr(&mut self) -> Option<Node> {
        self.parse_binary(&[TokenKind::BitOr], "| operation", Parser::parse_bit_xor_expr)
    }

    fn parse_bit_xor_expr(&mut self) -> Option<Node> {
        self.parse_binary(&[TokenKind::BitXor], "^ operation", Parser::parse_bit_and_expr)
    }

    fn parse_bit_and_expr(&mut self) -> Option<Node> {
        self.parse_binary(&[TokenKind::BitAnd], "& operation", Parser::parse_equality_expr)
    }

    fn parse_equality_expr(&mut self) -> Option<Node> {
        self.parse_binary(
            &[TokenKind::EqEq, TokenKind::NotEq],
            "equality operation",
            Parser::parse_relational_expr,
        )
    }

    fn parse_relational_expr(&mut self) -> Option<Node> {
        self.parse_binary(
            &[TokenKind::Lt, TokenKind::LtEq, TokenKind::Gt, TokenKind::GtEq],
            "relational operation",
            Parser::parse_shift_expr,
        )
    }

    fn parse_shift_expr(&mut self) -> Option<Node> {
        self.parse_binary(
            &[TokenKind::Shl, TokenKind::Shr],
            "shift operation",
            Parser::parse_additive_expr,
        )
    }

    fn parse_additive_expr(&mut self) -> Option<Node> {
        self.parse_binary(
            &[TokenKind::Plus, TokenKind::Minus],
            "additive operation",
            Parser::parse_multiplicative_expr,
        )
    }

    fn parse_multiplicative_expr(&mut self) -> Option<Node> {
        self.parse_binary(
            &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
            "multiplicative operation",
            Parser::parse_unary_expr,
        )
    }

    /// Parses a left associative chain `operand (op operand)*` for the operators in `ops`.
    fn parse_binary(
        &mut self,
        ops: &[TokenKind],
        context: &'static str,
        operand: Level<'a>,
    ) -> Option<Node> {
        let line = self.token().line;
        let mut lhs = operand(self)?;

        while ops.contains(&self.token().kind) {
            let op = self.token().kind;
            self.next();
            self.context(context);

            let rhs = match operand(self) {
                Some(rhs) => rhs,
                None => return self.error("missing right-hand expression"),
            };
            lhs = node(
                NodeKind::BinaryOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
            );
        }

        Some(lhs)
    }

    /// `('++' | '--' | '~' | '+' | '-' | '!') unary_expr | postfix_expr`
    fn parse_unary_expr(&mut self) -> Option<Node> {
        let line = self.token().line;
        let op = self.token().kind;
        match op {
            TokenKind::Incr
            | TokenKind::Decr
            | TokenKind::Tilde
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Bang => {
                self.next();
                let operand = self.parse_unary_expr()?;
                Some(node(
                    NodeKind::UnaryOp {
                        op,
                        operand: Box::new(operand),
                        postfix: false,
                    },
                    line,
                ))
            }
            _ => self.parse_postfix_expr(),
        }
    }

    /// `pow_expr ('++' | '--')?`
    fn parse_postfix_expr(&mut self) -> Option<Node> {
        let line = self.token().line;
        let operand = self.parse_pow_expr()?;

        let op = self.token().kind;
        if op == TokenKind::Incr || op == TokenKind::Decr {
            self.next();
            return Some(node(
                NodeKind::UnaryOp {
                    op,
                    operand: Box::new(operand),
                    postfix: true,
                },
                line,
            ));
        }

        Some(operand)
    }

    /// `call_expr ('**' call_expr)?`
    fn parse_pow_expr(&mut self) -> Option<Node> {
        let line = self.token().line;
        let lhs = self.parse_call_expr()?;

        if self.eat(TokenKind::Pow) {
            self.context("** operation");
            let rhs = match self.parse_call_expr() {
                Some(rhs) => rhs,
                None => return self.error("missing right-hand expression"),
            };
            return Some(node(
                NodeKind::BinaryOp {
                    op: TokenKind::Pow,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
            ));
        }

        Some(lhs)
    }

    /// A primary expression followed by any chain of `[index]`, `.member` and `(args)`.
    ///
    /// `recv.method(args)` is rewritten to `method(recv, args)`.
    fn parse_call_expr(&mut self) -> Option<Node> {
        let line = self.token().line;
        let mut node = self.parse_primary_expr()?;

        loop {
            match self.token().kind {
                TokenKind::LBrack => {
                    self.next();
                    let index = match self.parse_expr() {
                        Some(index) => index,
                        None => return self.error("missing index in subscript"),
                    };
                    self.context("subscript");
                    if !self.eat(TokenKind::RBrack) {
                        return self.error("missing closing ']'");
                    }
                    node = Node::new(
                        NodeKind::Subscript {
                            base: Box::new(node),
                            index: Box::new(index),
                        },
                        line,
                    );
                }
                TokenKind::Dot => {
                    self.next();
                    self.context("slot access");
                    let member_line = self.token().line;
                    let member = match self.eat_id() {
                        Some(member) => member,
                        None => return self.error("expecting identifier"),
                    };

                    if self.eat(TokenKind::LParen) {
                        let args = self.parse_call_args(line)?;
                        node = Node::new(
                            NodeKind::Call {
                                callee: Box::new(Node::new(NodeKind::Id(member), member_line)),
                                args: with_receiver(node, args),
                            },
                            line,
                        );
                    } else {
                        node = Node::new(
                            NodeKind::Slot {
                                base: Box::new(node),
                                member,
                            },
                            line,
                        );
                    }
                }
                TokenKind::LParen => {
                    self.next();
                    let args = self.parse_call_args(line)?;
                    node = Node::new(
                        NodeKind::Call {
                            callee: Box::new(node),
                            args,
                        },
                        line,
                    );
                }
                _ => break,
            }
        }

        Some(node)
    }

    /// `(arg (',' arg)*)? ')'`, after `(`. An argument followed by `as` is a keyword argument.
    fn parse_call_args(&mut self, line: usize) -> Option<Args> {
        self.context("function call");
        let mut args = Args::new(line);

        if !self.is(TokenKind::RParen) {
            loop {
                let arg = self.parse_expr()?;

                if self.eat(TokenKind::As) {
                    self.context("keyword argument");
                    let key = match arg.kind {
                        NodeKind::Id(key) | NodeKind::Str(key) => key,
                        _ => return self.error("expecting string or identifier as key"),
                    };
                    let value = self.parse_expr()?;
                    args.keyword.push((key, value));
                } else {
                    args.positional.push(arg);
                }

                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }

            if !self.is(TokenKind::RParen) {
                return self.error("missing closing ')'");
            }
        }

        self.next(); // eat ')'
        Some(args)
    }

    /// Parses a primary (atom) expression.
    fn parse_primary_expr(&mut self) -> Option<Node> {
        let tok = self.token();
        let line = tok.line;
        let kind = match (tok.kind, &tok.value) {
            (TokenKind::Id, Literal::Str(name)) => Some(NodeKind::Id(name.clone())),
            (TokenKind::Int, Literal::Int(val)) => Some(NodeKind::Int(*val)),
            (TokenKind::Double, Literal::Double(val)) => Some(NodeKind::Double(*val)),
            (TokenKind::String, Literal::Str(val)) => Some(NodeKind::Str(val.clone())),
            _ => None,
        };

        match kind {
            Some(kind) => {
                self.next();
                Some(node(kind, line))
            }
            None => match self.token().kind {
                TokenKind::LBrack => self.parse_array_expr(),
                TokenKind::LBrace => self.parse_hash_expr(),
                _ => self.parse_paren_expr(),
            },
        }
    }

    /// `'(' expr ')'`. Fails without a message when there is no `(`.
    fn parse_paren_expr(&mut self) -> Option<Node> {
        if !self.eat(TokenKind::LParen) {
            return None;
        }

        let expr = self.parse_expr()?;
        if !self.eat(TokenKind::RParen) {
            return self.error("expression missing closing ')'");
        }
        Some(expr)
    }

    /// `'[' (expr (',' expr)* ','?)? ']'`
    fn parse_array_expr(&mut self) -> Option<Node> {
        let line = self.token().line;
        self.next(); // eat '['
        self.context("array");

        let mut elements = Vec::new();
        while !self.is(TokenKind::RBrack) {
            elements.push(self.parse_expr()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        if !self.eat(TokenKind::RBrack) {
            return self.error("array missing closing ']'");
        }
        Some(node(NodeKind::Array(elements), line))
    }

    /// `'{' (expr ('as' | ':') expr (',' ...)* ','?)? '}'`
    fn parse_hash_expr(&mut self) -> Option<Node> {
        let line = self.token().line;
        self.next(); // eat '{'
        self.context("hash");

        let mut pairs = Vec::new();
        while !self.is(TokenKind::RBrace) {
            let key = self.parse_expr()?;
            if !self.eat(TokenKind::As) && !self.eat(TokenKind::Colon) {
                return self.error("hash pair ':' missing");
            }
            let value = self.parse_expr()?;
            pairs.push((key, value));

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        if !self.eat(TokenKind::RBrace) {
            return self.error("hash missing closing '}'");
        }
        Some(node(NodeKind::Hash(pairs), line))
    }

    /// `id (',' id)* ('as' type)?`
    ///
    /// Fails without a message if there is no leading identifier. When `need_type` is set the
    /// type annotation is mandatory.
    pub(super) fn parse_decl(&mut self, need_type: bool) -> Option<Decl> {
        self.context("declaration");
        if !self.is(TokenKind::Id) {
            return None;
        }

        let line = self.token().line;
        let mut names = Vec::new();
        while let Some(name) = self.eat_id() {
            names.push(name);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        if !self.eat(TokenKind::As) {
            if need_type {
                return self.error("expecting type");
            }
            return Some(Decl {
                names,
                ty: None,
                line,
            });
        }

        match self.eat_id() {
            Some(ty) => Some(Decl {
                names,
                ty: Some(ty),
                line,
            }),
            None => self.error("expecting type"),
        }
    }
}

/// Inserts `receiver` as the first positional argument, shifting the others after it.
fn with_receiver(receiver: Node, args: Args) -> Args {
    let mut positional = Vec::with_capacity(args.positional.len() + 1);
    positional.push(receiver);
    for arg in args.positional {
        positional.push(arg);
    }
    Args {
        positional,
        keyword: args.keyword,
        line: args.line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pretty::pretty_print;
    use insta::assert_snapshot;

    fn expr(source: &str) -> String {
        let source = Source::new(source);
        let ast = parse(&source).expect("expression should parse");
        assert!(source.has_no_errors());
        pretty_print(&ast)
    }

    #[test]
    fn test_literal() {
        assert_snapshot!(expr("1"), @"1");
        assert_snapshot!(expr("2.5"), @"2.5");
        assert_snapshot!(expr("0x10"), @"16");
        assert_snapshot!(expr("!\"hi\""), @r###""hi""###);
    }

    #[test]
    fn test_precedence() {
        assert_snapshot!(expr("1 + 2 * 3"), @"(+ 1 (* 2 3))");
        assert_snapshot!(expr("2 * 2 * 2"), @"(* (* 2 2) 2)");
        assert_snapshot!(expr("a || b && c | d ^ e and f == g"),
            @"(|| a (&& b (| c (^ d (and e (== f g))))))");
        assert_snapshot!(expr("a < b << 1 + c"), @"(< a (<< b (+ 1 c)))");
        assert_snapshot!(expr("1 == 2 - 1"), @"(== 1 (- 2 1))");
        assert_snapshot!(expr("(1 + 2) * 3"), @"(* (+ 1 2) 3)");
    }

    #[test]
    fn test_unary() {
        assert_snapshot!(expr("-a"), @"(- a)");
        assert_snapshot!(expr("!~-a"), @"(! (~ (- a)))");
        assert_snapshot!(expr("a++"), @"(a ++)");
        assert_snapshot!(expr("--a"), @"(-- a)");
        assert_snapshot!(expr("-a ** 2"), @"(- (** a 2))");
        assert_snapshot!(expr("not a = b"), @"(not (= a b))");
    }

    #[test]
    fn test_assignment() {
        assert_snapshot!(expr("a = b + 1"), @"(= a (+ b 1))");
        assert_snapshot!(expr("a += 1"), @"(+= a 1)");
        assert_snapshot!(expr("a = b = c"), @"(= a (= b c))");
        assert_snapshot!(expr("ok ||= not done"), @"(||= ok (not done))");
    }

    #[test]
    fn test_dim() {
        assert_snapshot!(expr("dim a, b as integer = 1, s as string"),
            @"(dim (a b as integer = 1) (s as string))");
        assert_snapshot!(expr("dim x"), @"(dim (x))");
    }

    #[test]
    fn test_postfix_chains() {
        assert_snapshot!(expr("a[1][2]"), @"(index (index a 1) 2)");
        assert_snapshot!(expr("a.b.c"), @"(slot (slot a b) c)");
        assert_snapshot!(expr("f(1)(2)"), @"(call (call f 1) 2)");
        assert_snapshot!(expr("a.len()"), @"(call len a)");
        assert_snapshot!(expr("s.sub(1, 2).up()"), @"(call up (call sub s 1 2))");
        assert_snapshot!(expr("f(x as 1)"), @"(call f (x as 1))");
    }

    #[test]
    fn test_collections() {
        assert_snapshot!(expr("[1, 2, 3,]"), @"(array 1 2 3)");
        assert_snapshot!(expr("[]"), @"(array)");
        assert_snapshot!(expr("{a as 1, b: 2}"), @"(hash (a 1) (b 2))");
    }

    #[test]
    fn test_fork() {
        assert_snapshot!(expr("work(1) &"), @"(call fork (call work 1))");
    }

    #[test]
    fn test_condition_equality() {
        let source = Source::new("if a = 1 then b = 2 end");
        let ast = parse(&source).expect("program should parse");
        assert_snapshot!(pretty_print(&ast), @r###"
        (if (== a 1)
          (= b 2))
        "###);
    }
}
