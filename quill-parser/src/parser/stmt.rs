use super::*;
use crate::ast::{Binding, Declare, ElseIf, Function, If};

impl<'a> Parser<'a> {
    /// Parses a statement.
    pub fn parse_stmt(&mut self) -> Option<Node> {
        self.context("statement");
        match self.token().kind {
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Do | TokenKind::While => self.parse_while_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Scope => self.parse_scope_stmt(),
            TokenKind::Declare => self.parse_declare_stmt(),
            TokenKind::Function => self.parse_function_stmt(),
            TokenKind::Type => self.parse_type_stmt(),
            _ => self.parse_expr(),
        }
    }

    /// Parses statements up to the end of the block opened by `closer`.
    ///
    /// Every block ends with `end`, which may be followed by `closer` on the same line
    /// (e.g. `end if`). A `while` block may also end with `loop`.
    pub fn parse_block(&mut self, closer: TokenKind) -> Option<Block> {
        self.parse_block_until(closer).map(|(block, _)| block)
    }

    /// Like [`Parser::parse_block`], but an `if` block also stops in front of `else` and
    /// `elseif`. Returns the kind of the token that ended the block.
    fn parse_block_until(&mut self, closer: TokenKind) -> Option<(Block, TokenKind)> {
        let line = self.token().line;
        let mut stmts = Vec::new();

        let ender = loop {
            let kind = self.token().kind;
            match kind {
                TokenKind::End => {
                    self.eat_block_end(closer);
                    break kind;
                }
                TokenKind::Loop if closer == TokenKind::While => {
                    self.next();
                    break kind;
                }
                TokenKind::Else | TokenKind::ElseIf if closer == TokenKind::If => break kind,
                TokenKind::Loop | TokenKind::Else | TokenKind::ElseIf | TokenKind::Eos => {
                    return self.missing_end(closer);
                }
                _ => {}
            }

            let stmt = self.parse_stmt()?;
            // a terminator might have been inserted here
            self.eat(TokenKind::Semicolon);
            stmts.push(stmt);
        };

        Some((Block::new(stmts, line), ender))
    }

    fn missing_end<T>(&mut self, closer: TokenKind) -> Option<T> {
        match closer {
            TokenKind::If => self.context("if statement"),
            TokenKind::While => self.context("while statement"),
            TokenKind::Function => self.context("function statement"),
            _ => self.context("scope statement"),
        }
        if closer == TokenKind::While {
            self.error("missing 'loop'")
        } else {
            self.error("missing 'end'")
        }
    }

    /// Eats `end` and a repeated `closer` on the same line.
    fn eat_block_end(&mut self, closer: TokenKind) -> bool {
        if !self.is(TokenKind::End) {
            return false;
        }
        let line = self.token().line;
        self.next();
        if self.is(closer) && self.token().line == line {
            self.next();
        }
        true
    }

    /// `then` may be left out when the condition ends the line.
    fn eat_then(&mut self) -> bool {
        self.eat(TokenKind::Then) || self.eat(TokenKind::Semicolon)
    }

    /// `'if' cond 'then'? block ('elseif' cond 'then'? block)* ('else' block)? 'end'`
    fn parse_if_stmt(&mut self) -> Option<Node> {
        let line = self.token().line;
        self.next(); // eat 'if'

        self.context("if statement condition");
        let cond = self.parse_condition()?;
        if !self.eat_then() {
            return self.error("missing 'then'");
        }

        self.context("if statement");
        let (block, mut ender) = self.parse_block_until(TokenKind::If)?;

        let mut stmt = If {
            cond: Box::new(cond),
            block,
            else_ifs: Vec::new(),
            else_block: None,
        };

        while ender == TokenKind::ElseIf {
            let else_if_line = self.token().line;
            self.next(); // eat 'elseif'

            self.context("elseif statement condition");
            let cond = self.parse_condition()?;
            if !self.eat_then() {
                return self.error("missing 'then'");
            }

            self.context("if statement");
            let (block, next) = self.parse_block_until(TokenKind::If)?;
            stmt.else_ifs.push(ElseIf {
                cond: Box::new(cond),
                block,
                line: else_if_line,
            });
            ender = next;
        }

        if ender == TokenKind::Else {
            self.next(); // eat 'else'
            self.context("else statement");
            let (block, ender) = self.parse_block_until(TokenKind::If)?;
            if ender != TokenKind::End {
                return self.missing_end(TokenKind::If);
            }
            stmt.else_block = Some(block);
        }

        Some(node(NodeKind::If(stmt), line))
    }

    /// `'do' 'while' cond block | 'while' cond block`
    fn parse_while_stmt(&mut self) -> Option<Node> {
        let line = self.token().line;
        if self.eat(TokenKind::Do) && !self.is(TokenKind::While) {
            return self.error("missing 'while'");
        }
        self.next(); // eat 'while'

        self.context("while statement condition");
        let cond = self.parse_condition()?;
        // a terminator might have been inserted here
        self.eat(TokenKind::Semicolon);

        let body = self.parse_block(TokenKind::While)?;
        Some(node(
            NodeKind::While {
                cond: Box::new(cond),
                body,
            },
            line,
        ))
    }

    /// `'return' expr?`
    fn parse_return_stmt(&mut self) -> Option<Node> {
        let line = self.token().line;
        self.context("return statement");
        self.next(); // eat 'return'

        match self.token().kind {
            TokenKind::Semicolon
            | TokenKind::End
            | TokenKind::Else
            | TokenKind::ElseIf
            | TokenKind::Loop
            | TokenKind::Eos => Some(node(NodeKind::Return(None), line)),
            _ => {
                let expr = self.parse_expr()?;
                Some(node(NodeKind::Return(Some(Box::new(expr))), line))
            }
        }
    }

    /// `'scope' block`
    fn parse_scope_stmt(&mut self) -> Option<Node> {
        let line = self.token().line;
        self.context("scope statement");
        self.next(); // eat 'scope'

        let body = self.parse_block(TokenKind::Scope)?;
        Some(node(NodeKind::Scope(body), line))
    }

    /// `'declare' 'function' id ('(' params ')')? ('as' type)?`
    fn parse_declare_stmt(&mut self) -> Option<Node> {
        let line = self.token().line;
        self.next(); // eat 'declare'

        self.context("function declaration");
        if !self.eat(TokenKind::Function) {
            return self.error("expecting 'function'");
        }
        let (name, params, ret_ty) = self.parse_signature("function declaration")?;
        // a terminator might have been inserted here
        self.eat(TokenKind::Semicolon);

        Some(node(
            NodeKind::Declare(Declare {
                name,
                ret_ty,
                params,
            }),
            line,
        ))
    }

    /// `'function' id ('(' params ')')? ('as' type)? block`
    fn parse_function_stmt(&mut self) -> Option<Node> {
        let line = self.token().line;
        self.context("function statement");
        self.next(); // eat 'function'

        let (name, params, ret_ty) = self.parse_signature("function")?;
        // a terminator might have been inserted here
        self.eat(TokenKind::Semicolon);

        let body = self.parse_block(TokenKind::Function)?;
        Some(node(
            NodeKind::Function(Function {
                name,
                ret_ty,
                params,
                body,
            }),
            line,
        ))
    }

    /// Parses the name, parameters and return type shared by `function` and `declare`.
    fn parse_signature(
        &mut self,
        context: &'static str,
    ) -> Option<(String, Vec<Binding>, Option<String>)> {
        let name = match self.eat_id() {
            Some(name) => name,
            None => return self.error("missing function name"),
        };

        let params = if self.eat(TokenKind::LParen) {
            let params = self.parse_params()?;
            self.context(context);
            if !self.eat(TokenKind::RParen) {
                return self.error("missing closing ')'");
            }
            params
        } else {
            Vec::new()
        };

        self.context(context);
        let ret_ty = if self.eat(TokenKind::As) {
            match self.eat_id() {
                Some(ty) => Some(ty),
                None => return self.error("missing type after ':'"),
            }
        } else {
            None
        };

        Some((name, params, ret_ty))
    }

    /// `(decl ('=' expr)? (',' decl ('=' expr)?)*)?`
    ///
    /// A parameter without a default value needs a type.
    fn parse_params(&mut self) -> Option<Vec<Binding>> {
        self.context("function params");
        let mut params = Vec::new();
        if !self.is(TokenKind::Id) {
            return Some(params);
        }

        loop {
            let line = self.token().line;
            let decl = self.parse_decl(false)?;
            self.context("function param");

            let init = if self.eat(TokenKind::Assign) {
                Some(Box::new(self.parse_expr()?))
            } else if decl.ty.is_none() {
                return self.error("expecting type");
            } else {
                None
            };
            params.push(Binding { decl, init, line });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        Some(params)
    }

    /// `'type' id (decl)+ 'end'`
    fn parse_type_stmt(&mut self) -> Option<Node> {
        let line = self.token().line;
        self.context("type statement");
        self.next(); // eat 'type'

        let name = match self.eat_id() {
            Some(name) => name,
            None => return self.error("missing type name"),
        };
        // a terminator might have been inserted here
        self.eat(TokenKind::Semicolon);

        let mut fields = Vec::new();
        loop {
            let decl = match self.parse_decl(true) {
                Some(decl) => decl,
                None => return self.error("expecting field"),
            };
            self.eat(TokenKind::Semicolon);
            fields.push(decl);

            if self.eat_block_end(TokenKind::Type) {
                break;
            }
        }

        Some(node(NodeKind::Type { name, fields }, line))
    }
}
