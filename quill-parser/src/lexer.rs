//! Tokens and the lexer.
//!
//! Raw classification is done by a [`logos`] generated scanner. [`Lexer`] wraps it to
//! track line numbers, insert statement terminators at newlines, fold identifiers and
//! keywords to lower case and decode literal payloads.

use logos::Logos;
use std::fmt;

/// Generates [`TokenKind`] together with its canonical display strings.
macro_rules! token_kinds {
    ($($(#[$meta:meta])* $variant:ident => $display:literal,)*) => {
        /// Kind of a [`Token`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TokenKind {
            $($(#[$meta])* $variant,)*
        }

        impl TokenKind {
            /// Returns the canonical display string of the token kind.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(TokenKind::$variant => $display,)*
                }
            }
        }
    };
}

token_kinds! {
    Illegal => "illegal",
    /// End of source.
    Eos => "end-of-source",
    Id => "id",
    Int => "int",
    Double => "double",
    String => "string",

    // keywords
    As => "as",
    Declare => "declare",
    Dim => "dim",
    Do => "do",
    If => "if",
    Else => "else",
    ElseIf => "elseif",
    End => "end",
    Function => "function",
    Loop => "loop",
    Return => "return",
    Scope => "scope",
    Then => "then",
    Type => "type",
    While => "while",
    /// Statement level `not`.
    Not => "not",

    // punctuation
    LParen => "(",
    RParen => ")",
    LBrace => "{",
    RBrace => "}",
    LBrack => "[",
    RBrack => "]",
    Comma => ",",
    Semicolon => ";",
    Dot => ".",
    Colon => ":",
    QMark => "?",

    // operators
    Plus => "+",
    Minus => "-",
    Star => "*",
    Slash => "/",
    Percent => "%",
    Pow => "**",
    Incr => "++",
    Decr => "--",
    Assign => "=",
    PlusAssign => "+=",
    MinusAssign => "-=",
    StarAssign => "*=",
    SlashAssign => "/=",
    AndAssign => "&&=",
    OrAssign => "||=",
    EqEq => "==",
    NotEq => "!=",
    Lt => "<",
    LtEq => "<=",
    Gt => ">",
    GtEq => ">=",
    And => "&&",
    Or => "||",
    Bang => "!",
    Tilde => "~",
    /// Bitwise and, spelled `and`.
    BitAnd => "and",
    BitOr => "|",
    BitXor => "^",
    Shl => "<<",
    Shr => ">>",
    /// Trailing `&`, sugar for `fork(expr)`.
    Fork => "&",
}

impl TokenKind {
    /// Matches a lower-cased word against the keyword table.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word.len() {
            2 => match word {
                "if" => TokenKind::If,
                "as" => TokenKind::As,
                "do" => TokenKind::Do,
                _ => return None,
            },
            3 => match word {
                "end" => TokenKind::End,
                "dim" => TokenKind::Dim,
                "and" => TokenKind::BitAnd,
                "not" => TokenKind::Not,
                _ => return None,
            },
            4 => match word {
                "else" => TokenKind::Else,
                "type" => TokenKind::Type,
                "then" => TokenKind::Then,
                "loop" => TokenKind::Loop,
                _ => return None,
            },
            5 => match word {
                "while" => TokenKind::While,
                "scope" => TokenKind::Scope,
                _ => return None,
            },
            6 => match word {
                "elseif" => TokenKind::ElseIf,
                "return" => TokenKind::Return,
                _ => return None,
            },
            7 if word == "declare" => TokenKind::Declare,
            8 if word == "function" => TokenKind::Function,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns `true` if a newline directly after this token ends the statement.
    pub fn ends_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Id
                | TokenKind::Int
                | TokenKind::Double
                | TokenKind::String
                | TokenKind::Return
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal payload of a [`Token`].
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Int(i64),
    Double(f64),
    /// Identifier name or decoded string literal.
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based source line.
    pub line: usize,
    pub value: Literal,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Self {
            kind,
            line,
            value: Literal::None,
        }
    }

    pub fn with_value(kind: TokenKind, line: usize, value: Literal) -> Self {
        Self { kind, line, value }
    }

    /// Returns the string payload of an identifier or string token.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Literal::None => write!(f, "{}", self.kind),
            Literal::Int(val) => write!(f, "{} {}", self.kind, val),
            Literal::Double(val) => write!(f, "{} {:?}", self.kind, val),
            Literal::Str(val) if self.kind == TokenKind::String => {
                write!(f, "{} {:?}", self.kind, val)
            }
            Literal::Str(val) => write!(f, "{} {}", self.kind, val),
        }
    }
}

/// A lexical error. Always fatal to the scan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("illegal character")]
    IllegalCharacter,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("string hex literal \\x contains invalid digits")]
    InvalidHexEscape,
    #[error("{0}")]
    MalformedNumber(&'static str),
}

/// Raw tokens as classified by the generated scanner.
#[derive(Debug, Logos, Clone, Copy, PartialEq)]
enum RawToken {
    // literals
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,
    #[regex(r"[0-9][0-9_]*")]
    Int,
    #[regex(r"0[xX][0-9a-fA-F]+")]
    Hex,
    #[token("0x")]
    #[token("0X")]
    BadHex,
    #[regex(r"[0-9][0-9_]*\.[0-9_]*")]
    Double,
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?[eE][+-]?[0-9]+")]
    Exponent,
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?[eE][+-]?")]
    BadExponent,
    #[regex(r#"!"([^"\\]|\\(.|\n))*""#)]
    Str,
    #[regex(r#"!"([^"\\]|\\(.|\n))*"#)]
    UnterminatedStr,

    // punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBrack,
    #[token("]")]
    RBrack,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("?")]
    QMark,

    // operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("**")]
    Pow,
    #[token("++")]
    Incr,
    #[token("--")]
    Decr,
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("&&=")]
    AndAssign,
    #[token("||=")]
    OrAssign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    #[token("<>")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("|")]
    BitOr,
    #[token("^")]
    BitXor,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&")]
    Fork,

    #[regex(r"\r\n|\n|\r")]
    Newline,

    // misc
    #[regex(r"[ \t\f]+", logos::skip)]
    #[regex(r"'[^\r\n]*", logos::skip)] // line comments
    #[error]
    Error,
}

impl RawToken {
    /// Maps punctuation and operators to their [`TokenKind`].
    fn punctuation(self) -> Option<TokenKind> {
        let kind = match self {
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::LBrack => TokenKind::LBrack,
            RawToken::RBrack => TokenKind::RBrack,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Colon => TokenKind::Colon,
            RawToken::QMark => TokenKind::QMark,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Percent => TokenKind::Percent,
            RawToken::Pow => TokenKind::Pow,
            RawToken::Incr => TokenKind::Incr,
            RawToken::Decr => TokenKind::Decr,
            RawToken::Assign => TokenKind::Assign,
            RawToken::PlusAssign => TokenKind::PlusAssign,
            RawToken::MinusAssign => TokenKind::MinusAssign,
            RawToken::StarAssign => TokenKind::StarAssign,
            RawToken::SlashAssign => TokenKind::SlashAssign,
            RawToken::AndAssign => TokenKind::AndAssign,
            RawToken::OrAssign => TokenKind::OrAssign,
            RawToken::EqEq => TokenKind::EqEq,
            RawToken::NotEq => TokenKind::NotEq,
            RawToken::Lt => TokenKind::Lt,
            RawToken::LtEq => TokenKind::LtEq,
            RawToken::Gt => TokenKind::Gt,
            RawToken::GtEq => TokenKind::GtEq,
            RawToken::And => TokenKind::And,
            RawToken::Or => TokenKind::Or,
            RawToken::Bang => TokenKind::Bang,
            RawToken::Tilde => TokenKind::Tilde,
            RawToken::BitOr => TokenKind::BitOr,
            RawToken::BitXor => TokenKind::BitXor,
            RawToken::Shl => TokenKind::Shl,
            RawToken::Shr => TokenKind::Shr,
            RawToken::Fork => TokenKind::Fork,
            _ => return None,
        };
        Some(kind)
    }
}

/// Character-stream to token-stream scanner.
pub struct Lexer<'a> {
    raw: logos::Lexer<'a, RawToken>,
    filename: &'a str,
    line: usize,
    /// The current token.
    tok: Token,
    /// First error encountered. Once set, scanning stops.
    error: Option<LexError>,
}

impl<'a> Lexer<'a> {
    /// Create a new `Lexer` over `source`. `filename` is only used for diagnostics.
    pub fn new(source: &'a str, filename: &'a str) -> Self {
        Self {
            raw: RawToken::lexer(source),
            filename,
            line: 1,
            tok: Token::new(TokenKind::Eos, 1),
            error: None,
        }
    }

    /// The current token.
    pub fn token(&self) -> &Token {
        &self.tok
    }

    /// The current line number.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn filename(&self) -> &'a str {
        self.filename
    }

    /// The first lexical error, if any.
    pub fn error(&self) -> Option<&LexError> {
        self.error.as_ref()
    }

    /// Advances to the next token and stores it as the current token.
    /// Returns `false` at the end of source or on illegal input, `true` otherwise.
    pub fn scan(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }

        loop {
            let raw = match self.raw.next() {
                Some(raw) => raw,
                None => {
                    self.tok = Token::new(TokenKind::Eos, self.line);
                    return false;
                }
            };

            let line = self.line;
            let tok = match raw {
                RawToken::Newline => {
                    self.line += 1;
                    if self.tok.kind.ends_statement() {
                        // automatic statement terminator
                        Token::new(TokenKind::Semicolon, line)
                    } else {
                        continue;
                    }
                }
                RawToken::Word => self.scan_word(),
                RawToken::Int => {
                    let digits = self.raw.slice().replace('_', "");
                    match digits.parse::<i64>() {
                        Ok(val) => Token::with_value(TokenKind::Int, line, Literal::Int(val)),
                        Err(_) => {
                            return self.fail(LexError::MalformedNumber(
                                "integer literal out of range",
                            ))
                        }
                    }
                }
                RawToken::Hex => match i64::from_str_radix(&self.raw.slice()[2..], 16) {
                    Ok(val) => Token::with_value(TokenKind::Int, line, Literal::Int(val)),
                    Err(_) => {
                        return self.fail(LexError::MalformedNumber("hex literal out of range"))
                    }
                },
                RawToken::BadHex => {
                    return self.fail(LexError::MalformedNumber(
                        "hex literal expects one or more digits",
                    ))
                }
                RawToken::Double => {
                    let digits = self.raw.slice().replace('_', "");
                    match digits.parse::<f64>() {
                        Ok(val) => {
                            Token::with_value(TokenKind::Double, line, Literal::Double(val))
                        }
                        Err(_) => {
                            return self.fail(LexError::MalformedNumber("malformed float literal"))
                        }
                    }
                }
                RawToken::Exponent => match self.scan_exponent() {
                    Some(tok) => tok,
                    None => {
                        return self.fail(LexError::MalformedNumber(
                            "exponent literal out of range",
                        ))
                    }
                },
                RawToken::BadExponent => {
                    return self.fail(LexError::MalformedNumber(
                        "exponent expects one or more digits",
                    ))
                }
                RawToken::Str => {
                    let slice = self.raw.slice();
                    let newlines = slice.matches('\n').count();
                    let val = match unescape(&slice[2..slice.len() - 1]) {
                        Ok(val) => val,
                        Err(err) => return self.fail(err),
                    };
                    self.line += newlines;
                    Token::with_value(TokenKind::String, line, Literal::Str(val))
                }
                RawToken::UnterminatedStr => return self.fail(LexError::UnterminatedString),
                RawToken::Error => return self.fail(LexError::IllegalCharacter),
                other => match other.punctuation() {
                    Some(kind) => Token::new(kind, line),
                    None => return self.fail(LexError::IllegalCharacter),
                },
            };

            self.tok = tok;
            return true;
        }
    }

    /// Scans all remaining tokens. Stops at the end of source or at the first error.
    pub fn tokens(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while self.scan() {
            tokens.push(self.tok.clone());
        }
        tokens
    }

    /// Identifiers are case-folded before keyword matching; the language is case-insensitive.
    fn scan_word(&self) -> Token {
        let word = self.raw.slice().to_ascii_lowercase();
        match TokenKind::keyword(&word) {
            Some(kind) => Token::new(kind, self.line),
            None => Token::with_value(TokenKind::Id, self.line, Literal::Str(word)),
        }
    }

    /// `1e3` stays an integer; a fraction or a negative exponent makes a double.
    fn scan_exponent(&self) -> Option<Token> {
        let text = self.raw.slice().replace('_', "");
        let split = text.find(|c| c == 'e' || c == 'E')?;
        let (mantissa, exponent) = (&text[..split], &text[split + 1..]);
        let exponent: i32 = exponent.parse().ok()?;

        if !mantissa.contains('.') && exponent >= 0 {
            let mantissa: i64 = mantissa.parse().ok()?;
            let scale = 10i64.checked_pow(exponent as u32)?;
            let val = mantissa.checked_mul(scale)?;
            return Some(Token::with_value(TokenKind::Int, self.line, Literal::Int(val)));
        }

        let val: f64 = text.parse().ok()?;
        Some(Token::with_value(
            TokenKind::Double,
            self.line,
            Literal::Double(val),
        ))
    }

    fn fail(&mut self, error: LexError) -> bool {
        self.error = Some(error);
        self.tok = Token::new(TokenKind::Illegal, self.line);
        false
    }
}

/// Converts a hex digit into its value.
fn hex(c: char) -> Option<u32> {
    c.to_digit(16)
}

/// Translates the escape sequences of a string literal body.
fn unescape(body: &str) -> Result<String, LexError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let c = match chars.next() {
            Some('a') => '\x07',
            Some('b') => '\x08',
            Some('e') => '\x1b',
            Some('f') => '\x0c',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('v') => '\x0b',
            Some('x') => {
                let hi = chars.next().and_then(hex);
                let lo = chars.next().and_then(hex);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => (hi << 4 | lo) as u8 as char,
                    _ => return Err(LexError::InvalidHexEscape),
                }
            }
            Some(other) => other,
            None => return Err(LexError::UnterminatedString),
        };
        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, "test")
            .tokens()
            .into_iter()
            .map(|tok| tok.kind)
            .collect()
    }

    fn single(source: &str) -> Token {
        let mut lexer = Lexer::new(source, "test");
        assert!(lexer.scan(), "{:?}", lexer.error());
        lexer.token().clone()
    }

    fn lex_error(source: &str) -> LexError {
        let mut lexer = Lexer::new(source, "test");
        while lexer.scan() {}
        assert_eq!(lexer.token().kind, TokenKind::Illegal);
        lexer.error().cloned().expect("expected a lexical error")
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("DIM x As Integer"),
            vec![TokenKind::Dim, TokenKind::Id, TokenKind::As, TokenKind::Id]
        );
        assert_eq!(single("Foo").value, Literal::Str("foo".to_string()));
        assert_eq!(
            kinds("if then elseif else end do while loop"),
            vec![
                TokenKind::If,
                TokenKind::Then,
                TokenKind::ElseIf,
                TokenKind::Else,
                TokenKind::End,
                TokenKind::Do,
                TokenKind::While,
                TokenKind::Loop,
            ]
        );
        assert_eq!(
            kinds("and not declare function scope type return"),
            vec![
                TokenKind::BitAnd,
                TokenKind::Not,
                TokenKind::Declare,
                TokenKind::Function,
                TokenKind::Scope,
                TokenKind::Type,
                TokenKind::Return,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("+ ++ += - -- -= * ** *= / /= %"),
            vec![
                TokenKind::Plus,
                TokenKind::Incr,
                TokenKind::PlusAssign,
                TokenKind::Minus,
                TokenKind::Decr,
                TokenKind::MinusAssign,
                TokenKind::Star,
                TokenKind::Pow,
                TokenKind::StarAssign,
                TokenKind::Slash,
                TokenKind::SlashAssign,
                TokenKind::Percent,
            ]
        );
        assert_eq!(
            kinds("= == != <> < <= << > >= >> & && &&= | || ||= ^ ~ !"),
            vec![
                TokenKind::Assign,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Shl,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Shr,
                TokenKind::Fork,
                TokenKind::And,
                TokenKind::AndAssign,
                TokenKind::BitOr,
                TokenKind::Or,
                TokenKind::OrAssign,
                TokenKind::BitXor,
                TokenKind::Tilde,
                TokenKind::Bang,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(single("42").value, Literal::Int(42));
        assert_eq!(single("1_000").value, Literal::Int(1000));
        assert_eq!(single("0x1F").value, Literal::Int(31));
        assert_eq!(single("2.5").value, Literal::Double(2.5));
        assert_eq!(single("3.").value, Literal::Double(3.0));
        assert_eq!(single("1e3").value, Literal::Int(1000));
        assert_eq!(single("1.5e2").value, Literal::Double(150.0));
        assert_eq!(single("25e-1").value, Literal::Double(2.5));
        assert_eq!(single("0").value, Literal::Int(0));
    }

    #[test]
    fn test_literal_value_ignores_layout() {
        for source in &["42", "   42", "\t42 ' the answer", "\n\n42"] {
            assert_eq!(single(source).value, Literal::Int(42));
        }
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            single(r#"!"hello world""#).value,
            Literal::Str("hello world".to_string())
        );
        assert_eq!(
            single(r#"!"a\tb\n\x41\"""#).value,
            Literal::Str("a\tb\nA\"".to_string())
        );
        assert_eq!(single(r#"!"""#).value, Literal::Str(String::new()));
    }

    #[test]
    fn test_errors() {
        assert_eq!(lex_error(r#"!"abc"#), LexError::UnterminatedString);
        assert_eq!(lex_error(r#"!"\xZZ""#), LexError::InvalidHexEscape);
        assert_eq!(lex_error("x = $"), LexError::IllegalCharacter);
        assert_eq!(
            lex_error("0x"),
            LexError::MalformedNumber("hex literal expects one or more digits")
        );
        assert_eq!(
            lex_error("1e+"),
            LexError::MalformedNumber("exponent expects one or more digits")
        );
    }

    #[test]
    fn test_scanning_stops_after_error() {
        let mut lexer = Lexer::new("a $ b", "test");
        assert!(lexer.scan());
        assert!(!lexer.scan());
        assert!(!lexer.scan());
        assert_eq!(lexer.error(), Some(&LexError::IllegalCharacter));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a ' comment\nb"),
            vec![TokenKind::Id, TokenKind::Semicolon, TokenKind::Id]
        );
    }

    #[test]
    fn test_terminator_insertion() {
        let implicit = Lexer::new("a\nb", "test").tokens();
        let explicit = Lexer::new("a;\nb", "test").tokens();
        assert_eq!(implicit, explicit);

        for source in &["1\nb", "2.5\nb", "!\"s\"\nb", "return\nb"] {
            let kinds = kinds(source);
            assert_eq!(kinds[1], TokenKind::Semicolon, "after {:?}", source);
        }

        // a newline after any other token is whitespace
        assert_eq!(kinds("a +\nb"), vec![TokenKind::Id, TokenKind::Plus, TokenKind::Id]);
        assert_eq!(kinds("then\n\nend"), vec![TokenKind::Then, TokenKind::End]);
    }

    #[test]
    fn test_line_numbers() {
        let tokens = Lexer::new("a\n\nb\n!\"x\ny\"\nc", "test").tokens();
        let lines: Vec<_> = tokens.iter().map(|tok| (tok.kind, tok.line)).collect();
        assert_eq!(
            lines,
            vec![
                (TokenKind::Id, 1),
                (TokenKind::Semicolon, 1),
                (TokenKind::Id, 3),
                (TokenKind::Semicolon, 3),
                (TokenKind::String, 4),
                (TokenKind::Semicolon, 5),
                (TokenKind::Id, 6),
            ]
        );
    }

    #[test]
    fn test_token_display() {
        assert_eq!(single("foo").to_string(), "id foo");
        assert_eq!(single("42").to_string(), "int 42");
        assert_eq!(single("<>").to_string(), "!=");
        assert_eq!(TokenKind::Eos.to_string(), "end-of-source");
    }
}
