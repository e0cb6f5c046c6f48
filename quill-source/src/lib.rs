//! Source code representation and error management.

use std::{cell::RefCell, fmt};

/// Name used as the prefix of every diagnostic line.
pub const TOOL_NAME: &str = "quill";

/// Represents source code.
pub struct Source<'a> {
    /// Original source code.
    pub content: &'a str,
    /// File the source was read from. `stdin` when piped.
    pub filename: &'a str,
    /// Accumulated semantic errors.
    pub errors: ErrorReporter,
}

impl<'a> Source<'a> {
    /// Create a new `Source` with the specified `content` read from `stdin`.
    pub fn new(content: &'a str) -> Self {
        Self::with_filename(content, "stdin")
    }

    /// Create a new `Source` with the specified `content` and `filename`.
    pub fn with_filename(content: &'a str, filename: &'a str) -> Self {
        Self {
            content,
            filename,
            errors: ErrorReporter::new(),
        }
    }

    /// Returns `true` if `Source` has no accumulated errors. Returns `false` otherwise.
    pub fn has_no_errors(&self) -> bool {
        self.errors.errors.borrow().is_empty()
    }
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(content: &'a str) -> Self {
        Source::new(content)
    }
}

/// Whether a [`SyntaxError`] was raised by the lexer or by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// The lexer rejected the input (illegal character, bad literal).
    Lexical,
    /// The token stream does not match the grammar.
    Parse,
}

impl SyntaxErrorKind {
    /// The word used for this kind in the diagnostic line.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyntaxErrorKind::Lexical => "syntax",
            SyntaxErrorKind::Parse => "parse",
        }
    }
}

/// Represents a syntax error (compile time error).
///
/// Only the first syntax error of a compilation is ever reported. Its
/// [`Display`](fmt::Display) implementation renders the single diagnostic line:
/// `quill(<file>:<line>). <parse|syntax> error in <context>, <message>.`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "{tool}({file}:{line}). {category} error in {context}, {message}.",
    tool = TOOL_NAME,
    category = .kind.as_str()
)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub file: String,
    pub line: usize,
    /// The grammar production that was being parsed.
    pub context: String,
    pub message: String,
}

impl SyntaxError {
    /// Create a new syntax error.
    pub fn new(
        kind: SyntaxErrorKind,
        file: impl ToString,
        line: usize,
        context: impl ToString,
        message: impl ToString,
    ) -> Self {
        Self {
            kind,
            file: file.to_string(),
            line,
            context: context.to_string(),
            message: message.to_string(),
        }
    }
}

/// Category of a [`SemanticError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticErrorKind {
    /// Use of a variable or function that is not in scope.
    UndeclaredVariable,
    /// Argument count or keyword argument mismatch at a call site.
    Arguments,
    /// Any other semantic violation (redeclaration, unknown type, ...).
    Semantic,
    /// Operands whose types can never be combined by the operator.
    OperandTypes,
    /// Division by a literal zero.
    DivisionByZero,
}

impl SemanticErrorKind {
    /// Process exit code reported for this kind of error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SemanticErrorKind::UndeclaredVariable => 3,
            SemanticErrorKind::Arguments => 4,
            SemanticErrorKind::Semantic => 6,
            SemanticErrorKind::OperandTypes => 53,
            SemanticErrorKind::DivisionByZero => 57,
        }
    }
}

/// Represents a semantic error. Unlike [`SyntaxError`]s, semantic errors are collected
/// and reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub message: String,
    pub line: usize,
}

impl SemanticError {
    /// Create a new semantic error with the specified `message` at `line`.
    pub fn new(kind: SemanticErrorKind, message: impl ToString, line: usize) -> Self {
        Self {
            kind,
            message: message.to_string(),
            line,
        }
    }
}

/// Manages all the errors.
pub struct ErrorReporter {
    errors: RefCell<Vec<SemanticError>>,
}

impl ErrorReporter {
    /// Create an empty `ErrorReporter`.
    pub fn new() -> Self {
        Self {
            errors: RefCell::new(Vec::new()),
        }
    }

    /// Adds an error to the `ErrorReporter`.
    /// This method uses the interior mutability pattern. This does not require mutability for ergonomics.
    pub fn add_error(&self, error: SemanticError) {
        // This should be the only place where self.errors is borrowed mutably.
        self.errors.borrow_mut().push(error);
    }

    /// Returns a copy of the accumulated errors, in the order they were reported.
    pub fn errors(&self) -> Vec<SemanticError> {
        self.errors.borrow().clone()
    }

    /// Number of accumulated errors.
    pub fn len(&self) -> usize {
        self.errors.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors.borrow();
        for error in errors.iter() {
            writeln!(
                f,
                "ERROR: {message} at line {line}",
                message = error.message,
                line = error.line
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_line() {
        let err = SyntaxError::new(
            SyntaxErrorKind::Parse,
            "main.q",
            3,
            "if statement",
            "missing 'then'",
        );
        assert_eq!(
            err.to_string(),
            "quill(main.q:3). parse error in if statement, missing 'then'."
        );

        let err = SyntaxError::new(
            SyntaxErrorKind::Lexical,
            "stdin",
            1,
            "statement",
            "unterminated string literal",
        );
        assert_eq!(
            err.to_string(),
            "quill(stdin:1). syntax error in statement, unterminated string literal."
        );

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.to_string().starts_with("quill(stdin:1). "));
    }

    #[test]
    fn test_reporter_accumulates() {
        let source = Source::new("x = 1");
        assert!(source.has_no_errors());
        source.errors.add_error(SemanticError::new(
            SemanticErrorKind::UndeclaredVariable,
            "undeclared variable `x`",
            1,
        ));
        source.errors.add_error(SemanticError::new(
            SemanticErrorKind::DivisionByZero,
            "division by zero",
            2,
        ));
        assert!(!source.has_no_errors());
        assert_eq!(source.errors.len(), 2);
        assert_eq!(
            source.errors.to_string(),
            "ERROR: undeclared variable `x` at line 1\nERROR: division by zero at line 2\n"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SemanticErrorKind::UndeclaredVariable.exit_code(), 3);
        assert_eq!(SemanticErrorKind::Arguments.exit_code(), 4);
        assert_eq!(SemanticErrorKind::DivisionByZero.exit_code(), 57);
    }
}
