//! Code generation. Two backends share one driver:
//! * [`Backend::Register`] lowers the AST into a register bytecode [`Chunk`] (see [`bytecode`]).
//! * [`Backend::Text`] emits IFJcode17 three-address assembly through a [`Sink`] (see [`asm`]).

pub mod asm;
pub mod bytecode;

pub use asm::Sink;

use quill_parser::ast::{Block, NodeKind};
use quill_parser::lexer::TokenKind;
use quill_value::chunk::Chunk;
use thiserror::Error;

/// Selects the emitter used by [`generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Register,
    Text,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Text
    }
}

/// Output of [`generate`].
#[derive(Debug, Clone)]
pub enum GeneratedProgram {
    Bytecode(Chunk),
    Text(String),
}

impl GeneratedProgram {
    pub fn as_chunk(&self) -> Option<&Chunk> {
        match self {
            GeneratedProgram::Bytecode(chunk) => Some(chunk),
            GeneratedProgram::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            GeneratedProgram::Text(text) => Some(text),
            GeneratedProgram::Bytecode(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    #[error("line {line}: {construct} is not supported by this backend")]
    Unsupported { construct: String, line: usize },
    #[error("line {line}: out of registers")]
    RegisterOverflow { line: usize },
    #[error("line {line}: too many constants")]
    ConstantOverflow { line: usize },
    #[error("line {line}: jump target out of range")]
    JumpOutOfRange { line: usize },
    #[error("line {line}: invalid assignment target")]
    InvalidAssignTarget { line: usize },
    #[error("line {line}: undeclared variable `{name}`")]
    UndeclaredVariable { name: String, line: usize },
    #[error("line {line}: missing argument `{param}` in call to `{function}`")]
    MissingArgument {
        function: String,
        param: String,
        line: usize,
    },
    #[error("line {line}: unknown keyword argument `{keyword}` in call to `{function}`")]
    UnknownKeyword {
        function: String,
        keyword: String,
        line: usize,
    },
}

impl GenError {
    pub(crate) fn unsupported(construct: impl ToString, line: usize) -> Self {
        GenError::Unsupported {
            construct: construct.to_string(),
            line,
        }
    }
}

fn is_assignment(op: TokenKind) -> bool {
    matches!(
        op,
        TokenKind::Assign
            | TokenKind::PlusAssign
            | TokenKind::MinusAssign
            | TokenKind::StarAssign
            | TokenKind::SlashAssign
            | TokenKind::AndAssign
            | TokenKind::OrAssign
    )
}

/// Names a construct in [`GenError::Unsupported`].
fn describe(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Call { .. } => "function call",
        NodeKind::Array(_) => "array literal",
        NodeKind::Hash(_) => "hash literal",
        NodeKind::Subscript { .. } => "subscript",
        NodeKind::Slot { .. } => "member access",
        NodeKind::Dim(_) => "dim expression",
        NodeKind::Function(_) | NodeKind::Declare(_) => "function definition",
        _ => "statement in expression position",
    }
}

/// Generates a program for `backend`.
pub fn generate(program: &Block, backend: Backend) -> Result<GeneratedProgram, GenError> {
    match backend {
        Backend::Register => {
            let mut codegen = bytecode::Codegen::new("<global>".to_string());
            codegen.codegen_program(program)?;
            Ok(GeneratedProgram::Bytecode(codegen.into_inner_chunk()))
        }
        Backend::Text => {
            let mut text = String::new();
            generate_text(program, &mut text)?;
            Ok(GeneratedProgram::Text(text))
        }
    }
}

/// Emits the textual program line by line into `sink`.
///
/// Lines emitted before an error stay in the sink.
pub fn generate_text<S: Sink + ?Sized>(program: &Block, sink: &mut S) -> Result<(), GenError> {
    asm::AsmGen::new(sink).generate_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_parser::parser::parse;
    use quill_source::Source;

    fn ast(source: &str) -> Block {
        parse(&Source::new(source)).expect("program should parse")
    }

    #[test]
    fn test_backend_selection() {
        let program = ast("dim a as integer = 1");

        let bytecode = generate(&program, Backend::Register).unwrap();
        assert!(bytecode.as_chunk().is_some());
        assert!(bytecode.as_text().is_none());

        let text = generate(&program, Backend::Text).unwrap();
        let text = text.as_text().unwrap();
        assert!(text.starts_with(".IFJcode17\n"));
        assert!(text.contains("MOVE GF@a int@1\n"));
    }

    #[test]
    fn test_sinks_agree() {
        let program = ast("dim a = 1\nif a < 2 then\na = 2\nend");

        let mut text = String::new();
        generate_text(&program, &mut text).unwrap();
        let mut lines: Vec<String> = Vec::new();
        generate_text(&program, &mut lines).unwrap();

        assert_eq!(lines.join("\n") + "\n", text);
    }

    #[test]
    fn test_independent_runs() {
        let program = ast("while 1 < 2\nif 1 < 2 then\nend\nloop");
        let first = generate(&program, Backend::Text).unwrap();
        let second = generate(&program, Backend::Text).unwrap();
        assert_eq!(first.as_text(), second.as_text());
    }
}
