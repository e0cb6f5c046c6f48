//! The quill compiler pipeline: lex, parse, resolve and generate.
//!
//! ```no_run
//! use quill::{compile, CompileOptions};
//!
//! let program = compile("dim a as integer = 1 + 2", &CompileOptions::default()).unwrap();
//! print!("{}", program.as_text().unwrap());
//! ```

pub use quill_codegen::{Backend, GenError, GeneratedProgram};

use quill_codegen::generate;
use quill_parser::lexer::Lexer;
use quill_parser::parser::parse;
use quill_parser::pretty::pretty_print;
use quill_passes::resolve::Resolver;
use quill_source::{SemanticError, Source, SyntaxError, SyntaxErrorKind};
use thiserror::Error;

/// Exit code for failures inside code generation.
pub const CODEGEN_EXIT_CODE: i32 = 99;

/// Configuration of a single compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub backend: Backend,
    /// Name used in diagnostics.
    pub filename: String,
    /// Print the token stream to stderr.
    pub dump_tokens: bool,
    /// Print the AST to stderr.
    pub dump_ast: bool,
    /// Print the disassembled chunk to stderr. Only has an effect with [`Backend::Register`].
    pub dump_chunk: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            filename: "stdin".to_string(),
            dump_tokens: false,
            dump_ast: false,
            dump_chunk: false,
        }
    }
}

impl CompileOptions {
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn filename(mut self, filename: impl ToString) -> Self {
        self.filename = filename.to_string();
        self
    }

    pub fn dump_tokens(mut self, dump: bool) -> Self {
        self.dump_tokens = dump;
        self
    }

    pub fn dump_ast(mut self, dump: bool) -> Self {
        self.dump_ast = dump;
        self
    }

    pub fn dump_chunk(mut self, dump: bool) -> Self {
        self.dump_chunk = dump;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The first lexical or parse error. Its display is the one line report.
    #[error("{0}")]
    Syntax(#[from] SyntaxError),
    /// Every semantic error found, in source order.
    #[error("{}", semantic_report(.0))]
    Semantic(Vec<SemanticError>),
    #[error("code generation failed: {0}")]
    Codegen(#[from] GenError),
}

impl CompileError {
    /// Process exit code for this error. Semantic errors report the kind of the first error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Syntax(err) => match err.kind {
                SyntaxErrorKind::Lexical => 1,
                SyntaxErrorKind::Parse => 2,
            },
            CompileError::Semantic(errors) => errors
                .first()
                .map_or(CODEGEN_EXIT_CODE, |err| err.kind.exit_code()),
            CompileError::Codegen(_) => CODEGEN_EXIT_CODE,
        }
    }
}

fn semantic_report(errors: &[SemanticError]) -> String {
    errors
        .iter()
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compiles `content` according to `options`.
pub fn compile(content: &str, options: &CompileOptions) -> Result<GeneratedProgram, CompileError> {
    let source = Source::with_filename(content, &options.filename);

    if options.dump_tokens {
        let mut lexer = Lexer::new(source.content, source.filename);
        for token in lexer.tokens() {
            eprintln!("{:>4} : {}", token.line, token);
        }
    }

    let ast = parse(&source)?;
    if options.dump_ast {
        eprintln!("{}", pretty_print(&ast));
    }

    let mut resolver = Resolver::new(&source);
    resolver.resolve_program(&ast);
    if !source.has_no_errors() {
        return Err(CompileError::Semantic(source.errors.errors()));
    }

    let program = generate(&ast, options.backend)?;
    if options.dump_chunk {
        if let Some(chunk) = program.as_chunk() {
            eprintln!("{}", chunk);
        }
    }

    Ok(program)
}
