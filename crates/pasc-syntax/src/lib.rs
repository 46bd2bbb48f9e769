//! Single-pass compiler for a small subset of Pascal.
//!
//! Source text goes through the [`lexer`], then the [`parser`], which type
//! checks and emits stack-machine instructions as it recognizes each
//! construct. The result is a [`Program`] or a [`CompileFailure`] listing
//! every diagnostic.

pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod text;
pub mod token;
pub mod types;

pub use codegen::{Instr, Program, Value};
pub use error::{CompileFailure, CompilerError, Diagnostic, ErrorCode, ErrorLog};
pub use lexer::Lexer;
pub use parser::Parser;
pub use text::SourceText;
pub use token::{SpecialSymbol, Token, TokenKind, Trivia};
pub use types::CType;

/// Compiles `source` into a program.
///
/// Lexical errors don't stop the parse, but any of them means no program is
/// returned. The first syntax or semantic error stops everything.
pub fn compile(source: &str) -> Result<Program, CompileFailure> {
    let text = SourceText::new(source);
    let mut parser = Parser::new(Lexer::new(&text));
    let outcome = parser.parse_program();
    let (errors, codegen) = parser.finish();

    match outcome {
        Err(fatal) => {
            tracing::debug!(code = ?fatal.code(), position = fatal.position(), "parse stopped");
            Err(CompileFailure::new(&text, errors, Some(fatal)))
        }
        Ok(()) if !errors.is_empty() => {
            tracing::debug!(errors = errors.len(), "lexical errors");
            Err(CompileFailure::new(&text, errors, None))
        }
        Ok(()) => {
            let program = codegen.finalize();
            tracing::debug!(
                slots = program.slots.len(),
                instructions = program.code.len(),
                "compiled"
            );
            Ok(program)
        }
    }
}

/// Every token of `source` up to and including end of file, with the
/// lexical errors found on the way.
pub fn tokenize(source: &str) -> (Vec<Token>, ErrorLog) {
    let text = SourceText::new(source);
    let mut lexer = Lexer::new(&text);
    let tokens = lexer.by_ref().collect();
    (tokens, lexer.into_errors())
}
