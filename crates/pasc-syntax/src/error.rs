use std::fmt;

use miette::SourceSpan;

use crate::text::SourceText;

/// Every diagnostic the compiler can produce.
///
/// Lexical variants are recorded into the [`ErrorLog`] and scanning goes on.
/// The rest abort the compilation at the first occurrence.
#[derive(thiserror::Error, miette::Diagnostic, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("unexpected character `{symbol}`")]
    #[diagnostic(code(pasc::lexical))]
    LexicalError {
        symbol: char,
        #[label("not part of the language")]
        span: SourceSpan,
    },

    #[error("string constant exceeds line")]
    #[diagnostic(
        code(pasc::string_exceeds_line),
        help("close the string with `'` before the end of the line")
    )]
    StringExceedsLine {
        #[label("string starts here")]
        span: SourceSpan,
    },

    #[error("comment is never closed")]
    #[diagnostic(code(pasc::comment_without_end), help("add a matching `}}`"))]
    CommentWithoutEnd {
        #[label("comment starts here")]
        span: SourceSpan,
    },

    #[error("malformed numeric constant")]
    #[diagnostic(code(pasc::const_error))]
    ConstError {
        #[label("expected a digit")]
        span: SourceSpan,
    },

    #[error("numeric constant is out of range")]
    #[diagnostic(code(pasc::overflow))]
    OverflowException {
        #[label("does not fit")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(code(pasc::syntax))]
    SyntaxError {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(code(pasc::type_error))]
    TypeError {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("undefined identifier `{name}`")]
    #[diagnostic(code(pasc::undefined_identifier))]
    UndefinedIdentifier {
        name: String,
        #[label("not declared")]
        span: SourceSpan,
    },

    #[error("identifier `{name}` is already declared")]
    #[diagnostic(code(pasc::duplicate_identifier))]
    DuplicateIdentifier {
        name: String,
        #[label("declared again here")]
        span: SourceSpan,
    },
}

/// The error taxonomy without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    LexicalError,
    StringExceedsLine,
    CommentWithoutEnd,
    ConstError,
    OverflowException,
    SyntaxError,
    TypeError,
    UndefinedIdentifier,
    DuplicateIdentifier,
}

impl CompilerError {
    pub fn syntax(message: impl Into<String>, span: impl Into<SourceSpan>) -> Self {
        CompilerError::SyntaxError {
            message: message.into(),
            span: span.into(),
        }
    }

    pub fn type_error(message: impl Into<String>, span: impl Into<SourceSpan>) -> Self {
        CompilerError::TypeError {
            message: message.into(),
            span: span.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CompilerError::LexicalError { .. } => ErrorCode::LexicalError,
            CompilerError::StringExceedsLine { .. } => ErrorCode::StringExceedsLine,
            CompilerError::CommentWithoutEnd { .. } => ErrorCode::CommentWithoutEnd,
            CompilerError::ConstError { .. } => ErrorCode::ConstError,
            CompilerError::OverflowException { .. } => ErrorCode::OverflowException,
            CompilerError::SyntaxError { .. } => ErrorCode::SyntaxError,
            CompilerError::TypeError { .. } => ErrorCode::TypeError,
            CompilerError::UndefinedIdentifier { .. } => ErrorCode::UndefinedIdentifier,
            CompilerError::DuplicateIdentifier { .. } => ErrorCode::DuplicateIdentifier,
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            CompilerError::LexicalError { span, .. }
            | CompilerError::StringExceedsLine { span }
            | CompilerError::CommentWithoutEnd { span }
            | CompilerError::ConstError { span }
            | CompilerError::OverflowException { span }
            | CompilerError::SyntaxError { span, .. }
            | CompilerError::TypeError { span, .. }
            | CompilerError::UndefinedIdentifier { span, .. }
            | CompilerError::DuplicateIdentifier { span, .. } => *span,
        }
    }

    pub fn position(&self) -> usize {
        self.span().offset()
    }

    /// Syntax and semantic errors stop the compilation, lexical ones do not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::SyntaxError
                | ErrorCode::TypeError
                | ErrorCode::UndefinedIdentifier
                | ErrorCode::DuplicateIdentifier
        )
    }
}

/// Lexical diagnostics in the order they were found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorLog {
    errors: Vec<CompilerError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CompilerError) {
        debug_assert!(!error.is_fatal(), "fatal errors are never logged");
        tracing::trace!(position = error.position(), "{error}");
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompilerError> {
        self.errors.iter()
    }

}

impl IntoIterator for ErrorLog {
    type Item = CompilerError;
    type IntoIter = std::vec::IntoIter<CompilerError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// A located diagnostic, ready to be presented by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub position: usize,
    /// Zero-based line index.
    pub line: usize,
    pub error: CompilerError,
}

impl Diagnostic {
    pub fn new(text: &SourceText, error: CompilerError) -> Self {
        let position = error.position();
        Diagnostic {
            position,
            line: text.line_index(position),
            error,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.error.code()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line + 1, self.error)
    }
}

/// Why [`crate::compile`] produced no program.
#[derive(thiserror::Error, miette::Diagnostic, Debug, Clone, PartialEq)]
#[error("compilation failed with {count} error(s)")]
pub struct CompileFailure {
    /// Lexical diagnostics, in source order.
    #[related]
    pub diagnostics: Vec<CompilerError>,
    /// The syntax or semantic error that stopped the parse, if any.
    pub fatal: Option<Diagnostic>,
    lines: Vec<usize>,
    count: usize,
}

impl CompileFailure {
    pub fn new(text: &SourceText, log: ErrorLog, fatal: Option<CompilerError>) -> Self {
        let diagnostics: Vec<_> = log.into_iter().collect();
        let lines = diagnostics
            .iter()
            .map(|e| text.line_index(e.position()))
            .collect();
        let count = diagnostics.len() + usize::from(fatal.is_some());
        CompileFailure {
            diagnostics,
            fatal: fatal.map(|error| Diagnostic::new(text, error)),
            lines,
            count,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Lexical diagnostics followed by the fatal one.
    pub fn all(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .iter()
            .zip(&self.lines)
            .map(|(error, &line)| Diagnostic {
                position: error.position(),
                line,
                error: error.clone(),
            })
            .chain(self.fatal.clone())
            .collect()
    }

    pub fn codes(&self) -> Vec<ErrorCode> {
        self.all().iter().map(Diagnostic::code).collect()
    }
}
