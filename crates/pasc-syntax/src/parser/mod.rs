//! Recursive-descent parser with one token of lookahead.
//!
//! Parsing, type checking and code emission happen in the same pass: every
//! production checks its operands and immediately asks the
//! [`CodeGenerator`] for instructions. Nothing can be taken back once
//! emitted, so the first syntax or semantic error ends the parse.

mod expression;

use miette::SourceSpan;
use tracing::debug;

use crate::codegen::CodeGenerator;
use crate::error::{CompilerError, ErrorLog};
use crate::lexer::Lexer;
use crate::scope::{IdentifierInfo, Purpose, ScopeManager, Storage};
use crate::token::{SpecialSymbol, Token, TokenKind, Trivia};
use crate::types::CType;

pub type ParseResult<T> = Result<T, CompilerError>;

/// Name of the print intrinsic.
pub const PRINT_INTRINSIC: &str = "writeln";

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    token: Token,
    /// End offset of the previously consumed token.
    last_end: usize,
    scopes: ScopeManager,
    codegen: CodeGenerator,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        let mut parser = Parser {
            lexer,
            token: Token::new(TokenKind::Trivia(Trivia::EndOfFile), 0, 0),
            last_end: 0,
            scopes: ScopeManager::new(),
            codegen: CodeGenerator::new(),
        };
        parser.advance();
        parser.last_end = 0;
        parser
    }

    /// Lexical diagnostics and everything emitted so far.
    pub fn finish(self) -> (ErrorLog, CodeGenerator) {
        (self.lexer.into_errors(), self.codegen)
    }

    /// Moves to the next meaningful token. Malformed and unknown tokens were
    /// already logged by the lexer and are skipped here.
    fn advance(&mut self) {
        self.last_end = self.token.position + self.token.len;
        loop {
            self.token = self.lexer.next_token();
            match self.token.kind {
                TokenKind::Trivia(Trivia::Bad | Trivia::UnknownSymbol) => continue,
                _ => break,
            }
        }
    }

    fn at(&self, symbol: SpecialSymbol) -> bool {
        self.token.is_symbol(symbol)
    }

    fn span_from(&self, start: usize) -> SourceSpan {
        (start, self.last_end.saturating_sub(start)).into()
    }

    fn unexpected(&self, expected: &str) -> CompilerError {
        CompilerError::syntax(
            format!("expected {expected}, found {}", self.token.kind),
            self.token.span(),
        )
    }

    fn unsupported(&self, what: &str) -> CompilerError {
        CompilerError::syntax(format!("{what} are not supported"), self.token.span())
    }

    fn accept(&mut self, symbol: SpecialSymbol) -> ParseResult<()> {
        if !self.at(symbol) {
            return Err(self.unexpected(&format!("`{symbol}`")));
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self) -> ParseResult<(String, SourceSpan)> {
        let TokenKind::Identifier(name) = &self.token.kind else {
            return Err(self.unexpected("identifier"));
        };
        let ident = (name.clone(), self.token.span());
        self.advance();
        Ok(ident)
    }

    /// `program <name> ; <block> .`
    pub fn parse_program(&mut self) -> ParseResult<()> {
        self.accept(SpecialSymbol::Program)?;
        let (name, _) = self.expect_identifier()?;
        debug!(program = %name, "parsing program");
        self.accept(SpecialSymbol::Semicolon)?;
        self.block()?;
        self.accept(SpecialSymbol::Dot)
    }

    fn block(&mut self) -> ParseResult<()> {
        self.reject_unsupported_section()?;
        self.variable_part()?;
        self.reject_unsupported_section()?;
        self.statement_part()
    }

    fn reject_unsupported_section(&self) -> ParseResult<()> {
        use SpecialSymbol::*;
        match self.token.kind {
            TokenKind::Special(Label) => Err(self.unsupported("label declarations")),
            TokenKind::Special(Const) => Err(self.unsupported("constant declarations")),
            TokenKind::Special(Type) => Err(self.unsupported("type declarations")),
            TokenKind::Special(Procedure | Function) => {
                Err(self.unsupported("procedure and function declarations"))
            }
            _ => Ok(()),
        }
    }

    /// `var <decl> ; { <decl> ; }`, or nothing.
    fn variable_part(&mut self) -> ParseResult<()> {
        if !self.at(SpecialSymbol::Var) {
            return Ok(());
        }
        self.advance();
        loop {
            self.variable_declaration()?;
            self.accept(SpecialSymbol::Semicolon)?;
            if !matches!(self.token.kind, TokenKind::Identifier(_)) {
                return Ok(());
            }
        }
    }

    /// `<name> { , <name> } : <type>`
    fn variable_declaration(&mut self) -> ParseResult<()> {
        let mut names = vec![self.expect_identifier()?];
        while self.at(SpecialSymbol::Comma) {
            self.advance();
            names.push(self.expect_identifier()?);
        }
        self.accept(SpecialSymbol::Colon)?;
        let ty = self.type_name()?;

        for (name, span) in names {
            let slot = self.codegen.declare_slot(ty);
            self.scopes
                .declare(&name, IdentifierInfo::variable(ty, slot), span)?;
        }
        Ok(())
    }

    fn type_name(&mut self) -> ParseResult<CType> {
        use SpecialSymbol::*;
        match &self.token.kind {
            TokenKind::Identifier(name) => {
                let span = self.token.span();
                let info = self.scopes.lookup(name, span)?;
                if info.purpose != Purpose::ProgType || !self.scopes.is_registered_type(info.ty) {
                    return Err(CompilerError::type_error(
                        format!("`{name}` is not a type"),
                        span,
                    ));
                }
                let ty = info.ty;
                self.advance();
                Ok(ty)
            }
            TokenKind::Special(Array) => Err(self.unsupported("array types")),
            TokenKind::Special(Record) => Err(self.unsupported("record types")),
            TokenKind::Special(Set) => Err(self.unsupported("set types")),
            TokenKind::Special(File) => Err(self.unsupported("file types")),
            TokenKind::Special(Packed) => Err(self.unsupported("packed types")),
            _ => Err(self.unexpected("type name")),
        }
    }

    /// `begin <statement> { ; <statement> } end`. A trailing `;` before
    /// `end` is allowed, and so is an empty body.
    fn statement_part(&mut self) -> ParseResult<()> {
        self.accept(SpecialSymbol::Begin)?;
        if self.at(SpecialSymbol::End) {
            self.advance();
            return Ok(());
        }
        self.statement()?;
        while self.at(SpecialSymbol::Semicolon) {
            self.advance();
            if self.at(SpecialSymbol::End) {
                break;
            }
            self.statement()?;
        }
        self.accept(SpecialSymbol::End)
    }

    fn statement(&mut self) -> ParseResult<()> {
        use SpecialSymbol::*;
        match &self.token.kind {
            TokenKind::Identifier(name) => {
                let (name, span) = (name.clone(), self.token.span());
                self.advance();
                if self.at(Assignment) {
                    self.assignment(&name, span)
                } else if self.at(LeftParen) {
                    self.procedure_call(&name, span)
                } else {
                    Err(self.unexpected(&format!("`:=` or `(` after `{name}`")))
                }
            }
            TokenKind::Special(Begin) => self.statement_part(),
            TokenKind::Special(If) => self.if_statement(),
            TokenKind::Special(While) => self.while_statement(),
            TokenKind::Special(Case) => Err(self.unsupported("`case` statements")),
            TokenKind::Special(Repeat) => Err(self.unsupported("`repeat` loops")),
            TokenKind::Special(For) => Err(self.unsupported("`for` loops")),
            TokenKind::Special(With) => Err(self.unsupported("`with` statements")),
            TokenKind::Special(Goto) => Err(self.unsupported("`goto` statements")),
            _ => Err(self.unexpected("statement")),
        }
    }

    /// `<variable> := <expression>`, the identifier already consumed.
    fn assignment(&mut self, name: &str, span: SourceSpan) -> ParseResult<()> {
        let info = self.scopes.lookup(name, span)?;
        let (target, slot) = match (info.purpose, &info.storage) {
            (Purpose::Variable, Storage::Slot(slot)) => (info.ty, *slot),
            (purpose, _) => {
                return Err(CompilerError::type_error(
                    format!("cannot assign to {} `{name}`", describe(purpose)),
                    span,
                ));
            }
        };
        self.accept(SpecialSymbol::Assignment)?;

        let start = self.token.position;
        let ty = self.expression()?;
        if ty == CType::Integer && target == CType::Real {
            self.codegen.widen();
        } else if ty != target {
            return Err(CompilerError::type_error(
                format!("cannot assign a value of type {ty} to `{name}` of type {target}"),
                self.span_from(start),
            ));
        }
        self.codegen.store(slot);
        debug!(variable = name, %ty, "assignment");
        Ok(())
    }

    /// `writeln ( [ <expression> { , <expression> } ] )`
    fn procedure_call(&mut self, name: &str, span: SourceSpan) -> ParseResult<()> {
        if !name.eq_ignore_ascii_case(PRINT_INTRINSIC) {
            let info = self.scopes.lookup(name, span)?;
            return Err(CompilerError::type_error(
                format!("{} `{name}` is not a procedure", describe(info.purpose)),
                span,
            ));
        }
        self.accept(SpecialSymbol::LeftParen)?;
        let mut arguments = 0;
        if !self.at(SpecialSymbol::RightParen) {
            loop {
                let ty = self.expression()?;
                self.codegen.print(ty);
                arguments += 1;
                if !self.at(SpecialSymbol::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.accept(SpecialSymbol::RightParen)?;
        debug!(arguments, "print call");
        Ok(())
    }

    fn condition(&mut self, statement: &str) -> ParseResult<()> {
        let start = self.token.position;
        let ty = self.expression()?;
        if ty != CType::Boolean {
            return Err(CompilerError::type_error(
                format!("`{statement}` condition must be boolean, found {ty}"),
                self.span_from(start),
            ));
        }
        Ok(())
    }

    /// `if <expression> then <statement> [ else <statement> ]`
    fn if_statement(&mut self) -> ParseResult<()> {
        self.accept(SpecialSymbol::If)?;
        self.condition("if")?;
        self.accept(SpecialSymbol::Then)?;

        let false_label = self.codegen.define_label();
        let end_label = self.codegen.define_label();
        self.codegen.branch_if_false(false_label);
        self.statement()?;
        self.codegen.branch(end_label);
        self.codegen.mark_label(false_label);
        if self.at(SpecialSymbol::Else) {
            self.advance();
            self.statement()?;
        }
        self.codegen.mark_label(end_label);
        debug!("if statement");
        Ok(())
    }

    /// `while <expression> do <statement>`
    fn while_statement(&mut self) -> ParseResult<()> {
        self.accept(SpecialSymbol::While)?;
        let loop_label = self.codegen.define_label();
        let end_label = self.codegen.define_label();
        self.codegen.mark_label(loop_label);
        self.condition("while")?;
        self.accept(SpecialSymbol::Do)?;

        self.codegen.branch_if_false(end_label);
        self.statement()?;
        self.codegen.branch(loop_label);
        self.codegen.mark_label(end_label);
        debug!("while statement");
        Ok(())
    }
}

fn describe(purpose: Purpose) -> &'static str {
    match purpose {
        Purpose::Const => "constant",
        Purpose::Variable => "variable",
        Purpose::ProgType => "type",
        Purpose::Procedure => "procedure",
        Purpose::Function => "function",
    }
}
