//! Turns source text into tokens, one at a time.
//!
//! Lexical errors never stop the scan. Each one is recorded in the
//! [`ErrorLog`] and replaced by a trivia token so the parser can keep going.

use crate::error::{CompilerError, ErrorLog};
use crate::text::SourceText;
use crate::token::{SpecialSymbol, Token, TokenKind, Trivia};

pub struct Lexer<'a> {
    text: &'a SourceText,
    /// Byte offset of the character under consideration.
    cursor: usize,
    errors: ErrorLog,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a SourceText) -> Self {
        Lexer {
            text,
            cursor: 0,
            errors: ErrorLog::new(),
            finished: false,
        }
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    pub fn into_errors(self) -> ErrorLog {
        self.errors
    }

    fn current(&self) -> Option<char> {
        self.text.char_at(self.cursor)
    }

    fn lookahead(&self) -> Option<char> {
        let width = self.current().map_or(0, char::len_utf8);
        self.text.char_at(self.cursor + width)
    }

    fn bump(&mut self) {
        if let Some(c) = self.current() {
            self.cursor += c.len_utf8();
        }
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.cursor;
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        self.cursor - start
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, start, self.cursor - start)
    }

    fn bad(&self, start: usize) -> Token {
        self.token(TokenKind::Trivia(Trivia::Bad), start)
    }

    /// Line breaks, blanks and `{ ... }` comments.
    fn skip_insignificant(&mut self) {
        loop {
            match self.current() {
                Some('{') => self.skip_comment(),
                Some('\r' | '\n' | ' ' | '\t') => self.bump(),
                _ => return,
            }
        }
    }

    fn skip_comment(&mut self) {
        let start = self.cursor;
        self.bump();
        loop {
            match self.current() {
                Some('}') => {
                    self.bump();
                    return;
                }
                None | Some('{') => {
                    self.errors.push(CompilerError::CommentWithoutEnd {
                        span: (start, 1).into(),
                    });
                    // A nested `{` closes the comment.
                    self.bump();
                    return;
                }
                Some(_) => self.bump(),
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_insignificant();

        let start = self.cursor;
        let Some(c) = self.current() else {
            return Token::new(TokenKind::Trivia(Trivia::EndOfFile), start, 0);
        };

        let token = match c {
            '\'' => self.read_string(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() => self.read_identifier(),
            _ => self.read_symbol(c),
        };
        tracing::trace!(position = token.position, "token {}", token.kind);
        token
    }

    fn read_symbol(&mut self, c: char) -> Token {
        use SpecialSymbol::*;

        let start = self.cursor;
        let next = self.lookahead();
        let (symbol, width) = match (c, next) {
            ('<', Some('=')) => (Some(LessOrEqual), 2),
            ('<', Some('>')) => (Some(NotEqual), 2),
            ('>', Some('=')) => (Some(GreaterOrEqual), 2),
            (':', Some('=')) => (Some(Assignment), 2),
            ('.', Some('.')) => (Some(DoubleDot), 2),
            ('<', _) => (Some(Less), 1),
            ('>', _) => (Some(Greater), 1),
            (':', _) => (Some(Colon), 1),
            ('.', _) => (Some(Dot), 1),
            ('+', _) => (Some(Plus), 1),
            ('-', _) => (Some(Minus), 1),
            ('*', _) => (Some(Star), 1),
            ('/', _) => (Some(Slash), 1),
            ('(', _) => (Some(LeftParen), 1),
            (')', _) => (Some(RightParen), 1),
            ('[', _) => (Some(LeftBracket), 1),
            (']', _) => (Some(RightBracket), 1),
            ('=', _) => (Some(Equal), 1),
            (';', _) => (Some(Semicolon), 1),
            (',', _) => (Some(Comma), 1),
            _ => (None, 1),
        };

        for _ in 0..width {
            self.bump();
        }

        match symbol {
            Some(symbol) => self.token(TokenKind::Special(symbol), start),
            None => {
                self.errors.push(CompilerError::LexicalError {
                    symbol: c,
                    span: (start, c.len_utf8()).into(),
                });
                self.token(TokenKind::Trivia(Trivia::UnknownSymbol), start)
            }
        }
    }

    /// `'...'` on a single line, no escapes.
    fn read_string(&mut self) -> Token {
        let start = self.cursor;
        self.bump();
        loop {
            match self.current() {
                Some('\'') => break,
                None | Some('\r' | '\n') => {
                    self.errors.push(CompilerError::StringExceedsLine {
                        span: (start, self.cursor - start).into(),
                    });
                    return self.bad(start);
                }
                Some(_) => self.bump(),
            }
        }
        let value = self.text.slice(start + 1, self.cursor - start - 1).to_owned();
        self.bump();
        self.token(TokenKind::StringConst(value), start)
    }

    /// Unsigned integer or real constant with an optional scale factor.
    fn read_number(&mut self) -> Token {
        let start = self.cursor;
        self.eat_digits();
        let mut is_real = false;

        if self.current() == Some('.') && self.lookahead() != Some('.') {
            is_real = true;
            self.bump();
            if self.eat_digits() == 0 {
                return self.const_error(start);
            }
        }

        if matches!(self.current(), Some('e' | 'E')) {
            is_real = true;
            self.bump();
            if matches!(self.current(), Some('+' | '-')) {
                self.bump();
            }
            if self.eat_digits() == 0 {
                return self.const_error(start);
            }
        }

        let lexeme = self.text.slice(start, self.cursor - start);
        let kind = if is_real {
            lexeme
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(TokenKind::RealConst)
        } else {
            lexeme.parse::<i32>().ok().map(TokenKind::IntConst)
        };

        match kind {
            Some(kind) => self.token(kind, start),
            None => {
                self.errors.push(CompilerError::OverflowException {
                    span: (start, self.cursor - start).into(),
                });
                self.bad(start)
            }
        }
    }

    fn const_error(&mut self, start: usize) -> Token {
        self.errors.push(CompilerError::ConstError {
            span: (start, self.cursor - start).into(),
        });
        self.bad(start)
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.cursor;
        while self.current().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.bump();
        }
        let word = self.text.slice(start, self.cursor - start);
        let kind = match SpecialSymbol::reserved_word(word) {
            Some(symbol) => TokenKind::Special(symbol),
            None => TokenKind::Identifier(word.to_owned()),
        };
        self.token(kind, start)
    }
}

/// Yields every token up to and including the first end-of-file.
impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        self.finished = token.is_eof();
        Some(token)
    }
}
