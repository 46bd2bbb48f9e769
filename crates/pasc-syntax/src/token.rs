use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character of the lexeme.
    pub position: usize,
    /// Byte length of the lexeme, quotes included for strings.
    pub len: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize, len: usize) -> Self {
        Token {
            kind,
            position,
            len,
        }
    }

    pub fn span(&self) -> miette::SourceSpan {
        (self.position, self.len).into()
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Trivia(Trivia::EndOfFile)
    }

    pub fn is_symbol(&self, symbol: SpecialSymbol) -> bool {
        self.kind == TokenKind::Special(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Special(SpecialSymbol),
    IntConst(i32),
    RealConst(f64),
    StringConst(String),
    Trivia(Trivia),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "identifier `{name}`"),
            TokenKind::Special(symbol) => write!(f, "`{symbol}`"),
            TokenKind::IntConst(value) => write!(f, "integer constant `{value}`"),
            TokenKind::RealConst(value) => write!(f, "real constant `{value}`"),
            TokenKind::StringConst(value) => write!(f, "string constant '{value}'"),
            TokenKind::Trivia(Trivia::EndOfFile) => write!(f, "end of file"),
            TokenKind::Trivia(Trivia::Bad) => write!(f, "malformed token"),
            TokenKind::Trivia(Trivia::UnknownSymbol) => write!(f, "unknown symbol"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trivia {
    EndOfFile,
    Bad,
    UnknownSymbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialSymbol {
    LeftParen,
    RightParen,
    Plus,
    Minus,
    Star,
    Slash,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Equal,
    NotEqual,
    Semicolon,
    Colon,
    Assignment,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    DoubleDot,

    Nil,
    Not,
    And,
    Div,
    Packed,
    Array,
    Of,
    File,
    Set,
    Record,
    End,
    Case,
    Or,
    Function,
    Var,
    Procedure,
    Begin,
    If,
    Then,
    Else,
    While,
    Do,
    Repeat,
    Until,
    For,
    To,
    Downto,
    With,
    Goto,
    Label,
    Const,
    Type,
    Program,
    Mod,
    In,
}

/// Reserved words, all lowercase.
const RESERVED_WORDS: &[(&str, SpecialSymbol)] = &[
    ("nil", SpecialSymbol::Nil),
    ("not", SpecialSymbol::Not),
    ("and", SpecialSymbol::And),
    ("div", SpecialSymbol::Div),
    ("packed", SpecialSymbol::Packed),
    ("array", SpecialSymbol::Array),
    ("of", SpecialSymbol::Of),
    ("file", SpecialSymbol::File),
    ("set", SpecialSymbol::Set),
    ("record", SpecialSymbol::Record),
    ("end", SpecialSymbol::End),
    ("case", SpecialSymbol::Case),
    ("or", SpecialSymbol::Or),
    ("function", SpecialSymbol::Function),
    ("var", SpecialSymbol::Var),
    ("procedure", SpecialSymbol::Procedure),
    ("begin", SpecialSymbol::Begin),
    ("if", SpecialSymbol::If),
    ("then", SpecialSymbol::Then),
    ("else", SpecialSymbol::Else),
    ("while", SpecialSymbol::While),
    ("do", SpecialSymbol::Do),
    ("repeat", SpecialSymbol::Repeat),
    ("until", SpecialSymbol::Until),
    ("for", SpecialSymbol::For),
    ("to", SpecialSymbol::To),
    ("downto", SpecialSymbol::Downto),
    ("with", SpecialSymbol::With),
    ("goto", SpecialSymbol::Goto),
    ("label", SpecialSymbol::Label),
    ("const", SpecialSymbol::Const),
    ("type", SpecialSymbol::Type),
    ("program", SpecialSymbol::Program),
    ("mod", SpecialSymbol::Mod),
    ("in", SpecialSymbol::In),
];

impl SpecialSymbol {
    /// Case-insensitive reserved word lookup.
    pub fn reserved_word(word: &str) -> Option<SpecialSymbol> {
        RESERVED_WORDS
            .iter()
            .find(|(spelling, _)| spelling.eq_ignore_ascii_case(word))
            .map(|&(_, symbol)| symbol)
    }

    pub fn is_reserved_word(self) -> bool {
        RESERVED_WORDS.iter().any(|&(_, symbol)| symbol == self)
    }

    pub fn as_str(self) -> &'static str {
        use SpecialSymbol::*;
        match self {
            LeftParen => "(",
            RightParen => ")",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Greater => ">",
            Less => "<",
            GreaterOrEqual => ">=",
            LessOrEqual => "<=",
            Equal => "=",
            NotEqual => "<>",
            Semicolon => ";",
            Colon => ":",
            Assignment => ":=",
            LeftBracket => "[",
            RightBracket => "]",
            Comma => ",",
            Dot => ".",
            DoubleDot => "..",
            word => RESERVED_WORDS
                .iter()
                .find(|&&(_, symbol)| symbol == word)
                .map_or("?", |&(spelling, _)| spelling),
        }
    }
}

impl fmt::Display for SpecialSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
