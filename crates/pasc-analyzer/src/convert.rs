//! Byte offsets to LSP positions and tokens to semantic tokens.

use pasc_syntax::{CType, SourceText, SpecialSymbol, TokenKind, tokenize};
use tower_lsp::lsp_types::{Position, Range, SemanticToken, SemanticTokenType};

pub(crate) const LEGEND: [SemanticTokenType; 6] = [
    SemanticTokenType::KEYWORD,
    SemanticTokenType::VARIABLE,
    SemanticTokenType::TYPE,
    SemanticTokenType::STRING,
    SemanticTokenType::NUMBER,
    SemanticTokenType::OPERATOR,
];

fn legend_index(ty: &SemanticTokenType) -> u32 {
    LEGEND.iter().position(|t| t == ty).unwrap_or(0) as u32
}

/// LSP position of byte `offset`. Columns count UTF-16 code units.
pub(crate) fn position_of(text: &SourceText, offset: usize) -> Position {
    let offset = offset.min(text.len());
    let (line, column) = text.line_col(offset);
    // Past the line break: the start of the next (possibly empty) line.
    if text.lines().get(line).is_some_and(|l| column > l.len) {
        return Position::new(line as u32 + 1, 0);
    }
    let start = offset - column;
    let character = text.as_str()[start..offset].encode_utf16().count();
    Position::new(line as u32, character as u32)
}

pub(crate) fn range_of(text: &SourceText, offset: usize, len: usize) -> Range {
    Range::new(position_of(text, offset), position_of(text, offset + len))
}

fn classify(kind: &TokenKind) -> Option<SemanticTokenType> {
    use SpecialSymbol::*;

    let ty = match kind {
        TokenKind::Identifier(name) if CType::from_name(name).is_some() => SemanticTokenType::TYPE,
        TokenKind::Identifier(_) => SemanticTokenType::VARIABLE,
        TokenKind::IntConst(_) | TokenKind::RealConst(_) => SemanticTokenType::NUMBER,
        TokenKind::StringConst(_) => SemanticTokenType::STRING,
        TokenKind::Special(symbol) if symbol.is_reserved_word() => SemanticTokenType::KEYWORD,
        TokenKind::Special(
            Plus | Minus | Star | Slash | Greater | Less | GreaterOrEqual | LessOrEqual | Equal
            | NotEqual | Assignment,
        ) => SemanticTokenType::OPERATOR,
        TokenKind::Special(_) | TokenKind::Trivia(_) => return None,
    };
    Some(ty)
}

/// Delta-encoded semantic tokens for the whole document.
pub(crate) fn semantic_tokens(source: &str) -> Vec<SemanticToken> {
    let text = SourceText::new(source);
    let (tokens, _) = tokenize(source);

    let mut data = Vec::new();
    let mut previous = Position::new(0, 0);
    for token in tokens {
        let Some(ty) = classify(&token.kind) else {
            continue;
        };
        let start = position_of(&text, token.position);
        let length = text.slice(token.position, token.len).encode_utf16().count() as u32;
        let delta_line = start.line - previous.line;
        let delta_start = if delta_line == 0 {
            start.character - previous.character
        } else {
            start.character
        };
        data.push(SemanticToken {
            delta_line,
            delta_start,
            length,
            token_type: legend_index(&ty),
            token_modifiers_bitset: 0,
        });
        previous = start;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_count_utf16_units() {
        let text = SourceText::new("ab\n{é} x\r\nlast");
        assert_eq!(position_of(&text, 0), Position::new(0, 0));
        assert_eq!(position_of(&text, 2), Position::new(0, 2));
        assert_eq!(position_of(&text, 3), Position::new(1, 0));
        // `é` is two bytes but one UTF-16 unit.
        assert_eq!(position_of(&text, 7), Position::new(1, 3));
        assert_eq!(position_of(&text, 11), Position::new(2, 0));
        assert_eq!(position_of(&text, 99), Position::new(2, 4));

        let text = SourceText::new("end\n");
        assert_eq!(position_of(&text, 4), Position::new(1, 0));
    }

    #[test]
    fn ranges_cover_the_span() {
        let text = SourceText::new("program p;\nbegin end.");
        let range = range_of(&text, 11, 5);
        assert_eq!(range.start, Position::new(1, 0));
        assert_eq!(range.end, Position::new(1, 5));
    }

    #[test]
    fn tokens_are_delta_encoded() {
        let data = semantic_tokens("var x: integer;\n  x := 'hi' + 2");
        let decoded: Vec<_> = data
            .iter()
            .map(|t| (t.delta_line, t.delta_start, t.length, t.token_type))
            .collect();
        assert_eq!(
            decoded,
            vec![
                (0, 0, 3, 0),  // var
                (0, 4, 1, 1),  // x
                (0, 3, 7, 2),  // integer
                (1, 2, 1, 1),  // x
                (0, 2, 2, 5),  // :=
                (0, 3, 4, 3),  // 'hi'
                (0, 5, 1, 5),  // +
                (0, 2, 1, 4),  // 2
            ]
        );
    }

    #[test]
    fn malformed_tokens_are_not_highlighted() {
        assert!(semantic_tokens("? 1e").is_empty());
    }
}
