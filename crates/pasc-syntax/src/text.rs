//! Source text with a line table for position → line lookups.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLine {
    pub start: usize,
    pub len: usize,
    pub len_with_break: usize,
}

#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    lines: Vec<TextLine>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = parse_lines(&text);
        SourceText { text, lines }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    /// Character starting at byte `position`, if any.
    pub fn char_at(&self, position: usize) -> Option<char> {
        self.text.get(position..)?.chars().next()
    }

    pub fn slice(&self, start: usize, len: usize) -> &str {
        &self.text[start..start + len]
    }

    pub fn line_text(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|l| self.slice(l.start, l.len))
    }

    /// Index of the line containing `position`. Positions past the end of the
    /// text belong to the last line.
    pub fn line_index(&self, position: usize) -> usize {
        self.lines
            .partition_point(|line| line.start <= position)
            .saturating_sub(1)
    }

    /// Zero-based line and byte column of `position`.
    pub fn line_col(&self, position: usize) -> (usize, usize) {
        let index = self.line_index(position);
        let start = self.lines.get(index).map_or(0, |l| l.start);
        (index, position.saturating_sub(start))
    }
}

fn parse_lines(text: &str) -> Vec<TextLine> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut position = 0;
    let mut line_start = 0;

    while position < bytes.len() {
        let break_len = match (bytes[position], bytes.get(position + 1)) {
            (b'\r', Some(b'\n')) => 2,
            (b'\r' | b'\n', _) => 1,
            _ => 0,
        };

        if break_len == 0 {
            position += 1;
            continue;
        }

        lines.push(TextLine {
            start: line_start,
            len: position - line_start,
            len_with_break: position - line_start + break_len,
        });
        position += break_len;
        line_start = position;
    }

    if position > line_start {
        lines.push(TextLine {
            start: line_start,
            len: position - line_start,
            len_with_break: position - line_start,
        });
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn splits_all_line_break_kinds() {
        let text = SourceText::new("ab\r\ncd\ref\ngh");
        let lines: Vec<_> = (0..text.lines().len())
            .filter_map(|i| text.line_text(i))
            .collect();
        assert_eq!(lines, vec!["ab", "cd", "ef", "gh"]);
        assert_eq!(text.lines()[0].len_with_break, 4);
        assert_eq!(text.lines()[1].len_with_break, 3);
        assert_eq!(text.lines()[3].len_with_break, 2);
    }

    #[test]
    fn line_index_by_position() {
        let text = SourceText::new("program p;\nvar x: integer;\nbegin end.");
        assert_eq!(text.line_index(0), 0);
        assert_eq!(text.line_index(9), 0);
        assert_eq!(text.line_index(11), 1);
        assert_eq!(text.line_index(27), 2);
        assert_eq!(text.line_index(10_000), 2);
        assert_eq!(text.line_col(15), (1, 4));
    }

    #[test]
    fn empty_text_has_no_lines() {
        let text = SourceText::new("");
        assert!(text.lines().is_empty());
        assert_eq!(text.line_index(0), 0);
        assert_eq!(text.char_at(0), None);
    }

    quickcheck! {
        fn lines_cover_text_contiguously(s: String) -> bool {
            let text = SourceText::new(s.clone());
            let mut expected_start = 0;
            for line in text.lines() {
                if line.start != expected_start {
                    return false;
                }
                expected_start += line.len_with_break;
            }
            expected_start == s.len()
        }

        fn line_index_contains_position(s: String, pick: usize) -> bool {
            let text = SourceText::new(s.clone());
            if text.is_empty() {
                return true;
            }
            let position = pick % s.len();
            let line = text.lines()[text.line_index(position)];
            line.start <= position && position < line.start + line.len_with_break
        }
    }
}
