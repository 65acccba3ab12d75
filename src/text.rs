use dashmap::DashMap;
use tower_lsp::lsp_types::{Position, Range};

pub type DocumentStore = DashMap<String, Document>;

type LineOffset = usize;

/// Owned text of an open document plus the offsets of its line starts.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    version: i32,
    line_index: LineIndex,
}

impl Document {
    pub fn new(text: String) -> Self {
        Self::with_version(text, 0)
    }

    pub fn with_version(text: String, version: i32) -> Self {
        let line_index = LineIndex::new(&text);
        Self {
            text,
            version,
            line_index,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn line_count(&self) -> usize {
        self.line_index.line_starts.len()
    }

    pub fn line(&self, line: usize) -> Option<&str> {
        self.line_index.line(&self.text, line)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.line_count()).filter_map(move |line| self.line(line))
    }
}

#[derive(Debug, Clone)]
struct LineIndex {
    line_starts: Vec<LineOffset>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(idx + 1);
            }
        }
        Self { line_starts }
    }

    fn line<'a>(&self, text: &'a str, line: usize) -> Option<&'a str> {
        let line_start = *self.line_starts.get(line)?;
        let line_end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(text.len());
        let slice = &text[line_start..line_end];
        let slice = slice.strip_suffix('\n').unwrap_or(slice);
        Some(slice.strip_suffix('\r').unwrap_or(slice))
    }
}

/// A piece of source text pinned to one line. Columns are UTF-16 units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestToken {
    line: u32,
    start: u32,
    text: String,
}

impl QuestToken {
    pub fn from_span(line: u32, line_text: &str, start: usize, end: usize) -> Self {
        Self {
            line,
            start: utf16_len(&line_text[..start]),
            text: line_text[start..end].to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn range(&self) -> Range {
        Range {
            start: Position {
                line: self.line,
                character: self.start,
            },
            end: Position {
                line: self.line,
                character: self.start + utf16_len(&self.text),
            },
        }
    }
}

pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(|ch| ch.len_utf16() as u32).sum()
}

pub fn span_range(line: u32, line_text: &str, start: usize, end: usize) -> Range {
    QuestToken::from_span(line, line_text, start, end).range()
}

pub fn trimmed_line_range(line: u32, line_text: &str) -> Range {
    let trimmed_start = line_text.len() - line_text.trim_start().len();
    let trimmed_end = line_text.trim_end().len().max(trimmed_start);
    span_range(line, line_text, trimmed_start, trimmed_end)
}

/// Range spanning whole lines `first..=last`; `last_text` is the text of `last`.
pub fn lines_range(first: u32, last: u32, last_text: &str) -> Range {
    Range {
        start: Position {
            line: first,
            character: 0,
        },
        end: Position {
            line: last,
            character: utf16_len(last_text),
        },
    }
}

/// Narrows a single-line range to `len` units starting `offset` units in.
///
/// Panics when `range` covers more than one line.
pub fn sub_range(range: &Range, offset: u32, len: u32) -> Range {
    assert_eq!(
        range.start.line, range.end.line,
        "sub_range requires a single-line range"
    );
    let start = range.start.character + offset;
    Range {
        start: Position {
            line: range.start.line,
            character: start,
        },
        end: Position {
            line: range.start.line,
            character: (start + len).min(range.end.character),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_without_terminators() {
        let document = Document::new("Quest: A\r\nQRC:\n\nQBN:".to_string());
        let lines: Vec<_> = document.lines().collect();
        assert_eq!(lines, vec!["Quest: A", "QRC:", "", "QBN:"]);
        assert_eq!(document.line_count(), 4);
    }

    #[test]
    fn token_ranges_count_utf16_units() {
        let line = "say \u{1F600} _gold_";
        let start = line.find("_gold_").unwrap();
        let token = QuestToken::from_span(3, line, start, start + "_gold_".len());
        let range = token.range();
        assert_eq!(range.start, Position { line: 3, character: 7 });
        assert_eq!(range.end, Position { line: 3, character: 13 });
    }

    #[test]
    fn trims_line_ranges() {
        let range = trimmed_line_range(2, "    end quest   ");
        assert_eq!(range.start.character, 4);
        assert_eq!(range.end.character, 13);
    }

    #[test]
    fn narrows_single_line_ranges() {
        let range = trimmed_line_range(0, "Message:  1011");
        let narrowed = sub_range(&range, 10, 4);
        assert_eq!(narrowed.start.character, 10);
        assert_eq!(narrowed.end.character, 14);
    }

    #[test]
    #[should_panic(expected = "single-line")]
    fn rejects_multi_line_sub_ranges() {
        sub_range(&lines_range(0, 2, "x"), 0, 1);
    }
}
