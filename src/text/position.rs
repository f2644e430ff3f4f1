use tower_lsp_server::ls_types::{Position, Range};
use tree_sitter::Point;

/// Maps between LSP positions (UTF-16 columns) and byte offsets of one text.
pub struct PositionMapper<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> PositionMapper<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            line_starts: compute_line_starts(text),
        }
    }

    /// Byte range of a line, excluding its newline.
    fn line_span(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line)?;
        let end = match self.line_starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.text.len(),
        };
        Some((start, end))
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        }
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// Columns past the end of the line clamp to the line end.
    pub fn position_to_byte(&self, position: Position) -> Option<usize> {
        let (line_start, line_end) = self.line_span(position.line as usize)?;
        let line_text = &self.text[line_start..line_end];

        match convert_utf16_to_byte_in_line(line_text, position.character as usize) {
            Some(byte_offset) => Some(line_start + byte_offset),
            None => Some(line_end),
        }
    }

    /// Convert a byte offset to an LSP position.
    ///
    /// Offsets inside a multi-byte character snap back to the character start.
    pub fn byte_to_position(&self, offset: usize) -> Option<Position> {
        if offset > self.text.len() {
            return None;
        }
        let line = self.line_of(offset);
        let (line_start, line_end) = self.line_span(line)?;
        let line_text = &self.text[line_start..line_end];

        let mut column = offset.min(line_end) - line_start;
        let character = loop {
            if let Some(utf16) = convert_byte_to_utf16_in_line(line_text, column) {
                break utf16;
            }
            if column == 0 {
                break 0;
            }
            column -= 1;
        };

        Some(Position {
            line: line as u32,
            character: character as u32,
        })
    }

    pub fn byte_range_to_range(&self, start: usize, end: usize) -> Option<Range> {
        Some(Range {
            start: self.byte_to_position(start)?,
            end: self.byte_to_position(end)?,
        })
    }

    pub fn range_to_byte_range(&self, range: Range) -> Option<(usize, usize)> {
        Some((
            self.position_to_byte(range.start)?,
            self.position_to_byte(range.end)?,
        ))
    }

    /// Tree-sitter point (row, byte column) of a byte offset.
    pub fn byte_to_point(&self, offset: usize) -> Point {
        let offset = offset.min(self.text.len());
        let line = self.line_of(offset);
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        Point::new(line, offset - line_start)
    }
}

/// Compute line start offsets for efficient position mapping
pub fn compute_line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(index, _)| index + 1))
        .collect()
}

/// Convert UTF-16 position to byte position within a line
/// Returns None if the UTF-16 position is beyond the line
#[inline(always)]
pub fn convert_utf16_to_byte_in_line(line_text: &str, utf16_pos: usize) -> Option<usize> {
    let mut utf16_offset = 0;

    for (byte_offset, ch) in line_text.char_indices() {
        if utf16_offset >= utf16_pos {
            return Some(byte_offset);
        }
        utf16_offset += ch.len_utf16();
    }

    (utf16_offset == utf16_pos).then_some(line_text.len())
}

/// Convert byte position to UTF-16 position within a line
/// Returns None inside a multi-byte character or beyond the line
#[inline(always)]
pub fn convert_byte_to_utf16_in_line(line_text: &str, byte_pos: usize) -> Option<usize> {
    if byte_pos > line_text.len() || !line_text.is_char_boundary(byte_pos) {
        return None;
    }
    Some(line_text[..byte_pos].chars().map(char::len_utf16).sum())
}
