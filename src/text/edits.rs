//! Contiguous text changes and their conversion to tree-sitter edits.

use serde::Serialize;
use tower_lsp_server::ls_types::TextDocumentContentChangeEvent;
use tree_sitter::InputEdit;

use super::position::PositionMapper;

/// A single contiguous replacement, in byte offsets.
///
/// `start..old_end` in the old text was replaced by `start..new_end` in the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextChange {
    pub start: usize,
    pub old_end: usize,
    pub new_end: usize,
}

impl TextChange {
    pub fn new(start: usize, old_end: usize, new_end: usize) -> Self {
        Self {
            start,
            old_end: old_end.max(start),
            new_end: new_end.max(start),
        }
    }

    /// Length difference between the new and the old text.
    pub fn delta(&self) -> isize {
        self.new_end as isize - self.old_end as isize
    }

    /// Compose `self` (old -> mid) with `next` (mid -> new) into one change (old -> new).
    ///
    /// The result covers both replaced spans, so it may include unchanged bytes between them.
    pub fn merge(self, next: TextChange) -> TextChange {
        // mid -> old, for the end of `next`'s replaced span
        let next_old_end = if next.old_end <= self.start {
            next.old_end
        } else if next.old_end >= self.new_end {
            next.old_end - self.new_end + self.old_end
        } else {
            self.old_end
        };
        // mid -> new, for the end of `self`'s inserted span
        let self_new_end = if self.new_end <= next.start {
            self.new_end
        } else if self.new_end >= next.old_end {
            (self.new_end as isize + next.delta()) as usize
        } else {
            next.new_end
        };

        TextChange::new(
            self.start.min(next.start),
            self.old_end.max(next_old_end),
            self_new_end.max(next.new_end),
        )
    }

    /// True when the texts outside the change are identical.
    pub fn is_consistent(&self, old_text: &str, new_text: &str) -> bool {
        if self.old_end > old_text.len() || self.new_end > new_text.len() {
            return false;
        }
        if old_text.len() - self.old_end != new_text.len() - self.new_end {
            return false;
        }
        let boundaries = [
            old_text.is_char_boundary(self.start),
            old_text.is_char_boundary(self.old_end),
            new_text.is_char_boundary(self.start),
            new_text.is_char_boundary(self.new_end),
        ];
        boundaries.iter().all(|ok| *ok)
            && old_text[..self.start] == new_text[..self.start]
            && old_text[self.old_end..] == new_text[self.new_end..]
    }

    /// Convert to a tree-sitter edit, computing row/byte-column points in both texts.
    pub fn to_input_edit(&self, old_text: &str, new_text: &str) -> InputEdit {
        let old_mapper = PositionMapper::new(old_text);
        let new_mapper = PositionMapper::new(new_text);
        InputEdit {
            start_byte: self.start,
            old_end_byte: self.old_end,
            new_end_byte: self.new_end,
            start_position: old_mapper.byte_to_point(self.start),
            old_end_position: old_mapper.byte_to_point(self.old_end),
            new_end_position: new_mapper.byte_to_point(self.new_end),
        }
    }
}

/// Smallest single change turning `old_text` into `new_text`.
///
/// Returns `None` for identical texts. Offsets are aligned to char boundaries.
pub fn diff_change(old_text: &str, new_text: &str) -> Option<TextChange> {
    if old_text == new_text {
        return None;
    }
    let old = old_text.as_bytes();
    let new = new_text.as_bytes();

    let mut prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    while !old_text.is_char_boundary(prefix) || !new_text.is_char_boundary(prefix) {
        prefix -= 1;
    }

    let max_suffix = old.len().min(new.len()) - prefix;
    let mut suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    while !old_text.is_char_boundary(old.len() - suffix)
        || !new_text.is_char_boundary(new.len() - suffix)
    {
        suffix -= 1;
    }

    Some(TextChange::new(
        prefix,
        old.len() - suffix,
        new.len() - suffix,
    ))
}

/// Apply LSP content changes in order.
///
/// Returns the new text and the merged change range. A full-document change
/// (no range) discards the change range, so the caller falls back to a full parse.
pub fn apply_content_changes(
    old_text: &str,
    content_changes: Vec<TextDocumentContentChangeEvent>,
) -> (String, Option<TextChange>) {
    let mut text = old_text.to_string();
    let mut merged: Option<TextChange> = None;
    let mut full_sync = false;

    for change in content_changes {
        let Some(range) = change.range else {
            text = change.text;
            full_sync = true;
            merged = None;
            continue;
        };

        let mapper = PositionMapper::new(&text);
        let start = mapper.position_to_byte(range.start).unwrap_or(text.len());
        let end = mapper
            .position_to_byte(range.end)
            .unwrap_or(text.len())
            .max(start);
        let edit = TextChange::new(start, end, start + change.text.len());
        text.replace_range(start..end, &change.text);

        if !full_sync {
            merged = Some(match merged {
                Some(previous) => previous.merge(edit),
                None => edit,
            });
        }
    }

    (text, merged)
}
