pub mod store;

pub use store::{FileHandle, VirtualFileStore};

use std::sync::{Arc, Weak};

use tower_lsp_server::ls_types::TextDocumentContentChangeEvent;

use crate::text::{TextChange, apply_content_changes};

/// Immutable snapshot of a physical file.
///
/// A snapshot derived from another one remembers the edit between them, so
/// the next update can reuse the previous script syntax tree.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    text: Arc<str>,
    version: Option<i32>,
    /// Text this snapshot was derived from, and the edit applied to it
    origin: Option<(Weak<str>, TextChange)>,
}

impl SourceSnapshot {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            version: None,
            origin: None,
        }
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// New snapshot with `start..end` replaced by `replacement`.
    ///
    /// Out-of-range or non-boundary offsets are clamped to the text.
    pub fn edited(&self, start: usize, end: usize, replacement: &str) -> SourceSnapshot {
        let start = floor_char_boundary(&self.text, start);
        let end = floor_char_boundary(&self.text, end).max(start);

        let mut text = String::with_capacity(self.text.len() - (end - start) + replacement.len());
        text.push_str(&self.text[..start]);
        text.push_str(replacement);
        text.push_str(&self.text[end..]);

        SourceSnapshot {
            text: text.into(),
            version: self.version.map(|version| version + 1),
            origin: Some((
                Arc::downgrade(&self.text),
                TextChange::new(start, end, start + replacement.len()),
            )),
        }
    }

    /// New snapshot from LSP content changes.
    ///
    /// A full-document change leaves the snapshot without a change range.
    pub fn with_content_changes(
        &self,
        content_changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    ) -> SourceSnapshot {
        let (text, change) = apply_content_changes(&self.text, content_changes);
        SourceSnapshot {
            text: text.into(),
            version: Some(version),
            origin: change.map(|change| (Arc::downgrade(&self.text), change)),
        }
    }

    /// The edit turning `previous` into this snapshot.
    ///
    /// `None` unless this snapshot was derived directly from `previous`.
    pub fn change_range(&self, previous: &SourceSnapshot) -> Option<TextChange> {
        let (base, change) = self.origin.as_ref()?;
        let base = base.upgrade()?;
        Arc::ptr_eq(&base, &previous.text).then_some(*change)
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
