//! Region extraction for composite source files.
//!
//! Splits a `.treaty` file into style regions and markup regions. The host
//! script region is everything left over and is never stored.
//!
//! The scanners are best-effort and never fail: a block that cannot be
//! matched is simply not a region.

mod markup;
mod style;

use serde::Serialize;

use crate::config::WorkspaceSettings;
use crate::language::LanguageTag;

/// A classified span of composite source, in byte offsets.
///
/// For style regions `start..end` covers the whole `<style ...>...</style>`
/// block and `content_start..content_end` its inner text. For markup regions
/// both spans are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub language: LanguageTag,
    pub start: usize,
    pub end: usize,
    pub content_start: usize,
    pub content_end: usize,
}

impl Region {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn content<'a>(&self, text: &'a str) -> &'a str {
        &text[self.content_start..self.content_end]
    }

    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Extract style and markup regions, non-overlapping and in source order.
pub fn extract(text: &str, settings: &WorkspaceSettings) -> Vec<Region> {
    let styles: Vec<Region> = style::scan(text)
        .into_iter()
        .map(|block| Region {
            language: settings.style_language_for(block.lang.as_deref()),
            start: block.start,
            end: block.end,
            content_start: block.content_start,
            content_end: block.content_end,
        })
        .collect();

    let markup = markup::scan(text, &styles);

    let mut regions: Vec<Region> = styles.into_iter().chain(markup).collect();
    regions.sort_by_key(|region| region.start);
    regions
}

/// Find the `>` closing an open tag, starting the scan at `from`.
///
/// Quoted attribute values never close the tag. With `template_syntax`,
/// backtick strings and `{{ ... }}` interpolations are skipped as well.
pub(crate) fn find_tag_end(text: &str, from: usize, template_syntax: bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut pos = from;

    while pos < bytes.len() {
        match bytes[pos] {
            b'>' => return Some(pos),
            quote @ (b'"' | b'\'') => {
                pos += 1 + offset_of(bytes, pos + 1, quote)?;
            }
            b'`' if template_syntax => {
                pos += 1 + offset_of(bytes, pos + 1, b'`')?;
            }
            b'{' if template_syntax && bytes.get(pos + 1) == Some(&b'{') => {
                pos = text[pos + 2..].find("}}").map(|index| pos + 2 + index + 1)?;
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Distance from `from` to the next `needle`.
fn offset_of(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes.get(from..)?.iter().position(|byte| *byte == needle)
}
