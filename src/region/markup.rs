//! Best-effort scanner for root markup elements.
//!
//! Not a grammar-correct HTML parser: it balances same-name tags and skips
//! interpolations and comments, which is enough to cut template blocks out of
//! a composite file.
//!
//! A `<name` is only followed when some `</name` occurs later in the file, and
//! the balanced-close search never runs past the last one. Host-script
//! generics such as `Array<string>` are therefore rejected without a scan.

use std::collections::HashMap;

use super::{Region, find_tag_end};
use crate::language::LanguageTag;

const STYLE_TAG: &str = "style";

/// Scan root markup elements, skipping the given (sorted) style regions.
pub(super) fn scan(text: &str, styles: &[Region]) -> Vec<Region> {
    let bytes = text.as_bytes();
    let closings = last_closing_tags(text);
    let mut regions = Vec::new();
    let mut next_style = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        while next_style < styles.len() && styles[next_style].end <= pos {
            next_style += 1;
        }
        if let Some(style) = styles.get(next_style)
            && style.start <= pos
        {
            pos = style.end;
            continue;
        }

        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }

        let matched = tag_name_at(text, pos + 1)
            .filter(|name| *name != STYLE_TAG)
            .and_then(|name| {
                let last_close = *closings.get(name)?;
                match_element(text, pos, name, last_close)
            })
            .filter(|&end| !styles.iter().any(|style| style.overlaps(pos, end)));

        match matched {
            Some(end) => {
                regions.push(Region {
                    language: LanguageTag::Html,
                    start: pos,
                    end,
                    content_start: pos,
                    content_end: end,
                });
                pos = end;
            }
            None => pos += 1,
        }
    }

    regions
}

/// Tag name starting at `pos`: `[A-Za-z][A-Za-z0-9_-]*` followed by whitespace, `/` or `>`.
fn tag_name_at(text: &str, pos: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if !bytes.get(pos)?.is_ascii_alphabetic() {
        return None;
    }
    let len = bytes[pos..]
        .iter()
        .take_while(|byte| byte.is_ascii_alphanumeric() || **byte == b'-' || **byte == b'_')
        .count();
    let terminator = *bytes.get(pos + len)?;
    (terminator.is_ascii_whitespace() || terminator == b'/' || terminator == b'>')
        .then(|| &text[pos..pos + len])
}

/// Offset of the last `</name` in `text`, per tag name.
fn last_closing_tags(text: &str) -> HashMap<&str, usize> {
    text.match_indices("</")
        .filter_map(|(pos, _)| Some((tag_name_at(text, pos + 2)?, pos)))
        .collect()
}

/// End offset (exclusive) of the element opened at `open_start`.
///
/// `last_close` is the offset of the last `</name` in the file. Returns `None`
/// for self-closing elements and elements without a balanced close.
fn match_element(text: &str, open_start: usize, name: &str, last_close: usize) -> Option<usize> {
    if last_close < open_start {
        return None;
    }
    let bytes = text.as_bytes();
    let open_end = find_tag_end(text, open_start + 1 + name.len(), true)?;
    if bytes[open_end - 1] == b'/' {
        return None;
    }

    let mut depth = 1usize;
    let mut pos = open_end + 1;

    while pos <= last_close {
        let rest = &text[pos..];
        if rest.starts_with("{{") {
            pos += 2 + rest[2..].find("}}")? + 2;
        } else if rest.starts_with("<!--") {
            pos += 4 + rest[4..].find("-->")? + 3;
        } else if rest.starts_with("</") {
            if tag_name_at(text, pos + 2) == Some(name) {
                let close_end = find_tag_end(text, pos + 2 + name.len(), false)?;
                depth -= 1;
                if depth == 0 {
                    return Some(close_end + 1);
                }
                pos = close_end + 1;
            } else {
                pos += 2;
            }
        } else if bytes[pos] == b'<' && tag_name_at(text, pos + 1) == Some(name) {
            let tag_end = find_tag_end(text, pos + 1 + name.len(), true)?;
            if bytes[tag_end - 1] != b'/' {
                depth += 1;
            }
            pos = tag_end + 1;
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    None
}
