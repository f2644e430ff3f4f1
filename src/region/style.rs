//! `<style>` block scanner.

use regex::Regex;
use std::sync::LazyLock;

use super::find_tag_end;

static STYLE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<style[\s>]").expect("style open pattern is valid"));

static STYLE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</style\s*>").expect("style close pattern is valid"));

static LANG_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\slang\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'/>]+))"#)
        .expect("lang attribute pattern is valid")
});

const STYLE_OPEN_PREFIX: &str = "<style";

/// A matched style block before its dialect is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StyleBlock {
    pub start: usize,
    pub end: usize,
    pub content_start: usize,
    pub content_end: usize,
    pub lang: Option<String>,
}

/// Scan every terminated style block in source order.
///
/// An open tag that never ends, or has no following `</style>`, is skipped
/// and scanning continues after it.
pub(super) fn scan(text: &str) -> Vec<StyleBlock> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(open) = STYLE_OPEN.find_at(text, pos) {
        let start = open.start();
        let Some(tag_end) = find_tag_end(text, start + STYLE_OPEN_PREFIX.len(), false) else {
            pos = start + STYLE_OPEN_PREFIX.len();
            continue;
        };
        let content_start = tag_end + 1;

        let Some(close) = STYLE_CLOSE.find_at(text, content_start) else {
            pos = content_start;
            continue;
        };

        blocks.push(StyleBlock {
            start,
            end: close.end(),
            content_start,
            content_end: close.start(),
            lang: lang_attribute(&text[start..content_start]),
        });
        pos = close.end();
    }

    blocks
}

fn lang_attribute(open_tag: &str) -> Option<String> {
    let captures = LANG_ATTRIBUTE.captures(open_tag)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))
        .map(|value| value.as_str().trim().to_ascii_lowercase())
}
