//! Best-effort template checks over the markup virtual code.
//!
//! The checker reports the structural problems a template compiler would
//! reject first: stray closing tags, unclosed elements, unterminated
//! interpolations and comments. Results are kept in markup-code coordinates
//! and translated to host diagnostics on demand.

use serde::Serialize;
use tower_lsp_server::ls_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use crate::region::find_tag_end;
use crate::text::PositionMapper;
use crate::virtual_code::{CodeIndex, VirtualCodeTree};

/// Diagnostic source reported to the host.
pub const DIAGNOSTIC_SOURCE: &str = "ng-template";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// Zero-based line and UTF-16 column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateSpan {
    pub start: LineCol,
    pub end: LineCol,
}

/// A template problem, located in the markup code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDiagnostic {
    pub span: TemplateSpan,
    /// Byte offsets in the markup code
    pub start: usize,
    pub end: usize,
    pub level: DiagnosticLevel,
    pub msg: String,
}

struct Checker<'a> {
    text: &'a str,
    mapper: PositionMapper<'a>,
    open: Vec<(&'a str, usize, usize)>,
    diagnostics: Vec<TemplateDiagnostic>,
}

impl<'a> Checker<'a> {
    fn report(&mut self, start: usize, end: usize, level: DiagnosticLevel, msg: String) {
        let line_col = |offset: usize| {
            let position = self.mapper.byte_to_position(offset).unwrap_or_default();
            LineCol {
                line: position.line,
                col: position.character,
            }
        };
        let span = TemplateSpan {
            start: line_col(start),
            end: line_col(end),
        };
        self.diagnostics.push(TemplateDiagnostic {
            span,
            start,
            end,
            level,
            msg,
        });
    }

    fn close(&mut self, name: &str, start: usize, end: usize) {
        let Some(depth) = self.open.iter().rposition(|(open, _, _)| *open == name) else {
            self.report(
                start,
                end,
                DiagnosticLevel::Error,
                format!("Unexpected closing tag \"{name}\""),
            );
            return;
        };
        for (unclosed, open_start, open_end) in self.open.split_off(depth + 1) {
            self.report(
                open_start,
                open_end,
                DiagnosticLevel::Error,
                format!("Element \"{unclosed}\" is not closed"),
            );
        }
        self.open.pop();
    }

    fn run(mut self) -> Vec<TemplateDiagnostic> {
        let text = self.text;
        let bytes = text.as_bytes();
        let mut pos = 0;

        while pos < bytes.len() {
            let rest = &text[pos..];
            if rest.starts_with("{{") {
                match rest[2..].find("}}") {
                    Some(index) => {
                        let end = pos + 2 + index + 2;
                        if rest[2..2 + index].trim().is_empty() {
                            self.report(
                                pos,
                                end,
                                DiagnosticLevel::Warning,
                                "Empty interpolation".to_string(),
                            );
                        }
                        pos = end;
                    }
                    None => {
                        self.report(
                            pos,
                            text.len(),
                            DiagnosticLevel::Error,
                            "Unterminated interpolation, missing \"}}\"".to_string(),
                        );
                        break;
                    }
                }
            } else if rest.starts_with("<!--") {
                match rest[4..].find("-->") {
                    Some(index) => pos += 4 + index + 3,
                    None => {
                        self.report(
                            pos,
                            text.len(),
                            DiagnosticLevel::Error,
                            "Unterminated comment".to_string(),
                        );
                        break;
                    }
                }
            } else if let Some(name) = rest.strip_prefix("</").and_then(tag_name) {
                let end = find_tag_end(text, pos + 2 + name.len(), false)
                    .map(|index| index + 1)
                    .unwrap_or(text.len());
                self.close(name, pos, end);
                pos = end;
            } else if let Some(name) = rest.strip_prefix('<').and_then(tag_name) {
                let Some(tag_end) = find_tag_end(text, pos + 1 + name.len(), true) else {
                    self.report(
                        pos,
                        text.len(),
                        DiagnosticLevel::Error,
                        format!("Unterminated start tag \"{name}\""),
                    );
                    break;
                };
                let self_closing = bytes[tag_end - 1] == b'/';
                if !self_closing && !VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
                    self.open.push((name, pos, tag_end + 1));
                }
                pos = tag_end + 1;
            } else {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }

        for (name, start, end) in std::mem::take(&mut self.open) {
            self.report(
                start,
                end,
                DiagnosticLevel::Error,
                format!("Element \"{name}\" is not closed"),
            );
        }

        self.diagnostics
            .sort_by_key(|diagnostic| (diagnostic.start, diagnostic.end));
        self.diagnostics
    }
}

fn tag_name(rest: &str) -> Option<&str> {
    let first = rest.as_bytes().first()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let len = rest
        .bytes()
        .take_while(|byte| byte.is_ascii_alphanumeric() || *byte == b'-' || *byte == b'_')
        .count();
    Some(&rest[..len])
}

/// Check a markup code text.
pub fn check(markup: &str) -> Vec<TemplateDiagnostic> {
    Checker {
        text: markup,
        mapper: PositionMapper::new(markup),
        open: Vec::new(),
        diagnostics: Vec::new(),
    }
    .run()
}

fn severity(level: DiagnosticLevel) -> DiagnosticSeverity {
    match level {
        DiagnosticLevel::Error => DiagnosticSeverity::ERROR,
        DiagnosticLevel::Warning => DiagnosticSeverity::WARNING,
    }
}

/// Host diagnostic in markup-code coordinates.
pub fn to_host_diagnostic(diagnostic: &TemplateDiagnostic) -> Diagnostic {
    let position = |line_col: LineCol| Position::new(line_col.line, line_col.col);
    Diagnostic {
        range: Range::new(position(diagnostic.span.start), position(diagnostic.span.end)),
        severity: Some(severity(diagnostic.level)),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: diagnostic.msg.clone(),
        ..Default::default()
    }
}

/// Host diagnostics of one code, translated onto the physical file.
///
/// Diagnostics whose span does not map back with verification enabled are dropped.
pub fn to_source_diagnostics(
    tree: &VirtualCodeTree,
    index: CodeIndex,
    source_text: &str,
) -> Vec<Diagnostic> {
    let Some(code) = tree.get(index) else {
        return Vec::new();
    };
    let mapper = PositionMapper::new(source_text);

    code.diagnostics
        .iter()
        .filter_map(|diagnostic| {
            let start = tree.to_source(index, diagnostic.start, |info| info.verification)?;
            let end = tree
                .to_source(index, diagnostic.end, |info| info.verification)
                .filter(|end| *end >= start)
                .unwrap_or(start);
            let range = mapper.byte_range_to_range(start, end)?;
            Some(Diagnostic {
                range,
                ..to_host_diagnostic(diagnostic)
            })
        })
        .collect()
}
