//! Script syntax trees with incremental reparsing.

use tree_sitter::{Language, Parser, Tree};

use crate::error::{TreatyError, TreatyResult};
use crate::language::LanguageTag;
use crate::mapping::SourceMap;
use crate::text::{TextChange, diff_change};

/// Grammar used for host scripts. JavaScript parses with the TypeScript grammar.
pub fn script_grammar() -> Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

fn new_parser(language: LanguageTag) -> TreatyResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&script_grammar())
        .map_err(|_| TreatyError::grammar_load(language.language_id()))?;
    Ok(parser)
}

/// Parsed host-script text.
#[derive(Debug, Clone)]
pub struct ScriptSyntax {
    tree: Tree,
    incremental: bool,
}

impl ScriptSyntax {
    /// Parse from scratch.
    pub fn parse(language: LanguageTag, text: &str) -> TreatyResult<Self> {
        let tree = new_parser(language)?
            .parse(text, None)
            .ok_or_else(|| TreatyError::grammar_load(language.language_id()))?;
        Ok(Self {
            tree,
            incremental: false,
        })
    }

    /// Reparse `new_text` reusing this tree, after applying `change` to it.
    ///
    /// `change` must describe `old_text -> new_text` exactly.
    pub fn reparse(
        &self,
        language: LanguageTag,
        old_text: &str,
        new_text: &str,
        change: TextChange,
    ) -> TreatyResult<Self> {
        let mut old_tree = self.tree.clone();
        old_tree.edit(&change.to_input_edit(old_text, new_text));

        let tree = new_parser(language)?
            .parse(new_text, Some(&old_tree))
            .ok_or_else(|| TreatyError::grammar_load(language.language_id()))?;
        Ok(Self {
            tree,
            incremental: true,
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Whether the tree came from an incremental reparse.
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }
}

/// Translate a physical-file change into a change of the verbatim script text.
///
/// The change is projected through the previous script mapping and checked
/// against both script texts. When the projection does not describe the
/// difference exactly, a prefix/suffix diff of the texts is used instead.
/// Returns `None` when the script text did not change.
pub fn project_change(
    source_change: TextChange,
    previous_map: &SourceMap,
    old_script: &str,
    new_script: &str,
) -> Option<TextChange> {
    if old_script == new_script {
        return None;
    }

    let verbatim = |info: &crate::mapping::CodeInformation| info.verification;
    let start = previous_map.project_source_offset(source_change.start, verbatim);
    let old_end = previous_map
        .project_source_offset(source_change.old_end, verbatim)
        .max(start);
    let new_end = old_end as isize + new_script.len() as isize - old_script.len() as isize;

    let projected = (new_end >= start as isize)
        .then(|| TextChange::new(start, old_end, new_end as usize))
        .filter(|change| change.is_consistent(old_script, new_script));

    match projected {
        Some(change) => Some(change),
        None => {
            log::debug!(
                target: "treaty_ls::update",
                "Projected change {:?} is not exact; diffing script texts",
                source_change
            );
            diff_change(old_script, new_script)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{CodeInformation, Mapping};

    #[test]
    fn test_parse_typescript() {
        let syntax = ScriptSyntax::parse(LanguageTag::TypeScript, "const a: number = 1;").unwrap();
        assert_eq!(syntax.tree().root_node().kind(), "program");
        assert!(!syntax.tree().root_node().has_error());
        assert!(!syntax.is_incremental());
    }

    #[test]
    fn test_reparse_matches_full_parse() {
        let old = "let a = 1;\nlet b = 2;\n";
        let new = "let a = 1;\nlet bee = 2;\n";
        let change = diff_change(old, new).unwrap();

        let syntax = ScriptSyntax::parse(LanguageTag::TypeScript, old).unwrap();
        let reparsed = syntax
            .reparse(LanguageTag::TypeScript, old, new, change)
            .unwrap();
        let full = ScriptSyntax::parse(LanguageTag::TypeScript, new).unwrap();

        assert!(reparsed.is_incremental());
        assert_eq!(
            reparsed.tree().root_node().to_sexp(),
            full.tree().root_node().to_sexp()
        );
    }

    #[test]
    fn test_project_change_through_excised_region() {
        // source: "ab<p>x</p>cd" -> script "abcd"
        let map = SourceMap::new(vec![
            Mapping::span(0, 0, 2, CodeInformation::all()),
            Mapping::span(10, 2, 2, CodeInformation::all()),
        ]);
        // insert "Z" at source 11 ("c|d")
        let change = project_change(TextChange::new(11, 11, 12), &map, "abcd", "abcZd").unwrap();
        assert_eq!(change, TextChange::new(3, 3, 4));
    }

    #[test]
    fn test_project_change_falls_back_to_diff() {
        let map = SourceMap::new(vec![Mapping::span(0, 0, 4, CodeInformation::all())]);
        // a stale change that does not explain the texts
        let change = project_change(TextChange::new(0, 0, 1), &map, "abcd", "abXd").unwrap();
        assert_eq!(change, TextChange::new(2, 3, 3));
    }

    #[test]
    fn test_project_change_unchanged_script() {
        let map = SourceMap::new(vec![Mapping::span(0, 0, 4, CodeInformation::all())]);
        assert_eq!(project_change(TextChange::new(0, 1, 1), &map, "abcd", "abcd"), None);
    }
}
