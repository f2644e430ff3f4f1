//! Virtual code construction from extracted regions.
//!
//! Mapping tables are always rebuilt from scratch; only the script syntax
//! tree is carried across edits.

use crate::config::WorkspaceSettings;
use crate::declarations::{self, ComponentDeclaration};
use crate::language::LanguageTag;
use crate::mapping::{CodeInformation, Mapping, SourceMap};
use crate::region::Region;
use crate::template;

use super::{Codegen, VirtualCode, VirtualCodeTree};

/// Id of the root code.
pub const ROOT_ID: &str = "root";
/// Id of the markup code.
pub const MARKUP_ID: &str = "html";

/// Id of the host-script code (`script_ts` / `script_js`).
pub fn script_id(language: LanguageTag) -> String {
    format!("script_{}", language.extension())
}

/// The verbatim host-script text before synthetic declarations are appended.
#[derive(Debug, Clone)]
pub struct ScriptDraft {
    pub language: LanguageTag,
    pub text: String,
    pub source_map: SourceMap,
}

impl ScriptDraft {
    /// Physical offset of a script span, when it lies in one verbatim span.
    pub fn source_offset_of(&self, start: usize, end: usize) -> Option<usize> {
        self.source_map
            .to_source_range(start, end, |info| info.verification)
            .map(|(source_start, _)| source_start)
    }

    /// Append synthetic declarations and produce the final code.
    pub fn finish(
        &self,
        id: impl Into<String>,
        declarations: &[ComponentDeclaration],
        settings: &WorkspaceSettings,
    ) -> VirtualCode {
        let mut codegen = Codegen::new();
        codegen.push(&self.text);
        if settings.emit_declarations {
            declarations::emit(
                &mut codegen,
                declarations,
                &settings.component_module,
                |start, end| self.source_offset_of(start, end),
            );
        }
        let (text, synthetic) = codegen.finish();

        let mut mappings = self.source_map.mappings().to_vec();
        mappings.extend(synthetic);
        VirtualCode::new(id, self.language, text, SourceMap::new(mappings))
    }
}

/// Everything built from one extraction, before the script is finished.
#[derive(Debug)]
pub struct BuiltCodes {
    pub styles: Vec<VirtualCode>,
    pub markup: VirtualCode,
    pub script: ScriptDraft,
}

/// Build style, markup and draft script codes.
pub fn build(source: &str, regions: &[Region], settings: &WorkspaceSettings) -> BuiltCodes {
    BuiltCodes {
        styles: style_codes(source, regions),
        markup: markup_code(source, regions, settings),
        script: script_draft(source, regions, settings.script_language),
    }
}

/// One code per style region, id `{dialect}_{n}`.
pub fn style_codes(source: &str, regions: &[Region]) -> Vec<VirtualCode> {
    regions
        .iter()
        .filter(|region| region.language.is_style())
        .enumerate()
        .map(|(ordinal, region)| {
            VirtualCode::new(
                format!("{}_{}", region.language.language_id(), ordinal),
                region.language,
                region.content(source).to_string(),
                SourceMap::new(vec![Mapping::span(
                    region.content_start,
                    0,
                    region.content_end - region.content_start,
                    CodeInformation::all(),
                )]),
            )
        })
        .collect()
}

/// All markup regions concatenated in source order.
pub fn markup_code(source: &str, regions: &[Region], settings: &WorkspaceSettings) -> VirtualCode {
    let mut codegen = Codegen::new();
    for region in regions.iter().filter(|region| region.language == LanguageTag::Html) {
        codegen.push_mapped(
            region.content(source),
            region.content_start,
            CodeInformation::all(),
        );
    }
    let (text, mappings) = codegen.finish();

    let mut code = VirtualCode::new(MARKUP_ID, LanguageTag::Html, text, SourceMap::new(mappings));
    if settings.template_diagnostics {
        code.diagnostics = template::check(&code.text);
    }
    code
}

/// Source with every region excised, one mapping per surviving non-empty span.
pub fn script_draft(source: &str, regions: &[Region], language: LanguageTag) -> ScriptDraft {
    if regions.is_empty() {
        return ScriptDraft {
            language,
            text: source.to_string(),
            source_map: SourceMap::new(vec![Mapping::span(
                0,
                0,
                source.len(),
                CodeInformation::all(),
            )]),
        };
    }

    let mut codegen = Codegen::new();
    let mut cursor = 0;
    let gaps = regions
        .iter()
        .map(|region| (region.start, region.end))
        .chain(std::iter::once((source.len(), source.len())));
    for (region_start, region_end) in gaps {
        if region_start > cursor {
            codegen.push_mapped(&source[cursor..region_start], cursor, CodeInformation::all());
        }
        cursor = cursor.max(region_end);
    }
    let (text, mappings) = codegen.finish();

    ScriptDraft {
        language,
        text,
        source_map: SourceMap::new(mappings),
    }
}

/// Root code of a composite file: the file itself, mapped onto itself.
pub fn root_code(source: &str) -> VirtualCode {
    VirtualCode::new(
        ROOT_ID,
        LanguageTag::Treaty,
        source.to_string(),
        SourceMap::new(vec![Mapping::span(
            0,
            0,
            source.len(),
            CodeInformation::all(),
        )]),
    )
}

/// Assemble the tree: styles, then markup, then the finished script.
pub fn assemble(source: &str, built: BuiltCodes, script: VirtualCode) -> VirtualCodeTree {
    let mut embedded = built.styles;
    embedded.push(built.markup);
    embedded.push(script);
    VirtualCodeTree::new(root_code(source), embedded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::extract;

    fn build_tree(source: &str) -> VirtualCodeTree {
        let settings = WorkspaceSettings::default();
        let regions = extract(source, &settings);
        let built = build(source, &regions, &settings);
        let script = built
            .script
            .finish(script_id(settings.script_language), &[], &settings);
        assemble(source, built, script)
    }

    #[test]
    fn test_style_and_markup_only() {
        let source = "<style>a{color:red}</style><div>{{x}}</div>";
        let tree = build_tree(source);

        let ids: Vec<&str> = tree.iter_embedded().map(|(_, c)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["css_0", "html", "script_ts"]);

        let style = tree.get(tree.find("css_0").unwrap()).unwrap();
        assert_eq!(style.text, "a{color:red}");
        assert_eq!(
            style.source_map.mappings(),
            &[Mapping::span(7, 0, 12, CodeInformation::all())]
        );

        let markup = tree.get(tree.find("html").unwrap()).unwrap();
        assert_eq!(markup.text, "<div>{{x}}</div>");

        let script = tree.get(tree.find("script_ts").unwrap()).unwrap();
        assert_eq!(script.text, "");
        assert!(script.source_map.is_empty());
    }

    #[test]
    fn test_markup_regions_concatenate_with_offsets() {
        let source = "<a>1</a>\nlet x;\n<b>2</b>";
        let tree = build_tree(source);
        let markup = tree.get(tree.find(MARKUP_ID).unwrap()).unwrap();
        assert_eq!(markup.text, "<a>1</a><b>2</b>");
        assert_eq!(
            markup.source_map.mappings(),
            &[
                Mapping::span(0, 0, 8, CodeInformation::all()),
                Mapping::span(16, 8, 8, CodeInformation::all()),
            ]
        );

        let script = tree.get(tree.find("script_ts").unwrap()).unwrap();
        assert_eq!(script.text, "\nlet x;\n");
        assert_eq!(
            script.source_map.mappings(),
            &[Mapping::span(8, 0, 8, CodeInformation::all())]
        );
    }

    #[test]
    fn test_empty_style_block_has_zero_length_mapping() {
        let tree = build_tree("<style lang=\"less\"></style>");
        let style = tree.get(tree.find("less_0").unwrap()).unwrap();
        assert_eq!(style.text, "");
        assert_eq!(
            style.source_map.mappings(),
            &[Mapping::span(19, 0, 0, CodeInformation::all())]
        );
    }

    #[test]
    fn test_no_regions_maps_whole_source() {
        let source = "export const a = 1;\n";
        let tree = build_tree(source);
        let script = tree.get(tree.find("script_ts").unwrap()).unwrap();
        assert_eq!(script.text, source);
        assert_eq!(
            script.source_map.mappings(),
            &[Mapping::span(0, 0, source.len(), CodeInformation::all())]
        );
        let markup = tree.get(tree.find(MARKUP_ID).unwrap()).unwrap();
        assert!(markup.text.is_empty());
    }

    #[test]
    fn test_markup_diagnostics_follow_settings() {
        let source = "<div><p></div>";
        let settings = WorkspaceSettings::default();
        let regions = extract(source, &settings);
        assert!(!markup_code(source, &regions, &settings).diagnostics.is_empty());

        let quiet = WorkspaceSettings {
            template_diagnostics: false,
            ..Default::default()
        };
        assert!(markup_code(source, &regions, &quiet).diagnostics.is_empty());
    }

    #[test]
    fn test_root_identity_mapping() {
        let tree = build_tree("x");
        assert_eq!(tree.root().id, ROOT_ID);
        assert_eq!(
            tree.root().source_map.mappings(),
            &[Mapping::span(0, 0, 1, CodeInformation::all())]
        );
    }
}
