//! Language plugins: the host-facing entry points of the projection core.
//!
//! A plugin turns a snapshot of a physical file into a [`VirtualCodeTree`]
//! and keeps it current across edits. Each [`VirtualFile`] carries the state
//! the next update needs; nothing is shared between files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::WorkspaceSettings;
use crate::declarations::{self, ComponentDeclaration};
use crate::document::SourceSnapshot;
use crate::language::{LanguageTag, ScriptKind, TREATY_EXTENSION};
use crate::mapping::{CodeInformation, Mapping, SourceMap};
use crate::region;
use crate::syntax::{ScriptSyntax, project_change};
use crate::virtual_code::builder::{self, ROOT_ID, ScriptDraft};
use crate::virtual_code::{CodeIndex, VirtualCodeTree};

/// The main script of a file, handed to the script engine under the file's own name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceScript {
    pub code_id: String,
    pub extension: String,
    pub script_kind: ScriptKind,
}

/// A script-like embedded code exposed under its own file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraServiceScript {
    pub file_name: String,
    pub code_id: String,
    pub extension: String,
    pub script_kind: ScriptKind,
}

/// A file extension the script engine must learn about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraFileExtension {
    pub extension: String,
    pub is_mixed_content: bool,
    pub script_kind: ScriptKind,
}

/// Script state carried from one build to the next.
#[derive(Debug, Clone)]
struct ScriptState {
    draft: ScriptDraft,
    syntax: Option<ScriptSyntax>,
}

/// Per-file state: the published tree plus what the next update reuses.
#[derive(Debug, Clone)]
pub struct VirtualFile {
    pub file_name: PathBuf,
    pub language: LanguageTag,
    pub snapshot: SourceSnapshot,
    pub tree: Arc<VirtualCodeTree>,
    script: ScriptState,
}

impl VirtualFile {
    /// Whether the last build reparsed the script incrementally.
    pub fn reused_syntax(&self) -> bool {
        self.script
            .syntax
            .as_ref()
            .is_some_and(ScriptSyntax::is_incremental)
    }

    pub fn script_syntax(&self) -> Option<&ScriptSyntax> {
        self.script.syntax.as_ref()
    }

    /// Component declarations found in the current script.
    pub fn declarations(&self) -> Vec<ComponentDeclaration> {
        self.script
            .syntax
            .as_ref()
            .map(|syntax| declarations::collect(syntax.tree(), &self.script.draft.text, &self.file_name))
            .unwrap_or_default()
    }
}

pub trait LanguagePlugin: Send + Sync {
    /// Build the initial state, or `None` for language ids this plugin does not handle.
    fn create_virtual_code(
        &self,
        file_name: &Path,
        language_id: &str,
        snapshot: SourceSnapshot,
    ) -> Option<VirtualFile>;

    /// Rebuild after an edit. Always succeeds.
    fn update_virtual_code(
        &self,
        file_name: &Path,
        previous: &VirtualFile,
        snapshot: SourceSnapshot,
    ) -> VirtualFile;

    /// The code handed to the script engine as the file itself.
    fn get_script(&self, tree: &VirtualCodeTree) -> Option<ServiceScript>;

    /// Script-like codes exposed as separate files named `{file_name}.{id}.{ext}`.
    fn get_extra_scripts(&self, file_name: &str, tree: &VirtualCodeTree)
    -> Vec<ExtraServiceScript>;

    fn extra_file_extensions(&self) -> Vec<ExtraFileExtension> {
        Vec::new()
    }
}

/// Parse the script draft, reusing the previous tree when the snapshot knows its edit.
fn parse_script(
    draft: &ScriptDraft,
    previous: Option<(&ScriptState, &SourceSnapshot)>,
    snapshot: &SourceSnapshot,
) -> Option<ScriptSyntax> {
    let reused = previous.and_then(|(state, previous_snapshot)| {
        let syntax = state.syntax.as_ref()?;
        if state.draft.language != draft.language {
            return None;
        }
        let source_change = snapshot.change_range(previous_snapshot)?;

        match project_change(
            source_change,
            &state.draft.source_map,
            &state.draft.text,
            &draft.text,
        ) {
            Some(edit) => {
                log::debug!(
                    target: "treaty_ls::update",
                    "Incremental reparse: source {:?} -> script {:?}",
                    source_change,
                    edit
                );
                Some(syntax.reparse(draft.language, &state.draft.text, &draft.text, edit))
            }
            None => {
                log::debug!(target: "treaty_ls::update", "Script text unchanged; keeping tree");
                Some(Ok(syntax.clone()))
            }
        }
    });

    let result = reused.unwrap_or_else(|| {
        log::debug!(target: "treaty_ls::update", "Full parse of {} script", draft.language);
        ScriptSyntax::parse(draft.language, &draft.text)
    });

    match result {
        Ok(syntax) => Some(syntax),
        Err(err) => {
            log::warn!(
                target: "treaty_ls::syntax",
                "{}; synthetic declarations disabled",
                err
            );
            None
        }
    }
}

fn collect_declarations(
    syntax: Option<&ScriptSyntax>,
    draft: &ScriptDraft,
    file_name: &Path,
    settings: &WorkspaceSettings,
) -> Vec<ComponentDeclaration> {
    if !settings.emit_declarations {
        return Vec::new();
    }
    syntax
        .map(|syntax| declarations::collect(syntax.tree(), &draft.text, file_name))
        .unwrap_or_default()
}

fn script_extension(language: LanguageTag) -> String {
    format!(".{}", language.extension())
}

/// Plugin for `.treaty` composite files.
#[derive(Debug, Clone)]
pub struct TreatyLanguagePlugin {
    settings: Arc<WorkspaceSettings>,
}

impl TreatyLanguagePlugin {
    pub fn new(settings: Arc<WorkspaceSettings>) -> Self {
        Self { settings }
    }

    fn build(
        &self,
        file_name: &Path,
        snapshot: SourceSnapshot,
        previous: Option<(&ScriptState, &SourceSnapshot)>,
    ) -> VirtualFile {
        let settings = &self.settings;
        let source = snapshot.text();

        let regions = region::extract(source, settings);
        let built = builder::build(source, &regions, settings);

        let syntax = parse_script(&built.script, previous, &snapshot);
        let declarations = collect_declarations(syntax.as_ref(), &built.script, file_name, settings);
        let script_code = built.script.finish(
            builder::script_id(built.script.language),
            &declarations,
            settings,
        );
        let script = ScriptState {
            draft: built.script.clone(),
            syntax,
        };
        let tree = builder::assemble(source, built, script_code);

        log::debug!(
            target: "treaty_ls::update",
            "Built {} codes from {} regions for {}",
            tree.len(),
            regions.len(),
            file_name.display()
        );

        VirtualFile {
            file_name: file_name.to_path_buf(),
            language: LanguageTag::Treaty,
            snapshot,
            tree: Arc::new(tree),
            script,
        }
    }
}

impl LanguagePlugin for TreatyLanguagePlugin {
    fn create_virtual_code(
        &self,
        file_name: &Path,
        language_id: &str,
        snapshot: SourceSnapshot,
    ) -> Option<VirtualFile> {
        (LanguageTag::from_language_id(language_id) == Some(LanguageTag::Treaty))
            .then(|| self.build(file_name, snapshot, None))
    }

    fn update_virtual_code(
        &self,
        file_name: &Path,
        previous: &VirtualFile,
        snapshot: SourceSnapshot,
    ) -> VirtualFile {
        self.build(
            file_name,
            snapshot,
            Some((&previous.script, &previous.snapshot)),
        )
    }

    fn get_script(&self, tree: &VirtualCodeTree) -> Option<ServiceScript> {
        if !self.settings.main_script {
            return None;
        }
        let index = tree.find(&builder::script_id(self.settings.script_language))?;
        let code = tree.get(index)?;
        Some(ServiceScript {
            code_id: code.id.clone(),
            extension: script_extension(code.language),
            script_kind: code.language.script_kind()?,
        })
    }

    fn get_extra_scripts(
        &self,
        file_name: &str,
        tree: &VirtualCodeTree,
    ) -> Vec<ExtraServiceScript> {
        let main = self.get_script(tree).map(|script| script.code_id);

        tree.iter_embedded()
            .filter(|(_, code)| code.language.is_script())
            .filter(|(_, code)| main.as_deref() != Some(code.id.as_str()))
            .filter_map(|(_, code)| {
                Some(ExtraServiceScript {
                    file_name: format!("{}.{}.{}", file_name, code.id, code.language.extension()),
                    code_id: code.id.clone(),
                    extension: script_extension(code.language),
                    script_kind: code.language.script_kind()?,
                })
            })
            .collect()
    }

    fn extra_file_extensions(&self) -> Vec<ExtraFileExtension> {
        vec![ExtraFileExtension {
            extension: TREATY_EXTENSION.to_string(),
            is_mixed_content: true,
            script_kind: ScriptKind::Deferred,
        }]
    }
}

/// Plugin for plain TypeScript files: appends the same synthetic declarations.
#[derive(Debug, Clone)]
pub struct TypeScriptLanguagePlugin {
    settings: Arc<WorkspaceSettings>,
}

impl TypeScriptLanguagePlugin {
    pub fn new(settings: Arc<WorkspaceSettings>) -> Self {
        Self { settings }
    }

    fn build(
        &self,
        file_name: &Path,
        snapshot: SourceSnapshot,
        previous: Option<(&ScriptState, &SourceSnapshot)>,
    ) -> VirtualFile {
        let source = snapshot.text();
        let draft = ScriptDraft {
            language: LanguageTag::TypeScript,
            text: source.to_string(),
            source_map: SourceMap::new(vec![Mapping::span(
                0,
                0,
                source.len(),
                CodeInformation::all(),
            )]),
        };

        let syntax = parse_script(&draft, previous, &snapshot);
        let declarations = collect_declarations(syntax.as_ref(), &draft, file_name, &self.settings);
        let root = draft.finish(ROOT_ID, &declarations, &self.settings);

        VirtualFile {
            file_name: file_name.to_path_buf(),
            language: LanguageTag::TypeScript,
            snapshot,
            tree: Arc::new(VirtualCodeTree::new(root, Vec::new())),
            script: ScriptState { draft, syntax },
        }
    }
}

impl LanguagePlugin for TypeScriptLanguagePlugin {
    fn create_virtual_code(
        &self,
        file_name: &Path,
        language_id: &str,
        snapshot: SourceSnapshot,
    ) -> Option<VirtualFile> {
        (LanguageTag::from_language_id(language_id) == Some(LanguageTag::TypeScript))
            .then(|| self.build(file_name, snapshot, None))
    }

    fn update_virtual_code(
        &self,
        file_name: &Path,
        previous: &VirtualFile,
        snapshot: SourceSnapshot,
    ) -> VirtualFile {
        self.build(
            file_name,
            snapshot,
            Some((&previous.script, &previous.snapshot)),
        )
    }

    fn get_script(&self, tree: &VirtualCodeTree) -> Option<ServiceScript> {
        let root = tree.get(CodeIndex::ROOT)?;
        Some(ServiceScript {
            code_id: root.id.clone(),
            extension: script_extension(LanguageTag::TypeScript),
            script_kind: ScriptKind::Ts,
        })
    }

    fn get_extra_scripts(
        &self,
        _file_name: &str,
        _tree: &VirtualCodeTree,
    ) -> Vec<ExtraServiceScript> {
        Vec::new()
    }
}

/// Every plugin, in the order they are asked to claim a file.
pub fn plugins(settings: Arc<WorkspaceSettings>) -> Vec<Box<dyn LanguagePlugin>> {
    vec![
        Box::new(TreatyLanguagePlugin::new(settings.clone())),
        Box::new(TypeScriptLanguagePlugin::new(settings)),
    ]
}

/// The plugin that owns files of `language`.
pub fn plugin_for(
    language: LanguageTag,
    settings: Arc<WorkspaceSettings>,
) -> Option<Box<dyn LanguagePlugin>> {
    match language {
        LanguageTag::Treaty => Some(Box::new(TreatyLanguagePlugin::new(settings))),
        LanguageTag::TypeScript => Some(Box::new(TypeScriptLanguagePlugin::new(settings))),
        LanguageTag::JavaScript
        | LanguageTag::Html
        | LanguageTag::Css
        | LanguageTag::Scss
        | LanguageTag::Less => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "/app/src/foo.treaty";

    fn treaty_plugin(settings: WorkspaceSettings) -> TreatyLanguagePlugin {
        TreatyLanguagePlugin::new(Arc::new(settings))
    }

    #[test]
    fn test_unrecognized_language_id_is_none() {
        let plugin = treaty_plugin(WorkspaceSettings::default());
        assert!(
            plugin
                .create_virtual_code(Path::new(FILE), "python", SourceSnapshot::new("x"))
                .is_none()
        );
        let plugin = TypeScriptLanguagePlugin::new(Arc::new(WorkspaceSettings::default()));
        assert!(
            plugin
                .create_virtual_code(Path::new(FILE), "treaty", SourceSnapshot::new("x"))
                .is_none()
        );
    }

    #[test]
    fn test_main_script_and_extra_scripts() {
        let plugin = treaty_plugin(WorkspaceSettings::default());
        let file = plugin
            .create_virtual_code(Path::new(FILE), "treaty", SourceSnapshot::new("let a = 1;"))
            .unwrap();

        let script = plugin.get_script(&file.tree).unwrap();
        assert_eq!(script.code_id, "script_ts");
        assert_eq!(script.extension, ".ts");
        assert_eq!(script.script_kind, ScriptKind::Ts);
        assert!(plugin.get_extra_scripts(FILE, &file.tree).is_empty());

        let plugin = treaty_plugin(WorkspaceSettings {
            main_script: false,
            ..Default::default()
        });
        assert_eq!(plugin.get_script(&file.tree), None);
        assert_eq!(
            plugin.get_extra_scripts(FILE, &file.tree),
            vec![ExtraServiceScript {
                file_name: format!("{FILE}.script_ts.ts"),
                code_id: "script_ts".to_string(),
                extension: ".ts".to_string(),
                script_kind: ScriptKind::Ts,
            }]
        );
    }

    #[test]
    fn test_javascript_script_language() {
        let plugin = treaty_plugin(WorkspaceSettings {
            script_language: LanguageTag::JavaScript,
            main_script: false,
            ..Default::default()
        });
        let file = plugin
            .create_virtual_code(Path::new(FILE), "treaty", SourceSnapshot::new("let a;"))
            .unwrap();
        let extra = plugin.get_extra_scripts(FILE, &file.tree);
        assert_eq!(extra.len(), 1);
        assert_eq!(extra[0].code_id, "script_js");
        assert_eq!(extra[0].script_kind, ScriptKind::Js);
    }

    #[test]
    fn test_extra_file_extensions() {
        let plugin = treaty_plugin(WorkspaceSettings::default());
        assert_eq!(
            plugin.extra_file_extensions(),
            vec![ExtraFileExtension {
                extension: "treaty".to_string(),
                is_mixed_content: true,
                script_kind: ScriptKind::Deferred,
            }]
        );
    }

    #[test]
    fn test_update_reuses_syntax_tree() {
        let plugin = treaty_plugin(WorkspaceSettings::default());
        let first = SourceSnapshot::new("<p>hi</p>\nconst a = 1;\n");
        let file = plugin
            .create_virtual_code(Path::new(FILE), "treaty", first.clone())
            .unwrap();
        assert!(!file.reused_syntax());

        let offset = first.text().find("1;").unwrap();
        let second = file.snapshot.edited(offset, offset + 1, "42");
        let updated = plugin.update_virtual_code(Path::new(FILE), &file, second);
        assert!(updated.reused_syntax());

        let script = updated.tree.get(updated.tree.find("script_ts").unwrap()).unwrap();
        assert_eq!(script.text, "\nconst a = 42;\n");

        let unrelated = SourceSnapshot::new("const b = 2;");
        let rebuilt = plugin.update_virtual_code(Path::new(FILE), &updated, unrelated);
        assert!(!rebuilt.reused_syntax());
    }

    #[test]
    fn test_typescript_plugin_root_code() {
        let plugin = TypeScriptLanguagePlugin::new(Arc::new(WorkspaceSettings::default()));
        let source = "@Component({ selector: 'x-a' })\nexport class A {}\n";
        let file = plugin
            .create_virtual_code(
                Path::new("/app/a.component.ts"),
                "typescript",
                SourceSnapshot::new(source),
            )
            .unwrap();

        let root = file.tree.root();
        assert_eq!(root.id, ROOT_ID);
        assert!(root.text.starts_with(source));
        assert!(root.text.contains("__Selectors2Components"));
        assert_eq!(file.tree.len(), 1);
        assert_eq!(
            plugin.get_script(&file.tree).map(|s| s.code_id),
            Some(ROOT_ID.to_string())
        );
        assert_eq!(file.declarations().len(), 1);
    }
}
