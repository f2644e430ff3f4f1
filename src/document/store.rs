use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use dashmap::mapref::one::Ref;
use serde::Serialize;
use tower_lsp_server::ls_types::{Diagnostic, TextDocumentContentChangeEvent};
use url::Url;

use crate::config::WorkspaceSettings;
use crate::error::{TreatyError, TreatyResult};
use crate::language::LanguageTag;
use crate::plugin::{ExtraServiceScript, LanguagePlugin, ServiceScript, VirtualFile, plugin_for};
use crate::template;
use crate::uri::EmbeddedDocumentUri;
use crate::virtual_code::VirtualCodeTree;

use super::SourceSnapshot;

/// Open files and their virtual code trees.
///
/// Each file is owned by exactly one entry. Readers get the published
/// `Arc<VirtualCodeTree>` and never observe a tree under construction.
pub struct VirtualFileStore {
    settings: ArcSwap<WorkspaceSettings>,
    files: DashMap<Url, VirtualFile>,
}

pub struct FileHandle<'a> {
    inner: Ref<'a, Url, VirtualFile>,
}

impl<'a> FileHandle<'a> {
    fn new(inner: Ref<'a, Url, VirtualFile>) -> Self {
        Self { inner }
    }
}

impl<'a> Deref for FileHandle<'a> {
    type Target = VirtualFile;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Scripts a file exposes to the script engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileScripts {
    pub main: Option<ServiceScript>,
    pub extra: Vec<ExtraServiceScript>,
}

impl Default for VirtualFileStore {
    fn default() -> Self {
        Self::new(WorkspaceSettings::default())
    }
}

impl std::fmt::Debug for VirtualFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFileStore")
            .field("settings", &"ArcSwap<WorkspaceSettings>")
            .field("files", &self.files.len())
            .finish()
    }
}

fn file_name_of(uri: &Url) -> PathBuf {
    uri.to_file_path()
        .unwrap_or_else(|_| PathBuf::from(uri.path()))
}

impl VirtualFileStore {
    pub fn new(settings: WorkspaceSettings) -> Self {
        Self {
            settings: ArcSwap::new(Arc::new(settings)),
            files: DashMap::new(),
        }
    }

    pub fn settings(&self) -> Arc<WorkspaceSettings> {
        self.settings.load_full()
    }

    fn plugin(&self, language: LanguageTag) -> Option<Box<dyn LanguagePlugin>> {
        plugin_for(language, self.settings())
    }

    /// Replace the settings and rebuild every open file from scratch.
    pub fn apply_settings(&self, settings: WorkspaceSettings) {
        self.settings.store(Arc::new(settings));

        for mut entry in self.files.iter_mut() {
            let rebuilt = {
                let file = entry.value();
                self.plugin(file.language).and_then(|plugin| {
                    plugin.create_virtual_code(
                        &file.file_name,
                        file.language.language_id(),
                        file.snapshot.clone(),
                    )
                })
            };
            if let Some(rebuilt) = rebuilt {
                *entry.value_mut() = rebuilt;
            }
        }
        log::info!(
            target: "treaty_ls::settings",
            "Settings applied; rebuilt {} open files",
            self.files.len()
        );
    }

    /// Open a file and build its tree.
    pub fn open(
        &self,
        uri: Url,
        language_id: &str,
        version: i32,
        text: impl Into<Arc<str>>,
    ) -> TreatyResult<Arc<VirtualCodeTree>> {
        let snapshot = SourceSnapshot::new(text).with_version(version);
        let file = LanguageTag::from_language_id(language_id)
            .and_then(|language| self.plugin(language))
            .and_then(|plugin| {
                plugin.create_virtual_code(&file_name_of(&uri), language_id, snapshot)
            })
            .ok_or_else(|| TreatyError::unsupported_language(language_id))?;

        log::debug!(
            target: "treaty_ls::update",
            "Opened {} ({} codes)",
            uri,
            file.tree.len()
        );
        let tree = file.tree.clone();
        self.files.insert(uri, file);
        Ok(tree)
    }

    /// Apply LSP content changes to an open file.
    pub fn change(
        &self,
        uri: &Url,
        version: i32,
        content_changes: Vec<TextDocumentContentChangeEvent>,
    ) -> TreatyResult<Arc<VirtualCodeTree>> {
        let snapshot = self
            .files
            .get(uri)
            .map(|file| file.snapshot.with_content_changes(content_changes, version))
            .ok_or_else(|| TreatyError::document_not_found(uri.as_str()))?;
        self.update(uri, snapshot)
    }

    /// Rebuild an open file from a new snapshot.
    pub fn update(
        &self,
        uri: &Url,
        snapshot: SourceSnapshot,
    ) -> TreatyResult<Arc<VirtualCodeTree>> {
        let mut entry = self
            .files
            .get_mut(uri)
            .ok_or_else(|| TreatyError::document_not_found(uri.as_str()))?;
        let plugin = self
            .plugin(entry.language)
            .ok_or_else(|| TreatyError::unsupported_language(entry.language.language_id()))?;

        let updated = plugin.update_virtual_code(&entry.file_name, &entry, snapshot);
        log::debug!(
            target: "treaty_ls::update",
            "Updated {} (incremental parse: {})",
            uri,
            updated.reused_syntax()
        );
        let tree = updated.tree.clone();
        *entry = updated;
        Ok(tree)
    }

    pub fn close(&self, uri: &Url) -> bool {
        self.files.remove(uri).is_some()
    }

    pub fn get(&self, uri: &Url) -> Option<FileHandle<'_>> {
        self.files.get(uri).map(FileHandle::new)
    }

    /// The currently published tree of a file.
    pub fn tree(&self, uri: &Url) -> Option<Arc<VirtualCodeTree>> {
        self.files.get(uri).map(|file| file.tree.clone())
    }

    pub fn is_open(&self, uri: &Url) -> bool {
        self.files.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Main and extra scripts of an open file.
    pub fn service_scripts(&self, uri: &Url) -> Option<FileScripts> {
        let file = self.files.get(uri)?;
        let plugin = self.plugin(file.language)?;
        let file_name = file.file_name.to_string_lossy();
        Some(FileScripts {
            main: plugin.get_script(&file.tree),
            extra: plugin.get_extra_scripts(&file_name, &file.tree),
        })
    }

    /// URIs of every embedded code of an open file, in tree order.
    pub fn embedded_uris(&self, uri: &Url) -> Vec<EmbeddedDocumentUri> {
        let Some(tree) = self.tree(uri) else {
            return Vec::new();
        };
        tree.iter_embedded()
            .map(|(_, code)| EmbeddedDocumentUri::new(uri, &code.id, code.language))
            .collect()
    }

    /// Template diagnostics of an open file, in physical-file coordinates.
    pub fn source_diagnostics(&self, uri: &Url) -> Vec<Diagnostic> {
        let Some(file) = self.get(uri) else {
            return Vec::new();
        };
        file.tree
            .iter_embedded()
            .flat_map(|(index, _)| {
                template::to_source_diagnostics(&file.tree, index, file.snapshot.text())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp_server::ls_types::{Position, Range};

    fn uri() -> Url {
        Url::parse("file:///app/src/foo.treaty").unwrap()
    }

    #[test]
    fn test_open_and_get() {
        let store = VirtualFileStore::default();
        let tree = store
            .open(uri(), "treaty", 1, "<style>a{}</style><p>x</p>let a;")
            .unwrap();
        assert_eq!(tree.len(), 4);

        let file = store.get(&uri()).unwrap();
        assert_eq!(file.snapshot.version(), Some(1));
        assert_eq!(file.file_name, PathBuf::from("/app/src/foo.treaty"));
        assert!(store.is_open(&uri()));
    }

    #[test]
    fn test_open_unsupported_language() {
        let store = VirtualFileStore::default();
        let err = store.open(uri(), "python", 1, "x").unwrap_err();
        assert!(matches!(err, TreatyError::UnsupportedLanguage { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_change_unknown_document() {
        let store = VirtualFileStore::default();
        let err = store.change(&uri(), 2, Vec::new()).unwrap_err();
        assert!(matches!(err, TreatyError::DocumentNotFound { .. }));
    }

    #[test]
    fn test_change_publishes_new_tree() {
        let store = VirtualFileStore::default();
        let before = store.open(uri(), "treaty", 1, "let a = 1;").unwrap();

        let after = store
            .change(
                &uri(),
                2,
                vec![TextDocumentContentChangeEvent {
                    range: Some(Range::new(Position::new(0, 8), Position::new(0, 9))),
                    range_length: None,
                    text: "2".to_string(),
                }],
            )
            .unwrap();

        let script = |tree: &VirtualCodeTree| tree.get(tree.find("script_ts").unwrap()).unwrap().text.clone();
        assert!(script(&before).starts_with("let a = 1;"));
        assert!(script(&after).starts_with("let a = 2;"));
        assert!(store.get(&uri()).unwrap().reused_syntax());
        assert_eq!(store.get(&uri()).unwrap().snapshot.version(), Some(2));
    }

    #[test]
    fn test_close_removes_file() {
        let store = VirtualFileStore::default();
        store.open(uri(), "treaty", 1, "").unwrap();
        assert!(store.close(&uri()));
        assert!(!store.close(&uri()));
        assert!(store.tree(&uri()).is_none());
    }

    #[test]
    fn test_apply_settings_rebuilds_open_files() {
        let store = VirtualFileStore::default();
        store.open(uri(), "treaty", 1, "let a;").unwrap();
        assert!(store.tree(&uri()).unwrap().find("script_ts").is_some());

        store.apply_settings(WorkspaceSettings {
            script_language: LanguageTag::JavaScript,
            ..Default::default()
        });
        let tree = store.tree(&uri()).unwrap();
        assert!(tree.find("script_js").is_some());
        assert!(tree.find("script_ts").is_none());
    }

    #[test]
    fn test_embedded_uris_follow_tree_order() {
        let store = VirtualFileStore::default();
        store
            .open(uri(), "treaty", 1, "<style lang=\"scss\">a{}</style>")
            .unwrap();
        let uris: Vec<String> = store
            .embedded_uris(&uri())
            .iter()
            .map(EmbeddedDocumentUri::to_uri_string)
            .collect();
        assert_eq!(
            uris,
            vec![
                "file:///app/src/foo.treaty.scss_0.scss",
                "file:///app/src/foo.treaty.html.html",
                "file:///app/src/foo.treaty.script_ts.ts",
            ]
        );
    }

    #[test]
    fn test_source_diagnostics_land_on_physical_file() {
        let store = VirtualFileStore::default();
        store
            .open(uri(), "treaty", 1, "let a;\n<div>{{ }}</div>")
            .unwrap();
        let diagnostics = store.source_diagnostics(&uri());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start.line, 1);
        assert_eq!(diagnostics[0].source.as_deref(), Some("ng-template"));
    }
}
