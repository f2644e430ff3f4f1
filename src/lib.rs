//! Projection core for `.treaty` composite files.
//!
//! A composite file mixes a host script, markup template blocks and
//! `<style>` blocks. Each embedded language is projected into its own
//! virtual code with a source map back to the physical file, so that
//! per-language services can run on plain text and their results can be
//! translated back.

pub mod config;
pub mod declarations;
pub mod document;
pub mod error;
pub mod language;
pub mod mapping;
pub mod plugin;
pub mod region;
pub mod syntax;
pub mod template;
pub mod text;
pub mod uri;
pub mod virtual_code;

pub use config::{WorkspaceSettings, load_settings};
pub use document::{SourceSnapshot, VirtualFileStore};
pub use error::{TreatyError, TreatyResult};
pub use language::{LanguageTag, ScriptKind};
pub use mapping::{CodeInformation, Mapping, SourceMap};
pub use plugin::{
    ExtraFileExtension, ExtraServiceScript, LanguagePlugin, ServiceScript, TreatyLanguagePlugin,
    TypeScriptLanguagePlugin, VirtualFile,
};
pub use virtual_code::{CodeIndex, VirtualCode, VirtualCodeTree};
