use serde::{Deserialize, Serialize};

use crate::language::LanguageTag;

/// Style block settings as written in `treaty-ls.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    /// Dialect used when a `<style>` block has no (or an unknown) `lang` attribute
    pub default_language: Option<String>,
    /// Dialects recognized in `lang="..."`
    pub languages: Option<Vec<String>>,
}

/// Host script settings as written in `treaty-ls.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfig {
    /// `typescript` or `javascript`
    pub language: Option<String>,
    /// Expose the host script as the file's main script instead of an extra script
    pub main_script: Option<bool>,
}

/// Synthetic declaration settings as written in `treaty-ls.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationsConfig {
    pub enabled: Option<bool>,
    /// Module whose `Component` type gates the linking declarations
    pub component_module: Option<String>,
}

/// Template checker settings as written in `treaty-ls.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    pub diagnostics: Option<bool>,
}

/// Raw settings layer. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatySettings {
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub declarations: DeclarationsConfig,
    #[serde(default)]
    pub template: TemplateConfig,
}

/// Resolved settings consumed by the projection core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    pub default_style_language: LanguageTag,
    pub style_languages: Vec<LanguageTag>,
    pub script_language: LanguageTag,
    pub main_script: bool,
    pub emit_declarations: bool,
    pub component_module: String,
    pub template_diagnostics: bool,
}

pub const DEFAULT_COMPONENT_MODULE: &str = "@angular/core";

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            default_style_language: LanguageTag::Css,
            style_languages: vec![LanguageTag::Css, LanguageTag::Scss, LanguageTag::Less],
            script_language: LanguageTag::TypeScript,
            main_script: true,
            emit_declarations: true,
            component_module: DEFAULT_COMPONENT_MODULE.to_string(),
            template_diagnostics: true,
        }
    }
}

impl WorkspaceSettings {
    /// Resolve a `lang` attribute value to a style dialect, falling back to the default.
    pub fn style_language_for(&self, lang: Option<&str>) -> LanguageTag {
        lang.and_then(LanguageTag::from_language_id)
            .filter(|tag| self.style_languages.contains(tag))
            .unwrap_or(self.default_style_language)
    }
}

impl From<&TreatySettings> for WorkspaceSettings {
    fn from(settings: &TreatySettings) -> Self {
        let defaults = WorkspaceSettings::default();

        let style_languages: Vec<LanguageTag> = settings
            .style
            .languages
            .as_ref()
            .map(|langs| {
                langs
                    .iter()
                    .filter_map(|lang| LanguageTag::from_language_id(lang))
                    .filter(LanguageTag::is_style)
                    .collect()
            })
            .unwrap_or_else(|| defaults.style_languages.clone());

        let default_style_language = settings
            .style
            .default_language
            .as_deref()
            .and_then(LanguageTag::from_language_id)
            .filter(LanguageTag::is_style)
            .unwrap_or(defaults.default_style_language);

        let script_language = settings
            .script
            .language
            .as_deref()
            .and_then(LanguageTag::from_language_id)
            .filter(LanguageTag::is_script)
            .unwrap_or(defaults.script_language);

        Self {
            default_style_language,
            style_languages,
            script_language,
            main_script: settings.script.main_script.unwrap_or(defaults.main_script),
            emit_declarations: settings
                .declarations
                .enabled
                .unwrap_or(defaults.emit_declarations),
            component_module: settings
                .declarations
                .component_module
                .clone()
                .unwrap_or(defaults.component_module),
            template_diagnostics: settings
                .template
                .diagnostics
                .unwrap_or(defaults.template_diagnostics),
        }
    }
}

impl From<TreatySettings> for WorkspaceSettings {
    fn from(settings: TreatySettings) -> Self {
        WorkspaceSettings::from(&settings)
    }
}
