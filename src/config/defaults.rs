//! Programmed defaults, the lowest settings layer.

use super::settings::{
    DEFAULT_COMPONENT_MODULE, DeclarationsConfig, ScriptConfig, StyleConfig, TemplateConfig,
    TreatySettings,
};

/// Returns the default settings layer.
///
/// Every field is filled so that merging with it always yields complete settings.
pub fn default_settings() -> TreatySettings {
    TreatySettings {
        style: StyleConfig {
            default_language: Some("css".to_string()),
            languages: Some(vec![
                "css".to_string(),
                "scss".to_string(),
                "less".to_string(),
            ]),
        },
        script: ScriptConfig {
            language: Some("typescript".to_string()),
            main_script: Some(true),
        },
        declarations: DeclarationsConfig {
            enabled: Some(true),
            component_module: Some(DEFAULT_COMPONENT_MODULE.to_string()),
        },
        template: TemplateConfig {
            diagnostics: Some(true),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkspaceSettings;

    #[test]
    fn test_defaults_resolve_to_workspace_defaults() {
        assert_eq!(
            WorkspaceSettings::from(default_settings()),
            WorkspaceSettings::default()
        );
    }

    #[test]
    fn test_defaults_serialize_to_toml() {
        let rendered = toml::to_string(&default_settings()).expect("defaults should serialize");
        assert!(rendered.contains("defaultLanguage = \"css\""));
        assert!(rendered.contains("componentModule = \"@angular/core\""));
    }
}
