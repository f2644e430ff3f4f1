pub mod defaults;
pub mod settings;
pub mod user;

pub use settings::{
    DeclarationsConfig, ScriptConfig, StyleConfig, TemplateConfig, TreatySettings,
    WorkspaceSettings,
};
pub use user::{UserConfigError, UserConfigResult, load_user_config, user_config_path};

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{TreatyError, TreatyResult};

/// File name of user and project configuration files.
pub const CONFIG_FILE_NAME: &str = "treaty-ls.toml";

/// Merge multiple settings layers in order.
/// Later layers have higher precedence.
/// Use this for layered config: `merge_all(&[defaults, user, project, override])`
pub fn merge_all(configs: &[Option<TreatySettings>]) -> Option<TreatySettings> {
    configs.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two settings layers, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<TreatySettings>,
    primary: Option<TreatySettings>,
) -> Option<TreatySettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) => Some(settings),
        (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(TreatySettings {
            style: StyleConfig {
                default_language: primary
                    .style
                    .default_language
                    .or(fallback.style.default_language),
                languages: primary.style.languages.or(fallback.style.languages),
            },
            script: ScriptConfig {
                language: primary.script.language.or(fallback.script.language),
                main_script: primary.script.main_script.or(fallback.script.main_script),
            },
            declarations: DeclarationsConfig {
                enabled: primary.declarations.enabled.or(fallback.declarations.enabled),
                component_module: primary
                    .declarations
                    .component_module
                    .or(fallback.declarations.component_module),
            },
            template: TemplateConfig {
                diagnostics: primary.template.diagnostics.or(fallback.template.diagnostics),
            },
        }),
    }
}

/// Read a single settings file, failing loudly.
///
/// Used for files named explicitly by the user (e.g. `--config`).
pub fn load_config_file(path: &Path) -> TreatyResult<TreatySettings> {
    let contents = fs::read_to_string(path)?;
    toml::from_str::<TreatySettings>(&contents)
        .map_err(|err| TreatyError::config(format!("{}: {}", path.display(), err)))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEventKind {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsEvent {
    pub kind: SettingsEventKind,
    pub message: String,
}

impl SettingsEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Warning,
            message: message.into(),
        }
    }

    /// Forward the event to the `log` facade.
    pub fn log(&self) {
        match self.kind {
            SettingsEventKind::Info => log::info!(target: "treaty_ls::settings", "{}", self.message),
            SettingsEventKind::Warning => {
                log::warn!(target: "treaty_ls::settings", "{}", self.message)
            }
        }
    }
}

#[derive(Debug)]
pub struct SettingsLoadOutcome {
    pub settings: WorkspaceSettings,
    pub events: Vec<SettingsEvent>,
}

/// Load settings from every layer.
///
/// Layers: defaults < user config < project `treaty-ls.toml` < override value.
/// Failures in a layer are reported as warning events and the layer is skipped.
pub fn load_settings(root_path: Option<&Path>, override_settings: Option<Value>) -> SettingsLoadOutcome {
    let mut events = Vec::new();

    let defaults = Some(defaults::default_settings());
    let user_config = load_user_config_with_events(&mut events);
    let project_settings = load_project_settings(root_path, &mut events);
    let override_settings =
        override_settings.and_then(|value| parse_override_settings(value, &mut events));

    let merged = merge_all(&[defaults, user_config, project_settings, override_settings]);
    let settings = merged
        .map(WorkspaceSettings::from)
        .unwrap_or_default();

    SettingsLoadOutcome { settings, events }
}

fn load_user_config_with_events(events: &mut Vec<SettingsEvent>) -> Option<TreatySettings> {
    match load_user_config() {
        Ok(Some(settings)) => {
            events.push(SettingsEvent::info("Loaded user config"));
            Some(settings)
        }
        Ok(None) => None,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to load user config: {}",
                err
            )));
            None
        }
    }
}

fn load_project_settings(
    root_path: Option<&Path>,
    events: &mut Vec<SettingsEvent>,
) -> Option<TreatySettings> {
    let root = root_path?;
    let config_path = root.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return None;
    }

    events.push(SettingsEvent::info(format!(
        "Found config file: {}",
        config_path.display()
    )));

    match load_config_file(&config_path) {
        Ok(settings) => {
            events.push(SettingsEvent::info(format!(
                "Successfully loaded {}",
                CONFIG_FILE_NAME
            )));
            Some(settings)
        }
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to load {}: {}",
                CONFIG_FILE_NAME, err
            )));
            None
        }
    }
}

fn parse_override_settings(value: Value, events: &mut Vec<SettingsEvent>) -> Option<TreatySettings> {
    match serde_json::from_value::<TreatySettings>(value) {
        Ok(settings) => {
            events.push(SettingsEvent::info("Parsed override settings"));
            Some(settings)
        }
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to parse override settings: {}",
                err
            )));
            None
        }
    }
}
