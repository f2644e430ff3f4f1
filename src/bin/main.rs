use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use treaty_ls::config::{load_config_file, load_settings};
use treaty_ls::language::{LanguageTag, TREATY_LANGUAGE_ID};
use treaty_ls::plugin;
use treaty_ls::{TreatyError, TreatyResult, VirtualFileStore, WorkspaceSettings};
use url::Url;

/// Inspect how composite `.treaty` files are projected into virtual codes
#[derive(Parser)]
#[command(name = "treaty-ls")]
#[command(version)]
#[command(about = "Inspect how composite .treaty files are projected into virtual codes")]
struct Cli {
    /// Settings file used instead of the user and project configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root searched for treaty-ls.toml (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the virtual code tree of a file as JSON
    Dump {
        file: PathBuf,

        /// Language id (default: inferred from the extension)
        #[arg(long)]
        language_id: Option<String>,
    },
    /// Print the scripts a file exposes to the script engine
    Scripts { file: PathBuf },
    /// Print template diagnostics in file coordinates; fails if any were found
    Check { file: PathBuf },
}

fn resolve_settings(cli: &Cli) -> TreatyResult<WorkspaceSettings> {
    if let Some(path) = &cli.config {
        return load_config_file(path).map(WorkspaceSettings::from);
    }

    let root = match &cli.root {
        Some(root) => Some(root.clone()),
        None => std::env::current_dir().ok(),
    };
    let outcome = load_settings(root.as_deref(), None);
    for event in &outcome.events {
        event.log();
    }
    Ok(outcome.settings)
}

fn language_id_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") => LanguageTag::TypeScript.language_id(),
        _ => TREATY_LANGUAGE_ID,
    }
}

fn open(
    store: &VirtualFileStore,
    file: &Path,
    language_id: Option<&str>,
) -> TreatyResult<Url> {
    let text = std::fs::read_to_string(file)?;
    let absolute = std::fs::canonicalize(file)?;
    let uri = Url::from_file_path(&absolute).map_err(|_| {
        TreatyError::config(format!("{} is not a valid file path", absolute.display()))
    })?;
    store.open(
        uri.clone(),
        language_id.unwrap_or_else(|| language_id_for(file)),
        0,
        text,
    )?;
    Ok(uri)
}

fn print_json(value: &impl serde::Serialize) -> TreatyResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| TreatyError::config(format!("failed to render JSON: {}", err)))?;
    println!("{}", rendered);
    Ok(())
}

fn run(cli: Cli) -> TreatyResult<ExitCode> {
    let settings = resolve_settings(&cli)?;
    log::debug!(target: "treaty_ls::settings", "Resolved settings: {:?}", settings);
    let store = VirtualFileStore::new(settings);

    match &cli.command {
        Commands::Dump { file, language_id } => {
            let uri = open(&store, file, language_id.as_deref())?;
            if let Some(tree) = store.tree(&uri) {
                print_json(&*tree)?;
            }
        }
        Commands::Scripts { file } => {
            let uri = open(&store, file, None)?;
            let extensions: Vec<_> = plugin::plugins(store.settings())
                .iter()
                .flat_map(|language_plugin| language_plugin.extra_file_extensions())
                .collect();
            print_json(&serde_json::json!({
                "scripts": store.service_scripts(&uri),
                "extraFileExtensions": extensions,
            }))?;
        }
        Commands::Check { file } => {
            let uri = open(&store, file, None)?;
            let diagnostics = store.source_diagnostics(&uri);
            print_json(&diagnostics)?;
            if !diagnostics.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use treaty_ls::config;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_language_id_inference() {
        assert_eq!(language_id_for(Path::new("a.component.ts")), "typescript");
        assert_eq!(language_id_for(Path::new("a.treaty")), "treaty");
        assert_eq!(language_id_for(Path::new("README")), "treaty");
    }

    #[test]
    fn test_config_flag_overrides_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(config::CONFIG_FILE_NAME);
        std::fs::write(&path, "[script]\nlanguage = \"javascript\"\n").unwrap();

        let cli = Cli::parse_from([
            "treaty-ls",
            "--config",
            path.to_str().unwrap(),
            "scripts",
            "a.treaty",
        ]);
        let settings = resolve_settings(&cli).unwrap();
        assert_eq!(settings.script_language, LanguageTag::JavaScript);
    }
}
