use crate::config::{load_stanzas, Config, ConfigError, SearchPaths};
use crate::export::GenerationDescriptor;
use crate::pipeline::{compile, CompileError};
use clap::ValueEnum;
use console::style;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Compile(#[from] CompileError),

    #[error("failed to encode descriptor as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode descriptor as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to write descriptor to '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Owning app for stanzas without `eai:acl`; defaults to the config directory name
    pub app: Option<String>,
    pub format: OutputFormat,
    /// Write here instead of stdout
    pub output: Option<PathBuf>,
}

pub fn run(config_path: Option<PathBuf>, options: CompileOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("{}", style("Error: config not found").red().bold());
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/samplegen/eventgen.yml");
            eprintln!("  {}", crate::config::SYSTEM_CONFIG_PATH);
            eprintln!("\nUse --config <path> to specify a stanza file, or run 'samplegen config init' to generate one.");
            std::process::exit(1);
        }
    };

    compile_file(&config_path, &options).map_err(|e| e.into())
}

/// Owning app injected when a stanza names none: the directory holding the
/// stanza file.
pub fn default_app_for(config_path: &Path) -> Option<String> {
    config_path
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
}

fn compile_file(config_path: &Path, options: &CompileOptions) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading stanzas");

    let default_app = options.app.clone().or_else(|| default_app_for(config_path));
    let stanzas = load_stanzas(config_path, default_app.as_deref())?;

    let mut config = Config::new(SearchPaths::for_config_file(config_path));
    let descriptor = compile(&mut config, &stanzas)?;

    let encoded = encode(&descriptor, options.format)?;
    match &options.output {
        Some(path) => {
            std::fs::write(path, encoded).map_err(|source| RunError::Write {
                path: path.clone(),
                source,
            })?;
            eprintln!(
                "{} {} samples written to {}",
                style("✓").green(),
                descriptor.samples.len(),
                style(path.display()).cyan()
            );
        }
        None => print!("{encoded}"),
    }

    Ok(())
}

pub fn encode(descriptor: &GenerationDescriptor, format: OutputFormat) -> Result<String, RunError> {
    Ok(match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(descriptor)?;
            json.push('\n');
            json
        }
        OutputFormat::Yaml => serde_yaml::to_string(descriptor)?,
    })
}
