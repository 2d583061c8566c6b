pub mod generate;
pub mod key;
pub mod parse;
pub mod resolve;
pub mod schema;
pub mod types;
pub mod validate;
pub mod value;

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

pub use parse::{load_stanzas, parse_stanzas, ConfigError};
pub use resolve::{resolve, ResolveError};
pub use types::{Config, RawStanza, SearchPaths};

static ENV_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
});

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    ENV_VAR
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

static SHELL_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("shell var pattern is valid")
});

/// Expands `$VAR` and `${VAR}` the way a shell path would. Used for file
/// references only; unset variables are left as written.
pub fn expand_shell_vars(text: &str) -> String {
    SHELL_VAR
        .replace_all(text, |caps: &regex::Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Names of `$env{...}` references still present in `text`, sorted and deduplicated
pub fn unexpanded_env_vars(text: &str) -> Vec<String> {
    let mut names: Vec<String> = ENV_VAR
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Expands tilde (~) in paths to the user's home directory.
/// Returns the path unchanged if it doesn't start with tilde or home directory cannot be determined.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Default stanza file location under the user's config directory
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/samplegen/eventgen.yml"))
}

pub const SYSTEM_CONFIG_PATH: &str = "/etc/samplegen/eventgen.yml";

/// Resolves the stanza file path based on explicit argument or default locations.
/// Returns the first existing path from:
/// 1. Explicit path (if provided, with tilde expansion)
/// 2. ~/.config/samplegen/eventgen.yml
/// 3. /etc/samplegen/eventgen.yml
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from(SYSTEM_CONFIG_PATH);
    if system_config.exists() {
        return Some(system_config);
    }

    None
}
