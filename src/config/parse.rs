use super::key::ACL_KEY;
use super::types::RawStanza;
use crate::config::{expand_env_vars, unexpanded_env_vars};
use serde_yaml::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Load stanzas from a YAML stanza file.
///
/// Stanzas without an `eai:acl` key get `default_app` as their owning app
/// when one is given.
pub fn load_stanzas(path: &Path, default_app: Option<&str>) -> Result<Vec<RawStanza>, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    let yaml_string = expand_env_vars(&yaml_string);
    check_unexpanded_vars(&yaml_string)?;

    let stanzas = parse_stanzas(&yaml_string, default_app).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })?;

    debug!(path = %path.display(), stanzas = stanzas.len(), "Loaded stanza file");
    Ok(stanzas)
}

/// Parse a YAML mapping of stanza name to settings, keeping file order.
///
/// Scalar values are stringified. Sequences and mappings are re-encoded as
/// JSON text, except an `eai:acl` mapping which is flattened to its `app`.
pub fn parse_stanzas(yaml: &str, default_app: Option<&str>) -> Result<Vec<RawStanza>, ConfigError> {
    let document: Value = serde_yaml::from_str(yaml)?;

    let root = match document {
        Value::Mapping(root) => root,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(ConfigError::Validation(
                "stanza file must be a mapping of stanza name to settings".to_string(),
            ))
        }
    };

    let mut stanzas = Vec::with_capacity(root.len());
    for (name, body) in root {
        let name = scalar_text(&name).ok_or_else(|| {
            ConfigError::Validation("stanza names must be scalars".to_string())
        })?;
        let mut stanza = RawStanza::new(name);

        let settings = match body {
            Value::Mapping(settings) => settings,
            Value::Null => Default::default(),
            _ => {
                return Err(ConfigError::Validation(format!(
                    "stanza '{}' must be a mapping of settings",
                    stanza.name
                )))
            }
        };

        for (key, value) in settings {
            let key = scalar_text(&key).ok_or_else(|| {
                ConfigError::Validation(format!("stanza '{}' has a non-scalar key", stanza.name))
            })?;
            let value = setting_text(&key, &value).map_err(|reason| {
                ConfigError::Validation(format!(
                    "stanza '{}' key '{}': {}",
                    stanza.name, key, reason
                ))
            })?;
            stanza.settings.push((key, value));
        }

        if let Some(app) = default_app {
            if !stanza.is_reserved() && stanza.get(ACL_KEY).is_none() {
                stanza.settings.push((ACL_KEY.to_string(), app.to_string()));
            }
        }

        stanzas.push(stanza);
    }

    Ok(stanzas)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn setting_text(key: &str, value: &Value) -> Result<String, String> {
    if let Some(text) = scalar_text(value) {
        return Ok(text);
    }

    if key == ACL_KEY {
        if let Some(app) = value.get("app").and_then(scalar_text) {
            return Ok(app);
        }
    }

    match value {
        Value::Sequence(_) | Value::Mapping(_) => {
            serde_json::to_string(value).map_err(|e| format!("cannot encode as JSON: {e}"))
        }
        _ => Err("tagged values are not supported".to_string()),
    }
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let unexpanded_vars = unexpanded_env_vars(yaml_string);

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=/path/to/directory\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables (e.g., export SAMPLE_ROOT=/opt/samples)\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}
