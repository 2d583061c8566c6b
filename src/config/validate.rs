use super::key::{classify, SettingKey};
use super::schema::{lookup, SettingKind};
use super::types::Config;
use super::value::{SettingValue, TimezoneOffset};
use crate::sample::token::{ReplacementType, TokenField, TokenFieldValue};
use chrono::TimeDelta;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("could not parse int for '{key}' in stanza '{stanza}': '{value}'")]
    Int {
        stanza: String,
        key: String,
        value: String,
    },

    #[error("could not parse float for '{key}' in stanza '{stanza}': '{value}'")]
    Float {
        stanza: String,
        key: String,
        value: String,
    },

    #[error("could not parse json for '{key}' in stanza '{stanza}': {source}")]
    Json {
        stanza: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("setting '{key}' is invalid for value '{value}' in stanza '{stanza}' (expected one of: {})", .allowed.join(", "))]
    Choice {
        stanza: String,
        key: String,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("could not parse timezone '{value}' in stanza '{stanza}'")]
    Timezone { stanza: String, value: String },

    #[error("could not parse token index '{index}' token type '{field}' in stanza '{stanza}'")]
    TokenField {
        stanza: String,
        index: usize,
        field: String,
    },

    #[error("invalid replacementType '{value}' for token index '{index}' in stanza '{stanza}'")]
    ReplacementType {
        stanza: String,
        index: usize,
        value: String,
    },

    #[error("could not parse host token type '{field}' in stanza '{stanza}'")]
    HostField { stanza: String, field: String },

    #[error("empty app in 'eai:acl' for stanza '{stanza}'")]
    EmptyApp { stanza: String },
}

/// Result of validating one stanza key
#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    Setting { name: String, value: SettingValue },
    Token { index: usize, value: TokenFieldValue },
    Host(TokenFieldValue),
    App(String),
}

/// Validate and coerce a single raw key/value pair from `stanza`.
///
/// Unknown plain keys are passed through as text. A `seed` setting reseeds
/// the config's random source as a side effect.
pub fn validate_setting(
    config: &mut Config,
    stanza: &str,
    key: &str,
    value: &str,
) -> Result<Validated, ValidationError> {
    debug!(stanza = %stanza, key = %key, value = %value, "Validating setting");

    match classify(key) {
        SettingKey::Token { index, field } => {
            let field_kind =
                TokenField::parse(field).ok_or_else(|| ValidationError::TokenField {
                    stanza: stanza.to_string(),
                    index,
                    field: field.to_string(),
                })?;
            let value = token_field_value(field_kind, value).ok_or_else(|| {
                ValidationError::ReplacementType {
                    stanza: stanza.to_string(),
                    index,
                    value: value.to_string(),
                }
            })?;
            Ok(Validated::Token { index, value })
        }
        SettingKey::Host { field } => {
            let field_kind =
                TokenField::parse_host(field).ok_or_else(|| ValidationError::HostField {
                    stanza: stanza.to_string(),
                    field: field.to_string(),
                })?;
            let value = match field_kind {
                TokenField::Pattern => TokenFieldValue::Pattern(value.to_string()),
                _ => TokenFieldValue::Replacement(value.to_string()),
            };
            Ok(Validated::Host(value))
        }
        SettingKey::Acl => parse_acl(stanza, value).map(Validated::App),
        SettingKey::Plain(name) => {
            let Some(spec) = lookup(name) else {
                warn!(stanza = %stanza, key = %name, "Key is not a valid setting, keeping it as text");
                return Ok(Validated::Setting {
                    name: name.to_string(),
                    value: SettingValue::Text(value.to_string()),
                });
            };

            let coerced = coerce(stanza, name, spec.kind, value)?;
            if spec.kind == SettingKind::Seed {
                if let SettingValue::Int(seed) = coerced {
                    info!(seed, "Using random seed");
                    config.reseed(seed as u64);
                }
            }

            Ok(Validated::Setting {
                name: name.to_string(),
                value: coerced,
            })
        }
    }
}

fn token_field_value(field: TokenField, value: &str) -> Option<TokenFieldValue> {
    match field {
        TokenField::Pattern => Some(TokenFieldValue::Pattern(value.to_string())),
        TokenField::Replacement => Some(TokenFieldValue::Replacement(value.to_string())),
        TokenField::ReplacementType => value
            .parse::<ReplacementType>()
            .ok()
            .map(TokenFieldValue::ReplacementType),
    }
}

/// Coerce `value` according to `kind`. Pure apart from the error context.
pub fn coerce(
    stanza: &str,
    key: &str,
    kind: SettingKind,
    value: &str,
) -> Result<SettingValue, ValidationError> {
    match kind {
        SettingKind::Int | SettingKind::Seed => parse_int(stanza, key, value).map(SettingValue::Int),
        SettingKind::Count => {
            let count = parse_int(stanza, key, value)?;
            // zero means "no bound of its own", kept distinct from a literal count
            Ok(SettingValue::Int(if count == 0 { -1 } else { count }))
        }
        SettingKind::Float => value
            .trim()
            .parse::<f64>()
            .map(SettingValue::Float)
            .map_err(|_| ValidationError::Float {
                stanza: stanza.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            }),
        SettingKind::Bool => Ok(SettingValue::Bool(parse_bool(value))),
        SettingKind::Json => serde_json::from_str(value)
            .map(SettingValue::Json)
            .map_err(|source| ValidationError::Json {
                stanza: stanza.to_string(),
                key: key.to_string(),
                source,
            }),
        SettingKind::Choice(allowed) => {
            if allowed.contains(&value) {
                Ok(SettingValue::Text(value.to_string()))
            } else {
                Err(ValidationError::Choice {
                    stanza: stanza.to_string(),
                    key: key.to_string(),
                    value: value.to_string(),
                    allowed,
                })
            }
        }
        SettingKind::Timezone => parse_timezone(value)
            .map(SettingValue::Timezone)
            .ok_or_else(|| ValidationError::Timezone {
                stanza: stanza.to_string(),
                value: value.to_string(),
            }),
        SettingKind::Text | SettingKind::Acl => Ok(SettingValue::Text(value.to_string())),
    }
}

fn parse_int(stanza: &str, key: &str, value: &str) -> Result<i64, ValidationError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::Int {
            stanza: stanza.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// `0`, `false` and `False` are false; any other non-empty string is true.
pub fn parse_bool(value: &str) -> bool {
    !matches!(value, "0" | "false" | "False" | "")
}

/// Parse a `timezone` value: anything containing `local`, or a signed `HHMM`
/// integer such as `-0130`.
pub fn parse_timezone(value: &str) -> Option<TimezoneOffset> {
    if value.contains("local") {
        return Some(TimezoneOffset::Local);
    }

    let hhmm: i64 = value.trim().parse().ok()?;
    // truncating division and remainder keep the minute sign matched to the hour
    let hours = TimeDelta::try_hours(hhmm / 100)?;
    let minutes = TimeDelta::try_minutes(hhmm % 100)?;
    Some(TimezoneOffset::Fixed(hours + minutes))
}

/// Owning app from an `eai:acl` value: either a JSON object with an `app`
/// member or the bare app name.
fn parse_acl(stanza: &str, value: &str) -> Result<String, ValidationError> {
    let app = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(serde_json::Value::Object(map)) => map
            .get("app")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => value.trim().to_string(),
    };

    if app.is_empty() {
        Err(ValidationError::EmptyApp {
            stanza: stanza.to_string(),
        })
    } else {
        Ok(app)
    }
}
