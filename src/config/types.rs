use super::schema::SETTINGS;
use super::validate::{coerce, validate_setting, Validated};
use super::value::{Origin, SettingMap, SettingValue};
use crate::source::autotimestamp::{candidates_from_json, default_candidates, TimestampCandidate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Stanza names that feed the process defaults instead of becoming samples
pub const RESERVED_STANZAS: [&str; 2] = ["default", "global"];

/// A named block of raw key/value pairs, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStanza {
    pub name: String,
    pub settings: Vec<(String, String)>,
}

impl RawStanza {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_reserved(&self) -> bool {
        RESERVED_STANZAS.contains(&self.name.as_str())
    }
}

/// Directories sample lookup falls back through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    /// Directory holding the stanza configuration
    pub config_root: PathBuf,
    pub working_dir: PathBuf,
}

impl SearchPaths {
    pub fn new(config_root: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_root: config_root.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Paths relative to the configuration file, rooted at `config_path`'s directory
    pub fn for_config_file(config_path: &Path) -> Self {
        let config_root = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            config_root,
            working_dir,
        }
    }
}

/// Process-wide generation configuration.
///
/// Built once, updated by the reserved stanzas and `seed` settings during
/// resolution, and read-only afterwards.
#[derive(Debug)]
pub struct Config {
    defaults: SettingMap,
    autotimestamps: Vec<TimestampCandidate>,
    search: SearchPaths,
    seed: Option<u64>,
    rng: StdRng,
}

impl Config {
    pub fn new(search: SearchPaths) -> Self {
        let mut defaults = SettingMap::new();
        for spec in SETTINGS {
            let Some(raw) = spec.default else { continue };
            match coerce("default", spec.name, spec.kind, raw) {
                Ok(value) => defaults.set(spec.name, value, Origin::Default),
                Err(e) => error!(setting = spec.name, error = %e, "Built-in default does not validate"),
            }
        }

        Self {
            defaults,
            autotimestamps: default_candidates(),
            search,
            seed: None,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn defaults(&self) -> &SettingMap {
        &self.defaults
    }

    pub fn default_value(&self, name: &str) -> Option<&SettingValue> {
        self.defaults.get(name)
    }

    pub fn default_text(&self, name: &str) -> Option<&str> {
        self.defaults.text(name)
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search
    }

    /// Ranked timestamp formats tried by autotimestamp detection
    pub fn autotimestamp_candidates(&self) -> &[TimestampCandidate] {
        &self.autotimestamps
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn reseed(&mut self, seed: u64) {
        self.seed = Some(seed);
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Random source for callers drawing from the configuration; reseeded by `seed`
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Fold a reserved stanza (`default` or `global`) into the defaults.
    /// Invalid values are skipped like in any other stanza.
    pub fn apply_reserved_stanza(&mut self, stanza: &RawStanza) {
        for (key, raw) in &stanza.settings {
            match validate_setting(self, &stanza.name, key, raw) {
                Ok(Validated::Setting { name, value }) => {
                    if name == "autotimestamps" {
                        self.set_autotimestamps(&value);
                    }
                    self.defaults.set(name, value, Origin::Default);
                }
                Ok(Validated::App(_)) => {}
                Ok(_) => {
                    warn!(stanza = %stanza.name, key = %key, "Tokens are ignored in reserved stanzas");
                }
                Err(e) => {
                    error!(stanza = %stanza.name, key = %key, error = %e, "Skipping invalid setting");
                }
            }
        }
    }

    fn set_autotimestamps(&mut self, value: &SettingValue) {
        match value.as_json().and_then(candidates_from_json) {
            Some(candidates) => self.autotimestamps = candidates,
            None => warn!("autotimestamps must be a list of [pattern, format] pairs, keeping built-in list"),
        }
    }
}
