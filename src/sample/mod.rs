pub mod arena;
pub mod token;

use crate::config::value::{Origin, SettingMap, SettingValue};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub use arena::{SampleArena, SampleId};
pub use token::{ReplacementType, Token, TokenDraft, TokenField, TokenFieldValue, TokenTable};

pub const RAW_FIELD: &str = "_raw";
pub const TIME_FIELD: &str = "_time";

/// Generators that read their events from a sample file
pub const FILE_GENERATORS: [&str; 2] = ["default", "replay"];

/// One event read from a sample file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecord {
    pub fields: BTreeMap<String, String>,
}

impl EventRecord {
    pub fn new(raw: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(RAW_FIELD.to_string(), raw.into());
        Self { fields }
    }

    pub fn raw(&self) -> &str {
        self.fields.get(RAW_FIELD).map_or("", String::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Append a newline unless the raw text already ends with one
    pub fn terminate(&mut self) {
        if let Some(raw) = self.fields.get_mut(RAW_FIELD) {
            if !raw.ends_with('\n') {
                raw.push('\n');
            }
        }
    }
}

/// A resolved unit of generation configuration, bound to at most one sample file.
#[derive(Debug, Clone)]
pub struct Sample {
    /// File base name once matched, otherwise the stanza name
    pub name: String,
    /// Stanza name (possibly a regex) this sample came from
    pub orig_name: String,
    pub app: String,
    pub file_path: Option<PathBuf>,
    /// Declaration order, starting at 1
    pub priority: usize,
    pub settings: SettingMap,
    /// Settings written in the stanza itself; never overwritten by merging
    pub locked: BTreeSet<String>,
    pub tokens: Vec<Token>,
    pub host_token: Option<Token>,
    raw: Option<String>,
    records: Option<Vec<EventRecord>>,
}

impl Sample {
    pub fn new(name: impl Into<String>, app: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            orig_name: name.clone(),
            name,
            app: app.into(),
            file_path: None,
            priority: 0,
            settings: SettingMap::new(),
            locked: BTreeSet::new(),
            tokens: Vec::new(),
            host_token: None,
            raw: None,
            records: None,
        }
    }

    /// Record a setting written in the sample's own stanza
    pub fn set_locked(&mut self, name: impl Into<String>, value: SettingValue) {
        let name = name.into();
        self.settings.set(name.clone(), value, Origin::Stanza);
        self.locked.insert(name);
    }

    pub fn set_derived(&mut self, name: &str, value: SettingValue) {
        self.settings.set(name, value, Origin::Derived);
    }

    /// True when the sample is the only stanza for its file name
    pub fn is_exact_match(&self) -> bool {
        self.name == self.orig_name
    }

    pub fn generator(&self) -> &str {
        self.settings.text("generator").unwrap_or("default")
    }

    pub fn uses_file_generator(&self) -> bool {
        FILE_GENERATORS.contains(&self.generator())
    }

    pub fn is_disabled(&self) -> bool {
        self.settings.bool("disabled").unwrap_or(false)
    }

    pub fn mode(&self) -> &str {
        self.settings.text("mode").unwrap_or("sample")
    }

    pub fn sample_type(&self) -> &str {
        self.settings.text("sampletype").unwrap_or("raw")
    }

    pub fn autotimestamp(&self) -> bool {
        self.settings.bool("autotimestamp").unwrap_or(false)
    }

    pub fn has_token(&self, pattern: &str, replacement: &str) -> bool {
        self.tokens.iter().any(|t| t.same_rule(pattern, replacement))
    }

    pub fn is_loaded(&self) -> bool {
        self.records.is_some()
    }

    pub fn records(&self) -> &[EventRecord] {
        self.records.as_deref().unwrap_or(&[])
    }

    /// Unsplit file contents, cached alongside the records
    pub fn raw_text(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn set_loaded(&mut self, raw: String, records: Vec<EventRecord>) {
        self.raw = Some(raw);
        self.records = Some(records);
    }

    /// Default metadata stamped onto every loaded record
    pub fn record_metadata(&self) -> Vec<(&'static str, String)> {
        ["index", "host", "source", "sourcetype"]
            .into_iter()
            .filter_map(|field| {
                self.settings
                    .text(field)
                    .map(|value| (field, value.to_string()))
            })
            .collect()
    }
}
