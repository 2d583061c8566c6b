use chrono::TimeDelta;
use std::collections::BTreeMap;

/// UTC offset carried by the `timezone` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimezoneOffset {
    /// Use the local system offset at generation time
    Local,
    Fixed(TimeDelta),
}

/// A coerced setting value
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Json(serde_json::Value),
    Text(String),
    Timezone(TimezoneOffset),
}

impl SettingValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(v) => Some(*v),
            SettingValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            SettingValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timezone(&self) -> Option<TimezoneOffset> {
        match self {
            SettingValue::Timezone(tz) => Some(*tz),
            _ => None,
        }
    }
}

/// Where a sample's setting value came from.
///
/// Override merging only ever fills settings whose origin is `Default`, so a
/// stanza that spells out a value equal to the default still counts as set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Filled in from the process-level defaults
    Default,
    /// Written in the sample's own stanza
    Stanza,
    /// Copied from a less specific stanza matching the same file
    Inherited,
    /// Computed during resolution (file naming, generation mode)
    Derived,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingEntry {
    pub value: SettingValue,
    pub origin: Origin,
}

/// Named settings with per-entry provenance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingMap {
    entries: BTreeMap<String, SettingEntry>,
}

impl SettingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: SettingValue, origin: Origin) {
        self.entries
            .insert(name.into(), SettingEntry { value, origin });
    }

    pub fn remove(&mut self, name: &str) -> Option<SettingEntry> {
        self.entries.remove(name)
    }

    pub fn entry(&self, name: &str) -> Option<&SettingEntry> {
        self.entries.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.entries.get(name).map(|e| &e.value)
    }

    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.entries.get(name).map(|e| e.origin)
    }

    /// True when the setting holds anything other than a process default.
    pub fn is_explicit(&self, name: &str) -> bool {
        matches!(self.origin(name), Some(origin) if origin != Origin::Default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Fill every setting missing here from `defaults`, tagged `Origin::Default`.
    pub fn fill_defaults(&mut self, defaults: &SettingMap) {
        for (name, entry) in &defaults.entries {
            if !self.entries.contains_key(name) {
                self.set(name.clone(), entry.value.clone(), Origin::Default);
            }
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(SettingValue::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(SettingValue::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(SettingValue::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(SettingValue::as_bool)
    }

    pub fn json(&self, name: &str) -> Option<&serde_json::Value> {
        self.get(name).and_then(SettingValue::as_json)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
