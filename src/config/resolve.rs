use super::expand_tilde;
use super::schema::inheritable_settings;
use super::types::{Config, RawStanza, RESERVED_STANZAS};
use super::validate::{validate_setting, Validated};
use super::value::{Origin, SettingValue};
use crate::sample::{Sample, SampleArena, SampleId, TokenTable};
use regex::Regex;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("app not set for sample in stanza '{stanza}'")]
    MissingApp { stanza: String },
}

/// Turn raw stanzas into resolved samples, one per matched sample file.
///
/// Reserved stanzas are folded into `config` first. Every other stanza is
/// validated, matched against the files of its sample directory, and merged
/// with the less specific stanzas matching the same file.
pub fn resolve(config: &mut Config, stanzas: &[RawStanza]) -> Result<Vec<Sample>, ResolveError> {
    for reserved in RESERVED_STANZAS {
        for stanza in stanzas.iter().filter(|s| s.name == reserved) {
            debug!(stanza = %stanza.name, "Applying reserved stanza to defaults");
            config.apply_reserved_stanza(stanza);
        }
    }

    let mut arena = SampleArena::new();
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    for stanza in stanzas.iter().filter(|s| !s.is_reserved()) {
        if !seen.insert(stanza.name.as_str()) {
            warn!(stanza = %stanza.name, "Stanza seen twice, keeping the first");
            continue;
        }

        let mut sample = build_sample(config, stanza)?;
        if sample.is_disabled() {
            info!(sample = %sample.name, app = %sample.app, "Sample is marked disabled");
            continue;
        }
        sample.priority = candidates.len() + 1;
        candidates.push(arena.insert(sample));
    }

    let mut matched = Vec::new();
    for id in candidates {
        match_files(config, &mut arena, id, &mut matched);
    }

    let winners = select_winners(&arena, &matched);
    for &winner in &winners {
        merge_overrides(&mut arena, winner, &matched);
    }

    let mut samples = arena.take_all(&winners);
    for sample in &mut samples {
        apply_generation_mode(sample);
    }

    info!(stanzas = stanzas.len(), samples = samples.len(), "Resolved configuration");
    Ok(samples)
}

/// Validate every key of `stanza` into a new sample. Keys that fail
/// validation are logged and dropped; a missing app is fatal.
pub fn build_sample(config: &mut Config, stanza: &RawStanza) -> Result<Sample, ResolveError> {
    let mut settings = Vec::new();
    let mut tokens = TokenTable::new();
    let mut app = None;

    for (key, raw) in &stanza.settings {
        match validate_setting(config, &stanza.name, key, raw) {
            Ok(Validated::Setting { name, value }) => settings.push((name, value)),
            Ok(Validated::Token { index, value }) => tokens.set(index, value),
            Ok(Validated::Host(value)) => tokens.set_host(value),
            Ok(Validated::App(name)) => app = Some(name),
            Err(e) => {
                error!(stanza = %stanza.name, key = %key, error = %e, "Skipping invalid setting");
            }
        }
    }

    let app = app.ok_or_else(|| {
        error!(stanza = %stanza.name, "App not set for sample");
        ResolveError::MissingApp {
            stanza: stanza.name.clone(),
        }
    })?;

    let mut sample = Sample::new(&stanza.name, app);
    for (name, value) in settings {
        sample.set_locked(name, value);
    }
    let (list, host) = tokens.finish(&stanza.name);
    sample.tokens = list;
    sample.host_token = host;
    sample.settings.fill_defaults(config.defaults());

    Ok(sample)
}

/// Directory searched for the sample's files.
///
/// A configured `sampleDir` is used as is when it exists and is otherwise
/// taken relative to the configuration root. Without one, `samples/` is
/// looked up next to the configuration, then in the working directory, then
/// one level above it.
pub fn sample_dir(config: &Config, sample: &Sample) -> PathBuf {
    let search = config.search_paths();

    if let Some(dir) = sample.settings.text("sampleDir") {
        let configured = expand_tilde(Path::new(dir));
        if configured.exists() {
            return configured;
        }
        debug!(sample = %sample.name, dir = %dir, "Sample directory taken relative to config root");
        return search.config_root.join(configured);
    }

    let mut chain = vec![
        search.config_root.join("samples"),
        search.working_dir.join("samples"),
    ];
    if let Some(parent) = search.working_dir.parent() {
        chain.push(parent.join("samples"));
    }

    let mut tried = chain.into_iter().peekable();
    while let Some(dir) = tried.next() {
        let Some(next) = tried.peek() else {
            return dir;
        };
        if dir.exists() {
            return dir;
        }
        warn!(
            sample = %sample.name,
            missing = %dir.display(),
            next = %next.display(),
            "Path not found for samples, trying fallback"
        );
    }
    search.config_root.join("samples")
}

/// Regular files in `dir` whose names match `name` from their start, sorted
/// by file name. A name that is not a valid regex is matched literally.
pub fn matching_files(dir: &Path, name: &str) -> Vec<PathBuf> {
    let re = Regex::new(&format!("^(?:{name})")).or_else(|e| {
        debug!(name = %name, error = %e, "Stanza name is not a regex, matching literally");
        Regex::new(&format!("^{}", regex::escape(name)))
    });
    let Ok(re) = re else {
        return Vec::new();
    };

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| re.is_match(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

fn match_files(config: &Config, arena: &mut SampleArena, id: SampleId, matched: &mut Vec<SampleId>) {
    let Some(sample) = arena.get(id) else {
        return;
    };

    let dir = sample_dir(config, sample);
    let files = matching_files(&dir, &sample.name);

    if files.is_empty() {
        warn!(sample = %sample.name, dir = %dir.display(), "Sample in config but no matching files");
        if !sample.uses_file_generator() {
            matched.push(id);
        }
        return;
    }

    for path in files {
        let Some(copy) = arena.duplicate(id) else {
            continue;
        };
        if let Some(clone) = arena.get_mut(copy) {
            debug!(
                file = %path.display(),
                app = %clone.app,
                stanza = %clone.orig_name,
                priority = clone.priority,
                "Found sample file"
            );
            bind_to_file(config, clone, path);
            matched.push(copy);
        }
    }
}

/// Point a cloned sample at one matched file and derive its output naming.
fn bind_to_file(config: &Config, sample: &mut Sample, path: PathBuf) {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let output_mode = sample.settings.text("outputMode").unwrap_or_default().to_string();
    let spool_file = sample.settings.text("spoolFile").map(str::to_string);
    let spool_dir = PathBuf::from(sample.settings.text("spoolDir").unwrap_or_default());
    let default_spool = spool_file.is_some() && spool_file.as_deref() == config.default_text("spoolFile");
    let has_file_name = sample.settings.contains("fileName");

    if output_mode == "spool" && default_spool {
        sample.set_derived("spoolFile", SettingValue::Text(base.clone()));
    }
    if output_mode == "file" && !has_file_name {
        let file_name = match spool_file {
            Some(_) if default_spool => Some(spool_dir.join(&base)),
            Some(spool) => Some(spool_dir.join(spool)),
            None => None,
        };
        if let Some(file_name) = file_name {
            sample.set_derived(
                "fileName",
                SettingValue::Text(file_name.to_string_lossy().into_owned()),
            );
        }
    }

    sample.orig_name = std::mem::replace(&mut sample.name, base);
    sample.file_path = Some(path);
}

/// For each file keep only the most specific sample: an exact name match
/// first, then the longest stanza name, then the earliest declared. Samples
/// bound to no file are all kept.
fn select_winners(arena: &SampleArena, matched: &[SampleId]) -> Vec<SampleId> {
    let specificity = |s: &Sample| (s.is_exact_match(), s.orig_name.len(), Reverse(s.priority));

    matched
        .iter()
        .copied()
        .filter(|&id| {
            let Some(sample) = arena.get(id) else {
                return false;
            };
            let Some(path) = &sample.file_path else {
                return true;
            };

            let best = matched
                .iter()
                .copied()
                .filter_map(|other| arena.get(other).map(|s| (other, s)))
                .filter(|(_, s)| s.file_path.as_ref() == Some(path))
                .max_by_key(|(_, s)| specificity(*s))
                .map(|(other, _)| other);

            if best == Some(id) {
                debug!(sample = %sample.name, stanza = %sample.orig_name, "Chose sample for file");
                true
            } else {
                false
            }
        })
        .collect()
}

/// Fill the winner's unset settings from the other samples bound to the same
/// file, latest declared first, and append their tokens after its own.
fn merge_overrides(arena: &mut SampleArena, winner: SampleId, matched: &[SampleId]) {
    let Some(path) = arena.get(winner).and_then(|s| s.file_path.clone()) else {
        return;
    };

    let sources: Vec<Sample> = matched
        .iter()
        .rev()
        .filter(|&&id| id != winner)
        .filter_map(|&id| arena.get(id))
        .filter(|s| s.file_path.as_ref() == Some(&path))
        .cloned()
        .collect();

    if let Some(target) = arena.get_mut(winner) {
        for source in &sources {
            inherit_from(target, source);
        }
    }
}

pub fn inherit_from(target: &mut Sample, source: &Sample) {
    for spec in inheritable_settings() {
        let name = spec.name;
        if target.settings.is_explicit(name)
            || target.locked.contains(name)
            || !source.settings.is_explicit(name)
        {
            continue;
        }
        if let Some(value) = source.settings.get(name) {
            debug!(
                setting = name,
                from = %source.orig_name,
                to = %target.name,
                app = %target.app,
                "Overriding setting"
            );
            target.settings.set(name, value.clone(), Origin::Inherited);
        }
    }

    target.tokens.extend(source.tokens.iter().cloned());
}

/// Pin settings implied by per-day volume rating and replay mode.
pub fn apply_generation_mode(sample: &mut Sample) {
    if sample
        .settings
        .float("perDayVolume")
        .is_some_and(|volume| volume != 0.0)
    {
        info!(sample = %sample.name, "Stanza contains per day volume, changing rater and generator");
        sample.set_derived("rater", SettingValue::Text("perdayvolume".into()));
        sample.set_derived("count", SettingValue::Int(1));
        sample.set_derived("generator", SettingValue::Text("perdayvolumegenerator".into()));
    }

    if sample.mode() == "replay" {
        debug!(sample = %sample.name, "Setting defaults for replay sample");
        sample.set_derived("earliest", SettingValue::Text("now".into()));
        sample.set_derived("latest", SettingValue::Text("now".into()));
        sample.set_derived("count", SettingValue::Int(1));
        for rate in ["randomizeCount", "hourOfDayRate", "dayOfWeekRate", "minuteOfHourRate"] {
            sample.settings.remove(rate);
        }
        sample.set_derived("interval", SettingValue::Int(0));
        sample.set_derived("generator", SettingValue::Text("replay".into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchPaths;
    use crate::sample::{ReplacementType, Token};
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        Config::new(SearchPaths::new(dir.path(), dir.path()))
    }

    #[test]
    fn test_build_sample_locks_stanza_settings() {
        let dir = TempDir::new().unwrap();
        let mut c = config_in(&dir);
        let stanza = RawStanza::new("web.log")
            .with("eai:acl", "search")
            .with("interval", "60")
            .with("count", "not-a-number");

        let sample = build_sample(&mut c, &stanza).unwrap();

        assert_eq!(sample.app, "search");
        assert!(sample.locked.contains("interval"));
        assert!(sample.settings.is_explicit("interval"));
        assert!(!sample.settings.is_explicit("count"));
        assert_eq!(sample.settings.int("count"), Some(-1));
    }

    #[test]
    fn test_missing_app_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut c = config_in(&dir);
        let stanzas = vec![RawStanza::new("web.log").with("interval", "5")];

        let err = resolve(&mut c, &stanzas).unwrap_err();
        assert!(matches!(err, ResolveError::MissingApp { ref stanza } if stanza == "web.log"));
    }

    #[test]
    fn test_matching_is_anchored_and_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["web-2.log", "web-1.log", "old-web.log"] {
            fs::write(dir.path().join(name), "x\n").unwrap();
        }
        fs::create_dir(dir.path().join("web-dir")).unwrap();

        let files = matching_files(dir.path(), r"web-\d\.log");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["web-1.log", "web-2.log"]);

        assert_eq!(matching_files(dir.path(), "web-").len(), 2);
    }

    #[test]
    fn test_invalid_regex_name_matches_literally() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a(b.log"), "x\n").unwrap();
        assert_eq!(matching_files(dir.path(), "a(b").len(), 1);
    }

    #[test]
    fn test_configured_sample_dir_relative_to_config_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("custom")).unwrap();
        let c = config_in(&dir);
        let mut sample = Sample::new("x", "app");
        sample.set_locked("sampleDir", SettingValue::Text("custom".into()));

        assert_eq!(sample_dir(&c, &sample), dir.path().join("custom"));
    }

    #[test]
    fn test_inherit_respects_explicit_and_locked() {
        let mut target = Sample::new("a.log", "app");
        target.set_locked("interval", SettingValue::Int(60));
        target.settings.set("count", SettingValue::Int(-1), Origin::Default);
        target.settings.set("earliest", SettingValue::Text("now".into()), Origin::Default);
        target.tokens.push(Token::new("own", ReplacementType::Static, "x"));

        let mut source = Sample::new("a.*", "app");
        source.set_locked("interval", SettingValue::Int(5));
        source.set_locked("count", SettingValue::Int(10));
        source.settings.set("earliest", SettingValue::Text("-1h".into()), Origin::Default);
        source.tokens.push(Token::new("inherited", ReplacementType::Static, "y"));

        inherit_from(&mut target, &source);

        assert_eq!(target.settings.int("interval"), Some(60));
        assert_eq!(target.settings.int("count"), Some(10));
        assert_eq!(target.settings.origin("count"), Some(Origin::Inherited));
        assert_eq!(target.settings.text("earliest"), Some("now"));
        let patterns: Vec<_> = target.tokens.iter().map(|t| t.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["own", "inherited"]);
    }

    #[test]
    fn test_replay_mode_pins_timing() {
        let dir = TempDir::new().unwrap();
        let mut c = config_in(&dir);
        let stanza = RawStanza::new("r.log")
            .with("eai:acl", "app")
            .with("mode", "replay")
            .with("interval", "30")
            .with("earliest", "-1h");
        let mut sample = build_sample(&mut c, &stanza).unwrap();

        apply_generation_mode(&mut sample);

        assert_eq!(sample.settings.int("interval"), Some(0));
        assert_eq!(sample.settings.int("count"), Some(1));
        assert_eq!(sample.settings.text("earliest"), Some("now"));
        assert_eq!(sample.generator(), "replay");
        assert!(!sample.settings.contains("randomizeCount"));
    }

    #[test]
    fn test_per_day_volume_switches_rater() {
        let dir = TempDir::new().unwrap();
        let mut c = config_in(&dir);
        let stanza = RawStanza::new("v.log")
            .with("eai:acl", "app")
            .with("perDayVolume", "10");
        let mut sample = build_sample(&mut c, &stanza).unwrap();

        apply_generation_mode(&mut sample);

        assert_eq!(sample.settings.text("rater"), Some("perdayvolume"));
        assert_eq!(sample.generator(), "perdayvolumegenerator");
        assert_eq!(sample.settings.int("count"), Some(1));
    }
}
