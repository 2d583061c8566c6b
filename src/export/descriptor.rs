use super::replacement::{parse_random, RandomReplacement};
use super::{
    Bound, GenerationDescriptor, GlobalSection, OutputSection, SampleDescriptor, TokenDescriptor,
};
use crate::config::value::SettingMap;
use crate::config::{expand_env_vars, expand_shell_vars, expand_tilde, Config};
use crate::sample::{ReplacementType, Sample, Token};
use crate::source::loader::{load_sample, LoadError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Load(#[from] LoadError),
}

static CAPTURE_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*\)").expect("capture group pattern is valid"));

/// Serialize resolved samples into a generation descriptor. Samples bound to
/// a file are loaded first if they are not yet.
pub fn export(config: &Config, samples: &mut [Sample]) -> Result<GenerationDescriptor, ExportError> {
    let mut output = OutputSection::default();
    fill_output(&mut output, config.defaults());

    let mut descriptors = Vec::with_capacity(samples.len());
    for sample in samples.iter_mut() {
        if sample.file_path.is_some() {
            load_sample(config, sample)?;
        }
        descriptors.push(describe_sample(config, sample));
        fill_output(&mut output, &sample.settings);
    }

    debug!(samples = descriptors.len(), "Exported generation descriptor");
    Ok(GenerationDescriptor {
        global: GlobalSection { output },
        samples: descriptors,
    })
}

/// First writer wins for each output field
fn fill_output(output: &mut OutputSection, settings: &SettingMap) {
    if output.file_name.is_none() {
        output.file_name = settings.text("fileName").map(str::to_string);
    }
    if output.backup_files.is_none() {
        output.backup_files = settings.int("fileBackupFiles");
    }
    if output.max_bytes.is_none() {
        output.max_bytes = settings.int("fileMaxBytes");
    }
}

pub fn describe_sample(config: &Config, sample: &Sample) -> SampleDescriptor {
    let settings = &sample.settings;

    let lines = sample
        .records()
        .iter()
        .map(|record| {
            record
                .fields
                .iter()
                .map(|(field, value)| (field.clone(), value.trim_end().to_string()))
                .collect()
        })
        .collect();

    let mut groups = FileGroups::default();
    let tokens = sample
        .tokens
        .iter()
        .enumerate()
        .filter_map(|(index, token)| describe_token(config, index, token, &mut groups))
        .collect();

    SampleDescriptor {
        name: sample.name.clone(),
        begin: settings.text("backfill").map(str::to_string),
        count: settings.int("count"),
        earliest: settings.text("earliest").map(str::to_string),
        latest: settings.text("latest").map(str::to_string),
        interval: settings.int("interval"),
        randomize_count: settings.float("randomizeCount"),
        randomize_events: settings.bool("randomizeEvents"),
        lines,
        tokens,
    }
}

/// Wrap `pattern` in a capturing group unless it already has one
pub fn wrap_pattern(pattern: &str) -> String {
    if CAPTURE_GROUP.is_match(pattern) {
        pattern.to_string()
    } else {
        format!("({pattern})")
    }
}

/// Group ids shared by tokens of one sample that pick columns from the same file
#[derive(Debug, Default)]
struct FileGroups {
    ids: HashMap<String, usize>,
}

impl FileGroups {
    fn id_for(&mut self, reference: &str) -> usize {
        let next = self.ids.len() + 1;
        *self.ids.entry(reference.to_string()).or_insert(next)
    }
}

fn describe_token(
    config: &Config,
    index: usize,
    token: &Token,
    groups: &mut FileGroups,
) -> Option<TokenDescriptor> {
    let mut out = TokenDescriptor::new(
        format!("token.{index}"),
        wrap_pattern(&token.pattern),
        token.replacement_type.as_str(),
    );

    match token.replacement_type {
        ReplacementType::ReplayTimestamp => {
            out.token_type = ReplacementType::Timestamp.as_str().to_string();
            out.replacement = Some(token.replacement.clone());
        }
        ReplacementType::File | ReplacementType::MvFile => {
            describe_file_token(config, token, &mut out, groups)?;
        }
        ReplacementType::Random | ReplacementType::Rated => match parse_random(&token.replacement) {
            Some(RandomReplacement::Integer { lower, upper }) => {
                out.replacement = Some("int".to_string());
                out.lower = Some(Bound::Int(lower));
                out.upper = Some(Bound::Int(upper));
            }
            Some(RandomReplacement::Float {
                lower,
                upper,
                precision,
            }) => {
                out.replacement = Some("float".to_string());
                out.lower = Some(Bound::Float(lower));
                out.upper = Some(Bound::Float(upper));
                out.precision = Some(precision);
            }
            Some(RandomReplacement::String { length }) => {
                out.replacement = Some("string".to_string());
                out.length = Some(length);
            }
            Some(RandomReplacement::Hex { length }) => {
                out.replacement = Some("hex".to_string());
                out.length = Some(length);
            }
            Some(RandomReplacement::List(values)) => {
                out.token_type = "choice".to_string();
                out.choice = Some(values);
            }
            None => {
                warn!(
                    token = %out.name,
                    replacement = %token.replacement,
                    "Unrecognized random replacement, passing it through"
                );
                out.replacement = Some(token.replacement.clone());
            }
        },
        _ => out.replacement = Some(token.replacement.clone()),
    }

    Some(out)
}

/// Split a `path[:column]` reference. Only a positive numeric suffix counts
/// as a column.
pub fn split_file_reference(reference: &str) -> (&str, Option<usize>) {
    match reference.rsplit_once(':') {
        Some((path, column)) if !path.is_empty() => match column.parse::<usize>() {
            Ok(column) if column > 0 => (path, Some(column)),
            Ok(_) => (path, None),
            Err(_) => (reference, None),
        },
        _ => (reference, None),
    }
}

fn resolve_token_file(config: &Config, path: &str) -> PathBuf {
    let expanded = expand_tilde(Path::new(&expand_shell_vars(&expand_env_vars(path))));
    if expanded.is_absolute() {
        expanded
    } else {
        config.search_paths().config_root.join(expanded)
    }
}

/// Fill `out` with the choices read from the token's file. Returns `None`
/// when the file cannot be read, dropping the token.
fn describe_file_token(
    config: &Config,
    token: &Token,
    out: &mut TokenDescriptor,
    groups: &mut FileGroups,
) -> Option<()> {
    let (reference, column) = split_file_reference(&token.replacement);
    let path = resolve_token_file(config, reference);
    let base_name = Path::new(reference)
        .file_name()
        .map_or_else(|| reference.to_string(), |n| n.to_string_lossy().into_owned());

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(token = %out.name, file = %path.display(), error = %e, "Token file unreadable, dropping token");
            return None;
        }
    };

    out.name = base_name.clone();
    out.sample = Some(base_name);

    match column {
        Some(column) => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(contents.as_bytes());
            let mut rows = Vec::new();
            for record in reader.records() {
                match record {
                    Ok(record) => rows.push(
                        record
                            .iter()
                            .enumerate()
                            .map(|(i, value)| (i + 1, value.to_string()))
                            .collect::<BTreeMap<_, _>>(),
                    ),
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Token file is not valid csv, dropping token");
                        return None;
                    }
                }
            }
            out.token_type = "fieldChoice".to_string();
            out.field_choice = Some(rows);
            out.src_field = Some(column.to_string());
            out.group = Some(groups.id_for(reference));
        }
        None => {
            out.token_type = "choice".to_string();
            out.choice = Some(
                contents
                    .lines()
                    .map(|line| serde_json::Value::String(line.trim_end().to_string()))
                    .collect(),
            );
        }
    }

    Some(())
}
