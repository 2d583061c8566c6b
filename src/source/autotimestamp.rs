use super::loader::{load_sample, LoadError};
use super::timestamp::TimestampExtractor;
use crate::config::Config;
use crate::sample::{Sample, Token, TIME_FIELD};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Token added when sample records carry an explicit `_time` field
pub const TIME_FIELD_PATTERN: &str = r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}";
pub const TIME_FIELD_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%f";

/// A (pattern, format) pair tried against sample records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampCandidate {
    pub pattern: String,
    pub format: String,
}

impl TimestampCandidate {
    pub fn new(pattern: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            format: format.into(),
        }
    }
}

/// Built-in candidates, most specific first so a prefix format never
/// claims a line a longer format would also fit.
pub fn default_candidates() -> Vec<TimestampCandidate> {
    [
        (
            r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}[+-]\d{4}",
            "%Y-%m-%dT%H:%M:%S.%f%z",
        ),
        (TIME_FIELD_PATTERN, TIME_FIELD_FORMAT),
        (
            r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3}",
            "%Y-%m-%d %H:%M:%S,%f",
        ),
        (
            r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}",
            "%Y-%m-%dT%H:%M:%S",
        ),
        (
            r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}",
            "%Y-%m-%d %H:%M:%S",
        ),
        (
            r"\d{2}/\w{3}/\d{4}:\d{2}:\d{2}:\d{2} [+-]\d{4}",
            "%d/%b/%Y:%H:%M:%S %z",
        ),
        (
            r"\d{2}/\w{3}/\d{4}:\d{2}:\d{2}:\d{2}",
            "%d/%b/%Y:%H:%M:%S",
        ),
        (
            r"\w{3} \w{3} \d{2} \d{2}:\d{2}:\d{2} \d{4}",
            "%a %b %d %H:%M:%S %Y",
        ),
        (
            r"\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}",
            "%m/%d/%Y %H:%M:%S",
        ),
        (r"\w{3}\s+\d{1,2} \d{2}:\d{2}:\d{2}", "%b %d %H:%M:%S"),
    ]
    .into_iter()
    .map(|(pattern, format)| TimestampCandidate::new(pattern, format))
    .collect()
}

/// Read candidates from an `autotimestamps` JSON value: a list of
/// `[pattern, format]` pairs.
pub fn candidates_from_json(value: &serde_json::Value) -> Option<Vec<TimestampCandidate>> {
    value
        .as_array()?
        .iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([pattern, format]) => Some(TimestampCandidate::new(
                pattern.as_str()?,
                format.as_str()?,
            )),
            _ => None,
        })
        .collect()
}

/// Structural fingerprint of a line: each run of digits becomes `9`, each
/// run of letters becomes `a`, everything else is kept.
pub fn skeleton(text: &str) -> String {
    #[derive(PartialEq)]
    enum Run {
        Digits,
        Letters,
        Other,
    }

    let mut out = String::with_capacity(text.len());
    let mut current = Run::Other;
    for c in text.chars() {
        let run = if c.is_numeric() {
            Run::Digits
        } else if c.is_alphabetic() {
            Run::Letters
        } else {
            Run::Other
        };

        match run {
            Run::Digits if current != Run::Digits => out.push('9'),
            Run::Letters if current != Run::Letters => out.push('a'),
            Run::Other => out.push(c),
            _ => {}
        }
        current = run;
    }
    out
}

/// Add timestamp tokens to every file-backed sample with `autotimestamp` on.
pub fn apply_autotimestamps(config: &Config, samples: &mut [Sample]) -> Result<(), LoadError> {
    for sample in samples.iter_mut() {
        debug!(sample = %sample.name, generator = %sample.generator(), "Checking generator");
        if !sample.uses_file_generator() || sample.file_path.is_none() {
            continue;
        }

        load_sample(config, sample)?;

        if sample.autotimestamp() {
            let added = detect_timestamps(config.autotimestamp_candidates(), sample);
            debug!(sample = %sample.name, added, "Autotimestamp finished");
        }
    }
    Ok(())
}

/// Fit candidate formats to the loaded records of `sample`, appending a
/// timestamp token for each fit. Returns the number of tokens added.
pub fn detect_timestamps(candidates: &[TimestampCandidate], sample: &mut Sample) -> usize {
    let mut added = 0;

    if sample
        .records()
        .first()
        .is_some_and(|r| r.has_field(TIME_FIELD))
    {
        if sample.has_token(TIME_FIELD_PATTERN, TIME_FIELD_FORMAT) {
            debug!(sample = %sample.name, "_time field exists and timestamp already configured");
        } else {
            debug!(sample = %sample.name, "Found _time field, adding timestamp to support it");
            sample
                .tokens
                .push(Token::timestamp(TIME_FIELD_PATTERN, TIME_FIELD_FORMAT));
            added += 1;
        }
    }

    let mut remaining: Vec<(&TimestampCandidate, TimestampExtractor)> = candidates
        .iter()
        .filter_map(|c| match TimestampExtractor::new(&c.pattern, &c.format) {
            Ok(extractor) => Some((c, extractor)),
            Err(e) => {
                warn!(pattern = %c.pattern, error = %e, "Skipping autotimestamp candidate");
                None
            }
        })
        .collect();

    let raws: Vec<String> = sample.records().iter().map(|r| r.raw().to_string()).collect();
    let mut seen = HashSet::new();

    for raw in &raws {
        if remaining.is_empty() {
            break;
        }
        if !seen.insert(skeleton(raw)) {
            continue;
        }

        let fit = remaining
            .iter()
            .position(|(_, extractor)| matches!(extractor.extract(raw), Ok(Some(_))));

        if let Some(position) = fit {
            let (candidate, _) = remaining.remove(position);
            if !sample.has_token(&candidate.pattern, &candidate.format) {
                debug!(
                    sample = %sample.name,
                    pattern = %candidate.pattern,
                    format = %candidate.format,
                    "Found timestamp, adding token"
                );
                sample
                    .tokens
                    .push(Token::timestamp(&candidate.pattern, &candidate.format));
                added += 1;
            }
        }
    }

    added
}
