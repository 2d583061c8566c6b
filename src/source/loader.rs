use crate::config::schema::DEFAULT_BREAKER;
use crate::config::value::{Origin, SettingValue};
use crate::config::Config;
use crate::sample::{EventRecord, Sample, RAW_FIELD};
use regex::RegexBuilder;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read sample file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse csv sample '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("sample '{0}' has no matched file to load")]
    NoFile(String),
}

/// Load `sample`'s file into event records, once. Later calls return the
/// cached records.
pub fn load_sample<'a>(config: &Config, sample: &'a mut Sample) -> Result<&'a [EventRecord], LoadError> {
    if sample.is_loaded() {
        return Ok(sample.records());
    }

    let path = sample
        .file_path
        .clone()
        .ok_or_else(|| LoadError::NoFile(sample.name.clone()))?;

    let bytes = std::fs::read(&path).map_err(|source| LoadError::Io {
        path: path.clone(),
        source,
    })?;
    let text = decode_sample_text(sample, bytes);

    let mut records = if sample.sample_type() == "csv" {
        debug!(sample = %sample.name, app = %sample.app, "Reading csv sample");
        read_csv_records(&path, &text, sample)?
    } else {
        let lines = split_raw(config, sample, &text);
        let metadata = sample.record_metadata();
        lines
            .into_iter()
            .map(|line| {
                let mut record = EventRecord::new(line);
                for (field, value) in &metadata {
                    record.fields.insert(field.to_string(), value.clone());
                }
                record
            })
            .collect::<Vec<_>>()
    };

    for record in &mut records {
        record.terminate();
    }

    debug!(sample = %sample.name, records = records.len(), "Finished loading sample");
    sample.set_loaded(text, records);
    Ok(sample.records())
}

/// Sample files are read as bytes. Invalid UTF-8 is replaced rather than
/// rejected, and CRLF line endings become `\n`.
fn decode_sample_text(sample: &Sample, bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                sample = %sample.name,
                app = %sample.app,
                valid_up_to = e.utf8_error().valid_up_to(),
                "Sample file is not valid UTF-8, replacing invalid bytes"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    if text.contains("\r\n") {
        text.replace("\r\n", "\n")
    } else {
        text
    }
}

/// Split raw sample text into event strings, by line unless the sample
/// carries a non-default breaker.
fn split_raw(config: &Config, sample: &mut Sample, text: &str) -> Vec<String> {
    let default_breaker = config.default_text("breaker").unwrap_or(DEFAULT_BREAKER);
    let breaker = sample.settings.text("breaker").unwrap_or(default_breaker);

    if breaker == default_breaker {
        debug!(sample = %sample.name, app = %sample.app, "Reading raw sample by line");
        return split_lines(text);
    }

    debug!(sample = %sample.name, app = %sample.app, breaker = %breaker, "Non-default breaker detected");
    match RegexBuilder::new(breaker).multi_line(true).build() {
        Ok(re) => split_on_breaker(&re, text),
        Err(e) => {
            error!(
                sample = %sample.name,
                app = %sample.app,
                breaker = %breaker,
                error = %e,
                "Line breaker could not be compiled; using default breaker"
            );
            let default_breaker = default_breaker.to_string();
            sample
                .settings
                .set("breaker", SettingValue::Text(default_breaker), Origin::Default);
            split_lines(text)
        }
    }
}

/// Lines including their newline terminators
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

/// Split at the start of every breaker match, ignoring a match at offset zero.
/// The text after the last match forms the final record.
pub fn split_on_breaker(re: &regex::Regex, text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut extract = 0;
    let mut search = 0;

    while search <= text.len() {
        let Some(m) = re.find_at(text, search) else {
            break;
        };
        if m.start() != 0 && m.start() > extract {
            records.push(text[extract..m.start()].to_string());
            extract = m.start();
        }
        search = if m.end() > m.start() {
            m.end()
        } else {
            // empty match: step past one character
            text[m.end()..]
                .chars()
                .next()
                .map_or(text.len() + 1, |c| m.end() + c.len_utf8())
        };
    }

    if extract < text.len() {
        records.push(text[extract..].to_string());
    }
    records
}

fn read_csv_records(path: &Path, text: &str, sample: &Sample) -> Result<Vec<EventRecord>, LoadError> {
    let to_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers().map_err(to_error)?.clone();
    let metadata = sample.record_metadata();

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let row_values = result.map_err(to_error)?;
        let mut record = EventRecord::default();
        for (name, value) in headers.iter().zip(row_values.iter()) {
            record.fields.insert(name.to_string(), value.to_string());
        }

        if !record.has_field(RAW_FIELD) {
            warn!(sample = %sample.name, row = row + 1, "Missing _raw in csv row, skipping");
            continue;
        }
        for (field, value) in &metadata {
            record
                .fields
                .entry(field.to_string())
                .or_insert_with(|| value.clone());
        }
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchPaths;
    use regex::Regex;
    use std::fs;
    use tempfile::TempDir;

    fn config() -> Config {
        Config::new(SearchPaths::new("/nonexistent", "/nonexistent"))
    }

    fn sample_for(dir: &TempDir, name: &str, contents: &str) -> Sample {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        let c = config();
        let mut sample = Sample::new(name, "test");
        sample.settings.fill_defaults(c.defaults());
        sample.file_path = Some(path);
        sample
    }

    #[test]
    fn test_line_mode_three_lines() {
        let dir = TempDir::new().unwrap();
        let mut sample = sample_for(&dir, "a.log", "one\ntwo\nthree");
        let c = config();

        let records = load_sample(&c, &mut sample).unwrap();

        let raws: Vec<_> = records.iter().map(EventRecord::raw).collect();
        assert_eq!(raws, vec!["one\n", "two\n", "three\n"]);
        assert_eq!(records[0].get("index"), Some("main"));
        assert_eq!(records[0].get("sourcetype"), Some("eventgen"));
    }

    #[test]
    fn test_line_mode_keeps_single_newline() {
        let dir = TempDir::new().unwrap();
        let mut sample = sample_for(&dir, "a.log", "one\ntwo\nthree\n");
        let c = config();

        let records = load_sample(&c, &mut sample).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.raw().ends_with('\n') && !r.raw().ends_with("\n\n")));
    }

    #[test]
    fn test_custom_breaker_splits_at_match_start() {
        let dir = TempDir::new().unwrap();
        let text = "2024-01-01 first\n  continued\n2024-01-02 second\n2024-01-03 third";
        let mut sample = sample_for(&dir, "multi.log", text);
        sample.set_locked("breaker", SettingValue::Text(r"^\d{4}-\d{2}-\d{2}".into()));
        let c = config();

        let records = load_sample(&c, &mut sample).unwrap();

        let raws: Vec<_> = records.iter().map(EventRecord::raw).collect();
        assert_eq!(
            raws,
            vec![
                "2024-01-01 first\n  continued\n",
                "2024-01-02 second\n",
                "2024-01-03 third\n"
            ]
        );
    }

    #[test]
    fn test_breaker_without_leading_match() {
        let re = Regex::new("--").unwrap();
        let records = split_on_breaker(&re, "a--b--c");
        assert_eq!(records, vec!["a", "--b", "--c"]);
    }

    #[test]
    fn test_empty_match_breaker_terminates() {
        let re = Regex::new("x*").unwrap();
        let records = split_on_breaker(&re, "abx");
        assert_eq!(records.concat(), "abx");
    }

    #[test]
    fn test_invalid_breaker_falls_back_to_lines() {
        let dir = TempDir::new().unwrap();
        let mut sample = sample_for(&dir, "a.log", "one\ntwo\n");
        sample.set_locked("breaker", SettingValue::Text("([unclosed".into()));
        let c = config();

        let count = load_sample(&c, &mut sample).unwrap().len();

        assert_eq!(count, 2);
        assert_eq!(sample.settings.text("breaker"), Some(DEFAULT_BREAKER));
    }

    #[test]
    fn test_csv_mode_skips_rows_without_raw() {
        let dir = TempDir::new().unwrap();
        let mut sample = sample_for(
            &dir,
            "events.csv",
            "host,_raw,_time\nweb01,hello,2024-01-01T00:00:00.000\nweb02\nweb03,bye\n",
        );
        sample.set_locked("sampletype", SettingValue::Text("csv".into()));
        let c = config();

        let records = load_sample(&c, &mut sample).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw(), "hello\n");
        assert_eq!(records[0].get("host"), Some("web01"));
        assert_eq!(records[0].get("index"), Some("main"));
        assert_eq!(records[1].raw(), "bye\n");
        assert_eq!(records[1].get("host"), Some("web03"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut sample = sample_for(&dir, "latin1.log", "");
        fs::write(sample.file_path.as_ref().unwrap(), b"caf\xe9 login ok\nsecond\n").unwrap();
        let c = config();

        let records = load_sample(&c, &mut sample).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw(), "caf\u{fffd} login ok\n");
        assert_eq!(records[1].raw(), "second\n");
    }

    #[test]
    fn test_crlf_lines_are_normalized() {
        let dir = TempDir::new().unwrap();
        let mut sample = sample_for(&dir, "dos.log", "one\r\ntwo\r\n");
        let c = config();

        let records = load_sample(&c, &mut sample).unwrap();

        let raws: Vec<_> = records.iter().map(EventRecord::raw).collect();
        assert_eq!(raws, vec!["one\n", "two\n"]);
        assert_eq!(sample.raw_text(), Some("one\ntwo\n"));
    }

    #[test]
    fn test_csv_without_raw_column() {
        let dir = TempDir::new().unwrap();
        let mut sample = sample_for(&dir, "events.csv", "host,index\nweb01,main\n");
        sample.set_locked("sampletype", SettingValue::Text("csv".into()));
        let c = config();

        assert!(load_sample(&c, &mut sample).unwrap().is_empty());
    }

    #[test]
    fn test_load_is_cached() {
        let dir = TempDir::new().unwrap();
        let mut sample = sample_for(&dir, "a.log", "one\n");
        let c = config();
        load_sample(&c, &mut sample).unwrap();

        fs::write(sample.file_path.as_ref().unwrap(), "one\ntwo\n").unwrap();

        assert_eq!(load_sample(&c, &mut sample).unwrap().len(), 1);
        assert_eq!(sample.raw_text(), Some("one\n"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let c = config();
        let mut sample = Sample::new("gone.log", "test");
        sample.file_path = Some(PathBuf::from("/nonexistent/gone.log"));
        assert!(matches!(load_sample(&c, &mut sample), Err(LoadError::Io { .. })));

        let mut unmatched = Sample::new("x", "test");
        assert!(matches!(load_sample(&c, &mut unmatched), Err(LoadError::NoFile(_))));
    }
}
