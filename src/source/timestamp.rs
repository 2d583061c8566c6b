use chrono::format::{parse, Parsed, StrftimeItems};
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("regex compilation failed: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("failed to parse timestamp '{value}' with format '{format}': {source}")]
    ParseError {
        value: String,
        format: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Finds a timestamp in a line with a regex and parses it with a strftime format.
///
/// When the pattern has a named group `ts` only that group is parsed,
/// otherwise the whole match is.
#[derive(Debug)]
pub struct TimestampExtractor {
    pattern: Regex,
    format: String,
}

impl TimestampExtractor {
    pub fn new(pattern: &str, format: &str) -> Result<Self, TimestampError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            format: format.to_string(),
        })
    }

    /// Returns `Ok(None)` if the pattern doesn't match the line.
    pub fn extract(&self, line: &str) -> Result<Option<DateTime<Utc>>, TimestampError> {
        let Some(captures) = self.pattern.captures(line) else {
            return Ok(None);
        };

        let value = captures
            .name("ts")
            .or_else(|| captures.get(0))
            .map_or("", |m| m.as_str());

        parse_strptime(value, &self.format).map(Some)
    }
}

static WEEKDAY_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\b").expect("weekday pattern is valid")
});

/// Parse `value` with a strftime `format`.
///
/// Fields the format leaves out default the way strptime does: 1900-01-01,
/// midnight, UTC. Values without an offset are taken as UTC. `.%f` reads a
/// fraction of a second, and a weekday that disagrees with the date is
/// ignored.
pub fn parse_strptime(value: &str, format: &str) -> Result<DateTime<Utc>, TimestampError> {
    let fractional = format.replace(".%f", "%.f");
    let to_error = |source: chrono::ParseError| TimestampError::ParseError {
        value: value.to_string(),
        format: format.to_string(),
        source,
    };

    match resolve_parsed(value, &fractional) {
        Ok(dt) => Ok(dt),
        Err(e) if fractional.contains("%a") || fractional.contains("%A") => {
            let value = WEEKDAY_NAME.replace_all(value, "");
            let format = fractional.replace("%a", "").replace("%A", "");
            resolve_parsed(&value, &format).map_err(|_| to_error(e))
        }
        Err(e) => Err(to_error(e)),
    }
}

fn resolve_parsed(value: &str, format: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let mut parsed = Parsed::new();
    parse(&mut parsed, value, StrftimeItems::new(format))?;

    if let Ok(dt) = parsed.to_datetime() {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = parsed.to_naive_datetime_with_offset(0) {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    // Setters refuse to overwrite a field that is already present.
    let _ = parsed.set_year(1900);
    let _ = parsed.set_month(1);
    let _ = parsed.set_day(1);
    let _ = parsed.set_hour(0);
    let _ = parsed.set_minute(0);

    parsed
        .to_naive_datetime_with_offset(0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}
