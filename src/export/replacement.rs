use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Typed form of a `random` or `rated` token replacement
#[derive(Debug, Clone, PartialEq)]
pub enum RandomReplacement {
    Integer { lower: i64, upper: i64 },
    Float { lower: f64, upper: f64, precision: usize },
    String { length: usize },
    Hex { length: usize },
    List(Vec<serde_json::Value>),
}

fn grammar(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("replacement grammar pattern is valid")
}

static INTEGER: Lazy<Regex> = Lazy::new(|| grammar(r"^integer\[(-?\d+):(-?\d+)\]"));
static FLOAT: Lazy<Regex> = Lazy::new(|| grammar(r"^float\[(\d+)\.(\d+):(\d+)\.(\d+)\]"));
static STRING: Lazy<Regex> = Lazy::new(|| grammar(r"^string\((\d+)\)"));
static HEX: Lazy<Regex> = Lazy::new(|| grammar(r"^hex\((\d+)\)"));
static LIST: Lazy<Regex> = Lazy::new(|| grammar(r"^list(\[[^\]]+\])"));

/// Parse `integer[lo:hi]`, `float[a.b:c.d]`, `string(n)`, `hex(n)` or
/// `list[...]`. Returns `None` for anything else, including a list that is
/// not a valid JSON array.
pub fn parse_random(replacement: &str) -> Option<RandomReplacement> {
    if let Some(caps) = INTEGER.captures(replacement) {
        return Some(RandomReplacement::Integer {
            lower: caps[1].parse().ok()?,
            upper: caps[2].parse().ok()?,
        });
    }

    if let Some(caps) = FLOAT.captures(replacement) {
        let lower = format!("{}.{}", &caps[1], &caps[2]);
        let upper = format!("{}.{}", &caps[3], &caps[4]);
        return Some(RandomReplacement::Float {
            lower: lower.parse().ok()?,
            upper: upper.parse().ok()?,
            precision: caps[2].len(),
        });
    }

    if let Some(caps) = STRING.captures(replacement) {
        return Some(RandomReplacement::String {
            length: caps[1].parse().ok()?,
        });
    }

    if let Some(caps) = HEX.captures(replacement) {
        return Some(RandomReplacement::Hex {
            length: caps[1].parse().ok()?,
        });
    }

    if let Some(caps) = LIST.captures(replacement) {
        return serde_json::from_str(&caps[1])
            .ok()
            .map(RandomReplacement::List);
    }

    None
}
