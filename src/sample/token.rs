use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementType {
    Static,
    Timestamp,
    #[serde(rename = "replaytimestamp")]
    ReplayTimestamp,
    Random,
    Rated,
    File,
    #[serde(rename = "mvfile")]
    MvFile,
    #[serde(rename = "integerid")]
    IntegerId,
}

impl ReplacementType {
    pub const ALL: [ReplacementType; 8] = [
        ReplacementType::Static,
        ReplacementType::Timestamp,
        ReplacementType::ReplayTimestamp,
        ReplacementType::Random,
        ReplacementType::Rated,
        ReplacementType::File,
        ReplacementType::MvFile,
        ReplacementType::IntegerId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplacementType::Static => "static",
            ReplacementType::Timestamp => "timestamp",
            ReplacementType::ReplayTimestamp => "replaytimestamp",
            ReplacementType::Random => "random",
            ReplacementType::Rated => "rated",
            ReplacementType::File => "file",
            ReplacementType::MvFile => "mvfile",
            ReplacementType::IntegerId => "integerid",
        }
    }
}

impl fmt::Display for ReplacementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplacementType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReplacementType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

/// Which part of a token a key writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenField {
    Pattern,
    ReplacementType,
    Replacement,
}

impl TokenField {
    /// Field names accepted after `token.<N>.`; the pattern field is spelled
    /// `token` in eventgen.conf and `pattern` elsewhere.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "token" | "pattern" => Some(TokenField::Pattern),
            "replacementType" => Some(TokenField::ReplacementType),
            "replacement" => Some(TokenField::Replacement),
            _ => None,
        }
    }

    /// Field names accepted after `host.`
    pub fn parse_host(name: &str) -> Option<Self> {
        match name {
            "token" | "pattern" => Some(TokenField::Pattern),
            "replacement" => Some(TokenField::Replacement),
            _ => None,
        }
    }
}

/// A validated value for one token field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenFieldValue {
    Pattern(String),
    ReplacementType(ReplacementType),
    Replacement(String),
}

/// A fully specified substitution rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub pattern: String,
    pub replacement_type: ReplacementType,
    pub replacement: String,
}

impl Token {
    pub fn new(
        pattern: impl Into<String>,
        replacement_type: ReplacementType,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            replacement_type,
            replacement: replacement.into(),
        }
    }

    pub fn timestamp(pattern: impl Into<String>, format: impl Into<String>) -> Self {
        Self::new(pattern, ReplacementType::Timestamp, format)
    }

    /// Same pattern and replacement payload, regardless of type
    pub fn same_rule(&self, pattern: &str, replacement: &str) -> bool {
        self.pattern == pattern && self.replacement == replacement
    }
}

/// A token still being assembled from stanza keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenDraft {
    pub pattern: Option<String>,
    pub replacement_type: Option<ReplacementType>,
    pub replacement: Option<String>,
}

impl TokenDraft {
    pub fn apply(&mut self, value: TokenFieldValue) {
        match value {
            TokenFieldValue::Pattern(p) => self.pattern = Some(p),
            TokenFieldValue::ReplacementType(t) => self.replacement_type = Some(t),
            TokenFieldValue::Replacement(r) => self.replacement = Some(r),
        }
    }

    pub fn complete(self) -> Option<Token> {
        Some(Token {
            pattern: self.pattern?,
            replacement_type: self.replacement_type?,
            replacement: self.replacement?,
        })
    }
}

/// Collects token keys for one stanza, in any order, then prunes the
/// incomplete ones.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    slots: BTreeMap<usize, TokenDraft>,
    host: Option<TokenDraft>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, index: usize, value: TokenFieldValue) {
        self.slots.entry(index).or_default().apply(value);
    }

    pub fn set_host(&mut self, value: TokenFieldValue) {
        self.host
            .get_or_insert_with(|| TokenDraft {
                replacement_type: Some(ReplacementType::File),
                ..TokenDraft::default()
            })
            .apply(value);
    }

    /// Complete tokens in index order plus the host token. Placeholders and
    /// partially specified tokens are dropped with a diagnostic.
    pub fn finish(self, stanza: &str) -> (Vec<Token>, Option<Token>) {
        let mut tokens = Vec::with_capacity(self.slots.len());
        let mut expected = 0usize;

        for (index, draft) in self.slots {
            if index > expected {
                info!(
                    stanza = %stanza,
                    first = expected,
                    last = index - 1,
                    "Token indices never defined, skipping"
                );
            }
            expected = index.saturating_add(1);

            match draft.complete() {
                Some(token) => tokens.push(token),
                None => info!(stanza = %stanza, index, "Token at index invalid, removing"),
            }
        }

        let host = self.host.and_then(|draft| {
            let token = draft.complete();
            if token.is_none() {
                info!(stanza = %stanza, "Host token incomplete, removing");
            }
            token
        });

        (tokens, host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(table: &mut TokenTable, index: usize, pattern: &str) {
        table.set(index, TokenFieldValue::Pattern(pattern.into()));
        table.set(
            index,
            TokenFieldValue::ReplacementType(ReplacementType::Static),
        );
        table.set(index, TokenFieldValue::Replacement("x".into()));
    }

    #[test]
    fn test_incomplete_token_is_pruned() {
        let mut table = TokenTable::new();
        full(&mut table, 0, "a");
        table.set(1, TokenFieldValue::Pattern("b".into()));
        table.set(
            1,
            TokenFieldValue::ReplacementType(ReplacementType::Random),
        );

        let (tokens, host) = table.finish("s");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].pattern, "a");
        assert!(host.is_none());
    }

    #[test]
    fn test_out_of_order_indices_keep_index_order() {
        let mut table = TokenTable::new();
        full(&mut table, 3, "three");
        full(&mut table, 0, "zero");

        let (tokens, _) = table.finish("s");
        let patterns: Vec<_> = tokens.iter().map(|t| t.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["zero", "three"]);
    }

    #[test]
    fn test_largest_index_does_not_overflow() {
        let mut table = TokenTable::new();
        full(&mut table, 0, "zero");
        full(&mut table, usize::MAX, "last");

        let (tokens, _) = table.finish("s");
        let patterns: Vec<_> = tokens.iter().map(|t| t.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["zero", "last"]);
    }

    #[test]
    fn test_host_token_defaults_to_file() {
        let mut table = TokenTable::new();
        table.set_host(TokenFieldValue::Pattern("host=(\\w+)".into()));
        table.set_host(TokenFieldValue::Replacement("hosts.txt".into()));

        let (_, host) = table.finish("s");
        let host = host.unwrap();
        assert_eq!(host.replacement_type, ReplacementType::File);
        assert_eq!(host.replacement, "hosts.txt");
    }

    #[test]
    fn test_replacement_type_round_trips_names() {
        for t in ReplacementType::ALL {
            assert_eq!(t.as_str().parse::<ReplacementType>(), Ok(t));
        }
        assert!("bogus".parse::<ReplacementType>().is_err());
    }

    #[test]
    fn test_field_spellings() {
        assert_eq!(TokenField::parse("token"), Some(TokenField::Pattern));
        assert_eq!(TokenField::parse("pattern"), Some(TokenField::Pattern));
        assert_eq!(TokenField::parse("bogus"), None);
        assert_eq!(TokenField::parse_host("replacementType"), None);
    }
}
