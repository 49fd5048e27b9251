//! Object tag sets
//!
//! Tags are given on the command line as `"key: value, key: value"`.
//! Parsing is strict: a pair without a `:`, with an empty key, or repeating
//! an earlier key fails the whole list instead of being dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum number of tags S3 accepts on one object
pub const MAX_TAGS: usize = 10;

/// Maximum tag key length in characters
pub const MAX_KEY_LEN: usize = 128;

/// Maximum tag value length in characters
pub const MAX_VALUE_LEN: usize = 256;

/// Tags attached to a single object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list of `key: value` pairs
    ///
    /// Each pair is split at its first `:`, so values may contain colons.
    /// Blank segments are ignored, which makes `""` and `"a: b,"` valid.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tags = BTreeMap::new();

        for pair in text.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair
                .split_once(':')
                .ok_or_else(|| Error::InvalidTags(format!("'{pair}' is not a key: value pair")))?;
            let key = key.trim();
            if tags.insert(key.to_string(), value.trim().to_string()).is_some() {
                return Err(Error::InvalidTags(format!("tag '{key}' is given more than once")));
            }
        }

        let tags = Self(tags);
        tags.validate()?;
        Ok(tags)
    }

    /// Check the set against S3 tagging limits
    pub fn validate(&self) -> Result<()> {
        if self.0.len() > MAX_TAGS {
            return Err(Error::InvalidTags(format!(
                "{} tags given, at most {MAX_TAGS} are allowed",
                self.0.len()
            )));
        }

        for (key, value) in &self.0 {
            if key.is_empty() {
                return Err(Error::InvalidTags("tag key cannot be empty".into()));
            }
            if key.chars().count() > MAX_KEY_LEN {
                return Err(Error::InvalidTags(format!(
                    "tag key '{key}' is longer than {MAX_KEY_LEN} characters"
                )));
            }
            if value.chars().count() > MAX_VALUE_LEN {
                return Err(Error::InvalidTags(format!(
                    "value of tag '{key}' is longer than {MAX_VALUE_LEN} characters"
                )));
            }
        }

        Ok(())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for TagSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let tags = TagSet::parse("version: 0.0, type: app").unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("version"), Some("0.0"));
        assert_eq!(tags.get("type"), Some("app"));
    }

    #[test]
    fn test_parse_single_pair() {
        let tags = TagSet::parse("version: 1.0").unwrap();
        assert_eq!(tags.get("version"), Some("1.0"));
    }

    #[test]
    fn test_parse_empty_is_no_tags() {
        assert!(TagSet::parse("").unwrap().is_empty());
        assert!(TagSet::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_trailing_comma() {
        let tags = TagSet::parse("a: 1,").unwrap();
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_parse_value_with_colon() {
        let tags = TagSet::parse("source: https://ci.example.com/1").unwrap();
        assert_eq!(tags.get("source"), Some("https://ci.example.com/1"));
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        let err = TagSet::parse("version: 1, broken").unwrap_err();
        assert!(matches!(err, Error::InvalidTags(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_parse_rejects_empty_key() {
        assert!(matches!(
            TagSet::parse(": value").unwrap_err(),
            Error::InvalidTags(_)
        ));
    }

    #[test]
    fn test_parse_rejects_duplicate_key() {
        let err = TagSet::parse("v: 1, v: 2").unwrap_err();
        assert!(matches!(err, Error::InvalidTags(_)));
        assert!(err.to_string().contains("'v'"));

        // keys are compared after trimming
        assert!(TagSet::parse("v: 1,  v : 1").is_err());
    }

    #[test]
    fn test_parse_rejects_too_many_tags() {
        let text = (0..=MAX_TAGS)
            .map(|i| format!("k{i}: v"))
            .collect::<Vec<_>>()
            .join(",");
        assert!(TagSet::parse(&text).is_err());
    }

    #[test]
    fn test_validate_key_length() {
        let tags: TagSet = [("k".repeat(MAX_KEY_LEN + 1), "v")].into_iter().collect();
        assert!(tags.validate().is_err());
    }

    #[test]
    fn test_display() {
        let tags: TagSet = [("version", "1.0"), ("app", "web")].into_iter().collect();
        assert_eq!(tags.to_string(), "app: web, version: 1.0");
    }
}
