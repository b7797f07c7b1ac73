//! Object-store key layout
//!
//! Shards are read from `logs/<hostname>/<date-prefixed-filename>` and merged
//! output is written to `merged/<hostname>/<date>_merged.jsonl.gz`.

use chrono::NaiveDate;

/// Prefix under which every host writes its log shards.
pub const LOG_PREFIX: &str = "logs/";

/// Prefix under which merged daily files are published.
pub const MERGED_PREFIX: &str = "merged/";

/// Suffix of the local merged artifact file name.
pub const MERGED_SUFFIX: &str = "_merged.jsonl";

/// Content type of published objects.
pub const GZIP_CONTENT_TYPE: &str = "application/gzip";

/// Format a date the way it appears in shard file names (`YYYY-MM-DD`).
pub fn date_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Listing prefix covering every shard of one host on one day.
pub fn shard_prefix(hostname: &str, date: NaiveDate) -> String {
    format!("{}{}/{}", LOG_PREFIX, hostname, date_str(date))
}

/// File name of the merged artifact, e.g. `2024-01-01_merged.jsonl`.
pub fn merged_file_name(date: NaiveDate) -> String {
    format!("{}{}", date_str(date), MERGED_SUFFIX)
}

/// Destination key of the published object.
pub fn merged_key(hostname: &str, date: NaiveDate) -> String {
    format!("{}{}/{}.gz", MERGED_PREFIX, hostname, merged_file_name(date))
}

/// A shard key split into its meaningful segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardKey<'a> {
    pub hostname: &'a str,
    /// Third path segment; starts with the shard's date.
    pub file_name: &'a str,
}

impl<'a> ShardKey<'a> {
    /// Split `logs/<hostname>/<file>...` into its parts.
    ///
    /// Returns `None` for keys with fewer than three segments and for
    /// hostname segments that cannot name a local directory (`""`, `.`, `..`).
    pub fn parse(key: &'a str) -> Option<Self> {
        let mut parts = key.split('/');
        let _root = parts.next()?;
        let hostname = parts.next()?;
        let file_name = parts.next()?;

        if matches!(hostname, "" | "." | "..") {
            return None;
        }

        Some(Self {
            hostname,
            file_name,
        })
    }

    /// Whether this shard belongs to `date` (prefix match on the file name).
    pub fn is_on(&self, date: &str) -> bool {
        self.file_name.starts_with(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_shard_prefix() {
        assert_eq!(shard_prefix("host1", day()), "logs/host1/2024-01-01");
    }

    #[test]
    fn test_merged_key() {
        assert_eq!(
            merged_key("host1", day()),
            "merged/host1/2024-01-01_merged.jsonl.gz"
        );
    }

    #[test]
    fn test_date_str_pads() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_str(date), "2024-03-07");
    }

    #[test]
    fn test_parse_shard_key() {
        let key = ShardKey::parse("logs/web-01/2024-01-01T12.jsonl").unwrap();
        assert_eq!(key.hostname, "web-01");
        assert_eq!(key.file_name, "2024-01-01T12.jsonl");
        assert!(key.is_on("2024-01-01"));
        assert!(!key.is_on("2024-01-02"));
    }

    #[test]
    fn test_parse_nested_shard_key_uses_third_segment() {
        let key = ShardKey::parse("logs/web-01/2024-01-01/part-0.jsonl").unwrap();
        assert_eq!(key.hostname, "web-01");
        assert_eq!(key.file_name, "2024-01-01");
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        assert_eq!(ShardKey::parse("logs"), None);
        assert_eq!(ShardKey::parse("logs/web-01"), None);
        assert_eq!(ShardKey::parse("logs//2024-01-01.jsonl"), None);
        assert_eq!(ShardKey::parse("logs/../2024-01-01.jsonl"), None);
        assert_eq!(ShardKey::parse("logs/./2024-01-01.jsonl"), None);
    }
}
