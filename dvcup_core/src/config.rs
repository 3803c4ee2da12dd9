//! INI-style configuration documents (`.dvc/config`).
//!
//! ```text
//! [core]
//!     remote = storage
//! ['remote "storage"']
//!     url = /mnt/dvc-cache
//! ```
//!
//! Section names and keys compare case-insensitively. Lines starting with
//! `#` or `;` are comments, as is anything after a whitespace-preceded `#`
//! or `;` in a value.

use crate::error::{Error, Result};
use ini::{Ini, ParseOption};

/// One `key = value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

/// A named section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl Section {
    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.key.eq_ignore_ascii_case(key))
    }

    /// Remote name when this is a `remote "<name>"` section.
    pub fn remote_name(&self) -> Option<&str> {
        let rest = strip_prefix_ignore_case(&self.name, "remote")?;
        let rest = rest.trim_start();
        rest.strip_prefix('"')?.strip_suffix('"')
    }

    fn set(&mut self, entry: Entry) {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.key.eq_ignore_ascii_case(&entry.key))
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// A case-insensitive view over a parsed INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    sections: Vec<Section>,
}

impl Config {
    /// Parse a configuration document.
    pub fn parse(content: &str) -> Result<Self> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let document = Ini::load_from_str_opt(content, options)
            .map_err(|e| Error::invalid_config(Some(e.line), e.msg.to_string()))?;

        let mut config = Config::default();
        for (name, properties) in document.iter() {
            let Some(name) = name else {
                if let Some((key, _)) = properties.iter().next() {
                    return Err(Error::invalid_config(
                        None,
                        format!("key `{}` outside of any section", key),
                    ));
                }
                continue;
            };

            let name = unquote(name.trim(), '\'');
            if name.is_empty() {
                return Err(Error::invalid_config(None, "empty section name"));
            }
            let idx = config.section_index_or_insert(name);
            for (key, value) in properties.iter() {
                let key = key.trim();
                if key.is_empty() {
                    return Err(Error::invalid_config(
                        None,
                        format!("empty key in section `{}`", name),
                    ));
                }
                config.sections[idx].set(Entry {
                    key: key.to_string(),
                    value: unquote(strip_inline_comment(value), '"').to_string(),
                });
            }
        }

        Ok(config)
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        if let Some(idx) = self
            .sections
            .iter()
            .position(|section| section.name.eq_ignore_ascii_case(name))
        {
            return idx;
        }
        self.sections.push(Section {
            name: name.to_string(),
            entries: Vec::new(),
        });
        self.sections.len() - 1
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.name.eq_ignore_ascii_case(name))
    }

    /// All sections in document order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Look up `key` in `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key).map(|entry| entry.value.as_str())
    }

    /// Overlay `other` onto this config; keys in `other` win.
    pub fn merge(&mut self, other: Config) {
        for section in other.sections {
            let idx = self.section_index_or_insert(&section.name);
            for entry in section.entries {
                self.sections[idx].set(entry);
            }
        }
    }
}

fn unquote(s: &str, quote: char) -> &str {
    s.strip_prefix(quote)
        .and_then(|inner| inner.strip_suffix(quote))
        .unwrap_or(s)
}

/// Cut a trailing ` # ...` or ` ; ...` comment off a value.
fn strip_inline_comment(value: &str) -> &str {
    let mut prev_blank = false;
    for (idx, c) in value.char_indices() {
        if prev_blank && (c == '#' || c == ';') {
            return value[..idx].trim_end();
        }
        prev_blank = c.is_whitespace();
    }
    value.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SAMPLE: &str = "\
[core]
    remote = storage
    autostage = true
['remote \"storage\"']
    url = /mnt/dvc-cache
[remote \"web\"]
    url = https://example.com/dvc
    timeout = 30
";

    #[test]
    fn test_parse_sections() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.sections().len(), 3);
        assert_eq!(config.get("core", "remote"), Some("storage"));
        assert_eq!(
            config.get("remote \"storage\"", "url"),
            Some("/mnt/dvc-cache")
        );
        assert_eq!(config.get("remote \"web\"", "timeout"), Some("30"));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let config = Config::parse("[CORE]\nREMOTE = x\n").unwrap();
        assert_eq!(config.get("core", "remote"), Some("x"));
        assert_eq!(config.get("Core", "Remote"), Some("x"));
    }

    #[test]
    fn test_remote_name() {
        let config = Config::parse(SAMPLE).unwrap();
        let names: Vec<_> = config
            .sections()
            .iter()
            .filter_map(|s| s.remote_name())
            .collect();
        assert_eq!(names, vec!["storage", "web"]);
        assert_eq!(config.section("core").unwrap().remote_name(), None);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let config = Config::parse("# top\n\n[core]\n; note\nremote = a\n").unwrap();
        assert_eq!(config.get("core", "remote"), Some("a"));
    }

    #[test]
    fn test_repeated_key_last_wins() {
        let config = Config::parse("[core]\nremote = a\nremote = b\n").unwrap();
        assert_eq!(config.get("core", "remote"), Some("b"));
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut base = Config::parse(SAMPLE).unwrap();
        let local = Config::parse("[core]\nremote = web\n['remote \"scratch\"']\nurl = /tmp/x\n")
            .unwrap();
        base.merge(local);

        assert_eq!(base.get("core", "remote"), Some("web"));
        assert_eq!(base.get("core", "autostage"), Some("true"));
        assert_eq!(base.get("remote \"scratch\"", "url"), Some("/tmp/x"));
    }

    #[test]
    fn test_inline_comments_stripped() {
        let config = Config::parse(
            "[core]\nremote = disk ; chosen by ops\n\
             ['remote \"disk\"']\nurl = /data  # primary cache\n\
             ['remote \"web\"']\nurl = https://example.com/dvc#frag\n",
        )
        .unwrap();
        assert_eq!(config.get("core", "remote"), Some("disk"));
        assert_eq!(config.get("remote \"disk\"", "url"), Some("/data"));
        assert_eq!(
            config.get("remote \"web\"", "url"),
            Some("https://example.com/dvc#frag")
        );
    }

    #[test]
    fn test_quoted_value() {
        let config = Config::parse("[core]\nremote = \"storage\"\n").unwrap();
        assert_eq!(config.get("core", "remote"), Some("storage"));
    }

    #[test]
    fn test_backslashes_kept() {
        let config = Config::parse("[remote \"win\"]\nurl = C:\\dvc\\cache\n").unwrap();
        assert_eq!(config.get("remote \"win\"", "url"), Some("C:\\dvc\\cache"));
    }

    #[test]
    fn test_malformed_documents() {
        let err = Config::parse("[core\nremote = a\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);

        let err = Config::parse("remote = a\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert!(err.to_string().contains("remote"));
    }
}
