//! Key selection and prefix trimming
//!
//! Turns fetched rows into the map exposed to the application. For each row:
//!
//! 1. A watched key is inserted as-is, so it stays addressable by its
//!    literal name.
//! 2. Otherwise the trim prefixes are scanned in sorted order; the first one
//!    found *anywhere* in the key (ignoring case) cuts the key just after
//!    that occurrence. `xA:Foo` trimmed by `A:` becomes `Foo`.
//! 3. Keys that match no prefix are inserted unchanged.
//!
//! Two rows landing on the same output key is an error, never a silent
//! overwrite.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{SourceError, SourceResult};
use crate::types::ConfigEntry;

/// Build a snapshot map from fetched rows
pub fn build_snapshot<I>(
    rows: I,
    watched_keys: &HashSet<String>,
    trim_prefixes: &BTreeSet<String>,
) -> SourceResult<HashMap<String, String>>
where
    I: IntoIterator<Item = ConfigEntry>,
{
    let mut data = HashMap::new();

    for ConfigEntry { key, value } in rows {
        let exposed = if watched_keys.contains(&key) {
            key.clone()
        } else {
            trim_key(&key, trim_prefixes).to_string()
        };

        if data.contains_key(&exposed) {
            return Err(SourceError::duplicate_key(exposed, key));
        }
        data.insert(exposed, value);
    }

    Ok(data)
}

/// Apply the first matching trim prefix to `key`
///
/// Returns the key unchanged when no prefix occurs in it.
pub fn trim_key<'a>(key: &'a str, trim_prefixes: &BTreeSet<String>) -> &'a str {
    trim_prefixes
        .iter()
        .find_map(|prefix| find_ignore_case(key, prefix))
        .map_or(key, |(_, end)| &key[end..])
}

/// Byte range of the first case-insensitive occurrence of `needle`
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return Some((0, 0));
    }

    haystack.char_indices().find_map(|(start, _)| {
        match_len_ignore_case(&haystack[start..], needle).map(|len| (start, start + len))
    })
}

/// Length in bytes of `haystack`'s prefix that matches `needle`, if any
fn match_len_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let mut chars = haystack.chars();
    let mut consumed = 0;
    for n in needle.chars() {
        let h = chars.next()?;
        if h != n && !h.to_lowercase().eq(n.to_lowercase()) {
            return None;
        }
        consumed += h.len_utf8();
    }
    Some(consumed)
}
