//! Static metadata scan of extension files
//!
//! Extensions declare their metadata as `__key__ = 'value'` lines, either
//! literally or wrapped for translation as `__key__ = _('value')`. The scan
//! never loads the file as code, so metadata is available for extensions
//! that are never enabled.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__([a-z_]+)__ = '([^']+)'").expect("literal metadata pattern is valid")
});

static LOCALIZED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__([a-z_]+)__ = _\('([^']+)'\)").expect("localized metadata pattern is valid")
});

/// Extract metadata assignments from file contents.
///
/// Localized values pass through `translate` and win over literal values
/// for the same key.
pub fn parse_metadata(contents: &str, translate: &dyn Fn(&str) -> String) -> BTreeMap<String, String> {
    let mut metadata: BTreeMap<String, String> = LITERAL
        .captures_iter(contents)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect();

    for caps in LOCALIZED.captures_iter(contents) {
        metadata.insert(caps[1].to_string(), translate(&caps[2]));
    }

    metadata
}

/// Read and scan an extension file.
///
/// A missing path, a missing file or an unreadable file yields no metadata.
pub fn load_metadata(
    path: Option<&Path>,
    translate: &dyn Fn(&str) -> String,
) -> BTreeMap<String, String> {
    let Some(path) = path.filter(|p| p.exists()) else {
        return BTreeMap::new();
    };

    match std::fs::read(path) {
        Ok(bytes) => parse_metadata(&String::from_utf8_lossy(&bytes), translate),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read extension metadata");
            BTreeMap::new()
        }
    }
}
