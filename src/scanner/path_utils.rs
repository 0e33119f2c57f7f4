//! Relative path keys and Unicode path normalization.
//!
//! Every file is identified by its path relative to the tree root, with `/`
//! as the separator on all platforms. That key is what the hash cache stores,
//! what the reports print and what path-based matching compares.
//!
//! # Background
//!
//! macOS uses NFD (Decomposed) normalization for file paths, while Windows
//! and Linux typically use NFC (Composed) normalization. The same visual
//! filename can have different byte representations:
//!
//! - NFC: `café.txt` - 'é' is U+00E9 (single code point)
//! - NFD: `café.txt` - 'e' U+0065 + combining acute accent U+0301
//!
//! Keys are kept byte-exact so they can be joined back onto the root to open
//! the file; [`match_key`] produces the NFC form used only when comparing
//! paths across trees.
//!
//! # Example
//!
//! ```
//! use hashsync::scanner::path_utils::{match_key, relative_key};
//! use std::path::Path;
//!
//! let key = relative_key(Path::new("/data"), Path::new("/data/photos/a.jpg")).unwrap();
//! assert_eq!(key, "photos/a.jpg");
//!
//! assert_eq!(match_key("cafe\u{0301}.txt"), match_key("café.txt"));
//! ```

use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

use super::ScanError;

/// Build the relative key for `path` under `root`.
///
/// # Errors
///
/// Returns [`ScanError::NonUtf8Path`] if the relative path is not valid
/// UTF-8, since such a path cannot be stored in a UTF-8 report or cache.
pub fn relative_key(root: &Path, path: &Path) -> Result<String, ScanError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut key = String::new();
    for component in relative.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        let part = part
            .to_str()
            .ok_or_else(|| ScanError::NonUtf8Path(path.to_path_buf()))?;
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(part);
    }
    Ok(key)
}

/// Resolve a relative key back to a filesystem path under `root`.
#[must_use]
pub fn resolve_key(root: &Path, key: &str) -> PathBuf {
    key.split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// NFC-normalized form of a key, used when comparing paths across trees.
#[must_use]
pub fn match_key(key: &str) -> String {
    key.nfc().collect()
}

/// Whether a file or directory name counts as hidden (`.name` or `$name`).
#[must_use]
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('$')
}

/// Normalize an extension for comparison: lowercase, no leading dot.
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
