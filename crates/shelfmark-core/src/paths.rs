//! Deterministic storage paths for bookmark artifacts.
//!
//! Every stored bookmark lives under a stem directory derived from its
//! owner, series and chapter. The stem keeps file names collision-free
//! across users and makes bulk cleanup tractable: once a chapter's last
//! bookmark is removed, its stem subtree is empty and can be pruned.
//!
//! Persisted relative paths always use `/` as the separator so records stay
//! portable across platforms; joins against the configured root go through
//! [`resolve_under`], which rebuilds a platform-native path.

use std::path::{Path, PathBuf};

/// Canonical separator used in persisted relative file names.
pub const SEPARATOR: char = '/';

/// Directory stem for a bookmark, nested as `user/series/chapter`.
///
/// Deterministic: the same identifiers always yield the same stem,
/// regardless of call order or prior state.
#[must_use]
pub fn bookmark_stem(user_id: i64, series_id: i64, chapter_id: i64) -> String {
    format!("{user_id}{SEPARATOR}{series_id}{SEPARATOR}{chapter_id}")
}

/// Normalize a relative path to the canonical `/`-separated form.
#[must_use]
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Join a `/`-separated relative path under an absolute root, segment by
/// segment, producing a platform-native path.
#[must_use]
pub fn resolve_under(root: &Path, relative: &str) -> PathBuf {
    let mut resolved = root.to_path_buf();
    for segment in normalize_separators(relative)
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
    {
        resolved.push(segment);
    }
    resolved
}

/// Join a relative directory and a file base name in canonical form.
///
/// An empty directory yields the bare file name; cover images are stored
/// flat and use this case.
#[must_use]
pub fn join_relative(directory: &str, file_name: &str) -> String {
    let directory = normalize_separators(directory);
    let directory = directory.trim_end_matches(SEPARATOR);
    if directory.is_empty() {
        file_name.to_string()
    } else {
        format!("{directory}{SEPARATOR}{file_name}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn stem_is_deterministic() {
        assert_eq!(bookmark_stem(7, 3, 9), "7/3/9");
        assert_eq!(bookmark_stem(7, 3, 9), bookmark_stem(7, 3, 9));
        assert_eq!(bookmark_stem(42, 17, 9), "42/17/9");
    }

    #[test]
    fn normalize_converts_backslashes() {
        assert_eq!(normalize_separators(r"1\2\page.png"), "1/2/page.png");
        assert_eq!(normalize_separators("1/2/page.png"), "1/2/page.png");
    }

    #[test]
    fn resolve_under_joins_segments() {
        let resolved = resolve_under(Path::new("/data/bookmarks"), "7/3/9/page.png");
        let expected: PathBuf = ["/data/bookmarks", "7", "3", "9", "page.png"]
            .iter()
            .collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn resolve_under_skips_empty_segments() {
        let resolved = resolve_under(Path::new("/covers"), "//cover.png");
        let expected: PathBuf = ["/covers", "cover.png"].iter().collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn join_relative_handles_flat_directories() {
        assert_eq!(join_relative("7/3/9", "page.webp"), "7/3/9/page.webp");
        assert_eq!(join_relative("", "cover.webp"), "cover.webp");
        assert_eq!(join_relative("7/3/9/", "page.webp"), "7/3/9/page.webp");
    }

    proptest! {
        #[test]
        fn stem_round_trips_through_resolve(
            user in 0i64..100_000,
            series in 0i64..100_000,
            chapter in 0i64..100_000,
        ) {
            let stem = bookmark_stem(user, series, chapter);
            prop_assert_eq!(stem.split(SEPARATOR).count(), 3);

            let resolved = resolve_under(Path::new("/root"), &stem);
            let expected_suffix = format!("{}/{}/{}", user, series, chapter);
            prop_assert!(resolved.ends_with(expected_suffix));
        }
    }
}
