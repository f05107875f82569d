//! Filesystem operations under the bookmark and cover roots.
//!
//! The store is stateless: every function operates on caller-supplied
//! paths. Deletion is best-effort (a missing file is not an error) and
//! pruning is idempotent, so both are safe to run repeatedly and safe to
//! re-run after a crash.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result};

/// Copy `source` into `target_dir`, creating the directory if absent.
///
/// The file keeps its base name. Returns the path of the copy.
pub fn copy_into(source: &Path, target_dir: &Path) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no file name", source.display())))?;

    fs::create_dir_all(target_dir)?;
    let target = target_dir.join(file_name);
    fs::copy(source, &target)?;
    debug!("copied {} to {}", source.display(), target.display());
    Ok(target)
}

/// Best-effort batch delete.
///
/// A file that is already gone is skipped silently; any other failure is
/// logged and the remaining files are still attempted.
pub fn delete_all<I>(paths: I)
where
    I: IntoIterator<Item = PathBuf>,
{
    for path in paths {
        match fs::remove_file(&path) {
            Ok(()) => debug!("deleted {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not delete {}: {e}", path.display()),
        }
    }
}

/// Remove every directory under `root` that, recursively, contains no
/// files. `root` itself is never removed.
///
/// Processes leaf-first: a stem directory chain like `7/3/9` collapses
/// bottom-up once its last file is deleted, while sibling subtrees that
/// still hold files survive untouched.
pub fn prune_empty_dirs(root: &Path) -> Result<()> {
    if root.is_dir() {
        prune_tree(root)?;
    }
    Ok(())
}

/// Prune empty descendants of `dir`; returns whether `dir` ended up empty.
fn prune_tree(dir: &Path) -> Result<bool> {
    let mut empty = true;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            if prune_tree(&path)? {
                fs::remove_dir(&path)?;
                debug!("pruned empty directory {}", path.display());
            } else {
                empty = false;
            }
        } else {
            empty = false;
        }
    }
    Ok(empty)
}
